use super::*;
use crate::error::Error;
use crate::geometry::BoundingBox;
use crate::test_utils::{cell_hierarchy, population_2d, rect, region_2d, Lineage};

fn double_link_chain(lineage: &mut Lineage) -> anyhow::Result<Vec<ObjectId>> {
    let ids = lineage.column();
    let mut editor = lineage.graph.editor();
    // back to front, so the trackhead has to travel down the whole chain
    for pair in ids.windows(2).rev() {
        editor.link_objects(pair[0], pair[1], true)?;
    }
    editor.finish();
    Ok(ids)
}

// ============================================================================
// Track links
// ============================================================================

#[test]
fn test_double_links_propagate_trackhead() -> anyhow::Result<()> {
    common::log_setup::init_test_logging();
    let mut lineage = Lineage::chain(4)?;
    let ids = double_link_chain(&mut lineage)?;
    let graph = &lineage.graph;

    for id in &ids {
        assert_eq!(graph.trackhead_of(*id), Some(ids[0]));
    }
    assert_eq!(graph.track(ids[0]), ids);
    assert_eq!(graph.track_heads(0), vec![ids[0]]);
    assert_eq!(graph.link_state(ids[1], ids[2])?, LinkState::DoubleLinked);
    graph.validate_track_invariants()?;
    Ok(())
}

#[test]
fn test_link_requires_increasing_frames() -> anyhow::Result<()> {
    let mut lineage = Lineage::build(cell_hierarchy(false, false), 2, 2)?;
    let (a, b) = (lineage.cells[0][0], lineage.cells[0][1]);
    let later = lineage.cells[1][0];
    let mut editor = lineage.graph.editor();

    let err = editor.link_objects(later, a, true).unwrap_err();
    assert!(matches!(err, TopologyError::FrameOrder { prev_frame: 1, next_frame: 0, .. }));
    assert!(matches!(
        editor.link_objects(a, b, true),
        Err(TopologyError::FrameOrder { .. })
    ));
    assert_eq!(editor.link_objects(a, a, true), Err(TopologyError::SelfReference(a)));
    assert!(editor.summary().is_empty());
    Ok(())
}

#[test]
fn test_link_requires_same_class() -> anyhow::Result<()> {
    let mut lineage = Lineage::chain(2)?;
    let (root, cell) = (lineage.roots[0], lineage.cells[1][0]);
    let mut editor = lineage.graph.editor();
    assert!(matches!(
        editor.link_objects(root, cell, true),
        Err(TopologyError::ClassMismatch { .. })
    ));
    Ok(())
}

#[test]
fn test_reset_previous_restarts_track() -> anyhow::Result<()> {
    let mut lineage = Lineage::chain(4)?;
    let ids = double_link_chain(&mut lineage)?;

    let mut editor = lineage.graph.editor();
    editor.reset_track_links(ids[2], true, false, true)?;
    let summary = editor.finish();
    assert!(summary.modified.contains(&ids[1]));
    assert!(summary.modified.contains(&ids[3]));

    let graph = &lineage.graph;
    assert_eq!(graph.trackhead_of(ids[1]), Some(ids[0]));
    assert_eq!(graph.trackhead_of(ids[2]), Some(ids[2]));
    assert_eq!(graph.trackhead_of(ids[3]), Some(ids[2]));
    assert_eq!(graph.object(ids[1])?.next(), None);
    assert_eq!(graph.track_heads(0), vec![ids[0], ids[2]]);
    graph.validate_track_invariants()?;
    Ok(())
}

#[test]
fn test_reset_without_propagation_leaves_stale_heads() -> anyhow::Result<()> {
    let mut lineage = Lineage::chain(3)?;
    let ids = double_link_chain(&mut lineage)?;

    let mut editor = lineage.graph.editor();
    editor.reset_track_links(ids[1], true, false, false)?;
    editor.finish();

    assert_eq!(lineage.graph.trackhead_of(ids[2]), Some(ids[0]));
    assert!(matches!(
        lineage.graph.validate_track_invariants(),
        Err(TopologyError::TrackheadMismatch { .. })
    ));
    Ok(())
}

#[test]
fn test_reset_next_releases_followers() -> anyhow::Result<()> {
    let mut lineage = Lineage::chain(3)?;
    let ids = double_link_chain(&mut lineage)?;

    let mut editor = lineage.graph.editor();
    editor.reset_track_links(ids[0], false, true, true)?;
    editor.finish();

    let graph = &lineage.graph;
    assert_eq!(graph.link_state(ids[0], ids[1])?, LinkState::Unlinked);
    assert_eq!(graph.trackhead_of(ids[2]), Some(ids[1]));
    graph.validate_track_invariants()?;
    Ok(())
}

#[test]
fn test_conflicting_link_replaced_without_merge_or_split() -> anyhow::Result<()> {
    let mut lineage = Lineage::build(cell_hierarchy(false, false), 2, 2)?;
    let p = lineage.cells[0][0];
    let (n0, n1) = (lineage.cells[1][0], lineage.cells[1][1]);
    let mut editor = lineage.graph.editor();

    assert_eq!(editor.link_objects(p, n0, true)?, LinkState::DoubleLinked);
    assert_eq!(editor.link_objects(p, n1, true)?, LinkState::DoubleLinked);
    editor.finish();

    let graph = &lineage.graph;
    assert_eq!(graph.link_state(p, n0)?, LinkState::Unlinked);
    assert_eq!(graph.trackhead_of(n0), Some(n0));
    assert_eq!(graph.trackhead_of(n1), Some(p));
    graph.validate_track_invariants()?;
    Ok(())
}

#[test]
fn test_division_degrades_to_previous_links() -> anyhow::Result<()> {
    let mut lineage = Lineage::build(cell_hierarchy(false, true), 2, 2)?;
    let p = lineage.cells[0][0];
    let (n0, n1) = (lineage.cells[1][0], lineage.cells[1][1]);
    let mut editor = lineage.graph.editor();

    assert_eq!(editor.link_objects(p, n0, true)?, LinkState::DoubleLinked);
    assert_eq!(editor.link_objects(p, n1, true)?, LinkState::OnewayPrevious);
    editor.finish();

    let graph = &lineage.graph;
    assert_eq!(graph.object(p)?.next(), None);
    assert_eq!(graph.link_state(p, n0)?, LinkState::OnewayPrevious);
    assert_eq!(graph.successors(p).len(), 2);
    assert_eq!(graph.trackhead_of(n0), Some(n0));
    assert_eq!(graph.trackhead_of(n1), Some(n1));
    graph.validate_track_invariants()?;
    Ok(())
}

#[test]
fn test_fusion_degrades_to_next_links() -> anyhow::Result<()> {
    let mut lineage = Lineage::build(cell_hierarchy(true, false), 2, 2)?;
    let (a, b) = (lineage.cells[0][0], lineage.cells[0][1]);
    let n = lineage.cells[1][0];
    let mut editor = lineage.graph.editor();

    assert_eq!(editor.link_objects(a, n, true)?, LinkState::DoubleLinked);
    assert_eq!(editor.link_objects(b, n, true)?, LinkState::OnewayNext);
    editor.finish();

    let graph = &lineage.graph;
    assert_eq!(graph.object(n)?.previous(), None);
    assert_eq!(graph.link_state(a, n)?, LinkState::OnewayNext);
    assert_eq!(graph.predecessors(n).len(), 2);
    assert!(graph.object(n)?.is_trackhead());
    graph.validate_track_invariants()?;
    Ok(())
}

#[test]
fn test_single_link_without_double() -> anyhow::Result<()> {
    let mut lineage = Lineage::chain(2)?;
    let ids = lineage.column();
    let mut editor = lineage.graph.editor();
    assert_eq!(editor.link_objects(ids[0], ids[1], false)?, LinkState::OnewayPrevious);
    editor.finish();
    assert_eq!(lineage.graph.trackhead_of(ids[1]), Some(ids[1]));
    Ok(())
}

#[test]
fn test_unlink_restores_trackheads() -> anyhow::Result<()> {
    let mut lineage = Lineage::chain(3)?;
    let ids = double_link_chain(&mut lineage)?;

    let mut editor = lineage.graph.editor();
    editor.unlink_objects(ids[0], ids[1])?;
    editor.finish();

    let graph = &lineage.graph;
    assert_eq!(graph.link_state(ids[0], ids[1])?, LinkState::Unlinked);
    assert_eq!(graph.trackhead_of(ids[1]), Some(ids[1]));
    assert_eq!(graph.trackhead_of(ids[2]), Some(ids[1]));
    graph.validate_track_invariants()?;
    Ok(())
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn test_children_and_frame_queries() -> anyhow::Result<()> {
    let mut lineage = Lineage::build(cell_hierarchy(false, false), 2, 3)?;
    let cell = lineage.cells[1][2];
    let spots = population_2d(vec![rect(21, 21, 1, 1, 0), rect(23, 23, 3, 3, 0)]);

    let mut editor = lineage.graph.editor();
    let spot_ids = editor.set_children(cell, 1, spots)?;
    editor.finish();

    let graph = &lineage.graph;
    assert_eq!(graph.objects_at_frame(1, 0), lineage.cells[1]);
    assert_eq!(graph.objects_at_frame(1, 1), spot_ids);
    assert!(graph.objects_at_frame(0, 1).is_empty());
    assert_eq!(graph.parent(spot_ids[1]), Some(cell));
    assert_eq!(graph.object(spot_ids[1])?.index(), 1);
    assert_eq!(graph.object(spot_ids[1])?.region().label(), 2);
    assert_eq!(graph.children(lineage.roots[1], 0).len(), 3);
    Ok(())
}

#[test]
fn test_set_children_checks_hierarchy() -> anyhow::Result<()> {
    let mut lineage = Lineage::chain(1)?;
    let root = lineage.roots[0];
    let mut editor = lineage.graph.editor();

    let err = editor.set_children(root, 1, population_2d(vec![rect(0, 1, 0, 1, 0)]));
    assert!(matches!(
        err,
        Err(Error::Topology(TopologyError::ParentClassMismatch { class: 1, .. }))
    ));
    let err = editor.set_children(root, 7, population_2d(Vec::new()));
    assert!(matches!(err, Err(Error::Topology(TopologyError::UnknownClass(7)))));
    Ok(())
}

#[test]
fn test_duplicate_root_rejected() -> anyhow::Result<()> {
    let mut lineage = Lineage::chain(1)?;
    let mut editor = lineage.graph.editor();
    let err = editor.create_root(0, region_2d(rect(0, 1, 0, 1, 0), 1));
    assert_eq!(err, Err(TopologyError::DuplicateRoot(0)));
    Ok(())
}

#[test]
fn test_split_then_merge_round_trip() -> anyhow::Result<()> {
    let mut lineage = Lineage::chain(1)?;
    let root = lineage.roots[0];
    let mut editor = lineage.graph.editor();
    let cell = editor.set_children(root, 0, population_2d(vec![rect(0, 9, 0, 4, 0)]))?[0];
    let spots = population_2d(vec![rect(1, 2, 1, 2, 0), rect(7, 8, 1, 2, 0)]);
    let spot_ids = editor.set_children(cell, 1, spots)?;
    editor.finish();
    let original = lineage.graph.object(cell)?.region().size();

    let halves = population_2d(vec![rect(0, 4, 0, 4, 0), rect(5, 9, 0, 4, 0)]);
    let mut editor = lineage.graph.editor();
    let pieces = editor.split(cell, halves)?;
    let summary = editor.finish();
    assert_eq!(pieces.len(), 2);
    assert_eq!(pieces[0], cell);
    assert!(summary.created.contains(&pieces[1]));

    let graph = &lineage.graph;
    assert_eq!(graph.object(cell)?.region().size(), 25);
    assert_eq!(graph.object(pieces[1])?.index(), 1);
    assert_eq!(graph.children(root, 0), pieces.as_slice());
    // the right spot follows the right half
    assert_eq!(graph.parent(spot_ids[0]), Some(cell));
    assert_eq!(graph.parent(spot_ids[1]), Some(pieces[1]));
    assert_eq!(graph.object(spot_ids[1])?.index(), 0);

    let mut editor = lineage.graph.editor();
    editor.merge(cell, pieces[1])?;
    let summary = editor.finish();
    assert!(summary.deleted.contains(&pieces[1]));

    let graph = &lineage.graph;
    assert_eq!(graph.object(cell)?.region().size(), original);
    assert!(!graph.contains(pieces[1]));
    assert_eq!(graph.children(root, 0), &[cell]);
    assert_eq!(graph.children(cell, 1).len(), 2);
    assert_eq!(graph.parent(spot_ids[1]), Some(cell));
    Ok(())
}

#[test]
fn test_split_keeps_relative_children_in_place() -> anyhow::Result<()> {
    let mut lineage = Lineage::chain(1)?;
    let root = lineage.roots[0];
    let mut editor = lineage.graph.editor();
    let cell = editor.set_children(root, 0, population_2d(vec![rect(0, 9, 0, 4, 0)]))?[0];
    // spot regions are relative to the cell origin (0, 0)
    let spots = population_2d(vec![rect(3, 3, 1, 1, 0), rect(7, 8, 1, 2, 0)]);
    let spot_ids = editor.set_children(cell, 1, spots)?;
    editor.finish();

    // the kept piece starts at x = 2, the new one at x = 5
    let pieces = population_2d(vec![rect(2, 4, 0, 4, 0), rect(5, 9, 0, 4, 0)]);
    let mut editor = lineage.graph.editor();
    let pieces = editor.split(cell, pieces)?;
    let summary = editor.finish();
    assert!(summary.modified.contains(&spot_ids[0]));

    let graph = &lineage.graph;
    let kept = graph.object(spot_ids[0])?.region();
    assert_eq!(graph.parent(spot_ids[0]), Some(cell));
    assert!(!kept.absolute_landmark());
    assert_eq!(kept.bounds(), BoundingBox::new(1, 1, 1, 1, 0, 0));
    let moved = graph.object(spot_ids[1])?.region();
    assert_eq!(graph.parent(spot_ids[1]), Some(pieces[1]));
    assert_eq!(moved.bounds(), BoundingBox::new(2, 3, 1, 2, 0, 0));

    // merging back re-expresses adopted children against the union
    let mut editor = lineage.graph.editor();
    editor.merge(cell, pieces[1])?;
    editor.finish();
    let graph = &lineage.graph;
    assert_eq!(graph.object(spot_ids[1])?.region().bounds(), BoundingBox::new(5, 6, 1, 2, 0, 0));
    assert_eq!(graph.object(spot_ids[0])?.region().bounds(), BoundingBox::new(1, 1, 1, 1, 0, 0));
    Ok(())
}

#[test]
fn test_split_rejects_root_and_empty() -> anyhow::Result<()> {
    let mut lineage = Lineage::chain(1)?;
    let (root, cell) = (lineage.roots[0], lineage.cells[0][0]);
    let mut editor = lineage.graph.editor();

    let err = editor.split(root, population_2d(vec![rect(0, 1, 0, 1, 0)]));
    assert!(matches!(err, Err(Error::Topology(TopologyError::SplitRoot(_)))));
    let err = editor.split(cell, population_2d(Vec::new()));
    assert!(matches!(err, Err(Error::Topology(TopologyError::EmptySplit(_)))));
    Ok(())
}

#[test]
fn test_merge_repoints_links() -> anyhow::Result<()> {
    let mut lineage = Lineage::build(cell_hierarchy(false, false), 2, 2)?;
    let (a, b) = (lineage.cells[0][0], lineage.cells[0][1]);
    let (c, d) = (lineage.cells[1][0], lineage.cells[1][1]);

    let mut editor = lineage.graph.editor();
    editor.link_objects(b, c, true)?;
    editor.merge(a, b)?;
    assert!(matches!(
        editor.merge(a, d),
        Err(Error::Topology(TopologyError::MergeMismatch { .. }))
    ));
    editor.finish();

    let graph = &lineage.graph;
    assert_eq!(graph.link_state(a, c)?, LinkState::DoubleLinked);
    assert_eq!(graph.trackhead_of(c), Some(a));
    assert_eq!(graph.object(a)?.region().size(), 50);
    graph.validate_track_invariants()?;
    Ok(())
}

#[test]
fn test_delete_repairs_links() -> anyhow::Result<()> {
    let mut lineage = Lineage::chain(3)?;
    let ids = double_link_chain(&mut lineage)?;
    let spots = population_2d(vec![rect(1, 1, 1, 1, 0)]);

    let mut editor = lineage.graph.editor();
    let spot = editor.set_children(ids[1], 1, spots)?[0];
    editor.finish();

    let mut editor = lineage.graph.editor();
    assert_eq!(editor.delete(&[ids[1]])?, 2);
    let summary = editor.finish();
    assert_eq!(summary.deleted, [ids[1], spot].into_iter().collect());
    assert!(summary.modified.contains(&lineage.roots[1]));

    let graph = &lineage.graph;
    assert_eq!(graph.object(ids[0])?.next(), None);
    assert_eq!(graph.object(ids[2])?.previous(), None);
    assert!(graph.object(ids[2])?.is_trackhead());
    assert!(graph.children(lineage.roots[1], 0).is_empty());
    graph.validate_track_invariants()?;
    Ok(())
}

#[test]
fn test_clone_is_deep() -> anyhow::Result<()> {
    let mut lineage = Lineage::chain(2)?;
    let ids = lineage.column();
    let snapshot = lineage.graph.clone();

    let mut editor = lineage.graph.editor();
    editor.link_objects(ids[0], ids[1], true)?;
    editor.set_attribute(ids[0], "division", true)?;
    editor.finish();

    assert_eq!(snapshot.link_state(ids[0], ids[1])?, LinkState::Unlinked);
    assert!(snapshot.object(ids[0])?.attribute("division").is_none());
    assert_eq!(
        lineage.graph.object(ids[0])?.attribute("division"),
        Some(&AttributeValue::Bool(true))
    );
    Ok(())
}

// ============================================================================
// Edit summary and store
// ============================================================================

#[test]
fn test_summary_flushes_exactly_touched_objects() -> anyhow::Result<()> {
    let mut graph = ObjectGraph::new(cell_hierarchy(false, false));
    let mut store = MemoryStore::new();

    let mut editor = graph.editor();
    let root = editor.create_root(0, region_2d(rect(0, 49, 0, 49, 0), 1))?;
    let cells = editor.set_children(root, 0, population_2d(vec![rect(0, 4, 0, 4, 0)]))?;
    let summary = editor.finish();
    assert_eq!(summary.created.len(), 2);
    // created objects are not reported as modified as well
    assert!(summary.modified.is_empty());
    assert_eq!(summary.flush(&mut store, &graph)?, 2);
    assert_eq!(store.len(), 2);

    let mut editor = graph.editor();
    editor.set_measurement(cells[0], "area", 25.0)?;
    let summary = editor.finish();
    assert_eq!(summary.dirty().collect::<Vec<_>>(), vec![cells[0]]);
    summary.flush(&mut store, &graph)?;
    assert_eq!(store.get(cells[0]).and_then(|o| o.measurement("area")), Some(25.0));

    let mut editor = graph.editor();
    editor.delete(&cells)?;
    let summary = editor.finish();
    summary.flush(&mut store, &graph)?;
    assert!(!store.contains(cells[0]));
    assert_eq!(store.len(), 1);
    assert_eq!(store.writes(), 5);
    Ok(())
}

#[test]
fn test_created_then_deleted_never_reaches_store() -> anyhow::Result<()> {
    let mut lineage = Lineage::chain(1)?;
    let root = lineage.roots[0];
    let mut editor = lineage.graph.editor();
    let cells = editor.set_children(root, 0, population_2d(vec![rect(0, 1, 0, 1, 0)]))?;
    editor.delete(&cells)?;
    let summary = editor.finish();
    assert!(summary.created.is_empty());
    assert!(summary.deleted.is_empty());
    Ok(())
}
