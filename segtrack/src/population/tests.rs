use super::*;
use crate::config::{LocalThresholdParams, SmoothParams};
use crate::error::{ConfigError, StructuralError};
use crate::raster::{Image3, LabelPixelType};
use crate::test_utils::{rect, region_2d, Dumbbell};

fn props(x_max: i32, y_max: i32) -> ImageProperties {
    ImageProperties::new(
        BoundingBox::new(0, x_max, 0, y_max, 0, 0),
        Calibration::default(),
        true,
    )
}

fn three_blocks() -> RegionPopulation {
    let regions = vec![
        region_2d(rect(0, 2, 0, 2, 0), 1),
        region_2d(rect(3, 5, 0, 2, 0), 2),
        region_2d(rect(8, 9, 0, 2, 0), 3),
    ];
    RegionPopulation::from_regions(regions, props(9, 2))
}

fn sizes(pop: &mut RegionPopulation) -> Vec<usize> {
    pop.regions().iter().map(Region::size).collect()
}

// ============================================================================
// Reconciliation
// ============================================================================

#[test]
fn test_regions_from_label_image() {
    let image = Image3::<u8>::from_fn(6, 4, 1, |x, y, _| match (x, y) {
        (0..=1, 0..=1) => 4,
        (4..=5, _) => 2,
        _ => 0,
    });
    let mut pop = RegionPopulation::from_label_image(LabelImage::U8(image.clone()));

    assert_eq!(pop.len(), 2);
    // grouped in label order
    assert_eq!(pop.regions()[0].label(), 2);
    assert_eq!(pop.regions()[0].size(), 8);
    assert_eq!(pop.regions()[1].label(), 4);
    assert!(pop.region(4).is_some_and(|r| r.contains(1, 1, 0)));
    assert_eq!(pop.label_image(), &LabelImage::U8(image));
}

#[test]
fn test_disconnected_label_becomes_two_regions() {
    let image = Image3::<u8>::from_fn(6, 1, 1, |x, _, _| if x == 0 || x == 5 { 1 } else { 0 });
    let mut pop = RegionPopulation::from_label_image(LabelImage::U8(image));

    assert_eq!(pop.len(), 2);
    assert_eq!(pop.regions()[0].label(), 1);
    assert!(pop.regions()[0].contains(0, 0, 0));
    assert_eq!(pop.regions()[1].label(), 2);
    assert!(pop.regions()[1].contains(5, 0, 0));
    // raster follows the new label
    assert_eq!(pop.label_image().label(5, 0, 0), 2);
    assert_eq!(pop.label_image().label(0, 0, 0), 1);
}

#[test]
fn test_raster_round_trip_matches_components() {
    let mask = Image3::<u8>::from_fn(8, 3, 1, |x, y, _| (x % 3 != 2 && y != 1) as u8);
    let (components, count) = label_components(&mask, Connectivity::Four);
    assert_eq!(count, 6);

    // the mask itself is a raster where every blob carries label 1
    let mut pop = RegionPopulation::from_label_image(LabelImage::U8(mask));

    let mut direct = RegionPopulation::from_label_image(components);
    assert_eq!(pop.len(), count);
    let mut got = sizes(&mut pop);
    let mut expected = sizes(&mut direct);
    got.sort_unstable();
    expected.sort_unstable();
    assert_eq!(got, expected);
}

#[test]
fn test_label_image_drawn_from_regions() {
    let mut pop = three_blocks();
    assert!(!pop.has_label_image());

    let labels = pop.label_image();
    assert_eq!(labels.bounding_box(), BoundingBox::new(0, 9, 0, 2, 0, 0));
    assert_eq!(labels.label(1, 1, 0), 1);
    assert_eq!(labels.label(4, 0, 0), 2);
    assert_eq!(labels.label(6, 0, 0), 0);
    assert_eq!(labels.label(9, 2, 0), 3);
}

#[test]
fn test_from_mask_matches_components() {
    let mask = Image3::<u8>::from_fn(7, 3, 1, |x, _, _| (x != 3) as u8);
    let mut pop = RegionPopulation::from_mask(&mask, Connectivity::Four);
    assert_eq!(pop.len(), 2);
    assert_eq!(sizes(&mut pop), vec![9, 9]);
    assert_eq!(pop.label_image().label(6, 2, 0), 2);
}

#[test]
fn test_label_image_widens_past_255() {
    let image = Image3::<u8>::from_fn(30, 30, 1, |x, y, _| (x == 0 && y == 0) as u8);
    let mut pop = RegionPopulation::from_label_image(LabelImage::U8(image));
    assert_eq!(pop.label_image().pixel_type(), LabelPixelType::U8);

    for i in 1..300 {
        let voxels = rect(i % 30, i % 30, i / 30 + 1, i / 30 + 1, 0);
        pop.add_region(region_2d(voxels, 0));
    }
    assert_eq!(pop.len(), 300);

    let labels = pop.label_image();
    assert_eq!(labels.pixel_type(), LabelPixelType::U16);
    assert_eq!(labels.label(0, 0, 0), 1);
    assert_eq!(labels.max_label(), 300);
}

#[test]
fn test_regions_mut_drops_raster() {
    let mut pop = three_blocks();
    pop.label_image();
    assert!(pop.has_label_image());

    pop.regions_mut()[0].set_quality(1.0);
    assert!(!pop.has_label_image());
    assert_eq!(pop.label_image().label(0, 0, 0), 1);
}

// ============================================================================
// Editing
// ============================================================================

#[test]
fn test_filter_relabels_and_erases() {
    let mut pop = three_blocks();
    pop.label_image();

    let removed = pop.filter(|r| r.size() > 6);
    assert_eq!(removed, 1);
    assert_eq!(pop.len(), 2);
    let labels: Vec<u32> = pop.regions().iter().map(Region::label).collect();
    assert_eq!(labels, vec![1, 2]);

    let image = pop.label_image();
    assert_eq!(image.label(9, 0, 0), 0);
    assert_eq!(image.label(4, 1, 0), 2);
}

#[test]
fn test_try_filter_reports_every_failure() {
    let mut pop = three_blocks();
    let result = pop.try_filter(|r| match r.label() {
        2 => Err(StructuralError::EmptyBody { operation: "score" }.into()),
        3 => Ok(false),
        _ => Ok(true),
    });

    let Err(Error::Batch {
        attempted,
        failures,
    }) = result
    else {
        panic!("expected a batch error");
    };
    assert_eq!(attempted, 3);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, 1);
    assert!(failures[0].1.is_structural());

    // the failed region stays, the rejected one is gone
    assert_eq!(sizes(&mut pop), vec![9, 9]);
}

#[test]
fn test_subset_keeps_labels() {
    let mut pop = three_blocks();
    let mut sub = pop.subset(|r| r.label() != 2);
    let labels: Vec<u32> = sub.regions().iter().map(Region::label).collect();
    assert_eq!(labels, vec![1, 3]);
    assert_eq!(pop.len(), 3);
}

#[test]
fn test_sort_by_relabels_in_new_order() {
    let mut pop = three_blocks();
    pop.sort_by(|a, b| a.size().cmp(&b.size()));
    assert_eq!(sizes(&mut pop), vec![6, 9, 9]);
    assert_eq!(pop.regions()[0].label(), 1);
    assert!(pop.regions()[0].contains(8, 0, 0));
}

#[test]
fn test_remove_regions() {
    let mut pop = three_blocks();
    assert_eq!(pop.remove_regions(&[1, 3]), 2);
    assert_eq!(pop.len(), 1);
    assert!(pop.regions()[0].contains(3, 0, 0));
}

#[test]
fn test_stock_filters() {
    let mut pop = three_blocks();
    assert_eq!(pop.apply(&Size::at_least(7)), 1);

    let mut pop = three_blocks();
    let border = ContactBorder::of(pop.properties());
    // every block touches the top and bottom rows
    assert_eq!(pop.apply(&border), 3);

    let mut pop = three_blocks();
    pop.regions_mut()[0].set_quality(0.9);
    assert_eq!(pop.apply(&QualityAbove(0.5)), 2);
}

// ============================================================================
// Merging
// ============================================================================

#[test]
fn test_merge_all_joins_touching() -> anyhow::Result<()> {
    let mut pop = three_blocks();
    assert_eq!(pop.merge_all()?, 1);
    assert_eq!(sizes(&mut pop), vec![18, 6]);
    let labels = pop.label_image();
    assert_eq!(labels.label(0, 0, 0), 1);
    assert_eq!(labels.label(5, 2, 0), 1);
    assert_eq!(labels.label(9, 2, 0), 2);
    Ok(())
}

#[test]
fn test_merge_respects_from_label() -> anyhow::Result<()> {
    let mut pop = three_blocks();
    assert_eq!(pop.merge_all_connected(Some(3))?, 0);
    assert_eq!(pop.len(), 3);

    assert_eq!(pop.merge_all_connected(Some(2))?, 1);
    assert_eq!(pop.len(), 2);
    Ok(())
}

#[test]
fn test_merge_keeps_caller_labels() -> anyhow::Result<()> {
    let image = Image3::<u8>::from_fn(9, 1, 1, |x, _, _| match x {
        0..=2 => 5,
        3..=5 => 2,
        _ => 9,
    });
    let mut pop = RegionPopulation::from_label_image(LabelImage::U8(image));

    // 5 and 2 touch but both sit below the reserved range
    assert_eq!(pop.merge_all_connected(Some(9))?, 1);
    assert_eq!(pop.len(), 2);
    assert_eq!(sizes(&mut pop), vec![6, 3]);
    let labels = pop.label_image();
    assert_eq!(labels.label(8, 0, 0), 1);
    assert_eq!(labels.label(3, 0, 0), 1);
    assert_eq!(labels.label(0, 0, 0), 2);
    Ok(())
}

#[test]
fn test_merge_non_contiguous_pair() -> anyhow::Result<()> {
    let image = Image3::<u8>::from_fn(6, 1, 1, |x, _, _| if x < 3 { 2 } else { 4 });
    let mut pop = RegionPopulation::from_label_image(LabelImage::U8(image));
    assert_eq!(pop.merge_all_connected(Some(4))?, 1);
    assert_eq!(pop.len(), 1);
    assert_eq!(sizes(&mut pop), vec![6]);
    Ok(())
}

#[test]
fn test_merge_chain_collapses() -> anyhow::Result<()> {
    let regions = (0..4)
        .map(|i| region_2d(rect(i * 2, i * 2 + 1, 0, 1, 0), 0))
        .collect();
    let mut pop = RegionPopulation::from_regions(regions, props(7, 1));
    pop.relabel(false);
    assert_eq!(pop.merge_all()?, 3);
    assert_eq!(sizes(&mut pop), vec![16]);
    Ok(())
}

// ============================================================================
// Local threshold
// ============================================================================

#[test]
fn test_local_threshold_splits_on_dim_neck() -> anyhow::Result<()> {
    common::log_setup::init_test_logging();
    let dumbbell = Dumbbell::new();
    let image = dumbbell.image();
    let mut pop = RegionPopulation::from_regions(
        vec![region_2d(dumbbell.voxels(), 1)],
        ImageProperties::of(&image),
    );

    let eroded = pop.local_threshold(&image, &LocalThresholdParams::default(), None)?;
    assert_eq!(eroded, 1);
    assert_eq!(sizes(&mut pop), vec![25, 9]);
    assert_eq!(pop.label_image().label(6, 2, 0), 0);
    assert_eq!(pop.label_image().label(9, 2, 0), 2);
    Ok(())
}

#[test]
fn test_local_threshold_keep_only_biggest() -> anyhow::Result<()> {
    let dumbbell = Dumbbell::new();
    let image = dumbbell.image();
    let mut pop = RegionPopulation::from_regions(
        vec![region_2d(dumbbell.voxels(), 1)],
        ImageProperties::of(&image),
    );
    let params = LocalThresholdParams {
        keep_only_biggest: true,
        ..Default::default()
    };

    pop.local_threshold(&image, &params, None)?;
    assert_eq!(sizes(&mut pop), vec![25]);
    Ok(())
}

#[test]
fn test_local_threshold_skips_uniform_regions() -> anyhow::Result<()> {
    let image = Image3::<f32>::from_fn(10, 3, 1, |_, _, _| 5.0);
    let mut pop = three_blocks();
    assert_eq!(pop.local_threshold(&image, &LocalThresholdParams::default(), None)?, 0);
    assert_eq!(sizes(&mut pop), vec![9, 9, 6]);
    Ok(())
}

#[test]
fn test_dilation_ties_go_to_lower_label() -> anyhow::Result<()> {
    let image = Image3::<f32>::from_fn(7, 5, 1, |_, _, _| 5.0);
    let make = || {
        RegionPopulation::from_regions(
            vec![
                region_2d(rect(2, 2, 2, 2, 0), 1),
                region_2d(rect(4, 4, 2, 2, 0), 2),
            ],
            ImageProperties::of(&image),
        )
    };
    let params = LocalThresholdParams {
        iqr_factor: 0.0,
        dilate_radius: 1.0,
        ..Default::default()
    };

    let mut pop = make();
    assert_eq!(pop.local_threshold(&image, &params, None)?, 0);
    assert_eq!(sizes(&mut pop), vec![5, 4]);
    assert_eq!(pop.label_image().label(3, 2, 0), 1);

    let mask = Image3::<u8>::from_fn(7, 5, 1, |_, y, _| (y != 1) as u8);
    let mut pop = make();
    pop.local_threshold(&image, &params, Some(&mask))?;
    assert_eq!(sizes(&mut pop), vec![4, 3]);
    Ok(())
}

// ============================================================================
// Smoothing
// ============================================================================

fn square_with_spike() -> RegionPopulation {
    let mut voxels = rect(2, 8, 2, 8, 0);
    voxels.insert(Voxel::new(9, 5, 0));
    RegionPopulation::from_regions(vec![region_2d(voxels, 1)], props(11, 11))
}

#[test]
fn test_smooth_erases_spike_and_corners() -> anyhow::Result<()> {
    let mut pop = square_with_spike();
    let changed = pop.smooth_regions(&SmoothParams::default(), None)?;
    assert_eq!(changed, 5);

    let region = &pop.regions()[0];
    assert_eq!(region.size(), 45);
    assert!(!region.contains(9, 5, 0));
    assert!(!region.contains(2, 2, 0));
    assert!(region.contains(3, 2, 0));
    Ok(())
}

#[test]
fn test_smooth_without_background_votes() -> anyhow::Result<()> {
    let mut pop = square_with_spike();
    let params = SmoothParams {
        erase_if_connected_to_background: false,
        ..Default::default()
    };
    assert_eq!(pop.smooth_regions(&params, None)?, 0);
    assert_eq!(pop.regions()[0].size(), 50);
    Ok(())
}

#[test]
fn test_smooth_rejects_loaded_bad_radius() -> anyhow::Result<()> {
    let mut pop = square_with_spike();
    let params: SmoothParams = serde_yml::from_str("radius: 0.25\n")?;
    assert!(matches!(
        pop.smooth_regions(&params, None),
        Err(Error::Config(ConfigError::Parameter { name: "radius", .. }))
    ));
    assert_eq!(pop.regions()[0].size(), 50);
    Ok(())
}

#[test]
fn test_smooth_moves_voxel_between_regions() -> anyhow::Result<()> {
    let mut left = rect(0, 4, 0, 4, 0);
    left.remove(&Voxel::new(4, 2, 0));
    let mut right = rect(5, 9, 0, 4, 0);
    right.insert(Voxel::new(4, 2, 0));
    let mut pop = RegionPopulation::from_regions(
        vec![region_2d(left, 1), region_2d(right, 2)],
        props(9, 4),
    );
    let params = SmoothParams {
        erase_if_connected_to_background: false,
        ..Default::default()
    };

    assert_eq!(pop.smooth_regions(&params, None)?, 1);
    assert_eq!(sizes(&mut pop), vec![25, 25]);
    assert_eq!(pop.label_image().label(4, 2, 0), 1);
    Ok(())
}

#[test]
fn test_ball_offsets() {
    assert_eq!(ball_offsets(1.0, true, 1.0).len(), 4);
    assert_eq!(ball_offsets(1.5, true, 1.0).len(), 8);
    assert_eq!(ball_offsets(1.0, false, 1.0).len(), 6);
    // z steps twice as long as xy
    assert_eq!(ball_offsets(1.5, false, 2.0).len(), 8);
}
