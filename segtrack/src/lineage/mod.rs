//! Temporal and hierarchical lineage of segmented objects.
//!
//! Objects live in an arena keyed by [`ObjectId`]; every relation (parent,
//! children, previous, next, trackhead) is an id into that arena, so cloning
//! the graph is a deep copy. Each frame has one root object (class `None`);
//! objects of a class hang below objects of its parent class as declared in
//! the [`ClassHierarchy`].
//!
//! The graph itself only answers queries. All mutation goes through an
//! [`ObjectEditor`] borrowed from [`ObjectGraph::editor`], which enforces the
//! link rules and records the touched ids.

mod editor;
mod object;
mod store;
mod track;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::config::ClassHierarchy;
use crate::error::TopologyError;

pub use editor::{EditSummary, ObjectEditor};
pub use object::{AttributeValue, ObjectId, SegmentedObject};
pub use store::{MemoryStore, ObjectStore};
pub use track::LinkState;

#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    objects: HashMap<ObjectId, SegmentedObject>,
    roots: BTreeMap<u32, ObjectId>,
    hierarchy: ClassHierarchy,
}

impl ObjectGraph {
    pub fn new(hierarchy: ClassHierarchy) -> Self {
        Self {
            objects: HashMap::new(),
            roots: BTreeMap::new(),
            hierarchy,
        }
    }

    #[inline]
    pub fn hierarchy(&self) -> &ClassHierarchy {
        &self.hierarchy
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Opens an edit session. The graph stays borrowed until the editor is
    /// finished or dropped.
    pub fn editor(&mut self) -> ObjectEditor<'_> {
        ObjectEditor::new(self)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SegmentedObject> {
        self.objects.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Like [`ObjectGraph::get`], but a missing id is an error.
    pub fn object(&self, id: ObjectId) -> Result<&SegmentedObject, TopologyError> {
        self.objects.get(&id).ok_or(TopologyError::UnknownObject(id))
    }

    pub(crate) fn object_mut(&mut self, id: ObjectId) -> Result<&mut SegmentedObject, TopologyError> {
        self.objects
            .get_mut(&id)
            .ok_or(TopologyError::UnknownObject(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SegmentedObject> {
        self.objects.values()
    }

    pub fn root(&self, frame: u32) -> Option<ObjectId> {
        self.roots.get(&frame).copied()
    }

    /// Frames with a root, ascending.
    pub fn frames(&self) -> impl Iterator<Item = u32> + '_ {
        self.roots.keys().copied()
    }

    // ========================================================================
    // Hierarchy queries
    // ========================================================================

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.objects.get(&id).and_then(|o| o.parent)
    }

    pub fn children(&self, id: ObjectId, class: usize) -> &[ObjectId] {
        self.objects.get(&id).map_or(&[], |o| o.children(class))
    }

    /// Every object of `class` at `frame`, grouped by parent in index order.
    pub fn objects_at_frame(&self, frame: u32, class: usize) -> Vec<ObjectId> {
        let Some(root) = self.root(frame) else {
            return Vec::new();
        };
        let mut path = vec![class];
        let mut current = class;
        while let Some(parent) = self.hierarchy.parent_of(current) {
            path.push(parent);
            current = parent;
        }

        let mut level = vec![root];
        for class in path.into_iter().rev() {
            level = level
                .iter()
                .flat_map(|id| self.children(*id, class).iter().copied())
                .collect();
        }
        level
    }

    /// `id` and all its descendants, parents before children.
    pub fn subtree(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = vec![id];
        let mut cursor = 0;
        while cursor < out.len() {
            if let Some(o) = self.objects.get(&out[cursor]) {
                out.extend(o.children.values().flatten().copied());
            }
            cursor += 1;
        }
        out
    }

    // ========================================================================
    // Track queries
    // ========================================================================

    pub fn trackhead_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.objects.get(&id).map(|o| o.trackhead)
    }

    pub fn link_state(&self, prev: ObjectId, next: ObjectId) -> Result<LinkState, TopologyError> {
        Ok(LinkState::of(self.object(prev)?, self.object(next)?))
    }

    /// The track starting at `head`, following double links only.
    pub fn track(&self, head: ObjectId) -> Vec<ObjectId> {
        let mut track = Vec::new();
        let mut current = self.objects.get(&head);
        while let Some(o) = current {
            track.push(o.id);
            current = o
                .next
                .and_then(|n| self.objects.get(&n))
                .filter(|n| n.previous == Some(o.id));
        }
        track
    }

    /// Trackheads of `class`, by frame then position.
    pub fn track_heads(&self, class: usize) -> Vec<ObjectId> {
        self.frames()
            .flat_map(|frame| self.objects_at_frame(frame, class))
            .filter(|id| self.objects.get(id).is_some_and(SegmentedObject::is_trackhead))
            .collect()
    }

    /// Objects whose `next` is `id`, in id order.
    pub fn predecessors(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .objects
            .values()
            .filter(|o| o.next == Some(id))
            .map(|o| o.id)
            .collect();
        ids.sort();
        ids
    }

    /// Objects whose `previous` is `id`, in id order.
    pub fn successors(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .objects
            .values()
            .filter(|o| o.previous == Some(id))
            .map(|o| o.id)
            .collect();
        ids.sort();
        ids
    }

    /// First object of the unbroken double-linked chain ending at `id`.
    pub(crate) fn chain_start(&self, id: ObjectId) -> ObjectId {
        let mut current = id;
        while let Some(prev) = self
            .objects
            .get(&current)
            .and_then(|o| o.previous)
            .and_then(|p| self.objects.get(&p))
            .filter(|p| p.next == Some(current))
        {
            current = prev.id;
        }
        current
    }

    /// Checks that every link target exists and every trackhead matches the
    /// start of its double-linked chain.
    pub fn validate_track_invariants(&self) -> Result<(), TopologyError> {
        let mut ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        ids.sort();
        for id in ids {
            let o = &self.objects[&id];
            for target in [o.previous, o.next].into_iter().flatten() {
                if !self.objects.contains_key(&target) {
                    return Err(TopologyError::DanglingLink { object: id, target });
                }
            }
            let expected = self.chain_start(id);
            if o.trackhead != expected {
                return Err(TopologyError::TrackheadMismatch {
                    object: id,
                    expected,
                    found: o.trackhead,
                });
            }
        }
        Ok(())
    }
}
