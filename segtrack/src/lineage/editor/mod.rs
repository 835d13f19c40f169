//! Edit session over an [`ObjectGraph`].
//!
//! The editor is the only writer of track links and hierarchy. Every call
//! validates its arguments before touching the graph and records which
//! objects it created, modified or deleted; [`ObjectEditor::finish`] hands
//! that record back so a store can persist exactly those objects.

mod links;
mod structure;

use std::collections::BTreeSet;

use super::{AttributeValue, ObjectGraph, ObjectId};
use crate::error::TopologyError;
use crate::region::Region;

/// Ids touched by one edit session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSummary {
    pub created: BTreeSet<ObjectId>,
    pub modified: BTreeSet<ObjectId>,
    pub deleted: BTreeSet<ObjectId>,
}

impl EditSummary {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Created and modified ids, the objects a store must upsert.
    pub fn dirty(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.created.union(&self.modified).copied()
    }

    fn record_created(&mut self, id: ObjectId) {
        self.created.insert(id);
    }

    fn record_modified(&mut self, id: ObjectId) {
        if !self.created.contains(&id) {
            self.modified.insert(id);
        }
    }

    fn record_deleted(&mut self, id: ObjectId) {
        self.modified.remove(&id);
        // created and deleted in the same session: the store never saw it
        if !self.created.remove(&id) {
            self.deleted.insert(id);
        }
    }
}

pub struct ObjectEditor<'g> {
    graph: &'g mut ObjectGraph,
    summary: EditSummary,
}

impl<'g> ObjectEditor<'g> {
    pub(super) fn new(graph: &'g mut ObjectGraph) -> Self {
        Self {
            graph,
            summary: EditSummary::default(),
        }
    }

    pub fn graph(&self) -> &ObjectGraph {
        self.graph
    }

    pub fn summary(&self) -> &EditSummary {
        &self.summary
    }

    pub fn finish(self) -> EditSummary {
        tracing::debug!(
            created = self.summary.created.len(),
            modified = self.summary.modified.len(),
            deleted = self.summary.deleted.len(),
            "edit session finished"
        );
        self.summary
    }

    pub fn set_region(&mut self, id: ObjectId, region: Region) -> Result<(), TopologyError> {
        self.graph.object_mut(id)?.region = region;
        self.summary.record_modified(id);
        Ok(())
    }

    pub fn set_attribute(
        &mut self,
        id: ObjectId,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Result<(), TopologyError> {
        self.graph
            .object_mut(id)?
            .attributes
            .insert(key.into(), value.into());
        self.summary.record_modified(id);
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: ObjectId, key: &str) -> Result<Option<AttributeValue>, TopologyError> {
        let removed = self.graph.object_mut(id)?.attributes.remove(key);
        if removed.is_some() {
            self.summary.record_modified(id);
        }
        Ok(removed)
    }

    pub fn set_measurement(&mut self, id: ObjectId, key: impl Into<String>, value: f64) -> Result<(), TopologyError> {
        self.graph
            .object_mut(id)?
            .measurements
            .insert(key.into(), value);
        self.summary.record_modified(id);
        Ok(())
    }

    // ========================================================================
    // Internal link plumbing
    // ========================================================================

    fn set_next(&mut self, id: ObjectId, next: Option<ObjectId>) -> Result<(), TopologyError> {
        let o = self.graph.object_mut(id)?;
        if o.next != next {
            o.next = next;
            self.summary.record_modified(id);
        }
        Ok(())
    }

    fn set_previous(&mut self, id: ObjectId, previous: Option<ObjectId>) -> Result<(), TopologyError> {
        let o = self.graph.object_mut(id)?;
        if o.previous != previous {
            o.previous = previous;
            self.summary.record_modified(id);
        }
        Ok(())
    }

    fn set_trackhead(&mut self, id: ObjectId, trackhead: ObjectId) -> Result<(), TopologyError> {
        let o = self.graph.object_mut(id)?;
        if o.trackhead != trackhead {
            o.trackhead = trackhead;
            self.summary.record_modified(id);
        }
        Ok(())
    }

    /// Recomputes the trackhead of `start` from its predecessor, then pushes
    /// it down the double-linked continuation until the chain breaks.
    fn propagate_trackhead(&mut self, start: ObjectId) -> Result<(), TopologyError> {
        let o = self.graph.object(start)?;
        let head = match o.previous.and_then(|p| self.graph.get(p)) {
            Some(p) if p.next == Some(start) => p.trackhead,
            _ => start,
        };
        self.push_trackhead(start, head)
    }

    /// Assigns `head` to `start` and its double-linked continuation.
    fn push_trackhead(&mut self, start: ObjectId, head: ObjectId) -> Result<(), TopologyError> {
        let mut current = start;
        loop {
            self.set_trackhead(current, head)?;
            let o = self.graph.object(current)?;
            match o.next.and_then(|n| self.graph.get(n)) {
                Some(n) if n.previous == Some(current) => current = n.id,
                _ => return Ok(()),
            }
        }
    }
}
