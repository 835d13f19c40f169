//! Persistence boundary for edited objects.

use std::collections::BTreeMap;

use super::{EditSummary, ObjectGraph, ObjectId, SegmentedObject};

/// Backing store fed with exactly the objects an edit session touched.
pub trait ObjectStore {
    fn upsert(&mut self, objects: &[&SegmentedObject]) -> anyhow::Result<()>;
    fn delete(&mut self, ids: &[ObjectId]) -> anyhow::Result<()>;
}

/// Store keeping copies in memory, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: BTreeMap<ObjectId, SegmentedObject>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ObjectId) -> Option<&SegmentedObject> {
        self.objects.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of objects written so far, upserts and deletions.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ObjectStore for MemoryStore {
    fn upsert(&mut self, objects: &[&SegmentedObject]) -> anyhow::Result<()> {
        for object in objects {
            self.objects.insert(object.id(), (*object).clone());
        }
        self.writes += objects.len();
        Ok(())
    }

    fn delete(&mut self, ids: &[ObjectId]) -> anyhow::Result<()> {
        for id in ids {
            self.objects.remove(id);
        }
        self.writes += ids.len();
        Ok(())
    }
}

impl EditSummary {
    /// Writes the touched objects of `graph` to `store`: created and
    /// modified ones are upserted, deleted ones removed. Returns the number
    /// of objects written.
    pub fn flush(&self, store: &mut dyn ObjectStore, graph: &ObjectGraph) -> anyhow::Result<usize> {
        let dirty: Vec<&SegmentedObject> = self.dirty().filter_map(|id| graph.get(id)).collect();
        let deleted: Vec<ObjectId> = self.deleted.iter().copied().collect();
        if !dirty.is_empty() {
            store.upsert(&dirty)?;
        }
        if !deleted.is_empty() {
            store.delete(&deleted)?;
        }
        tracing::debug!(upserted = dirty.len(), deleted = deleted.len(), "flushed edit summary");
        Ok(dirty.len() + deleted.len())
    }
}
