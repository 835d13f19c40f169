//! Hierarchy edits: roots, children, merge, split and deletion.

use std::collections::BTreeSet;

use glam::IVec3;
use hashbrown::HashSet;

use super::ObjectEditor;
use crate::error::{Error, TopologyError};
use crate::lineage::{ObjectId, SegmentedObject};
use crate::population::RegionPopulation;
use crate::region::Region;

impl ObjectEditor<'_> {
    /// Creates the root object of `frame`, usually a region covering the
    /// whole image.
    pub fn create_root(&mut self, frame: u32, region: Region) -> Result<ObjectId, TopologyError> {
        if self.graph.roots.contains_key(&frame) {
            return Err(TopologyError::DuplicateRoot(frame));
        }
        let root = SegmentedObject::new(None, frame, 0, region, None);
        let id = root.id;
        self.graph.objects.insert(id, root);
        self.graph.roots.insert(frame, id);
        self.summary.record_created(id);
        Ok(id)
    }

    /// Replaces the children of `class` under `parent` with one new object
    /// per region of `population`, indexed in list order. Former children
    /// are deleted together with their subtrees.
    pub fn set_children(
        &mut self,
        parent: ObjectId,
        class: usize,
        population: RegionPopulation,
    ) -> Result<Vec<ObjectId>, Error> {
        let hierarchy = self.graph.hierarchy();
        if hierarchy.get(class).is_none() {
            return Err(TopologyError::UnknownClass(class).into());
        }
        let p = self.graph.object(parent)?;
        if hierarchy.parent_of(class) != p.class {
            return Err(TopologyError::ParentClassMismatch { class, parent }.into());
        }
        let frame = p.frame;
        let former = p.children(class).to_vec();
        self.delete(&former)?;

        let mut ids = Vec::new();
        for (index, mut region) in population.into_regions().into_iter().enumerate() {
            region.set_label(index as u32 + 1);
            let child = SegmentedObject::new(Some(class), frame, index, region, Some(parent));
            ids.push(child.id);
            self.summary.record_created(child.id);
            self.graph.objects.insert(child.id, child);
        }
        self.graph.object_mut(parent)?.children.insert(class, ids.clone());
        self.summary.record_modified(parent);

        tracing::debug!(?parent, class, frame, count = ids.len(), "set children");
        Ok(ids)
    }

    /// Renumbers the children of `class` under `parent` to `0..n` in their
    /// current index order; region labels follow as `index + 1`.
    pub fn reindex_children(&mut self, parent: ObjectId, class: usize) -> Result<(), TopologyError> {
        let mut ordered = Vec::new();
        for &id in self.graph.object(parent)?.children(class) {
            ordered.push((self.graph.object(id)?.index, id));
        }
        ordered.sort();

        for (pos, &(_, id)) in ordered.iter().enumerate() {
            let o = self.graph.object_mut(id)?;
            if o.index != pos || o.region.label() != pos as u32 + 1 {
                o.index = pos;
                o.region.set_label(pos as u32 + 1);
                self.summary.record_modified(id);
            }
        }
        let ids = ordered.into_iter().map(|(_, id)| id).collect();
        self.graph.object_mut(parent)?.children.insert(class, ids);
        Ok(())
    }

    /// Deletes `ids` and their subtrees.
    ///
    /// Surviving predecessors lose their `next`, surviving followers lose
    /// their `previous` and start a new track. Sibling indices are left as
    /// they are; see [`ObjectEditor::reindex_children`].
    pub fn delete(&mut self, ids: &[ObjectId]) -> Result<usize, TopologyError> {
        for &id in ids {
            self.graph.object(id)?;
        }
        let mut doomed = Vec::new();
        let mut seen = HashSet::new();
        for &id in ids {
            for d in self.graph.subtree(id) {
                if seen.insert(d) {
                    doomed.push(d);
                }
            }
        }

        for &d in &doomed {
            for p in self.leaders_of(d) {
                if !seen.contains(&p) && self.graph.object(p)?.next == Some(d) {
                    self.set_next(p, None)?;
                }
            }
            for x in self.followers_of(d) {
                if seen.contains(&x) {
                    continue;
                }
                if self.graph.object(x)?.previous == Some(d) {
                    self.set_previous(x, None)?;
                }
                self.push_trackhead(x, x)?;
            }
        }

        for &d in &doomed {
            let Some(o) = self.graph.objects.remove(&d) else {
                continue;
            };
            match o.parent {
                Some(parent) if !seen.contains(&parent) => {
                    if let Some(parent) = self.graph.objects.get_mut(&parent) {
                        for list in parent.children.values_mut() {
                            list.retain(|c| *c != d);
                        }
                        self.summary.record_modified(parent.id);
                    }
                }
                Some(_) => {}
                None => {
                    self.graph.roots.retain(|_, root| *root != d);
                }
            }
            self.summary.record_deleted(d);
        }

        tracing::debug!(requested = ids.len(), deleted = doomed.len(), "deleted objects");
        Ok(doomed.len())
    }

    /// Folds `other` into `id`: regions are unioned, children of `other` are
    /// appended to `id`, links that pointed at `other` now point at `id`,
    /// and `other` is removed. Both must share class, frame and parent.
    pub fn merge(&mut self, id: ObjectId, other: ObjectId) -> Result<(), Error> {
        if id == other {
            return Err(TopologyError::SelfReference(id).into());
        }
        let a = self.graph.object(id)?;
        let b = self.graph.object(other)?;
        if a.class != b.class {
            return Err(TopologyError::ClassMismatch {
                first: id,
                second: other,
            }
            .into());
        }
        if a.frame != b.frame || a.parent != b.parent {
            return Err(TopologyError::MergeMismatch {
                first: id,
                second: other,
            }
            .into());
        }
        let merged = Region::merged(&a.region, &b.region)?;
        let (a_origin, b_origin) = (a.region.bounds().origin(), b.region.bounds().origin());
        let merged_origin = merged.bounds().origin();
        let own: Vec<ObjectId> = a.children.values().flatten().copied().collect();
        let adopted = b.children.clone();
        let (b_previous, b_next) = (b.previous, b.next);
        let size = merged.size();

        self.graph.object_mut(id)?.region = merged;
        self.summary.record_modified(id);
        for kid in own {
            self.reframe(kid, a_origin, merged_origin)?;
        }

        for (class, kids) in adopted {
            let mut offset = 0;
            for &sibling in self.graph.object(id)?.children(class) {
                offset = offset.max(self.graph.object(sibling)?.index + 1);
            }
            for (i, &kid) in kids.iter().enumerate() {
                let k = self.graph.object_mut(kid)?;
                k.parent = Some(id);
                k.index = offset + i;
                self.summary.record_modified(kid);
                self.reframe(kid, b_origin, merged_origin)?;
            }
            self.graph
                .object_mut(id)?
                .children
                .entry(class)
                .or_default()
                .extend(kids);
            self.reindex_children(id, class)?;
        }
        self.graph.object_mut(other)?.children.clear();

        for p in self.graph.predecessors(other) {
            self.set_next(p, Some(id))?;
        }
        for x in self.graph.successors(other) {
            self.set_previous(x, Some(id))?;
        }
        let a = self.graph.object(id)?;
        let (a_previous, a_next) = (a.previous, a.next);
        if a_previous.is_none() {
            self.set_previous(id, b_previous.filter(|p| *p != id))?;
        }
        if a_next.is_none() {
            self.set_next(id, b_next.filter(|n| *n != id))?;
        }
        self.set_next(other, None)?;
        self.set_previous(other, None)?;

        self.delete(&[other])?;
        self.propagate_trackhead(id)?;
        for x in self.followers_of(id) {
            self.propagate_trackhead(x)?;
        }

        tracing::debug!(?id, ?other, size, "merged objects");
        Ok(())
    }

    /// Splits `id` along the regions of `population`.
    ///
    /// The first region replaces the region of `id` in place, keeping its
    /// identity and links. Each further region becomes a new sibling at the
    /// lowest unused index. Children of `id` move to whichever of the
    /// resulting objects their region overlaps most (ties stay with `id`);
    /// parent-relative child regions are re-expressed against their owner's
    /// new origin. Returns `id` followed by the new objects.
    pub fn split(&mut self, id: ObjectId, population: RegionPopulation) -> Result<Vec<ObjectId>, Error> {
        let o = self.graph.object(id)?;
        let Some(parent) = o.parent else {
            return Err(TopologyError::SplitRoot(id).into());
        };
        let mut regions = population.into_regions();
        if regions.is_empty() {
            return Err(TopologyError::EmptySplit(id).into());
        }
        let (class, frame, label) = (o.class, o.frame, o.region.label());
        let origin = o.region.bounds().origin();
        let grandchildren: Vec<(usize, ObjectId)> = o
            .children
            .iter()
            .flat_map(|(class, kids)| kids.iter().map(move |k| (*class, *k)))
            .collect();
        let class_idx = class.ok_or(TopologyError::SplitRoot(id))?;

        let mut first = regions.remove(0);
        first.set_label(label);
        self.graph.object_mut(id)?.region = first;
        self.summary.record_modified(id);

        let mut used: BTreeSet<usize> = self
            .graph
            .object(parent)?
            .children(class_idx)
            .iter()
            .filter_map(|s| self.graph.get(*s).map(|s| s.index))
            .collect();
        let mut owners = vec![id];
        for mut region in regions {
            let index = (0..).find(|i| !used.contains(i)).unwrap_or(used.len());
            used.insert(index);
            region.set_label(index as u32 + 1);
            let sibling = SegmentedObject::new(class, frame, index, region, Some(parent));
            owners.push(sibling.id);
            self.summary.record_created(sibling.id);
            self.graph.objects.insert(sibling.id, sibling);
        }

        let mut siblings = Vec::new();
        let listed = self.graph.object(parent)?.children(class_idx).iter();
        for &s in listed.chain(&owners[1..]) {
            siblings.push((self.graph.object(s)?.index, s));
        }
        siblings.sort();
        self.graph
            .object_mut(parent)?
            .children
            .insert(class_idx, siblings.into_iter().map(|(_, s)| s).collect());
        self.summary.record_modified(parent);

        let mut moved = 0usize;
        let mut touched_classes = BTreeSet::new();
        for (child_class, g) in grandchildren {
            touched_classes.insert(child_class);
            let owner = self.best_owner(g, &owners, origin)?;
            let owner_origin = self.graph.object(owner)?.region.bounds().origin();
            self.reframe(g, origin, owner_origin)?;
            if owner == id {
                continue;
            }
            let o = self.graph.object_mut(id)?;
            if let Some(list) = o.children.get_mut(&child_class) {
                list.retain(|k| *k != g);
            }
            self.graph
                .object_mut(owner)?
                .children
                .entry(child_class)
                .or_default()
                .push(g);
            self.graph.object_mut(g)?.parent = Some(owner);
            self.summary.record_modified(g);
            self.summary.record_modified(owner);
            moved += 1;
        }
        for &owner in &owners {
            for &child_class in &touched_classes {
                self.reindex_children(owner, child_class)?;
            }
        }

        tracing::debug!(?id, pieces = owners.len(), moved, "split object");
        Ok(owners)
    }

    /// Keeps a parent-relative child region in place after its parent's
    /// origin moved from `from` to `to`.
    fn reframe(&mut self, child: ObjectId, from: IVec3, to: IVec3) -> Result<(), TopologyError> {
        if from == to {
            return Ok(());
        }
        let region = &mut self.graph.object_mut(child)?.region;
        if region.absolute_landmark() {
            return Ok(());
        }
        region.to_absolute(from);
        region.to_relative(to);
        self.summary.record_modified(child);
        Ok(())
    }

    /// Owner whose region overlaps the region of `child` most. Relative
    /// child regions are placed at `origin`, the pre-split parent origin.
    fn best_owner(
        &self,
        child: ObjectId,
        owners: &[ObjectId],
        origin: IVec3,
    ) -> Result<ObjectId, TopologyError> {
        let region = &self.graph.object(child)?.region;
        let offset = (!region.absolute_landmark()).then_some(origin);
        let mut best = (owners[0], f64::NEG_INFINITY);
        for &owner in owners {
            let overlap = region.overlap_area(&self.graph.object(owner)?.region, offset, None);
            if overlap > best.1 {
                best = (owner, overlap);
            }
        }
        Ok(best.0)
    }
}
