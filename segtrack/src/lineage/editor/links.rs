//! Track-link rules.
//!
//! A class that allows neither merge nor split keeps at most one link per
//! side: linking replaces whatever conflicted. A class that allows division
//! (split) or fusion (merge) keeps the competing links and degrades the new
//! edge to a single direction, so only unambiguous edges are double links.

use super::ObjectEditor;
use crate::error::TopologyError;
use crate::lineage::{LinkState, ObjectId};

impl ObjectEditor<'_> {
    /// Links `prev` to the later object `next`.
    ///
    /// Both must share the object class and `next.frame > prev.frame`.
    /// Without merge or split allowed for the class, conflicting links on
    /// either side are removed first. With split allowed and `prev` already
    /// continuing elsewhere, `next` only points back to `prev` and every
    /// follower of `prev` starts its own track. With merge allowed and `next`
    /// already reached from elsewhere, only `prev` points forward and `next`
    /// starts its own track. Otherwise a double link is made when
    /// `allow_double_link` is set (the trackhead flows down the chain), or a
    /// previous-only link when it is not.
    pub fn link_objects(
        &mut self,
        prev: ObjectId,
        next: ObjectId,
        allow_double_link: bool,
    ) -> Result<LinkState, TopologyError> {
        if prev == next {
            return Err(TopologyError::SelfReference(prev));
        }
        let p = self.graph.object(prev)?;
        let n = self.graph.object(next)?;
        if p.class != n.class {
            return Err(TopologyError::ClassMismatch {
                first: prev,
                second: next,
            });
        }
        if n.frame <= p.frame {
            return Err(TopologyError::FrameOrder {
                prev,
                prev_frame: p.frame,
                next,
                next_frame: n.frame,
            });
        }
        let (allow_merge, allow_split) = p
            .class
            .and_then(|c| self.graph.hierarchy().get(c))
            .map_or((false, false), |c| (c.allow_merge, c.allow_split));

        let mut competing_next = self.followers_of(prev);
        competing_next.retain(|&x| x != next);
        let mut competing_prev = self.leaders_of(next);
        competing_prev.retain(|&y| y != prev);

        if !allow_split {
            for x in competing_next.drain(..) {
                self.unlink_objects(prev, x)?;
            }
        }
        if !allow_merge {
            for y in competing_prev.drain(..) {
                self.unlink_objects(y, next)?;
            }
        }

        let state = if !competing_next.is_empty() {
            // division: nobody continues prev's track
            self.set_next(prev, None)?;
            for x in competing_next {
                self.propagate_trackhead(x)?;
            }
            self.set_previous(next, Some(prev))?;
            LinkState::OnewayPrevious
        } else if !competing_prev.is_empty() {
            // fusion: next starts a new track
            self.set_previous(next, None)?;
            self.set_next(prev, Some(next))?;
            LinkState::OnewayNext
        } else if allow_double_link {
            self.set_next(prev, Some(next))?;
            self.set_previous(next, Some(prev))?;
            LinkState::DoubleLinked
        } else {
            if self.graph.object(prev)?.next == Some(next) {
                self.set_next(prev, None)?;
            }
            self.set_previous(next, Some(prev))?;
            LinkState::OnewayPrevious
        };
        self.propagate_trackhead(next)?;

        tracing::debug!(?prev, ?next, %state, "linked objects");
        Ok(state)
    }

    /// Removes the links between `prev` and `next` in both directions.
    /// `next` starts a new track, propagated down its chain.
    pub fn unlink_objects(&mut self, prev: ObjectId, next: ObjectId) -> Result<(), TopologyError> {
        let was_double = self.graph.link_state(prev, next)?.is_double();
        if self.graph.object(prev)?.next == Some(next) {
            self.set_next(prev, None)?;
        }
        if self.graph.object(next)?.previous == Some(prev) {
            self.set_previous(next, None)?;
        }
        if was_double {
            self.push_trackhead(next, next)?;
        }
        tracing::debug!(?prev, ?next, "unlinked objects");
        Ok(())
    }

    /// Severs the backward (`prev`) and/or forward (`next`) links of `id`.
    ///
    /// Severing backward makes `id` its own trackhead; severing forward makes
    /// every former follower start a track. With `propagate` the new
    /// trackheads are pushed down their double-linked chains; without it only
    /// the severed objects themselves are updated.
    pub fn reset_track_links(
        &mut self,
        id: ObjectId,
        prev: bool,
        next: bool,
        propagate: bool,
    ) -> Result<(), TopologyError> {
        self.graph.object(id)?;
        if prev {
            for p in self.leaders_of(id) {
                if self.graph.object(p)?.next == Some(id) {
                    self.set_next(p, None)?;
                }
            }
            self.set_previous(id, None)?;
            self.restart_track(id, propagate)?;
        }
        if next {
            let followers = self.followers_of(id);
            self.set_next(id, None)?;
            for x in followers {
                if self.graph.object(x)?.previous == Some(id) {
                    self.set_previous(x, None)?;
                }
                self.restart_track(x, propagate)?;
            }
        }
        Ok(())
    }

    pub(super) fn restart_track(&mut self, id: ObjectId, propagate: bool) -> Result<(), TopologyError> {
        if propagate {
            self.push_trackhead(id, id)
        } else {
            self.set_trackhead(id, id)
        }
    }

    /// Objects linked forward from `id`: its `next` and everything pointing
    /// back to it.
    pub(super) fn followers_of(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut ids = self.graph.successors(id);
        if let Some(n) = self.graph.get(id).and_then(|o| o.next) {
            if !ids.contains(&n) {
                ids.push(n);
            }
        }
        ids
    }

    /// Objects linked backward from `id`: its `previous` and everything
    /// pointing forward to it.
    pub(super) fn leaders_of(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut ids = self.graph.predecessors(id);
        if let Some(p) = self.graph.get(id).and_then(|o| o.previous) {
            if !ids.contains(&p) {
                ids.push(p);
            }
        }
        ids
    }
}
