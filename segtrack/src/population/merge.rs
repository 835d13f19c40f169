//! Merging of touching regions through a raster scan.

use glam::IVec3;
use hashbrown::HashMap;

use super::{draw_region, RegionPopulation};
use crate::error::Result;
use crate::raster::{LabelImage, Raster};
use crate::region::Region;

impl RegionPopulation {
    /// Unions every pair of touching regions where at least one label is
    /// `>= from_label` (`None` merges everything that touches).
    ///
    /// `from_label` is compared against the labels the caller assigned; they
    /// are only renumbered when they are not usable as keys (zero or
    /// duplicated). Scans the raster in (z, y, x) order over the half
    /// neighborhood of the population connectivity. A merged pair becomes a
    /// fresh region in the lower label's slot and the raster is repainted at
    /// that label. Passes repeat until one finds nothing, then the population
    /// is relabelled. Returns the number of merges.
    pub fn merge_all_connected(&mut self, from_label: Option<u32>) -> Result<usize> {
        if !has_unique_labels(self.ensure_regions()) {
            self.relabel(true);
        }
        let from = from_label.unwrap_or(0);
        let half = self.connectivity.half_offsets();

        let mut labels = match self.labels.take() {
            Some(labels) => labels,
            None => self.draw_label_image(),
        };
        let mut slots: Vec<Option<Region>> = std::mem::take(self.ensure_regions())
            .into_iter()
            .map(Some)
            .collect();
        let slot_of: HashMap<u32, usize> = slots
            .iter()
            .enumerate()
            .filter_map(|(idx, r)| r.as_ref().map(|r| (r.label(), idx)))
            .collect();

        let outcome = merge_touching(&mut slots, &slot_of, &mut labels, &half, from);

        self.regions = Some(slots.into_iter().flatten().collect());
        self.labels = Some(labels);
        self.relabel(true);
        outcome
    }

    /// Merges every group of touching regions into one region.
    pub fn merge_all(&mut self) -> Result<usize> {
        self.merge_all_connected(None)
    }
}

fn has_unique_labels(regions: &[Region]) -> bool {
    let mut seen = hashbrown::HashSet::with_capacity(regions.len());
    regions.iter().all(|r| r.label() != 0 && seen.insert(r.label()))
}

/// Raster passes until nothing touches. `slot_of` maps a label to its slot.
fn merge_touching(
    slots: &mut [Option<Region>],
    slot_of: &HashMap<u32, usize>,
    labels: &mut LabelImage,
    half: &[IVec3],
    from: u32,
) -> Result<usize> {
    let (sx, sy, sz) = (labels.size_x(), labels.size_y(), labels.size_z());
    let origin = labels.offset();
    let mut merges = 0usize;
    loop {
        let mut merged_in_pass = 0usize;
        for z in 0..sz {
            for y in 0..sy {
                for x in 0..sx {
                    let p = origin + IVec3::new(x as i32, y as i32, z as i32);
                    let mut current = labels.label(p.x, p.y, p.z);
                    if current == 0 {
                        continue;
                    }
                    for o in half {
                        let q = p + *o;
                        let neighbor = labels.label(q.x, q.y, q.z);
                        if neighbor == 0 || neighbor == current {
                            continue;
                        }
                        if current < from && neighbor < from {
                            continue;
                        }
                        let (keep, drop) = (current.min(neighbor), current.max(neighbor));
                        let (Some(&keep_slot), Some(&drop_slot)) = (slot_of.get(&keep), slot_of.get(&drop))
                        else {
                            continue;
                        };
                        let (Some(kept), Some(dropped)) = (&slots[keep_slot], &slots[drop_slot]) else {
                            continue;
                        };
                        let merged = Region::merged(kept, dropped)?;
                        tracing::debug!(keep, drop, size = merged.size(), "merged touching regions");
                        draw_region(labels, &merged, keep);
                        slots[keep_slot] = Some(merged);
                        slots[drop_slot] = None;
                        current = keep;
                        merged_in_pass += 1;
                    }
                }
            }
        }
        merges += merged_in_pass;
        if merged_in_pass == 0 {
            return Ok(merges);
        }
    }
}
