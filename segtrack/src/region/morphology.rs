//! Intensity-driven erosion and dilation of region boundaries.
//!
//! Both walk a priority queue ordered by the driving image value so the
//! voxels furthest across the threshold move first. Ties are broken by raster
//! order, which keeps results independent of hash iteration order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use super::contour::{connected_components, contour_of, outer_contour_of};
use super::Region;
use crate::error::{Result, StructuralError};
use crate::geometry::{Connectivity, Voxel, VoxelSet};
use crate::raster::{LabelImage, Raster};

/// Which side of the threshold a voxel must be on to be moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdSide {
    /// `value < threshold`; dimmest voxels first.
    Below,
    /// `value > threshold`; brightest voxels first.
    Above,
}

impl ThresholdSide {
    #[inline]
    pub fn crosses(self, value: f64, threshold: f64) -> bool {
        match self {
            ThresholdSide::Below => value < threshold,
            ThresholdSide::Above => value > threshold,
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: f64,
    voxel: Voxel,
    side: ThresholdSide,
}

impl Entry {
    fn priority(&self, other: &Self) -> Ordering {
        let by_value = match self.side {
            ThresholdSide::Below => other.value.total_cmp(&self.value),
            ThresholdSide::Above => self.value.total_cmp(&other.value),
        };
        by_value.then_with(|| other.voxel.cmp(&self.voxel))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority(other)
    }
}

impl Region {
    /// Peels boundary voxels whose image value is on `remove` side of
    /// `threshold`, moving inward through neighbors that also cross.
    ///
    /// `seed_contour` replaces the default contour as starting set and `stop`
    /// protects voxels from removal. When the remaining body falls apart,
    /// `keep_only_biggest` keeps the largest component, otherwise only
    /// single-voxel fragments are dropped. Returns whether anything changed.
    pub fn erode_contours(
        &mut self,
        image: &dyn Raster,
        threshold: f64,
        remove: ThresholdSide,
        keep_only_biggest: bool,
        seed_contour: Option<&VoxelSet>,
        stop: Option<&(dyn Fn(&Voxel) -> bool + Sync)>,
    ) -> Result<bool> {
        let connectivity = Connectivity::low(self.is_2d);
        let offsets = connectivity.offsets();
        let mut body = self.voxels_mut("erode_contours")?.clone();

        let eligible = |v: &Voxel| -> Option<f64> {
            let value = image.value_at(v)?;
            let stopped = stop.is_some_and(|stop| stop(v));
            (remove.crosses(value, threshold) && !stopped).then_some(value)
        };

        let seeds = match seed_contour {
            Some(seeds) => seeds.clone(),
            None => contour_of(&body, &offsets),
        };

        let mut heap = BinaryHeap::new();
        let mut queued = VoxelSet::new();
        for v in seeds {
            let Some(voxel) = body.get(&v).copied() else {
                continue;
            };
            if let Some(value) = eligible(&voxel) {
                queued.insert(voxel);
                heap.push(Entry {
                    value,
                    voxel,
                    side: remove,
                });
            }
        }

        let mut removed = 0usize;
        while let Some(Entry { voxel, .. }) = heap.pop() {
            if !body.remove(&voxel) {
                continue;
            }
            removed += 1;
            for o in &offsets {
                let Some(n) = body.get(&voxel.translated(*o)).copied() else {
                    continue;
                };
                if queued.contains(&n) {
                    continue;
                }
                if let Some(value) = eligible(&n) {
                    queued.insert(n);
                    heap.push(Entry {
                        value,
                        voxel: n,
                        side: remove,
                    });
                }
            }
        }

        if removed == 0 {
            return Ok(false);
        }

        let mut components = connected_components(&body, connectivity);
        if components.len() > 1 {
            body = if keep_only_biggest {
                components.swap_remove(0)
            } else {
                components.into_iter().filter(|c| c.len() > 1).flatten().collect()
            };
        }

        tracing::debug!(
            label = self.label,
            removed,
            remaining = body.len(),
            "eroded region contour"
        );
        *self.voxels_mut("erode_contours")? = body;
        Ok(true)
    }

    /// Grows the region outward into voxels whose image value is on `add`
    /// side of `threshold`, brightest (or dimmest) first.
    ///
    /// Growth stays inside the image and, when `labels` is given, never
    /// claims a voxel labelled by another region. `contour` replaces the
    /// default outer contour as starting set. Returns whether anything
    /// changed. An empty body needs an explicit `contour` to start from.
    pub fn dilate_contours(
        &mut self,
        image: &dyn Raster,
        threshold: f64,
        add: ThresholdSide,
        contour: Option<&VoxelSet>,
        labels: Option<&LabelImage>,
    ) -> Result<bool> {
        let is_2d = self.is_2d;
        let label = self.label;
        let offsets = Connectivity::low(is_2d).offsets();
        let mut body = self.voxels_mut("dilate_contours")?.clone();
        if body.is_empty() && contour.is_none() {
            return Err(StructuralError::EmptyBody {
                operation: "dilate_contours",
            }
            .into());
        }
        let plane = body.iter().next().map(|v| v.z);

        let eligible = |v: &Voxel| -> Option<f64> {
            if is_2d && plane.is_some_and(|z| z != v.z) {
                return None;
            }
            let value = image.value_at(v)?;
            let owner = labels.map_or(0, |l| l.label(v.x, v.y, v.z));
            (add.crosses(value, threshold) && (owner == 0 || owner == label)).then_some(value)
        };

        let seeds = match contour {
            Some(seeds) => seeds.clone(),
            None => outer_contour_of(&body, &offsets),
        };

        let mut heap = BinaryHeap::new();
        let mut queued = VoxelSet::new();
        for v in seeds {
            if body.contains(&v) {
                continue;
            }
            if let Some(value) = eligible(&v) {
                queued.insert(v);
                heap.push(Entry {
                    value,
                    voxel: v,
                    side: add,
                });
            }
        }

        let mut added = 0usize;
        while let Some(Entry { voxel, .. }) = heap.pop() {
            if !body.insert(voxel) {
                continue;
            }
            added += 1;
            for o in &offsets {
                let n = voxel.offset(o.x, o.y, o.z);
                if body.contains(&n) || queued.contains(&n) {
                    continue;
                }
                if let Some(value) = eligible(&n) {
                    queued.insert(n);
                    heap.push(Entry {
                        value,
                        voxel: n,
                        side: add,
                    });
                }
            }
        }

        if added == 0 {
            return Ok(false);
        }
        tracing::debug!(label, added, "dilated region contour");
        *self.voxels_mut("dilate_contours")? = body;
        Ok(true)
    }
}
