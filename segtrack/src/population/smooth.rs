//! Majority-vote smoothing of region borders.

use hashbrown::HashMap;

use super::{ball_offsets, RegionPopulation};
use crate::config::SmoothParams;
use crate::error::Result;
use crate::geometry::Voxel;
use crate::raster::{LabelImage, Raster};

impl RegionPopulation {
    /// Reassigns each border voxel to the label holding the majority of its
    /// neighborhood (ball of `params.radius`).
    ///
    /// Votes are read from a snapshot of the raster taken at the start of
    /// each pass, so the result does not depend on region order. A tie with
    /// the current label keeps it; ties between other labels go to the lower
    /// one. Background counts as a candidate only when
    /// `erase_if_connected_to_background` is set. Neighbors outside `mask`
    /// (nonzero voxels) do not vote. Passes repeat until nothing changes or
    /// `max_iterations` is reached. Returns the number of reassigned voxels.
    pub fn smooth_regions(&mut self, params: &SmoothParams, mask: Option<&dyn Raster>) -> Result<usize> {
        params.try_validate()?;
        self.relabel(true);
        let z_aspect = self.properties.calibration.z_aspect_ratio();
        let offsets = ball_offsets(params.radius, self.properties.is_2d, z_aspect);

        let mut labels = match self.labels.take() {
            Some(labels) => labels,
            None => self.draw_label_image(),
        };
        let outcome = self.smooth_passes(&mut labels, &offsets, params, mask);
        self.labels = Some(labels);
        let (changed, iterations) = outcome?;

        let emptied = self.drop_empty();
        self.relabel(true);
        tracing::debug!(changed, iterations, emptied, "smoothed regions");
        Ok(changed)
    }

    fn smooth_passes(
        &mut self,
        labels: &mut LabelImage,
        offsets: &[glam::IVec3],
        params: &SmoothParams,
        mask: Option<&dyn Raster>,
    ) -> Result<(usize, usize)> {
        let regions = self.ensure_regions();
        let mut changed = 0usize;
        let mut iterations = 0usize;

        while iterations < params.max_iterations {
            iterations += 1;
            let snapshot = labels.clone();
            let mut moves: Vec<(Voxel, u32, u32)> = Vec::new();

            for region in regions.iter() {
                let current = region.label();
                for v in region.contour() {
                    let winner = vote(&snapshot, &v, current, offsets, params, mask);
                    if winner != current {
                        moves.push((v, current, winner));
                    }
                }
            }
            if moves.is_empty() {
                break;
            }

            let mut removed: HashMap<u32, Vec<Voxel>> = HashMap::new();
            let mut added: HashMap<u32, Vec<Voxel>> = HashMap::new();
            for &(v, from, to) in &moves {
                removed.entry(from).or_default().push(v);
                if to != 0 {
                    added.entry(to).or_default().push(v);
                }
                labels.set_label(v.x, v.y, v.z, to);
            }
            for (label, voxels) in removed {
                regions[label as usize - 1].remove_voxels(voxels.iter())?;
            }
            for (label, voxels) in added {
                regions[label as usize - 1].add_voxels(voxels)?;
            }
            changed += moves.len();
        }

        if iterations == params.max_iterations {
            tracing::debug!(iterations, "smoothing stopped before convergence");
        }
        Ok((changed, iterations))
    }
}

/// Winning label for `v` among its neighbors in `snapshot`.
fn vote(
    snapshot: &LabelImage,
    v: &Voxel,
    current: u32,
    offsets: &[glam::IVec3],
    params: &SmoothParams,
    mask: Option<&dyn Raster>,
) -> u32 {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for o in offsets {
        let n = v.translated(*o);
        if snapshot.get_global(n.x, n.y, n.z).is_none() {
            continue;
        }
        if mask.is_some_and(|m| !m.is_inside(n.x, n.y, n.z)) {
            continue;
        }
        let label = snapshot.label(n.x, n.y, n.z);
        if label == 0 && !params.erase_if_connected_to_background {
            continue;
        }
        *counts.entry(label).or_default() += 1;
    }

    let own = counts.get(&current).copied().unwrap_or(0);
    let best = counts
        .iter()
        .filter(|(&label, _)| label != current)
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)));
    match best {
        Some((&label, &count)) if count > own => label,
        _ => current,
    }
}
