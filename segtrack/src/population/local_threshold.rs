//! Per-region intensity thresholding.
//!
//! Each region gets its own threshold from the distribution of the driving
//! image inside it (`median -/+ iqr_factor * IQR`) and is eroded against it.
//! Regions are processed in parallel; failures are collected and reported
//! once every region was attempted.

use common::parallel::par_map_partitioned_mut;
use hashbrown::HashMap;

use super::{ball_offsets, draw_region, RegionPopulation};
use crate::config::LocalThresholdParams;
use crate::error::{Error, Result};
use crate::geometry::{Connectivity, Voxel};
use crate::raster::Raster;
use crate::region::{Region, ThresholdSide};

impl RegionPopulation {
    /// Erodes each region against its own threshold over `erode_map`.
    ///
    /// With `dilate_radius > 0` the labels are first dilated into the
    /// background (restricted to the nonzero voxels of `mask` when given) and
    /// every region is thresholded. Without dilation a region is only eroded
    /// when at least one of its voxels already crosses the threshold. Pieces
    /// of a region that falls apart become new regions unless
    /// `keep_only_biggest` is set. Returns the number of eroded regions.
    pub fn local_threshold(
        &mut self,
        erode_map: &dyn Raster,
        params: &LocalThresholdParams,
        mask: Option<&dyn Raster>,
    ) -> Result<usize> {
        params.try_validate()?;
        let dilated = params.dilate_radius > 0.0;
        if dilated {
            let grown = self.dilate_labels(params.dilate_radius, mask)?;
            tracing::debug!(grown, radius = params.dilate_radius, "dilated labels");
        }

        let side = if params.dark_background {
            ThresholdSide::Below
        } else {
            ThresholdSide::Above
        };
        let connectivity = Connectivity::low(self.properties.is_2d);

        let regions = self.ensure_regions();
        let outcome = par_map_partitioned_mut(regions, |_, region| {
            threshold_region(region, erode_map, params, side, dilated, connectivity)
        });

        let attempted = outcome.attempted();
        let mut eroded = 0usize;
        let mut pieces = Vec::new();
        for (_, result) in outcome.ok {
            if let Some(split) = result {
                eroded += 1;
                pieces.extend(split);
            }
        }
        let split = pieces.len();
        regions.extend(pieces);

        let emptied = self.drop_empty();
        self.relabel(true);
        tracing::debug!(attempted, eroded, split, emptied, "local threshold");

        if !outcome.failed.is_empty() {
            tracing::warn!(failed = outcome.failed.len(), attempted, "local threshold failed");
        }
        Error::from_failures(attempted, outcome.failed)?;
        Ok(eroded)
    }

    /// Grows every label into background voxels within `radius`; a voxel
    /// reachable from several regions goes to the closest (lowest label on
    /// ties). Returns the number of claimed voxels.
    fn dilate_labels(&mut self, radius: f64, mask: Option<&dyn Raster>) -> Result<usize> {
        self.relabel(true);
        let is_2d = self.properties.is_2d;
        let z_aspect = self.properties.calibration.z_aspect_ratio();
        let offsets = ball_offsets(radius, is_2d, z_aspect);

        let mut labels = match self.labels.take() {
            Some(labels) => labels,
            None => self.draw_label_image(),
        };
        let regions = self.ensure_regions();

        let mut claims: HashMap<Voxel, (f64, u32)> = HashMap::new();
        for region in regions.iter() {
            let label = region.label();
            for c in region.contour() {
                for o in &offsets {
                    let p = c.translated(*o);
                    if labels.get_global(p.x, p.y, p.z) != Some(0.0) {
                        continue;
                    }
                    if mask.is_some_and(|m| !m.is_inside(p.x, p.y, p.z)) {
                        continue;
                    }
                    let zz = o.z as f64 * z_aspect;
                    let d2 = (o.x * o.x + o.y * o.y) as f64 + zz * zz;
                    let claim = claims.entry(p).or_insert((d2, label));
                    if d2 < claim.0 || (d2 == claim.0 && label < claim.1) {
                        *claim = (d2, label);
                    }
                }
            }
        }

        let mut per_label: HashMap<u32, Vec<Voxel>> = HashMap::new();
        for (p, (_, label)) in &claims {
            per_label.entry(*label).or_default().push(*p);
        }
        let result = per_label.into_iter().try_for_each(|(label, voxels)| {
            let region = &mut regions[label as usize - 1];
            region.add_voxels(voxels)?;
            draw_region(&mut labels, region, label);
            Ok::<(), Error>(())
        });
        self.labels = Some(labels);
        result?;
        Ok(claims.len())
    }
}

/// Returns the split-off pieces when the region was eroded, `None` when it
/// was left untouched.
fn threshold_region(
    region: &mut Region,
    erode_map: &dyn Raster,
    params: &LocalThresholdParams,
    side: ThresholdSide,
    dilated: bool,
    connectivity: Connectivity,
) -> Result<Option<Vec<Region>>> {
    let mut values: Vec<f64> = region
        .voxels()
        .iter()
        .filter_map(|v| erode_map.value_at(v))
        .collect();
    if values.is_empty() {
        return Ok(None);
    }
    values.sort_by(f64::total_cmp);

    let median = quantile(&values, 0.5);
    let iqr = quantile(&values, 0.75) - quantile(&values, 0.25);
    let threshold = match side {
        ThresholdSide::Below => median - params.iqr_factor * iqr,
        ThresholdSide::Above => median + params.iqr_factor * iqr,
    };

    if !dilated && !values.iter().any(|&v| side.crosses(v, threshold)) {
        return Ok(None);
    }
    if !region.erode_contours(erode_map, threshold, side, params.keep_only_biggest, None, None)? {
        return Ok(None);
    }

    let mut components = region.components(connectivity);
    if components.len() <= 1 {
        return Ok(Some(Vec::new()));
    }
    let rest = components.split_off(1);
    region.set_voxels(components.swap_remove(0))?;
    let pieces = rest
        .into_iter()
        .map(|voxels| Region::from_voxels(voxels, 0, region.is_2d(), region.calibration()))
        .collect();
    Ok(Some(pieces))
}

/// Linear-interpolated quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::quantile;

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.5), 2.5);
        assert_eq!(quantile(&values, 0.0), 1.0);
        assert_eq!(quantile(&values, 1.0), 4.0);
        assert!((quantile(&values, 0.25) - 1.75).abs() < 1e-12);
    }
}
