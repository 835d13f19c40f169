//! Region list and label raster kept in agreement.
//!
//! A [`RegionPopulation`] is built from either side. Whichever side is
//! missing is derived on first access: regions from the raster as the
//! connected components of each label, the raster from the regions by
//! drawing each one at its label. Bulk operations take `&mut self`, so writers are serialized per
//! population.

mod filters;
mod labeling;
mod local_threshold;
mod merge;
mod smooth;

#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use common::parallel::par_map_partitioned;
use glam::IVec3;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::geometry::{BoundingBox, Connectivity, Voxel, VoxelSet};
use crate::raster::{Calibration, LabelImage, Raster};
use crate::region::{connected_components, Region};

pub use filters::{ContactBorder, QualityAbove, RegionFilter, Size};
pub use labeling::label_components;

/// Footprint shared by the regions and the label raster of a population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageProperties {
    pub bounds: BoundingBox,
    pub calibration: Calibration,
    pub is_2d: bool,
}

impl ImageProperties {
    pub fn new(bounds: BoundingBox, calibration: Calibration, is_2d: bool) -> Self {
        Self {
            bounds,
            calibration,
            is_2d,
        }
    }

    pub fn of(raster: &dyn Raster) -> Self {
        Self::new(raster.bounding_box(), raster.calibration(), raster.is_2d())
    }
}

#[derive(Debug, Clone)]
pub struct RegionPopulation {
    regions: Option<Vec<Region>>,
    labels: Option<LabelImage>,
    properties: ImageProperties,
    connectivity: Connectivity,
}

impl RegionPopulation {
    /// Population whose list is the source of truth.
    pub fn from_regions(regions: Vec<Region>, properties: ImageProperties) -> Self {
        Self {
            regions: Some(regions),
            labels: None,
            connectivity: Connectivity::low(properties.is_2d),
            properties,
        }
    }

    /// Population whose raster is the source of truth.
    pub fn from_label_image(labels: LabelImage) -> Self {
        let properties = ImageProperties::of(&labels);
        Self {
            regions: None,
            labels: Some(labels),
            connectivity: Connectivity::low(properties.is_2d),
            properties,
        }
    }

    /// Connected-component labels of every positive voxel of `mask`.
    pub fn from_mask(mask: &dyn Raster, connectivity: Connectivity) -> Self {
        let (labels, count) = label_components(mask, connectivity);
        tracing::debug!(count, %connectivity, "labeled mask components");
        Self::from_label_image(labels).with_connectivity(connectivity)
    }

    /// Neighborhood used when scanning the raster for touching labels.
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    #[inline]
    pub fn properties(&self) -> &ImageProperties {
        &self.properties
    }

    #[inline]
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn has_label_image(&self) -> bool {
        self.labels.is_some()
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    pub fn regions(&mut self) -> &[Region] {
        self.ensure_regions()
    }

    /// Mutable access to the list. The raster is dropped and redrawn on the
    /// next [`RegionPopulation::label_image`] call.
    pub fn regions_mut(&mut self) -> &mut [Region] {
        self.ensure_regions();
        self.labels = None;
        self.regions.get_or_insert_with(Vec::new)
    }

    pub fn into_regions(mut self) -> Vec<Region> {
        self.ensure_regions();
        self.regions.take().unwrap_or_default()
    }

    pub fn label_image(&mut self) -> &LabelImage {
        let labels = match self.labels.take() {
            Some(labels) => labels,
            None => self.draw_label_image(),
        };
        self.labels.insert(labels)
    }

    pub fn len(&mut self) -> usize {
        self.ensure_regions().len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    pub fn region(&mut self, label: u32) -> Option<&Region> {
        self.ensure_regions().iter().find(|r| r.label() == label)
    }

    /// Derives the list from the raster when absent. A label whose voxels
    /// form several components yields one region per component; the extra
    /// components get fresh labels, repainted into the raster.
    fn ensure_regions(&mut self) -> &mut Vec<Region> {
        if self.regions.is_none() {
            let regions = match &mut self.labels {
                Some(labels) => regions_from_labels(labels, &self.properties, self.connectivity),
                None => Vec::new(),
            };
            self.regions = Some(regions);
        }
        self.regions.get_or_insert_with(Vec::new)
    }

    /// Raster covering the population footprint, or the union of region
    /// bounds when the footprint is unknown.
    fn draw_label_image(&mut self) -> LabelImage {
        let calibration = self.properties.calibration;
        let mut footprint = self.properties.bounds;
        let regions = self.ensure_regions();
        if footprint.is_empty() {
            footprint = regions
                .iter()
                .fold(BoundingBox::empty(), |acc, r| acc.union(&r.bounds()));
        }
        if footprint.is_empty() {
            footprint = BoundingBox::new(0, 0, 0, 0, 0, 0);
        }
        let max_label = regions.iter().map(Region::label).max().unwrap_or(0);
        let mut labels = LabelImage::covering(&footprint, calibration, max_label);
        for region in regions.iter() {
            draw_region(&mut labels, region, region.label());
        }
        labels
    }

    /// Labels `1..=n` in list order. With `fill_image` the raster is redrawn
    /// (widening its pixel type when needed), otherwise it is dropped.
    pub fn relabel(&mut self, fill_image: bool) {
        let regions = self.ensure_regions();
        for (idx, region) in regions.iter_mut().enumerate() {
            region.set_label(idx as u32 + 1);
        }
        if fill_image {
            self.redraw();
        } else {
            self.labels = None;
        }
    }

    /// Repaints the raster from the list, keeping its footprint.
    fn redraw(&mut self) {
        let Some(mut labels) = self.labels.take() else {
            self.labels = Some(self.draw_label_image());
            return;
        };
        let regions = self.ensure_regions();
        let max_label = regions.iter().map(Region::label).max().unwrap_or(0);
        labels.ensure_capacity(max_label);
        labels.clear();
        for region in regions.iter() {
            draw_region(&mut labels, region, region.label());
        }
        self.labels = Some(labels);
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Appends `region` with the next free label and returns that label.
    pub fn add_region(&mut self, mut region: Region) -> u32 {
        let regions = self.ensure_regions();
        let label = regions.iter().map(Region::label).max().unwrap_or(0) + 1;
        region.set_label(label);
        if let Some(labels) = &mut self.labels {
            draw_region(labels, &region, label);
        }
        self.ensure_regions().push(region);
        label
    }

    /// Removes the regions with the given labels and relabels.
    pub fn remove_regions(&mut self, labels: &[u32]) -> usize {
        self.filter(|r| !labels.contains(&r.label()))
    }

    /// Reorders the list and relabels in the new order.
    pub fn sort_by(&mut self, compare: impl FnMut(&Region, &Region) -> Ordering) {
        self.ensure_regions().sort_by(compare);
        let fill = self.labels.is_some();
        self.relabel(fill);
    }

    /// Keeps regions for which `predicate` holds, evaluated in parallel.
    /// Removed regions vanish from the raster and the rest are relabelled.
    /// Returns the number of removed regions.
    pub fn filter<P>(&mut self, predicate: P) -> usize
    where
        P: Fn(&Region) -> bool + Sync,
    {
        let fill = self.labels.is_some();
        let regions = std::mem::take(self.ensure_regions());
        let keep: Vec<bool> = regions.par_iter().map(&predicate).collect();
        let before = regions.len();
        let kept: Vec<Region> = regions
            .into_iter()
            .zip(keep)
            .filter_map(|(region, keep)| keep.then_some(region))
            .collect();
        let removed = before - kept.len();
        self.regions = Some(kept);
        self.relabel(fill);
        removed
    }

    /// Like [`RegionPopulation::filter`] with a fallible predicate. Every
    /// region is evaluated; regions whose predicate failed are kept and the
    /// failures are returned together as [`Error::Batch`].
    pub fn try_filter<P>(&mut self, predicate: P) -> Result<usize>
    where
        P: Fn(&Region) -> Result<bool> + Sync,
    {
        let fill = self.labels.is_some();
        let regions = std::mem::take(self.ensure_regions());
        let outcome = par_map_partitioned(&regions, |_, region| predicate(region));

        let mut keep = vec![true; regions.len()];
        for &(idx, k) in &outcome.ok {
            keep[idx] = k;
        }
        let attempted = outcome.attempted();
        let kept: Vec<Region> = regions
            .into_iter()
            .zip(keep)
            .filter_map(|(region, keep)| keep.then_some(region))
            .collect();
        let removed = attempted - kept.len();
        self.regions = Some(kept);
        self.relabel(fill);

        if !outcome.failed.is_empty() {
            tracing::warn!(
                failed = outcome.failed.len(),
                attempted,
                "region predicate failed"
            );
        }
        Error::from_failures(attempted, outcome.failed)?;
        Ok(removed)
    }

    /// New population holding copies of the regions matching `predicate`,
    /// labels unchanged.
    pub fn subset<P>(&mut self, predicate: P) -> RegionPopulation
    where
        P: Fn(&Region) -> bool,
    {
        let properties = self.properties;
        let connectivity = self.connectivity;
        let regions = self
            .ensure_regions()
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        RegionPopulation::from_regions(regions, properties).with_connectivity(connectivity)
    }

    /// Drops regions left without voxels.
    fn drop_empty(&mut self) -> usize {
        let regions = self.ensure_regions();
        let before = regions.len();
        regions.retain(|r| !r.is_empty());
        before - regions.len()
    }
}

fn draw_region(labels: &mut LabelImage, region: &Region, label: u32) {
    labels.ensure_capacity(label);
    for v in region.voxels() {
        labels.set_label(v.x, v.y, v.z, label);
    }
}

fn regions_from_labels(
    labels: &mut LabelImage,
    properties: &ImageProperties,
    connectivity: Connectivity,
) -> Vec<Region> {
    let mut groups: BTreeMap<u32, VoxelSet> = BTreeMap::new();
    let offset = labels.offset();
    for z in 0..labels.size_z() {
        for y in 0..labels.size_y() {
            for x in 0..labels.size_x() {
                let label = labels.get_pixel(x, y, z) as u32;
                if label != 0 {
                    let p = offset + IVec3::new(x as i32, y as i32, z as i32);
                    groups.entry(label).or_default().insert(Voxel::from_ivec(p));
                }
            }
        }
    }

    let mut next_label = groups.keys().next_back().copied().unwrap_or(0) + 1;
    let mut regions = Vec::with_capacity(groups.len());
    let mut extra = Vec::new();
    for (label, voxels) in groups {
        let mut components = connected_components(&voxels, connectivity).into_iter();
        let Some(largest) = components.next() else {
            continue;
        };
        regions.push(Region::from_voxels(
            largest,
            label,
            properties.is_2d,
            properties.calibration,
        ));
        for component in components {
            tracing::debug!(
                label,
                new_label = next_label,
                size = component.len(),
                "split disconnected label"
            );
            extra.push(Region::from_voxels(
                component,
                next_label,
                properties.is_2d,
                properties.calibration,
            ));
            next_label += 1;
        }
    }
    for region in &extra {
        draw_region(labels, region, region.label());
    }
    regions.extend(extra);
    regions
}

/// Integer offsets within `radius` xy pixels, z scaled by `z_aspect`,
/// excluding the origin.
pub(crate) fn ball_offsets(radius: f64, is_2d: bool, z_aspect: f64) -> Vec<IVec3> {
    let r = radius.floor() as i32;
    let rz = if is_2d { 0 } else { (radius / z_aspect).floor() as i32 };
    let r2 = radius * radius;
    let mut offsets = Vec::new();
    for dz in -rz..=rz {
        for dy in -r..=r {
            for dx in -r..=r {
                let zz = dz as f64 * z_aspect;
                let d2 = (dx * dx + dy * dy) as f64 + zz * zz;
                if d2 <= r2 && (dx, dy, dz) != (0, 0, 0) {
                    offsets.push(IVec3::new(dx, dy, dz));
                }
            }
        }
    }
    offsets
}
