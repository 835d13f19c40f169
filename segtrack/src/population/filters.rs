//! Stock region predicates for [`RegionPopulation::apply`].

use super::{ImageProperties, RegionPopulation};
use crate::geometry::BoundingBox;
use crate::region::Region;

pub trait RegionFilter: Sync {
    /// Whether `region` stays in the population.
    fn keep(&self, region: &Region) -> bool;
}

/// Keeps regions whose voxel count lies within `[min, max]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Size {
    pub fn at_least(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl RegionFilter for Size {
    fn keep(&self, region: &Region) -> bool {
        let size = region.size();
        self.min.map_or(true, |min| size >= min) && self.max.map_or(true, |max| size <= max)
    }
}

/// Drops regions touching the sides of the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactBorder {
    pub bounds: BoundingBox,
    /// Ignore the first and last z-planes.
    pub ignore_z: bool,
}

impl ContactBorder {
    pub fn of(properties: &ImageProperties) -> Self {
        Self {
            bounds: properties.bounds,
            ignore_z: properties.is_2d,
        }
    }
}

impl RegionFilter for ContactBorder {
    fn keep(&self, region: &Region) -> bool {
        !region.bounds().is_on_border_of(&self.bounds, self.ignore_z)
    }
}

/// Keeps regions whose quality is at least the threshold. Unset (NaN)
/// quality never passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityAbove(pub f64);

impl RegionFilter for QualityAbove {
    fn keep(&self, region: &Region) -> bool {
        region.quality() >= self.0
    }
}

impl RegionPopulation {
    /// [`RegionPopulation::filter`] with a stock predicate.
    pub fn apply(&mut self, filter: &dyn RegionFilter) -> usize {
        self.filter(|region| filter.keep(region))
    }
}
