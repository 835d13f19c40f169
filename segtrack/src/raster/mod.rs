//! Raster abstraction consumed by regions and populations.
//!
//! The core never owns image I/O; it only needs pixel access, the raster
//! footprint in global coordinates and the calibration. [`Image3`] is the
//! stock dense implementation and [`LabelImage`] the label raster that
//! widens its pixel type on demand.

mod image;
mod label_image;


use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, Voxel};

pub use image::{Image3, Pixel};
pub use label_image::{LabelImage, LabelPixelType};

/// Physical size of a voxel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Size of a pixel in x and y.
    pub scale_xy: f64,
    /// Distance between two z-planes.
    pub scale_z: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            scale_xy: 1.0,
            scale_z: 1.0,
        }
    }
}

impl Calibration {
    pub fn new(scale_xy: f64, scale_z: f64) -> Self {
        assert!(scale_xy > 0.0, "scale_xy must be positive, got {}", scale_xy);
        assert!(scale_z > 0.0, "scale_z must be positive, got {}", scale_z);
        Self { scale_xy, scale_z }
    }

    /// How many xy pixels one z step spans.
    #[inline]
    pub fn z_aspect_ratio(&self) -> f64 {
        self.scale_z / self.scale_xy
    }
}

/// Opaque voxel raster.
///
/// Local coordinates run over `[0, size)`; global coordinates are local
/// coordinates shifted by [`Raster::offset`]. `0` is background, positive
/// values are foreground or labels.
pub trait Raster: Send + Sync {
    fn size_x(&self) -> usize;
    fn size_y(&self) -> usize;
    fn size_z(&self) -> usize;

    /// Global position of local voxel (0, 0, 0).
    fn offset(&self) -> IVec3;

    fn get_pixel(&self, x: usize, y: usize, z: usize) -> f64;
    fn set_pixel(&mut self, x: usize, y: usize, z: usize, value: f64);

    /// Largest value the pixel type can hold.
    fn capacity(&self) -> f64;

    fn calibration(&self) -> Calibration;

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_size(self.size_x(), self.size_y(), self.size_z()).translate(self.offset())
    }

    fn is_2d(&self) -> bool {
        self.size_z() == 1
    }

    /// Global-coordinate lookup, `None` outside the raster.
    ///
    /// A single-plane raster answers for every z, so 2D images can drive 3D
    /// queries and vice versa.
    fn get_global(&self, x: i32, y: i32, z: i32) -> Option<f64> {
        let offset = self.offset();
        let lx = x - offset.x;
        let ly = y - offset.y;
        let lz = if self.size_z() == 1 { 0 } else { z - offset.z };
        if lx < 0 || ly < 0 || lz < 0 {
            return None;
        }
        let (lx, ly, lz) = (lx as usize, ly as usize, lz as usize);
        if lx >= self.size_x() || ly >= self.size_y() || lz >= self.size_z() {
            return None;
        }
        Some(self.get_pixel(lx, ly, lz))
    }

    #[inline]
    fn value_at(&self, v: &Voxel) -> Option<f64> {
        self.get_global(v.x, v.y, v.z)
    }

    /// Nonzero test used when a raster acts as a mask.
    #[inline]
    fn is_inside(&self, x: i32, y: i32, z: i32) -> bool {
        self.get_global(x, y, z).is_some_and(|v| v != 0.0)
    }

    /// Global-coordinate write. Returns false outside the raster.
    fn set_global(&mut self, x: i32, y: i32, z: i32, value: f64) -> bool {
        let offset = self.offset();
        let lx = x - offset.x;
        let ly = y - offset.y;
        let lz = if self.size_z() == 1 { 0 } else { z - offset.z };
        if lx < 0 || ly < 0 || lz < 0 {
            return false;
        }
        let (lx, ly, lz) = (lx as usize, ly as usize, lz as usize);
        if lx >= self.size_x() || ly >= self.size_y() || lz >= self.size_z() {
            return false;
        }
        self.set_pixel(lx, ly, lz, value);
        true
    }
}
