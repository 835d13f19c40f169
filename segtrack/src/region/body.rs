//! Raster encodings of a region body.

use common::Buffer3;
use glam::IVec3;

use super::outline::Outline;
use crate::geometry::{BoundingBox, Voxel, VoxelSet};
use crate::raster::{Calibration, Raster};

/// The authoritative body of a raster-backed region.
#[derive(Debug, Clone)]
pub enum Body {
    Voxels(VoxelSet),
    Mask(Mask),
    Outline(Outline),
}

impl Body {
    pub(super) fn translated(&self, offset: IVec3) -> Body {
        match self {
            Body::Voxels(voxels) => Body::Voxels(voxels.iter().map(|v| v.translated(offset)).collect()),
            Body::Mask(mask) => Body::Mask(mask.translated(offset)),
            Body::Outline(outline) => Body::Outline(outline.translated(offset)),
        }
    }
}

/// Binary raster whose origin is the global position of local voxel (0, 0, 0).
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    origin: IVec3,
    buffer: Buffer3<bool>,
}

impl Mask {
    pub fn new(origin: IVec3, buffer: Buffer3<bool>) -> Self {
        Self { origin, buffer }
    }

    /// Tight mask around `voxels`. An empty set yields a zero-sized mask.
    pub fn from_voxels(voxels: &VoxelSet) -> Self {
        let bounds = BoundingBox::from_voxels(voxels);
        if bounds.is_empty() {
            return Self::new(IVec3::ZERO, Buffer3::new(0, 0, 0, Vec::new()));
        }
        let mut buffer = Buffer3::new_default(bounds.size_x(), bounds.size_y(), bounds.size_z());
        let origin = bounds.origin();
        for v in voxels {
            let local = v.ivec() - origin;
            *buffer.get_mut(local.x as usize, local.y as usize, local.z as usize) = true;
        }
        Self { origin, buffer }
    }

    #[inline]
    pub fn origin(&self) -> IVec3 {
        self.origin
    }

    #[inline]
    pub fn buffer(&self) -> &Buffer3<bool> {
        &self.buffer
    }

    /// Footprint of the mask raster.
    pub fn bounds(&self) -> BoundingBox {
        if self.buffer.is_empty() {
            return BoundingBox::empty();
        }
        self.bounding_box()
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        let local = IVec3::new(x, y, z) - self.origin;
        if local.x < 0 || local.y < 0 || local.z < 0 {
            return false;
        }
        let (lx, ly, lz) = (local.x as usize, local.y as usize, local.z as usize);
        lx < self.buffer.width()
            && ly < self.buffer.height()
            && lz < self.buffer.depth()
            && *self.buffer.get(lx, ly, lz)
    }

    /// Membership on the mask's first plane, ignoring z.
    #[inline]
    pub fn contains_2d(&self, x: i32, y: i32) -> bool {
        self.contains(x, y, self.origin.z)
    }

    pub fn count(&self) -> usize {
        self.buffer.iter().filter(|&&set| set).count()
    }

    pub fn voxels(&self) -> VoxelSet {
        let mut voxels = VoxelSet::with_capacity(self.count());
        for (idx, &set) in self.buffer.iter().enumerate() {
            if set {
                let (x, y, z) = self.buffer.coords(idx);
                voxels.insert(Voxel::new(
                    self.origin.x + x as i32,
                    self.origin.y + y as i32,
                    self.origin.z + z as i32,
                ));
            }
        }
        voxels
    }

    pub fn translated(&self, offset: IVec3) -> Mask {
        Mask {
            origin: self.origin + offset,
            buffer: self.buffer.clone(),
        }
    }
}

impl Raster for Mask {
    fn size_x(&self) -> usize {
        self.buffer.width()
    }

    fn size_y(&self) -> usize {
        self.buffer.height()
    }

    fn size_z(&self) -> usize {
        self.buffer.depth()
    }

    fn offset(&self) -> IVec3 {
        self.origin
    }

    fn get_pixel(&self, x: usize, y: usize, z: usize) -> f64 {
        if *self.buffer.get(x, y, z) {
            1.0
        } else {
            0.0
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, z: usize, value: f64) {
        *self.buffer.get_mut(x, y, z) = value != 0.0;
    }

    fn capacity(&self) -> f64 {
        1.0
    }

    fn calibration(&self) -> Calibration {
        Calibration::default()
    }
}
