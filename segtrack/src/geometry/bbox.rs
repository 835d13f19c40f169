//! Axis-aligned integer bounding box.

use glam::{DVec3, IVec3};

use super::voxel::Voxel;

/// Axis-aligned bounding box with inclusive `i32` bounds.
///
/// A voxel at (x, y, z) is inside if every coordinate lies within
/// `[min, max]`. The empty box has inverted bounds so that `include`
/// sets the first bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
    pub z_min: i32,
    pub z_max: i32,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    #[inline]
    pub const fn new(x_min: i32, x_max: i32, y_min: i32, y_max: i32, z_min: i32, z_max: i32) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
            z_min,
            z_max,
        }
    }

    /// Box spanning `[0, size)` on each axis.
    #[inline]
    pub const fn from_size(size_x: usize, size_y: usize, size_z: usize) -> Self {
        Self::new(
            0,
            size_x as i32 - 1,
            0,
            size_y as i32 - 1,
            0,
            size_z as i32 - 1,
        )
    }

    #[inline]
    pub const fn empty() -> Self {
        Self {
            x_min: i32::MAX,
            x_max: i32::MIN,
            y_min: i32::MAX,
            y_max: i32::MIN,
            z_min: i32::MAX,
            z_max: i32::MIN,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.x_min > self.x_max || self.y_min > self.y_max || self.z_min > self.z_max
    }

    #[inline]
    pub fn include(&mut self, x: i32, y: i32, z: i32) {
        self.x_min = self.x_min.min(x);
        self.x_max = self.x_max.max(x);
        self.y_min = self.y_min.min(y);
        self.y_max = self.y_max.max(y);
        self.z_min = self.z_min.min(z);
        self.z_max = self.z_max.max(z);
    }

    #[inline]
    pub fn include_voxel(&mut self, v: &Voxel) {
        self.include(v.x, v.y, v.z);
    }

    pub fn from_voxels<'a>(voxels: impl IntoIterator<Item = &'a Voxel>) -> Self {
        let mut bbox = Self::empty();
        for v in voxels {
            bbox.include_voxel(v);
        }
        bbox
    }

    #[inline]
    pub const fn size_x(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.x_max - self.x_min + 1) as usize
        }
    }

    #[inline]
    pub const fn size_y(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.y_max - self.y_min + 1) as usize
        }
    }

    #[inline]
    pub const fn size_z(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.z_max - self.z_min + 1) as usize
        }
    }

    #[inline]
    pub const fn volume(&self) -> usize {
        self.size_x() * self.size_y() * self.size_z()
    }

    #[inline]
    pub fn origin(&self) -> IVec3 {
        IVec3::new(self.x_min, self.y_min, self.z_min)
    }

    #[inline]
    pub fn center(&self) -> DVec3 {
        DVec3::new(
            (self.x_min as f64 + self.x_max as f64) / 2.0,
            (self.y_min as f64 + self.y_max as f64) / 2.0,
            (self.z_min as f64 + self.z_max as f64) / 2.0,
        )
    }

    #[inline]
    pub const fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= self.x_min
            && x <= self.x_max
            && y >= self.y_min
            && y <= self.y_max
            && z >= self.z_min
            && z <= self.z_max
    }

    #[inline]
    pub const fn contains_2d(&self, x: i32, y: i32) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    #[inline]
    pub fn contains_voxel(&self, v: &Voxel) -> bool {
        self.contains(v.x, v.y, v.z)
    }

    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        other.is_empty()
            || (self.contains(other.x_min, other.y_min, other.z_min)
                && self.contains(other.x_max, other.y_max, other.z_max))
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        BoundingBox::new(
            self.x_min.min(other.x_min),
            self.x_max.max(other.x_max),
            self.y_min.min(other.y_min),
            self.y_max.max(other.y_max),
            self.z_min.min(other.z_min),
            self.z_max.max(other.z_max),
        )
    }

    /// Overlapping part of both boxes, `None` when they are disjoint.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let bbox = BoundingBox::new(
            self.x_min.max(other.x_min),
            self.x_max.min(other.x_max),
            self.y_min.max(other.y_min),
            self.y_max.min(other.y_max),
            self.z_min.max(other.z_min),
            self.z_max.min(other.z_max),
        );
        (!bbox.is_empty()).then_some(bbox)
    }

    #[inline]
    pub fn translate(&self, offset: IVec3) -> BoundingBox {
        if self.is_empty() {
            return *self;
        }
        BoundingBox::new(
            self.x_min + offset.x,
            self.x_max + offset.x,
            self.y_min + offset.y,
            self.y_max + offset.y,
            self.z_min + offset.z,
            self.z_max + offset.z,
        )
    }

    /// Same xy extent with the z range replaced.
    #[inline]
    pub fn with_z_range(&self, z_min: i32, z_max: i32) -> BoundingBox {
        BoundingBox {
            z_min,
            z_max,
            ..*self
        }
    }

    /// Projection onto the plane `z = 0`.
    #[inline]
    pub fn flatten_z(&self) -> BoundingBox {
        self.with_z_range(0, 0)
    }

    /// Grows every side by `dxy` in x/y and `dz` in z.
    pub fn dilated(&self, dxy: i32, dz: i32) -> BoundingBox {
        if self.is_empty() {
            return *self;
        }
        BoundingBox::new(
            self.x_min - dxy,
            self.x_max + dxy,
            self.y_min - dxy,
            self.y_max + dxy,
            self.z_min - dz,
            self.z_max + dz,
        )
    }

    /// True when the box touches a side of `outer` (z sides ignored for 2D).
    pub fn is_on_border_of(&self, outer: &BoundingBox, ignore_z: bool) -> bool {
        let xy = self.x_min <= outer.x_min
            || self.x_max >= outer.x_max
            || self.y_min <= outer.y_min
            || self.y_max >= outer.y_max;
        if ignore_z {
            xy
        } else {
            xy || self.z_min <= outer.z_min || self.z_max >= outer.z_max
        }
    }

    /// Every integer position of the box in raster order.
    pub fn iter(&self) -> impl Iterator<Item = IVec3> + '_ {
        let bbox = *self;
        (bbox.z_min..=bbox.z_max).flat_map(move |z| {
            (bbox.y_min..=bbox.y_max)
                .flat_map(move |y| (bbox.x_min..=bbox.x_max).map(move |x| IVec3::new(x, y, z)))
        })
    }
}
