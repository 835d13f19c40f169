//! Integer voxel coordinates with a value payload.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use glam::{DVec3, IVec3};

/// Voxel set used as the authoritative body of raster regions.
pub type VoxelSet = hashbrown::HashSet<Voxel>;

/// A voxel at integer coordinates carrying a float payload.
///
/// Equality, hashing and ordering only look at the coordinates. Ordering is
/// raster order: `z`, then `y`, then `x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Voxel {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub value: f32,
}

impl Voxel {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self {
            x,
            y,
            z,
            value: 0.0,
        }
    }

    #[inline]
    pub const fn with_value(x: i32, y: i32, z: i32, value: f32) -> Self {
        Self { x, y, z, value }
    }

    #[inline]
    pub fn from_ivec(p: IVec3) -> Self {
        Self::new(p.x, p.y, p.z)
    }

    #[inline]
    pub fn ivec(&self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }

    #[inline]
    pub fn dvec(&self) -> DVec3 {
        DVec3::new(self.x as f64, self.y as f64, self.z as f64)
    }

    #[inline]
    pub fn translated(&self, offset: IVec3) -> Self {
        Self::with_value(
            self.x + offset.x,
            self.y + offset.y,
            self.z + offset.z,
            self.value,
        )
    }

    #[inline]
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Projection that ignores z for equality.
    #[inline]
    pub fn to_2d(&self) -> Voxel2D {
        Voxel2D {
            x: self.x,
            y: self.y,
            value: self.value,
        }
    }

    /// Squared calibrated distance.
    #[inline]
    pub fn dist_sq(&self, other: &Voxel, scale_xy: f64, scale_z: f64) -> f64 {
        let dx = (self.x - other.x) as f64 * scale_xy;
        let dy = (self.y - other.y) as f64 * scale_xy;
        let dz = (self.z - other.z) as f64 * scale_z;
        dx * dx + dy * dy + dz * dz
    }

    #[inline]
    pub fn dist(&self, other: &Voxel, scale_xy: f64, scale_z: f64) -> f64 {
        self.dist_sq(other, scale_xy, scale_z).sqrt()
    }

    /// Squared distance in the xy plane, in pixels.
    #[inline]
    pub fn dist_sq_2d(&self, other: &Voxel) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        dx * dx + dy * dy
    }
}

impl PartialEq for Voxel {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y && self.z == other.z
    }
}

impl Eq for Voxel {}

impl Hash for Voxel {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.hash(state);
        self.y.hash(state);
        self.z.hash(state);
    }
}

impl Ord for Voxel {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.z
            .cmp(&other.z)
            .then(self.y.cmp(&other.y))
            .then(self.x.cmp(&other.x))
    }
}

impl PartialOrd for Voxel {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// 2D voxel: a 3D voxel and its projection compare equal in 2D contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Voxel2D {
    pub x: i32,
    pub y: i32,
    pub value: f32,
}

impl Voxel2D {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y, value: 0.0 }
    }

    #[inline]
    pub fn to_3d(&self, z: i32) -> Voxel {
        Voxel::with_value(self.x, self.y, z, self.value)
    }
}

impl PartialEq for Voxel2D {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Eq for Voxel2D {}

impl Hash for Voxel2D {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.hash(state);
        self.y.hash(state);
    }
}

impl Ord for Voxel2D {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.y.cmp(&other.y).then(self.x.cmp(&other.x))
    }
}

impl PartialOrd for Voxel2D {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Voxel> for Voxel2D {
    fn from(v: Voxel) -> Self {
        v.to_2d()
    }
}

/// Voxels of `set` sorted in raster order.
pub fn sorted_voxels(set: &VoxelSet) -> Vec<Voxel> {
    let mut voxels: Vec<Voxel> = set.iter().copied().collect();
    voxels.sort_unstable();
    voxels
}
