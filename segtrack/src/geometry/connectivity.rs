//! Voxel neighborhoods.

use glam::IVec3;
use serde::{Deserialize, Serialize};

/// Voxel connectivity used by contour extraction, labeling and merging.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum Connectivity {
    /// 2D, edge neighbors only.
    Four,
    /// 2D, edge and corner neighbors.
    Eight,
    /// 3D, face neighbors only.
    Six,
    /// 3D, face and edge neighbors.
    Eighteen,
    /// 3D, face, edge and corner neighbors.
    TwentySix,
}

impl Connectivity {
    /// Face/edge-only neighborhood for the given dimensionality.
    #[inline]
    pub const fn low(is_2d: bool) -> Self {
        if is_2d {
            Connectivity::Four
        } else {
            Connectivity::Six
        }
    }

    /// Full neighborhood for the given dimensionality.
    #[inline]
    pub const fn high(is_2d: bool) -> Self {
        if is_2d {
            Connectivity::Eight
        } else {
            Connectivity::TwentySix
        }
    }

    #[inline]
    pub const fn is_2d(self) -> bool {
        matches!(self, Connectivity::Four | Connectivity::Eight)
    }

    /// Maximum number of non-zero offset components a neighbor may have.
    #[inline]
    const fn max_nonzero(self) -> u32 {
        match self {
            Connectivity::Four | Connectivity::Six => 1,
            Connectivity::Eight | Connectivity::Eighteen => 2,
            Connectivity::TwentySix => 3,
        }
    }

    /// All neighbor offsets, in raster order.
    pub fn offsets(self) -> Vec<IVec3> {
        let z_range = if self.is_2d() { 0..=0 } else { -1..=1 };
        let max_nonzero = self.max_nonzero();
        let mut offsets = Vec::with_capacity(26);
        for dz in z_range {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let nonzero = (dx != 0) as u32 + (dy != 0) as u32 + (dz != 0) as u32;
                    if nonzero > 0 && nonzero <= max_nonzero {
                        offsets.push(IVec3::new(dx, dy, dz));
                    }
                }
            }
        }
        offsets
    }

    /// Neighbors already visited by a raster-order (z, y, x) scan.
    ///
    /// Every neighboring pair is seen exactly once when each voxel only looks
    /// at these offsets.
    pub fn half_offsets(self) -> Vec<IVec3> {
        self.offsets()
            .into_iter()
            .filter(|o| o.z < 0 || (o.z == 0 && (o.y < 0 || (o.y == 0 && o.x < 0))))
            .collect()
    }
}
