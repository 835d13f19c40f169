//! Geometry primitives shared by regions and populations.

mod bbox;
mod connectivity;
mod voxel;

pub use bbox::BoundingBox;
pub use connectivity::Connectivity;
pub use voxel::{sorted_voxels, Voxel, Voxel2D, VoxelSet};
