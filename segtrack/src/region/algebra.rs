//! Boolean algebra on region bodies.
//!
//! The receiver must support structural edits. The other operand may be any
//! shape: it is only read through containment or its materialized voxels.

use crate::error::{Result, TopologyError};
use crate::geometry::{Voxel, VoxelSet};

use super::Region;

impl Region {
    fn check_compatible(&self, other: &Region) -> Result<()> {
        if self.is_2d != other.is_2d {
            return Err(TopologyError::IncompatibleRegions("dimensionality").into());
        }
        if self.absolute_landmark != other.absolute_landmark {
            return Err(TopologyError::IncompatibleRegions("landmark").into());
        }
        Ok(())
    }

    pub fn add_voxels(&mut self, voxels: impl IntoIterator<Item = Voxel>) -> Result<()> {
        self.voxels_mut("add_voxels")?.extend(voxels);
        Ok(())
    }

    pub fn remove_voxels<'a>(&mut self, voxels: impl IntoIterator<Item = &'a Voxel>) -> Result<()> {
        let body = self.voxels_mut("remove_voxels")?;
        for v in voxels {
            body.remove(v);
        }
        Ok(())
    }

    /// Union with `other` in place.
    pub fn merge(&mut self, other: &Region) -> Result<()> {
        self.check_compatible(other)?;
        let added = other.voxels().iter().copied();
        self.voxels_mut("merge")?.extend(added);
        Ok(())
    }

    /// Fresh region holding the union of both bodies. Metadata comes from
    /// `a`; neither operand is modified.
    pub fn merged(a: &Region, b: &Region) -> Result<Region> {
        let mut union = a.clone();
        union.merge(b)?;
        Ok(union)
    }

    /// Keeps only voxels also contained in `other`.
    pub fn and(&mut self, other: &Region) -> Result<()> {
        self.check_compatible(other)?;
        self.voxels_mut("and")?.retain(|v| other.contains_voxel(v));
        Ok(())
    }

    /// Removes voxels contained in `other`.
    pub fn and_not(&mut self, other: &Region) -> Result<()> {
        self.check_compatible(other)?;
        self.voxels_mut("and_not")?.retain(|v| !other.contains_voxel(v));
        Ok(())
    }

    /// Voxels of the body as an owned set, for callers that rebuild regions.
    pub fn to_voxel_set(&self) -> VoxelSet {
        self.voxels().clone()
    }
}
