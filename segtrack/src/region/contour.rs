use glam::IVec3;

use crate::geometry::{sorted_voxels, Connectivity, VoxelSet};

use super::Region;

impl Region {
    /// Member voxels with at least one non-member neighbor, using the low
    /// connectivity (4 in 2D, 6 in 3D).
    pub fn contour(&self) -> VoxelSet {
        self.contour_with(Connectivity::low(self.is_2d))
    }

    pub fn contour_with(&self, connectivity: Connectivity) -> VoxelSet {
        contour_of(self.voxels(), &connectivity.offsets())
    }

    /// Non-member voxels adjacent to the region.
    pub fn outer_contour(&self) -> VoxelSet {
        self.outer_contour_with(Connectivity::low(self.is_2d))
    }

    pub fn outer_contour_with(&self, connectivity: Connectivity) -> VoxelSet {
        outer_contour_of(self.voxels(), &connectivity.offsets())
    }
}

pub(super) fn contour_of(body: &VoxelSet, offsets: &[IVec3]) -> VoxelSet {
    body.iter()
        .filter(|v| offsets.iter().any(|&o| !body.contains(&v.translated(o))))
        .copied()
        .collect()
}

pub(super) fn outer_contour_of(body: &VoxelSet, offsets: &[IVec3]) -> VoxelSet {
    let mut outer = VoxelSet::new();
    for v in body {
        for o in offsets {
            let n = v.offset(o.x, o.y, o.z);
            if !body.contains(&n) {
                outer.insert(n);
            }
        }
    }
    outer
}

/// Splits `voxels` into connected components, largest first; ties are
/// ordered by their first voxel in raster order.
pub fn connected_components(voxels: &VoxelSet, connectivity: Connectivity) -> Vec<VoxelSet> {
    let offsets = connectivity.offsets();
    let mut remaining = voxels.clone();
    let mut components = Vec::new();

    for seed in sorted_voxels(voxels) {
        let Some(seed) = remaining.take(&seed) else {
            continue;
        };
        let mut component = VoxelSet::new();
        let mut stack = vec![seed];
        while let Some(v) = stack.pop() {
            for &o in &offsets {
                if let Some(n) = remaining.take(&v.offset(o.x, o.y, o.z)) {
                    stack.push(n);
                }
            }
            component.insert(v);
        }
        components.push(component);
    }

    // stable sort keeps raster order of first voxels among equal sizes
    components.sort_by(|a, b| b.len().cmp(&a.len()));
    components
}
