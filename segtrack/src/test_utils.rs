//! Shared fixtures for unit tests.

use crate::config::{ClassHierarchy, ObjectClassConfig};
use crate::geometry::{BoundingBox, Voxel, VoxelSet};
use crate::lineage::{ObjectGraph, ObjectId};
use crate::population::{ImageProperties, RegionPopulation};
use crate::raster::{Calibration, Image3};
use crate::region::Region;

/// Filled disk of integer radius on plane `z`.
pub fn disk(cx: i32, cy: i32, r: i32, z: i32) -> VoxelSet {
    let mut voxels = VoxelSet::new();
    for y in cy - r..=cy + r {
        for x in cx - r..=cx + r {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy <= r * r {
                voxels.insert(Voxel::new(x, y, z));
            }
        }
    }
    voxels
}

/// Filled ball of integer radius.
pub fn ball(cx: i32, cy: i32, cz: i32, r: i32) -> VoxelSet {
    let mut voxels = VoxelSet::new();
    for z in cz - r..=cz + r {
        for y in cy - r..=cy + r {
            for x in cx - r..=cx + r {
                let (dx, dy, dz) = (x - cx, y - cy, z - cz);
                if dx * dx + dy * dy + dz * dz <= r * r {
                    voxels.insert(Voxel::new(x, y, z));
                }
            }
        }
    }
    voxels
}

/// Inclusive rectangle on plane `z`.
pub fn rect(x0: i32, x1: i32, y0: i32, y1: i32, z: i32) -> VoxelSet {
    let mut voxels = VoxelSet::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            voxels.insert(Voxel::new(x, y, z));
        }
    }
    voxels
}

/// Inclusive box.
pub fn cuboid(x0: i32, x1: i32, y0: i32, y1: i32, z0: i32, z1: i32) -> VoxelSet {
    (z0..=z1).flat_map(|z| rect(x0, x1, y0, y1, z)).collect()
}

/// Two lobes joined by a one-voxel-wide neck on plane 0.
pub struct Dumbbell {
    /// 5x5 square at x 0..=4, y 0..=4.
    pub big: VoxelSet,
    /// Neck at x 5..=7, y 2.
    pub neck: VoxelSet,
    /// 3x3 square at x 8..=10, y 1..=3.
    pub small: VoxelSet,
}

impl Dumbbell {
    pub fn new() -> Self {
        Self {
            big: rect(0, 4, 0, 4, 0),
            neck: rect(5, 7, 2, 2, 0),
            small: rect(8, 10, 1, 3, 0),
        }
    }

    pub fn voxels(&self) -> VoxelSet {
        self.big
            .iter()
            .chain(&self.neck)
            .chain(&self.small)
            .copied()
            .collect()
    }

    /// Bright everywhere except dim on the neck.
    pub fn image(&self) -> Image3<f32> {
        let neck = self.neck.clone();
        Image3::from_fn(16, 5, 1, move |x, y, _| {
            if neck.contains(&Voxel::new(x as i32, y as i32, 0)) {
                1.0
            } else {
                10.0
            }
        })
    }
}

pub fn region_2d(voxels: VoxelSet, label: u32) -> Region {
    Region::from_voxels(voxels, label, true, Calibration::default())
}

pub fn region_3d(voxels: VoxelSet, label: u32) -> Region {
    Region::from_voxels(voxels, label, false, Calibration::default())
}

// ============================================================================
// Lineage
// ============================================================================

/// Footprint shared by every lineage fixture frame.
pub fn frame_properties() -> ImageProperties {
    ImageProperties::new(BoundingBox::new(0, 49, 0, 49, 0, 0), Calibration::default(), true)
}

pub fn population_2d(regions: Vec<VoxelSet>) -> RegionPopulation {
    let regions = regions.into_iter().map(|v| region_2d(v, 0)).collect();
    RegionPopulation::from_regions(regions, frame_properties())
}

/// Class 0 `cell` below the frame root, class 1 `spot` below `cell`.
pub fn cell_hierarchy(allow_merge: bool, allow_split: bool) -> ClassHierarchy {
    ClassHierarchy {
        classes: vec![
            ObjectClassConfig::new("cell", None)
                .with_merge(allow_merge)
                .with_split(allow_split),
            ObjectClassConfig::new("spot", Some(0)),
        ],
    }
}

/// Graph with `frames` frames of `cells` unlinked 5x5 cells each, cell `i`
/// at x `10 * i`.
pub struct Lineage {
    pub graph: ObjectGraph,
    pub roots: Vec<ObjectId>,
    /// `cells[frame][i]`
    pub cells: Vec<Vec<ObjectId>>,
}

impl Lineage {
    pub fn build(hierarchy: ClassHierarchy, frames: u32, cells: usize) -> anyhow::Result<Self> {
        let mut graph = ObjectGraph::new(hierarchy);
        let mut roots = Vec::new();
        let mut all_cells = Vec::new();
        let mut editor = graph.editor();
        for frame in 0..frames {
            let root = editor.create_root(frame, region_2d(rect(0, 49, 0, 49, 0), 1))?;
            let bodies = (0..cells as i32)
                .map(|i| rect(10 * i, 10 * i + 4, 0, 4, 0))
                .collect();
            let ids = editor.set_children(root, 0, population_2d(bodies))?;
            roots.push(root);
            all_cells.push(ids);
        }
        editor.finish();
        Ok(Self {
            graph,
            roots,
            cells: all_cells,
        })
    }

    /// Single cell per frame, neither merge nor split allowed.
    pub fn chain(frames: u32) -> anyhow::Result<Self> {
        Self::build(cell_hierarchy(false, false), frames, 1)
    }

    /// First cell of every frame.
    pub fn column(&self) -> Vec<ObjectId> {
        self.cells.iter().map(|c| c[0]).collect()
    }
}
