//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use segtrack::prelude::*;
//! ```

// Geometry
pub use crate::{BoundingBox, Calibration, Connectivity, Raster, Voxel, VoxelSet};

// Regions
pub use crate::{Ellipse, Region, ShapeKind, Spot, ThresholdSide};

// Populations
pub use crate::{ContactBorder, ImageProperties, QualityAbove, RegionFilter, RegionPopulation, Size};

// Lineage
pub use crate::{
    EditSummary, LinkState, MemoryStore, ObjectEditor, ObjectGraph, ObjectId, ObjectStore,
    SegmentedObject,
};

// Configuration and errors
pub use crate::{ClassHierarchy, Error, LocalThresholdParams, ObjectClassConfig, SmoothParams};
