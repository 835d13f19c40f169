//! Segmented region geometry, label populations and lineage tracking for
//! time-lapse microscopy.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use segtrack::prelude::*;
//!
//! // Connected components of a binary mask become a population.
//! let mut population = RegionPopulation::from_mask(&mask, Connectivity::Four);
//! population.apply(&Size::at_least(20));
//!
//! // Each frame gets a root; cells hang below it.
//! let mut graph = ObjectGraph::new(ClassHierarchy::from_yaml(&yaml)?);
//! let mut editor = graph.editor();
//! let root = editor.create_root(0, frame_region)?;
//! let cells = editor.set_children(root, 0, population)?;
//! let summary = editor.finish();
//! summary.flush(&mut store, &graph)?;
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod geometry;
pub mod lineage;
pub mod population;
pub mod prelude;
pub mod raster;
pub mod region;

#[cfg(test)]
mod test_utils;

// ============================================================================
// Geometry and rasters
// ============================================================================

pub use geometry::{BoundingBox, Connectivity, Voxel, Voxel2D, VoxelSet};
pub use raster::{Calibration, Image3, LabelImage, LabelPixelType, Pixel, Raster};

// ============================================================================
// Regions
// ============================================================================

pub use region::{
    Body, Category, Ellipse, Mask, Outline, Region, Shape, ShapeKind, Spot, ThresholdSide,
};

// ============================================================================
// Populations
// ============================================================================

pub use population::{
    label_components, ContactBorder, ImageProperties, QualityAbove, RegionFilter, RegionPopulation,
    Size,
};

// ============================================================================
// Lineage
// ============================================================================

pub use lineage::{
    AttributeValue, EditSummary, LinkState, MemoryStore, ObjectEditor, ObjectGraph, ObjectId,
    ObjectStore, SegmentedObject,
};

// ============================================================================
// Configuration, errors, batches
// ============================================================================

pub use batch::{run_units, run_units_limited, run_units_partial, BatchOutcome};
pub use config::{ClassHierarchy, LocalThresholdParams, ObjectClassConfig, SmoothParams};
pub use error::{ConfigError, Error, Result, StructuralError, TopologyError};
