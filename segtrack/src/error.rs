//! Error taxonomy.
//!
//! Structural and topology errors are fatal to the call that raised them and
//! indicate a caller logic bug. Batch operations attempt every unit first and
//! report all failures together.

use thiserror::Error;

use crate::lineage::ObjectId;
use crate::region::ShapeKind;

/// A region operation that the operand encodings cannot support.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructuralError {
    #[error("{operation} is not allowed on {kind} regions: their shape is defined by parameters")]
    AnalyticalEdit {
        operation: &'static str,
        kind: ShapeKind,
    },

    #[error("{operation} is not supported on {kind} regions")]
    Unsupported {
        operation: &'static str,
        kind: ShapeKind,
    },

    #[error("{operation}: region has no body")]
    EmptyBody { operation: &'static str },

    #[error("{parameter} must be positive and finite, got {value}")]
    InvalidParameter {
        parameter: &'static str,
        value: f64,
    },
}

/// A lineage or region edit that breaks graph topology.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TopologyError {
    #[error("cannot link {prev:?} (frame {prev_frame}) to {next:?} (frame {next_frame}): frames must strictly increase")]
    FrameOrder {
        prev: ObjectId,
        prev_frame: u32,
        next: ObjectId,
        next_frame: u32,
    },

    #[error("{0:?} is a frame root and cannot be split")]
    SplitRoot(ObjectId),

    #[error("splitting {0:?} produced no regions")]
    EmptySplit(ObjectId),

    #[error("regions differ in {0}")]
    IncompatibleRegions(&'static str),

    #[error("{first:?} and {second:?} do not share object class and frame")]
    MergeMismatch { first: ObjectId, second: ObjectId },

    #[error("{first:?} and {second:?} belong to different object classes")]
    ClassMismatch { first: ObjectId, second: ObjectId },

    #[error("object class {class} cannot be a child of {parent:?}")]
    ParentClassMismatch { class: usize, parent: ObjectId },

    #[error("unknown object class {0}")]
    UnknownClass(usize),

    #[error("unknown object {0:?}")]
    UnknownObject(ObjectId),

    #[error("an object cannot be linked or merged with itself: {0:?}")]
    SelfReference(ObjectId),

    #[error("frame {0} already has a root object")]
    DuplicateRoot(u32),

    #[error("{object:?} reports trackhead {found:?}, its chain starts at {expected:?}")]
    TrackheadMismatch {
        object: ObjectId,
        expected: ObjectId,
        found: ObjectId,
    },

    #[error("{object:?} points to {target:?}, which does not point back or is missing")]
    DanglingLink { object: ObjectId, target: ObjectId },
}

/// Invalid configuration or parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("object class {class} ({name}) references parent {parent}, which must be declared before it")]
    ParentOrder {
        class: usize,
        name: String,
        parent: usize,
    },

    #[error("invalid parameter {name}: {reason}")]
    Parameter { name: &'static str, reason: String },

    #[error("failed to parse YAML configuration")]
    Yaml(#[from] serde_yml::Error),

    #[error("failed to parse JSON configuration")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("structural modification error: {0}")]
    Structural(#[from] StructuralError),

    #[error("invalid topology: {0}")]
    Topology(#[from] TopologyError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{} of {attempted} units failed; first: {}", .failures.len(), first_failure(.failures))]
    Batch {
        attempted: usize,
        failures: Vec<(usize, Error)>,
    },
}

fn first_failure(failures: &[(usize, Error)]) -> String {
    failures
        .first()
        .map_or_else(String::new, |(idx, err)| format!("unit {idx}: {err}"))
}

impl Error {
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Structural(_))
    }

    pub fn is_topology(&self) -> bool {
        matches!(self, Error::Topology(_))
    }

    /// Collapses batch failures into `Ok` or [`Error::Batch`].
    pub fn from_failures(attempted: usize, failures: Vec<(usize, Error)>) -> Result<()> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Batch {
                attempted,
                failures,
            })
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
