//! Calibration dataset storage for the tactile calibration rig.
//!
//! This crate owns the data side of a calibration run:
//!
//! # Records
//!
//! - [`StepRecord`] - Tactile field, averaged force and provenance for one step
//! - [`StepMetadata`] - Trajectory name, step index and commanded motion
//! - [`step_key`] / [`parse_step_key`] - Zero-padded `step_NNN` keys
//!
//! # Trees
//!
//! - [`CalibrationTree`] - object → trajectory → step → record
//! - [`CalibrationTree::merge`] - Deep union with overwrite reporting
//! - [`TreeSummary`] - Counts per object and trajectory
//!
//! # Persistence
//!
//! - [`CalibrationStore`] - Whole-file, atomically replaced store
//! - [`write_tree`] / [`read_tree`] - Header + bincode codec
//!
//! # Example
//!
//! ```
//! use calib_dataset::{CalibrationTree, StepMetadata, StepRecord, TrajectoryRecords, step_key};
//! use sensor_types::MarkerField;
//!
//! let mut stored = CalibrationTree::new();
//!
//! let mut steps = TrajectoryRecords::new();
//! steps.insert(
//!     step_key(0),
//!     StepRecord::new(MarkerField::zeros(20, 11), [0.0, 0.0, -0.2], StepMetadata::new("push", 0, [0.0, 0.0, -1.0])),
//! );
//! let mut session = CalibrationTree::new();
//! session.insert_trajectory("cube", "push", steps);
//!
//! let report = stored.merge(session);
//! assert_eq!(report.inserted, 1);
//! assert!(report.overwritten.is_empty());
//! ```
//!
//! # Quality Standards
//!
//! - Zero clippy/doc warnings
//! - Zero `unwrap`/`expect` in library code

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod record;
mod store;
mod summary;
mod tree;

// Re-export record types
pub use record::{StepMetadata, StepRecord, parse_step_key, step_key};

// Re-export tree types
pub use tree::{CalibrationTree, MergeReport, ObjectRecords, RecordPath, TrajectoryRecords};

// Re-export summary types
pub use summary::{ObjectSummary, TrajectorySummary, TreeSummary};

// Re-export store types
pub use store::{
    CalibrationStore, STORE_HEADER_SIZE, STORE_MAGIC, STORE_VERSION, StoreHeader, read_tree,
    tree_from_bytes, tree_to_bytes, write_tree,
};

// Re-export error types
pub use error::{Result, StoreError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        CalibrationStore, CalibrationTree, MergeReport, RecordPath, StepMetadata, StepRecord,
        StoreError, TrajectoryRecords, TreeSummary, step_key,
    };
}
