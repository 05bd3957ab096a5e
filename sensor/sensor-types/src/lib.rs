//! Hardware-agnostic sensor and pose types for the tactile calibration rig.
//!
//! This crate provides the value types shared by the rig controller, the
//! dataset store and the simulated bench:
//!
//! - [`Pose`] - Tool-center-point pose (millimeters + unit quaternion)
//! - [`Displacement`] - Relative Cartesian step in millimeters
//! - [`ForceReading`] - 3-axis force sample in Newtons
//! - [`MarkerField`] - Tactile marker-displacement grid
//!
//! # Layer 0 Crate
//!
//! This crate has no dependencies beyond `thiserror` (and `serde` behind the
//! `serde` feature). It can be used by real hardware drivers and by
//! simulated ones alike, so that recorded data looks the same either way.
//!
//! # Example
//!
//! ```
//! use sensor_types::{Displacement, ForceReading, Pose};
//!
//! let pose = Pose::from_array([550.0, -200.0, 120.0, 0.0, 1.0, 0.0, 0.0]);
//! let pressed = pose.translated(Displacement::vertical(-0.5));
//! assert!((pressed.z() - 119.5).abs() < 1e-9);
//!
//! let reading = ForceReading::new([0.0, 0.0, -0.05]);
//! assert!(reading.presses_at_least(-0.02));
//! ```
//!
//! # Quality Standards
//!
//! - Zero clippy/doc warnings
//! - Zero `unwrap`/`expect` in library code

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod force;
mod frame;
mod marker;

pub use error::SensorError;
pub use force::ForceReading;
pub use frame::{Displacement, Pose};
pub use marker::{DEFAULT_MARKER_COLS, DEFAULT_MARKER_ROWS, MarkerField};
