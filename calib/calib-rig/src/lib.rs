//! Contact-seeking trajectory execution for tactile sensor calibration.
//!
//! A calibration bench is a robot arm carrying a force sensor and a
//! marker-tracking tactile sensor. This crate drives the bench through a
//! library of scripted trajectories and records, for every step, what the
//! tactile sensor saw and what force was applied.
//!
//! # Components
//!
//! - [`RobotArm`], [`ForceSensor`], [`TactileSensor`] - Device seams
//! - [`SensorSampler`] - One tactile frame plus an averaged force per step
//! - [`ContactSeeker`] - Force-guided descent with a safety limit
//! - [`TrajectoryExecutor`] - Seek, step, sample, retreat
//! - [`CalibrationSession`] - Startup, per-object runs, guaranteed teardown
//! - [`TrajectoryLibrary`] - Trajectory file loader
//! - [`sim`] - Deterministic simulated bench
//!
//! # Failure scopes
//!
//! Every [`RigError`] has a [`FaultScope`]. A failed step sample abandons
//! its trajectory; everything else (safety fault, missing contact, motion
//! hang, driver failure) ends the session, which still tears down.
//!
//! # Example
//!
//! ```
//! use calib_rig::prelude::*;
//! use calib_rig::sim::{BenchConfig, SimulatedBench};
//! use sensor_types::Pose;
//!
//! let library = TrajectoryLibrary::from_json_str(r#"{ "cube": { "push": [{ "z": -0.1 }, { "z": -0.1 }] } }"#).unwrap();
//! let bench = SimulatedBench::new(BenchConfig::default());
//! let config = RigConfig::default().without_delays().with_data_frames(1);
//! let pose0 = Pose::from_array([556.58, -200.07, 134.89, 0.0, 1.0, 0.0, 0.0]);
//!
//! let mut session = CalibrationSession::new(bench.rig(), config, library, pose0).unwrap();
//! assert_eq!(session.dry_run("cube").len(), 1);
//! assert_eq!(session.run("cube").unwrap().record_count(), 2);
//! ```
//!
//! # Quality Standards
//!
//! - Zero clippy/doc warnings
//! - Zero `unwrap`/`expect` in library code
//! - Every device interaction bounded in time

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::module_name_repetitions)]

mod config;
mod contact;
mod context;
mod driver;
mod error;
mod executor;
mod motion;
mod sampler;
mod session;
pub mod sim;
mod trajectory;

pub use config::{DEFAULT_HOME_POSE, DEFAULT_INITIAL_POSE, RigConfig};
pub use contact::{ContactReading, ContactSeeker, ContactState};
pub use context::SessionContext;
pub use driver::{ForceSensor, Rig, RobotArm, TactileSensor};
pub use error::{ConfigError, FaultScope, LibraryError, MotionError, Result, RigError};
pub use executor::TrajectoryExecutor;
pub use motion::{MotionLimits, move_delta, move_to, move_to_z, set_speed, unwind_wrist, wait_until_idle};
pub use sampler::{SensorSample, SensorSampler};
pub use session::{CalibrationSession, PlannedTrajectory, TeardownReport};
pub use trajectory::{Trajectory, TrajectoryLibrary, parse_steps};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        CalibrationSession, ForceSensor, RigConfig, RigError, RobotArm, SessionContext,
        TactileSensor, Trajectory, TrajectoryLibrary,
    };
}
