//! Error types for the calibration rig.
//!
//! [`RigError`] is what the rig components return. Each variant carries a
//! [`FaultScope`] telling the session whether the failure ends only the
//! current trajectory or the whole run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use calib_dataset::StoreError;
use sensor_types::SensorError;
use thiserror::Error;

/// How far a failure propagates inside a collection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultScope {
    /// The current trajectory is abandoned; the session moves on to the next.
    Trajectory,
    /// The session stops and tears down.
    Session,
}

/// Errors reported by a robot arm driver.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum MotionError {
    /// The controller rejected or failed a command.
    #[error("robot command '{command}' failed: {reason}")]
    CommandFailed {
        /// Command name.
        command: String,
        /// Controller-reported reason.
        reason: String,
    },

    /// The controller connection was lost.
    #[error("robot controller disconnected: {0}")]
    Disconnected(String),
}

impl MotionError {
    /// Creates a command failure.
    #[must_use]
    pub fn command_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config {}: {reason}", path.display())]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The configuration is not valid JSON or has unknown keys.
    #[error("cannot parse config: {0}")]
    Parse(String),

    /// A value is out of range.
    #[error("invalid config value '{field}': {reason}")]
    Invalid {
        /// Offending key.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an out-of-range error.
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }
}

/// Trajectory library loading errors.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum LibraryError {
    /// The library file could not be read.
    #[error("cannot read trajectory library {}: {reason}", path.display())]
    Io {
        /// Library file path.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The library is not valid JSON.
    #[error("cannot parse trajectory library: {0}")]
    Parse(String),
}

/// Errors raised while collecting calibration data.
///
/// # Example
///
/// ```
/// use calib_rig::{FaultScope, RigError};
/// use sensor_types::SensorError;
///
/// let err = RigError::sampling(SensorError::disconnected("tactile"));
/// assert_eq!(err.scope(), FaultScope::Trajectory);
///
/// let err = RigError::SafetyFault { force: -1.2, limit: -1.0, z: 101.5 };
/// assert_eq!(err.scope(), FaultScope::Session);
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RigError {
    /// The measured force reached the safety limit.
    #[error("force {force:.3} N reached safety limit {limit:.3} N at z = {z:.3} mm")]
    SafetyFault {
        /// Measured z force in Newtons.
        force: f64,
        /// Configured limit in Newtons.
        limit: f64,
        /// Arm height when the fault was detected.
        z: f64,
    },

    /// The contact seek descended its full travel without detecting contact.
    #[error("no contact within {travel_mm:.2} mm below z = {start_z:.3} mm")]
    ContactNotFound {
        /// Height the descent started from.
        start_z: f64,
        /// Distance descended.
        travel_mm: f64,
    },

    /// A sensor read failed while sampling a step.
    #[error("sampling failed: {0}")]
    Sampling(#[source] SensorError),

    /// The arm stayed busy past the motion timeout.
    #[error("motion did not complete within {0:?}")]
    MotionTimeout(Duration),

    /// The arm driver reported a failure.
    #[error(transparent)]
    Motion(#[from] MotionError),

    /// A sensor failed outside of step sampling.
    #[error("sensor error: {0}")]
    Sensor(#[source] SensorError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Trajectory library could not be loaded.
    #[error(transparent)]
    Library(#[from] LibraryError),

    /// The persistent store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RigError {
    /// Wraps a sensor error raised while sampling a step.
    #[must_use]
    pub const fn sampling(err: SensorError) -> Self {
        Self::Sampling(err)
    }

    /// Wraps a sensor error raised outside of step sampling.
    #[must_use]
    pub const fn sensor(err: SensorError) -> Self {
        Self::Sensor(err)
    }

    /// Returns how far this failure propagates.
    ///
    /// Only step sampling failures are confined to their trajectory.
    #[must_use]
    pub const fn scope(&self) -> FaultScope {
        match self {
            Self::Sampling(_) => FaultScope::Trajectory,
            _ => FaultScope::Session,
        }
    }

    /// Returns `true` for a safety-limit fault.
    #[must_use]
    pub const fn is_safety_fault(&self) -> bool {
        matches!(self, Self::SafetyFault { .. })
    }
}

/// Result type for rig operations.
pub type Result<T> = std::result::Result<T, RigError>;
