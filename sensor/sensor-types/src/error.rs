//! Error types for sensor operations.

use thiserror::Error;

/// Errors that can occur when reading or validating sensor data.
#[derive(Debug, Error)]
pub enum SensorError {
    /// A device read failed.
    #[error("{device} read failed: {reason}")]
    ReadFailed {
        /// Device that failed (e.g. `force`, `tactile`).
        device: String,
        /// Driver-reported reason.
        reason: String,
    },

    /// The device is disconnected or already released.
    #[error("{0} is disconnected")]
    Disconnected(String),

    /// Buffer size mismatch (e.g. marker field with the wrong number of markers).
    #[error("buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch {
        /// Expected buffer size.
        expected: usize,
        /// Actual buffer size.
        actual: usize,
    },

    /// A reading contained a non-finite or out-of-range value.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl SensorError {
    /// Creates a read failure error.
    #[must_use]
    pub fn read_failed(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReadFailed {
            device: device.into(),
            reason: reason.into(),
        }
    }

    /// Creates a disconnected error.
    #[must_use]
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected(device.into())
    }

    /// Creates a buffer size mismatch error.
    #[must_use]
    pub const fn buffer_mismatch(expected: usize, actual: usize) -> Self {
        Self::BufferSizeMismatch { expected, actual }
    }

    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Self::InvalidValue(reason.into())
    }
}
