//! Error types for calib-dataset crate.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while reading or writing calibration data.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store file exists but could not be decoded.
    #[error("corrupt store {}: {reason}", path.display())]
    Corrupt {
        /// Path of the store file.
        path: PathBuf,
        /// Why decoding failed.
        reason: String,
    },

    /// Invalid magic bytes at the start of a store file.
    #[error("invalid store magic: {0:?}")]
    InvalidMagic([u8; 4]),

    /// Store written by an unsupported format version.
    #[error("unsupported store version: {0}")]
    UnsupportedVersion(u32),
}

impl StoreError {
    /// Creates an IO error.
    #[must_use]
    pub fn io(reason: impl Into<String>) -> Self {
        Self::Io(reason.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization(reason.into())
    }

    /// Creates a corrupt store error.
    #[must_use]
    pub fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error means "a file exists but holds no usable tree".
    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Corrupt { .. } | Self::InvalidMagic(_) | Self::UnsupportedVersion(_)
        )
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for calib-dataset operations.
pub type Result<T> = std::result::Result<T, StoreError>;
