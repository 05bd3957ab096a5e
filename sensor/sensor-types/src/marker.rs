//! Tactile marker-displacement fields.
//!
//! A vision-based tactile sensor tracks a grid of printed markers on its gel
//! surface. The driver interpolates marker motion onto a fixed grid and
//! reports one `(x, y)` displacement per grid node.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::SensorError;

/// Default marker grid rows.
pub const DEFAULT_MARKER_ROWS: usize = 20;

/// Default marker grid columns.
pub const DEFAULT_MARKER_COLS: usize = 11;

/// A grid of per-marker `(x, y)` displacements.
///
/// Stored in row-major order: `displacements[row * cols + col]`.
///
/// # Example
///
/// ```
/// use sensor_types::MarkerField;
///
/// let field = MarkerField::zeros(20, 11);
/// assert_eq!(field.marker_count(), 220);
/// assert_eq!(field.shape(), (20, 11));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarkerField {
    /// Number of grid rows.
    pub rows: usize,

    /// Number of grid columns.
    pub cols: usize,

    /// Per-marker displacement `[dx, dy]`, row-major.
    pub displacements: Vec<[f32; 2]>,
}

impl MarkerField {
    /// Creates a field, checking that the buffer matches the grid shape.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::BufferSizeMismatch`] if
    /// `displacements.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, displacements: Vec<[f32; 2]>) -> Result<Self, SensorError> {
        let expected = rows * cols;
        if displacements.len() != expected {
            return Err(SensorError::buffer_mismatch(expected, displacements.len()));
        }
        Ok(Self {
            rows,
            cols,
            displacements,
        })
    }

    /// Creates an all-zero field of the given shape.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            displacements: vec![[0.0, 0.0]; rows * cols],
        }
    }

    /// Returns `(rows, cols)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the number of markers.
    #[must_use]
    pub const fn marker_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Checks if the buffer has the expected size.
    #[must_use]
    pub fn has_valid_buffer_size(&self) -> bool {
        self.displacements.len() == self.marker_count()
    }

    /// Gets the displacement of one marker.
    ///
    /// Returns `None` if coordinates are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<[f32; 2]> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.displacements.get(row * self.cols + col).copied()
    }

    /// Largest displacement magnitude over the grid (0 for an empty field).
    #[must_use]
    pub fn max_magnitude(&self) -> f32 {
        self.displacements
            .iter()
            .map(|[x, y]| x.hypot(*y))
            .fold(0.0, f32::max)
    }

    /// Mean displacement magnitude over the grid (0 for an empty field).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_magnitude(&self) -> f32 {
        if self.displacements.is_empty() {
            return 0.0;
        }
        let total: f32 = self.displacements.iter().map(|[x, y]| x.hypot(*y)).sum();
        total / self.displacements.len() as f32
    }
}

impl Default for MarkerField {
    fn default() -> Self {
        Self::zeros(DEFAULT_MARKER_ROWS, DEFAULT_MARKER_COLS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_field() -> MarkerField {
        let data = (0..6u8)
            .map(|i| [f32::from(i), 0.0])
            .collect::<Vec<_>>();
        MarkerField::new(2, 3, data).unwrap_or_else(|_| MarkerField::zeros(2, 3))
    }

    #[test]
    fn marker_field_shape_checked() {
        let err = MarkerField::new(2, 3, vec![[0.0, 0.0]; 5]);
        assert!(matches!(
            err,
            Err(SensorError::BufferSizeMismatch {
                expected: 6,
                actual: 5
            })
        ));
    }

    #[test]
    fn marker_field_get() {
        let field = sample_field();
        assert_eq!(field.get(1, 2), Some([5.0, 0.0]));
        assert_eq!(field.get(2, 0), None);
        assert_eq!(field.get(0, 3), None);
    }

    #[test]
    fn marker_field_magnitudes() {
        let field = sample_field();
        assert!((field.max_magnitude() - 5.0).abs() < 1e-6);
        assert!((field.mean_magnitude() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn marker_field_empty_magnitudes() {
        let field = MarkerField::zeros(0, 0);
        assert!(field.max_magnitude().abs() < f32::EPSILON);
        assert!(field.mean_magnitude().abs() < f32::EPSILON);
    }

    #[test]
    fn marker_field_default_grid() {
        let field = MarkerField::default();
        assert_eq!(field.shape(), (DEFAULT_MARKER_ROWS, DEFAULT_MARKER_COLS));
        assert!(field.has_valid_buffer_size());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn marker_field_serialization() {
        let json = serde_json::to_string(&sample_field()).ok();
        assert!(json.is_some());
    }
}
