//! Force sensor types.
//!
//! The calibration rig only consumes the force part of the wrench reported
//! by the wrist sensor.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::SensorError;

/// A 3-axis force reading in Newtons: `[Fx, Fy, Fz]`.
///
/// Pressing the tactile pad into an object drives `Fz` negative, so contact
/// and over-force thresholds are negative numbers.
///
/// # Example
///
/// ```
/// use sensor_types::ForceReading;
///
/// let reading = ForceReading::new([0.0, 0.0, -0.5]);
/// assert!(reading.presses_at_least(-0.1));
/// assert!(!reading.presses_at_least(-1.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ForceReading {
    /// Force vector in Newtons.
    pub force: [f64; 3],
}

impl ForceReading {
    /// Creates a reading from a force vector.
    #[must_use]
    pub const fn new(force: [f64; 3]) -> Self {
        Self { force }
    }

    /// Creates a reading from a raw sensor value, rejecting NaN and infinity.
    ///
    /// Every threshold comparison against a NaN is false, so a non-finite
    /// value must never reach [`ForceReading::presses_at_least`].
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::InvalidValue`] if any component is not finite.
    pub fn checked(force: [f64; 3]) -> Result<Self, SensorError> {
        let reading = Self::new(force);
        if reading.is_finite() {
            Ok(reading)
        } else {
            Err(SensorError::invalid_value(format!("non-finite force reading {force:?}")))
        }
    }

    /// Creates a zero reading.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            force: [0.0, 0.0, 0.0],
        }
    }

    /// Returns the z component.
    #[must_use]
    pub const fn fz(&self) -> f64 {
        self.force[2]
    }

    /// Returns the magnitude of the force vector.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        let [x, y, z] = self.force;
        x.hypot(y).hypot(z)
    }

    /// Returns `true` if `Fz` is at or below `threshold`.
    ///
    /// Both contact detection and the over-force cutoff use this comparison.
    #[must_use]
    pub fn presses_at_least(&self, threshold: f64) -> bool {
        self.fz() <= threshold
    }

    /// Returns `true` if every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.force.iter().all(|f| f.is_finite())
    }

    /// Subtracts a constant bias from the reading.
    #[must_use]
    pub fn bias_corrected(&self, bias: [f64; 3]) -> Self {
        Self {
            force: [
                self.force[0] - bias[0],
                self.force[1] - bias[1],
                self.force[2] - bias[2],
            ],
        }
    }

    /// Arithmetic mean of a set of readings.
    ///
    /// Returns `None` for an empty input.
    ///
    /// # Example
    ///
    /// ```
    /// use sensor_types::ForceReading;
    ///
    /// let readings = [ForceReading::new([1.0, 0.0, -1.0]), ForceReading::new([3.0, 0.0, -3.0])];
    /// let mean = ForceReading::mean(&readings).unwrap();
    /// assert!((mean.force[0] - 2.0).abs() < 1e-12);
    /// assert!((mean.fz() + 2.0).abs() < 1e-12);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(readings: &[Self]) -> Option<Self> {
        if readings.is_empty() {
            return None;
        }
        let mut sum = [0.0; 3];
        for reading in readings {
            for (acc, value) in sum.iter_mut().zip(reading.force) {
                *acc += value;
            }
        }
        let n = readings.len() as f64;
        Some(Self::new([sum[0] / n, sum[1] / n, sum[2] / n]))
    }
}

impl From<[f64; 3]> for ForceReading {
    fn from(force: [f64; 3]) -> Self {
        Self::new(force)
    }
}
