//! Per-step sensor sampling.

use std::thread;
use std::time::Duration;

use nalgebra::{Rotation3, Vector3};
use sensor_types::{ForceReading, MarkerField, SensorError};

use crate::config::RigConfig;
use crate::driver::{ForceSensor, TactileSensor};

/// Sensor data captured for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSample {
    /// Tactile field, read once.
    pub marker_displacement: MarkerField,
    /// Mean force over the sampled frames, tactile frame.
    pub force_xyz: [f64; 3],
}

/// Reads the tactile field once and averages the force stream.
///
/// The force sensor and the tactile pad are mounted with different
/// orientations; the averaged force is rotated into the tactile frame by a
/// fixed rotation before it is returned.
///
/// # Example
///
/// ```
/// use calib_rig::SensorSampler;
///
/// let sampler = SensorSampler::new().with_frame_rotation_deg([0.0, 0.0, 90.0]);
/// let rotated = sampler.to_tactile_frame([1.0, 0.0, -0.5]);
/// assert!((rotated[1] - 1.0).abs() < 1e-12);
/// assert!((rotated[2] + 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSampler {
    rotation: Rotation3<f64>,
}

impl Default for SensorSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorSampler {
    /// Sampler with no frame rotation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rotation: Rotation3::identity(),
        }
    }

    /// Sets the force-to-tactile rotation from roll, pitch and yaw in degrees.
    #[must_use]
    pub fn with_frame_rotation_deg(mut self, [roll, pitch, yaw]: [f64; 3]) -> Self {
        self.rotation = Rotation3::from_euler_angles(roll.to_radians(), pitch.to_radians(), yaw.to_radians());
        self
    }

    /// Sampler configured from `force_frame_rotation_deg`.
    #[must_use]
    pub fn from_config(config: &RigConfig) -> Self {
        Self::new().with_frame_rotation_deg(config.force_frame_rotation_deg)
    }

    /// Rotates a force from the force-sensor frame into the tactile frame.
    #[must_use]
    pub fn to_tactile_frame(&self, force: [f64; 3]) -> [f64; 3] {
        let rotated = self.rotation * Vector3::from(force);
        [rotated.x, rotated.y, rotated.z]
    }

    /// Captures one step sample.
    ///
    /// Reads the tactile field once, then reads the force sensor `n_frames`
    /// times, sleeping `frame_interval` after each read. Blocks for
    /// `n_frames * frame_interval`. Failures are returned as-is; nothing is
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns the first sensor error, or [`SensorError::InvalidValue`] if
    /// `n_frames` is zero or a force frame is not finite.
    pub fn sample<F, T>(
        &self,
        force: &mut F,
        tactile: &mut T,
        n_frames: usize,
        frame_interval: Duration,
    ) -> Result<SensorSample, SensorError>
    where
        F: ForceSensor + ?Sized,
        T: TactileSensor + ?Sized,
    {
        if n_frames == 0 {
            return Err(SensorError::invalid_value("at least one force frame is required"));
        }

        let marker_displacement = tactile.read_markers()?;

        let mut frames = Vec::with_capacity(n_frames);
        for _ in 0..n_frames {
            frames.push(ForceReading::checked(force.read()?)?);
            thread::sleep(frame_interval);
        }

        let mean = ForceReading::mean(&frames)
            .ok_or_else(|| SensorError::invalid_value("no force frames collected"))?;

        Ok(SensorSample {
            marker_displacement,
            force_xyz: self.to_tactile_frame(mean.force),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::VecDeque;

    struct ScriptedForce {
        frames: VecDeque<[f64; 3]>,
        reads: usize,
    }

    impl ForceSensor for ScriptedForce {
        fn read(&mut self) -> Result<[f64; 3], SensorError> {
            self.reads += 1;
            self.frames
                .pop_front()
                .ok_or_else(|| SensorError::read_failed("force", "stream ended"))
        }

        fn tare(&mut self) -> Result<(), SensorError> {
            Ok(())
        }
    }

    struct FixedTactile {
        reads: usize,
        fail: bool,
    }

    impl TactileSensor for FixedTactile {
        fn read_markers(&mut self) -> Result<MarkerField, SensorError> {
            self.reads += 1;
            if self.fail {
                return Err(SensorError::disconnected("tactile"));
            }
            Ok(MarkerField::zeros(20, 11))
        }

        fn release(&mut self) -> Result<(), SensorError> {
            Ok(())
        }
    }

    fn force(frames: &[[f64; 3]]) -> ScriptedForce {
        ScriptedForce {
            frames: frames.iter().copied().collect(),
            reads: 0,
        }
    }

    #[test]
    fn averages_force_frames() {
        let mut f = force(&[[0.0, 0.0, -1.0], [0.0, 0.0, -2.0], [0.0, 0.0, -3.0]]);
        let mut t = FixedTactile { reads: 0, fail: false };

        let sample = SensorSampler::new().sample(&mut f, &mut t, 3, Duration::ZERO).unwrap();

        assert_relative_eq!(sample.force_xyz[2], -2.0, epsilon = 1e-12);
        assert_eq!(sample.marker_displacement.shape(), (20, 11));
        assert_eq!(f.reads, 3);
        assert_eq!(t.reads, 1);
    }

    #[test]
    fn zero_frames_rejected() {
        let mut f = force(&[]);
        let mut t = FixedTactile { reads: 0, fail: false };
        let err = SensorSampler::new().sample(&mut f, &mut t, 0, Duration::ZERO);
        assert!(matches!(err, Err(SensorError::InvalidValue(_))));
        assert_eq!(t.reads, 0);
    }

    #[test]
    fn force_failure_propagates_without_retry() {
        let mut f = force(&[[0.0, 0.0, -1.0]]);
        let mut t = FixedTactile { reads: 0, fail: false };

        let err = SensorSampler::new().sample(&mut f, &mut t, 5, Duration::ZERO);
        assert!(matches!(err, Err(SensorError::ReadFailed { .. })));
        assert_eq!(f.reads, 2);
    }

    #[test]
    fn non_finite_frame_is_not_averaged() {
        let mut f = force(&[[0.0, 0.0, -1.0], [0.0, f64::NAN, -1.0], [0.0, 0.0, -1.0]]);
        let mut t = FixedTactile { reads: 0, fail: false };

        let err = SensorSampler::new().sample(&mut f, &mut t, 3, Duration::ZERO);
        assert!(matches!(err, Err(SensorError::InvalidValue(_))));
        assert_eq!(f.reads, 2);
    }

    #[test]
    fn tactile_failure_skips_force_reads() {
        let mut f = force(&[[0.0, 0.0, -1.0]]);
        let mut t = FixedTactile { reads: 0, fail: true };

        let err = SensorSampler::new().sample(&mut f, &mut t, 1, Duration::ZERO);
        assert!(matches!(err, Err(SensorError::Disconnected(_))));
        assert_eq!(f.reads, 0);
    }

    #[test]
    fn rotation_into_tactile_frame() {
        let sampler = SensorSampler::new().with_frame_rotation_deg([180.0, 0.0, 0.0]);
        let rotated = sampler.to_tactile_frame([0.0, 1.0, -0.5]);
        assert_relative_eq!(rotated[1], -1.0, epsilon = 1e-12);
        assert_relative_eq!(rotated[2], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn identity_keeps_force() {
        let sampler = SensorSampler::from_config(&RigConfig::default());
        assert_eq!(sampler.to_tactile_frame([0.1, 0.2, -0.3]), [0.1, 0.2, -0.3]);
    }
}
