//! Collection configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Pose the arm visits first on startup, `[x, y, z, qw, qx, qy, qz]`.
pub const DEFAULT_HOME_POSE: [f64; 7] = [574.33, -176.67, 194.89, 0.0, 1.0, 0.0, 0.0];

/// Working pose above the fixture when none is given.
pub const DEFAULT_INITIAL_POSE: [f64; 7] = [556.58, -200.07, 134.89, 0.0, 1.0, 0.0, 0.0];

/// Configuration for a collection session.
///
/// Every key is optional in the JSON form; missing keys take the defaults
/// below. Unknown keys are rejected.
///
/// Forces are Newtons with pressing negative, lengths are millimeters,
/// speeds are mm/s and times are seconds.
///
/// # Example
///
/// ```
/// use calib_rig::RigConfig;
///
/// let config = RigConfig::from_json_str(r#"{ "data_frames": 5, "safe_offset_mm": 4.0 }"#).unwrap();
/// assert_eq!(config.data_frames, 5);
/// assert_eq!(config.press_speed, 8.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RigConfig {
    /// Force at or below which contact is declared.
    pub contact_threshold: f64,

    /// Speed while seeking contact.
    pub approach_speed: f64,

    /// Speed while executing trajectory steps.
    pub press_speed: f64,

    /// Safety limit; a force at or below it aborts the session.
    pub max_force: f64,

    /// Force reads averaged per step.
    pub data_frames: usize,

    /// Pause after each force read.
    pub frame_interval: f64,

    /// Settle pause after moves, also the motion poll period.
    pub step_settle_time: f64,

    /// Clearance above the contact height between trajectories.
    pub safe_offset_mm: f64,

    /// Speed for moves between working positions.
    pub traverse_speed: f64,

    /// Arm acceleration set on startup.
    pub acceleration: f64,

    /// Height above the seek start where the descent begins.
    pub seek_clearance_mm: f64,

    /// Descent per seek iteration.
    pub seek_step_mm: f64,

    /// Pause after each seek step.
    pub seek_dwell: f64,

    /// Descent after which the seek gives up.
    pub max_seek_travel_mm: f64,

    /// Seek start height used before any contact was found.
    pub seek_start_z: Option<f64>,

    /// Longest wait for a single motion to finish.
    pub motion_timeout: f64,

    /// Minimum park clearance above the initial pose at teardown.
    pub park_offset_mm: f64,

    /// Home pose visited on startup.
    pub home_pose: [f64; 7],

    /// Fixed rotation from the force-sensor frame to the tactile frame,
    /// `[roll, pitch, yaw]` in degrees.
    pub force_frame_rotation_deg: [f64; 3],
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            contact_threshold: -0.02,
            approach_speed: 1.0,
            press_speed: 8.0,
            max_force: -1.0,
            data_frames: 30,
            frame_interval: 0.1,
            step_settle_time: 0.3,
            safe_offset_mm: 8.0,
            traverse_speed: 20.0,
            acceleration: 0.5,
            seek_clearance_mm: 0.1,
            seek_step_mm: 0.01,
            seek_dwell: 0.2,
            max_seek_travel_mm: 30.0,
            seek_start_z: None,
            motion_timeout: 60.0,
            park_offset_mm: 50.0,
            home_pose: DEFAULT_HOME_POSE,
            force_frame_rotation_deg: [0.0; 3],
        }
    }
}

impl RigConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown keys and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`RigConfig::from_json_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, &e))?;
        Self::from_json_str(&text)
    }

    /// Sets the number of force reads per step.
    #[must_use]
    pub const fn with_data_frames(mut self, frames: usize) -> Self {
        self.data_frames = frames;
        self
    }

    /// Sets the pause after each force read, in seconds.
    #[must_use]
    pub const fn with_frame_interval(mut self, seconds: f64) -> Self {
        self.frame_interval = seconds;
        self
    }

    /// Sets the settle time and motion poll period, in seconds.
    #[must_use]
    pub const fn with_step_settle_time(mut self, seconds: f64) -> Self {
        self.step_settle_time = seconds;
        self
    }

    /// Sets the pause after each seek step, in seconds.
    #[must_use]
    pub const fn with_seek_dwell(mut self, seconds: f64) -> Self {
        self.seek_dwell = seconds;
        self
    }

    /// Sets the contact threshold and safety limit.
    #[must_use]
    pub const fn with_force_limits(mut self, contact_threshold: f64, max_force: f64) -> Self {
        self.contact_threshold = contact_threshold;
        self.max_force = max_force;
        self
    }

    /// Sets the clearance kept above the contact height.
    #[must_use]
    pub const fn with_safe_offset(mut self, millimeters: f64) -> Self {
        self.safe_offset_mm = millimeters;
        self
    }

    /// Sets the seek step and the maximum seek travel.
    #[must_use]
    pub const fn with_seek_travel(mut self, step_mm: f64, max_travel_mm: f64) -> Self {
        self.seek_step_mm = step_mm;
        self.max_seek_travel_mm = max_travel_mm;
        self
    }

    /// Sets the seek start height used before contact is known.
    #[must_use]
    pub const fn with_seek_start_z(mut self, z: f64) -> Self {
        self.seek_start_z = Some(z);
        self
    }

    /// Sets the motion timeout, in seconds.
    #[must_use]
    pub const fn with_motion_timeout(mut self, seconds: f64) -> Self {
        self.motion_timeout = seconds;
        self
    }

    /// Sets the force-frame rotation, `[roll, pitch, yaw]` in degrees.
    #[must_use]
    pub const fn with_force_frame_rotation(mut self, degrees: [f64; 3]) -> Self {
        self.force_frame_rotation_deg = degrees;
        self
    }

    /// Removes every pause, for simulated runs.
    #[must_use]
    pub const fn without_delays(mut self) -> Self {
        self.frame_interval = 0.0;
        self.step_settle_time = 0.0;
        self.seek_dwell = 0.0;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_frames == 0 {
            return Err(ConfigError::invalid("data_frames", "must be at least 1"));
        }

        positive("approach_speed", self.approach_speed)?;
        positive("press_speed", self.press_speed)?;
        positive("traverse_speed", self.traverse_speed)?;
        positive("acceleration", self.acceleration)?;
        positive("seek_step_mm", self.seek_step_mm)?;
        positive("max_seek_travel_mm", self.max_seek_travel_mm)?;
        positive("motion_timeout", self.motion_timeout)?;

        non_negative("frame_interval", self.frame_interval)?;
        non_negative("step_settle_time", self.step_settle_time)?;
        non_negative("seek_dwell", self.seek_dwell)?;
        for (field, value) in [
            ("frame_interval", self.frame_interval),
            ("step_settle_time", self.step_settle_time),
            ("seek_dwell", self.seek_dwell),
            ("motion_timeout", self.motion_timeout),
        ] {
            representable_seconds(field, value)?;
        }

        non_negative("seek_clearance_mm", self.seek_clearance_mm)?;
        non_negative("safe_offset_mm", self.safe_offset_mm)?;
        non_negative("park_offset_mm", self.park_offset_mm)?;

        if !(self.contact_threshold.is_finite() && self.contact_threshold < 0.0) {
            return Err(ConfigError::invalid(
                "contact_threshold",
                format!("must be negative, got {}", self.contact_threshold),
            ));
        }
        if !(self.max_force.is_finite() && self.max_force < self.contact_threshold) {
            return Err(ConfigError::invalid(
                "max_force",
                format!(
                    "must be below contact_threshold ({}), got {}",
                    self.contact_threshold, self.max_force
                ),
            ));
        }
        if let Some(z) = self.seek_start_z {
            if !z.is_finite() {
                return Err(ConfigError::invalid("seek_start_z", "must be finite"));
            }
        }
        if self.home_pose.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::invalid("home_pose", "must be finite"));
        }
        if self.force_frame_rotation_deg.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::invalid(
                "force_frame_rotation_deg",
                "must be finite",
            ));
        }

        Ok(())
    }

    /// Pause after each force read.
    #[must_use]
    pub fn frame_interval_duration(&self) -> Duration {
        seconds(self.frame_interval)
    }

    /// Settle pause and motion poll period.
    #[must_use]
    pub fn settle_duration(&self) -> Duration {
        seconds(self.step_settle_time)
    }

    /// Pause after each seek step.
    #[must_use]
    pub fn seek_dwell_duration(&self) -> Duration {
        seconds(self.seek_dwell)
    }

    /// Longest wait for one motion.
    #[must_use]
    pub fn motion_timeout_duration(&self) -> Duration {
        seconds(self.motion_timeout)
    }

    /// Absolute park height for a session started at `initial_z`.
    #[must_use]
    pub fn park_height(&self, initial_z: f64) -> f64 {
        initial_z + self.safe_offset_mm.max(self.park_offset_mm)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be positive, got {value}"),
        ))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be non-negative, got {value}"),
        ))
    }
}

fn representable_seconds(field: &'static str, value: f64) -> Result<(), ConfigError> {
    Duration::try_from_secs_f64(value)
        .map(drop)
        .map_err(|_| ConfigError::invalid(field, format!("{value} s is not a representable duration")))
}

// Only reached with values `validate` accepted.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RigConfig::default();
        assert_eq!(config.contact_threshold, -0.02);
        assert_eq!(config.approach_speed, 1.0);
        assert_eq!(config.press_speed, 8.0);
        assert_eq!(config.max_force, -1.0);
        assert_eq!(config.data_frames, 30);
        assert_eq!(config.frame_interval, 0.1);
        assert_eq!(config.step_settle_time, 0.3);
        assert_eq!(config.safe_offset_mm, 8.0);
        assert!(config.seek_start_z.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_json_is_default() {
        let config = RigConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RigConfig::default());
    }

    #[test]
    fn unknown_key_rejected() {
        let err = RigConfig::from_json_str(r#"{ "press_sped": 4 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_frames_rejected() {
        let err = RigConfig::default().with_data_frames(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "data_frames", .. }));
    }

    #[test]
    fn safety_limit_must_be_below_threshold() {
        let err = RigConfig::default()
            .with_force_limits(-0.5, -0.1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "max_force", .. }));

        let err = RigConfig::default()
            .with_force_limits(0.1, -1.0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "contact_threshold", .. }));
    }

    #[test]
    fn negative_time_rejected() {
        let err = RigConfig::default()
            .with_frame_interval(-0.1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "frame_interval", .. }));
    }

    #[test]
    fn unrepresentable_duration_rejected() {
        let err = RigConfig::default()
            .with_motion_timeout(1e300)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "motion_timeout", .. }));

        let err = RigConfig::from_json_str(r#"{ "seek_dwell": 1e20 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "seek_dwell", .. }));
    }

    #[test]
    fn durations() {
        let config = RigConfig::default();
        assert_eq!(config.frame_interval_duration(), Duration::from_millis(100));
        assert_eq!(config.motion_timeout_duration(), Duration::from_secs(60));
        assert_eq!(config.without_delays().settle_duration(), Duration::ZERO);
    }

    #[test]
    fn park_height_uses_larger_offset() {
        let config = RigConfig::default();
        assert_eq!(config.park_height(100.0), 150.0);
        assert_eq!(config.with_safe_offset(80.0).park_height(100.0), 180.0);
    }

    #[test]
    fn load_missing_file() {
        let err = RigConfig::load(Path::new("/nonexistent/rig.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rig.json");
        std::fs::write(&path, r#"{ "seek_start_z": 115.05, "force_frame_rotation_deg": [90, 0, 180] }"#)
            .unwrap();

        let config = RigConfig::load(&path).unwrap();
        assert_eq!(config.seek_start_z, Some(115.05));
        assert_eq!(config.force_frame_rotation_deg, [90.0, 0.0, 180.0]);
    }
}
