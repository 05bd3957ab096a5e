//! Per-step calibration records.

use sensor_types::{MarkerField, Pose};
use serde::{Deserialize, Serialize};

/// Provenance of a step record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetadata {
    /// Name of the trajectory the step belongs to.
    pub trajectory: String,

    /// Zero-based position of the step in the trajectory.
    pub step_index: usize,

    /// Commanded relative motion `[dx, dy, dz]` in millimeters.
    pub commanded_delta_mm: [f64; 3],
}

impl StepMetadata {
    /// Creates step metadata.
    #[must_use]
    pub fn new(trajectory: impl Into<String>, step_index: usize, commanded_delta_mm: [f64; 3]) -> Self {
        Self {
            trajectory: trajectory.into(),
            step_index,
            commanded_delta_mm,
        }
    }
}

/// One unit of calibration data, captured after one relative motion completed.
///
/// Records are created once and never edited; a later session that
/// re-collects the same step replaces the whole record.
///
/// # Example
///
/// ```
/// use calib_dataset::{StepMetadata, StepRecord};
/// use sensor_types::MarkerField;
///
/// let record = StepRecord::new(
///     MarkerField::zeros(20, 11),
///     [0.0, 0.0, -0.4],
///     StepMetadata::new("push", 0, [0.0, 0.0, -1.0]),
/// );
///
/// assert_eq!(record.metadata.step_index, 0);
/// assert!(record.depth_field.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Tactile marker displacement field.
    pub marker_displacement: MarkerField,

    /// Averaged force `[Fx, Fy, Fz]` in Newtons, in the tactile sensor frame.
    pub force_xyz: [f64; 3],

    /// Provenance.
    pub metadata: StepMetadata,

    /// Tool pose once the step motion completed, when the arm reported it.
    pub sensor_pose: Option<Pose>,

    /// Depth field; only simulated sources produce one.
    pub depth_field: Option<Vec<f32>>,
}

impl StepRecord {
    /// Creates a record without pose or depth data.
    #[must_use]
    pub const fn new(marker_displacement: MarkerField, force_xyz: [f64; 3], metadata: StepMetadata) -> Self {
        Self {
            marker_displacement,
            force_xyz,
            metadata,
            sensor_pose: None,
            depth_field: None,
        }
    }

    /// Attaches the tool pose.
    #[must_use]
    pub const fn with_sensor_pose(mut self, pose: Pose) -> Self {
        self.sensor_pose = Some(pose);
        self
    }

    /// Attaches a depth field.
    #[must_use]
    pub fn with_depth_field(mut self, depth: Vec<f32>) -> Self {
        self.depth_field = Some(depth);
        self
    }

    /// Returns the averaged z force.
    #[must_use]
    pub const fn force_z(&self) -> f64 {
        self.force_xyz[2]
    }
}

/// Formats the storage key of the step at `index` (`step_000`, `step_001`, ...).
///
/// # Example
///
/// ```
/// use calib_dataset::step_key;
///
/// assert_eq!(step_key(7), "step_007");
/// assert_eq!(step_key(1234), "step_1234");
/// ```
#[must_use]
pub fn step_key(index: usize) -> String {
    format!("step_{index:03}")
}

/// Parses the step index back out of a storage key.
///
/// Returns `None` for keys that are not of the `step_NNN` form.
#[must_use]
pub fn parse_step_key(key: &str) -> Option<usize> {
    let digits = key.strip_prefix("step_")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
