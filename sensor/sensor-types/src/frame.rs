//! Tool poses and relative displacements.
//!
//! Lengths are in millimeters, matching what industrial arm controllers
//! report and accept.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A tool-center-point pose (position + orientation).
///
/// Position is in millimeters, orientation is a unit quaternion `[w, x, y, z]`.
///
/// # Example
///
/// ```
/// use sensor_types::Pose;
///
/// let pose = Pose::from_array([574.33, -176.67, 194.89, 0.0, 1.0, 0.0, 0.0]);
/// assert_eq!(pose.position, [574.33, -176.67, 194.89]);
/// assert_eq!(pose.orientation, [0.0, 1.0, 0.0, 0.0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Position in millimeters: `[x, y, z]`.
    pub position: [f64; 3],
    /// Orientation as unit quaternion: `[w, x, y, z]`.
    pub orientation: [f64; 4],
}

impl Pose {
    /// Creates a new pose from position and orientation.
    #[must_use]
    pub const fn new(position: [f64; 3], orientation: [f64; 4]) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Creates a pose from the controller's 7-value form `[x, y, z, qw, qx, qy, qz]`.
    #[must_use]
    pub const fn from_array(values: [f64; 7]) -> Self {
        Self {
            position: [values[0], values[1], values[2]],
            orientation: [values[3], values[4], values[5], values[6]],
        }
    }

    /// Returns the 7-value form `[x, y, z, qw, qx, qy, qz]`.
    #[must_use]
    pub const fn to_array(&self) -> [f64; 7] {
        let [x, y, z] = self.position;
        let [qw, qx, qy, qz] = self.orientation;
        [x, y, z, qw, qx, qy, qz]
    }

    /// Returns the height (z) in millimeters.
    #[must_use]
    pub const fn z(&self) -> f64 {
        self.position[2]
    }

    /// Returns the same pose moved to height `z`.
    #[must_use]
    pub const fn with_z(mut self, z: f64) -> Self {
        self.position[2] = z;
        self
    }

    /// Returns the pose translated by `delta`, keeping orientation.
    ///
    /// # Example
    ///
    /// ```
    /// use sensor_types::{Displacement, Pose};
    ///
    /// let pose = Pose::new([1.0, 2.0, 3.0], [1.0, 0.0, 0.0, 0.0]);
    /// let moved = pose.translated(Displacement::new(0.5, 0.0, -1.0));
    /// assert_eq!(moved.position, [1.5, 2.0, 2.0]);
    /// ```
    #[must_use]
    pub fn translated(&self, delta: Displacement) -> Self {
        Self {
            position: [
                self.position[0] + delta.dx,
                self.position[1] + delta.dy,
                self.position[2] + delta.dz,
            ],
            orientation: self.orientation,
        }
    }

    /// Returns the quaternion norm (should be ~1.0 for valid poses).
    #[must_use]
    pub fn quaternion_norm(&self) -> f64 {
        let [w, x, y, z] = self.orientation;
        w.mul_add(w, x.mul_add(x, y.mul_add(y, z * z))).sqrt()
    }

    /// Normalizes the quaternion to unit length.
    ///
    /// Returns `None` if the quaternion has zero length.
    #[must_use]
    pub fn normalized(&self) -> Option<Self> {
        let norm = self.quaternion_norm();
        if norm < 1e-10 {
            return None;
        }
        let [w, x, y, z] = self.orientation;
        Some(Self {
            position: self.position,
            orientation: [w / norm, x / norm, y / norm, z / norm],
        })
    }

    /// Checks if the quaternion is approximately normalized.
    #[must_use]
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        (self.quaternion_norm() - 1.0).abs() < tolerance
    }
}

/// A relative Cartesian displacement in millimeters.
///
/// One scripted trajectory step. Orientation never changes during a step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Displacement {
    /// Displacement along x (mm).
    pub dx: f64,
    /// Displacement along y (mm).
    pub dy: f64,
    /// Displacement along z (mm).
    pub dz: f64,
}

impl Displacement {
    /// Creates a new displacement.
    #[must_use]
    pub const fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    /// A pure vertical displacement.
    #[must_use]
    pub const fn vertical(dz: f64) -> Self {
        Self {
            dx: 0.0,
            dy: 0.0,
            dz,
        }
    }

    /// Returns `[dx, dy, dz]`.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 3] {
        [self.dx, self.dy, self.dz]
    }

    /// Returns `true` if every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.dx.is_finite() && self.dy.is_finite() && self.dz.is_finite()
    }
}

impl From<[f64; 3]> for Displacement {
    fn from([dx, dy, dz]: [f64; 3]) -> Self {
        Self { dx, dy, dz }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::float_cmp)] // Exact constant values, direct copy
    fn pose_array_roundtrip() {
        let values = [1.0, 2.0, 3.0, 0.0, 1.0, 0.0, 0.0];
        assert_eq!(Pose::from_array(values).to_array(), values);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn pose_with_z_keeps_xy_and_orientation() {
        let pose = Pose::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0, 0.0]).with_z(10.0);
        assert_eq!(pose.position, [1.0, 2.0, 10.0]);
        assert_eq!(pose.orientation, [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn pose_translated() {
        let pose = Pose::new([0.0, 0.0, 100.0], [1.0, 0.0, 0.0, 0.0]);
        let moved = pose.translated(Displacement::vertical(-0.01));
        assert!((moved.z() - 99.99).abs() < 1e-9);
    }

    #[test]
    fn pose_normalize() {
        let pose = Pose::new([0.0, 0.0, 0.0], [2.0, 0.0, 0.0, 0.0]);
        let n = pose.normalized();
        assert!(n.is_some_and(|p| p.is_normalized(1e-10)));
    }

    #[test]
    fn pose_zero_quaternion() {
        let pose = Pose::new([0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0]);
        assert!(pose.normalized().is_none());
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn displacement_from_array() {
        let d = Displacement::from([0.0, 0.5, -1.0]);
        assert_eq!(d.as_array(), [0.0, 0.5, -1.0]);
        assert!(d.is_finite());
        assert!(!Displacement::new(f64::INFINITY, 0.0, 0.0).is_finite());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn pose_serialization() {
        let json = serde_json::to_string(&Pose::new([1.0, 2.0, 3.0], [1.0, 0.0, 0.0, 0.0])).ok();
        assert!(json.is_some());
    }
}
