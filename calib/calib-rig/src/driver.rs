//! Hardware seams.
//!
//! The rig talks to three devices: an industrial arm, a 3-axis force sensor
//! mounted at the tool flange, and a vision-based tactile sensor. Each is a
//! trait so the collection logic runs unchanged against real drivers or the
//! [`crate::sim`] bench.

use sensor_types::{MarkerField, Pose, SensorError};

use crate::error::MotionError;

/// A position-controlled robot arm.
///
/// Lengths are millimeters, angles are degrees. Motion commands may return
/// before the motion finishes; callers poll [`RobotArm::is_moving`].
pub trait RobotArm {
    /// Reads the current tool pose.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller cannot be queried.
    fn cartesian(&mut self) -> Result<Pose, MotionError>;

    /// Starts a linear move to `pose`.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller rejects the command.
    fn move_cartesian(&mut self, pose: &Pose) -> Result<(), MotionError>;

    /// Reads the six joint angles.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller cannot be queried.
    fn joints(&mut self) -> Result<[f64; 6], MotionError>;

    /// Starts a joint move.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller rejects the command.
    fn move_joints(&mut self, joints: [f64; 6]) -> Result<(), MotionError>;

    /// Sets linear (mm/s) and angular (deg/s) speed for subsequent moves.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller rejects the command.
    fn set_velocity(&mut self, linear: f64, angular: f64) -> Result<(), MotionError>;

    /// Sets acceleration and acceleration ramp for subsequent moves.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller rejects the command.
    fn set_acceleration(&mut self, acceleration: f64, ramp: f64) -> Result<(), MotionError>;

    /// Returns `true` while a commanded motion is still executing.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller cannot be queried.
    fn is_moving(&mut self) -> Result<bool, MotionError>;

    /// Switches the motors off.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller rejects the command.
    fn motor_off(&mut self) -> Result<(), MotionError>;
}

/// A 3-axis force sensor.
pub trait ForceSensor {
    /// Reads the instantaneous force `[Fx, Fy, Fz]` in Newtons, sensor frame.
    ///
    /// Pressing down on a surface produces a negative `Fz`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn read(&mut self) -> Result<[f64; 3], SensorError>;

    /// Zeroes the sensor at the current load.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor rejects the command.
    fn tare(&mut self) -> Result<(), SensorError>;
}

/// A marker-tracking tactile sensor.
pub trait TactileSensor {
    /// Reads the current marker displacement field.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn read_markers(&mut self) -> Result<MarkerField, SensorError>;

    /// Releases the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be released cleanly.
    fn release(&mut self) -> Result<(), SensorError>;
}

/// The three devices of a calibration bench, owned together.
#[derive(Debug)]
pub struct Rig<A, F, T> {
    /// Robot arm.
    pub arm: A,
    /// Force sensor.
    pub force: F,
    /// Tactile sensor.
    pub tactile: T,
}

impl<A, F, T> Rig<A, F, T>
where
    A: RobotArm,
    F: ForceSensor,
    T: TactileSensor,
{
    /// Bundles the three devices.
    #[must_use]
    pub const fn new(arm: A, force: F, tactile: T) -> Self {
        Self {
            arm,
            force,
            tactile,
        }
    }
}
