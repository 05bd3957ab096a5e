//! Blocking motion helpers with bounded waits.
//!
//! Every helper issues one command and then polls the arm until it is idle.
//! A motion that stays busy past [`MotionLimits::timeout`] fails with
//! [`RigError::MotionTimeout`] instead of hanging the session.

use std::thread;
use std::time::{Duration, Instant};

use sensor_types::{Displacement, Pose};
use tracing::{debug, info};

use crate::config::RigConfig;
use crate::driver::RobotArm;
use crate::error::{Result, RigError};

/// Poll period and upper bound for a single motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionLimits {
    /// Pause between busy-flag polls.
    pub poll: Duration,
    /// Longest accepted motion.
    pub timeout: Duration,
}

impl MotionLimits {
    /// Creates limits.
    #[must_use]
    pub const fn new(poll: Duration, timeout: Duration) -> Self {
        Self { poll, timeout }
    }

    /// Limits from a configuration (`step_settle_time`, `motion_timeout`).
    #[must_use]
    pub fn from_config(config: &RigConfig) -> Self {
        Self::new(config.settle_duration(), config.motion_timeout_duration())
    }
}

/// Polls until the arm reports idle.
///
/// # Errors
///
/// Returns [`RigError::MotionTimeout`] if the arm is still moving after
/// `limits.timeout`, or a driver error.
pub fn wait_until_idle<A: RobotArm + ?Sized>(arm: &mut A, limits: MotionLimits) -> Result<()> {
    let started = Instant::now();
    while arm.is_moving()? {
        if started.elapsed() >= limits.timeout {
            return Err(RigError::MotionTimeout(limits.timeout));
        }
        thread::sleep(limits.poll);
    }
    Ok(())
}

/// Moves to `pose` and waits for the motion to finish.
///
/// # Errors
///
/// Returns a driver error or [`RigError::MotionTimeout`].
pub fn move_to<A: RobotArm + ?Sized>(arm: &mut A, pose: &Pose, limits: MotionLimits) -> Result<()> {
    arm.move_cartesian(pose)?;
    wait_until_idle(arm, limits)
}

/// Moves vertically to height `z`, keeping x, y and orientation.
///
/// Returns the commanded target pose.
///
/// # Errors
///
/// Returns a driver error or [`RigError::MotionTimeout`].
pub fn move_to_z<A: RobotArm + ?Sized>(arm: &mut A, z: f64, limits: MotionLimits) -> Result<Pose> {
    let target = arm.cartesian()?.with_z(z);
    debug!(z, "moving to height");
    move_to(arm, &target, limits)?;
    Ok(target)
}

/// Applies a relative displacement to the current pose.
///
/// Returns the commanded target pose.
///
/// # Errors
///
/// Returns a driver error or [`RigError::MotionTimeout`].
pub fn move_delta<A: RobotArm + ?Sized>(
    arm: &mut A,
    delta: Displacement,
    limits: MotionLimits,
) -> Result<Pose> {
    let target = arm.cartesian()?.translated(delta);
    move_to(arm, &target, limits)?;
    Ok(target)
}

/// Sets the same linear and angular speed.
///
/// # Errors
///
/// Returns a driver error.
pub fn set_speed<A: RobotArm + ?Sized>(arm: &mut A, speed: f64) -> Result<()> {
    arm.set_velocity(speed, speed)?;
    Ok(())
}

/// Brings joint 6 back into `[-180, 180]` degrees.
///
/// Returns `true` if a joint move was needed.
///
/// # Errors
///
/// Returns a driver error or [`RigError::MotionTimeout`].
pub fn unwind_wrist<A: RobotArm + ?Sized>(arm: &mut A, limits: MotionLimits) -> Result<bool> {
    let mut joints = arm.joints()?;
    let wrist = joints[5];
    let unwound = if wrist > 180.0 {
        wrist - 360.0
    } else if wrist < -180.0 {
        wrist + 360.0
    } else {
        return Ok(false);
    };

    info!(from = wrist, to = unwound, "unwinding joint 6");
    joints[5] = unwound;
    arm.move_joints(joints)?;
    wait_until_idle(arm, limits)?;
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::sim::{ArmCommand, BenchConfig, SimulatedBench};

    fn limits() -> MotionLimits {
        MotionLimits::new(Duration::ZERO, Duration::from_millis(200))
    }

    #[test]
    fn move_to_z_keeps_xy() {
        let bench = SimulatedBench::new(BenchConfig::default());
        let mut arm = bench.arm();
        let start = arm.cartesian().unwrap();

        let target = move_to_z(&mut arm, start.z() + 5.0, limits()).unwrap();
        assert_eq!(target.position[0], start.position[0]);
        assert_eq!(target.position[1], start.position[1]);
        assert_eq!(bench.tool_pose().z(), start.z() + 5.0);
    }

    #[test]
    fn move_delta_is_relative() {
        let bench = SimulatedBench::new(BenchConfig::default());
        let mut arm = bench.arm();
        let start = arm.cartesian().unwrap();

        move_delta(&mut arm, Displacement::new(1.0, -2.0, 0.5), limits()).unwrap();
        let end = bench.tool_pose();
        assert!((end.position[0] - start.position[0] - 1.0).abs() < 1e-9);
        assert!((end.position[1] - start.position[1] + 2.0).abs() < 1e-9);
        assert!((end.z() - start.z() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn busy_arm_is_polled_until_idle() {
        let bench = SimulatedBench::new(BenchConfig::default().with_busy_polls(3));
        let mut arm = bench.arm();
        move_to_z(&mut arm, 120.0, limits()).unwrap();
        assert_eq!(bench.tool_pose().z(), 120.0);
    }

    #[test]
    fn stuck_arm_times_out() {
        let bench = SimulatedBench::new(BenchConfig::default());
        bench.set_arm_stuck(true);
        let mut arm = bench.arm();

        let err = move_to_z(&mut arm, 120.0, MotionLimits::new(Duration::ZERO, Duration::from_millis(20)))
            .unwrap_err();
        assert!(matches!(err, RigError::MotionTimeout(_)));
    }

    #[test]
    fn wrist_unwind() {
        let bench = SimulatedBench::new(BenchConfig::default().with_joints([0.0, 10.0, 20.0, 0.0, 45.0, 250.0]));
        let mut arm = bench.arm();

        assert!(unwind_wrist(&mut arm, limits()).unwrap());
        assert_eq!(arm.joints().unwrap()[5], -110.0);
        assert!(!unwind_wrist(&mut arm, limits()).unwrap());

        let joint_moves = bench
            .commands()
            .iter()
            .filter(|c| matches!(c, ArmCommand::MoveJoints(_)))
            .count();
        assert_eq!(joint_moves, 1);
    }

    #[test]
    fn wrist_unwind_negative() {
        let bench = SimulatedBench::new(BenchConfig::default().with_joints([0.0, 0.0, 0.0, 0.0, 0.0, -200.0]));
        let mut arm = bench.arm();
        assert!(unwind_wrist(&mut arm, limits()).unwrap());
        assert_eq!(arm.joints().unwrap()[5], 160.0);
    }
}
