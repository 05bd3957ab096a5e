//! Force-guided contact seeking.

use std::thread;

use sensor_types::{Displacement, ForceReading};
use tracing::{debug, info};

use crate::config::RigConfig;
use crate::driver::{ForceSensor, RobotArm};
use crate::error::{Result, RigError};
use crate::motion::{MotionLimits, move_delta, move_to_z, set_speed};

/// Slack for accumulated float error in the travel bound.
const TRAVEL_EPSILON: f64 = 1e-9;

/// Contact knowledge carried across the trajectories of a session.
///
/// Once a contact height is found it is the seek start for every later
/// trajectory until [`ContactState::reset`] is called.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactState {
    z_cont: Option<f64>,
    /// Force at or below which contact is declared.
    pub contact_threshold: f64,
    /// Force at or below which the session must stop.
    pub max_force: f64,
}

impl ContactState {
    /// State with no known contact.
    #[must_use]
    pub const fn new(contact_threshold: f64, max_force: f64) -> Self {
        Self {
            z_cont: None,
            contact_threshold,
            max_force,
        }
    }

    /// State with thresholds from a configuration.
    #[must_use]
    pub const fn from_config(config: &RigConfig) -> Self {
        Self::new(config.contact_threshold, config.max_force)
    }

    /// Discovered contact height, if any.
    #[must_use]
    pub const fn contact_height(&self) -> Option<f64> {
        self.z_cont
    }

    /// Records a discovered contact height.
    pub const fn record(&mut self, z: f64) {
        self.z_cont = Some(z);
    }

    /// Forgets the contact height.
    pub const fn reset(&mut self) {
        self.z_cont = None;
    }
}

/// Result of a successful seek.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactReading {
    /// Arm height at which contact was detected.
    pub height: f64,
    /// Raw z force that triggered detection.
    pub force_z: f64,
    /// Distance descended from the approach height.
    pub travel_mm: f64,
}

/// Descends in small steps until the force sensor reports contact.
///
/// Each iteration takes one force reading and checks it against the safety
/// limit first and the contact threshold second. The descent is monotonic
/// and bounded by `max_seek_travel_mm`.
pub struct ContactSeeker<'a, A: ?Sized, F: ?Sized> {
    arm: &'a mut A,
    force: &'a mut F,
    config: &'a RigConfig,
    limits: MotionLimits,
}

impl<'a, A, F> ContactSeeker<'a, A, F>
where
    A: RobotArm + ?Sized,
    F: ForceSensor + ?Sized,
{
    /// Creates a seeker over the given devices.
    #[must_use]
    pub fn new(arm: &'a mut A, force: &'a mut F, config: &'a RigConfig) -> Self {
        Self {
            arm,
            force,
            config,
            limits: MotionLimits::from_config(config),
        }
    }

    /// Finds the contact height starting from `start_height`.
    ///
    /// Moves to `start_height + seek_clearance_mm` at traverse speed, then
    /// descends at approach speed by `seek_step_mm` per iteration, dwelling
    /// `seek_dwell` after each step. Press speed is restored on success.
    ///
    /// # Errors
    ///
    /// - [`RigError::SafetyFault`] if a reading is at or below `max_force`
    /// - [`RigError::ContactNotFound`] once `max_seek_travel_mm` is used up
    /// - [`RigError::Sensor`] if the force read fails or is not finite; the
    ///   arm does not move after such a reading
    /// - motion errors from the arm
    pub fn seek(&mut self, start_height: f64) -> Result<ContactReading> {
        let config = self.config;
        let approach_z = start_height + config.seek_clearance_mm;

        set_speed(&mut *self.arm, config.traverse_speed)?;
        move_to_z(&mut *self.arm, approach_z, self.limits)?;
        set_speed(&mut *self.arm, config.approach_speed)?;

        info!(start_z = approach_z, "seeking contact");

        let dwell = config.seek_dwell_duration();
        let step = Displacement::vertical(-config.seek_step_mm);
        let mut travel = 0.0;

        let reading = loop {
            let reading = self.force.read().and_then(ForceReading::checked).map_err(RigError::sensor)?;
            let fz = reading.fz();

            if reading.presses_at_least(config.max_force) {
                let z = self.arm.cartesian()?.z();
                return Err(RigError::SafetyFault {
                    force: fz,
                    limit: config.max_force,
                    z,
                });
            }

            if reading.presses_at_least(config.contact_threshold) {
                let height = self.arm.cartesian()?.z();
                break ContactReading {
                    height,
                    force_z: fz,
                    travel_mm: travel,
                };
            }

            if travel + config.seek_step_mm > config.max_seek_travel_mm + TRAVEL_EPSILON {
                return Err(RigError::ContactNotFound {
                    start_z: approach_z,
                    travel_mm: travel,
                });
            }

            debug!(fz, travel, "no contact yet");
            move_delta(&mut *self.arm, step, self.limits)?;
            travel += config.seek_step_mm;
            thread::sleep(dwell);
        };

        set_speed(&mut *self.arm, config.press_speed)?;
        info!(z_cont = reading.height, fz = reading.force_z, "contact found");
        Ok(reading)
    }
}
