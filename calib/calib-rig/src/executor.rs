//! Single-trajectory execution.

use std::thread;

use calib_dataset::{StepMetadata, StepRecord, TrajectoryRecords, step_key};
use sensor_types::{Displacement, Pose};
use tracing::{debug, info, warn};

use crate::config::RigConfig;
use crate::contact::{ContactSeeker, ContactState};
use crate::driver::{ForceSensor, Rig, RobotArm, TactileSensor};
use crate::error::{FaultScope, Result, RigError};
use crate::motion::{MotionLimits, move_delta, move_to_z};
use crate::sampler::SensorSampler;
use crate::trajectory::Trajectory;

/// Runs one trajectory: seek contact, walk the steps, sample each one.
///
/// The executor holds only settings; devices and contact state are passed
/// to [`TrajectoryExecutor::execute`] by the session that owns them.
#[derive(Debug, Clone)]
pub struct TrajectoryExecutor {
    config: RigConfig,
    sampler: SensorSampler,
    limits: MotionLimits,
    initial_pose: Pose,
}

impl TrajectoryExecutor {
    /// Creates an executor for a session started at `initial_pose`.
    #[must_use]
    pub fn new(config: RigConfig, initial_pose: Pose) -> Self {
        Self {
            sampler: SensorSampler::from_config(&config),
            limits: MotionLimits::from_config(&config),
            config,
            initial_pose,
        }
    }

    /// Executor configuration.
    #[must_use]
    pub const fn config(&self) -> &RigConfig {
        &self.config
    }

    /// Clearance height between trajectories.
    ///
    /// `z_cont + safe_offset_mm` once contact is known, otherwise relative
    /// to the initial pose.
    #[must_use]
    pub fn safe_height(&self, contact: &ContactState) -> f64 {
        contact.contact_height().unwrap_or_else(|| self.initial_pose.z()) + self.config.safe_offset_mm
    }

    /// Height the next contact seek starts from.
    #[must_use]
    pub fn seek_start(&self, contact: &ContactState) -> f64 {
        contact
            .contact_height()
            .or(self.config.seek_start_z)
            .unwrap_or_else(|| self.initial_pose.z())
    }

    /// Executes `trajectory` and returns its records keyed by step.
    ///
    /// An empty trajectory returns an empty map without touching the arm.
    /// The discovered contact height is stored in `contact`.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::Sampling`] if a step cannot be sampled, after a
    /// best-effort retreat to the safe height. Safety faults, seek failures
    /// and motion errors are returned unchanged.
    pub fn execute<A, F, T>(
        &self,
        rig: &mut Rig<A, F, T>,
        contact: &mut ContactState,
        trajectory: &Trajectory,
    ) -> Result<TrajectoryRecords>
    where
        A: RobotArm,
        F: ForceSensor,
        T: TactileSensor,
    {
        let mut records = TrajectoryRecords::new();
        if trajectory.is_empty() {
            debug!(trajectory = %trajectory.name, "empty trajectory");
            return Ok(records);
        }

        info!(trajectory = %trajectory.name, steps = trajectory.len(), "executing trajectory");

        self.retreat(rig, contact)?;

        let start = self.seek_start(contact);
        let reading = ContactSeeker::new(&mut rig.arm, &mut rig.force, &self.config).seek(start)?;
        contact.record(reading.height);
        thread::sleep(self.config.settle_duration());

        for (index, step) in trajectory.steps.iter().enumerate() {
            match self.run_step(rig, trajectory, index, *step) {
                Ok(record) => {
                    records.insert(step_key(index), record);
                }
                Err(err) => {
                    if err.scope() == FaultScope::Trajectory {
                        warn!(
                            trajectory = %trajectory.name,
                            step = index,
                            error = %err,
                            "step failed, retreating"
                        );
                        if let Err(retreat_err) = self.retreat(rig, contact) {
                            warn!(error = %retreat_err, "retreat after step failure failed");
                        }
                    }
                    return Err(err);
                }
            }
        }

        self.retreat(rig, contact)?;

        info!(trajectory = %trajectory.name, records = records.len(), "trajectory complete");
        Ok(records)
    }

    fn run_step<A, F, T>(
        &self,
        rig: &mut Rig<A, F, T>,
        trajectory: &Trajectory,
        index: usize,
        step: Displacement,
    ) -> Result<StepRecord>
    where
        A: RobotArm,
        F: ForceSensor,
        T: TactileSensor,
    {
        move_delta(&mut rig.arm, step, self.limits)?;

        let sample = self
            .sampler
            .sample(
                &mut rig.force,
                &mut rig.tactile,
                self.config.data_frames,
                self.config.frame_interval_duration(),
            )
            .map_err(RigError::sampling)?;

        let pose = rig.arm.cartesian()?;
        debug!(step = index, fz = sample.force_xyz[2], z = pose.z(), "step sampled");

        let metadata = StepMetadata::new(trajectory.name.clone(), index, step.as_array());
        Ok(StepRecord::new(sample.marker_displacement, sample.force_xyz, metadata).with_sensor_pose(pose))
    }

    fn retreat<A, F, T>(&self, rig: &mut Rig<A, F, T>, contact: &ContactState) -> Result<()>
    where
        A: RobotArm,
        F: ForceSensor,
        T: TactileSensor,
    {
        move_to_z(&mut rig.arm, self.safe_height(contact), self.limits)?;
        thread::sleep(self.config.settle_duration());
        Ok(())
    }
}
