//! Collection sessions: startup, per-object runs, and guaranteed teardown.

use std::thread;

use calib_dataset::{CalibrationStore, CalibrationTree, MergeReport, RecordPath};
use sensor_types::Pose;
use tracing::{error, info, warn};

use crate::config::RigConfig;
use crate::context::SessionContext;
use crate::contact::ContactState;
use crate::driver::{ForceSensor, Rig, RobotArm, TactileSensor};
use crate::error::{ConfigError, FaultScope, Result, RigError};
use crate::executor::TrajectoryExecutor;
use crate::motion::{MotionLimits, move_to, move_to_z, set_speed, unwind_wrist};
use crate::trajectory::TrajectoryLibrary;

/// A trajectory a dry run would execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTrajectory {
    /// Trajectory name.
    pub name: String,
    /// Number of steps.
    pub steps: usize,
}

/// What teardown did.
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// The arm reached the park height.
    pub parked: bool,
    /// Merge outcome, when records were persisted.
    pub merge: Option<MergeReport>,
    /// Failures of individual teardown steps, in order.
    pub failures: Vec<RigError>,
}

impl TeardownReport {
    /// Returns `true` if every teardown step succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One data-collection session on a calibration bench.
///
/// The session owns the devices. Startup (acceleration, home pose, wrist
/// unwind, initial pose, force tare) happens lazily before the first
/// motion, so a dry run or an unknown object never moves the arm.
///
/// Teardown runs exactly once, through [`CalibrationSession::close`] or on
/// drop: park the arm if it was started, persist collected records, release
/// the tactile sensor and switch the motors off. Every step runs even when
/// an earlier one fails.
///
/// # Example
///
/// ```
/// use calib_rig::sim::{BenchConfig, SimulatedBench};
/// use calib_rig::{CalibrationSession, RigConfig, Trajectory, TrajectoryLibrary};
/// use sensor_types::{Displacement, Pose};
///
/// let bench = SimulatedBench::new(BenchConfig::default().with_surface_z(130.0));
/// let library = TrajectoryLibrary::new()
///     .with_trajectory(Trajectory::new("cube", "push", vec![Displacement::vertical(-0.1); 3]));
/// let config = RigConfig::default().without_delays().with_data_frames(2);
/// let pose0 = Pose::from_array([556.58, -200.07, 134.89, 0.0, 1.0, 0.0, 0.0]);
///
/// let mut session = CalibrationSession::new(bench.rig(), config, library, pose0).unwrap();
/// let tree = session.run("cube").unwrap();
/// assert_eq!(tree.record_count(), 3);
///
/// let report = session.close();
/// assert!(report.is_clean());
/// assert!(!bench.motors_on());
/// ```
pub struct CalibrationSession<A, F, T>
where
    A: RobotArm,
    F: ForceSensor,
    T: TactileSensor,
{
    rig: Rig<A, F, T>,
    config: RigConfig,
    library: TrajectoryLibrary,
    executor: TrajectoryExecutor,
    initial_pose: Pose,
    contact: ContactState,
    store: Option<CalibrationStore>,
    ctx: SessionContext,
    tree: CalibrationTree,
    overwritten: Vec<RecordPath>,
    started: bool,
    torn_down: bool,
}

impl<A, F, T> CalibrationSession<A, F, T>
where
    A: RobotArm,
    F: ForceSensor,
    T: TactileSensor,
{
    /// Creates a session. Nothing is sent to the devices yet.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::Config`] if the configuration is invalid or the
    /// initial pose has no usable orientation.
    pub fn new(
        rig: Rig<A, F, T>,
        config: RigConfig,
        library: TrajectoryLibrary,
        initial_pose: Pose,
    ) -> Result<Self> {
        config.validate()?;
        let initial_pose = initial_pose
            .normalized()
            .ok_or_else(|| ConfigError::invalid("initial_pose", "orientation quaternion has zero norm"))?;

        Ok(Self {
            rig,
            executor: TrajectoryExecutor::new(config.clone(), initial_pose),
            contact: ContactState::from_config(&config),
            config,
            library,
            initial_pose,
            store: None,
            ctx: SessionContext::from_clock(),
            tree: CalibrationTree::new(),
            overwritten: Vec::new(),
            started: false,
            torn_down: false,
        })
    }

    /// Persists collected records to `store` at teardown.
    #[must_use]
    pub fn with_store(mut self, store: CalibrationStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses an explicit logging context.
    #[must_use]
    pub fn with_context(mut self, ctx: SessionContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Session logging context.
    #[must_use]
    pub const fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Records collected so far in this session.
    #[must_use]
    pub const fn tree(&self) -> &CalibrationTree {
        &self.tree
    }

    /// Records of this session replaced by a later run, in the order they
    /// were replaced.
    #[must_use]
    pub fn overwritten(&self) -> &[RecordPath] {
        &self.overwritten
    }

    /// Discovered contact height, if any.
    #[must_use]
    pub const fn contact_height(&self) -> Option<f64> {
        self.contact.contact_height()
    }

    /// Forgets the contact height; the next trajectory seeks from scratch.
    pub fn reset_contact(&mut self) {
        info!(session = %self.ctx.id(), "contact height reset");
        self.contact.reset();
    }

    /// Lists what a run of `object` would execute, without touching the devices.
    ///
    /// Returns an empty list (and logs a warning) for an unknown object.
    #[must_use]
    pub fn dry_run(&self, object: &str) -> Vec<PlannedTrajectory> {
        let _guard = self.ctx.span().enter();

        let Some(trajectories) = self.library.trajectories(object) else {
            warn!(object, "object not in trajectory library");
            return Vec::new();
        };

        trajectories
            .iter()
            .map(|trajectory| {
                info!(object, trajectory = %trajectory.name, steps = trajectory.len(), "planned");
                PlannedTrajectory {
                    name: trajectory.name.clone(),
                    steps: trajectory.len(),
                }
            })
            .collect()
    }

    /// Collects every trajectory of `object`.
    ///
    /// Returns the object's subtree of the session tree. An unknown object
    /// yields an empty subtree without starting the arm. A failed step
    /// sample abandons only its trajectory. Running an object again merges
    /// step by step; every replaced record is logged and listed by
    /// [`CalibrationSession::overwritten`].
    ///
    /// # Errors
    ///
    /// Returns the first session-scoped failure (safety fault, contact not
    /// found, motion failure or timeout, force sensor failure). Records of
    /// trajectories completed before it stay in the session tree and are
    /// persisted at teardown.
    pub fn run(&mut self, object: &str) -> Result<CalibrationTree> {
        let span = self.ctx.span().clone();
        let _guard = span.enter();

        let Some(trajectories) = self.library.trajectories(object).map(<[_]>::to_vec) else {
            warn!(object, "object not in trajectory library, skipping");
            let mut empty = CalibrationTree::new();
            empty.ensure_object(object);
            return Ok(empty);
        };

        info!(object, trajectories = trajectories.len(), "collecting object");
        self.ensure_started()?;
        self.tree.ensure_object(object);

        for trajectory in &trajectories {
            let trajectory_span = self.ctx.trajectory_span(object, &trajectory.name);
            let _trajectory_guard = trajectory_span.enter();

            match self.executor.execute(&mut self.rig, &mut self.contact, trajectory) {
                Ok(records) if records.is_empty() => {}
                Ok(records) => {
                    let mut collected = CalibrationTree::new();
                    collected.insert_trajectory(object, trajectory.name.clone(), records);
                    let merge = self.tree.merge(collected);
                    self.overwritten.extend(merge.overwritten);
                }
                Err(err) if err.scope() == FaultScope::Trajectory => {
                    error!(object, trajectory = %trajectory.name, error = %err, "trajectory skipped");
                }
                Err(err) => {
                    error!(object, trajectory = %trajectory.name, error = %err, "session aborted");
                    return Err(err);
                }
            }
        }

        let subtree = self.tree.subtree(object);
        info!(
            object,
            trajectories = subtree.trajectory_count(),
            records = subtree.record_count(),
            "object complete"
        );
        Ok(subtree)
    }

    /// Tears the session down and returns what happened.
    pub fn close(mut self) -> TeardownReport {
        self.teardown()
    }

    fn ensure_started(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        // Any command below may move the arm, so teardown must park from here on.
        self.started = true;

        info!("starting rig");
        let limits = MotionLimits::from_config(&self.config);
        let settle = self.config.settle_duration();
        let arm = &mut self.rig.arm;

        arm.set_acceleration(self.config.acceleration, self.config.acceleration)?;
        set_speed(arm, self.config.traverse_speed)?;
        move_to(arm, &Pose::from_array(self.config.home_pose), limits)?;
        unwind_wrist(arm, limits)?;
        thread::sleep(settle);

        move_to(arm, &self.initial_pose, limits)?;
        thread::sleep(settle);

        self.rig.force.tare().map_err(RigError::sensor)?;
        info!(z = self.initial_pose.z(), "rig ready");
        Ok(())
    }

    fn park(&mut self) -> Result<()> {
        let limits = MotionLimits::from_config(&self.config);
        let park_z = self.config.park_height(self.initial_pose.z());
        set_speed(&mut self.rig.arm, self.config.traverse_speed)?;
        move_to_z(&mut self.rig.arm, park_z, limits)?;
        thread::sleep(self.config.settle_duration());
        Ok(())
    }

    fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        if self.torn_down {
            return report;
        }
        self.torn_down = true;

        let span = self.ctx.span().clone();
        let _guard = span.enter();
        info!("tearing down");

        if self.started {
            match self.park() {
                Ok(()) => report.parked = true,
                Err(err) => {
                    error!(error = %err, "failed to park arm");
                    report.failures.push(err);
                }
            }
        }

        if let Some(store) = &self.store {
            if self.tree.is_empty() {
                warn!("no records collected, store left untouched");
            } else {
                match store.merge_and_save(self.tree.clone()) {
                    Ok(merge) => report.merge = merge,
                    Err(err) => {
                        error!(error = %err, path = %store.path().display(), "failed to persist records");
                        report.failures.push(err.into());
                    }
                }
            }
        }

        if let Err(err) = self.rig.tactile.release() {
            error!(error = %err, "failed to release tactile sensor");
            report.failures.push(RigError::sensor(err));
        }

        if let Err(err) = self.rig.arm.motor_off() {
            error!(error = %err, "failed to switch motors off");
            report.failures.push(err.into());
        }

        info!(clean = report.is_clean(), "teardown complete");
        report
    }
}

impl<A, F, T> Drop for CalibrationSession<A, F, T>
where
    A: RobotArm,
    F: ForceSensor,
    T: TactileSensor,
{
    fn drop(&mut self) {
        if !self.torn_down {
            let _ = self.teardown();
        }
    }
}
