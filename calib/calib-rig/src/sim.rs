//! Deterministic simulated calibration bench.
//!
//! A flat elastic surface sits at `surface_z`. Pushing the tool below it
//! produces `Fz = -stiffness * penetration` and spreads the tactile markers
//! outward in proportion to the penetration. Motions complete instantly
//! after a configurable number of busy polls.
//!
//! The bench hands out three device handles that share one state, and
//! records every arm command so tests can check what the rig did.
//! Failures can be injected on every device.
//!
//! # Example
//!
//! ```
//! use calib_rig::sim::{BenchConfig, SimulatedBench};
//! use calib_rig::{ForceSensor, RobotArm};
//!
//! let bench = SimulatedBench::new(BenchConfig::default().with_surface_z(100.0));
//! let mut arm = bench.arm();
//! let mut force = bench.force_sensor();
//!
//! let pose = arm.cartesian().unwrap().with_z(99.5);
//! arm.move_cartesian(&pose).unwrap();
//! assert!((force.read().unwrap()[2] + 0.5).abs() < 1e-9);
//! ```

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use sensor_types::{DEFAULT_MARKER_COLS, DEFAULT_MARKER_ROWS, MarkerField, Pose, SensorError};

use crate::config::DEFAULT_HOME_POSE;
use crate::driver::{ForceSensor, Rig, RobotArm, TactileSensor};
use crate::error::MotionError;

/// A command received by the simulated arm.
#[derive(Debug, Clone, PartialEq)]
pub enum ArmCommand {
    /// Linear move to a pose.
    MoveCartesian(Pose),
    /// Joint move.
    MoveJoints([f64; 6]),
    /// Speed change `(linear, angular)`.
    SetVelocity(f64, f64),
    /// Acceleration change `(acceleration, ramp)`.
    SetAcceleration(f64, f64),
    /// Motors switched off.
    MotorOff,
}

impl ArmCommand {
    /// Returns `true` for commands that move the arm.
    #[must_use]
    pub const fn is_motion(&self) -> bool {
        matches!(self, Self::MoveCartesian(_) | Self::MoveJoints(_))
    }
}

/// Physical parameters of the simulated bench.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    /// Tool pose at power-on.
    pub initial_pose: Pose,
    /// Joint angles at power-on, degrees.
    pub initial_joints: [f64; 6],
    /// Height of the contact surface, mm.
    pub surface_z: f64,
    /// Surface stiffness, N/mm.
    pub stiffness: f64,
    /// Constant force offset removed by taring, N.
    pub force_bias: [f64; 3],
    /// Marker grid rows.
    pub marker_rows: usize,
    /// Marker grid columns.
    pub marker_cols: usize,
    /// Marker spread per mm of penetration.
    pub marker_gain: f64,
    /// Busy polls reported after each motion command.
    pub busy_polls: u32,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            initial_pose: Pose::from_array(DEFAULT_HOME_POSE),
            initial_joints: [0.0, 30.0, 10.0, 0.0, 50.0, 0.0],
            surface_z: 130.0,
            stiffness: 1.0,
            force_bias: [0.0; 3],
            marker_rows: DEFAULT_MARKER_ROWS,
            marker_cols: DEFAULT_MARKER_COLS,
            marker_gain: 0.5,
            busy_polls: 0,
        }
    }
}

impl BenchConfig {
    /// Sets the surface height.
    #[must_use]
    pub const fn with_surface_z(mut self, z: f64) -> Self {
        self.surface_z = z;
        self
    }

    /// Sets the surface stiffness.
    #[must_use]
    pub const fn with_stiffness(mut self, newtons_per_mm: f64) -> Self {
        self.stiffness = newtons_per_mm;
        self
    }

    /// Sets the force offset present before taring.
    #[must_use]
    pub const fn with_force_bias(mut self, bias: [f64; 3]) -> Self {
        self.force_bias = bias;
        self
    }

    /// Sets the power-on joint angles.
    #[must_use]
    pub const fn with_joints(mut self, joints: [f64; 6]) -> Self {
        self.initial_joints = joints;
        self
    }

    /// Sets the power-on tool pose.
    #[must_use]
    pub const fn with_initial_pose(mut self, pose: Pose) -> Self {
        self.initial_pose = pose;
        self
    }

    /// Sets the busy polls reported after each motion command.
    #[must_use]
    pub const fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }
}

#[derive(Debug)]
struct BenchState {
    config: BenchConfig,
    pose: Pose,
    joints: [f64; 6],
    busy_remaining: u32,
    stuck: bool,
    arm_fault: bool,
    motors_on: bool,
    commands: Vec<ArmCommand>,
    tare_offset: [f64; 3],
    tare_count: usize,
    force_reads: usize,
    force_fail_after: Option<usize>,
    tactile_reads: usize,
    tactile_failures: BTreeSet<usize>,
    tactile_released: bool,
}

impl BenchState {
    fn new(config: BenchConfig) -> Self {
        Self {
            pose: config.initial_pose,
            joints: config.initial_joints,
            busy_remaining: 0,
            stuck: false,
            arm_fault: false,
            motors_on: true,
            commands: Vec::new(),
            tare_offset: [0.0; 3],
            tare_count: 0,
            force_reads: 0,
            force_fail_after: None,
            tactile_reads: 0,
            tactile_failures: BTreeSet::new(),
            tactile_released: false,
            config,
        }
    }

    fn penetration(&self) -> f64 {
        (self.config.surface_z - self.pose.z()).max(0.0)
    }

    fn raw_force(&self) -> [f64; 3] {
        let [bx, by, bz] = self.config.force_bias;
        [bx, by, bz - self.config.stiffness * self.penetration()]
    }

    fn check_arm(&self, command: &str) -> Result<(), MotionError> {
        if self.arm_fault {
            Err(MotionError::command_failed(command, "simulated controller fault"))
        } else {
            Ok(())
        }
    }

    fn start_motion(&mut self, command: ArmCommand) {
        self.commands.push(command);
        self.busy_remaining = self.config.busy_polls;
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn marker_field(&self) -> Result<MarkerField, SensorError> {
        let rows = self.config.marker_rows;
        let cols = self.config.marker_cols;
        let spread = self.config.marker_gain * self.penetration();
        let center_row = (rows as f64 - 1.0) / 2.0;
        let center_col = (cols as f64 - 1.0) / 2.0;

        let mut displacements = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let u = (col as f64 - center_col) / cols as f64;
                let v = (row as f64 - center_row) / rows as f64;
                displacements.push([(u * spread) as f32, (v * spread) as f32]);
            }
        }
        MarkerField::new(rows, cols, displacements)
    }
}

type Shared = Rc<RefCell<BenchState>>;

/// A simulated bench shared by its device handles.
#[derive(Debug, Clone)]
pub struct SimulatedBench {
    state: Shared,
}

impl SimulatedBench {
    /// Powers on a bench.
    #[must_use]
    pub fn new(config: BenchConfig) -> Self {
        Self {
            state: Rc::new(RefCell::new(BenchState::new(config))),
        }
    }

    /// Arm handle.
    #[must_use]
    pub fn arm(&self) -> SimArm {
        SimArm {
            state: Rc::clone(&self.state),
        }
    }

    /// Force sensor handle.
    #[must_use]
    pub fn force_sensor(&self) -> SimForceSensor {
        SimForceSensor {
            state: Rc::clone(&self.state),
        }
    }

    /// Tactile sensor handle.
    #[must_use]
    pub fn tactile(&self) -> SimTactile {
        SimTactile {
            state: Rc::clone(&self.state),
        }
    }

    /// All three handles bundled as a rig.
    #[must_use]
    pub fn rig(&self) -> Rig<SimArm, SimForceSensor, SimTactile> {
        Rig::new(self.arm(), self.force_sensor(), self.tactile())
    }

    /// Current tool pose.
    #[must_use]
    pub fn tool_pose(&self) -> Pose {
        self.state.borrow().pose
    }

    /// Current joint angles.
    #[must_use]
    pub fn joints(&self) -> [f64; 6] {
        self.state.borrow().joints
    }

    /// Current penetration into the surface, mm.
    #[must_use]
    pub fn penetration(&self) -> f64 {
        self.state.borrow().penetration()
    }

    /// Every arm command received so far.
    #[must_use]
    pub fn commands(&self) -> Vec<ArmCommand> {
        self.state.borrow().commands.clone()
    }

    /// Number of motion commands received so far.
    #[must_use]
    pub fn motion_count(&self) -> usize {
        self.state
            .borrow()
            .commands
            .iter()
            .filter(|c| c.is_motion())
            .count()
    }

    /// Number of force reads so far, including failed ones.
    #[must_use]
    pub fn force_read_count(&self) -> usize {
        self.state.borrow().force_reads
    }

    /// Number of tactile reads so far, including failed ones.
    #[must_use]
    pub fn tactile_read_count(&self) -> usize {
        self.state.borrow().tactile_reads
    }

    /// Number of tare commands received.
    #[must_use]
    pub fn tare_count(&self) -> usize {
        self.state.borrow().tare_count
    }

    /// Returns `true` once the tactile sensor was released.
    #[must_use]
    pub fn tactile_released(&self) -> bool {
        self.state.borrow().tactile_released
    }

    /// Returns `true` until the motors are switched off.
    #[must_use]
    pub fn motors_on(&self) -> bool {
        self.state.borrow().motors_on
    }

    /// Keeps the arm reporting busy forever.
    pub fn set_arm_stuck(&self, stuck: bool) {
        self.state.borrow_mut().stuck = stuck;
    }

    /// Makes every arm command fail.
    pub fn set_arm_fault(&self, fault: bool) {
        self.state.borrow_mut().arm_fault = fault;
    }

    /// Fails every force read after the first `reads` successful ones.
    pub fn fail_force_reads_after(&self, reads: usize) {
        let mut state = self.state.borrow_mut();
        state.force_fail_after = Some(state.force_reads + reads);
    }

    /// Fails the tactile read with zero-based index `read`.
    pub fn fail_tactile_read(&self, read: usize) {
        self.state.borrow_mut().tactile_failures.insert(read);
    }
}

/// Simulated arm handle.
#[derive(Debug)]
pub struct SimArm {
    state: Shared,
}

impl RobotArm for SimArm {
    fn cartesian(&mut self) -> Result<Pose, MotionError> {
        let state = self.state.borrow();
        state.check_arm("cartesian")?;
        Ok(state.pose)
    }

    fn move_cartesian(&mut self, pose: &Pose) -> Result<(), MotionError> {
        let mut state = self.state.borrow_mut();
        state.check_arm("move_cartesian")?;
        state.start_motion(ArmCommand::MoveCartesian(*pose));
        state.pose = *pose;
        Ok(())
    }

    fn joints(&mut self) -> Result<[f64; 6], MotionError> {
        let state = self.state.borrow();
        state.check_arm("joints")?;
        Ok(state.joints)
    }

    fn move_joints(&mut self, joints: [f64; 6]) -> Result<(), MotionError> {
        let mut state = self.state.borrow_mut();
        state.check_arm("move_joints")?;
        state.start_motion(ArmCommand::MoveJoints(joints));
        state.joints = joints;
        Ok(())
    }

    fn set_velocity(&mut self, linear: f64, angular: f64) -> Result<(), MotionError> {
        let mut state = self.state.borrow_mut();
        state.check_arm("set_velocity")?;
        state.commands.push(ArmCommand::SetVelocity(linear, angular));
        Ok(())
    }

    fn set_acceleration(&mut self, acceleration: f64, ramp: f64) -> Result<(), MotionError> {
        let mut state = self.state.borrow_mut();
        state.check_arm("set_acceleration")?;
        state
            .commands
            .push(ArmCommand::SetAcceleration(acceleration, ramp));
        Ok(())
    }

    fn is_moving(&mut self) -> Result<bool, MotionError> {
        let mut state = self.state.borrow_mut();
        state.check_arm("is_moving")?;
        if state.stuck {
            return Ok(true);
        }
        if state.busy_remaining > 0 {
            state.busy_remaining -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn motor_off(&mut self) -> Result<(), MotionError> {
        let mut state = self.state.borrow_mut();
        state.check_arm("motor_off")?;
        state.commands.push(ArmCommand::MotorOff);
        state.motors_on = false;
        Ok(())
    }
}

/// Simulated force sensor handle.
#[derive(Debug)]
pub struct SimForceSensor {
    state: Shared,
}

impl ForceSensor for SimForceSensor {
    fn read(&mut self) -> Result<[f64; 3], SensorError> {
        let mut state = self.state.borrow_mut();
        let index = state.force_reads;
        state.force_reads += 1;
        if state.force_fail_after.is_some_and(|limit| index >= limit) {
            return Err(SensorError::read_failed("sim-force", "injected read failure"));
        }

        let raw = state.raw_force();
        let offset = state.tare_offset;
        Ok([raw[0] - offset[0], raw[1] - offset[1], raw[2] - offset[2]])
    }

    fn tare(&mut self) -> Result<(), SensorError> {
        let mut state = self.state.borrow_mut();
        state.tare_offset = state.raw_force();
        state.tare_count += 1;
        Ok(())
    }
}

/// Simulated tactile sensor handle.
#[derive(Debug)]
pub struct SimTactile {
    state: Shared,
}

impl TactileSensor for SimTactile {
    fn read_markers(&mut self) -> Result<MarkerField, SensorError> {
        let mut state = self.state.borrow_mut();
        let index = state.tactile_reads;
        state.tactile_reads += 1;
        if state.tactile_failures.contains(&index) {
            return Err(SensorError::disconnected("sim-tactile"));
        }
        state.marker_field()
    }

    fn release(&mut self) -> Result<(), SensorError> {
        self.state.borrow_mut().tactile_released = true;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn no_force_above_surface() {
        let bench = SimulatedBench::new(BenchConfig::default().with_surface_z(100.0));
        let mut force = bench.force_sensor();
        assert_eq!(force.read().unwrap(), [0.0, 0.0, 0.0]);
        assert_eq!(bench.penetration(), 0.0);
    }

    #[test]
    fn spring_force_below_surface() {
        let bench = SimulatedBench::new(BenchConfig::default().with_surface_z(100.0).with_stiffness(2.0));
        let mut arm = bench.arm();
        let mut force = bench.force_sensor();

        let pose = arm.cartesian().unwrap().with_z(99.75);
        arm.move_cartesian(&pose).unwrap();
        assert_relative_eq!(force.read().unwrap()[2], -0.5, epsilon = 1e-9);
    }

    #[test]
    fn tare_removes_bias() {
        let bench = SimulatedBench::new(BenchConfig::default().with_force_bias([0.1, -0.2, 0.3]));
        let mut force = bench.force_sensor();
        assert_eq!(force.read().unwrap(), [0.1, -0.2, 0.3]);
        force.tare().unwrap();
        assert_eq!(force.read().unwrap(), [0.0, 0.0, 0.0]);
        assert_eq!(bench.tare_count(), 1);
    }

    #[test]
    fn markers_spread_with_penetration() {
        let bench = SimulatedBench::new(BenchConfig::default().with_surface_z(100.0));
        let mut arm = bench.arm();
        let mut tactile = bench.tactile();

        let rest = tactile.read_markers().unwrap();
        assert_eq!(rest.shape(), (DEFAULT_MARKER_ROWS, DEFAULT_MARKER_COLS));
        assert_eq!(rest.max_magnitude(), 0.0);

        let pose = arm.cartesian().unwrap().with_z(99.0);
        arm.move_cartesian(&pose).unwrap();
        let pressed = tactile.read_markers().unwrap();
        assert!(pressed.max_magnitude() > 0.0);
    }

    #[test]
    fn busy_polls_then_idle() {
        let bench = SimulatedBench::new(BenchConfig::default().with_busy_polls(2));
        let mut arm = bench.arm();
        let pose = arm.cartesian().unwrap();
        arm.move_cartesian(&pose).unwrap();

        assert!(arm.is_moving().unwrap());
        assert!(arm.is_moving().unwrap());
        assert!(!arm.is_moving().unwrap());
    }

    #[test]
    fn injected_failures() {
        let bench = SimulatedBench::new(BenchConfig::default());
        let mut force = bench.force_sensor();
        let mut tactile = bench.tactile();
        let mut arm = bench.arm();

        bench.fail_force_reads_after(1);
        assert!(force.read().is_ok());
        assert!(force.read().is_err());

        bench.fail_tactile_read(1);
        assert!(tactile.read_markers().is_ok());
        assert!(tactile.read_markers().is_err());
        assert!(tactile.read_markers().is_ok());

        bench.set_arm_fault(true);
        assert!(arm.cartesian().is_err());
        assert!(arm.motor_off().is_err());
        assert!(bench.motors_on());
    }

    #[test]
    fn command_log() {
        let bench = SimulatedBench::new(BenchConfig::default());
        let mut rig = bench.rig();
        rig.arm.set_velocity(20.0, 20.0).unwrap();
        rig.arm.move_joints([0.0; 6]).unwrap();
        rig.arm.motor_off().unwrap();
        rig.tactile.release().unwrap();

        assert_eq!(
            bench.commands(),
            vec![
                ArmCommand::SetVelocity(20.0, 20.0),
                ArmCommand::MoveJoints([0.0; 6]),
                ArmCommand::MotorOff,
            ]
        );
        assert_eq!(bench.motion_count(), 1);
        assert!(!bench.motors_on());
        assert!(bench.tactile_released());
    }
}
