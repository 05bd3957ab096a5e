//! Property-based tests for contact seeking and trajectory execution.
//!
//! Run with: cargo test -p calib-rig -- proptest

#![allow(clippy::unwrap_used)]

use calib_dataset::step_key;
use calib_rig::sim::{ArmCommand, BenchConfig, SimulatedBench};
use calib_rig::{ContactSeeker, ContactState, RigConfig, RigError, Trajectory, TrajectoryExecutor};
use proptest::prelude::*;
use sensor_types::{Displacement, Pose};

// =============================================================================
// Strategies
// =============================================================================

fn arb_step() -> impl Strategy<Value = Displacement> {
    (-0.2..0.2f64, -0.2..0.2f64, -0.2..0.0f64).prop_map(|(x, y, z)| Displacement::new(x, y, z))
}

fn commanded_heights(bench: &SimulatedBench) -> Vec<f64> {
    bench
        .commands()
        .iter()
        .filter_map(|c| match c {
            ArmCommand::MoveCartesian(p) => Some(p.z()),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Every executed step yields exactly one record, keyed and indexed by
    /// its position in the trajectory.
    #[test]
    fn records_follow_step_order(steps in prop::collection::vec(arb_step(), 1..8)) {
        let bench = SimulatedBench::new(BenchConfig::default().with_surface_z(100.0));
        let config = RigConfig::default().without_delays().with_data_frames(2);
        let initial = Pose::from_array([500.0, -200.0, 101.0, 0.0, 1.0, 0.0, 0.0]);
        let executor = TrajectoryExecutor::new(config.clone(), initial);
        let mut contact = ContactState::from_config(&config);
        let mut rig = bench.rig();

        let trajectory = Trajectory::new("cube", "random", steps.clone());
        let records = executor.execute(&mut rig, &mut contact, &trajectory).unwrap();

        prop_assert_eq!(records.len(), steps.len());
        for (index, (key, record)) in records.iter().enumerate() {
            prop_assert_eq!(key, &step_key(index));
            prop_assert_eq!(record.metadata.step_index, index);
            prop_assert_eq!(record.metadata.commanded_delta_mm, steps[index].as_array());
        }
        prop_assert_eq!(bench.tactile_read_count(), steps.len());
    }

    /// The seek never commands a height below its approach height minus the
    /// travel bound, whether or not the surface is within reach.
    #[test]
    fn seek_descent_is_bounded(
        depth in 0.0..8.0f64,
        step in 0.05..0.5f64,
        max_travel in 0.5..5.0f64,
    ) {
        let start = 100.0;
        let bench = SimulatedBench::new(BenchConfig::default().with_surface_z(start - depth));
        let config = RigConfig::default().without_delays().with_seek_travel(step, max_travel);
        let mut rig = bench.rig();

        let result = ContactSeeker::new(&mut rig.arm, &mut rig.force, &config).seek(start);
        let approach = start + config.seek_clearance_mm;

        let lowest = commanded_heights(&bench).into_iter().fold(f64::INFINITY, f64::min);
        prop_assert!(lowest >= approach - max_travel - 1e-6);

        match result {
            Ok(reading) => {
                prop_assert!(reading.travel_mm <= max_travel + 1e-6);
                prop_assert!(reading.force_z <= config.contact_threshold);
            }
            Err(RigError::ContactNotFound { travel_mm, .. }) => {
                prop_assert!(travel_mm <= max_travel + 1e-6);
            }
            Err(RigError::SafetyFault { force, .. }) => {
                prop_assert!(force <= config.max_force);
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    /// Heights only go down while seeking.
    #[test]
    fn seek_descent_is_monotonic(depth in 0.5..3.0f64) {
        let start = 100.0;
        let bench = SimulatedBench::new(BenchConfig::default().with_surface_z(start - depth));
        let config = RigConfig::default().without_delays().with_seek_travel(0.05, 5.0);
        let mut rig = bench.rig();

        ContactSeeker::new(&mut rig.arm, &mut rig.force, &config).seek(start).unwrap();

        let heights = commanded_heights(&bench);
        // First move is the approach, every later one a descent step.
        prop_assert!(heights.windows(2).skip(1).all(|w| w[1] < w[0]));
    }
}
