//! The `collect` command.

use anyhow::{Context, Result, bail};
use calib_dataset::{CalibrationStore, TreeSummary};
use calib_rig::sim::{BenchConfig, SimulatedBench};
use calib_rig::{CalibrationSession, DEFAULT_INITIAL_POSE, RigConfig, SessionContext, TrajectoryLibrary};
use sensor_types::Pose;
use tracing::{error, info, warn};

use crate::CollectArgs;

pub fn run(args: &CollectArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => RigConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => RigConfig::default(),
    };
    let library = TrajectoryLibrary::load(&args.library)
        .with_context(|| format!("loading trajectory library {}", args.library.display()))?;

    if !library.contains(&args.object) {
        let known: Vec<&str> = library.object_names().collect();
        bail!("object '{}' is not in the library (known: {})", args.object, known.join(", "));
    }

    let pose = initial_pose(args.pose.as_deref())?;
    let bench = SimulatedBench::new(
        BenchConfig::default()
            .with_surface_z(args.surface_z)
            .with_stiffness(args.stiffness),
    );

    let ctx = SessionContext::from_clock();
    info!(session = ctx.id(), object = %args.object, "starting collection");

    let session = CalibrationSession::new(bench.rig(), config, library, pose)?.with_context(ctx);

    if args.dry_run {
        for planned in session.dry_run(&args.object) {
            println!("{}/{}: {} steps", args.object, planned.name, planned.steps);
        }
        session.close();
        return Ok(());
    }

    let mut session = session.with_store(CalibrationStore::new(&args.storage));
    let outcome = session.run(&args.object);
    let report = session.close();

    for failure in &report.failures {
        error!(error = %failure, "teardown step failed");
    }
    if let Some(merge) = &report.merge {
        info!(
            storage = %args.storage.display(),
            inserted = merge.inserted,
            overwritten = merge.overwritten.len(),
            "store updated"
        );
    }
    if !report.parked {
        warn!("arm was not parked");
    }

    let tree = outcome.with_context(|| format!("collecting '{}'", args.object))?;
    let summary = TreeSummary::from_tree(&tree);
    for object in &summary.objects {
        for trajectory in &object.trajectories {
            println!("{}/{}: {} steps", object.name, trajectory.name, trajectory.steps);
        }
    }
    println!("{} records collected", summary.record_count);

    if !report.is_clean() {
        bail!("teardown finished with {} failure(s)", report.failures.len());
    }
    Ok(())
}

fn initial_pose(values: Option<&[f64]>) -> Result<Pose> {
    let values = values.unwrap_or(&DEFAULT_INITIAL_POSE);
    let Ok(array) = <[f64; 7]>::try_from(values) else {
        bail!("pose needs 7 values, got {}", values.len());
    };
    Ok(Pose::from_array(array))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_defaults_to_initial_pose() {
        let pose = initial_pose(None).unwrap();
        assert_eq!(pose.to_array(), DEFAULT_INITIAL_POSE);
    }

    #[test]
    fn pose_length_is_checked() {
        assert!(initial_pose(Some(&[1.0, 2.0][..])).is_err());
        assert!(initial_pose(Some(&[1.0, 2.0, 3.0, 1.0, 0.0, 0.0, 0.0][..])).is_ok());
    }
}
