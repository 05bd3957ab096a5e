//! The `objects` and `inspect` commands.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result, bail};
use calib_dataset::{CalibrationStore, CalibrationTree, TreeSummary};
use calib_rig::TrajectoryLibrary;

pub fn objects(library: &Path) -> Result<()> {
    let library = TrajectoryLibrary::load(library)
        .with_context(|| format!("loading trajectory library {}", library.display()))?;
    print!("{}", render_library(&library));
    Ok(())
}

pub fn summary(storage: &Path) -> Result<()> {
    let tree = load(storage)?;
    print!("{}", render_summary(&TreeSummary::from_tree(&tree)));
    Ok(())
}

pub fn series(storage: &Path, object: &str, trajectory: &str) -> Result<()> {
    let tree = load(storage)?;
    if tree.trajectory(object, trajectory).is_none() {
        bail!("no records for {object}/{trajectory}");
    }
    print!("{}", render_series(&tree, object, trajectory));
    Ok(())
}

fn load(storage: &Path) -> Result<CalibrationTree> {
    CalibrationStore::new(storage)
        .load()
        .with_context(|| format!("reading store {}", storage.display()))
}

fn render_library(library: &TrajectoryLibrary) -> String {
    let mut out = String::new();
    for object in library.object_names() {
        let _ = writeln!(out, "{object}");
        for trajectory in library.trajectories(object).unwrap_or_default() {
            let _ = writeln!(out, "  {:<24} {:>5} steps", trajectory.name, trajectory.len());
        }
    }
    out
}

fn render_summary(summary: &TreeSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} objects, {} trajectories, {} records",
        summary.object_count, summary.trajectory_count, summary.record_count
    );
    for object in &summary.objects {
        let _ = writeln!(out, "{} ({} records)", object.name, object.record_count());
        for trajectory in &object.trajectories {
            let _ = writeln!(out, "  {:<24} {:>5} steps", trajectory.name, trajectory.steps);
        }
    }
    out
}

fn render_series(tree: &CalibrationTree, object: &str, trajectory: &str) -> String {
    let mut out = String::from("step\tforce_z\n");
    for (step, force_z) in tree.force_z_series(object, trajectory) {
        let _ = writeln!(out, "{step}\t{force_z:.4}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use calib_dataset::{StepMetadata, StepRecord, step_key};
    use sensor_types::MarkerField;

    fn tree() -> CalibrationTree {
        let mut tree = CalibrationTree::new();
        let records = (0..3)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let fz = -0.1 * (i + 1) as f64;
                let record = StepRecord::new(
                    MarkerField::zeros(2, 2),
                    [0.0, 0.0, fz],
                    StepMetadata::new("push", i, [0.0, 0.0, -0.1]),
                );
                (step_key(i), record)
            })
            .collect();
        tree.insert_trajectory("cube", "push", records);
        tree
    }

    #[test]
    fn summary_lists_objects_and_counts() {
        let text = render_summary(&TreeSummary::from_tree(&tree()));
        assert!(text.starts_with("1 objects, 1 trajectories, 3 records"));
        assert!(text.contains("cube (3 records)"));
        assert!(text.contains("push"));
    }

    #[test]
    fn series_is_in_step_order() {
        let text = render_series(&tree(), "cube", "push");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["step\tforce_z", "0\t-0.1000", "1\t-0.2000", "2\t-0.3000"]);
    }

    #[test]
    fn library_listing_keeps_file_order() {
        let library =
            TrajectoryLibrary::from_json_str(r#"{ "zeta": { "a": [[0, 0, -0.1]] }, "alpha": { "b": [[0, 0, -0.1]] } }"#).unwrap();
        let text = render_library(&library);
        let zeta = text.find("zeta").unwrap();
        let alpha = text.find("alpha").unwrap();
        assert!(zeta < alpha);
    }

    #[test]
    fn missing_store_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let tree = load(&dir.path().join("absent.calt")).unwrap();
        assert!(tree.is_empty());
    }
}
