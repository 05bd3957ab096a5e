//! Calibration tree summaries.

use serde::{Deserialize, Serialize};

use crate::tree::CalibrationTree;

/// Step count of one trajectory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectorySummary {
    /// Trajectory name.
    pub name: String,
    /// Number of step records.
    pub steps: usize,
}

/// Trajectories recorded for one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    /// Object name.
    pub name: String,
    /// Recorded trajectories, in name order.
    pub trajectories: Vec<TrajectorySummary>,
}

impl ObjectSummary {
    /// Total records for this object.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.trajectories.iter().map(|t| t.steps).sum()
    }
}

/// Aggregate counts for a calibration tree.
///
/// # Example
///
/// ```
/// use calib_dataset::{CalibrationTree, TreeSummary};
///
/// let mut tree = CalibrationTree::new();
/// tree.ensure_object("cube");
///
/// let summary = TreeSummary::from_tree(&tree);
/// assert_eq!(summary.object_count, 1);
/// assert_eq!(summary.record_count, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSummary {
    /// Number of objects.
    pub object_count: usize,
    /// Number of trajectories across all objects.
    pub trajectory_count: usize,
    /// Number of step records.
    pub record_count: usize,
    /// Per-object breakdown, in name order.
    pub objects: Vec<ObjectSummary>,
}

impl TreeSummary {
    /// Summarizes a tree.
    #[must_use]
    pub fn from_tree(tree: &CalibrationTree) -> Self {
        let objects: Vec<ObjectSummary> = tree
            .objects()
            .map(|(name, trajectories)| ObjectSummary {
                name: name.to_string(),
                trajectories: trajectories
                    .iter()
                    .map(|(traj, steps)| TrajectorySummary {
                        name: traj.clone(),
                        steps: steps.len(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            object_count: objects.len(),
            trajectory_count: objects.iter().map(|o| o.trajectories.len()).sum(),
            record_count: objects.iter().map(ObjectSummary::record_count).sum(),
            objects,
        }
    }

    /// Looks up one object's summary.
    #[must_use]
    pub fn object(&self, name: &str) -> Option<&ObjectSummary> {
        self.objects.iter().find(|o| o.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{StepMetadata, StepRecord, step_key};
    use crate::tree::TrajectoryRecords;
    use sensor_types::MarkerField;

    fn steps(name: &str, n: usize) -> TrajectoryRecords {
        (0..n)
            .map(|i| {
                (
                    step_key(i),
                    StepRecord::new(
                        MarkerField::zeros(1, 1),
                        [0.0; 3],
                        StepMetadata::new(name, i, [0.0; 3]),
                    ),
                )
            })
            .collect()
    }

    #[test]
    fn summary_empty() {
        let summary = TreeSummary::from_tree(&CalibrationTree::new());
        assert_eq!(summary, TreeSummary::default());
    }

    #[test]
    fn summary_counts() {
        let mut tree = CalibrationTree::new();
        tree.insert_trajectory("cube", "push", steps("push", 3));
        tree.insert_trajectory("cube", "slide", steps("slide", 2));
        tree.insert_trajectory("sphere", "push", steps("push", 4));
        tree.ensure_object("cylinder");

        let summary = TreeSummary::from_tree(&tree);
        assert_eq!(summary.object_count, 3);
        assert_eq!(summary.trajectory_count, 3);
        assert_eq!(summary.record_count, 9);

        let cube = summary.object("cube");
        assert_eq!(cube.map(ObjectSummary::record_count), Some(5));
        assert_eq!(
            summary.object("cylinder").map(|o| o.trajectories.len()),
            Some(0)
        );
        assert!(summary.object("torus").is_none());
    }
}
