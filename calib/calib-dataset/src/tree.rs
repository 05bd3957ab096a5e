//! The three-level calibration tree and its deep-union merge.
//!
//! A tree maps object name → trajectory name → step key → [`StepRecord`].
//! Ordered maps are used so zero-padded step keys iterate in execution order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::record::{StepRecord, parse_step_key};

/// Step key → record, for one trajectory.
pub type TrajectoryRecords = BTreeMap<String, StepRecord>;

/// Trajectory name → records, for one object.
pub type ObjectRecords = BTreeMap<String, TrajectoryRecords>;

/// Full path of one record inside a tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordPath {
    /// Object name.
    pub object: String,
    /// Trajectory name.
    pub trajectory: String,
    /// Step key.
    pub step: String,
}

impl RecordPath {
    /// Creates a record path.
    #[must_use]
    pub fn new(object: impl Into<String>, trajectory: impl Into<String>, step: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            trajectory: trajectory.into(),
            step: step.into(),
        }
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.object, self.trajectory, self.step)
    }
}

/// Outcome of merging one tree into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Records whose key did not exist before.
    pub inserted: usize,
    /// Records that replaced an existing record, in merge order.
    pub overwritten: Vec<RecordPath>,
}

impl MergeReport {
    /// Total number of records written by the merge.
    #[must_use]
    pub fn written(&self) -> usize {
        self.inserted + self.overwritten.len()
    }
}

/// Nested calibration dataset: object → trajectory → step → record.
///
/// Used both as the output of one collection session and as the on-disk
/// aggregate of every session ever run.
///
/// # Example
///
/// ```
/// use calib_dataset::{CalibrationTree, StepMetadata, StepRecord, TrajectoryRecords, step_key};
/// use sensor_types::MarkerField;
///
/// let mut steps = TrajectoryRecords::new();
/// steps.insert(
///     step_key(0),
///     StepRecord::new(MarkerField::zeros(20, 11), [0.0, 0.0, -0.3], StepMetadata::new("push", 0, [0.0, 0.0, -1.0])),
/// );
///
/// let mut tree = CalibrationTree::new();
/// tree.insert_trajectory("cube", "push", steps);
///
/// assert_eq!(tree.record_count(), 1);
/// assert!(tree.record("cube", "push", "step_000").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationTree {
    objects: BTreeMap<String, ObjectRecords>,
}

impl CalibrationTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the tree holds no records (empty objects do not count).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Number of objects, including objects with no trajectories.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of trajectories across all objects.
    #[must_use]
    pub fn trajectory_count(&self) -> usize {
        self.objects.values().map(BTreeMap::len).sum()
    }

    /// Number of step records across the whole tree.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.objects
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    /// Iterates over objects in name order.
    pub fn objects(&self) -> impl Iterator<Item = (&str, &ObjectRecords)> {
        self.objects.iter().map(|(name, data)| (name.as_str(), data))
    }

    /// Returns one object's trajectories.
    #[must_use]
    pub fn object(&self, object: &str) -> Option<&ObjectRecords> {
        self.objects.get(object)
    }

    /// Returns one trajectory's records.
    #[must_use]
    pub fn trajectory(&self, object: &str, trajectory: &str) -> Option<&TrajectoryRecords> {
        self.objects.get(object)?.get(trajectory)
    }

    /// Returns one record.
    #[must_use]
    pub fn record(&self, object: &str, trajectory: &str, step: &str) -> Option<&StepRecord> {
        self.trajectory(object, trajectory)?.get(step)
    }

    /// Makes sure `object` has an entry, possibly empty.
    pub fn ensure_object(&mut self, object: impl Into<String>) -> &mut ObjectRecords {
        self.objects.entry(object.into()).or_default()
    }

    /// Stores a whole trajectory, replacing any previous records under that name.
    pub fn insert_trajectory(
        &mut self,
        object: impl Into<String>,
        trajectory: impl Into<String>,
        records: TrajectoryRecords,
    ) {
        self.ensure_object(object).insert(trajectory.into(), records);
    }

    /// Extracts the subtree holding only `object` (empty if unknown).
    #[must_use]
    pub fn subtree(&self, object: &str) -> Self {
        let mut sub = Self::new();
        if let Some(data) = self.objects.get(object) {
            sub.objects.insert(object.to_string(), data.clone());
        }
        sub
    }

    /// Deep-unions `other` into `self`.
    ///
    /// Objects and trajectories are created as needed. A step key already
    /// present is replaced by the incoming record as a whole, and a warning
    /// names the exact `object/trajectory/step` path. Sibling keys are never
    /// touched.
    pub fn merge(&mut self, other: Self) -> MergeReport {
        let mut report = MergeReport::default();

        for (object, trajectories) in other.objects {
            let stored_object = self.objects.entry(object.clone()).or_default();
            for (trajectory, steps) in trajectories {
                let stored_steps = stored_object.entry(trajectory.clone()).or_default();
                for (step, record) in steps {
                    if stored_steps.insert(step.clone(), record).is_some() {
                        let path = RecordPath::new(object.clone(), trajectory.clone(), step);
                        warn!(path = %path, "overwriting existing calibration record");
                        report.overwritten.push(path);
                    } else {
                        report.inserted += 1;
                    }
                }
            }
        }

        report
    }

    /// Returns `(step_index, force_z)` for one trajectory, in step order.
    ///
    /// Keys that are not of the `step_NNN` form are skipped.
    #[must_use]
    pub fn force_z_series(&self, object: &str, trajectory: &str) -> Vec<(usize, f64)> {
        let Some(steps) = self.trajectory(object, trajectory) else {
            return Vec::new();
        };
        let mut series: Vec<(usize, f64)> = steps
            .iter()
            .filter_map(|(key, record)| Some((parse_step_key(key)?, record.force_z())))
            .collect();
        series.sort_by_key(|(index, _)| *index);
        series
    }
}

impl FromIterator<(String, ObjectRecords)> for CalibrationTree {
    fn from_iter<I: IntoIterator<Item = (String, ObjectRecords)>>(iter: I) -> Self {
        Self {
            objects: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::record::{StepMetadata, step_key};
    use sensor_types::MarkerField;

    fn record(trajectory: &str, index: usize, fz: f64) -> StepRecord {
        StepRecord::new(
            MarkerField::zeros(2, 2),
            [0.0, 0.0, fz],
            StepMetadata::new(trajectory, index, [0.0, 0.0, -1.0]),
        )
    }

    fn trajectory(name: &str, forces: &[f64]) -> TrajectoryRecords {
        forces
            .iter()
            .enumerate()
            .map(|(i, fz)| (step_key(i), record(name, i, *fz)))
            .collect()
    }

    #[test]
    fn empty_tree() {
        let tree = CalibrationTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.object_count(), 0);
        assert_eq!(tree.record_count(), 0);
    }

    #[test]
    fn empty_object_holds_no_records() {
        let mut tree = CalibrationTree::new();
        tree.ensure_object("cube");
        assert!(tree.is_empty());
        assert_eq!(tree.object_count(), 1);
    }

    #[test]
    fn counts() {
        let mut tree = CalibrationTree::new();
        tree.insert_trajectory("cube", "push", trajectory("push", &[-0.1, -0.2]));
        tree.insert_trajectory("cube", "slide", trajectory("slide", &[-0.3]));
        tree.insert_trajectory("sphere", "push", trajectory("push", &[-0.4]));

        assert_eq!(tree.object_count(), 2);
        assert_eq!(tree.trajectory_count(), 3);
        assert_eq!(tree.record_count(), 4);
    }

    #[test]
    fn merge_into_empty_inserts_everything() {
        let mut incoming = CalibrationTree::new();
        incoming.insert_trajectory("cube", "push", trajectory("push", &[-0.1, -0.2]));

        let mut stored = CalibrationTree::new();
        let report = stored.merge(incoming.clone());

        assert_eq!(report.inserted, 2);
        assert!(report.overwritten.is_empty());
        assert_eq!(stored, incoming);
    }

    #[test]
    fn merge_overwrites_whole_record_and_reports_path() {
        let mut stored = CalibrationTree::new();
        stored.insert_trajectory("cube", "push", trajectory("push", &[-0.1, -0.2, -0.3]));

        let mut incoming = CalibrationTree::new();
        let mut replacement = TrajectoryRecords::new();
        replacement.insert(step_key(1), record("push", 1, -9.0).with_depth_field(vec![1.0]));
        incoming.insert_trajectory("cube", "push", replacement);

        let report = stored.merge(incoming);

        assert_eq!(report.inserted, 0);
        assert_eq!(report.overwritten, vec![RecordPath::new("cube", "push", "step_001")]);

        let replaced = stored.record("cube", "push", "step_001").unwrap();
        assert_eq!(replaced.force_z(), -9.0);
        assert_eq!(replaced.depth_field, Some(vec![1.0]));

        // Siblings untouched.
        assert_eq!(stored.record("cube", "push", "step_000").unwrap().force_z(), -0.1);
        assert_eq!(stored.record("cube", "push", "step_002").unwrap().force_z(), -0.3);
        assert_eq!(stored.record_count(), 3);
    }

    #[test]
    fn merge_keeps_other_trajectories_and_objects() {
        let mut stored = CalibrationTree::new();
        stored.insert_trajectory("cube", "push", trajectory("push", &[-0.1]));
        stored.insert_trajectory("sphere", "push", trajectory("push", &[-0.5]));

        let mut incoming = CalibrationTree::new();
        incoming.insert_trajectory("cube", "slide", trajectory("slide", &[-0.2]));

        let report = stored.merge(incoming);
        assert_eq!(report.written(), 1);
        assert_eq!(stored.trajectory_count(), 3);
        assert!(stored.record("sphere", "push", "step_000").is_some());
    }

    #[test]
    fn record_path_display() {
        let path = RecordPath::new("cube", "push", "step_004");
        assert_eq!(path.to_string(), "cube/push/step_004");
    }

    #[test]
    fn subtree_extracts_one_object() {
        let mut tree = CalibrationTree::new();
        tree.insert_trajectory("cube", "push", trajectory("push", &[-0.1]));
        tree.insert_trajectory("sphere", "push", trajectory("push", &[-0.5]));

        let sub = tree.subtree("cube");
        assert_eq!(sub.object_count(), 1);
        assert!(sub.object("sphere").is_none());
        assert!(tree.subtree("missing").is_empty());
    }

    #[test]
    fn force_z_series_in_step_order() {
        let mut tree = CalibrationTree::new();
        tree.insert_trajectory(
            "cube",
            "push",
            trajectory("push", &[-0.1, -0.2, -0.3, -0.4, -0.5, -0.6, -0.7, -0.8, -0.9, -1.0, -1.1]),
        );

        let series = tree.force_z_series("cube", "push");
        assert_eq!(series.len(), 11);
        assert_eq!(series[0], (0, -0.1));
        assert_eq!(series[10], (10, -1.1));
        assert!(tree.force_z_series("cube", "missing").is_empty());
    }

    #[test]
    fn serde_is_plain_nested_map() {
        let mut tree = CalibrationTree::new();
        tree.insert_trajectory("cube", "push", trajectory("push", &[-0.1]));

        let json = serde_json::to_value(&tree).unwrap();
        assert!(json["cube"]["push"]["step_000"]["force_xyz"].is_array());
    }
}
