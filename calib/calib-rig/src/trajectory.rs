//! Scripted contact trajectories and the library file that holds them.
//!
//! The library is a JSON object mapping object name → trajectory name →
//! steps. Three step encodings are accepted:
//!
//! ```json
//! {
//!   "cube": {
//!     "press": [{ "z": -0.2 }, { "z": -0.2 }],
//!     "slide": [[0.5, 0.0, 0.0], [0.5, 0.0, 0.0]],
//!     "zigzag": { "x": [0.2, -0.2], "y": [0, 0], "z": [-0.1, -0.1] }
//!   }
//! }
//! ```

use std::path::Path;

use sensor_types::Displacement;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LibraryError;

/// An ordered sequence of relative moves to run against one object.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Object the trajectory is scripted for.
    pub object: String,
    /// Trajectory name, unique per object.
    pub name: String,
    /// Relative moves, in execution order.
    pub steps: Vec<Displacement>,
}

impl Trajectory {
    /// Creates a trajectory.
    #[must_use]
    pub fn new(object: impl Into<String>, name: impl Into<String>, steps: Vec<Displacement>) -> Self {
        Self {
            object: object.into(),
            name: name.into(),
            steps,
        }
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if the trajectory has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Normalizes one trajectory entry to a list of displacements.
///
/// Accepts a list of `{x, y, z}` objects (missing axes are 0), a list of
/// 3-element numeric arrays, or an object of parallel `x`/`y`/`z` arrays
/// (zipped to the shortest). Entries that fit none of these are dropped.
///
/// # Example
///
/// ```
/// use calib_rig::parse_steps;
/// use serde_json::json;
///
/// let steps = parse_steps(&json!([{ "z": -0.5 }, [1.0, 0.0, 0.0], "junk"]));
/// assert_eq!(steps.len(), 2);
/// assert_eq!(steps[0].dz, -0.5);
/// assert_eq!(steps[1].dx, 1.0);
/// ```
#[must_use]
pub fn parse_steps(payload: &Value) -> Vec<Displacement> {
    match payload {
        Value::Array(entries) => entries.iter().filter_map(parse_entry).collect(),
        Value::Object(axes) => {
            let (Some(Value::Array(xs)), Some(Value::Array(ys)), Some(Value::Array(zs))) =
                (axes.get("x"), axes.get("y"), axes.get("z"))
            else {
                return Vec::new();
            };
            xs.iter()
                .zip(ys)
                .zip(zs)
                .filter_map(|((x, y), z)| Some(Displacement::new(x.as_f64()?, y.as_f64()?, z.as_f64()?)))
                .collect()
        }
        _ => Vec::new(),
    }
}

fn parse_entry(entry: &Value) -> Option<Displacement> {
    match entry {
        Value::Object(fields) => {
            let axis = |key: &str| match fields.get(key) {
                None => Some(0.0),
                Some(value) => value.as_f64(),
            };
            Some(Displacement::new(axis("x")?, axis("y")?, axis("z")?))
        }
        Value::Array(values) if values.len() == 3 => Some(Displacement::new(
            values[0].as_f64()?,
            values[1].as_f64()?,
            values[2].as_f64()?,
        )),
        _ => None,
    }
}

/// All trajectories available to the rig, grouped by object.
///
/// Objects and trajectories keep the order of the library file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrajectoryLibrary {
    objects: Vec<(String, Vec<Trajectory>)>,
}

impl TrajectoryLibrary {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a trajectory, creating its object entry if needed.
    #[must_use]
    pub fn with_trajectory(mut self, trajectory: Trajectory) -> Self {
        self.insert(trajectory);
        self
    }

    /// Adds a trajectory, replacing one with the same object and name.
    pub fn insert(&mut self, trajectory: Trajectory) {
        let position = self.objects.iter().position(|(name, _)| *name == trajectory.object);
        let list = if let Some(index) = position {
            &mut self.objects[index].1
        } else {
            self.objects.push((trajectory.object.clone(), Vec::new()));
            let last = self.objects.len() - 1;
            &mut self.objects[last].1
        };

        if let Some(existing) = list.iter_mut().find(|t| t.name == trajectory.name) {
            *existing = trajectory;
        } else {
            list.push(trajectory);
        }
    }

    /// Builds a library from a parsed JSON document.
    ///
    /// Empty trajectories are dropped, and so are objects left without any.
    #[must_use]
    pub fn from_value(root: &Value) -> Self {
        let mut library = Self::new();

        let Some(objects) = root.as_object() else {
            warn!("trajectory library root is not an object");
            return library;
        };

        for (object, trajectories) in objects {
            let Some(trajectories) = trajectories.as_object() else {
                warn!(object = %object, "skipping object whose entry is not a map");
                continue;
            };

            let parsed: Vec<Trajectory> = trajectories
                .iter()
                .filter_map(|(name, payload)| {
                    let steps = parse_steps(payload);
                    if steps.is_empty() {
                        debug!(object = %object, trajectory = %name, "dropping empty trajectory");
                        None
                    } else {
                        Some(Trajectory::new(object.clone(), name.clone(), steps))
                    }
                })
                .collect();

            if parsed.is_empty() {
                warn!(object = %object, "object has no usable trajectories");
            } else {
                library.objects.push((object.clone(), parsed));
            }
        }

        if library.is_empty() {
            warn!("trajectory library holds no usable trajectories");
        }
        library
    }

    /// Parses a library from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::Parse`] if the text is not valid JSON.
    pub fn from_json_str(json: &str) -> Result<Self, LibraryError> {
        let root: Value = serde_json::from_str(json).map_err(|e| LibraryError::Parse(e.to_string()))?;
        Ok(Self::from_value(&root))
    }

    /// Loads a library file.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::Io`] if the file cannot be read and
    /// [`LibraryError::Parse`] if it is not valid JSON.
    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        let text = std::fs::read_to_string(path).map_err(|e| LibraryError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }

    /// Returns `true` if no object has a trajectory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Object names in file order.
    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.iter().map(|(name, _)| name.as_str())
    }

    /// Returns `true` if `object` has trajectories.
    #[must_use]
    pub fn contains(&self, object: &str) -> bool {
        self.trajectories(object).is_some()
    }

    /// Trajectories of one object, in file order.
    #[must_use]
    pub fn trajectories(&self, object: &str) -> Option<&[Trajectory]> {
        self.objects
            .iter()
            .find(|(name, _)| name == object)
            .map(|(_, list)| list.as_slice())
    }
}
