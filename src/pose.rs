//! Pose data model and keypoint file ingestion.
//!
//! A [`Trial`] is an ordered sequence of [`Frame`]s, each holding named 2D
//! keypoints, optional named 3D keypoints, and per-joint confidence scores.
//!
//! # Input Format
//!
//! ```json
//! [
//!   { "0.0166": { "keypoints2D": [ { "name": "left_ankle", "x": 0.1, "y": 0.9, "score": 0.98 } ],
//!                 "keypoints3D": [ { "name": "left_ankle", "x": 0.1, "y": 0.9, "z": 0.2, "score": 0.9 } ] } },
//!   ...
//! ]
//! ```
//!
//! Malformed records are skipped, never fatal.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GaitError, Result};

/// Which keypoint map a stage operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoordinateSpace {
    /// Image-plane keypoints (`keypoints2D`).
    #[default]
    #[serde(rename = "2d")]
    Image2D,
    /// World keypoints (`keypoints3D`).
    #[serde(rename = "3d")]
    World3D,
}

impl CoordinateSpace {
    /// Number of coordinates per joint.
    #[must_use]
    pub const fn dims(self) -> usize {
        match self {
            Self::Image2D => 2,
            Self::World3D => 3,
        }
    }
}

/// Body side label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Left,
    Right,
}

impl Side {
    /// Joint-name prefix, e.g. `left` in `left_ankle`.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl std::str::FromStr for Side {
    type Err = GaitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Self::Left),
            "right" | "r" => Ok(Self::Right),
            other => Err(GaitError::invalid_config(format!("unknown side '{other}'"))),
        }
    }
}

/// Coordinate axis of a keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Column index of this axis in a position array.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// A single time sample of body keypoints.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    /// Timestamp in seconds.
    pub timestamp: f64,
    /// Joint name to image-plane position.
    pub keypoints_2d: BTreeMap<String, [f64; 2]>,
    /// Joint name to world position, if the recording has one.
    pub keypoints_3d: Option<BTreeMap<String, [f64; 3]>>,
    /// Joint name to detection confidence.
    pub scores: BTreeMap<String, f64>,
}

impl Frame {
    /// Create an empty frame at `timestamp`.
    #[must_use]
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    /// Add a 2D keypoint.
    #[must_use]
    pub fn with_2d(mut self, joint: impl Into<String>, position: [f64; 2]) -> Self {
        self.keypoints_2d.insert(joint.into(), position);
        self
    }

    /// Add a 3D keypoint.
    #[must_use]
    pub fn with_3d(mut self, joint: impl Into<String>, position: [f64; 3]) -> Self {
        self.keypoints_3d
            .get_or_insert_with(BTreeMap::new)
            .insert(joint.into(), position);
        self
    }

    /// Position of `joint` in `space`, as a slice of 2 or 3 coordinates.
    #[must_use]
    pub fn position(&self, joint: &str, space: CoordinateSpace) -> Option<&[f64]> {
        match space {
            CoordinateSpace::Image2D => self.keypoints_2d.get(joint).map(|p| p.as_slice()),
            CoordinateSpace::World3D => self
                .keypoints_3d
                .as_ref()
                .and_then(|m| m.get(joint))
                .map(|p| p.as_slice()),
        }
    }

    /// Joint names present in `space`.
    pub fn joint_names(&self, space: CoordinateSpace) -> Box<dyn Iterator<Item = &str> + '_> {
        match space {
            CoordinateSpace::Image2D => Box::new(self.keypoints_2d.keys().map(String::as_str)),
            CoordinateSpace::World3D => Box::new(
                self.keypoints_3d
                    .iter()
                    .flat_map(|m| m.keys().map(String::as_str)),
            ),
        }
    }
}

/// An ordered recording of frames.
///
/// Frames are sorted by timestamp and duplicate timestamps are dropped on
/// construction. The number of frames never changes afterwards; preprocessing
/// stages only rewrite joint positions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trial {
    frames: Vec<Frame>,
}

impl Trial {
    /// Build a trial, sorting frames and dropping non-finite or repeated timestamps.
    #[must_use]
    pub fn new(mut frames: Vec<Frame>) -> Self {
        frames.retain(|f| f.timestamp.is_finite());
        frames.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        let before = frames.len();
        frames.dedup_by(|later, earlier| later.timestamp == earlier.timestamp);
        if frames.len() < before {
            warn!(
                "dropped {} frames with duplicate timestamps",
                before - frames.len()
            );
        }
        Self { frames }
    }

    /// Frames in timestamp order.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Mutable access to frame contents; the frame count stays fixed.
    pub fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the trial has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Timestamps in order.
    #[must_use]
    pub fn timestamps(&self) -> Vec<f64> {
        self.frames.iter().map(|f| f.timestamp).collect()
    }

    /// Sorted union of joint names seen in `space`.
    #[must_use]
    pub fn joint_names(&self, space: CoordinateSpace) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .frames
            .iter()
            .flat_map(|f| f.joint_names(space))
            .collect();
        names.into_iter().map(str::to_string).collect()
    }

    /// Whether any frame carries `joint` in `space`.
    #[must_use]
    pub fn has_joint(&self, joint: &str, space: CoordinateSpace) -> bool {
        self.frames.iter().any(|f| f.position(joint, space).is_some())
    }
}

/// One keypoint record as it appears in the input file.
#[derive(Debug, Deserialize)]
struct RawKeypoint {
    name: Option<String>,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    score: Option<f64>,
}

/// Load a trial from a JSON keypoint file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not JSON, or its top level
/// is not an array. Individual malformed records are skipped.
pub fn load_trial(path: impl AsRef<Path>) -> Result<Trial> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let trial = parse_trial(&text)?;
    info!("loaded {} frames from {}", trial.len(), path.display());
    Ok(trial)
}

/// Parse a trial from JSON text.
///
/// # Errors
///
/// Returns an error if the text is not JSON or its top level is not an array.
pub fn parse_trial(text: &str) -> Result<Trial> {
    let root: Value = serde_json::from_str(text)?;
    let Value::Array(items) = root else {
        return Err(GaitError::parse("expected a top-level array of frames"));
    };

    let total = items.len();
    let frames: Vec<Frame> = items.iter().filter_map(parse_frame).collect();
    if frames.len() < total {
        debug!("skipped {} malformed frame records", total - frames.len());
    }
    Ok(Trial::new(frames))
}

fn parse_frame(item: &Value) -> Option<Frame> {
    let object = item.as_object()?;
    if object.len() != 1 {
        return None;
    }
    let (key, payload) = object.iter().next()?;
    let timestamp: f64 = key.trim().parse().ok()?;
    let payload = payload.as_object()?;

    let raw_2d = raw_keypoints(payload.get("keypoints2D"));
    let raw_3d = raw_keypoints(payload.get("keypoints3D"));

    let mut frame = Frame::new(timestamp);
    for kp in &raw_2d {
        if let (Some(name), Some(x), Some(y)) = (&kp.name, kp.x, kp.y) {
            frame.keypoints_2d.insert(name.clone(), [x, y]);
        }
    }
    let mut map_3d = BTreeMap::new();
    for kp in &raw_3d {
        if let (Some(name), Some(x), Some(y), Some(z)) = (&kp.name, kp.x, kp.y, kp.z) {
            map_3d.insert(name.clone(), [x, y, z]);
        }
    }
    if !map_3d.is_empty() {
        frame.keypoints_3d = Some(map_3d);
    }
    for kp in raw_2d.iter().chain(raw_3d.iter()) {
        if let (Some(name), Some(score)) = (&kp.name, kp.score) {
            frame.scores.insert(name.clone(), score);
        }
    }
    Some(frame)
}

fn raw_keypoints(value: Option<&Value>) -> Vec<RawKeypoint> {
    let Some(Value::Array(records)) = value else {
        return Vec::new();
    };
    records
        .iter()
        .filter_map(|r| RawKeypoint::deserialize(r).ok())
        .filter(|kp| kp.name.as_deref().is_some_and(|n| !n.is_empty()))
        .collect()
}
