//! Configuration for the gait analysis pipeline.
//!
//! [`GaitConfig`] centralizes every tunable parameter that stage constructors
//! need: joint selection, axes, segmentation thresholds, and SPD manifold
//! numerics. It is passed explicitly into each stage.
//!
//! # Example
//!
//! ```
//! use gait_geometry::{GaitConfig, Side};
//!
//! let config = GaitConfig::walking()
//!     .with_side(Side::Right)
//!     .with_velocity(true);
//! assert!(config.validate().is_ok());
//! assert_eq!(config.detection_joint(), "right_ankle");
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GaitError, Result};
use crate::pose::{Axis, CoordinateSpace, Side};

/// Configuration for gait signature extraction.
///
/// # Segmentation Parameters
///
/// - `min_step_seconds`: Minimum expected step duration, converted to a peak
///   distance in frames using the trial's sampling rate.
/// - `min_span_frames`: Spans of at most this many frames are detector noise.
/// - `phase_points`: Number of samples every step is resampled to.
///
/// # Manifold Parameters
///
/// - `spd_window`: Phase window used for the per-step SPD sequence.
/// - `spd_epsilon`: Diagonal regularization added to every covariance.
/// - `frechet_max_iterations` / `frechet_tolerance`: Karcher mean iteration
///   cap and stopping threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitConfig {
    /// Joints whose trajectories form the feature vector.
    pub joints: Vec<String>,

    /// Axes taken from each joint.
    pub axes: Vec<Axis>,

    /// Which keypoint map (2D image or 3D world) the pipeline reads.
    pub space: CoordinateSpace,

    /// Side used for leg length and default step detection.
    pub side: Side,

    /// Joint whose vertical trajectory drives step detection.
    /// `None` means `<side>_ankle`.
    pub step_joint: Option<String>,

    /// Minimum step duration in seconds.
    pub min_step_seconds: f64,

    /// Spans must be strictly longer than this many frames.
    pub min_span_frames: usize,

    /// Samples per phase-normalized step.
    pub phase_points: usize,

    /// Moving-average window (frames) for temporal smoothing.
    pub smoothing_window: usize,

    /// Whether phase velocities are appended to the feature vector.
    pub include_velocity: bool,

    /// Sliding phase window for SPD sequences.
    pub spd_window: usize,

    /// Regularization added as `epsilon * I` to every covariance.
    pub spd_epsilon: f64,

    /// Iteration cap for the Fréchet mean.
    pub frechet_max_iterations: usize,

    /// Step-norm threshold for Fréchet mean convergence.
    pub frechet_tolerance: f64,

    /// Output dimensions of the step embedding.
    pub embedding_dims: usize,

    /// Sampling rate (Hz) assumed when timestamps cannot provide one.
    pub fallback_sampling_rate: f64,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            joints: ["left_hip", "left_knee", "left_ankle", "left_shoulder"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            axes: vec![Axis::X, Axis::Y],
            space: CoordinateSpace::Image2D,
            side: Side::Left,
            step_joint: None,

            min_step_seconds: 0.45,
            min_span_frames: 3,
            phase_points: 101,
            smoothing_window: 5,
            include_velocity: false,

            spd_window: 11,
            spd_epsilon: 1e-6,
            frechet_max_iterations: 64,
            frechet_tolerance: 1e-8,

            embedding_dims: 2,
            fallback_sampling_rate: 60.0,
        }
    }
}

impl GaitConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for ordinary walking trials.
    #[must_use]
    pub fn walking() -> Self {
        Self::default()
    }

    /// Preset for running, where cycles are shorter.
    #[must_use]
    pub fn running() -> Self {
        Self {
            min_step_seconds: 0.3,
            smoothing_window: 3,
            ..Self::default()
        }
    }

    /// Preset with position and velocity channels.
    #[must_use]
    pub fn rich_features() -> Self {
        Self {
            include_velocity: true,
            spd_window: 21,
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.joints.is_empty() {
            return Err(GaitError::invalid_config("at least one joint is required"));
        }
        if self.axes.is_empty() {
            return Err(GaitError::invalid_config("at least one axis is required"));
        }
        if self.space == CoordinateSpace::Image2D && self.axes.contains(&Axis::Z) {
            return Err(GaitError::invalid_config(
                "axis z requires the 3D coordinate space",
            ));
        }
        if !is_positive(self.min_step_seconds) {
            return Err(GaitError::invalid_config(
                "min_step_seconds must be positive",
            ));
        }
        if self.phase_points < 2 {
            return Err(GaitError::invalid_config("phase_points must be at least 2"));
        }
        if self.smoothing_window == 0 {
            return Err(GaitError::invalid_config(
                "smoothing_window must be at least 1",
            ));
        }
        if self.spd_window < 2 {
            return Err(GaitError::invalid_config("spd_window must be at least 2"));
        }
        if !is_positive(self.spd_epsilon) {
            return Err(GaitError::invalid_config("spd_epsilon must be positive"));
        }
        if self.frechet_max_iterations == 0 {
            return Err(GaitError::invalid_config(
                "frechet_max_iterations must be at least 1",
            ));
        }
        if !is_positive(self.frechet_tolerance) {
            return Err(GaitError::invalid_config(
                "frechet_tolerance must be positive",
            ));
        }
        if self.embedding_dims == 0 {
            return Err(GaitError::invalid_config("embedding_dims must be at least 1"));
        }
        if !is_positive(self.fallback_sampling_rate) {
            return Err(GaitError::invalid_config(
                "fallback_sampling_rate must be positive",
            ));
        }
        Ok(())
    }

    /// Joint used for step detection.
    #[must_use]
    pub fn detection_joint(&self) -> String {
        self.step_joint
            .clone()
            .unwrap_or_else(|| format!("{}_ankle", self.side.prefix()))
    }

    /// Width of one feature row: joints × axes × (1 or 2).
    #[must_use]
    pub fn feature_dimension(&self) -> usize {
        let channels = if self.include_velocity { 2 } else { 1 };
        self.joints.len() * self.axes.len() * channels
    }

    /// Set the feature joints.
    #[must_use]
    pub fn with_joints<S: Into<String>>(mut self, joints: impl IntoIterator<Item = S>) -> Self {
        self.joints = joints.into_iter().map(Into::into).collect();
        self
    }

    /// Set the feature axes.
    #[must_use]
    pub fn with_axes(mut self, axes: Vec<Axis>) -> Self {
        self.axes = axes;
        self
    }

    /// Set the coordinate space.
    #[must_use]
    pub const fn with_space(mut self, space: CoordinateSpace) -> Self {
        self.space = space;
        self
    }

    /// Set the side.
    #[must_use]
    pub const fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// Override the step-detection joint.
    #[must_use]
    pub fn with_step_joint(mut self, joint: impl Into<String>) -> Self {
        self.step_joint = Some(joint.into());
        self
    }

    /// Enable/disable velocity channels.
    #[must_use]
    pub const fn with_velocity(mut self, include: bool) -> Self {
        self.include_velocity = include;
        self
    }

    /// Set the smoothing window.
    #[must_use]
    pub const fn with_smoothing_window(mut self, window: usize) -> Self {
        self.smoothing_window = window;
        self
    }

    /// Set the minimum step duration.
    #[must_use]
    pub const fn with_min_step_seconds(mut self, seconds: f64) -> Self {
        self.min_step_seconds = seconds;
        self
    }

    /// Set the number of phase samples per step.
    #[must_use]
    pub const fn with_phase_points(mut self, points: usize) -> Self {
        self.phase_points = points;
        self
    }

    /// Set the SPD sliding window.
    #[must_use]
    pub const fn with_spd_window(mut self, window: usize) -> Self {
        self.spd_window = window;
        self
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
