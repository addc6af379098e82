//! End-to-end gait analysis of one trial.
//!
//! [`GaitPipeline`] owns a trial and runs it through every stage:
//!
//! 1. pelvis centering, leg-length scaling and smoothing
//! 2. step detection and phase resampling
//! 3. per-step features, SPD sequences, smoothness and velocity, plus the
//!    path length and curvature of the detection joint
//! 4. cross-step Fréchet variance, pairwise distances and an embedding of
//!    the step covariances
//! 5. a Euclidean PCA embedding of the flattened step fingerprints
//!
//! A failing step is recorded in the report and the remaining steps continue.
//! Cross-step failures are recorded the same way and never discard the
//! per-step results.
//!
//! # Example
//!
//! ```no_run
//! use gait_geometry::{load_trial, GaitConfig, GaitPipeline};
//!
//! let trial = load_trial("trial.json")?;
//! let report = GaitPipeline::prepare(GaitConfig::walking(), trial)?.run()?;
//! println!("{report}");
//! # Ok::<(), gait_geometry::GaitError>(())
//! ```

use std::fmt;

use log::{info, warn};
use nalgebra::DMatrix;
use serde::Serialize;

use crate::config::GaitConfig;
use crate::error::{GaitError, Result};
use crate::features::FeatureBuilder;
use crate::metrics::{mean_curvature, trajectory_length, variability_sd};
use crate::pose::{Side, Trial};
use crate::preprocess::Preprocessor;
use crate::reporting::{pca_embed, ClassicalMds, DistanceEmbedder, MIN_EMBEDDING_SAMPLES};
use crate::segmentation::{estimate_sampling_rate, Step, StepDetector};
use crate::spd::{spd_from_features, spd_sequence, SpdManifold, SpdMatrix};

/// A validated configuration bound to the trial it will analyze.
#[derive(Debug, Clone)]
pub struct GaitPipeline {
    config: GaitConfig,
    trial: Trial,
}

impl GaitPipeline {
    /// Validate `config` against `trial` and take ownership of both.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::InvalidConfig`] for an invalid configuration and
    /// [`GaitError::MissingJoint`] if the detection joint or a feature joint
    /// never occurs in the trial.
    pub fn prepare(config: GaitConfig, trial: Trial) -> Result<Self> {
        config.validate()?;
        let detection = config.detection_joint();
        for joint in std::iter::once(&detection).chain(&config.joints) {
            if !trial.has_joint(joint, config.space) {
                return Err(GaitError::missing_joint(
                    joint.clone(),
                    trial.joint_names(config.space),
                ));
            }
        }
        Ok(Self { config, trial })
    }

    /// Configuration this pipeline runs with.
    #[must_use]
    pub const fn config(&self) -> &GaitConfig {
        &self.config
    }

    /// Run every stage and assemble the report.
    ///
    /// # Errors
    ///
    /// Returns an error only if the detection joint vanishes after
    /// preprocessing. Step and cross-step failures are kept in the report.
    pub fn run(self) -> Result<GaitReport> {
        let Self { config, trial } = self;
        let frame_count = trial.len();
        let preprocessor = Preprocessor::new(config.space);

        let trial = preprocessor.center_on_pelvis(trial);
        let leg_length = preprocessor.leg_length(&trial, config.side);
        let trial = match leg_length {
            Some(length) => preprocessor.scale_by_leg(trial, length),
            None => {
                warn!("no {} leg length available, skipping scaling", config.side);
                trial
            }
        };
        let trial = preprocessor.smooth(trial, config.smoothing_window);

        let detection = config.detection_joint();
        let sampling_rate = estimate_sampling_rate(&trial, config.fallback_sampling_rate);
        let detector = StepDetector::from_config(&config, sampling_rate);
        let events = detector.detect_events(&trial, &detection, config.space)?;
        let spans = detector.cut_steps(&events, config.min_span_frames);

        let mut joints = config.joints.clone();
        if !joints.contains(&detection) {
            joints.push(detection.clone());
        }
        let steps =
            detector.resample_steps(&trial, &spans, &joints, config.phase_points, config.space);
        info!(
            "{frame_count} frames at {sampling_rate:.1} Hz: {} events, {} steps",
            events.len(),
            steps.len()
        );

        let manifold = SpdManifold::new(config.feature_dimension())
            .with_mean_settings(config.frechet_max_iterations, config.frechet_tolerance);
        let builder = FeatureBuilder::from_config(&config);

        let mut step_reports = Vec::with_capacity(steps.len());
        let mut covariances = Vec::with_capacity(steps.len());
        let mut compared_steps = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let outcome = match measure_step(&config, &manifold, &builder, &detection, step) {
                Ok((outcome, covariance)) => {
                    covariances.push(covariance);
                    compared_steps.push(index);
                    outcome
                }
                Err(err) => {
                    warn!("step {index} ({}..{}) failed: {err}", step.start, step.end);
                    StepOutcome::Failed {
                        reason: err.to_string(),
                        numerical: err.is_numerical(),
                    }
                }
            };
            step_reports.push(StepReport {
                index,
                start: step.start,
                end: step.end,
                outcome,
            });
        }

        let comparison = compare_steps(&manifold, &covariances, config.embedding_dims);
        let fingerprints = builder.fingerprint(&steps);
        let fingerprint_embedding =
            embed_outcome("fingerprint", "complete steps", fingerprints.nrows(), || {
                pca_embed(&fingerprints, config.embedding_dims)
            });
        info!(
            "{} of {} steps measured, {} fingerprinted",
            covariances.len(),
            steps.len(),
            fingerprints.nrows()
        );

        Ok(GaitReport {
            side: config.side,
            frame_count,
            sampling_rate,
            leg_length,
            events,
            steps: step_reports,
            compared_steps,
            frechet_variance: comparison.frechet_variance,
            pairwise_distances: comparison.pairwise_distances,
            embedding: comparison.embedding,
            fingerprint_embedding,
        })
    }
}

fn measure_step(
    config: &GaitConfig,
    manifold: &SpdManifold,
    builder: &FeatureBuilder,
    detection: &str,
    step: &Step,
) -> Result<(StepOutcome, SpdMatrix)> {
    let features = builder.step_features(step)?;
    let sequence = spd_sequence(&features, config.spd_window, config.spd_epsilon)?;
    let smoothness = manifold.path_length(&sequence)?;
    let velocity = manifold.average_velocity(&sequence)?;
    let covariance = spd_from_features(&features, config.spd_epsilon)?;

    let Some(path) = step.trajectory(detection) else {
        return Err(GaitError::missing_joint(
            detection,
            step.resampled.keys().cloned().collect(),
        ));
    };
    Ok((
        StepOutcome::Measured {
            smoothness,
            velocity,
            joint_path_length: trajectory_length(path),
            joint_curvature: mean_curvature(path)?,
        },
        covariance,
    ))
}

/// Cross-step results over the measured covariances.
struct StepComparison {
    frechet_variance: VarianceOutcome,
    pairwise_distances: Option<Vec<Vec<f64>>>,
    embedding: EmbeddingOutcome,
}

fn compare_steps(
    manifold: &SpdManifold,
    covariances: &[SpdMatrix],
    dims: usize,
) -> StepComparison {
    let frechet_variance = match manifold.frechet_variance(covariances) {
        Ok(value) => VarianceOutcome::Computed { value },
        Err(err) => {
            warn!("Fréchet variance failed: {err}");
            VarianceOutcome::Failed {
                reason: err.to_string(),
                numerical: err.is_numerical(),
            }
        }
    };
    let (pairwise_distances, embedding) = match manifold.pairwise_distance_matrix(covariances) {
        Ok(distances) => (
            Some(rows_of(&distances)),
            embed_outcome("covariance", "measured steps", distances.nrows(), || {
                ClassicalMds.embed(&distances, dims)
            }),
        ),
        Err(err) => {
            warn!("pairwise distances failed: {err}");
            (None, EmbeddingOutcome::failed(&err))
        }
    };
    StepComparison {
        frechet_variance,
        pairwise_distances,
        embedding,
    }
}

fn embed_outcome(
    label: &str,
    unit: &str,
    samples: usize,
    embed: impl FnOnce() -> Result<DMatrix<f64>>,
) -> EmbeddingOutcome {
    if samples < MIN_EMBEDDING_SAMPLES {
        let reason = format!("need at least {MIN_EMBEDDING_SAMPLES} {unit}, got {samples}");
        warn!("{label} embedding skipped: {reason}");
        return EmbeddingOutcome::Skipped { reason };
    }
    match embed() {
        Ok(coordinates) => EmbeddingOutcome::Computed {
            variability_sd: variability_sd(&coordinates),
            coordinates: rows_of(&coordinates),
        },
        Err(err) => {
            warn!("{label} embedding failed: {err}");
            EmbeddingOutcome::failed(&err)
        }
    }
}

fn rows_of(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

/// Result of analyzing one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Manifold measures of the step's SPD sequence.
    Measured {
        /// Riemannian path length of the sequence.
        smoothness: f64,
        /// Path length per phase-window transition.
        velocity: f64,
        /// Euclidean length of the detection joint's resampled path.
        joint_path_length: f64,
        /// Mean planar curvature of that path over its first two axes.
        joint_curvature: f64,
    },
    /// The step could not be measured.
    Failed {
        /// Error message.
        reason: String,
        /// Whether the failure was numerical rather than missing data.
        numerical: bool,
    },
}

/// One detected step and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    /// Position among detected steps.
    pub index: usize,
    /// First frame of the step.
    pub start: usize,
    /// Frame after the last one.
    pub end: usize,
    /// Measures or failure.
    pub outcome: StepOutcome,
}

/// Fréchet variance of the compared steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VarianceOutcome {
    Computed { value: f64 },
    Failed { reason: String, numerical: bool },
}

/// Low-dimensional embedding of a set of steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EmbeddingOutcome {
    /// One coordinate row per embedded step.
    Computed {
        coordinates: Vec<Vec<f64>>,
        /// Spread of the embedded steps around their centroid.
        variability_sd: f64,
    },
    /// Too few steps to embed.
    Skipped { reason: String },
    /// The embedding or its inputs could not be computed.
    Failed { reason: String, numerical: bool },
}

impl EmbeddingOutcome {
    fn failed(err: &GaitError) -> Self {
        Self::Failed {
            reason: err.to_string(),
            numerical: err.is_numerical(),
        }
    }

    /// Coordinate rows, if computed.
    #[must_use]
    pub fn coordinates(&self) -> Option<&[Vec<f64>]> {
        match self {
            Self::Computed { coordinates, .. } => Some(coordinates),
            Self::Skipped { .. } | Self::Failed { .. } => None,
        }
    }

    /// Spread of the embedded steps, if computed.
    #[must_use]
    pub fn variability_sd(&self) -> Option<f64> {
        match self {
            Self::Computed { variability_sd, .. } => Some(*variability_sd),
            Self::Skipped { .. } | Self::Failed { .. } => None,
        }
    }
}

/// Everything the pipeline learned about one trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaitReport {
    pub side: Side,
    pub frame_count: usize,
    pub sampling_rate: f64,
    pub leg_length: Option<f64>,
    /// Frame indices of detected stance events.
    pub events: Vec<usize>,
    pub steps: Vec<StepReport>,
    /// Indices into `steps` of the rows of `pairwise_distances`.
    pub compared_steps: Vec<usize>,
    pub frechet_variance: VarianceOutcome,
    /// `None` if the distances could not be computed.
    pub pairwise_distances: Option<Vec<Vec<f64>>>,
    /// Classical MDS of the covariance distances.
    pub embedding: EmbeddingOutcome,
    /// PCA of the flattened joint trajectories of every complete step.
    pub fingerprint_embedding: EmbeddingOutcome,
}

impl GaitReport {
    /// Number of steps with manifold measures.
    #[must_use]
    pub fn measured_steps(&self) -> usize {
        self.compared_steps.len()
    }

    /// Fréchet variance, if it was computed.
    #[must_use]
    pub fn frechet_variance_value(&self) -> Option<f64> {
        match self.frechet_variance {
            VarianceOutcome::Computed { value } => Some(value),
            VarianceOutcome::Failed { .. } => None,
        }
    }

    /// Covariance embedding rows, if the embedding was computed.
    #[must_use]
    pub fn embedding_coordinates(&self) -> Option<&[Vec<f64>]> {
        self.embedding.coordinates()
    }
}

fn write_embedding(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    outcome: &EmbeddingOutcome,
) -> fmt::Result {
    match outcome {
        EmbeddingOutcome::Computed {
            coordinates,
            variability_sd,
        } => writeln!(
            f,
            "{label}: {} points, variability SD {variability_sd:.4}",
            coordinates.len()
        ),
        EmbeddingOutcome::Skipped { reason } => writeln!(f, "{label} skipped: {reason}"),
        EmbeddingOutcome::Failed { reason, .. } => writeln!(f, "{label} failed: {reason}"),
    }
}

impl fmt::Display for GaitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Trial: {} frames at {:.1} Hz, {} side",
            self.frame_count, self.sampling_rate, self.side
        )?;
        match self.leg_length {
            Some(length) => writeln!(f, "Leg length: {length:.4}")?,
            None => writeln!(f, "Leg length: unavailable")?,
        }
        writeln!(
            f,
            "Events: {}, steps: {} ({} measured)",
            self.events.len(),
            self.steps.len(),
            self.measured_steps()
        )?;
        for step in &self.steps {
            write!(f, "  step {:>2} [{:>5}..{:>5}) ", step.index, step.start, step.end)?;
            match &step.outcome {
                StepOutcome::Measured {
                    smoothness,
                    velocity,
                    joint_path_length,
                    joint_curvature,
                } => writeln!(
                    f,
                    "smoothness {smoothness:.4}  velocity {velocity:.4}  \
                     path {joint_path_length:.4}  curvature {joint_curvature:.4}"
                )?,
                StepOutcome::Failed { reason, .. } => writeln!(f, "failed: {reason}")?,
            }
        }
        match &self.frechet_variance {
            VarianceOutcome::Computed { value } => writeln!(f, "Fréchet variance: {value:.4}")?,
            VarianceOutcome::Failed { reason, .. } => {
                writeln!(f, "Fréchet variance failed: {reason}")?;
            }
        }
        write_embedding(f, "Embedding", &self.embedding)?;
        write_embedding(f, "Fingerprint PCA", &self.fingerprint_embedding)
    }
}
