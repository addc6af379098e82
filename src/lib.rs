//! Gait Geometry Library
//!
//! Riemannian gait signatures from body-keypoint time series.
//!
//! Each step of a walking trial becomes a symmetric positive-definite (SPD)
//! covariance matrix of joint trajectories. Steps are then compared with the
//! affine-invariant metric on the SPD manifold: geodesic distances, Fréchet
//! means, and path lengths of per-phase SPD sequences.
//!
//! # Features
//!
//! - **Manifold engine**: log/exp maps, geodesic distance, Karcher mean, variance
//! - **Step segmentation**: peak-based stance events, phase normalization
//! - **Preprocessing**: pelvis centering, leg-length scaling, smoothing
//! - **Reporting**: classical MDS, PCA, cross-validated logistic evaluation
//!
//! # Quick Start
//!
//! ```
//! use gait_geometry::spd::{spd_from_features, SpdManifold};
//! use nalgebra::DMatrix;
//!
//! // two 20-sample feature matrices with 2 channels each
//! let a = DMatrix::from_fn(20, 2, |r, c| (r as f64 * 0.3 + c as f64).sin());
//! let b = DMatrix::from_fn(20, 2, |r, c| (r as f64 * 0.5 + c as f64).cos());
//!
//! let manifold = SpdManifold::new(2);
//! let ca = spd_from_features(&a, 1e-6)?;
//! let cb = spd_from_features(&b, 1e-6)?;
//! let d = manifold.distance(&ca, &cb)?;
//! assert!(d > 0.0);
//! # Ok::<(), gait_geometry::GaitError>(())
//! ```
//!
//! # Pipeline Stages
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Ingestion | [`pose`] | [`Trial`] of time-ordered frames |
//! | Preprocessing | [`preprocess`] | centered, scaled, smoothed trial |
//! | Segmentation | [`segmentation`] | phase-normalized [`Step`]s |
//! | Features | [`features`] | per-phase feature matrix |
//! | Manifold | [`spd`] | covariances, distances, means |
//! | Reporting | [`reporting`], [`metrics`] | embeddings, scores |
//!
//! # Presets
//!
//! ```
//! use gait_geometry::GaitConfig;
//!
//! let walking = GaitConfig::walking();
//! let running = GaitConfig::running();
//! let rich = GaitConfig::rich_features();
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod config;
pub mod error;
pub mod features;
pub mod math;
pub mod metrics;
pub mod pipeline;
pub mod pose;
pub mod preprocess;
pub mod reporting;
pub mod segmentation;
pub mod spd;

// Re-exports for convenient access
pub use config::GaitConfig;
pub use error::{GaitError, Result};
pub use features::FeatureBuilder;
pub use metrics::{mean_curvature, trajectory_length, variability_sd};
pub use pipeline::{
    EmbeddingOutcome, GaitPipeline, GaitReport, StepOutcome, StepReport, VarianceOutcome,
};
pub use pose::{load_trial, parse_trial, Axis, CoordinateSpace, Frame, Side, Trial};
pub use preprocess::Preprocessor;
pub use reporting::{
    pca_embed, BinaryEvaluator, ClassicalMds, DistanceEmbedder, EvaluationScore,
    LogisticEvaluator,
};
pub use segmentation::{estimate_sampling_rate, find_peaks, Step, StepDetector};
pub use spd::{spd_from_features, spd_sequence, FrechetMean, SpdManifold, SpdMatrix};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn generate_gait(n: usize, period: f64) -> Trial {
        let frames = (0..n)
            .map(|i| {
                let t = i as f64 / 60.0;
                let phase = 2.0 * PI * t / period;
                Frame::new(t)
                    .with_2d("left_hip", [0.02 * phase.cos(), 1.0])
                    .with_2d("right_hip", [0.02 * phase.cos() + 0.2, 1.0])
                    .with_2d("left_knee", [0.1 * phase.sin(), 1.5 + 0.05 * phase.cos()])
                    .with_2d("left_ankle", [0.2 * phase.sin(), 2.0 + 0.1 * phase.sin()])
                    .with_2d("left_shoulder", [0.03 * phase.sin(), 0.2 * (2.0 * phase).cos()])
            })
            .collect();
        Trial::new(frames)
    }

    #[test]
    fn test_full_pipeline() {
        let trial = generate_gait(300, 1.2);
        let report = GaitPipeline::prepare(GaitConfig::walking(), trial)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.frame_count, 300);
        assert_relative_eq!(report.sampling_rate, 60.0, epsilon = 1e-6);
        assert!(report.measured_steps() >= 3);
        for step in &report.steps {
            match step.outcome {
                StepOutcome::Measured {
                    smoothness,
                    velocity,
                    joint_path_length,
                    joint_curvature,
                } => {
                    assert!(smoothness.is_finite() && smoothness >= 0.0);
                    assert!(velocity.is_finite() && velocity >= 0.0);
                    assert!(joint_path_length > 0.0);
                    assert!(joint_curvature.is_finite() && joint_curvature >= 0.0);
                }
                StepOutcome::Failed { ref reason, .. } => panic!("step failed: {reason}"),
            }
        }
        let coords = report.embedding_coordinates().unwrap();
        assert_eq!(coords.len(), report.measured_steps());
        assert!(coords.iter().all(|row| row.len() == 2));
    }

    #[test]
    fn test_manifold_distance_matches_pipeline_matrix() {
        let report = GaitPipeline::prepare(GaitConfig::walking(), generate_gait(300, 1.2))
            .unwrap()
            .run()
            .unwrap();
        let d = report.pairwise_distances.as_ref().unwrap();
        for i in 0..d.len() {
            assert_relative_eq!(d[i][i], 0.0);
            for j in 0..d.len() {
                assert_relative_eq!(d[i][j], d[j][i]);
            }
        }
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
