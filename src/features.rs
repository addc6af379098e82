//! Per-phase feature vectors for phase-normalized steps.
//!
//! A step's selected joints and axes are concatenated into one row per phase
//! sample. With velocity enabled, the phase derivatives of the same channels
//! follow the positions:
//!
//! | Columns | Content |
//! |---------|---------|
//! | `0 .. J·A` | positions, joint-major then axis |
//! | `J·A .. 2·J·A` | phase velocities, same order (optional) |

use nalgebra::DMatrix;

use crate::config::GaitConfig;
use crate::error::{GaitError, Result};
use crate::math::interp::smoothed_derivative;
use crate::pose::Axis;
use crate::segmentation::Step;

/// Builds feature matrices from resampled steps.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBuilder {
    joints: Vec<String>,
    axes: Vec<Axis>,
    include_velocity: bool,
}

impl FeatureBuilder {
    /// Create a builder for the given joints and axes.
    #[must_use]
    pub fn new<S: Into<String>>(
        joints: impl IntoIterator<Item = S>,
        axes: Vec<Axis>,
        include_velocity: bool,
    ) -> Self {
        Self {
            joints: joints.into_iter().map(Into::into).collect(),
            axes,
            include_velocity,
        }
    }

    /// Create a builder from the pipeline configuration.
    #[must_use]
    pub fn from_config(config: &GaitConfig) -> Self {
        Self::new(
            config.joints.iter().cloned(),
            config.axes.clone(),
            config.include_velocity,
        )
    }

    /// Width of a feature row.
    #[must_use]
    pub fn feature_dimension(&self) -> usize {
        let channels = if self.include_velocity { 2 } else { 1 };
        self.joints.len() * self.axes.len() * channels
    }

    /// `(phase_points × feature_dimension)` feature matrix of one step.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::MissingJoint`] if the step lacks a selected joint
    /// and [`GaitError::DimensionMismatch`] if a trajectory lacks a selected
    /// axis or has a different phase length from the others.
    pub fn step_features(&self, step: &Step) -> Result<DMatrix<f64>> {
        let n_points = step.phase_points();
        let positional = self.joints.len() * self.axes.len();
        let mut features = DMatrix::zeros(n_points, self.feature_dimension());

        for (j, joint) in self.joints.iter().enumerate() {
            let Some(trajectory) = step.trajectory(joint) else {
                return Err(GaitError::missing_joint(
                    joint.clone(),
                    step.resampled.keys().cloned().collect(),
                ));
            };
            if trajectory.nrows() != n_points {
                return Err(GaitError::dimension_mismatch(n_points, trajectory.nrows()));
            }
            for (a, axis) in self.axes.iter().enumerate() {
                let source = axis.index();
                if source >= trajectory.ncols() {
                    return Err(GaitError::dimension_mismatch(source + 1, trajectory.ncols()));
                }
                let column = j * self.axes.len() + a;
                features.set_column(column, &trajectory.column(source));

                if self.include_velocity {
                    let signal: Vec<f64> = trajectory.column(source).iter().copied().collect();
                    // per-sample derivative → per unit phase
                    let scale = n_points.saturating_sub(1).max(1) as f64;
                    for (row, d) in smoothed_derivative(&signal).into_iter().enumerate() {
                        features[(row, positional + column)] = d * scale;
                    }
                }
            }
        }
        Ok(features)
    }

    /// One flattened row per step: joint-major, then phase, then axis.
    ///
    /// Steps missing any selected joint are skipped. All retained steps must
    /// share the phase length of the first.
    #[must_use]
    pub fn fingerprint(&self, steps: &[Step]) -> DMatrix<f64> {
        let rows: Vec<Vec<f64>> = steps
            .iter()
            .filter_map(|step| {
                let mut row = Vec::new();
                for joint in &self.joints {
                    let trajectory = step.trajectory(joint)?;
                    for r in 0..trajectory.nrows() {
                        for axis in &self.axes {
                            row.push(*trajectory.get((r, axis.index()))?);
                        }
                    }
                }
                Some(row)
            })
            .collect();

        let Some(width) = rows.first().map(Vec::len) else {
            return DMatrix::zeros(0, 0);
        };
        let rows: Vec<Vec<f64>> = rows.into_iter().filter(|r| r.len() == width).collect();
        DMatrix::from_fn(rows.len(), width, |i, j| rows[i][j])
    }
}
