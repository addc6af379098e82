//! Euclidean descriptors of planar trajectories and point clouds.
//!
//! Rows are samples, columns are coordinates. These complement the manifold
//! measures with plain-geometry summaries of embeddings or joint paths.

use nalgebra::DMatrix;

use crate::error::{GaitError, Result};

const CURVATURE_EPSILON: f64 = 1e-8;

/// Sum of Euclidean distances between consecutive rows.
///
/// Fewer than two rows give `0.0`.
#[must_use]
pub fn trajectory_length(trajectory: &DMatrix<f64>) -> f64 {
    (1..trajectory.nrows())
        .map(|r| (trajectory.row(r) - trajectory.row(r - 1)).norm())
        .sum()
}

/// Mean planar curvature `|x'y'' - y'x''| / (|v|³ + ε)` of the first two columns.
///
/// Derivatives use central differences with one-sided edges. Non-finite
/// samples are ignored in the mean; fewer than two rows give `0.0`.
///
/// # Errors
///
/// Returns [`GaitError::DimensionMismatch`] if the trajectory has fewer than
/// two columns.
pub fn mean_curvature(trajectory: &DMatrix<f64>) -> Result<f64> {
    if trajectory.ncols() < 2 {
        return Err(GaitError::dimension_mismatch(2, trajectory.ncols()));
    }
    if trajectory.nrows() < 2 {
        return Ok(0.0);
    }
    let x: Vec<f64> = trajectory.column(0).iter().copied().collect();
    let y: Vec<f64> = trajectory.column(1).iter().copied().collect();
    let (vx, vy) = (gradient(&x), gradient(&y));
    let (ax, ay) = (gradient(&vx), gradient(&vy));

    let kappa: Vec<f64> = (0..x.len())
        .map(|i| {
            let speed = vx[i].hypot(vy[i]);
            (vx[i] * ay[i] - vy[i] * ax[i]).abs() / (speed.powi(3) + CURVATURE_EPSILON)
        })
        .filter(|k| k.is_finite())
        .collect();
    if kappa.is_empty() {
        return Ok(0.0);
    }
    Ok(kappa.iter().sum::<f64>() / kappa.len() as f64)
}

/// Population standard deviation of each row's distance to the centroid.
///
/// Empty input gives `0.0`.
#[must_use]
pub fn variability_sd(points: &DMatrix<f64>) -> f64 {
    let n = points.nrows();
    if n == 0 {
        return 0.0;
    }
    let centroid = points.row_mean();
    let radii: Vec<f64> = (0..n).map(|r| (points.row(r) - &centroid).norm()).collect();
    let mean = radii.iter().sum::<f64>() / n as f64;
    (radii.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n as f64).sqrt()
}

/// Central-difference gradient with first-order edges.
fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n)
        .map(|i| match i {
            0 => values[1] - values[0],
            i if i == n - 1 => values[n - 1] - values[n - 2],
            i => (values[i + 1] - values[i - 1]) / 2.0,
        })
        .collect()
}
