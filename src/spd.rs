//! Riemannian geometry of symmetric positive-definite matrices.
//!
//! This module turns per-step feature matrices into SPD covariance matrices
//! and computes statistics on them under the affine-invariant metric:
//!
//! - `log_P(Q) = P^½ · log(P^-½ Q P^-½) · P^½`
//! - `exp_P(V) = P^½ · exp(P^-½ V P^-½) · P^½`
//! - `d(A, B) = ‖log(A^-½ B A^-½)‖_F`
//!
//! # Example
//!
//! ```
//! use gait_geometry::spd::{SpdManifold, SpdMatrix};
//!
//! let manifold = SpdManifold::new(3);
//! let a = SpdMatrix::identity(3);
//! let b = SpdMatrix::scaled_identity(3, 2.0)?;
//!
//! let d = manifold.distance(&a, &b)?;
//! assert!((d - 3f64.sqrt() * 2f64.ln()).abs() < 1e-10);
//! # Ok::<(), gait_geometry::GaitError>(())
//! ```

use std::cmp::Ordering;

use log::{debug, warn};
use nalgebra::{Cholesky, DMatrix};

use crate::error::{GaitError, Result};
use crate::math::linalg::{
    covariance, ensure_finite, spd_function, spd_sqrt_pair, symmetric_eigenvalues,
    symmetric_exp, symmetrize,
};

/// Default iteration cap for the Fréchet mean.
pub const DEFAULT_MAX_ITERATIONS: usize = 64;

/// Default stopping threshold on the tangent step norm.
pub const DEFAULT_TOLERANCE: f64 = 1e-8;

/// Default diagonal regularization for covariance matrices.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Relative tolerance used when checking symmetry of an input matrix.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// A symmetric positive-definite matrix.
///
/// Construction validates that the matrix is square, finite, symmetric and
/// admits a Cholesky factorization.
#[derive(Debug, Clone, PartialEq)]
pub struct SpdMatrix(DMatrix<f64>);

impl SpdMatrix {
    /// Wrap a matrix after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::DimensionMismatch`] for a non-square matrix,
    /// [`GaitError::NumericalInstability`] for NaN/Inf entries, and
    /// [`GaitError::NotPositiveDefinite`] for asymmetric or indefinite input.
    pub fn new(matrix: DMatrix<f64>) -> Result<Self> {
        if !matrix.is_square() {
            return Err(GaitError::dimension_mismatch(matrix.nrows(), matrix.ncols()));
        }
        if matrix.nrows() == 0 {
            return Err(GaitError::not_positive_definite("empty matrix"));
        }
        ensure_finite(&matrix, "SPD input")?;

        let scale = matrix.amax().max(1.0);
        let asymmetry = (&matrix - matrix.transpose()).amax();
        if asymmetry > SYMMETRY_TOLERANCE * scale {
            return Err(GaitError::not_positive_definite(format!(
                "matrix is not symmetric (max deviation {asymmetry:e})"
            )));
        }
        if Cholesky::new(matrix.clone()).is_none() {
            return Err(GaitError::not_positive_definite(
                "Cholesky factorization failed",
            ));
        }
        Ok(Self(matrix))
    }

    /// Regularized SPD matrix from a covariance estimate: `sym(C) + ε·I`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`SpdMatrix::new`].
    pub fn from_covariance(cov: &DMatrix<f64>, epsilon: f64) -> Result<Self> {
        let n = cov.nrows();
        Self::new(symmetrize(cov) + DMatrix::identity(n, n) * epsilon)
    }

    /// The identity matrix of dimension `dim`.
    #[must_use]
    pub fn identity(dim: usize) -> Self {
        Self(DMatrix::identity(dim, dim))
    }

    /// `scale · I`.
    ///
    /// # Errors
    ///
    /// Returns an error unless `scale` is positive and finite.
    pub fn scaled_identity(dim: usize, scale: f64) -> Result<Self> {
        Self::new(DMatrix::identity(dim, dim) * scale)
    }

    /// Matrix dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.0.nrows()
    }

    /// Borrow the underlying matrix.
    #[must_use]
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.0
    }

    /// Unwrap into the underlying matrix.
    #[must_use]
    pub fn into_inner(self) -> DMatrix<f64> {
        self.0
    }
}

/// Covariance over phase of a `(T × d)` feature matrix, regularized.
///
/// # Errors
///
/// Returns [`GaitError::InsufficientData`] for fewer than two phase samples,
/// or a numerical error if the regularized matrix is not SPD.
pub fn spd_from_features(features: &DMatrix<f64>, epsilon: f64) -> Result<SpdMatrix> {
    SpdMatrix::from_covariance(&covariance(features)?, epsilon)
}

/// Sliding-window SPD sequence over phase.
///
/// For each phase index `t`, the covariance of rows `[t - h, t + h]` (clipped
/// to the matrix) with `h = max(1, window / 2)`, regularized by `ε·I`.
///
/// # Errors
///
/// Returns [`GaitError::InsufficientData`] for fewer than two phase samples.
pub fn spd_sequence(features: &DMatrix<f64>, window: usize, epsilon: f64) -> Result<Vec<SpdMatrix>> {
    let t_len = features.nrows();
    if t_len < 2 {
        return Err(GaitError::insufficient_data("SPD sequence phase samples", 2, t_len));
    }
    let half = (window / 2).max(1);
    (0..t_len)
        .map(|t| {
            let start = t.saturating_sub(half);
            let end = (t + half + 1).min(t_len);
            let rows = features.rows(start, end - start).into_owned();
            SpdMatrix::from_covariance(&covariance(&rows)?, epsilon)
        })
        .collect()
}

/// Fréchet mean together with its iteration diagnostics.
#[derive(Debug, Clone)]
pub struct FrechetMean {
    /// The mean estimate.
    pub mean: SpdMatrix,
    /// Number of tangent-space updates evaluated.
    pub iterations: usize,
    /// Whether the step norm dropped below the tolerance.
    pub converged: bool,
    /// Frobenius norm of the last averaged tangent vector.
    pub final_step_norm: f64,
}

/// `P^½` and `P^-½` of a base point, reused across log/exp maps.
struct BaseFrame {
    sqrt: DMatrix<f64>,
    inv_sqrt: DMatrix<f64>,
}

impl BaseFrame {
    fn new(base: &SpdMatrix) -> Result<Self> {
        let (sqrt, inv_sqrt) = spd_sqrt_pair(base.as_matrix(), "base point")?;
        Ok(Self { sqrt, inv_sqrt })
    }

    fn whiten(&self, m: &DMatrix<f64>) -> DMatrix<f64> {
        symmetrize(&(&self.inv_sqrt * m * &self.inv_sqrt))
    }

    fn color(&self, m: &DMatrix<f64>) -> DMatrix<f64> {
        symmetrize(&(&self.sqrt * m * &self.sqrt))
    }

    fn log(&self, point: &SpdMatrix) -> Result<DMatrix<f64>> {
        let inner = spd_function(&self.whiten(point.as_matrix()), f64::ln, "log map")?;
        Ok(self.color(&inner))
    }

    fn exp(&self, tangent: &DMatrix<f64>) -> Result<SpdMatrix> {
        let inner = symmetric_exp(&self.whiten(tangent), "exp map")?;
        SpdMatrix::new(self.color(&inner))
    }
}

/// The SPD manifold of a fixed dimension with the affine-invariant metric.
///
/// All operations are pure functions of their inputs. Matrices whose
/// dimension differs from the manifold's fail with
/// [`GaitError::DimensionMismatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpdManifold {
    dim: usize,
    max_iterations: usize,
    tolerance: f64,
}

impl SpdManifold {
    /// Manifold of `dim × dim` SPD matrices with default Fréchet settings.
    #[must_use]
    pub const fn new(dim: usize) -> Self {
        Self {
            dim,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Set the Fréchet iteration cap and tolerance used by
    /// [`SpdManifold::frechet_variance`].
    #[must_use]
    pub const fn with_mean_settings(mut self, max_iterations: usize, tolerance: f64) -> Self {
        self.max_iterations = max_iterations;
        self.tolerance = tolerance;
        self
    }

    /// Matrix dimension.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    fn check(&self, m: &SpdMatrix) -> Result<()> {
        if m.dim() == self.dim {
            Ok(())
        } else {
            Err(GaitError::dimension_mismatch(self.dim, m.dim()))
        }
    }

    /// Logarithmic map: tangent vector at `base` pointing to `point`.
    ///
    /// # Errors
    ///
    /// Returns a dimension or numerical error.
    pub fn log_map(&self, base: &SpdMatrix, point: &SpdMatrix) -> Result<DMatrix<f64>> {
        self.check(base)?;
        self.check(point)?;
        BaseFrame::new(base)?.log(point)
    }

    /// Exponential map: follow the geodesic from `base` along `tangent`.
    ///
    /// # Errors
    ///
    /// Returns a dimension or numerical error.
    pub fn exp_map(&self, base: &SpdMatrix, tangent: &DMatrix<f64>) -> Result<SpdMatrix> {
        self.check(base)?;
        if tangent.nrows() != self.dim || tangent.ncols() != self.dim {
            return Err(GaitError::dimension_mismatch(self.dim, tangent.nrows()));
        }
        BaseFrame::new(base)?.exp(tangent)
    }

    /// Affine-invariant geodesic distance.
    ///
    /// Non-negative and zero for identical inputs. The arguments are put in a
    /// fixed order before whitening, so `distance(a, b)` and `distance(b, a)`
    /// are bit-identical.
    ///
    /// # Errors
    ///
    /// Returns a dimension or numerical error; never NaN.
    pub fn distance(&self, a: &SpdMatrix, b: &SpdMatrix) -> Result<f64> {
        self.check(a)?;
        self.check(b)?;
        let (a, b) = canonical_pair(a, b);
        let frame = BaseFrame::new(a)?;
        let eigenvalues = symmetric_eigenvalues(&frame.whiten(b.as_matrix()));

        let mut sum_sq = 0.0;
        for &lambda in eigenvalues.iter() {
            if !lambda.is_finite() || lambda <= 0.0 {
                return Err(GaitError::not_positive_definite(format!(
                    "distance: whitened eigenvalue {lambda:e}"
                )));
            }
            sum_sq += lambda.ln().powi(2);
        }
        let d = sum_sq.sqrt();
        if d.is_finite() {
            Ok(d)
        } else {
            Err(GaitError::numerical_instability("distance is not finite"))
        }
    }

    /// Fréchet (Karcher) mean by fixed-point iteration.
    ///
    /// Starts from the first matrix; a single input is returned unchanged. A
    /// mean that has not converged after `max_iterations` is still returned.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::InsufficientData`] for an empty set, or a
    /// dimension/numerical error from a log or exp map.
    pub fn frechet_mean(
        &self,
        matrices: &[SpdMatrix],
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<SpdMatrix> {
        Ok(self
            .frechet_mean_detailed(matrices, max_iterations, tolerance)?
            .mean)
    }

    /// Fréchet mean with iteration diagnostics.
    ///
    /// # Errors
    ///
    /// See [`SpdManifold::frechet_mean`].
    pub fn frechet_mean_detailed(
        &self,
        matrices: &[SpdMatrix],
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<FrechetMean> {
        let Some(first) = matrices.first() else {
            return Err(GaitError::insufficient_data("Fréchet mean", 1, 0));
        };
        for m in matrices {
            self.check(m)?;
        }
        if matrices.len() == 1 {
            return Ok(FrechetMean {
                mean: first.clone(),
                iterations: 0,
                converged: true,
                final_step_norm: 0.0,
            });
        }

        let n = matrices.len() as f64;
        let mut mean = first.clone();
        let mut iterations = 0;
        let mut converged = false;
        let mut step_norm = f64::INFINITY;

        while iterations < max_iterations {
            iterations += 1;
            let frame = BaseFrame::new(&mean)?;
            let mut step = DMatrix::zeros(self.dim, self.dim);
            for m in matrices {
                step += frame.log(m)?;
            }
            step /= n;

            step_norm = step.norm();
            if !step_norm.is_finite() {
                return Err(GaitError::numerical_instability(
                    "Fréchet mean tangent step is not finite",
                ));
            }
            if step_norm < tolerance {
                converged = true;
                break;
            }
            mean = frame.exp(&step)?;
        }

        if converged {
            debug!("Fréchet mean converged after {iterations} iterations");
        } else {
            warn!(
                "Fréchet mean stopped at iteration cap {max_iterations} (step norm {step_norm:e})"
            );
        }

        Ok(FrechetMean {
            mean,
            iterations,
            converged,
            final_step_norm: step_norm,
        })
    }

    /// Riemannian arc length: sum of consecutive geodesic distances.
    ///
    /// # Errors
    ///
    /// Returns a dimension or numerical error.
    pub fn path_length(&self, sequence: &[SpdMatrix]) -> Result<f64> {
        if sequence.len() < 2 {
            return Ok(0.0);
        }
        sequence
            .windows(2)
            .map(|pair| self.distance(&pair[0], &pair[1]))
            .sum()
    }

    /// Path length per phase-window transition: `path_length / (len - 1)`.
    ///
    /// # Errors
    ///
    /// Returns a dimension or numerical error.
    pub fn average_velocity(&self, sequence: &[SpdMatrix]) -> Result<f64> {
        if sequence.len() < 2 {
            return Ok(0.0);
        }
        Ok(self.path_length(sequence)? / (sequence.len() - 1) as f64)
    }

    /// Mean squared geodesic distance to the Fréchet mean. Zero for an empty set.
    ///
    /// # Errors
    ///
    /// Returns a dimension or numerical error.
    pub fn frechet_variance(&self, matrices: &[SpdMatrix]) -> Result<f64> {
        if matrices.is_empty() {
            return Ok(0.0);
        }
        let mean = self.frechet_mean(matrices, self.max_iterations, self.tolerance)?;
        let mut total = 0.0;
        for m in matrices {
            total += self.distance(m, &mean)?.powi(2);
        }
        Ok(total / matrices.len() as f64)
    }

    /// All pairwise geodesic distances; symmetric with a zero diagonal.
    ///
    /// # Errors
    ///
    /// Returns a dimension or numerical error.
    pub fn pairwise_distance_matrix(&self, matrices: &[SpdMatrix]) -> Result<DMatrix<f64>> {
        let n = matrices.len();
        let mut distances = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in (i + 1)..n {
                let d = self.distance(&matrices[i], &matrices[j])?;
                distances[(i, j)] = d;
                distances[(j, i)] = d;
            }
        }
        Ok(distances)
    }
}

/// Order two matrices by their entries in column-major order.
fn canonical_pair<'m>(a: &'m SpdMatrix, b: &'m SpdMatrix) -> (&'m SpdMatrix, &'m SpdMatrix) {
    for (x, y) in a.as_matrix().iter().zip(b.as_matrix().iter()) {
        match x.total_cmp(y) {
            Ordering::Less => return (a, b),
            Ordering::Greater => return (b, a),
            Ordering::Equal => {}
        }
    }
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spd(rows: usize, data: &[f64]) -> SpdMatrix {
        SpdMatrix::new(DMatrix::from_row_slice(rows, rows, data)).unwrap()
    }

    fn sample_set() -> Vec<SpdMatrix> {
        vec![
            spd(2, &[2.0, 0.3, 0.3, 1.0]),
            spd(2, &[1.0, -0.2, -0.2, 3.0]),
            spd(2, &[0.5, 0.1, 0.1, 0.7]),
        ]
    }

    #[test]
    fn test_rejects_invalid_matrices() {
        assert!(SpdMatrix::new(DMatrix::zeros(2, 3)).is_err());
        assert!(SpdMatrix::new(DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 1.0])).is_err());
        assert!(SpdMatrix::new(DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0])).is_err());
        assert!(SpdMatrix::new(DMatrix::from_row_slice(1, 1, &[f64::NAN])).is_err());
        assert!(SpdMatrix::scaled_identity(3, 0.0).is_err());
    }

    #[test]
    fn test_distance_identity_vs_doubled() {
        for d in 1..=5 {
            let manifold = SpdManifold::new(d);
            let a = SpdMatrix::identity(d);
            let b = SpdMatrix::scaled_identity(d, 2.0).unwrap();
            let dist = manifold.distance(&a, &b).unwrap();
            assert_relative_eq!(dist, (d as f64).sqrt() * 2f64.ln(), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_distance_axioms() {
        let manifold = SpdManifold::new(2);
        let set = sample_set();
        for a in &set {
            assert!(manifold.distance(a, a).unwrap() < 1e-10);
            for b in &set {
                let ab = manifold.distance(a, b).unwrap();
                let ba = manifold.distance(b, a).unwrap();
                assert!(ab >= 0.0);
                assert_eq!(ab.to_bits(), ba.to_bits());
            }
        }
    }

    #[test]
    fn test_distance_ignores_argument_order_for_ill_conditioned_pair() {
        let manifold = SpdManifold::new(3);
        let a = SpdMatrix::new(DMatrix::from_row_slice(
            3,
            3,
            &[4.0, 1.9, 0.3, 1.9, 1.0, 0.1, 0.3, 0.1, 0.05],
        ))
        .unwrap();
        let b = SpdMatrix::new(DMatrix::from_row_slice(
            3,
            3,
            &[0.7, -0.2, 0.0, -0.2, 2.5, 0.4, 0.0, 0.4, 9.0],
        ))
        .unwrap();
        let ab = manifold.distance(&a, &b).unwrap();
        let ba = manifold.distance(&b, &a).unwrap();
        assert!(ab > 0.0);
        assert_eq!(ab.to_bits(), ba.to_bits());
    }

    #[test]
    fn test_distance_affine_invariant() {
        let manifold = SpdManifold::new(2);
        let set = sample_set();
        let g = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 0.5, 3.0]);
        let transform = |m: &SpdMatrix| {
            SpdMatrix::new(symmetrize(&(&g * m.as_matrix() * g.transpose()))).unwrap()
        };
        let d = manifold.distance(&set[0], &set[1]).unwrap();
        let dg = manifold
            .distance(&transform(&set[0]), &transform(&set[1]))
            .unwrap();
        assert_relative_eq!(d, dg, epsilon = 1e-8);
    }

    #[test]
    fn test_distance_near_regularization_floor() {
        let manifold = SpdManifold::new(3);
        let floor = SpdMatrix::from_covariance(&DMatrix::zeros(3, 3), DEFAULT_EPSILON).unwrap();
        let other = SpdMatrix::scaled_identity(3, 4.0).unwrap();
        let d = manifold.distance(&floor, &other).unwrap();
        assert!(d.is_finite());
        assert_relative_eq!(d, 3f64.sqrt() * (4.0 / DEFAULT_EPSILON).ln(), epsilon = 1e-6);
    }

    #[test]
    fn test_dimension_mismatch() {
        let manifold = SpdManifold::new(2);
        let err = manifold
            .distance(&SpdMatrix::identity(2), &SpdMatrix::identity(3))
            .unwrap_err();
        assert!(err.is_numerical());
    }

    #[test]
    fn test_log_exp_round_trip() {
        let manifold = SpdManifold::new(2);
        let set = sample_set();
        let v = manifold.log_map(&set[0], &set[1]).unwrap();
        let back = manifold.exp_map(&set[0], &v).unwrap();
        for (a, b) in back.as_matrix().iter().zip(set[1].as_matrix().iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
        // distance equals the norm of the whitened tangent vector
        let (_, inv_sqrt) = spd_sqrt_pair(set[0].as_matrix(), "t").unwrap();
        let whitened = &inv_sqrt * &v * &inv_sqrt;
        assert_relative_eq!(
            whitened.norm(),
            manifold.distance(&set[0], &set[1]).unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_frechet_mean_single_is_exact() {
        let manifold = SpdManifold::new(2);
        let a = sample_set().remove(0);
        let mean = manifold
            .frechet_mean(std::slice::from_ref(&a), 64, 1e-8)
            .unwrap();
        assert_eq!(mean, a);
    }

    #[test]
    fn test_frechet_mean_commuting_is_geometric_mean() {
        let manifold = SpdManifold::new(2);
        let a = spd(2, &[1.0, 0.0, 0.0, 4.0]);
        let b = spd(2, &[4.0, 0.0, 0.0, 1.0]);
        let result = manifold.frechet_mean_detailed(&[a, b], 64, 1e-10).unwrap();
        assert!(result.converged);
        let m = result.mean.as_matrix();
        assert_relative_eq!(m[(0, 0)], 2.0, epsilon = 1e-8);
        assert_relative_eq!(m[(1, 1)], 2.0, epsilon = 1e-8);
        assert_relative_eq!(m[(0, 1)], 0.0, epsilon = 1e-8);
    }

    #[test]
    fn test_frechet_mean_iteration_cap_is_best_effort() {
        let manifold = SpdManifold::new(2);
        let result = manifold
            .frechet_mean_detailed(&sample_set(), 1, 1e-300)
            .unwrap();
        assert_eq!(result.iterations, 1);
        assert!(!result.converged);
    }

    #[test]
    fn test_frechet_mean_empty_is_insufficient() {
        let manifold = SpdManifold::new(2);
        let err = manifold.frechet_mean(&[], 64, 1e-8).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_path_length_and_velocity() {
        let manifold = SpdManifold::new(3);
        let a = SpdMatrix::identity(3);
        let b = SpdMatrix::scaled_identity(3, 2.0).unwrap();
        let c = SpdMatrix::scaled_identity(3, 4.0).unwrap();

        let same = vec![a.clone(); 5];
        assert_relative_eq!(manifold.path_length(&same).unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(manifold.average_velocity(&same).unwrap(), 0.0, epsilon = 1e-12);

        assert_eq!(manifold.path_length(&[a.clone()]).unwrap(), 0.0);
        assert_eq!(manifold.average_velocity(&[]).unwrap(), 0.0);

        let step = 3f64.sqrt() * 2f64.ln();
        let seq = vec![a, b, c];
        assert_relative_eq!(manifold.path_length(&seq).unwrap(), 2.0 * step, epsilon = 1e-10);
        assert_relative_eq!(manifold.average_velocity(&seq).unwrap(), step, epsilon = 1e-10);
    }

    #[test]
    fn test_frechet_variance() {
        let manifold = SpdManifold::new(2);
        assert_eq!(manifold.frechet_variance(&[]).unwrap(), 0.0);
        let set = sample_set();
        assert_relative_eq!(
            manifold.frechet_variance(&set[..1]).unwrap(),
            0.0,
            epsilon = 1e-12
        );

        // I and 4I have mean 2I, each at distance sqrt(2)·ln 2
        let pair = vec![
            SpdMatrix::identity(2),
            SpdMatrix::scaled_identity(2, 4.0).unwrap(),
        ];
        let expected = 2.0 * 2f64.ln().powi(2);
        assert_relative_eq!(manifold.frechet_variance(&pair).unwrap(), expected, epsilon = 1e-8);
    }

    #[test]
    fn test_pairwise_distance_matrix() {
        let manifold = SpdManifold::new(2);
        let set = sample_set();
        let d = manifold.pairwise_distance_matrix(&set).unwrap();
        assert_eq!(d.shape(), (3, 3));
        for i in 0..3 {
            assert_eq!(d[(i, i)], 0.0);
            for j in 0..3 {
                assert_eq!(d[(i, j)], d[(j, i)]);
            }
        }
        assert_relative_eq!(
            d[(0, 2)],
            manifold.distance(&set[0], &set[2]).unwrap(),
            epsilon = 1e-12
        );
        assert_eq!(manifold.pairwise_distance_matrix(&[]).unwrap().shape(), (0, 0));
    }

    #[test]
    fn test_spd_from_features() {
        let features = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        let spd = spd_from_features(&features, 1e-6).unwrap();
        assert_relative_eq!(spd.as_matrix()[(0, 0)], 1.0 + 1e-6, epsilon = 1e-12);
        assert_relative_eq!(spd.as_matrix()[(1, 0)], 2.0, epsilon = 1e-12);

        // perfectly collinear channels are rank-deficient but still SPD
        let manifold = SpdManifold::new(2);
        assert!(manifold.distance(&spd, &SpdMatrix::identity(2)).unwrap().is_finite());

        let raw = spd.into_inner();
        assert_relative_eq!(raw[(1, 1)], 4.0 + 1e-6, epsilon = 1e-12);
    }

    #[test]
    fn test_spd_sequence_shape() {
        let features = DMatrix::from_fn(101, 4, |i, j| ((i * (j + 1)) as f64 * 0.1).sin());
        let seq = spd_sequence(&features, 11, 1e-6).unwrap();
        assert_eq!(seq.len(), 101);
        assert!(seq.iter().all(|m| m.dim() == 4));

        let single = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        assert!(spd_sequence(&single, 11, 1e-6)
            .unwrap_err()
            .is_insufficient_data());
    }
}
