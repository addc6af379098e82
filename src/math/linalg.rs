//! Linear algebra utilities for gait geometry.
//!
//! Covariance estimation, sorted symmetric eigendecomposition, and spectral
//! matrix functions (square root, inverse square root, logarithm, exponential)
//! built on nalgebra's [`SymmetricEigen`].

use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::error::{GaitError, Result};

/// Symmetric eigendecomposition with eigenvalues sorted in descending order.
#[derive(Debug, Clone)]
pub struct SortedEigen {
    /// Eigenvalues, largest first.
    pub eigenvalues: DVector<f64>,

    /// Eigenvectors as columns, in the same order as `eigenvalues`.
    pub eigenvectors: DMatrix<f64>,
}

impl SortedEigen {
    /// The i-th principal axis.
    #[must_use]
    pub fn axis(&self, i: usize) -> DVector<f64> {
        self.eigenvectors.column(i).into_owned()
    }
}

/// Eigendecomposition of a symmetric matrix, sorted descending.
#[must_use]
pub fn sorted_symmetric_eigen(matrix: &DMatrix<f64>) -> SortedEigen {
    let eigen = SymmetricEigen::new(symmetrize(matrix));

    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let eigenvalues =
        DVector::from_iterator(order.len(), order.iter().map(|&i| eigen.eigenvalues[i]));
    let columns: Vec<DVector<f64>> = order
        .iter()
        .map(|&i| eigen.eigenvectors.column(i).into_owned())
        .collect();
    let eigenvectors = if columns.is_empty() {
        DMatrix::zeros(matrix.nrows(), 0)
    } else {
        DMatrix::from_columns(&columns)
    };

    SortedEigen {
        eigenvalues,
        eigenvectors,
    }
}

/// `(M + Mᵀ) / 2`.
#[must_use]
pub fn symmetrize(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    (matrix + matrix.transpose()) * 0.5
}

/// Apply a scalar function to the eigenvalues of a symmetric positive-definite
/// matrix: `V · diag(f(λ)) · Vᵀ`.
///
/// # Errors
///
/// Returns [`GaitError::NotPositiveDefinite`] if any eigenvalue is not a
/// positive finite number, and [`GaitError::NumericalInstability`] if the
/// result contains NaN or Inf.
pub fn spd_function<F>(matrix: &DMatrix<f64>, f: F, context: &str) -> Result<DMatrix<f64>>
where
    F: Fn(f64) -> f64,
{
    let eigen = SymmetricEigen::new(symmetrize(matrix));
    if let Some(bad) = eigen
        .eigenvalues
        .iter()
        .find(|&&v| !v.is_finite() || v <= 0.0)
    {
        return Err(GaitError::not_positive_definite(format!(
            "{context}: eigenvalue {bad:e}"
        )));
    }
    let mapped = eigen.eigenvalues.map(f);
    let result = &eigen.eigenvectors
        * DMatrix::from_diagonal(&mapped)
        * eigen.eigenvectors.transpose();
    ensure_finite(&result, context)?;
    Ok(result)
}

/// Square root and inverse square root of an SPD matrix from a single
/// eigendecomposition.
///
/// # Errors
///
/// Same conditions as [`spd_function`].
pub fn spd_sqrt_pair(matrix: &DMatrix<f64>, context: &str) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
    let eigen = SymmetricEigen::new(symmetrize(matrix));
    if let Some(bad) = eigen
        .eigenvalues
        .iter()
        .find(|&&v| !v.is_finite() || v <= 0.0)
    {
        return Err(GaitError::not_positive_definite(format!(
            "{context}: eigenvalue {bad:e}"
        )));
    }
    let vectors = &eigen.eigenvectors;
    let sqrt = vectors
        * DMatrix::from_diagonal(&eigen.eigenvalues.map(f64::sqrt))
        * vectors.transpose();
    let inv_sqrt = vectors
        * DMatrix::from_diagonal(&eigen.eigenvalues.map(|v| 1.0 / v.sqrt()))
        * vectors.transpose();
    ensure_finite(&sqrt, context)?;
    ensure_finite(&inv_sqrt, context)?;
    Ok((sqrt, inv_sqrt))
}

/// Matrix exponential of a symmetric matrix (any real eigenvalues).
///
/// # Errors
///
/// Returns [`GaitError::NumericalInstability`] if the input or result is not finite.
pub fn symmetric_exp(matrix: &DMatrix<f64>, context: &str) -> Result<DMatrix<f64>> {
    ensure_finite(matrix, context)?;
    let eigen = SymmetricEigen::new(symmetrize(matrix));
    let mapped = eigen.eigenvalues.map(f64::exp);
    let result = &eigen.eigenvectors
        * DMatrix::from_diagonal(&mapped)
        * eigen.eigenvectors.transpose();
    ensure_finite(&result, context)?;
    Ok(result)
}

/// Eigenvalues of a symmetric matrix, unsorted.
#[must_use]
pub fn symmetric_eigenvalues(matrix: &DMatrix<f64>) -> DVector<f64> {
    SymmetricEigen::new(symmetrize(matrix)).eigenvalues
}

/// Fail with [`GaitError::NumericalInstability`] if any entry is NaN or Inf.
///
/// # Errors
///
/// See above.
pub fn ensure_finite(matrix: &DMatrix<f64>, context: &str) -> Result<()> {
    if matrix.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(GaitError::numerical_instability(format!(
            "{context}: non-finite matrix entry"
        )))
    }
}

/// Unbiased sample covariance of the rows of `samples` (`T × d` → `d × d`).
///
/// # Errors
///
/// Returns [`GaitError::InsufficientData`] for fewer than two rows.
pub fn covariance(samples: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = samples.nrows();
    if n < 2 {
        return Err(GaitError::insufficient_data("covariance rows", 2, n));
    }
    let mut centered = samples.clone();
    for mut column in centered.column_iter_mut() {
        let mean = column.mean();
        column.add_scalar_mut(-mean);
    }
    Ok(centered.transpose() * &centered / (n - 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sorted_eigen_descending() {
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 3.0]);
        let eig = sorted_symmetric_eigen(&m);
        assert_relative_eq!(eig.eigenvalues[0], 5.0, epsilon = 1e-12);
        assert_relative_eq!(eig.eigenvalues[1], 3.0, epsilon = 1e-12);
        assert_relative_eq!(eig.eigenvalues[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(eig.axis(0)[1].abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sqrt_squares_back() {
        let m = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let root = spd_function(&m, f64::sqrt, "sqrt").unwrap();
        let back = &root * &root;
        for (a, b) in back.iter().zip(m.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_log_exp_inverse() {
        let m = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let log = spd_function(&m, f64::ln, "log").unwrap();
        let back = symmetric_exp(&log, "exp").unwrap();
        for (a, b) in back.iter().zip(m.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_sqrt_pair_are_inverses() {
        let m = DMatrix::from_row_slice(2, 2, &[3.0, -1.0, -1.0, 2.0]);
        let (sqrt, inv_sqrt) = spd_sqrt_pair(&m, "pair").unwrap();
        let identity = &sqrt * &inv_sqrt;
        assert_relative_eq!(identity[(0, 0)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(identity[(0, 1)], 0.0, epsilon = 1e-10);
        assert_relative_eq!(identity[(1, 1)], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_non_positive_rejected() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]);
        let err = spd_function(&m, f64::ln, "log").unwrap_err();
        assert!(matches!(err, GaitError::NotPositiveDefinite { .. }));
    }

    #[test]
    fn test_covariance_matches_hand_computation() {
        // x = [1, 2, 3], y = [2, 4, 6]: var(x) = 1, var(y) = 4, cov = 2
        let samples = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        let cov = covariance(&samples).unwrap();
        assert_relative_eq!(cov[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(1, 1)], 4.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(0, 1)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(1, 0)], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_needs_two_rows() {
        let samples = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        assert!(covariance(&samples).unwrap_err().is_insufficient_data());
    }
}
