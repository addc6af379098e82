//! Downstream comparison of steps: low-dimensional embeddings and a binary
//! evaluator.
//!
//! The manifold engine only owes these collaborators a symmetric,
//! zero-diagonal distance matrix or a flat feature matrix. The traits mark
//! that seam; [`ClassicalMds`], [`pca_embed`] and [`LogisticEvaluator`] are
//! simple default implementations used for reporting.

use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::error::{GaitError, Result};
use crate::math::linalg::{sorted_symmetric_eigen, symmetrize};

/// Minimum number of samples an embedding needs.
pub const MIN_EMBEDDING_SAMPLES: usize = 3;

/// Embeds samples given only their pairwise distances.
pub trait DistanceEmbedder {
    /// Return an `(n × dims)` coordinate matrix for an `(n × n)` distance matrix.
    ///
    /// # Errors
    ///
    /// Implementations fail for too few samples or malformed input.
    fn embed(&self, distances: &DMatrix<f64>, dims: usize) -> Result<DMatrix<f64>>;
}

/// Scores how well features separate two classes.
pub trait BinaryEvaluator {
    /// Evaluate `features` (one row per sample) against `labels`.
    ///
    /// # Errors
    ///
    /// Implementations fail for too few samples per class or mismatched sizes.
    fn evaluate(&self, features: &DMatrix<f64>, labels: &[bool]) -> Result<EvaluationScore>;
}

/// Classical (Torgerson) multidimensional scaling.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicalMds;

impl DistanceEmbedder for ClassicalMds {
    fn embed(&self, distances: &DMatrix<f64>, dims: usize) -> Result<DMatrix<f64>> {
        if !distances.is_square() {
            return Err(GaitError::dimension_mismatch(
                distances.nrows(),
                distances.ncols(),
            ));
        }
        let n = distances.nrows();
        if n < MIN_EMBEDDING_SAMPLES {
            return Err(GaitError::insufficient_data(
                "embedding samples",
                MIN_EMBEDDING_SAMPLES,
                n,
            ));
        }
        // B = -½ · J · D² · J with J the centering matrix
        let squared = symmetrize(distances).map(|d| d * d);
        let centering = DMatrix::identity(n, n) - DMatrix::from_element(n, n, 1.0 / n as f64);
        let gram = &centering * squared * &centering * -0.5;
        Ok(project_gram(&gram, dims))
    }
}

/// PCA scores of the rows of `features` on their top `dims` components.
///
/// # Errors
///
/// Returns [`GaitError::InsufficientData`] for fewer than three rows.
pub fn pca_embed(features: &DMatrix<f64>, dims: usize) -> Result<DMatrix<f64>> {
    let n = features.nrows();
    if n < MIN_EMBEDDING_SAMPLES {
        return Err(GaitError::insufficient_data(
            "embedding samples",
            MIN_EMBEDDING_SAMPLES,
            n,
        ));
    }
    let mut centered = features.clone();
    for mut column in centered.column_iter_mut() {
        let mean = column.mean();
        column.add_scalar_mut(-mean);
    }
    let gram = &centered * centered.transpose();
    Ok(project_gram(&gram, dims))
}

/// Coordinates `v_k · sqrt(λ_k)` from the top eigenpairs of a Gram matrix.
///
/// Each axis is oriented so that its largest-magnitude entry is positive.
fn project_gram(gram: &DMatrix<f64>, dims: usize) -> DMatrix<f64> {
    let n = gram.nrows();
    let k = dims.min(n);
    let eigen = sorted_symmetric_eigen(gram);
    let mut coords = DMatrix::zeros(n, k);
    for c in 0..k {
        let scale = eigen.eigenvalues[c].max(0.0).sqrt();
        let mut axis = eigen.axis(c);
        let dominant = axis.iter().copied().fold(0.0f64, |best, v| {
            if v.abs() > best.abs() {
                v
            } else {
                best
            }
        });
        if dominant < 0.0 {
            axis.neg_mut();
        }
        coords.set_column(c, &(axis * scale));
    }
    coords
}

/// Cross-validated separability score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationScore {
    /// Mean ROC AUC over folds.
    pub auc: f64,
    /// Mean accuracy at threshold 0.5 over folds.
    pub accuracy: f64,
    /// Number of folds evaluated.
    pub folds: usize,
}

/// L2-regularized logistic regression with stratified k-fold evaluation.
///
/// Fold assignment is deterministic: the i-th sample of each class goes to
/// fold `i % folds`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticEvaluator {
    /// Number of folds.
    pub folds: usize,
    /// Gradient-descent iterations per fold.
    pub max_iterations: usize,
    /// Gradient-descent step size.
    pub learning_rate: f64,
    /// L2 penalty strength.
    pub l2: f64,
}

impl Default for LogisticEvaluator {
    fn default() -> Self {
        Self {
            folds: 5,
            max_iterations: 1000,
            learning_rate: 0.1,
            l2: 1.0,
        }
    }
}

impl LogisticEvaluator {
    /// Set the number of folds.
    #[must_use]
    pub const fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    fn fold_assignment(&self, labels: &[bool]) -> Vec<usize> {
        let mut seen = [0usize; 2];
        labels
            .iter()
            .map(|&label| {
                let class = usize::from(label);
                let fold = seen[class] % self.folds;
                seen[class] += 1;
                fold
            })
            .collect()
    }

    /// Fit weights (last entry is the bias) on standardized rows.
    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> DVector<f64> {
        let n = x.nrows() as f64;
        let d = x.ncols();
        let mut weights = DVector::zeros(d + 1);
        for _ in 0..self.max_iterations {
            let residual = DVector::from_fn(x.nrows(), |i, _| {
                sigmoid(x.row(i).transpose().dot(&weights.rows(0, d)) + weights[d]) - y[i]
            });
            let mut gradient = DVector::zeros(d + 1);
            gradient
                .rows_mut(0, d)
                .copy_from(&((x.transpose() * &residual) / n + weights.rows(0, d) * (self.l2 / n)));
            gradient[d] = residual.sum() / n;
            weights -= gradient * self.learning_rate;
        }
        weights
    }
}

impl BinaryEvaluator for LogisticEvaluator {
    fn evaluate(&self, features: &DMatrix<f64>, labels: &[bool]) -> Result<EvaluationScore> {
        if features.nrows() != labels.len() {
            return Err(GaitError::dimension_mismatch(labels.len(), features.nrows()));
        }
        if self.folds < 2 {
            return Err(GaitError::invalid_config("folds must be at least 2"));
        }
        let positives = labels.iter().filter(|&&l| l).count();
        let negatives = labels.len() - positives;
        let smallest = positives.min(negatives);
        if smallest < self.folds {
            return Err(GaitError::insufficient_data(
                "samples per class",
                self.folds,
                smallest,
            ));
        }

        let assignment = self.fold_assignment(labels);
        let mut auc_sum = 0.0;
        let mut acc_sum = 0.0;
        for fold in 0..self.folds {
            let train: Vec<usize> = (0..labels.len()).filter(|&i| assignment[i] != fold).collect();
            let test: Vec<usize> = (0..labels.len()).filter(|&i| assignment[i] == fold).collect();

            let (x_train, means, scales) = standardize(&features.select_rows(&train));
            let y_train = DVector::from_iterator(
                train.len(),
                train.iter().map(|&i| if labels[i] { 1.0 } else { 0.0 }),
            );
            let weights = self.fit(&x_train, &y_train);
            let d = features.ncols();

            let probabilities: Vec<f64> = test
                .iter()
                .map(|&i| {
                    let z: f64 = (0..d)
                        .map(|c| (features[(i, c)] - means[c]) / scales[c] * weights[c])
                        .sum::<f64>()
                        + weights[d];
                    sigmoid(z)
                })
                .collect();
            let truth: Vec<bool> = test.iter().map(|&i| labels[i]).collect();

            let fold_auc = roc_auc(&probabilities, &truth);
            let fold_acc = probabilities
                .iter()
                .zip(&truth)
                .filter(|(&p, &t)| (p > 0.5) == t)
                .count() as f64
                / truth.len() as f64;
            debug!("fold {fold}: auc {fold_auc:.3}, accuracy {fold_acc:.3}");
            auc_sum += fold_auc;
            acc_sum += fold_acc;
        }

        Ok(EvaluationScore {
            auc: auc_sum / self.folds as f64,
            accuracy: acc_sum / self.folds as f64,
            folds: self.folds,
        })
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Column-standardize; constant columns keep unit scale.
fn standardize(x: &DMatrix<f64>) -> (DMatrix<f64>, Vec<f64>, Vec<f64>) {
    let mut out = x.clone();
    let mut means = Vec::with_capacity(x.ncols());
    let mut scales = Vec::with_capacity(x.ncols());
    for mut column in out.column_iter_mut() {
        let mean = column.mean();
        let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / column.len() as f64;
        let scale = if var > 1e-12 { var.sqrt() } else { 1.0 };
        column.apply(|v| *v = (*v - mean) / scale);
        means.push(mean);
        scales.push(scale);
    }
    (out, means, scales)
}

/// ROC AUC via the Mann-Whitney statistic; ties count one half.
///
/// Returns 0.5 when either class is absent.
#[must_use]
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> f64 {
    let positives: Vec<f64> = scores
        .iter()
        .zip(labels)
        .filter_map(|(&s, &l)| l.then_some(s))
        .collect();
    let negatives: Vec<f64> = scores
        .iter()
        .zip(labels)
        .filter_map(|(&s, &l)| (!l).then_some(s))
        .collect();
    if positives.is_empty() || negatives.is_empty() {
        return 0.5;
    }
    let mut wins = 0.0;
    for p in &positives {
        for n in &negatives {
            if p > n {
                wins += 1.0;
            } else if p == n {
                wins += 0.5;
            }
        }
    }
    wins / (positives.len() * negatives.len()) as f64
}
