//! Geometric properties of the SPD manifold engine.
//!
//! These tests exercise the public manifold surface on deterministic
//! matrices and check the identities the affine-invariant metric must obey.

use approx::assert_relative_eq;
use gait_geometry::spd::{spd_from_features, spd_sequence, SpdManifold, SpdMatrix};
use gait_geometry::GaitError;
use nalgebra::DMatrix;

// =============================================================================
// MATRIX GENERATORS
// =============================================================================

/// Deterministic well-conditioned SPD matrix: `B·Bᵀ + I`.
fn generate_spd(dim: usize, seed: f64) -> SpdMatrix {
    let b = DMatrix::from_fn(dim, dim, |r, c| (seed + 1.3 * r as f64 + 0.7 * c as f64).sin());
    SpdMatrix::new(&b * b.transpose() + DMatrix::identity(dim, dim)).unwrap()
}

/// Feature matrix of a noisy periodic gait-like signal.
fn generate_features(n: usize, dim: usize, phase: f64) -> DMatrix<f64> {
    DMatrix::from_fn(n, dim, |r, c| {
        let t = r as f64 / (n - 1) as f64;
        (2.0 * std::f64::consts::PI * t + phase + c as f64).sin() * (1.0 + 0.3 * c as f64)
            + 0.05 * (17.0 * t * (c as f64 + 1.0)).cos()
    })
}

// =============================================================================
// DISTANCE
// =============================================================================

#[test]
fn test_distance_is_a_symmetric_non_negative_function() {
    let manifold = SpdManifold::new(4);
    let matrices: Vec<SpdMatrix> = (0..5).map(|k| generate_spd(4, k as f64)).collect();

    for a in &matrices {
        assert_relative_eq!(manifold.distance(a, a).unwrap(), 0.0, epsilon = 1e-9);
        for b in &matrices {
            let ab = manifold.distance(a, b).unwrap();
            let ba = manifold.distance(b, a).unwrap();
            assert!(ab >= 0.0);
            assert_eq!(ab.to_bits(), ba.to_bits(), "d(a, b) and d(b, a) differ");
        }
    }
}

#[test]
fn test_distance_between_scaled_identities() {
    for dim in [1, 2, 5, 8] {
        let manifold = SpdManifold::new(dim);
        let d = manifold
            .distance(
                &SpdMatrix::identity(dim),
                &SpdMatrix::scaled_identity(dim, 2.0).unwrap(),
            )
            .unwrap();
        assert_relative_eq!(d, (dim as f64).sqrt() * 2f64.ln(), epsilon = 1e-12);
    }
}

#[test]
fn test_triangle_inequality() {
    let manifold = SpdManifold::new(3);
    let a = generate_spd(3, 0.1);
    let b = generate_spd(3, 1.7);
    let c = generate_spd(3, 4.2);
    let ab = manifold.distance(&a, &b).unwrap();
    let bc = manifold.distance(&b, &c).unwrap();
    let ac = manifold.distance(&a, &c).unwrap();
    assert!(ac <= ab + bc + 1e-9);
}

#[test]
fn test_dimension_mismatch_is_numerical() {
    let manifold = SpdManifold::new(3);
    let err = manifold
        .distance(&SpdMatrix::identity(3), &SpdMatrix::identity(2))
        .unwrap_err();
    assert!(matches!(err, GaitError::DimensionMismatch { .. }));
    assert!(err.is_numerical());
}

// =============================================================================
// LOG / EXP
// =============================================================================

#[test]
fn test_exp_inverts_log() {
    let manifold = SpdManifold::new(4);
    let base = generate_spd(4, 0.3);
    let point = generate_spd(4, 2.9);
    let tangent = manifold.log_map(&base, &point).unwrap();
    let back = manifold.exp_map(&base, &tangent).unwrap();
    for (x, y) in back.as_matrix().iter().zip(point.as_matrix().iter()) {
        assert_relative_eq!(*x, *y, epsilon = 1e-8, max_relative = 1e-8);
    }
}

#[test]
fn test_geodesic_midpoint_halves_distance() {
    let manifold = SpdManifold::new(3);
    let a = generate_spd(3, 0.5);
    let b = generate_spd(3, 3.5);
    let half = manifold.log_map(&a, &b).unwrap() * 0.5;
    let mid = manifold.exp_map(&a, &half).unwrap();
    let total = manifold.distance(&a, &b).unwrap();
    assert_relative_eq!(manifold.distance(&a, &mid).unwrap(), total / 2.0, epsilon = 1e-8);
    assert_relative_eq!(manifold.distance(&mid, &b).unwrap(), total / 2.0, epsilon = 1e-8);
}

// =============================================================================
// FRÉCHET MEAN AND VARIANCE
// =============================================================================

#[test]
fn test_mean_of_one_is_that_matrix() {
    let manifold = SpdManifold::new(4);
    let a = generate_spd(4, 1.1);
    let mean = manifold
        .frechet_mean(std::slice::from_ref(&a), 64, 1e-8)
        .unwrap();
    assert_eq!(mean, a);
}

#[test]
fn test_mean_of_commuting_pair_is_geometric_mean() {
    let manifold = SpdManifold::new(3);
    let matrices = [
        SpdMatrix::identity(3),
        SpdMatrix::scaled_identity(3, 4.0).unwrap(),
    ];
    let result = manifold
        .frechet_mean_detailed(&matrices, 64, 1e-10)
        .unwrap();
    assert!(result.converged);
    for (x, y) in result
        .mean
        .as_matrix()
        .iter()
        .zip(DMatrix::<f64>::identity(3, 3).scale(2.0).iter())
    {
        assert_relative_eq!(*x, *y, epsilon = 1e-8);
    }
}

#[test]
fn test_mean_balances_tangent_vectors() {
    let manifold = SpdManifold::new(3);
    let matrices: Vec<SpdMatrix> = (0..6).map(|k| generate_spd(3, k as f64 * 0.9)).collect();
    let mean = manifold.frechet_mean(&matrices, 200, 1e-12).unwrap();
    let mut sum = DMatrix::<f64>::zeros(3, 3);
    for m in &matrices {
        sum += manifold.log_map(&mean, m).unwrap();
    }
    assert!(sum.norm() < 1e-6, "tangent sum norm {}", sum.norm());
}

#[test]
fn test_empty_mean_is_insufficient_data() {
    let manifold = SpdManifold::new(2);
    let err = manifold.frechet_mean(&[], 64, 1e-8).unwrap_err();
    assert!(err.is_insufficient_data());
}

#[test]
fn test_variance_trivial_cases() {
    let manifold = SpdManifold::new(3);
    assert_relative_eq!(manifold.frechet_variance(&[]).unwrap(), 0.0);
    assert_relative_eq!(
        manifold.frechet_variance(&[generate_spd(3, 0.4)]).unwrap(),
        0.0
    );
    let spread = [generate_spd(3, 0.4), generate_spd(3, 2.4)];
    assert!(manifold.frechet_variance(&spread).unwrap() > 0.0);
}

// =============================================================================
// PAIRWISE DISTANCES AND SEQUENCES
// =============================================================================

#[test]
fn test_pairwise_matrix_is_symmetric_with_zero_diagonal() {
    let manifold = SpdManifold::new(3);
    let matrices: Vec<SpdMatrix> = (0..4).map(|k| generate_spd(3, k as f64)).collect();
    let d = manifold.pairwise_distance_matrix(&matrices).unwrap();
    assert_eq!(d.shape(), (4, 4));
    for i in 0..4 {
        assert_relative_eq!(d[(i, i)], 0.0);
        for j in 0..4 {
            assert_relative_eq!(d[(i, j)], d[(j, i)]);
            assert_relative_eq!(
                d[(i, j)],
                manifold.distance(&matrices[i], &matrices[j]).unwrap(),
                epsilon = 1e-9
            );
        }
    }
}

#[test]
fn test_constant_sequence_has_zero_length() {
    let manifold = SpdManifold::new(3);
    let a = generate_spd(3, 0.8);
    let sequence = vec![a.clone(), a.clone(), a];
    assert_relative_eq!(manifold.path_length(&sequence).unwrap(), 0.0, epsilon = 1e-9);
    assert_relative_eq!(manifold.average_velocity(&sequence).unwrap(), 0.0, epsilon = 1e-9);
}

#[test]
fn test_feature_sequence_measures() {
    let features = generate_features(101, 4, 0.0);
    let manifold = SpdManifold::new(4);
    let sequence = spd_sequence(&features, 11, 1e-6).unwrap();
    assert_eq!(sequence.len(), 101);

    let length = manifold.path_length(&sequence).unwrap();
    let velocity = manifold.average_velocity(&sequence).unwrap();
    assert!(length > 0.0);
    assert_relative_eq!(velocity, length / 100.0, epsilon = 1e-12);
}

#[test]
fn test_scaled_features_move_covariance_along_identity_ray() {
    let manifold = SpdManifold::new(3);
    let features = generate_features(101, 3, 0.0);
    let a = spd_from_features(&features, 1e-6).unwrap();
    let b = spd_from_features(&features, 1e-6).unwrap();
    let c = spd_from_features(&(&features * 2.0), 1e-6).unwrap();
    assert_relative_eq!(manifold.distance(&a, &b).unwrap(), 0.0, epsilon = 1e-9);
    // doubling the features quadruples the covariance up to regularization
    assert_relative_eq!(
        manifold.distance(&a, &c).unwrap(),
        3f64.sqrt() * 4f64.ln(),
        epsilon = 1e-2
    );
}
