//! Fixed-size coordinate helpers shared by 2D and 3D keypoints.

/// Componentwise midpoint.
#[must_use]
pub fn midpoint<const N: usize>(a: &[f64; N], b: &[f64; N]) -> [f64; N] {
    std::array::from_fn(|i| (a[i] + b[i]) / 2.0)
}

/// `a - b`.
#[must_use]
pub fn sub<const N: usize>(a: &[f64; N], b: &[f64; N]) -> [f64; N] {
    std::array::from_fn(|i| a[i] - b[i])
}

/// `a / s`.
#[must_use]
pub fn div<const N: usize>(a: &[f64; N], s: f64) -> [f64; N] {
    std::array::from_fn(|i| a[i] / s)
}

/// Euclidean distance between two points of equal dimension.
#[must_use]
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Componentwise mean of a non-empty set of points.
#[must_use]
pub fn mean<const N: usize>(points: &[[f64; N]]) -> Option<[f64; N]> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    Some(std::array::from_fn(|i| {
        points.iter().map(|p| p[i]).sum::<f64>() / n
    }))
}

/// Median of a set of values, ignoring NaN.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}
