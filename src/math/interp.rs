//! One-dimensional signal utilities: linear interpolation on a uniform grid
//! and a smoothing first-derivative filter.

/// `n` evenly spaced samples over `[start, end]`, inclusive.
#[must_use]
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Piecewise-linear interpolation of `(xs, ys)` at each query point.
///
/// `xs` must be increasing. Queries outside the range clamp to the end values.
/// Returns an empty vector if `xs` is empty or the lengths differ.
#[must_use]
pub fn interp(queries: &[f64], xs: &[f64], ys: &[f64]) -> Vec<f64> {
    if xs.is_empty() || xs.len() != ys.len() {
        return Vec::new();
    }
    let last = xs.len() - 1;
    queries
        .iter()
        .map(|&q| {
            if q <= xs[0] {
                return ys[0];
            }
            if q >= xs[last] {
                return ys[last];
            }
            // first index with xs[i] > q
            let upper = xs.partition_point(|&x| x <= q);
            let lower = upper - 1;
            let span = xs[upper] - xs[lower];
            if span <= 0.0 {
                return ys[lower];
            }
            let t = (q - xs[lower]) / span;
            ys[lower] + t * (ys[upper] - ys[lower])
        })
        .collect()
}

/// Resample `values`, taken at normalized phases `phases` (0..1), onto
/// `n_points` evenly spaced phases.
#[must_use]
pub fn resample_phase(phases: &[f64], values: &[f64], n_points: usize) -> Vec<f64> {
    interp(&linspace(0.0, 1.0, n_points), phases, values)
}

/// First derivative per sample using a 5-point Savitzky-Golay filter
/// (quadratic fit, coefficients `[-2, -1, 0, 1, 2] / 10`).
///
/// The two samples at each end fall back to central or one-sided differences.
#[must_use]
pub fn smoothed_derivative(signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n)
        .map(|i| {
            if i >= 2 && i + 2 < n {
                (2.0 * (signal[i + 2] - signal[i - 2]) + (signal[i + 1] - signal[i - 1])) / 10.0
            } else if i == 0 {
                signal[1] - signal[0]
            } else if i == n - 1 {
                signal[n - 1] - signal[n - 2]
            } else {
                (signal[i + 1] - signal[i - 1]) / 2.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace_endpoints() {
        let xs = linspace(0.0, 1.0, 101);
        assert_eq!(xs.len(), 101);
        assert_relative_eq!(xs[0], 0.0);
        assert_relative_eq!(xs[50], 0.5, epsilon = 1e-12);
        assert_relative_eq!(xs[100], 1.0, epsilon = 1e-12);
        assert_eq!(linspace(0.0, 1.0, 1), vec![0.0]);
    }

    #[test]
    fn test_interp_linear_and_clamped() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, 10.0, 0.0];
        let out = interp(&[-1.0, 0.5, 1.0, 1.25, 3.0], &xs, &ys);
        assert_relative_eq!(out[0], 0.0);
        assert_relative_eq!(out[1], 5.0);
        assert_relative_eq!(out[2], 10.0);
        assert_relative_eq!(out[3], 7.5);
        assert_relative_eq!(out[4], 0.0);
    }

    #[test]
    fn test_resample_length_independent_of_input() {
        for len in [2, 7, 50, 333] {
            let phases = linspace(0.0, 1.0, len);
            let values: Vec<f64> = phases.iter().map(|p| p * 2.0).collect();
            let out = resample_phase(&phases, &values, 101);
            assert_eq!(out.len(), 101);
            assert_relative_eq!(out[100], 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_derivative_of_line_is_constant() {
        let signal: Vec<f64> = (0..20).map(|i| 3.0 * i as f64 + 1.0).collect();
        for d in smoothed_derivative(&signal) {
            assert_relative_eq!(d, 3.0, epsilon = 1e-12);
        }
    }
}
