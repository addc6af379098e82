//! Gait-cycle segmentation.
//!
//! Steps are found as peaks of the inverted vertical trajectory of a foot
//! joint, so stance events (lowest ankle in image coordinates) appear as
//! maxima. Peaks closer than the minimum step duration are suppressed,
//! consecutive events delimit spans, and each span is resampled to a fixed
//! number of phase points.
//!
//! # Example
//!
//! ```
//! use gait_geometry::segmentation::find_peaks;
//!
//! let signal = [0.0, 1.0, 0.0, 0.5, 0.0, 2.0, 2.0, 0.0];
//! assert_eq!(find_peaks(&signal, 1), vec![1, 3, 5]);
//! assert_eq!(find_peaks(&signal, 3), vec![1, 5]);
//! ```

use std::collections::BTreeMap;

use log::debug;
use nalgebra::DMatrix;

use crate::config::GaitConfig;
use crate::error::{GaitError, Result};
use crate::math::interp::resample_phase;
use crate::pose::{CoordinateSpace, Side, Trial};

/// One phase-normalized gait cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Side the cycle was detected on.
    pub side: Side,
    /// First frame index of the span.
    pub start: usize,
    /// One past the last frame index of the span.
    pub end: usize,
    /// Joint name to `(phase_points × axes)` trajectory.
    pub resampled: BTreeMap<String, DMatrix<f64>>,
}

impl Step {
    /// Resampled trajectory of `joint`.
    #[must_use]
    pub fn trajectory(&self, joint: &str) -> Option<&DMatrix<f64>> {
        self.resampled.get(joint)
    }

    /// Number of phase samples (0 if no joint was resampled).
    #[must_use]
    pub fn phase_points(&self) -> usize {
        self.resampled.values().next().map_or(0, DMatrix::nrows)
    }

    /// Span length in frames.
    #[must_use]
    pub const fn frame_count(&self) -> usize {
        self.end - self.start
    }
}

/// Sampling rate in Hz from mean frame spacing, or `fallback` when the
/// timestamps cannot provide one.
#[must_use]
pub fn estimate_sampling_rate(trial: &Trial, fallback: f64) -> f64 {
    let ts = trial.timestamps();
    if ts.len() < 2 {
        return fallback;
    }
    let mean_dt = (ts[ts.len() - 1] - ts[0]) / (ts.len() - 1) as f64;
    if mean_dt.is_finite() && mean_dt > 0.0 {
        1.0 / mean_dt
    } else {
        fallback
    }
}

/// Local maxima of `signal` separated by at least `distance` samples.
///
/// Flat peaks report their middle sample (rounded down). When two peaks are
/// closer than `distance`, the higher one is kept; among equal heights the
/// later one wins. Output is sorted by index.
#[must_use]
pub fn find_peaks(signal: &[f64], distance: usize) -> Vec<usize> {
    let peaks = local_maxima(signal);
    if distance <= 1 || peaks.len() < 2 {
        return peaks;
    }

    let mut priority: Vec<usize> = (0..peaks.len()).collect();
    priority.sort_by(|&a, &b| {
        signal[peaks[a]]
            .total_cmp(&signal[peaks[b]])
            .then(a.cmp(&b))
    });

    let mut keep = vec![true; peaks.len()];
    for &i in priority.iter().rev() {
        if !keep[i] {
            continue;
        }
        let mut j = i;
        while j > 0 && peaks[i] - peaks[j - 1] < distance {
            j -= 1;
            keep[j] = false;
        }
        let mut j = i + 1;
        while j < peaks.len() && peaks[j] - peaks[i] < distance {
            keep[j] = false;
            j += 1;
        }
    }

    peaks
        .into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect()
}

fn local_maxima(signal: &[f64]) -> Vec<usize> {
    let n = signal.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }
    let mut i = 1;
    while i < n - 1 {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Peak-based step detector for one side.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDetector {
    sampling_rate: f64,
    side: Side,
    min_step_seconds: f64,
}

impl StepDetector {
    /// Create a detector.
    #[must_use]
    pub const fn new(sampling_rate: f64, side: Side, min_step_seconds: f64) -> Self {
        Self {
            sampling_rate,
            side,
            min_step_seconds,
        }
    }

    /// Create a detector from the pipeline configuration.
    #[must_use]
    pub const fn from_config(config: &GaitConfig, sampling_rate: f64) -> Self {
        Self::new(sampling_rate, config.side, config.min_step_seconds)
    }

    /// Minimum number of frames between two events.
    #[must_use]
    pub fn min_peak_distance(&self) -> usize {
        let frames = (self.min_step_seconds * self.sampling_rate).floor();
        if frames.is_finite() && frames >= 1.0 {
            frames as usize
        } else {
            1
        }
    }

    /// Inverted vertical coordinate of `joint` per frame.
    ///
    /// Frames missing the joint repeat the previous value; frames before the
    /// first observation take the first observed value.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::MissingJoint`] if no frame carries the joint.
    pub fn vertical_signal(
        &self,
        trial: &Trial,
        joint: &str,
        space: CoordinateSpace,
    ) -> Result<Vec<f64>> {
        let raw: Vec<Option<f64>> = trial
            .frames()
            .iter()
            .map(|f| f.position(joint, space).map(|p| -p[1]))
            .collect();
        let Some(first) = raw.iter().flatten().next().copied() else {
            return Err(GaitError::missing_joint(joint, trial.joint_names(space)));
        };
        let mut last = first;
        Ok(raw
            .into_iter()
            .map(|v| {
                if let Some(v) = v {
                    last = v;
                }
                last
            })
            .collect())
    }

    /// Frame indices of stance events.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::MissingJoint`] if no frame carries the joint.
    pub fn detect_events(
        &self,
        trial: &Trial,
        joint: &str,
        space: CoordinateSpace,
    ) -> Result<Vec<usize>> {
        let signal = self.vertical_signal(trial, joint, space)?;
        let events = find_peaks(&signal, self.min_peak_distance());
        debug!(
            "{} events on {joint} ({} side, min distance {} frames)",
            events.len(),
            self.side,
            self.min_peak_distance()
        );
        Ok(events)
    }

    /// Spans between consecutive events longer than `min_span_frames`.
    #[must_use]
    pub fn cut_steps(&self, events: &[usize], min_span_frames: usize) -> Vec<(usize, usize)> {
        events
            .windows(2)
            .filter(|pair| pair[1] > pair[0] && pair[1] - pair[0] > min_span_frames)
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }

    /// Resample every span to `n_points` phase samples per joint.
    ///
    /// Only frames that carry the joint contribute; a joint seen in fewer than
    /// two frames of a span is omitted from that step.
    #[must_use]
    pub fn resample_steps<S: AsRef<str>>(
        &self,
        trial: &Trial,
        spans: &[(usize, usize)],
        joints: &[S],
        n_points: usize,
        space: CoordinateSpace,
    ) -> Vec<Step> {
        let frames = trial.frames();
        spans
            .iter()
            .filter(|&&(start, end)| start < end && end <= frames.len())
            .map(|&(start, end)| {
                let span = &frames[start..end];
                let denom = (span.len().max(2) - 1) as f64;
                let mut resampled = BTreeMap::new();

                for joint in joints {
                    let joint = joint.as_ref();
                    let samples: Vec<(f64, &[f64])> = span
                        .iter()
                        .enumerate()
                        .filter_map(|(k, f)| f.position(joint, space).map(|p| (k as f64 / denom, p)))
                        .collect();
                    if samples.len() < 2 {
                        continue;
                    }
                    let phases: Vec<f64> = samples.iter().map(|(ph, _)| *ph).collect();
                    let dims = space.dims();
                    let mut trajectory = DMatrix::zeros(n_points, dims);
                    for axis in 0..dims {
                        let values: Vec<f64> = samples.iter().map(|(_, p)| p[axis]).collect();
                        let column = resample_phase(&phases, &values, n_points);
                        for (row, v) in column.into_iter().enumerate() {
                            trajectory[(row, axis)] = v;
                        }
                    }
                    resampled.insert(joint.to_string(), trajectory);
                }

                Step {
                    side: self.side,
                    start,
                    end,
                    resampled,
                }
            })
            .collect()
    }
}
