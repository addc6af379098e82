//! Trajectory preprocessing: pelvis centering, leg-length scaling, and
//! temporal smoothing.
//!
//! Every stage takes the [`Trial`] by value and hands it back, so a trial is
//! only ever mutated by the stage that currently owns it.

use std::collections::BTreeMap;

use log::debug;

use crate::math::vector::{distance, div, mean, median, midpoint, sub};
use crate::pose::{CoordinateSpace, Side, Trial};

const LEFT_HIP: &str = "left_hip";
const RIGHT_HIP: &str = "right_hip";

/// Per-frame keypoint arithmetic on one coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preprocessor {
    space: CoordinateSpace,
}

impl Preprocessor {
    /// Create a preprocessor for `space`.
    #[must_use]
    pub const fn new(space: CoordinateSpace) -> Self {
        Self { space }
    }

    /// Coordinate space this preprocessor reads and writes.
    #[must_use]
    pub const fn space(&self) -> CoordinateSpace {
        self.space
    }

    /// Translate every frame so the left/right hip midpoint is the origin.
    ///
    /// Frames lacking either hip are left unchanged.
    #[must_use]
    pub fn center_on_pelvis(&self, mut trial: Trial) -> Trial {
        let mut skipped = 0usize;
        for frame in trial.frames_mut() {
            let centered = match self.space {
                CoordinateSpace::Image2D => center_map(&mut frame.keypoints_2d),
                CoordinateSpace::World3D => frame
                    .keypoints_3d
                    .as_mut()
                    .is_some_and(|m| center_map(m)),
            };
            if !centered {
                skipped += 1;
            }
        }
        if skipped > 0 {
            debug!("pelvis centering skipped {skipped} frames without both hips");
        }
        trial
    }

    /// Median hip-to-ankle distance over frames carrying both joints of `side`.
    #[must_use]
    pub fn leg_length(&self, trial: &Trial, side: Side) -> Option<f64> {
        let hip = format!("{}_hip", side.prefix());
        let ankle = format!("{}_ankle", side.prefix());
        let lengths: Vec<f64> = trial
            .frames()
            .iter()
            .filter_map(|f| {
                let h = f.position(&hip, self.space)?;
                let a = f.position(&ankle, self.space)?;
                Some(distance(h, a))
            })
            .collect();
        median(&lengths)
    }

    /// Divide every coordinate by `leg_length`.
    ///
    /// A non-finite or non-positive length leaves the trial untouched.
    #[must_use]
    pub fn scale_by_leg(&self, mut trial: Trial, leg_length: f64) -> Trial {
        if !leg_length.is_finite() || leg_length <= 0.0 {
            debug!("leg length {leg_length} unusable, skipping scaling");
            return trial;
        }
        for frame in trial.frames_mut() {
            match self.space {
                CoordinateSpace::Image2D => scale_map(&mut frame.keypoints_2d, leg_length),
                CoordinateSpace::World3D => {
                    if let Some(m) = frame.keypoints_3d.as_mut() {
                        scale_map(m, leg_length);
                    }
                }
            }
        }
        trial
    }

    /// Centered moving average with half-width `max(1, window / 2)`.
    ///
    /// Applied to the 2D map and, where present, the 3D map. Each output is
    /// the mean of the unsmoothed neighbours that carry the joint.
    #[must_use]
    pub fn smooth(&self, mut trial: Trial, window: usize) -> Trial {
        let half = (window / 2).max(1);

        let maps_2d: Vec<BTreeMap<String, [f64; 2]>> = trial
            .frames()
            .iter()
            .map(|f| f.keypoints_2d.clone())
            .collect();
        let maps_3d: Vec<BTreeMap<String, [f64; 3]>> = trial
            .frames()
            .iter()
            .map(|f| f.keypoints_3d.clone().unwrap_or_default())
            .collect();

        let smoothed_2d = smooth_maps(&maps_2d, half);
        let smoothed_3d = smooth_maps(&maps_3d, half);

        for (i, frame) in trial.frames_mut().iter_mut().enumerate() {
            frame.keypoints_2d = smoothed_2d[i].clone();
            if frame.keypoints_3d.is_some() {
                frame.keypoints_3d = Some(smoothed_3d[i].clone());
            }
        }
        trial
    }
}

fn center_map<const N: usize>(map: &mut BTreeMap<String, [f64; N]>) -> bool {
    let (Some(left), Some(right)) = (map.get(LEFT_HIP), map.get(RIGHT_HIP)) else {
        return false;
    };
    let pelvis = midpoint(left, right);
    for p in map.values_mut() {
        *p = sub(p, &pelvis);
    }
    true
}

fn scale_map<const N: usize>(map: &mut BTreeMap<String, [f64; N]>, factor: f64) {
    for p in map.values_mut() {
        *p = div(p, factor);
    }
}

fn smooth_maps<const N: usize>(
    maps: &[BTreeMap<String, [f64; N]>],
    half: usize,
) -> Vec<BTreeMap<String, [f64; N]>> {
    let n = maps.len();
    (0..n)
        .map(|i| {
            let neighbours = &maps[i.saturating_sub(half)..(i + half + 1).min(n)];
            maps[i]
                .keys()
                .filter_map(|name| {
                    let samples: Vec<[f64; N]> = neighbours
                        .iter()
                        .filter_map(|m| m.get(name).copied())
                        .collect();
                    mean(&samples).map(|p| (name.clone(), p))
                })
                .collect()
        })
        .collect()
}
