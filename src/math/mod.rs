//! Mathematical utilities for gait geometry.
//!
//! This module provides:
//! - [`linalg`]: covariance, sorted eigendecomposition, SPD matrix functions
//! - [`interp`]: phase resampling and smoothed derivatives
//! - [`vector`]: fixed-size keypoint arithmetic

pub mod interp;
pub mod linalg;
pub mod vector;

pub use interp::{interp, linspace, resample_phase, smoothed_derivative};
pub use linalg::{covariance, sorted_symmetric_eigen, spd_function, symmetric_exp, SortedEigen};
