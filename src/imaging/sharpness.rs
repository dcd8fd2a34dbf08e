//! Focus measure: variance of the Laplacian.
//!
//! Blurry frames have few strong edges, so the Laplacian response is flat and
//! its variance small. Sharp frames score high.

use anyhow::Result;
use opencv::core::{self, Mat};
use opencv::imgproc;
use opencv::prelude::*;

/// Variance of the Laplacian of a grayscale image (64-bit response).
pub fn laplacian_variance(gray: &Mat) -> Result<f64> {
    let mut laplacian = Mat::default();
    imgproc::laplacian_def(gray, &mut laplacian, core::CV_64F)?;

    let mut mean = Mat::default();
    let mut stddev = Mat::default();
    core::mean_std_dev(&laplacian, &mut mean, &mut stddev, &Mat::default())?;
    let sigma = *stddev.at::<f64>(0)?;
    Ok(sigma * sigma)
}
