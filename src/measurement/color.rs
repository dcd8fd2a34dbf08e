//! Color-histogram measurement.
//!
//! Frames and heading images are summarized by an L1-normalized HSV
//! histogram. A heading's score is the (non-negative) correlation between the
//! query histogram and the heading image's histogram.

use std::path::Path;

use anyhow::Result;
use opencv::core::{Mat, Vector};
use opencv::imgproc;
use opencv::prelude::*;
use serde::{Deserialize, Serialize};

use super::index::LocationIndex;
use super::{MeasurementSource, evidence_from_scores, within_heading_window};
use crate::belief::{EvidenceReport, HeadingBin, LocationId};
use crate::error::MeasurementError;
use crate::imaging::{self, ImageSize};

/// Color matcher parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorMatcherConfig {
    /// Histogram bins for hue, saturation and value.
    pub bins: [i32; 3],
    /// Correlation a heading must reach to count as a match.
    pub match_threshold: f64,
    /// Half-width, in bins, of the heading window searched when a hint is given.
    pub heading_window: usize,
}

impl Default for ColorMatcherConfig {
    fn default() -> Self {
        Self {
            bins: [8, 12, 3],
            match_threshold: 0.5,
            heading_window: 3,
        }
    }
}

/// Color-histogram [`MeasurementSource`].
pub struct ColorMatcher {
    config: ColorMatcherConfig,
    index: LocationIndex<Vec<f32>>,
}

impl ColorMatcher {
    /// Build the histogram index for every location under `map_dir`.
    pub fn build(
        config: ColorMatcherConfig,
        map_dir: &Path,
        num_locations: usize,
        num_bins: usize,
        size: Option<ImageSize>,
    ) -> Result<Self> {
        let bins = config.bins;
        let index = LocationIndex::build(map_dir, num_locations, num_bins, |path| {
            let bgr = imaging::load_color(path, size)?;
            Ok(hsv_histogram(&bgr, bins)?)
        })?;
        Ok(Self { config, index })
    }

    pub fn from_index(config: ColorMatcherConfig, index: LocationIndex<Vec<f32>>) -> Self {
        Self { config, index }
    }

    /// Histogram of a BGR frame.
    pub fn prepare(&self, bgr: &Mat) -> Result<Vec<f32>, MeasurementError> {
        Ok(hsv_histogram(bgr, self.config.bins)?)
    }

    fn evaluate(
        &self,
        query: &[f32],
        location: LocationId,
        heading_hint: Option<HeadingBin>,
    ) -> Result<EvidenceReport, MeasurementError> {
        let headings = self.index.headings(location)?;
        let num_bins = headings.len();

        let scores: Vec<f64> = headings
            .iter()
            .enumerate()
            .map(|(bin, hist)| match heading_hint {
                Some(hint)
                    if !within_heading_window(bin, hint, self.config.heading_window, num_bins) =>
                {
                    0.0
                }
                _ => correlation(query, hist).max(0.0),
            })
            .collect();

        let matches = scores
            .iter()
            .filter(|s| **s >= self.config.match_threshold)
            .count() as u64;
        evidence_from_scores(matches, scores)
    }
}

impl MeasurementSource for ColorMatcher {
    type Query = Vec<f32>;

    fn num_locations(&self) -> usize {
        self.index.num_locations()
    }

    fn query(
        &self,
        query: &Self::Query,
        location: LocationId,
    ) -> Result<EvidenceReport, MeasurementError> {
        self.evaluate(query, location, None)
    }

    fn query_restricted(
        &self,
        query: &Self::Query,
        location: LocationId,
        heading_hint: Option<HeadingBin>,
    ) -> Result<EvidenceReport, MeasurementError> {
        self.evaluate(query, location, heading_hint)
    }
}

/// L1-normalized 3D HSV histogram of a BGR image, flattened.
pub fn hsv_histogram(bgr: &Mat, bins: [i32; 3]) -> opencv::Result<Vec<f32>> {
    let mut hsv = Mat::default();
    imgproc::cvt_color_def(bgr, &mut hsv, imgproc::COLOR_BGR2HSV)?;

    let mut images = Vector::<Mat>::new();
    images.push(hsv);
    let channels = Vector::<i32>::from_slice(&[0, 1, 2]);
    let hist_size = Vector::<i32>::from_slice(&bins);
    let ranges = Vector::<f32>::from_slice(&[0.0, 180.0, 0.0, 256.0, 0.0, 256.0]);

    let mut hist = Mat::default();
    imgproc::calc_hist(
        &images,
        &channels,
        &Mat::default(),
        &mut hist,
        &hist_size,
        &ranges,
        false,
    )?;

    let mut values = hist.data_typed::<f32>()?.to_vec();
    let total: f32 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
    Ok(values)
}

/// Pearson correlation between two histograms (OpenCV's HISTCMP_CORREL).
/// Returns 0 when either histogram is constant.
pub fn correlation(a: &[f32], b: &[f32]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a[..n].iter().map(|v| *v as f64).sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().map(|v| *v as f64).sum::<f64>() / n as f64;

    let (mut num, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a[..n].iter().zip(&b[..n]) {
        let dx = *x as f64 - mean_a;
        let dy = *y as f64 - mean_b;
        num += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    let denom = (var_a * var_b).sqrt();
    if denom <= f64::EPSILON {
        0.0
    } else {
        num / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_correlation_bounds() {
        let a = [0.1, 0.2, 0.7];
        assert_relative_eq!(correlation(&a, &a), 1.0, epsilon = 1e-6);
        let b = [0.7, 0.2, 0.1];
        assert!(correlation(&a, &b) < 0.0);
        assert_eq!(correlation(&[0.5, 0.5], &a), 0.0);
        assert_eq!(correlation(&[], &[]), 0.0);
    }

    fn matcher() -> ColorMatcher {
        let red = vec![1.0, 0.0, 0.0, 0.0];
        let green = vec![0.0, 1.0, 0.0, 0.0];
        let blue = vec![0.0, 0.0, 1.0, 0.0];
        let index = LocationIndex::from_locations(
            vec![vec![red.clone(), green.clone(), blue.clone()], vec![blue.clone(); 3]],
            3,
        )
        .unwrap();
        ColorMatcher::from_index(
            ColorMatcherConfig {
                heading_window: 0,
                ..Default::default()
            },
            index,
        )
    }

    #[test]
    fn test_query_prefers_matching_histogram() {
        let m = matcher();
        let report = m.query(&vec![0.0, 1.0, 0.0, 0.0], 0).unwrap();
        assert_eq!(report.match_count, 1);
        assert_relative_eq!(report.heading_likelihoods[1], 1.0, epsilon = 1e-9);
        assert_eq!(report.heading_likelihoods[0], 0.0);

        let other = m.query(&vec![0.0, 1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(other.match_count, 0);
    }

    #[test]
    fn test_heading_hint_limits_search() {
        let m = matcher();
        let report = m
            .query_restricted(&vec![0.0, 1.0, 0.0, 0.0], 0, Some(0))
            .unwrap();
        assert_eq!(report.match_count, 0);
        assert!(report.heading_likelihoods.iter().all(|v| *v == 0.0));
    }
}
