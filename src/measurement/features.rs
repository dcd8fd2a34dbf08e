//! Feature-based measurement: ORB descriptors matched by Hamming distance.
//!
//! Each heading image of a location is reduced to its ORB descriptors when
//! the index is built. A query frame is matched against every heading image
//! with a brute-force nearest-neighbour search and Lowe's ratio test; the
//! number of surviving matches per image becomes that heading's score.

use std::path::Path;

use anyhow::Result;
use opencv::core::{KeyPoint, Mat, Vector};
use opencv::features2d;
use opencv::prelude::*;
use serde::{Deserialize, Serialize};

use super::index::LocationIndex;
use super::{MeasurementSource, evidence_from_scores, within_heading_window};
use crate::belief::{EvidenceReport, HeadingBin, LocationId};
use crate::error::MeasurementError;
use crate::imaging::{self, ImageSize};

/// 256-bit ORB descriptor.
pub type Descriptor = [u8; 32];

/// Feature matcher parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureMatcherConfig {
    /// Maximum number of ORB features per image.
    pub n_features: i32,
    /// Ratio test threshold (best / second best).
    pub ratio: f32,
    /// Max descriptor distance for acceptance.
    pub max_distance: u32,
    /// Half-width, in bins, of the heading window searched when a hint is given.
    pub heading_window: usize,
}

impl Default for FeatureMatcherConfig {
    fn default() -> Self {
        Self {
            n_features: 500,
            ratio: 0.75,
            max_distance: 64,
            heading_window: 3,
        }
    }
}

/// Feature-based [`MeasurementSource`].
pub struct FeatureMatcher {
    config: FeatureMatcherConfig,
    index: LocationIndex<Vec<Descriptor>>,
}

impl FeatureMatcher {
    /// Build the descriptor index for every location under `map_dir`.
    pub fn build(
        config: FeatureMatcherConfig,
        map_dir: &Path,
        num_locations: usize,
        num_bins: usize,
        size: Option<ImageSize>,
    ) -> Result<Self> {
        let n_features = config.n_features;
        let index = LocationIndex::build(map_dir, num_locations, num_bins, |path| {
            let gray = imaging::load_gray(path, size)?;
            Ok(extract_descriptors(&gray, n_features)?)
        })?;
        Ok(Self { config, index })
    }

    pub fn from_index(config: FeatureMatcherConfig, index: LocationIndex<Vec<Descriptor>>) -> Self {
        Self { config, index }
    }

    /// Extract the query descriptors of a grayscale frame.
    pub fn prepare(&self, gray: &Mat) -> Result<Vec<Descriptor>, MeasurementError> {
        Ok(extract_descriptors(gray, self.config.n_features)?)
    }

    fn evaluate(
        &self,
        query: &[Descriptor],
        location: LocationId,
        heading_hint: Option<HeadingBin>,
    ) -> Result<EvidenceReport, MeasurementError> {
        let headings = self.index.headings(location)?;
        let num_bins = headings.len();

        let mut total = 0u64;
        let scores = headings
            .iter()
            .enumerate()
            .map(|(bin, train)| {
                let searched = heading_hint.map_or(true, |hint| {
                    within_heading_window(bin, hint, self.config.heading_window, num_bins)
                });
                if !searched {
                    return 0.0;
                }
                let good = count_good_matches(query, train, self.config.ratio, self.config.max_distance);
                total += good as u64;
                good as f64
            })
            .collect();

        evidence_from_scores(total, scores)
    }
}

impl MeasurementSource for FeatureMatcher {
    type Query = Vec<Descriptor>;

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

/// Detect ORB keypoints and return their descriptors as plain byte arrays.
pub fn extract_descriptors(gray: &Mat, n_features: i32) -> opencv::Result<Vec<Descriptor>> {
    let mut orb = features2d::ORB::create(
        n_features,
        1.2,
        8,
        31,
        0,
        2,
        features2d::ORB_ScoreType::HARRIS_SCORE,
        31,
        20,
    )?;
    let mut keypoints = Vector::<KeyPoint>::new();
    let mut descriptors = Mat::default();
    orb.detect_and_compute(gray, &Mat::default(), &mut keypoints, &mut descriptors, false)?;

    (0..descriptors.rows())
        .map(|row| descriptor_row(&descriptors, row))
        .collect()
}

fn descriptor_row(mat: &Mat, row: i32) -> opencv::Result<Descriptor> {
    let mut desc = [0u8; 32];
    let cols = mat.cols().min(32);
    for j in 0..cols {
        desc[j as usize] = *mat.at_2d::<u8>(row, j)?;
    }
    Ok(desc)
}

/// Number of differing bits between two descriptors.
#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Count query descriptors whose nearest train descriptor passes both the
/// distance threshold and the ratio test.
pub fn count_good_matches(
    query: &[Descriptor],
    train: &[Descriptor],
    ratio: f32,
    max_distance: u32,
) -> usize {
    if train.is_empty() {
        return 0;
    }
    query
        .iter()
        .filter(|q| {
            let mut best = u32::MAX;
            let mut second = u32::MAX;
            for t in train {
                let dist = hamming_distance(q, t);
                if dist < best {
                    second = best;
                    best = dist;
                } else if dist < second {
                    second = dist;
                }
            }
            // A lone train descriptor has no second neighbour to compare against
            best <= max_distance && (second == u32::MAX || (best as f32) < ratio * second as f32)
        })
        .count()
}
