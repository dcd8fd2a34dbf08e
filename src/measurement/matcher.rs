//! Runtime selection of the image matching method.

use std::path::Path;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::color::{ColorMatcher, ColorMatcherConfig};
use super::features::{Descriptor, FeatureMatcher, FeatureMatcherConfig};
use super::MeasurementSource;
use crate::belief::{EvidenceReport, HeadingBin, LocationId};
use crate::error::MeasurementError;
use crate::imaging::{self, ImageSize};

/// Available matching methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    /// ORB features with ratio-tested brute-force matching.
    Feature,
    /// HSV color histogram correlation.
    Color,
}

impl MatcherKind {
    pub fn name(self) -> &'static str {
        match self {
            MatcherKind::Feature => "feature",
            MatcherKind::Color => "color",
        }
    }
}

/// A frame prepared for one of the matchers.
#[derive(Debug, Clone)]
pub enum FrameQuery {
    Features(Vec<Descriptor>),
    Color(Vec<f32>),
}

impl FrameQuery {
    fn kind(&self) -> MatcherKind {
        match self {
            FrameQuery::Features(_) => MatcherKind::Feature,
            FrameQuery::Color(_) => MatcherKind::Color,
        }
    }
}

/// Image matcher selected at runtime.
pub enum Matcher {
    Feature(FeatureMatcher),
    Color(ColorMatcher),
}

impl Matcher {
    /// Build the index of the selected matcher for every location under `map_dir`.
    pub fn build(
        kind: MatcherKind,
        map_dir: &Path,
        num_locations: usize,
        num_bins: usize,
        size: Option<ImageSize>,
        feature: &FeatureMatcherConfig,
        color: &ColorMatcherConfig,
    ) -> Result<Self> {
        Ok(match kind {
            MatcherKind::Feature => Matcher::Feature(FeatureMatcher::build(
                feature.clone(),
                map_dir,
                num_locations,
                num_bins,
                size,
            )?),
            MatcherKind::Color => Matcher::Color(ColorMatcher::build(
                color.clone(),
                map_dir,
                num_locations,
                num_bins,
                size,
            )?),
        })
    }

    pub fn kind(&self) -> MatcherKind {
        match self {
            Matcher::Feature(_) => MatcherKind::Feature,
            Matcher::Color(_) => MatcherKind::Color,
        }
    }

    /// Load a frame from disk and prepare it for this matcher.
    pub fn prepare(&self, path: &Path, size: Option<ImageSize>) -> Result<FrameQuery> {
        Ok(match self {
            Matcher::Feature(m) => FrameQuery::Features(m.prepare(&imaging::load_gray(path, size)?)?),
            Matcher::Color(m) => FrameQuery::Color(m.prepare(&imaging::load_color(path, size)?)?),
        })
    }

    fn kind_mismatch(&self, query: &FrameQuery) -> MeasurementError {
        MeasurementError::QueryKind {
            prepared: query.kind().name(),
            matcher: self.kind().name(),
        }
    }
}

impl MeasurementSource for Matcher {
    type Query = FrameQuery;

    fn num_locations(&self) -> usize {
        match self {
            Matcher::Feature(m) => m.num_locations(),
            Matcher::Color(m) => m.num_locations(),
        }
    }

    fn query(
        &self,
        query: &Self::Query,
        location: LocationId,
    ) -> Result<EvidenceReport, MeasurementError> {
        self.query_restricted(query, location, None)
    }

    fn query_restricted(
        &self,
        query: &Self::Query,
        location: LocationId,
        heading_hint: Option<HeadingBin>,
    ) -> Result<EvidenceReport, MeasurementError> {
        match (self, query) {
            (Matcher::Feature(m), FrameQuery::Features(q)) => {
                m.query_restricted(q, location, heading_hint)
            }
            (Matcher::Color(m), FrameQuery::Color(q)) => {
                m.query_restricted(q, location, heading_hint)
            }
            _ => Err(self.kind_mismatch(query)),
        }
    }
}
