//! Measurement sources: image matching against per-location databases.
//!
//! A [`MeasurementSource`] turns a prepared query (a frame's descriptors, a
//! recorded frame position, ...) and a location index into an
//! [`EvidenceReport`]. The belief engine only sees the reports, so the
//! matching method can change without touching the filter.
//!
//! # Sources
//!
//! - [`FeatureMatcher`]: ORB descriptors, brute-force Hamming matching with a ratio test
//! - [`ColorMatcher`]: HSV histogram correlation
//! - [`RecordedSource`]: replays a raw evidence dump
//! - [`Matcher`]: runtime selection between the two image matchers

pub mod color;
pub mod features;
pub mod index;
pub mod matcher;
pub mod recorded;

use nalgebra::DVector;

use crate::belief::{EvidenceReport, HeadingBin, LocationId};
use crate::error::MeasurementError;

pub use color::{ColorMatcher, ColorMatcherConfig};
pub use features::{FeatureMatcher, FeatureMatcherConfig};
pub use index::LocationIndex;
pub use matcher::{FrameQuery, Matcher, MatcherKind};
pub use recorded::RecordedSource;

/// Produces evidence for one (frame, location) pair.
///
/// Implementations must be deterministic for a fixed query, location and
/// index, and safe to call from several threads at once: the filter may
/// issue the queries of one frame in parallel.
pub trait MeasurementSource: Send + Sync {
    /// Per-frame input, prepared once and shared by all location queries.
    type Query: Send + Sync;

    /// Number of locations this source can answer for.
    fn num_locations(&self) -> usize;

    /// Query one location.
    fn query(
        &self,
        query: &Self::Query,
        location: LocationId,
    ) -> Result<EvidenceReport, MeasurementError>;

    /// Query one location, optionally biased toward a heading hint.
    fn query_restricted(
        &self,
        query: &Self::Query,
        location: LocationId,
        heading_hint: Option<HeadingBin>,
    ) -> Result<EvidenceReport, MeasurementError> {
        let _ = heading_hint;
        self.query(query, location)
    }
}

impl<S: MeasurementSource> MeasurementSource for &S {
    type Query = S::Query;

    fn num_locations(&self) -> usize {
        (**self).num_locations()
    }

    fn query(
        &self,
        query: &Self::Query,
        location: LocationId,
    ) -> Result<EvidenceReport, MeasurementError> {
        (**self).query(query, location)
    }

    fn query_restricted(
        &self,
        query: &Self::Query,
        location: LocationId,
        heading_hint: Option<HeadingBin>,
    ) -> Result<EvidenceReport, MeasurementError> {
        (**self).query_restricted(query, location, heading_hint)
    }
}

/// Build a report from raw per-heading scores: likelihoods are the scores
/// normalized to sum to one (all zero when nothing scored).
pub(crate) fn evidence_from_scores(
    match_count: u64,
    scores: Vec<f64>,
) -> Result<EvidenceReport, MeasurementError> {
    let total: f64 = scores.iter().sum();
    let mut likelihoods = DVector::from_vec(scores);
    if total > 0.0 {
        likelihoods /= total;
    } else {
        likelihoods.fill(0.0);
    }
    EvidenceReport::new(match_count, likelihoods)
}

/// Whether `bin` lies within `window` bins of `hint`, wrapping around the circle.
pub(crate) fn within_heading_window(
    bin: HeadingBin,
    hint: HeadingBin,
    window: usize,
    num_bins: usize,
) -> bool {
    if num_bins == 0 {
        return false;
    }
    let d = bin.abs_diff(hint) % num_bins;
    d.min(num_bins - d) <= window
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_evidence_from_scores_normalizes() {
        let report = evidence_from_scores(10, vec![1.0, 3.0, 0.0, 6.0]).unwrap();
        assert_eq!(report.match_count, 10);
        assert_relative_eq!(report.heading_likelihoods.sum(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(report.heading_likelihoods[3], 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_evidence_from_zero_scores_is_zero() {
        let report = evidence_from_scores(0, vec![0.0; 5]).unwrap();
        assert!(report.heading_likelihoods.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_heading_window_wraps() {
        assert!(within_heading_window(24, 0, 1, 25));
        assert!(within_heading_window(1, 24, 2, 25));
        assert!(within_heading_window(10, 10, 0, 25));
        assert!(!within_heading_window(12, 0, 3, 25));
        assert!(!within_heading_window(20, 0, 3, 25));
    }
}
