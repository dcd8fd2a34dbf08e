//! Evidence acquisition for one frame.
//!
//! Decides which locations to query, queries them (optionally on worker
//! threads), and fills every location that was skipped or whose query failed
//! with the placeholder report.

use std::thread;

use crossbeam_channel::unbounded;
use tracing::warn;

use crate::belief::{Decision, EvidenceReport, HeadingBin, LocationId};
use crate::error::{LocalizationError, MeasurementError, Result};
use crate::measurement::MeasurementSource;

/// Which locations are queried for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStrategy {
    /// Every location, every frame.
    #[default]
    Exhaustive,
    /// Once a decision exists, only locations within `radius` of it, with the
    /// decided heading passed as hint.
    Windowed { radius: usize },
}

impl SearchStrategy {
    pub fn locations_to_query(
        &self,
        num_locations: usize,
        last: Option<Decision>,
    ) -> Vec<LocationId> {
        match (self, last) {
            (SearchStrategy::Windowed { radius }, Some(decision)) if num_locations > 0 => {
                let lo = decision.location.saturating_sub(*radius);
                let hi = decision
                    .location
                    .saturating_add(*radius)
                    .min(num_locations - 1);
                (lo..=hi).collect()
            }
            _ => (0..num_locations).collect(),
        }
    }

    pub fn heading_hint(&self, last: Option<Decision>) -> Option<HeadingBin> {
        match self {
            SearchStrategy::Windowed { .. } => last.map(|d| d.heading),
            SearchStrategy::Exhaustive => None,
        }
    }
}

/// Evidence gathered for one frame.
#[derive(Debug)]
pub struct Acquisition {
    /// One report per location, in location order.
    pub reports: Vec<EvidenceReport>,
    pub queried: Vec<LocationId>,
    /// Skipped and failed locations, sorted.
    pub substituted: Vec<LocationId>,
    pub failures: Vec<(LocationId, MeasurementError)>,
    pub skipped: usize,
}

/// Queries a [`MeasurementSource`] for every location of a frame.
#[derive(Debug, Clone)]
pub struct EvidenceAcquirer {
    pub strategy: SearchStrategy,
    /// Query locations on scoped worker threads.
    pub parallel: bool,
    placeholder: EvidenceReport,
}

impl EvidenceAcquirer {
    pub fn new(
        strategy: SearchStrategy,
        num_bins: usize,
        placeholder_count: u64,
        placeholder_likelihood: f64,
    ) -> Self {
        Self {
            strategy,
            parallel: false,
            placeholder: EvidenceReport::placeholder(
                placeholder_count,
                num_bins,
                placeholder_likelihood,
            ),
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn num_bins(&self) -> usize {
        self.placeholder.num_bins()
    }

    pub fn placeholder(&self) -> &EvidenceReport {
        &self.placeholder
    }

    /// Gather one report per location. A report with the wrong bin count is
    /// fatal; any other measurement failure is substituted.
    pub fn acquire<S: MeasurementSource>(
        &self,
        source: &S,
        query: &S::Query,
        num_locations: usize,
        last: Option<Decision>,
    ) -> Result<Acquisition> {
        let targets = self.strategy.locations_to_query(num_locations, last);
        let hint = self.strategy.heading_hint(last);

        let results = if self.parallel && targets.len() > 1 {
            query_parallel(source, query, &targets, hint)
        } else {
            targets
                .iter()
                .map(|&location| (location, query_one(source, query, location, hint)))
                .collect()
        };

        let mut reports = vec![self.placeholder.clone(); num_locations];
        let mut substituted: Vec<LocationId> = (0..num_locations)
            .filter(|l| !targets.contains(l))
            .collect();
        let skipped = substituted.len();
        let mut failures = Vec::new();

        for (location, result) in results {
            if let Ok(report) = &result {
                if report.num_bins() != self.num_bins() {
                    return Err(LocalizationError::DimensionMismatch {
                        context: "evidence heading bins",
                        expected: self.num_bins(),
                        actual: report.num_bins(),
                    });
                }
            }
            match result.and_then(|report| report.validate().map(|_| report)) {
                Ok(report) => reports[location] = report,
                Err(err) => {
                    warn!(
                        "Measurement failed for location {}: {}. Using placeholder.",
                        location, err
                    );
                    substituted.push(location);
                    failures.push((location, err));
                }
            }
        }
        substituted.sort_unstable();

        Ok(Acquisition {
            reports,
            queried: targets,
            substituted,
            failures,
            skipped,
        })
    }
}

fn query_one<S: MeasurementSource>(
    source: &S,
    query: &S::Query,
    location: LocationId,
    hint: Option<HeadingBin>,
) -> std::result::Result<EvidenceReport, MeasurementError> {
    match hint {
        Some(_) => source.query_restricted(query, location, hint),
        None => source.query(query, location),
    }
}

/// Query every target on its own scoped thread. Results are collected over a
/// channel and returned in location order.
fn query_parallel<S: MeasurementSource>(
    source: &S,
    query: &S::Query,
    targets: &[LocationId],
    hint: Option<HeadingBin>,
) -> Vec<(LocationId, std::result::Result<EvidenceReport, MeasurementError>)> {
    let (tx, rx) = unbounded();

    let panicked: Vec<LocationId> = thread::scope(|scope| {
        let handles: Vec<_> = targets
            .iter()
            .map(|&location| {
                let tx = tx.clone();
                let handle = scope.spawn(move || {
                    let _ = tx.send((location, query_one(source, query, location, hint)));
                });
                (location, handle)
            })
            .collect();

        handles
            .into_iter()
            .filter_map(|(location, handle)| handle.join().is_err().then_some(location))
            .collect()
    });
    drop(tx);

    let mut results: Vec<_> = rx.iter().collect();
    results.extend(panicked.into_iter().map(|location| {
        (
            location,
            Err(MeasurementError::Worker(format!(
                "query thread for location {} panicked",
                location
            ))),
        )
    }));
    results.sort_by_key(|(location, _)| *location);
    results
}
