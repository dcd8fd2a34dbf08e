//! Per-frame results and run summaries.
//!
//! These describe what happened while processing the sequence:
//! - the generation and decision produced for each frame
//! - which locations were queried and which received a placeholder
//! - measurement failures, kept for the end-of-run report

use std::time::Duration;

use crate::belief::{Decision, Generation, LocationId};

/// A measurement that failed and was replaced by the placeholder report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementFailure {
    pub frame_key: String,
    pub location: LocationId,
    pub reason: String,
}

/// Outcome of one frame.
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub key: String,
    pub generation: Generation,
    pub decision: Decision,
    pub sharpness: f64,
    /// Locations the measurement source was asked about.
    pub queried: Vec<LocationId>,
    /// Locations that received the placeholder (skipped or failed).
    pub substituted: Vec<LocationId>,
}

/// Summary of a whole run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub frames_processed: usize,
    /// Decision of every frame, in frame order.
    pub decisions: Vec<(String, Decision)>,
    pub queries_issued: usize,
    /// Queries avoided by windowed search.
    pub queries_skipped: usize,
    pub failures: Vec<MeasurementFailure>,
    pub elapsed: Duration,
}

impl RunReport {
    pub(crate) fn record(&mut self, frame: &FrameResult, skipped: usize) {
        self.frames_processed += 1;
        self.decisions.push((frame.key.clone(), frame.decision));
        self.queries_issued += frame.queried.len();
        self.queries_skipped += skipped;
    }

    pub fn final_decision(&self) -> Option<Decision> {
        self.decisions.last().map(|(_, d)| *d)
    }
}
