//! Frame-by-frame driver that owns the live generation.

use std::time::Instant;

use tracing::{debug, info};

use super::acquire::EvidenceAcquirer;
use super::result::{FrameResult, MeasurementFailure, RunReport};
use super::state::FilterState;
use crate::belief::{BeliefUpdater, Command, Decision, Generation, decide};
use crate::error::{LocalizationError, Result};
use crate::measurement::MeasurementSource;

/// Everything the filter needs for one frame.
#[derive(Debug, Clone)]
pub struct FrameInput<Q> {
    pub key: String,
    pub command: Command,
    pub sharpness: f64,
    pub query: Q,
}

/// Drives a run over an ordered frame sequence.
///
/// Owns the single live generation; each frame replaces it with the output of
/// [`BeliefUpdater::step`].
pub struct SequentialFilter<S: MeasurementSource> {
    source: S,
    updater: BeliefUpdater,
    acquirer: EvidenceAcquirer,
    current: Generation,
    last_decision: Option<Decision>,
    state: FilterState,
    report: RunReport,
}

impl<S: MeasurementSource> SequentialFilter<S> {
    /// Create a filter starting from `initial`. The source, the acquirer and
    /// the initial generation must agree on R and B.
    pub fn new(
        source: S,
        updater: BeliefUpdater,
        acquirer: EvidenceAcquirer,
        initial: Generation,
    ) -> Result<Self> {
        if source.num_locations() != initial.num_locations() {
            return Err(LocalizationError::DimensionMismatch {
                context: "measurement source locations",
                expected: initial.num_locations(),
                actual: source.num_locations(),
            });
        }
        if acquirer.num_bins() != initial.num_bins() {
            return Err(LocalizationError::DimensionMismatch {
                context: "placeholder heading bins",
                expected: initial.num_bins(),
                actual: acquirer.num_bins(),
            });
        }

        Ok(Self {
            source,
            updater,
            acquirer,
            current: initial,
            last_decision: None,
            state: FilterState::Init,
            report: RunReport::default(),
        })
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn current(&self) -> &Generation {
        &self.current
    }

    pub fn last_decision(&self) -> Option<Decision> {
        self.last_decision
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Motion, acquisition, blending and decision for one frame.
    pub fn process_frame(&mut self, input: FrameInput<S::Query>) -> Result<FrameResult> {
        let outcome = self.step(input);
        if outcome.is_err() {
            self.state = FilterState::Finished;
        }
        outcome
    }

    fn step(&mut self, input: FrameInput<S::Query>) -> Result<FrameResult> {
        if self.state == FilterState::Finished {
            return Err(LocalizationError::InvalidFrameSequence(format!(
                "frame '{}' arrived after the run finished",
                input.key
            )));
        }

        let acquisition = self.acquirer.acquire(
            &self.source,
            &input.query,
            self.current.num_locations(),
            self.last_decision,
        )?;

        let next = self.updater.step(
            &self.current,
            input.command,
            &acquisition.reports,
            input.sharpness,
        )?;
        let decision = decide(&next);

        debug!(
            "Frame {}: command={:?} sharpness={:.1} queried={} substituted={} -> location {} heading {}",
            input.key,
            input.command,
            input.sharpness,
            acquisition.queried.len(),
            acquisition.substituted.len(),
            decision.location,
            decision.heading
        );

        self.report
            .failures
            .extend(acquisition.failures.iter().map(|(location, err)| MeasurementFailure {
                frame_key: input.key.clone(),
                location: *location,
                reason: err.to_string(),
            }));

        let result = FrameResult {
            key: input.key,
            generation: next.clone(),
            decision,
            sharpness: input.sharpness,
            queried: acquisition.queried,
            substituted: acquisition.substituted,
        };
        self.report.record(&result, acquisition.skipped);

        self.current = next;
        self.last_decision = Some(decision);
        self.state = FilterState::Running;
        Ok(result)
    }

    /// Process every frame in order, handing each result to `on_frame`
    /// (persistence) before the next frame starts. The first error aborts
    /// the run.
    pub fn run<I, F, E>(&mut self, frames: I, mut on_frame: F) -> std::result::Result<RunReport, E>
    where
        I: IntoIterator<Item = std::result::Result<FrameInput<S::Query>, E>>,
        F: FnMut(&FrameResult) -> std::result::Result<(), E>,
        E: From<LocalizationError>,
    {
        let t_start = Instant::now();

        for input in frames {
            let input = match input {
                Ok(input) => input,
                Err(err) => {
                    self.state = FilterState::Finished;
                    return Err(err);
                }
            };
            let result = self.process_frame(input)?;
            if let Err(err) = on_frame(&result) {
                self.state = FilterState::Finished;
                return Err(err);
            }
        }

        self.state = FilterState::Finished;
        self.report.elapsed = t_start.elapsed();

        info!(
            "Processed {} frames in {:.2}s: {} queries issued, {} skipped, {} measurement failures",
            self.report.frames_processed,
            self.report.elapsed.as_secs_f64(),
            self.report.queries_issued,
            self.report.queries_skipped,
            self.report.failures.len()
        );
        if let Some(decision) = self.report.final_decision() {
            info!(
                "Final estimate: location {} heading {}",
                decision.location, decision.heading
            );
        }

        Ok(self.report.clone())
    }
}
