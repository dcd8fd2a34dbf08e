//! Localizer - run modes over a dataset directory.
//!
//! `measure` turns frames into raw evidence, `process` filters recorded
//! evidence, `run` measures and filters in one pass, and `evaluate` scores a
//! decision dump against ground truth.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::belief::{BeliefUpdater, Generation};
use crate::config::RunConfig;
use crate::eval::{self, Evaluation};
use crate::filter::{
    EvidenceAcquirer, FrameInput, RunReport, SearchStrategy, SequentialFilter,
};
use crate::imaging;
use crate::io::{
    CommandLog, FrameEntry, FrameSequence, GroundTruth, load_belief_dump, load_decision_dump,
};
use crate::measurement::{Matcher, MeasurementSource, RecordedSource};

use super::output::{DumpWriter, EvidenceWriter};

/// Top-level entry point: owns the run configuration.
pub struct Localizer {
    config: RunConfig,
}

impl Localizer {
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Query every location for every frame and write the raw evidence dump.
    /// Returns the number of frames measured.
    pub fn measure(&self) -> Result<usize> {
        let t_start = Instant::now();
        let frames = self.frames()?;
        let matcher = self.build_matcher()?;
        let acquirer = self.acquirer(SearchStrategy::Exhaustive);

        let path = &self.config.output.raw_dump;
        let mut writer = EvidenceWriter::create(path)?;
        let mut failures = 0;

        for entry in frames.iter() {
            let query = matcher
                .prepare(&entry.path, self.config.image_size)
                .with_context(|| format!("Failed to prepare frame {}", entry.key))?;
            let acquisition =
                acquirer.acquire(&matcher, &query, self.config.num_locations, None)?;
            failures += acquisition.failures.len();
            let evidence = Generation::from_reports(&acquisition.reports)?;
            writer.write(&entry.key, &evidence)?;
        }
        writer.finish()?;

        info!(
            "Measured {} frames with the {} matcher in {:.1}s ({} measurement failures), wrote {:?}",
            frames.len(),
            matcher.kind().name(),
            t_start.elapsed().as_secs_f64(),
            failures,
            path
        );
        Ok(frames.len())
    }

    /// Filter the recorded raw evidence dump.
    pub fn process(&self) -> Result<RunReport> {
        let frames = self.frames()?;
        let commands = self.commands()?;

        let path = &self.config.output.raw_dump;
        let recorded = load_belief_dump(path, self.config.num_locations, Some(self.config.num_bins))
            .with_context(|| format!("Failed to read raw evidence {:?}", path))?;
        if recorded.len() != frames.len() {
            bail!(
                "Raw evidence {:?} holds {} frames but {:?} has {}",
                path,
                recorded.len(),
                self.config.frames_dir,
                frames.len()
            );
        }

        let size = self.config.image_size;
        self.filter_frames(
            RecordedSource::new(recorded)?,
            SearchStrategy::Exhaustive,
            &frames,
            &commands,
            |idx, entry| Ok((frame_sharpness(entry, size)?, idx)),
        )
    }

    /// Measure and filter in one pass. With `prune`, only locations near the
    /// last decision are queried.
    pub fn run(&self, prune: bool) -> Result<RunReport> {
        let frames = self.frames()?;
        let commands = self.commands()?;
        let matcher = self.build_matcher()?;

        let size = self.config.image_size;
        let strategy = self.config.search_strategy(prune);
        info!(
            "Running {} frames with {:?} search",
            frames.len(),
            strategy
        );

        self.filter_frames(&matcher, strategy, &frames, &commands, |_, entry| {
            let query = matcher
                .prepare(&entry.path, size)
                .with_context(|| format!("Failed to prepare frame {}", entry.key))?;
            Ok((frame_sharpness(entry, size)?, query))
        })
    }

    /// Score the decision dump against a ground-truth file.
    pub fn evaluate(&self, truth_path: &Path) -> Result<Evaluation> {
        let frames = self.frames()?;
        let truth = GroundTruth::load(truth_path)
            .with_context(|| format!("Failed to read ground truth {:?}", truth_path))?;

        let path = &self.config.output.decision_dump;
        let decisions = load_decision_dump(path)
            .with_context(|| format!("Failed to read decisions {:?}", path))?;
        if decisions.len() != frames.len() {
            bail!(
                "Decision dump {:?} holds {} frames but {:?} has {}",
                path,
                decisions.len(),
                self.config.frames_dir,
                frames.len()
            );
        }

        let evaluation = eval::evaluate(
            frames.keys().zip(decisions),
            &truth,
            self.config.num_bins,
        );
        evaluation.log_summary();
        Ok(evaluation)
    }

    /// Run the filter over `frames`, writing both dumps as frames complete.
    /// `prepare` yields the sharpness and the source query of a frame.
    pub fn filter_frames<S, F>(
        &self,
        source: S,
        strategy: SearchStrategy,
        frames: &FrameSequence,
        commands: &CommandLog,
        mut prepare: F,
    ) -> Result<RunReport>
    where
        S: MeasurementSource,
        F: FnMut(usize, &FrameEntry) -> Result<(f64, S::Query)>,
    {
        let updater = BeliefUpdater::new(self.config.motion.clone(), self.config.blend.clone());
        let mut filter = SequentialFilter::new(
            source,
            updater,
            self.acquirer(strategy),
            self.config.initial_generation()?,
        )?;

        let output = &self.config.output;
        let mut writer = DumpWriter::create(&output.belief_dump, &output.decision_dump)?;

        let inputs = frames.iter().enumerate().map(|(idx, entry)| {
            let command = commands.command_for(&entry.key)?;
            let (sharpness, query) = prepare(idx, entry)?;
            Ok::<_, anyhow::Error>(FrameInput {
                key: entry.key.clone(),
                command,
                sharpness,
                query,
            })
        });
        let report = filter.run(inputs, |frame| writer.write(frame))?;
        writer.finish()?;

        for failure in &report.failures {
            info!(
                "Substituted frame {} location {}: {}",
                failure.frame_key, failure.location, failure.reason
            );
        }
        info!(
            "Wrote {:?} and {:?}",
            output.belief_dump, output.decision_dump
        );
        Ok(report)
    }

    fn frames(&self) -> Result<FrameSequence> {
        let dir = &self.config.frames_dir;
        FrameSequence::from_dir(dir).with_context(|| format!("Failed to list frames in {:?}", dir))
    }

    fn commands(&self) -> Result<CommandLog> {
        let path = &self.config.command_log;
        CommandLog::load(path, self.config.key_width)
            .with_context(|| format!("Failed to read command log {:?}", path))
    }

    fn build_matcher(&self) -> Result<Matcher> {
        Matcher::build(
            self.config.matcher,
            &self.config.map_dir,
            self.config.num_locations,
            self.config.num_bins,
            self.config.image_size,
            &self.config.feature,
            &self.config.color,
        )
    }

    fn acquirer(&self, strategy: SearchStrategy) -> EvidenceAcquirer {
        EvidenceAcquirer::new(
            strategy,
            self.config.num_bins,
            self.config.placeholder.match_count,
            self.config.placeholder.likelihood,
        )
        .with_parallel(self.config.search.parallel)
    }
}

/// Laplacian variance of a frame's grayscale image.
pub fn frame_sharpness(entry: &FrameEntry, size: Option<imaging::ImageSize>) -> Result<f64> {
    let gray = imaging::load_gray(&entry.path, size)?;
    imaging::laplacian_variance(&gray)
        .with_context(|| format!("Failed to measure sharpness of frame {}", entry.key))
}
