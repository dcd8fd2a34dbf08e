//! Run configuration, loaded from YAML.
//!
//! Every field has a default, so an empty file (or no file at all) describes
//! the standard seven-location, 25-bin setup.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::belief::{BlendEngine, Generation, LEGACY_UNIFORM_LIKELIHOOD, MotionModel};
use crate::error::LocalizationError;
use crate::filter::SearchStrategy;
use crate::imaging::ImageSize;
use crate::io::DEFAULT_KEY_WIDTH;
use crate::measurement::{ColorMatcherConfig, FeatureMatcherConfig, MatcherKind};

/// Per-bin likelihood of the initial prior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorScheme {
    /// `1/B` per bin.
    #[default]
    Normalized,
    /// `1/75` per bin regardless of B, as produced by older runs.
    Legacy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Locations within this distance of the last decision are queried when pruning.
    pub window_radius: usize,
    /// Query the locations of one frame on worker threads.
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            window_radius: 2,
            parallel: true,
        }
    }
}

/// Report substituted for skipped or failed locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    pub match_count: u64,
    pub likelihood: f64,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            match_count: 1,
            likelihood: LEGACY_UNIFORM_LIKELIHOOD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Raw evidence written by `measure` and read by `process`.
    pub raw_dump: PathBuf,
    pub belief_dump: PathBuf,
    pub decision_dump: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            raw_dump: PathBuf::from("rawP.txt"),
            belief_dump: PathBuf::from("out.txt"),
            decision_dump: PathBuf::from("bestGuess.txt"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub num_locations: usize,
    pub num_bins: usize,
    /// Characters of each command-log line that form the frame key.
    pub key_width: usize,

    pub frames_dir: PathBuf,
    pub map_dir: PathBuf,
    pub command_log: PathBuf,
    pub output: OutputConfig,

    pub matcher: MatcherKind,
    pub image_size: Option<ImageSize>,

    pub motion: MotionModel,
    pub blend: BlendEngine,
    pub prior: PriorScheme,
    pub search: SearchConfig,
    pub placeholder: PlaceholderConfig,

    pub feature: FeatureMatcherConfig,
    pub color: ColorMatcherConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_locations: 7,
            num_bins: 25,
            key_width: DEFAULT_KEY_WIDTH,
            frames_dir: PathBuf::from("cam1_img"),
            map_dir: PathBuf::from("map"),
            command_log: PathBuf::from("commands.txt"),
            output: OutputConfig::default(),
            matcher: MatcherKind::Feature,
            image_size: None,
            motion: MotionModel::default(),
            blend: BlendEngine::default(),
            prior: PriorScheme::default(),
            search: SearchConfig::default(),
            placeholder: PlaceholderConfig::default(),
            feature: FeatureMatcherConfig::default(),
            color: ColorMatcherConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load and validate a YAML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: RunConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LocalizationError> {
        let invalid = |msg: String| Err(LocalizationError::InvalidConfig(msg));

        if self.num_locations == 0 {
            return invalid("num_locations must be at least 1".into());
        }
        if self.num_bins == 0 {
            return invalid("num_bins must be at least 1".into());
        }
        if self.key_width == 0 {
            return invalid("key_width must be at least 1".into());
        }
        for (name, value) in [
            ("blend.generation_weight", self.blend.generation_weight),
            ("blend.max_trust", self.blend.max_trust),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{} must lie in [0, 1], got {}", name, value));
            }
        }
        if !self.blend.sharpness_threshold.is_finite() || self.blend.sharpness_threshold <= 0.0 {
            return invalid(format!(
                "blend.sharpness_threshold must be positive, got {}",
                self.blend.sharpness_threshold
            ));
        }
        if !self.motion.forward_gain.is_finite() || self.motion.forward_gain < 0.0 {
            return invalid(format!(
                "motion.forward_gain must be non-negative, got {}",
                self.motion.forward_gain
            ));
        }
        if !self.motion.degrees_per_bin.is_finite() {
            return invalid("motion.degrees_per_bin must be finite".into());
        }
        if !self.placeholder.likelihood.is_finite() || self.placeholder.likelihood < 0.0 {
            return invalid(format!(
                "placeholder.likelihood must be non-negative, got {}",
                self.placeholder.likelihood
            ));
        }
        if self.feature.ratio <= 0.0 || self.feature.ratio > 1.0 || self.feature.ratio.is_nan() {
            return invalid(format!(
                "feature.ratio must lie in (0, 1], got {}",
                self.feature.ratio
            ));
        }
        if self.feature.n_features <= 0 {
            return invalid("feature.n_features must be positive".into());
        }
        if self.color.bins.iter().any(|b| *b <= 0) {
            return invalid(format!("color.bins must be positive, got {:?}", self.color.bins));
        }
        if let Some(size) = self.image_size {
            if size.width <= 0 || size.height <= 0 {
                return invalid(format!(
                    "image_size must be positive, got {}x{}",
                    size.width, size.height
                ));
            }
        }
        Ok(())
    }

    /// Per-bin likelihood of the initial prior.
    pub fn prior_likelihood(&self) -> f64 {
        match self.prior {
            PriorScheme::Normalized => 1.0 / self.num_bins as f64,
            PriorScheme::Legacy => LEGACY_UNIFORM_LIKELIHOOD,
        }
    }

    /// Belief before the first frame: confidence 1, uniform headings.
    pub fn initial_generation(&self) -> Result<Generation, LocalizationError> {
        Generation::uniform(
            self.num_locations,
            self.num_bins,
            1.0,
            self.prior_likelihood(),
        )
    }

    pub fn search_strategy(&self, prune: bool) -> SearchStrategy {
        if prune {
            SearchStrategy::Windowed {
                radius: self.search.window_radius,
            }
        } else {
            SearchStrategy::Exhaustive
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: RunConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.num_locations, 7);
        assert_eq!(config.num_bins, 25);
        assert_eq!(config.key_width, 4);
        assert_eq!(config.search.window_radius, 2);
        assert_eq!(config.placeholder.match_count, 1);
        assert_relative_eq!(config.blend.generation_weight, 0.7);
        assert_relative_eq!(config.blend.sharpness_threshold, 200.0);
        assert_relative_eq!(config.blend.max_trust, 0.85);
        assert_relative_eq!(config.motion.forward_gain, 0.05);
        assert_eq!(config.output.decision_dump, PathBuf::from("bestGuess.txt"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = "num_locations: 3\nprior: legacy\nmatcher: color\nblend:\n  sharpness_threshold: 150\nimage_size:\n  width: 320\n  height: 240\n";
        let config: RunConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.num_locations, 3);
        assert_eq!(config.prior, PriorScheme::Legacy);
        assert_eq!(config.matcher, MatcherKind::Color);
        assert_relative_eq!(config.blend.sharpness_threshold, 150.0);
        assert_relative_eq!(config.blend.max_trust, 0.85);
        assert_eq!(config.image_size, Some(ImageSize { width: 320, height: 240 }));
    }

    #[test]
    fn test_initial_generation_priors() {
        let mut config = RunConfig::default();
        let g = config.initial_generation().unwrap();
        assert_eq!(g.num_locations(), 7);
        assert_relative_eq!(g.beliefs()[0].headings()[3], 1.0 / 25.0);
        assert_eq!(g.beliefs()[6].confidence(), 1.0);

        config.prior = PriorScheme::Legacy;
        let g = config.initial_generation().unwrap();
        assert_relative_eq!(g.beliefs()[0].headings()[3], 1.0 / 75.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RunConfig::default();
        config.num_bins = 0;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.blend.generation_weight = 1.5;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.blend.sharpness_threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.placeholder.likelihood = -1.0;
        assert!(matches!(
            config.validate(),
            Err(LocalizationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "num_bins: 12\nsearch:\n  parallel: false").unwrap();
        let config = RunConfig::load(file.path()).unwrap();
        assert_eq!(config.num_bins, 12);
        assert!(!config.search.parallel);
        assert_eq!(config.search.window_radius, 2);

        let mut bad = NamedTempFile::new().unwrap();
        writeln!(bad, "num_locations: 0").unwrap();
        assert!(RunConfig::load(bad.path()).is_err());
    }

    #[test]
    fn test_search_strategy() {
        let config = RunConfig::default();
        assert_eq!(config.search_strategy(false), SearchStrategy::Exhaustive);
        assert_eq!(
            config.search_strategy(true),
            SearchStrategy::Windowed { radius: 2 }
        );
    }
}
