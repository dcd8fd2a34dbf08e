use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use rust_vmcl::config::RunConfig;
use rust_vmcl::measurement::MatcherKind;
use rust_vmcl::system::Localizer;

#[derive(Parser)]
#[command(name = "rust-vmcl")]
#[command(about = "Visual Monte Carlo localization over known locations and headings")]
struct Args {
    /// YAML run configuration (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of query frames
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Directory holding one sub-directory of heading images per location
    #[arg(long)]
    map: Option<PathBuf>,

    /// Command log
    #[arg(long)]
    commands: Option<PathBuf>,

    /// Matching method
    #[arg(long, value_enum)]
    matcher: Option<MatcherKind>,

    /// Query the locations of a frame on one thread
    #[arg(long)]
    sequential: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Match every frame against every location and write the raw evidence dump
    Measure,
    /// Filter the raw evidence dump into belief and decision dumps
    Process,
    /// Measure and filter in one pass
    Run {
        /// Only query locations near the last decision
        #[arg(long)]
        prune: bool,
    },
    /// Compare the decision dump with ground truth
    Evaluate {
        /// CSV of frame_key,location,heading
        #[arg(long)]
        truth: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rust_vmcl=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            RunConfig::load(path)?
        }
        None => {
            info!("Using default configuration");
            RunConfig::default()
        }
    };
    if let Some(frames) = args.frames {
        config.frames_dir = frames;
    }
    if let Some(map) = args.map {
        config.map_dir = map;
    }
    if let Some(commands) = args.commands {
        config.command_log = commands;
    }
    if let Some(matcher) = args.matcher {
        config.matcher = matcher;
    }
    if args.sequential {
        config.search.parallel = false;
    }

    info!(
        "{} locations x {} headings, {} matcher",
        config.num_locations,
        config.num_bins,
        config.matcher.name()
    );
    let localizer = Localizer::new(config).context("Invalid configuration")?;

    match args.mode {
        Mode::Measure => {
            localizer.measure()?;
        }
        Mode::Process => {
            localizer.process()?;
        }
        Mode::Run { prune } => {
            localizer.run(prune)?;
        }
        Mode::Evaluate { truth } => {
            localizer.evaluate(&truth)?;
        }
    }

    Ok(())
}
