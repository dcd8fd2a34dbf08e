//! File formats: command log, frame sequence, belief/decision dumps and
//! ground-truth labels.

pub mod commands;
pub mod dump;
pub mod frames;
pub mod groundtruth;

pub use commands::{CommandLog, DEFAULT_KEY_WIDTH};
pub use dump::{
    format_headings, load_belief_dump, load_decision_dump, read_belief_dump,
    read_decision_dump, write_decision, write_generation,
};
pub use frames::{FrameEntry, FrameSequence};
pub use groundtruth::{GroundTruth, GroundTruthEntry};
