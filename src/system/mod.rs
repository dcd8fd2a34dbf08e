//! Run orchestration.
//!
//! This module contains the top-level `Localizer` that wires the frame
//! sequence, command log, measurement source and filter together for each
//! run mode, along with the writers that persist results frame by frame.

mod localizer;
pub mod output;

pub use localizer::{Localizer, frame_sharpness};
pub use output::{DumpWriter, EvidenceWriter};
