//! Belief-update engine.
//!
//! Holds the discrete belief over known locations and heading bins and the
//! pure operations that advance it by one frame:
//! - [`MotionModel`]: command accounting (heading rotation, forward boost)
//! - [`BlendEngine`]: generation blend followed by the sharpness blend
//! - [`decide`]: best (location, heading) extraction
//! - [`BeliefUpdater`]: the composed per-frame step

pub mod blend;
pub mod decision;
pub mod motion;
pub mod types;
pub mod update;

pub use blend::BlendEngine;
pub use decision::decide;
pub use motion::{Command, MotionModel};
pub use types::{
    Belief, Decision, EvidenceReport, Generation, HeadingBin, LEGACY_UNIFORM_LIKELIHOOD,
    LocationId,
};
pub use update::BeliefUpdater;
