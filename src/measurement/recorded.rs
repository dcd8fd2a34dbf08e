//! Replay of previously measured evidence.
//!
//! A raw evidence dump stores one generation per frame whose confidences are
//! match counts. Replaying it lets a measured dataset be filtered again with
//! different parameters without repeating the image matching. Fractional
//! confidences, as found in belief dumps, are rejected.

use crate::belief::{EvidenceReport, Generation, LocationId};
use crate::error::{LocalizationError, MeasurementError, Result};

use super::MeasurementSource;

/// Measurement source backed by recorded generations, queried by frame position.
#[derive(Debug, Clone)]
pub struct RecordedSource {
    frames: Vec<Generation>,
    num_locations: usize,
}

impl RecordedSource {
    /// Wrap recorded raw evidence. Every confidence must be a whole match count.
    pub fn new(frames: Vec<Generation>) -> Result<Self> {
        for belief in frames.iter().flat_map(Generation::iter) {
            let count = belief.confidence();
            if count.fract() != 0.0 {
                return Err(LocalizationError::InvalidValue {
                    context: "recorded match count",
                    value: count,
                });
            }
        }
        let num_locations = frames.first().map(Generation::num_locations).unwrap_or(0);
        Ok(Self {
            frames,
            num_locations,
        })
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }
}

impl MeasurementSource for RecordedSource {
    /// Position of the frame in the recorded sequence.
    type Query = usize;

    fn num_locations(&self) -> usize {
        self.num_locations
    }

    fn query(
        &self,
        frame: &usize,
        location: LocationId,
    ) -> std::result::Result<EvidenceReport, MeasurementError> {
        let belief = self
            .frames
            .get(*frame)
            .and_then(|g| g.belief(location))
            .ok_or(MeasurementError::MissingRecord {
                frame: *frame,
                location,
            })?;
        EvidenceReport::new(belief.confidence() as u64, belief.headings().clone())
    }
}
