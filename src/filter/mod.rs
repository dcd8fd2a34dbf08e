//! Sequential filtering over an ordered frame sequence.
//!
//! For each frame the filter:
//! - applies the frame's command to the current generation
//! - acquires evidence for every location (or a window around the last decision)
//! - blends evidence into the belief, weighted by frame sharpness
//! - extracts the decision and hands the result to the caller for persistence

pub mod acquire;
pub mod result;
pub mod sequential;
pub mod state;

pub use acquire::{Acquisition, EvidenceAcquirer, SearchStrategy};
pub use result::{FrameResult, MeasurementFailure, RunReport};
pub use sequential::{FrameInput, SequentialFilter};
pub use state::FilterState;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use crate::belief::{EvidenceReport, HeadingBin, LocationId};
    use crate::error::MeasurementError;
    use crate::measurement::MeasurementSource;

    /// In-memory source whose query is the frame's script: one scripted
    /// outcome per location. Records every call.
    pub struct ScriptedSource {
        num_locations: usize,
        calls: Mutex<Vec<(LocationId, Option<HeadingBin>)>>,
    }

    impl ScriptedSource {
        pub fn new(num_locations: usize) -> Self {
            Self {
                num_locations,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<(LocationId, Option<HeadingBin>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MeasurementSource for ScriptedSource {
        type Query = Vec<Result<EvidenceReport, String>>;

        fn num_locations(&self) -> usize {
            self.num_locations
        }

        fn query(
            &self,
            query: &Self::Query,
            location: LocationId,
        ) -> Result<EvidenceReport, MeasurementError> {
            self.query_restricted(query, location, None)
        }

        fn query_restricted(
            &self,
            query: &Self::Query,
            location: LocationId,
            heading_hint: Option<HeadingBin>,
        ) -> Result<EvidenceReport, MeasurementError> {
            self.calls.lock().unwrap().push((location, heading_hint));
            match query.get(location) {
                Some(Ok(report)) => Ok(report.clone()),
                Some(Err(reason)) => Err(MeasurementError::Worker(reason.clone())),
                None => Err(MeasurementError::UnknownLocation(location)),
            }
        }
    }
}
