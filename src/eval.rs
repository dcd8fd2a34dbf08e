//! Accuracy of a decision sequence against ground-truth labels.

use tracing::{info, warn};

use crate::belief::Decision;
use crate::io::GroundTruth;

/// Accuracy figures for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Frames with a ground-truth label.
    pub frames_compared: usize,
    /// Frames without a ground-truth label.
    pub missing_truth: usize,
    pub location_hits: usize,
    /// Location and heading both correct.
    pub exact_hits: usize,
    /// Location correct and heading within one bin (circular).
    pub near_hits: usize,
}

impl Evaluation {
    pub fn location_accuracy(&self) -> f64 {
        ratio(self.location_hits, self.frames_compared)
    }

    pub fn heading_accuracy(&self) -> f64 {
        ratio(self.exact_hits, self.frames_compared)
    }

    pub fn near_heading_accuracy(&self) -> f64 {
        ratio(self.near_hits, self.frames_compared)
    }

    pub fn log_summary(&self) {
        if self.missing_truth > 0 {
            warn!("{} frames have no ground truth", self.missing_truth);
        }
        info!(
            "Compared {} frames: location {:.1}%, heading {:.1}%, heading +-1 bin {:.1}%",
            self.frames_compared,
            100.0 * self.location_accuracy(),
            100.0 * self.heading_accuracy(),
            100.0 * self.near_heading_accuracy()
        );
    }
}

fn ratio(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Circular distance between two heading bins.
pub fn heading_distance(a: usize, b: usize, num_bins: usize) -> usize {
    if num_bins == 0 {
        return a.abs_diff(b);
    }
    let d = a.abs_diff(b) % num_bins;
    d.min(num_bins - d)
}

/// Compare `(frame_key, decision)` pairs with the labels.
pub fn evaluate<'a, I>(decisions: I, truth: &GroundTruth, num_bins: usize) -> Evaluation
where
    I: IntoIterator<Item = (&'a str, Decision)>,
{
    let mut eval = Evaluation::default();
    for (key, decision) in decisions {
        let Some(expected) = truth.get(key) else {
            eval.missing_truth += 1;
            continue;
        };
        eval.frames_compared += 1;
        if decision.location != expected.location {
            continue;
        }
        eval.location_hits += 1;
        let d = heading_distance(decision.heading, expected.heading, num_bins);
        if d == 0 {
            eval.exact_hits += 1;
        }
        if d <= 1 {
            eval.near_hits += 1;
        }
    }
    eval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::GroundTruthEntry;
    use approx::assert_relative_eq;

    fn truth() -> GroundTruth {
        [("0000", 1, 0), ("0001", 1, 24), ("0002", 2, 5), ("0003", 3, 10)]
            .into_iter()
            .map(|(key, location, heading)| GroundTruthEntry {
                key: key.to_string(),
                location,
                heading,
            })
            .collect()
    }

    #[test]
    fn test_heading_distance_wraps() {
        assert_eq!(heading_distance(0, 24, 25), 1);
        assert_eq!(heading_distance(3, 7, 25), 4);
        assert_eq!(heading_distance(12, 0, 25), 12);
    }

    #[test]
    fn test_evaluate() {
        let decisions = [
            ("0000", Decision { location: 1, heading: 0 }),
            ("0001", Decision { location: 1, heading: 0 }),
            ("0002", Decision { location: 2, heading: 8 }),
            ("0003", Decision { location: 4, heading: 10 }),
            ("0004", Decision { location: 0, heading: 0 }),
        ];
        let eval = evaluate(decisions, &truth(), 25);
        assert_eq!(eval.frames_compared, 4);
        assert_eq!(eval.missing_truth, 1);
        assert_eq!(eval.location_hits, 3);
        assert_eq!(eval.exact_hits, 1);
        assert_eq!(eval.near_hits, 2);
        assert_relative_eq!(eval.location_accuracy(), 0.75);
        assert_relative_eq!(eval.heading_accuracy(), 0.25);
        assert_relative_eq!(eval.near_heading_accuracy(), 0.5);
    }

    #[test]
    fn test_empty_evaluation() {
        let eval = evaluate(std::iter::empty(), &truth(), 25);
        assert_eq!(eval.frames_compared, 0);
        assert_eq!(eval.location_accuracy(), 0.0);
    }
}
