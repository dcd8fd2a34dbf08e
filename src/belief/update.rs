//! Single-step belief update.

use super::blend::BlendEngine;
use super::motion::{Command, MotionModel};
use super::types::{EvidenceReport, Generation};
use crate::error::{LocalizationError, Result};

/// Pure per-frame update: motion, generation blend, sharpness blend.
#[derive(Debug, Clone, Default)]
pub struct BeliefUpdater {
    pub motion: MotionModel,
    pub blend: BlendEngine,
}

impl BeliefUpdater {
    pub fn new(motion: MotionModel, blend: BlendEngine) -> Self {
        Self { motion, blend }
    }

    /// Compute the next generation from the previous one.
    ///
    /// `reports` must hold one report per location of `previous`, each with
    /// the same bin count.
    pub fn step(
        &self,
        previous: &Generation,
        command: Command,
        reports: &[EvidenceReport],
        sharpness: f64,
    ) -> Result<Generation> {
        if reports.len() != previous.num_locations() {
            return Err(LocalizationError::DimensionMismatch {
                context: "evidence reports",
                expected: previous.num_locations(),
                actual: reports.len(),
            });
        }
        if let Some(bad) = reports.iter().find(|r| r.num_bins() != previous.num_bins()) {
            return Err(LocalizationError::DimensionMismatch {
                context: "evidence heading bins",
                expected: previous.num_bins(),
                actual: bad.num_bins(),
            });
        }

        let adjusted_prior = self.motion.apply(previous, command);
        let evidence = Generation::from_reports(reports)?;
        let blended = self.blend.blend_generations(&adjusted_prior, &evidence)?;
        self.blend
            .blend_by_sharpness(&adjusted_prior, &blended, sharpness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::types::Belief;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    #[test]
    fn test_step_composes_motion_and_blends() {
        let updater = BeliefUpdater::default();
        let previous = Generation::new(vec![
            Belief::from_slice(10.0, &[0.1, 0.2, 0.3, 0.4]).unwrap(),
            Belief::from_slice(10.0, &[0.25, 0.25, 0.25, 0.25]).unwrap(),
        ])
        .unwrap();
        let reports = vec![
            EvidenceReport::new(20, DVector::from_vec(vec![1.0, 0.0, 0.0, 0.0])).unwrap(),
            EvidenceReport::new(0, DVector::from_vec(vec![0.0; 4])).unwrap(),
        ];

        let next = updater
            .step(&previous, Command::Left, &reports, 100.0)
            .unwrap();

        // after left rotation prior headings are [0.2, 0.3, 0.4, 0.1]
        // blended1 = 0.7 * evidence + 0.3 * prior, final = 0.425 * blended1 + 0.575 * prior
        let w = 0.425;
        let b1_conf = 0.7 * 20.0 + 0.3 * 10.0;
        assert_relative_eq!(
            next.beliefs()[0].confidence(),
            w * b1_conf + (1.0 - w) * 10.0,
            epsilon = 1e-12
        );
        let b1_h0 = 0.7 * 1.0 + 0.3 * 0.2;
        assert_relative_eq!(
            next.beliefs()[0].headings()[0],
            w * b1_h0 + (1.0 - w) * 0.2,
            epsilon = 1e-12
        );
        // untouched input
        assert_eq!(previous.beliefs()[0].headings()[0], 0.1);
    }

    #[test]
    fn test_step_rejects_wrong_report_count() {
        let updater = BeliefUpdater::default();
        let previous = Generation::uniform(3, 4, 1.0, 0.25).unwrap();
        let reports = vec![EvidenceReport::placeholder(1, 4, 0.25); 2];
        let err = updater
            .step(&previous, Command::Stay, &reports, 300.0)
            .unwrap_err();
        assert!(matches!(
            err,
            LocalizationError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_step_rejects_wrong_bin_count() {
        let updater = BeliefUpdater::default();
        let previous = Generation::uniform(2, 4, 1.0, 0.25).unwrap();
        let reports = vec![
            EvidenceReport::placeholder(1, 4, 0.25),
            EvidenceReport::placeholder(1, 5, 0.2),
        ];
        assert!(updater
            .step(&previous, Command::Stay, &reports, 300.0)
            .is_err());
    }

    #[test]
    fn test_zero_sharpness_keeps_adjusted_prior() {
        let updater = BeliefUpdater::default();
        let previous = Generation::new(vec![Belief::from_slice(3.0, &[0.1, 0.9]).unwrap()]).unwrap();
        let reports = vec![EvidenceReport::new(50, DVector::from_vec(vec![1.0, 0.0])).unwrap()];
        let next = updater
            .step(&previous, Command::Right, &reports, 0.0)
            .unwrap();
        assert_eq!(next.beliefs()[0].confidence(), 3.0);
        assert_eq!(next.beliefs()[0].headings()[0], 0.9);
    }
}
