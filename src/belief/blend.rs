//! Two-stage blending of belief generations.
//!
//! Both stages are convex combinations applied per location, element-wise
//! across headings and once on confidence:
//! - generation blend: fixed weight on the current generation
//! - sharpness blend: weight on the current generation grows linearly with
//!   image sharpness up to a threshold, then saturates

use serde::{Deserialize, Serialize};

use super::types::{Belief, Generation};
use crate::error::{LocalizationError, Result};

/// Blend weights and the sharpness trust curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendEngine {
    /// Weight of the fresh generation in the generation blend.
    pub generation_weight: f64,
    /// Sharpness at which a frame reaches full trust.
    pub sharpness_threshold: f64,
    /// Weight of a frame at or above the sharpness threshold.
    pub max_trust: f64,
}

impl Default for BlendEngine {
    fn default() -> Self {
        Self {
            generation_weight: 0.7,
            sharpness_threshold: 200.0,
            max_trust: 0.85,
        }
    }
}

impl BlendEngine {
    /// Blend a fresh generation into the prior with the fixed generation weight.
    pub fn blend_generations(&self, prior: &Generation, current: &Generation) -> Result<Generation> {
        blend(prior, current, self.generation_weight)
    }

    /// Blend `current` into `prior` with a weight driven by frame sharpness.
    pub fn blend_by_sharpness(
        &self,
        prior: &Generation,
        current: &Generation,
        sharpness: f64,
    ) -> Result<Generation> {
        blend(prior, current, self.sharpness_weight(sharpness))
    }

    /// Weight given to the current generation for a frame of this sharpness.
    ///
    /// Linear in sharpness below the threshold, constant at `max_trust` from
    /// the threshold on. Negative or NaN sharpness gets zero weight.
    pub fn sharpness_weight(&self, sharpness: f64) -> f64 {
        if sharpness.is_nan() || sharpness <= 0.0 {
            return 0.0;
        }
        if sharpness > self.sharpness_threshold {
            self.max_trust
        } else {
            (sharpness / self.sharpness_threshold) * self.max_trust
        }
    }
}

/// Convex combination `w * current + (1 - w) * prior`, location by location.
pub fn blend(prior: &Generation, current: &Generation, current_weight: f64) -> Result<Generation> {
    if prior.num_locations() != current.num_locations() {
        return Err(LocalizationError::DimensionMismatch {
            context: "blend locations",
            expected: prior.num_locations(),
            actual: current.num_locations(),
        });
    }
    if prior.num_bins() != current.num_bins() {
        return Err(LocalizationError::DimensionMismatch {
            context: "blend heading bins",
            expected: prior.num_bins(),
            actual: current.num_bins(),
        });
    }

    let w = current_weight.clamp(0.0, 1.0);
    let prior_weight = 1.0 - w;

    let beliefs = prior
        .iter()
        .zip(current.iter())
        .map(|(p, c)| {
            let confidence = w * c.confidence() + prior_weight * p.confidence();
            let headings = c.headings() * w + p.headings() * prior_weight;
            Belief::from_parts(confidence, headings)
        })
        .collect();

    Ok(Generation::from_beliefs_unchecked(beliefs, prior.num_bins()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn single(confidence: f64, headings: &[f64]) -> Generation {
        Generation::new(vec![Belief::from_slice(confidence, headings).unwrap()]).unwrap()
    }

    fn random_generation(rng: &mut StdRng, locations: usize, bins: usize) -> Generation {
        let beliefs = (0..locations)
            .map(|_| {
                let headings: Vec<f64> = (0..bins).map(|_| rng.gen_range(0.0..1.0)).collect();
                Belief::from_slice(rng.gen_range(0.0..500.0), &headings).unwrap()
            })
            .collect();
        Generation::new(beliefs).unwrap()
    }

    #[test]
    fn test_sharpness_weight_curve() {
        let engine = BlendEngine::default();
        assert_relative_eq!(engine.sharpness_weight(100.0), 0.425, epsilon = 1e-12);
        assert_eq!(engine.sharpness_weight(200.0), 0.85);
        assert_eq!(engine.sharpness_weight(200.0001), 0.85);
        assert_eq!(engine.sharpness_weight(1e9), 0.85);
        assert_eq!(engine.sharpness_weight(0.0), 0.0);
        assert_eq!(engine.sharpness_weight(-5.0), 0.0);
        assert_eq!(engine.sharpness_weight(f64::NAN), 0.0);
    }

    #[test]
    fn test_sharpness_weight_is_monotonic() {
        let engine = BlendEngine::default();
        let mut last = 0.0;
        for i in 0..=400 {
            let w = engine.sharpness_weight(i as f64);
            assert!(w >= last);
            last = w;
        }
        // continuous at the threshold
        assert_relative_eq!(
            engine.sharpness_weight(199.9999),
            engine.sharpness_weight(200.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_sharpness_blend_scenario() {
        let engine = BlendEngine::default();
        let prior = single(10.0, &[0.2, 0.8]);
        let current = single(20.0, &[0.6, 0.4]);
        let out = engine.blend_by_sharpness(&prior, &current, 100.0).unwrap();
        assert_relative_eq!(out.beliefs()[0].confidence(), 14.25, epsilon = 1e-12);
        assert_relative_eq!(
            out.beliefs()[0].headings()[0],
            0.425 * 0.6 + 0.575 * 0.2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_generation_blend_weights() {
        let engine = BlendEngine::default();
        let prior = single(10.0, &[1.0, 0.0]);
        let current = single(20.0, &[0.0, 1.0]);
        let out = engine.blend_generations(&prior, &current).unwrap();
        assert_relative_eq!(out.beliefs()[0].confidence(), 17.0, epsilon = 1e-12);
        assert_relative_eq!(out.beliefs()[0].headings()[0], 0.3, epsilon = 1e-12);
        assert_relative_eq!(out.beliefs()[0].headings()[1], 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_blend_rejects_mismatched_bins() {
        let prior = single(1.0, &[0.5, 0.5]);
        let current = single(1.0, &[0.2, 0.3, 0.5]);
        let err = BlendEngine::default()
            .blend_generations(&prior, &current)
            .unwrap_err();
        assert!(matches!(err, LocalizationError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_blend_rejects_mismatched_locations() {
        let prior = Generation::uniform(3, 2, 1.0, 0.5).unwrap();
        let current = Generation::uniform(2, 2, 1.0, 0.5).unwrap();
        assert!(blend(&prior, &current, 0.5).is_err());
    }

    #[test]
    fn test_blends_are_convex_and_non_negative() {
        let mut rng = StdRng::seed_from_u64(7);
        let engine = BlendEngine::default();
        for _ in 0..50 {
            let prior = random_generation(&mut rng, 5, 9);
            let current = random_generation(&mut rng, 5, 9);
            let sharpness = rng.gen_range(0.0..400.0);

            for out in [
                engine.blend_generations(&prior, &current).unwrap(),
                engine.blend_by_sharpness(&prior, &current, sharpness).unwrap(),
            ] {
                for ((o, p), c) in out.iter().zip(prior.iter()).zip(current.iter()) {
                    let lo = p.confidence().min(c.confidence()) - 1e-9;
                    let hi = p.confidence().max(c.confidence()) + 1e-9;
                    assert!(o.confidence() >= lo && o.confidence() <= hi);
                    assert!(o.confidence() >= 0.0);
                    for i in 0..o.num_bins() {
                        let (pv, cv, ov) = (p.headings()[i], c.headings()[i], o.headings()[i]);
                        assert!(ov >= pv.min(cv) - 1e-12 && ov <= pv.max(cv) + 1e-12);
                        assert!(ov >= 0.0);
                    }
                }
            }
        }
    }
}
