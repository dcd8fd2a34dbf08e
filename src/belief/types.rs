//! Belief state types: per-location beliefs, generations, evidence and decisions.

use nalgebra::DVector;

use crate::error::{LocalizationError, MeasurementError, Result};

/// Index of a location (0..R).
pub type LocationId = usize;

/// Index of a heading bin within a location (0..B).
pub type HeadingBin = usize;

/// Per-bin likelihood used by the legacy three-location configuration
/// (3 locations x 25 bins). Kept for placeholders and the legacy prior.
pub const LEGACY_UNIFORM_LIKELIHOOD: f64 = 1.0 / 75.0;

/// Belief held for a single location.
///
/// `confidence` is an unnormalized evidence magnitude; `headings` holds a
/// relative likelihood per heading bin. Both are finite and non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Belief {
    confidence: f64,
    headings: DVector<f64>,
}

impl Belief {
    /// Create a belief, rejecting negative or non-finite values.
    pub fn new(confidence: f64, headings: DVector<f64>) -> Result<Self> {
        check_value("belief confidence", confidence)?;
        for &h in headings.iter() {
            check_value("belief heading", h)?;
        }
        Ok(Self {
            confidence,
            headings,
        })
    }

    /// Convenience constructor from a slice of heading values.
    pub fn from_slice(confidence: f64, headings: &[f64]) -> Result<Self> {
        Self::new(confidence, DVector::from_column_slice(headings))
    }

    /// Uniform belief: every bin holds `likelihood`.
    pub fn uniform(confidence: f64, num_bins: usize, likelihood: f64) -> Result<Self> {
        Self::new(confidence, DVector::from_element(num_bins, likelihood))
    }

    /// Construct from values derived from already-validated beliefs.
    pub(crate) fn from_parts(confidence: f64, headings: DVector<f64>) -> Self {
        debug_assert!(confidence >= 0.0 && headings.iter().all(|h| *h >= 0.0));
        Self {
            confidence,
            headings,
        }
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn headings(&self) -> &DVector<f64> {
        &self.headings
    }

    pub fn num_bins(&self) -> usize {
        self.headings.len()
    }
}

/// Full belief state at one time step: one [`Belief`] per location.
///
/// All beliefs share the same number of heading bins. A generation is never
/// modified after construction; every update produces a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    beliefs: Vec<Belief>,
    num_bins: usize,
}

impl Generation {
    /// Create a generation, checking that every belief has the same bin count.
    pub fn new(beliefs: Vec<Belief>) -> Result<Self> {
        let num_bins = beliefs.first().map(Belief::num_bins).ok_or_else(|| {
            LocalizationError::DimensionMismatch {
                context: "generation locations",
                expected: 1,
                actual: 0,
            }
        })?;
        for belief in &beliefs {
            if belief.num_bins() != num_bins {
                return Err(LocalizationError::DimensionMismatch {
                    context: "generation heading bins",
                    expected: num_bins,
                    actual: belief.num_bins(),
                });
            }
        }
        Ok(Self { beliefs, num_bins })
    }

    /// Uniform generation used as the initial prior.
    pub fn uniform(
        num_locations: usize,
        num_bins: usize,
        confidence: f64,
        likelihood: f64,
    ) -> Result<Self> {
        let belief = Belief::uniform(confidence, num_bins, likelihood)?;
        Self::new(vec![belief; num_locations])
    }

    /// Turn one frame's evidence reports into a generation (match count
    /// becomes confidence, likelihoods become headings).
    pub fn from_reports(reports: &[EvidenceReport]) -> Result<Self> {
        let beliefs = reports
            .iter()
            .map(|r| Belief::new(r.match_count as f64, r.heading_likelihoods.clone()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(beliefs)
    }

    pub(crate) fn from_beliefs_unchecked(beliefs: Vec<Belief>, num_bins: usize) -> Self {
        Self { beliefs, num_bins }
    }

    pub fn num_locations(&self) -> usize {
        self.beliefs.len()
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn beliefs(&self) -> &[Belief] {
        &self.beliefs
    }

    pub fn belief(&self, location: LocationId) -> Option<&Belief> {
        self.beliefs.get(location)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Belief> {
        self.beliefs.iter()
    }

    /// Verify this generation matches the run's fixed dimensions.
    pub fn ensure_shape(
        &self,
        num_locations: usize,
        num_bins: usize,
        context: &'static str,
    ) -> Result<()> {
        if self.num_locations() != num_locations {
            return Err(LocalizationError::DimensionMismatch {
                context,
                expected: num_locations,
                actual: self.num_locations(),
            });
        }
        if self.num_bins != num_bins {
            return Err(LocalizationError::DimensionMismatch {
                context,
                expected: num_bins,
                actual: self.num_bins,
            });
        }
        Ok(())
    }
}

/// Output of a measurement source for one (frame, location) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceReport {
    pub match_count: u64,
    pub heading_likelihoods: DVector<f64>,
}

impl EvidenceReport {
    /// Create a report, rejecting negative or non-finite likelihoods.
    pub fn new(
        match_count: u64,
        heading_likelihoods: DVector<f64>,
    ) -> std::result::Result<Self, MeasurementError> {
        let report = Self {
            match_count,
            heading_likelihoods,
        };
        report.validate()?;
        Ok(report)
    }

    /// Check that every likelihood is finite and non-negative.
    pub fn validate(&self) -> std::result::Result<(), MeasurementError> {
        match self
            .heading_likelihoods
            .iter()
            .find(|v| !v.is_finite() || **v < 0.0)
        {
            Some(bad) => Err(MeasurementError::InvalidEvidence(*bad)),
            None => Ok(()),
        }
    }

    /// Low-confidence stand-in for a location that was not (or could not be) queried.
    pub fn placeholder(match_count: u64, num_bins: usize, likelihood: f64) -> Self {
        Self {
            match_count,
            heading_likelihoods: DVector::from_element(num_bins, likelihood.max(0.0)),
        }
    }

    pub fn num_bins(&self) -> usize {
        self.heading_likelihoods.len()
    }
}

/// Best (location, heading) estimate extracted from a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decision {
    pub location: LocationId,
    pub heading: HeadingBin,
}

fn check_value(context: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(LocalizationError::InvalidValue { context, value })
    }
}
