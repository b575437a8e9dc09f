//! Feature scoring: three independent sub-scores per candidate.

pub mod base;
pub mod profile;
pub mod semantic;
pub mod stability;

pub use base::{BaseScorer, BaseSignal};
pub use profile::LocatorProfile;

use crate::candidate::{Candidate, VolatilityDetector};
use crate::dom::{ElementSet, MalformedElement};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SubScores {
    pub base: f64,
    pub stability: f64,
    pub semantic: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub scores: SubScores,
}

#[derive(Debug, Clone, Default)]
pub struct ScoringOutcome {
    pub scored: Vec<ScoredCandidate>,
    pub skipped: usize,
}

pub struct FeatureScorer<'a> {
    base: BaseScorer,
    volatility: VolatilityDetector<'a>,
}

impl<'a> FeatureScorer<'a> {
    pub fn new(base: BaseScorer, volatility: VolatilityDetector<'a>) -> Self {
        Self { base, volatility }
    }

    /// Score one candidate. A malformed source element fails only this
    /// candidate.
    pub fn score(
        &self,
        candidate: &Candidate,
        elements: &ElementSet,
    ) -> Result<SubScores, MalformedElement> {
        let record = elements
            .get(candidate.element)
            .ok_or(MalformedElement::Unknown(candidate.element))?;
        record.validate()?;

        Ok(SubScores {
            base: self.base.score(record),
            stability: stability::stability_score(candidate, elements, &self.volatility),
            semantic: semantic::semantic_score(candidate, record),
        })
    }

    pub fn score_all(&self, candidates: Vec<Candidate>, elements: &ElementSet) -> ScoringOutcome {
        let mut outcome = ScoringOutcome::default();
        for candidate in candidates {
            match self.score(&candidate, elements) {
                Ok(scores) => outcome.scored.push(ScoredCandidate { candidate, scores }),
                Err(reason) => {
                    tracing::debug!(locator = %candidate.locator, %reason, "Skipping candidate");
                    outcome.skipped += 1;
                }
            }
        }
        outcome
    }
}
