//! Composite scoring, ordering, deduplication and per-kind buckets.

use crate::candidate::Candidate;
use crate::config::{MAX_BUCKET_SIZE, ScoringWeights};
use crate::scoring::{ScoredCandidate, SubScores};
use locus_common::LocatorKind;
use locus_common::protocol::AutoSelected;
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub scores: SubScores,
    pub composite: f64,
    /// 1-based position within its bucket.
    pub rank: usize,
    pub visual_prominence: Option<f64>,
}

impl RankedCandidate {
    pub fn locator(&self) -> &str {
        &self.candidate.locator
    }

    pub fn kind(&self) -> LocatorKind {
        self.candidate.kind
    }
}

/// Ranking order: composite descending, then shorter locator, then strategy
/// priority, then the locator text and element id so ties never depend on
/// input order.
pub fn compare(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.composite
        .total_cmp(&a.composite)
        .then_with(|| a.candidate.locator.len().cmp(&b.candidate.locator.len()))
        .then_with(|| a.candidate.strategy().cmp(&b.candidate.strategy()))
        .then_with(|| a.candidate.locator.cmp(&b.candidate.locator))
        .then_with(|| a.candidate.element.cmp(&b.candidate.element))
}

pub fn composite(weights: &ScoringWeights, scores: &SubScores) -> f64 {
    let value = weights.base * scores.base
        + weights.stability * scores.stability
        + weights.semantic * scores.semantic;
    value.clamp(0.0, 1.0)
}

/// Two ordered buckets, one per locator kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    pub css: Vec<RankedCandidate>,
    pub xpath: Vec<RankedCandidate>,
    /// Scored candidates before deduplication and truncation.
    pub considered: usize,
}

impl Ranking {
    pub fn bucket(&self, kind: LocatorKind) -> &[RankedCandidate] {
        match kind {
            LocatorKind::Css => &self.css,
            LocatorKind::Xpath => &self.xpath,
        }
    }

    fn bucket_mut(&mut self, kind: LocatorKind) -> &mut Vec<RankedCandidate> {
        match kind {
            LocatorKind::Css => &mut self.css,
            LocatorKind::Xpath => &mut self.xpath,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.css.is_empty() && self.xpath.is_empty()
    }

    pub fn len(&self) -> usize {
        self.css.len() + self.xpath.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedCandidate> {
        self.css.iter().chain(self.xpath.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RankedCandidate> {
        self.css.iter_mut().chain(self.xpath.iter_mut())
    }

    /// The best `k` candidates across both buckets.
    pub fn top(&self, k: usize) -> Vec<&RankedCandidate> {
        let mut all: Vec<&RankedCandidate> = self.iter().collect();
        all.sort_by(|a, b| compare(a, b));
        all.truncate(k);
        all
    }

    /// Move `locator` to rank 1 of its bucket, raising its score to at least
    /// the bucket maximum. Returns false when the locator is not ranked.
    pub fn promote(&mut self, kind: LocatorKind, locator: &str, boost: f64) -> bool {
        let bucket = self.bucket_mut(kind);
        let Some(pos) = bucket.iter().position(|c| c.candidate.locator == locator) else {
            return false;
        };
        let bucket_max = bucket.iter().map(|c| c.composite).fold(0.0, f64::max);

        let mut chosen = bucket.remove(pos);
        chosen.composite = bucket_max.max(chosen.composite + boost).min(1.0);
        bucket.insert(0, chosen);
        renumber(bucket);
        true
    }

    /// Rank-1 locator of each non-empty bucket.
    pub fn auto_selected(&self) -> AutoSelected {
        AutoSelected {
            css: self.css.first().map(|c| c.candidate.locator.clone()),
            xpath: self.xpath.first().map(|c| c.candidate.locator.clone()),
        }
    }
}

fn renumber(bucket: &mut [RankedCandidate]) {
    for (idx, candidate) in bucket.iter_mut().enumerate() {
        candidate.rank = idx + 1;
    }
}

pub struct RankAggregator {
    weights: ScoringWeights,
    bucket_size: usize,
}

impl RankAggregator {
    /// Invalid weights are replaced by the defaults and `bucket_size` is
    /// bounded by [`MAX_BUCKET_SIZE`], so no caller can produce out-of-range
    /// composites or oversized buckets.
    pub fn new(weights: ScoringWeights, bucket_size: usize) -> Self {
        Self {
            weights: weights.validated(),
            bucket_size: bucket_size.clamp(1, MAX_BUCKET_SIZE),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn rank(&self, scored: Vec<ScoredCandidate>) -> Ranking {
        let considered = scored.len();
        let mut all: Vec<RankedCandidate> = scored
            .into_iter()
            .map(|s| RankedCandidate {
                composite: composite(&self.weights, &s.scores),
                candidate: s.candidate,
                scores: s.scores,
                rank: 0,
                visual_prominence: None,
            })
            .collect();
        all.sort_by(compare);

        let mut seen: HashSet<(LocatorKind, String)> = HashSet::new();
        let mut ranking = Ranking {
            considered,
            ..Default::default()
        };
        for candidate in all {
            if !seen.insert((candidate.kind(), candidate.candidate.locator.clone())) {
                continue;
            }
            let bucket = ranking.bucket_mut(candidate.kind());
            if bucket.len() < self.bucket_size {
                bucket.push(candidate);
            }
        }
        renumber(&mut ranking.css);
        renumber(&mut ranking.xpath);
        ranking
    }
}
