use crate::candidate::{Anchor, Candidate};
use crate::dom::ElementRecord;
use crate::dom::interactive::{PRIMARY_ROLES, SECONDARY_ROLES};

/// How meaningful and maintainable a locator is to a human reader.
pub fn semantic_score(candidate: &Candidate, record: &ElementRecord) -> f64 {
    let attrs = &record.attributes;
    let mut score: f64 = 0.0;

    match &candidate.anchor {
        Anchor::TestId { .. } => score += 0.4,
        Anchor::Id(_) => score += 0.15,
        Anchor::Name { .. } => score += 0.1,
        Anchor::RoleName { via_aria, .. } => {
            score += if *via_aria { 0.1 } else { 0.2 };
        }
        Anchor::Text { .. } => score += 0.2,
        Anchor::TagClasses { .. } | Anchor::Position(_) => {}
    }

    if attrs.has_aria() {
        score += 0.3;
    }
    if record
        .role
        .as_deref()
        .is_some_and(|r| PRIMARY_ROLES.contains(&r) || SECONDARY_ROLES.contains(&r))
    {
        score += 0.2;
    }
    if attrs.alt.is_some() || attrs.title.is_some() || attrs.placeholder.is_some() {
        score += 0.15;
    }

    score.clamp(0.0, 1.0)
}
