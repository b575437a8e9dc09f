//! Rule-based estimate of how well a locator survives unrelated UI changes.

use crate::candidate::{Anchor, Candidate, VolatilityDetector};
use crate::dom::ElementSet;

const START: f64 = 0.6;

const TEST_ID_BONUS: f64 = 0.3;
const ID_BONUS: f64 = 0.15;
const NAME_BONUS: f64 = 0.1;
const ARIA_BONUS: f64 = 0.1;
const ROLE_BONUS: f64 = 0.05;
const SEMANTIC_TAG_BONUS: f64 = 0.05;
const SHORT_LOCATOR_BONUS: f64 = 0.05;
const SHORT_TEXT_BONUS: f64 = 0.05;

const VOLATILE_PENALTY: f64 = 0.4;
const NUMERIC_PENALTY: f64 = 0.2;
const POSITIONAL_PENALTY: f64 = 0.3;
const DEPTH_PENALTY: f64 = 0.15;
const TEXT_PENALTY: f64 = 0.05;
const REPEATED_TEXT_PENALTY: f64 = 0.2;

const SHORT_TEXT_CHARS: usize = 20;

/// Tags whose meaning does not change between redesigns.
pub const SEMANTIC_TAGS: &[&str] = &[
    "a", "button", "input", "select", "textarea", "label", "form", "nav", "option", "summary",
    "details", "header", "footer", "main", "img", "video", "audio",
];

pub fn stability_score(
    candidate: &Candidate,
    elements: &ElementSet,
    volatility: &VolatilityDetector<'_>,
) -> f64 {
    let policy = volatility.policy();
    let mut score = START;

    match &candidate.anchor {
        Anchor::TestId { value, .. } => {
            score += TEST_ID_BONUS;
            if volatility.is_volatile(value) {
                score -= VOLATILE_PENALTY;
            }
        }
        Anchor::Id(_) => score += ID_BONUS,
        Anchor::Name { tag, .. } => {
            score += NAME_BONUS;
            if SEMANTIC_TAGS.contains(&tag.as_str()) {
                score += SEMANTIC_TAG_BONUS;
            }
        }
        Anchor::RoleName { name, via_aria, .. } => {
            score += ROLE_BONUS;
            if *via_aria {
                score += ARIA_BONUS;
            } else {
                score -= text_penalty(name, elements);
            }
            if volatility.is_volatile(name) {
                score -= VOLATILE_PENALTY;
            }
        }
        Anchor::TagClasses { tag, .. } => {
            if SEMANTIC_TAGS.contains(&tag.as_str()) {
                score += SEMANTIC_TAG_BONUS;
            }
        }
        Anchor::Text { tag, text } => {
            if SEMANTIC_TAGS.contains(&tag.as_str()) {
                score += SEMANTIC_TAG_BONUS;
            }
            score -= text_penalty(text, elements);
            if text.chars().count() <= SHORT_TEXT_CHARS {
                score += SHORT_TEXT_BONUS;
            }
            if volatility.is_volatile(text) {
                score -= VOLATILE_PENALTY;
            }
        }
        Anchor::Position(path) => {
            score -= POSITIONAL_PENALTY;
            if path.len() > policy.max_nesting_depth {
                score -= DEPTH_PENALTY;
            }
        }
    }

    let positional = matches!(candidate.anchor, Anchor::Position(_));
    if !positional && volatility.has_numeric_token(&candidate.locator) {
        score -= NUMERIC_PENALTY;
    }
    if candidate.locator.chars().count() <= policy.short_locator_len {
        score += SHORT_LOCATOR_BONUS;
    }

    score.clamp(0.0, 1.0)
}

fn text_penalty(text: &str, elements: &ElementSet) -> f64 {
    if elements.text_frequency(text) > 1 {
        TEXT_PENALTY + REPEATED_TEXT_PENALTY
    } else {
        TEXT_PENALTY
    }
}
