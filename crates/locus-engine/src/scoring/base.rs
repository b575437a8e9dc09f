//! Base similarity between an element and the failure context.

use super::profile::LocatorProfile;
use crate::dom::{ElementRecord, tokenize};
use strsim::{jaro_winkler, normalized_levenshtein};

pub const NEUTRAL_SCORE: f64 = 0.5;

/// Words that carry no identity in a usage description.
const STOP_WORDS: &[&str] = &[
    "click", "on", "the", "a", "an", "to", "for", "of", "in", "and", "or", "with", "button",
    "link", "field", "input", "select", "this", "that", "into", "from", "as",
];

/// How the base score is being derived for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseSignal {
    Identity,
    Usage,
    Neutral,
}

pub struct BaseScorer {
    profile: LocatorProfile,
    keywords: Vec<String>,
}

impl BaseScorer {
    pub fn new(failed_selector: &str, usage: Option<&str>) -> Self {
        Self {
            profile: LocatorProfile::parse(failed_selector),
            keywords: usage.map(usage_keywords).unwrap_or_default(),
        }
    }

    pub fn signal(&self) -> BaseSignal {
        if self.profile.has_identity() {
            BaseSignal::Identity
        } else if !self.keywords.is_empty() {
            BaseSignal::Usage
        } else {
            BaseSignal::Neutral
        }
    }

    pub fn profile(&self) -> &LocatorProfile {
        &self.profile
    }

    pub fn score(&self, record: &ElementRecord) -> f64 {
        let score = match self.signal() {
            BaseSignal::Identity => self.identity_score(record),
            BaseSignal::Usage => self.usage_score(record),
            BaseSignal::Neutral => NEUTRAL_SCORE,
        };
        score.clamp(0.0, 1.0)
    }

    fn identity_score(&self, record: &ElementRecord) -> f64 {
        let element_values: Vec<String> = record
            .identifier_values()
            .into_iter()
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .collect();
        let wanted: Vec<String> = self
            .profile
            .identifiers()
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .collect();

        if wanted.iter().any(|w| element_values.contains(w)) {
            return 1.0;
        }

        let fuzzy = wanted
            .iter()
            .flat_map(|w| element_values.iter().map(move |e| normalized_levenshtein(w, e)))
            .fold(0.0, f64::max);

        let element_tokens = record.tokens();
        let covered = self
            .profile
            .tokens
            .iter()
            .filter(|t| element_tokens.contains(t))
            .count();
        let coverage = covered as f64 / self.profile.tokens.len().max(1) as f64;

        let tag = match &self.profile.tag {
            Some(tag) if *tag == record.tag => 1.0,
            Some(_) => 0.0,
            None => NEUTRAL_SCORE,
        };

        0.5 * fuzzy + 0.4 * coverage + 0.1 * tag
    }

    fn usage_score(&self, record: &ElementRecord) -> f64 {
        let mut element_tokens = record.tokens();
        if let Some(name) = &record.accessible_name {
            element_tokens.extend(tokenize(name));
        }
        if element_tokens.is_empty() {
            return 0.0;
        }

        let covered = self
            .keywords
            .iter()
            .filter(|k| element_tokens.contains(k))
            .count();
        let coverage = covered as f64 / self.keywords.len() as f64;

        let best = self
            .keywords
            .iter()
            .flat_map(|k| element_tokens.iter().map(move |t| jaro_winkler(k, t)))
            .fold(0.0, f64::max);

        0.7 * coverage + 0.3 * best
    }
}

/// Meaningful words of a usage description.
pub fn usage_keywords(usage: &str) -> Vec<String> {
    let mut keywords: Vec<String> = tokenize(usage)
        .into_iter()
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(&w.as_str()))
        .collect();
    keywords.dedup();
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementAttributes;

    fn input(id: &str) -> ElementRecord {
        ElementRecord {
            id: 0,
            tag: "input".into(),
            text: None,
            accessible_name: None,
            role: None,
            attributes: ElementAttributes::from_pairs([("id", id)]),
            rect: None,
            sibling_index: 1,
            path: vec![],
            visible: true,
        }
    }

    #[test]
    fn test_usage_keywords_drop_stop_words() {
        assert_eq!(usage_keywords("Click on the Login button"), vec!["login"]);
        assert_eq!(usage_keywords("focus on password field"), vec!["focus", "password"]);
    }

    #[test]
    fn test_exact_identifier_match() {
        let scorer = BaseScorer::new("#password", None);
        assert_eq!(scorer.signal(), BaseSignal::Identity);
        assert_eq!(scorer.score(&input("password")), 1.0);
    }

    #[test]
    fn test_identity_prefers_closer_element() {
        let scorer = BaseScorer::new("input#user-name-old", None);
        let close = scorer.score(&input("user-name"));
        let far = scorer.score(&input("zip"));
        assert!(close > far, "{close} <= {far}");
    }

    #[test]
    fn test_usage_and_neutral_fallbacks() {
        let usage = BaseScorer::new("/html/body/div[2]/input[1]", Some("type the password"));
        assert_eq!(usage.signal(), BaseSignal::Usage);
        assert!(usage.score(&input("password")) > usage.score(&input("email")));

        let neutral = BaseScorer::new("/html/body/div[2]/input[1]", None);
        assert_eq!(neutral.score(&input("anything")), NEUTRAL_SCORE);
    }
}
