//! Heuristics for tokens that are unlikely to survive a rebuild of the page.

use crate::config::VolatilityPolicy;

#[derive(Debug, Clone, Copy)]
pub struct VolatilityDetector<'a> {
    policy: &'a VolatilityPolicy,
}

impl<'a> VolatilityDetector<'a> {
    pub fn new(policy: &'a VolatilityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &VolatilityPolicy {
        self.policy
    }

    /// True for generated-looking ids, classes and attribute values.
    pub fn is_volatile(&self, token: &str) -> bool {
        let lower = token.trim().to_ascii_lowercase();
        if lower.is_empty() {
            return false;
        }
        if self
            .policy
            .ephemeral_substrings
            .iter()
            .any(|s| !s.is_empty() && lower.contains(&s.to_ascii_lowercase()))
        {
            return true;
        }
        if self
            .policy
            .ephemeral_prefixes
            .iter()
            .any(|p| !p.is_empty() && lower.starts_with(&p.to_ascii_lowercase()))
        {
            return true;
        }
        self.has_random_run(&lower)
    }

    /// A run of letters and digits, at least `min_random_run` long, that
    /// mixes both.
    fn has_random_run(&self, token: &str) -> bool {
        token
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|run| {
                run.len() >= self.policy.min_random_run
                    && run.chars().any(|c| c.is_ascii_digit())
                    && run.chars().any(|c| c.is_ascii_alphabetic())
            })
    }

    /// True if any alphanumeric run in the locator is made only of digits.
    pub fn has_numeric_token(&self, locator: &str) -> bool {
        locator
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|run| !run.is_empty() && run.chars().all(|c| c.is_ascii_digit()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volatile_tokens() {
        let policy = VolatilityPolicy::default();
        let detector = VolatilityDetector::new(&policy);

        assert!(detector.is_volatile("css-1x2y3z"));
        assert!(detector.is_volatile("nav-weblab-banner"));
        assert!(detector.is_volatile("btn-a8f3k29d7q"));
        assert!(detector.is_volatile("ember482"));

        assert!(!detector.is_volatile("submit-button"));
        assert!(!detector.is_volatile("password"));
        assert!(!detector.is_volatile("h1"));
    }

    #[test]
    fn test_numeric_tokens() {
        let policy = VolatilityPolicy::default();
        let detector = VolatilityDetector::new(&policy);

        assert!(detector.has_numeric_token("#item-42"));
        assert!(!detector.has_numeric_token("#h1-title"));
    }

    #[test]
    fn test_random_run_threshold_is_configurable() {
        let policy = VolatilityPolicy {
            min_random_run: 4,
            ..Default::default()
        };
        let detector = VolatilityDetector::new(&policy);
        assert!(detector.is_volatile("ab12"));
    }
}
