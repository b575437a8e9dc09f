//! What a failed locator said about the element it used to find.

use crate::dom::tokenize;
use locus_common::locator::is_xpath;
use regex::Regex;
use std::sync::LazyLock;

static CSS_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\[\s*([A-Za-z_:][-A-Za-z0-9_:.]*)\s*(?:[~|^$*]?=\s*(?:'([^']*)'|"([^"]*)"|([^\]\s]+))\s*)?\]"#,
    )
    .unwrap()
});

static CSS_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#":(?:has-text|contains|text-is)\(\s*(?:"([^"]*)"|'([^']*)')\s*\)"#).unwrap()
});

static CSS_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#([A-Za-z0-9_-]+)").unwrap());

static CSS_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(-?[A-Za-z_][A-Za-z0-9_-]*)").unwrap());

static LEADING_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9-]*)").unwrap());

static XPATH_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:'([^']*)'|"([^"]*)")"#).unwrap()
});

static XPATH_CONTAINS_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"contains\(\s*@([A-Za-z_:][-A-Za-z0-9_:.]*)\s*,\s*(?:'([^']*)'|"([^"]*)")\s*\)"#)
        .unwrap()
});

static XPATH_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:text\(\)|normalize-space\(\s*(?:text\(\)|\.)?\s*\)|\.)\s*=\s*(?:'([^']*)'|"([^"]*)")"#,
    )
    .unwrap()
});

static XPATH_CONTAINS_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"contains\(\s*(?:text\(\)|\.)\s*,\s*(?:'([^']*)'|"([^"]*)")\s*\)"#).unwrap()
});

/// Identity facts parsed from a locator string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocatorProfile {
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    /// Attribute (name, value) pairs other than `id` and `class`.
    pub attributes: Vec<(String, String)>,
    pub texts: Vec<String>,
    /// Lowercase word tokens from every value above.
    pub tokens: Vec<String>,
}

impl LocatorProfile {
    pub fn parse(locator: &str) -> Self {
        let locator = locator.trim();
        let mut profile = if is_xpath(locator) {
            Self::parse_xpath(locator)
        } else {
            Self::parse_css(locator)
        };
        profile.collect_tokens();
        profile
    }

    /// Identity overlap can only be computed when the locator named something.
    pub fn has_identity(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Every identifying value, in no particular order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.ids
            .iter()
            .chain(self.classes.iter())
            .chain(self.attributes.iter().map(|(_, v)| v))
            .chain(self.texts.iter())
            .map(String::as_str)
    }

    fn record_attribute(&mut self, name: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match name.to_ascii_lowercase().as_str() {
            "id" => self.ids.push(value.to_string()),
            "class" => self
                .classes
                .extend(value.split_whitespace().map(str::to_string)),
            other => self.attributes.push((other.to_string(), value.to_string())),
        }
    }

    fn parse_css(locator: &str) -> Self {
        let mut profile = Self::default();

        for caps in CSS_ATTR_RE.captures_iter(locator) {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            profile.record_attribute(&caps[1], value);
        }
        for caps in CSS_TEXT_RE.captures_iter(locator) {
            if let Some(text) = caps.get(1).or_else(|| caps.get(2)) {
                profile.texts.push(text.as_str().trim().to_string());
            }
        }

        let stripped = CSS_TEXT_RE.replace_all(locator, " ");
        let stripped = CSS_ATTR_RE.replace_all(&stripped, " ");
        profile
            .ids
            .extend(CSS_ID_RE.captures_iter(&stripped).map(|c| c[1].to_string()));
        profile
            .classes
            .extend(CSS_CLASS_RE.captures_iter(&stripped).map(|c| c[1].to_string()));

        let last_compound = stripped
            .split(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~'))
            .filter(|s| !s.is_empty())
            .last()
            .unwrap_or("");
        profile.tag = LEADING_TAG_RE
            .captures(last_compound)
            .map(|c| c[1].to_ascii_lowercase());
        profile
    }

    fn parse_xpath(locator: &str) -> Self {
        let mut profile = Self::default();

        for caps in XPATH_ATTR_RE
            .captures_iter(locator)
            .chain(XPATH_CONTAINS_ATTR_RE.captures_iter(locator))
        {
            let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            profile.record_attribute(&caps[1], value);
        }
        for caps in XPATH_TEXT_RE
            .captures_iter(locator)
            .chain(XPATH_CONTAINS_TEXT_RE.captures_iter(locator))
        {
            if let Some(text) = caps.get(1).or_else(|| caps.get(2)) {
                profile.texts.push(text.as_str().trim().to_string());
            }
        }

        let steps = strip_predicates(locator);
        profile.tag = steps
            .rsplit('/')
            .find(|s| !s.trim().is_empty())
            .and_then(|step| {
                let step = step.trim().trim_end_matches(')');
                let node_test = step.rsplit("::").next().unwrap_or(step);
                LEADING_TAG_RE
                    .captures(node_test)
                    .filter(|c| c[1].len() == node_test.len())
                    .map(|c| c[1].to_ascii_lowercase())
            });
        profile
    }

    fn collect_tokens(&mut self) {
        let mut tokens: Vec<String> = self.identifiers().flat_map(tokenize).collect();
        tokens.sort();
        tokens.dedup();
        self.tokens = tokens;
    }
}

/// Drop every `[...]` predicate, honouring nesting.
fn strip_predicates(xpath: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(xpath.len());
    for c in xpath.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_profile() {
        let profile = LocatorProfile::parse("form#login > button.btn.submit-btn[data-testid='go']");
        assert_eq!(profile.ids, vec!["login"]);
        assert_eq!(profile.classes, vec!["btn", "submit-btn"]);
        assert_eq!(
            profile.attributes,
            vec![("data-testid".to_string(), "go".to_string())]
        );
        assert_eq!(profile.tag.as_deref(), Some("button"));
        assert!(profile.tokens.contains(&"submit".to_string()));
    }

    #[test]
    fn test_css_text_profile() {
        let profile = LocatorProfile::parse(r#"a:has-text("Sign in")"#);
        assert_eq!(profile.texts, vec!["Sign in"]);
        assert_eq!(profile.tag.as_deref(), Some("a"));
    }

    #[test]
    fn test_xpath_profile() {
        let profile = LocatorProfile::parse(
            "//div[@class='panel']//button[@id='save-btn' and normalize-space()='Save']",
        );
        assert_eq!(profile.ids, vec!["save-btn"]);
        assert_eq!(profile.classes, vec!["panel"]);
        assert_eq!(profile.texts, vec!["Save"]);
        assert_eq!(profile.tag.as_deref(), Some("button"));
    }

    #[test]
    fn test_positional_xpath_has_no_identity() {
        let profile = LocatorProfile::parse("/html/body/div[3]/button[2]");
        assert!(!profile.has_identity());
        assert_eq!(profile.tag.as_deref(), Some("button"));
    }
}
