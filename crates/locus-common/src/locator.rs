//! Locator kinds and the small string helpers shared by every crate that
//! writes or reads locator expressions.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// The two locator families a heal produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKind {
    /// Structural, CSS-style.
    Css,
    /// Path-based, XPath-style.
    Xpath,
}

impl LocatorKind {
    pub const ALL: [LocatorKind; 2] = [LocatorKind::Css, LocatorKind::Xpath];

    pub fn name(&self) -> &'static str {
        match self {
            LocatorKind::Css => "css",
            LocatorKind::Xpath => "xpath",
        }
    }
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which locator families the caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKindHint {
    Css,
    Xpath,
    #[default]
    Mixed,
}

impl LocatorKindHint {
    pub fn allows(&self, kind: LocatorKind) -> bool {
        match self {
            LocatorKindHint::Mixed => true,
            LocatorKindHint::Css => kind == LocatorKind::Css,
            LocatorKindHint::Xpath => kind == LocatorKind::Xpath,
        }
    }
}

/// Extraction breadth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    /// Form and control elements only.
    #[default]
    Narrow,
    /// Every interactive element, including images, menus and banners.
    Full,
}

static CSS_IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[A-Za-z_][A-Za-z0-9_-]*$").unwrap());

/// Heuristic XPath detection for a raw locator string.
pub fn is_xpath(locator: &str) -> bool {
    let trimmed = locator.trim();
    trimmed.starts_with('/')
        || trimmed.starts_with("(/")
        || trimmed.starts_with("./")
        || trimmed.contains("//")
        || (trimmed.contains('@') && trimmed.contains('[') && trimmed.contains(']'))
}

/// True when `value` can be written after `#` or `.` without escaping.
pub fn is_css_identifier(value: &str) -> bool {
    CSS_IDENT_RE.is_match(value)
}

/// Single-quoted CSS string literal.
pub fn css_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// Double-quoted literal used inside `:has-text(...)`.
pub fn css_text(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// XPath string literal. XPath 1.0 has no escape sequence, so values holding
/// both quote kinds are assembled with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Collapse whitespace runs and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased, whitespace-normalized text used for comparisons.
pub fn normalize_text(text: &str) -> String {
    normalize_whitespace(&text.to_lowercase())
}

/// Cut `text` to at most `limit` characters on a char boundary.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_xpath() {
        assert!(is_xpath("//button[@id='x']"));
        assert!(is_xpath("/html/body/div[2]"));
        assert!(is_xpath("(//a)[3]"));
        assert!(!is_xpath("#submit"));
        assert!(!is_xpath("button.primary > span"));
        assert!(!is_xpath("[data-testid='x']"));
    }

    #[test]
    fn test_xpath_literal_quotes() {
        assert_eq!(xpath_literal("Save"), "'Save'");
        assert_eq!(xpath_literal("Don't"), "\"Don't\"");
        assert_eq!(
            xpath_literal(r#"a'b"c"#),
            r#"concat('a', "'", 'b"c')"#
        );
    }

    #[test]
    fn test_css_helpers() {
        assert!(is_css_identifier("submit-btn"));
        assert!(!is_css_identifier("1st"));
        assert!(!is_css_identifier("a:b"));
        assert_eq!(css_string("it's"), r"'it\'s'");
        assert_eq!(css_text(r#"say "hi""#), r#""say \"hi\"""#);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_hint_allows() {
        assert!(LocatorKindHint::Mixed.allows(LocatorKind::Xpath));
        assert!(LocatorKindHint::Css.allows(LocatorKind::Css));
        assert!(!LocatorKindHint::Css.allows(LocatorKind::Xpath));
    }
}
