//! Element extraction from a pre-extracted element list.
//!
//! Lists come from upstream capture that already applied the interactive
//! allowlist, so only visibility and geometry are re-checked here. Elements
//! with a missing or broken tag are kept: they surface later as per-candidate
//! skips rather than silently disappearing.

use super::record::{ElementAttributes, ElementRecord, PathSegment};
use super::{ElementSet, ElementSetBuilder};
use locus_common::locator::{normalize_whitespace, truncate_chars};
use locus_common::protocol::ElementInput;
use regex::Regex;
use std::sync::LazyLock;

static PATH_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9-]*)(?:\[(\d+)\])?$").unwrap());

pub(super) fn extract(elements: &[ElementInput], text_limit: usize, max_elements: usize) -> ElementSet {
    let mut set = ElementSetBuilder::new(max_elements);

    for input in elements {
        set.saw_element();
        if set.is_full() {
            continue;
        }
        if input.visible == Some(false) {
            continue;
        }
        if input.rect.is_some_and(|r| r.is_finite() && r.area() <= 0.0) {
            continue;
        }

        let tag = input
            .tag
            .as_deref()
            .map(|t| t.trim().to_ascii_lowercase())
            .unwrap_or_default();
        let attributes = ElementAttributes::from_pairs(&input.attributes);
        if tag == "input" && attributes.input_type.as_deref() == Some("hidden") {
            continue;
        }

        let text = input
            .text
            .as_deref()
            .map(normalize_whitespace)
            .filter(|t| !t.is_empty())
            .map(|t| truncate_chars(&t, text_limit));
        let role = input
            .role
            .as_deref()
            .or_else(|| attributes.get("role"))
            .map(|r| r.trim().to_ascii_lowercase())
            .filter(|r| !r.is_empty());
        let accessible_name = input
            .accessible_name
            .as_deref()
            .map(normalize_whitespace)
            .filter(|n| !n.is_empty())
            .or_else(|| {
                attributes
                    .aria_label
                    .clone()
                    .or_else(|| attributes.alt.clone())
                    .or_else(|| attributes.title.clone())
                    .or_else(|| attributes.placeholder.clone())
                    .or_else(|| text.clone())
            });

        let parsed_path = input.xpath.as_deref().and_then(parse_absolute_path);
        let sibling_index = input
            .sibling_index
            .or_else(|| parsed_path.as_ref().and_then(|p| p.last().map(|s| s.index)))
            .unwrap_or(1)
            .max(1);
        let path = parsed_path.unwrap_or_else(|| {
            if tag.is_empty() {
                Vec::new()
            } else {
                vec![PathSegment::new(tag.clone(), sibling_index)]
            }
        });

        set.push(ElementRecord {
            id: 0,
            tag,
            text,
            accessible_name,
            role,
            attributes,
            rect: input.rect,
            sibling_index,
            path,
            visible: true,
        });
    }

    set.finish()
}

/// Parse `/html/body/div[2]/button` into segments. Anything that is not a
/// plain absolute positional path yields `None`.
pub fn parse_absolute_path(xpath: &str) -> Option<Vec<PathSegment>> {
    let trimmed = xpath.trim();
    let rest = trimmed.strip_prefix('/')?;
    if rest.is_empty() || rest.starts_with('/') {
        return None;
    }

    rest.split('/')
        .map(|step| {
            let caps = PATH_SEGMENT_RE.captures(step)?;
            let index = match caps.get(2) {
                Some(m) => m.as_str().parse::<u32>().ok().filter(|i| *i > 0)?,
                None => 1,
            };
            Some(PathSegment::new(caps[1].to_ascii_lowercase(), index))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use locus_common::protocol::Rect;

    #[test]
    fn test_parse_absolute_path() {
        let path = parse_absolute_path("/html/body/div[2]/button").unwrap();
        let flat: Vec<(&str, u32)> = path.iter().map(|s| (s.tag.as_str(), s.index)).collect();
        assert_eq!(flat, vec![("html", 1), ("body", 1), ("div", 2), ("button", 1)]);

        assert!(parse_absolute_path("//button[@id='x']").is_none());
        assert!(parse_absolute_path("/html/body/div[0]").is_none());
        assert!(parse_absolute_path("button").is_none());
    }

    #[test]
    fn test_zero_area_and_invisible_dropped() {
        let inputs = vec![
            ElementInput::new("button").rect(Rect::new(0.0, 0.0, 0.0, 20.0)),
            ElementInput {
                visible: Some(false),
                ..ElementInput::new("button")
            },
            ElementInput::new("button").text("Keep"),
        ];
        let set = extract(&inputs, 150, 250);
        assert_eq!(set.total_elements, 3);
        assert_eq!(set.records.len(), 1);
        assert_eq!(set.records[0].text.as_deref(), Some("Keep"));
    }

    #[test]
    fn test_missing_tag_is_kept_for_skip_accounting() {
        let set = extract(&[ElementInput::default().attr("id", "x")], 150, 250);
        assert_eq!(set.records.len(), 1);
        assert!(set.records[0].validate().is_err());
    }
}
