//! Element extraction from raw page markup.

use super::interactive;
use super::record::{ElementAttributes, ElementRecord, PathSegment};
use super::{ElementSet, ElementSetBuilder};
use locus_common::locator::{Coverage, normalize_whitespace, truncate_chars};
use scraper::{ElementRef, Html};
use std::collections::HashMap;

pub(super) fn extract(
    markup: &str,
    coverage: Coverage,
    text_limit: usize,
    max_elements: usize,
) -> ElementSet {
    let document = Html::parse_document(markup);
    let elements: Vec<ElementRef<'_>> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect();

    let labels = label_texts(&elements);
    let mut set = ElementSetBuilder::new(max_elements);

    for element in &elements {
        set.saw_element();
        if set.is_full() {
            continue;
        }

        let value = element.value();
        let tag = value.name().to_ascii_lowercase();
        let role = value.attr("role");
        if !interactive::qualifies(&tag, role, value, coverage, in_menu(element)) {
            continue;
        }
        if is_hidden(element) {
            continue;
        }

        let attributes = ElementAttributes::from_pairs(value.attrs());
        let text = visible_text(element, text_limit);
        let accessible_name = accessible_name(&attributes, &labels, text.as_deref());
        let path = position_path(element);
        let sibling_index = path.last().map_or(1, |segment| segment.index);

        set.push(ElementRecord {
            id: 0,
            tag,
            text,
            accessible_name,
            role: role.map(|r| r.trim().to_ascii_lowercase()).filter(|r| !r.is_empty()),
            attributes,
            rect: None,
            sibling_index,
            path,
            visible: true,
        });
    }

    set.finish()
}

/// Map of control id to the text of a `<label for="...">` naming it.
fn label_texts(elements: &[ElementRef<'_>]) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    for element in elements {
        if element.value().name() != "label" {
            continue;
        }
        let Some(target) = element.value().attr("for") else {
            continue;
        };
        let text = normalize_whitespace(&element.text().collect::<String>());
        if !text.is_empty() {
            labels.entry(target.trim().to_string()).or_insert(text);
        }
    }
    labels
}

fn visible_text(element: &ElementRef<'_>, limit: usize) -> Option<String> {
    let text = normalize_whitespace(&element.text().collect::<String>());
    (!text.is_empty()).then(|| truncate_chars(&text, limit))
}

fn accessible_name(
    attributes: &ElementAttributes,
    labels: &HashMap<String, String>,
    text: Option<&str>,
) -> Option<String> {
    attributes
        .aria_label
        .clone()
        .or_else(|| attributes.alt.clone())
        .or_else(|| attributes.title.clone())
        .or_else(|| attributes.placeholder.clone())
        .or_else(|| attributes.id.as_ref().and_then(|id| labels.get(id).cloned()))
        .or_else(|| text.map(str::to_string))
}

fn hides_itself(element: &scraper::node::Element) -> bool {
    if element.attr("hidden").is_some() {
        return true;
    }
    if element
        .attr("aria-hidden")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    {
        return true;
    }
    if let Some(style) = element.attr("style") {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        if style.contains("display:none") || style.contains("visibility:hidden") {
            return true;
        }
    }
    false
}

fn is_hidden(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if value.name().eq_ignore_ascii_case("input")
        && value
            .attr("type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden"))
    {
        return true;
    }
    hides_itself(value)
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| hides_itself(ancestor.value()))
}

fn in_menu(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| {
            let value = ancestor.value();
            interactive::is_menu_container(value.name(), value.attr("role"))
        })
}

fn segment_for(element: &ElementRef<'_>) -> PathSegment {
    let tag = element.value().name().to_ascii_lowercase();
    let preceding = element
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| sibling.value().name().eq_ignore_ascii_case(&tag))
        .count();
    PathSegment::new(tag, preceding as u32 + 1)
}

/// Root-to-element path of (tag, same-tag sibling index) segments.
fn position_path(element: &ElementRef<'_>) -> Vec<PathSegment> {
    let mut path: Vec<PathSegment> = element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .map(|ancestor| segment_for(&ancestor))
        .collect();
    path.reverse();
    path.push(segment_for(element));
    path
}
