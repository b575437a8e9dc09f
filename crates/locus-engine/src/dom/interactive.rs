//! The interactive-element allowlist.
//!
//! This is also the contract upstream capture must honour when it supplies a
//! pre-extracted element list instead of markup.

use locus_common::locator::Coverage;
use std::collections::HashMap;

pub const PRIMARY_TAGS: &[&str] = &[
    "a", "button", "input", "select", "textarea", "label", "option", "summary", "details", "form",
    "nav",
];

pub const PRIMARY_ROLES: &[&str] = &[
    "button",
    "link",
    "checkbox",
    "radio",
    "textbox",
    "searchbox",
    "combobox",
    "listbox",
    "option",
    "switch",
    "tab",
    "slider",
    "spinbutton",
    "navigation",
    "search",
    "form",
    "dialog",
];

pub const SECONDARY_TAGS: &[&str] = &[
    "img", "svg", "picture", "video", "audio", "header", "menu", "li",
];

pub const SECONDARY_ROLES: &[&str] = &[
    "menu",
    "menubar",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "banner",
    "img",
];

/// Read-only attribute lookup, implemented for every element shape the
/// builder accepts.
pub trait AttributeSource {
    fn attr(&self, name: &str) -> Option<&str>;
}

impl AttributeSource for HashMap<String, String> {
    fn attr(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl AttributeSource for scraper::node::Element {
    fn attr(&self, name: &str) -> Option<&str> {
        scraper::node::Element::attr(self, name)
    }
}

/// Whether an element qualifies for extraction.
///
/// `menu_context` tells whether the element sits inside a menu or navigation
/// container; list items only qualify there.
pub fn qualifies(
    tag: &str,
    role: Option<&str>,
    attrs: &impl AttributeSource,
    coverage: Coverage,
    menu_context: bool,
) -> bool {
    let tag = tag.to_ascii_lowercase();
    let role = role.map(|r| r.trim().to_ascii_lowercase());

    if PRIMARY_TAGS.contains(&tag.as_str()) {
        return true;
    }
    if let Some(role) = role.as_deref()
        && PRIMARY_ROLES.contains(&role)
    {
        return true;
    }
    if has_interaction_attribute(attrs) {
        return true;
    }

    if coverage == Coverage::Full {
        if tag == "li" {
            return menu_context;
        }
        if SECONDARY_TAGS.contains(&tag.as_str()) {
            return true;
        }
        if let Some(role) = role.as_deref()
            && SECONDARY_ROLES.contains(&role)
        {
            return true;
        }
    }
    false
}

fn has_interaction_attribute(attrs: &impl AttributeSource) -> bool {
    if attrs.attr("onclick").is_some() {
        return true;
    }
    if let Some(tabindex) = attrs.attr("tabindex")
        && tabindex.trim() != "-1"
    {
        return true;
    }
    attrs
        .attr("contenteditable")
        .is_some_and(|v| !v.trim().eq_ignore_ascii_case("false"))
}

/// True for containers whose list items count as menu entries.
pub fn is_menu_container(tag: &str, role: Option<&str>) -> bool {
    matches!(tag, "menu" | "nav")
        || role.is_some_and(|r| matches!(r, "menu" | "menubar" | "navigation"))
}
