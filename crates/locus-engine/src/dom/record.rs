use locus_common::locator::normalize_text;
use locus_common::protocol::Rect;
use std::collections::BTreeMap;
use thiserror::Error;

pub type ElementId = u32;

/// Attributes recognised as explicit test hooks, in preference order.
pub const TEST_ID_ATTRIBUTES: [&str; 6] = [
    "data-testid",
    "data-test-id",
    "data-test",
    "data-qa",
    "data-cy",
    "data-automation-id",
];

/// One step of a positional path: tag plus 1-based index among same-tag siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub tag: String,
    pub index: u32,
}

impl PathSegment {
    pub fn new(tag: impl Into<String>, index: u32) -> Self {
        Self {
            tag: tag.into(),
            index,
        }
    }
}

/// Typed view of an element's attributes.
///
/// Attributes the scorer and generator reason about get first-class fields;
/// everything else lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementAttributes {
    pub id: Option<String>,
    pub name: Option<String>,
    pub classes: Vec<String>,
    /// (attribute name, value) of the preferred test hook.
    pub test_id: Option<(String, String)>,
    pub aria_label: Option<String>,
    pub placeholder: Option<String>,
    pub title: Option<String>,
    pub alt: Option<String>,
    pub input_type: Option<String>,
    pub href: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl ElementAttributes {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut attrs = ElementAttributes::default();
        let mut test_hooks: Vec<(String, String)> = Vec::new();

        for (key, value) in pairs {
            let key = key.as_ref().trim().to_ascii_lowercase();
            let value = value.as_ref().trim().to_string();
            if key.is_empty() {
                continue;
            }
            let non_empty = (!value.is_empty()).then(|| value.clone());
            match key.as_str() {
                "id" => attrs.id = non_empty,
                "name" => attrs.name = non_empty,
                "class" => {
                    attrs.classes = value.split_whitespace().map(str::to_string).collect();
                }
                "aria-label" => attrs.aria_label = non_empty,
                "placeholder" => attrs.placeholder = non_empty,
                "title" => attrs.title = non_empty,
                "alt" => attrs.alt = non_empty,
                "type" => attrs.input_type = non_empty.map(|t| t.to_ascii_lowercase()),
                "href" => attrs.href = non_empty,
                k if TEST_ID_ATTRIBUTES.contains(&k) => {
                    if !value.is_empty() {
                        test_hooks.push((key.clone(), value.clone()));
                    }
                    attrs.extra.insert(key, value);
                }
                _ => {
                    attrs.extra.insert(key, value);
                }
            }
        }

        attrs.test_id = TEST_ID_ATTRIBUTES
            .iter()
            .find_map(|pref| test_hooks.iter().find(|(k, _)| k == pref).cloned());
        attrs
    }

    /// Look up any attribute by name, first-class or not.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "id" => self.id.as_deref(),
            "name" => self.name.as_deref(),
            "aria-label" => self.aria_label.as_deref(),
            "placeholder" => self.placeholder.as_deref(),
            "title" => self.title.as_deref(),
            "alt" => self.alt.as_deref(),
            "type" => self.input_type.as_deref(),
            "href" => self.href.as_deref(),
            _ => self.extra.get(key).map(String::as_str),
        }
    }

    /// True if the element carries any `aria-*` attribute.
    pub fn has_aria(&self) -> bool {
        self.aria_label.is_some() || self.extra.keys().any(|k| k.starts_with("aria-"))
    }
}

/// Why an element cannot be scored.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MalformedElement {
    #[error("element {0} is not part of the element set")]
    Unknown(ElementId),
    #[error("element {0} has no tag name")]
    MissingTag(ElementId),
    #[error("element {0} has an invalid tag name '{1}'")]
    InvalidTag(ElementId, String),
    #[error("element {0} has a non-finite bounding box")]
    InvalidRect(ElementId),
}

/// Canonical, request-scoped description of one interactive element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRecord {
    pub id: ElementId,
    pub tag: String,
    pub text: Option<String>,
    pub accessible_name: Option<String>,
    /// Explicit `role` attribute.
    pub role: Option<String>,
    pub attributes: ElementAttributes,
    pub rect: Option<Rect>,
    pub sibling_index: u32,
    pub path: Vec<PathSegment>,
    pub visible: bool,
}

impl ElementRecord {
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn validate(&self) -> Result<(), MalformedElement> {
        if self.tag.is_empty() {
            return Err(MalformedElement::MissingTag(self.id));
        }
        if !self
            .tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(MalformedElement::InvalidTag(self.id, self.tag.clone()));
        }
        if self.rect.is_some_and(|r| !r.is_finite()) {
            return Err(MalformedElement::InvalidRect(self.id));
        }
        Ok(())
    }

    /// Values that identify this element to a human or a locator.
    pub fn identifier_values(&self) -> Vec<&str> {
        let attrs = &self.attributes;
        let mut values: Vec<&str> = [
            attrs.id.as_deref(),
            attrs.name.as_deref(),
            attrs.test_id.as_ref().map(|(_, v)| v.as_str()),
            attrs.aria_label.as_deref(),
            attrs.placeholder.as_deref(),
            attrs.title.as_deref(),
            attrs.alt.as_deref(),
            self.text.as_deref(),
            self.role.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        values.extend(attrs.classes.iter().map(String::as_str));
        values
    }

    /// Lowercase word tokens drawn from every identifier value plus the tag.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self
            .identifier_values()
            .into_iter()
            .flat_map(tokenize)
            .collect();
        tokens.push(self.tag.clone());
        tokens.sort();
        tokens.dedup();
        tokens
    }

    /// Normalized visible text, if any.
    pub fn normalized_text(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(normalize_text)
            .filter(|t| !t.is_empty())
    }
}

/// Split an identifier or phrase into lowercase word tokens.
///
/// `submitButton`, `submit-button` and `submit_button` all yield
/// `["submit", "button"]`.
pub fn tokenize(value: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in value.chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() && prev_lower && !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
            current.extend(c.to_lowercase());
        } else {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = false;
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens.retain(|t| t.chars().count() >= 2);
    tokens
}
