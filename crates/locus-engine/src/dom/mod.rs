//! Element model builder.
//!
//! Turns raw markup or a pre-extracted element list into a bounded,
//! canonical set of interactive [`ElementRecord`]s.

mod elements;
pub mod interactive;
mod markup;
pub mod record;

pub use elements::parse_absolute_path;
pub use record::{
    ElementAttributes, ElementId, ElementRecord, MalformedElement, PathSegment, TEST_ID_ATTRIBUTES,
    tokenize,
};

use crate::config::ExtractionConfig;
use locus_common::locator::{Coverage, normalize_text};
use locus_common::protocol::HealRequest;
use std::collections::HashMap;

/// The request-scoped element model.
#[derive(Debug, Clone, Default)]
pub struct ElementSet {
    pub records: Vec<ElementRecord>,
    /// Every element seen in the input, kept or not.
    pub total_elements: usize,
    text_counts: HashMap<String, usize>,
}

impl ElementSet {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, id: ElementId) -> Option<&ElementRecord> {
        self.records.get(id as usize)
    }

    /// How many records carry this (normalized) visible text.
    pub fn text_frequency(&self, text: &str) -> usize {
        self.text_counts
            .get(&normalize_text(text))
            .copied()
            .unwrap_or(0)
    }
}

/// Accumulates records while enforcing the element cap.
pub(crate) struct ElementSetBuilder {
    max_elements: usize,
    set: ElementSet,
}

impl ElementSetBuilder {
    pub(crate) fn new(max_elements: usize) -> Self {
        Self {
            max_elements,
            set: ElementSet::default(),
        }
    }

    pub(crate) fn saw_element(&mut self) {
        self.set.total_elements += 1;
    }

    pub(crate) fn is_full(&self) -> bool {
        self.set.records.len() >= self.max_elements
    }

    pub(crate) fn push(&mut self, mut record: ElementRecord) {
        record.id = self.set.records.len() as ElementId;
        if let Some(text) = record.normalized_text() {
            *self.set.text_counts.entry(text).or_insert(0) += 1;
        }
        self.set.records.push(record);
    }

    pub(crate) fn finish(self) -> ElementSet {
        self.set
    }
}

pub struct ElementModelBuilder<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> ElementModelBuilder<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    /// Build from whichever page source the request carries. An element
    /// list wins over markup when both are present.
    pub fn build(&self, request: &HealRequest) -> ElementSet {
        if let Some(elements) = &request.element_list {
            return self.from_elements(elements);
        }
        match request.markup.as_deref() {
            Some(markup) => self.from_markup(markup, request.coverage),
            None => ElementSet::default(),
        }
    }

    pub fn from_markup(&self, markup: &str, coverage: Coverage) -> ElementSet {
        let set = markup::extract(
            markup,
            coverage,
            self.config.text_limit,
            self.config.max_elements,
        );
        tracing::debug!(
            kept = set.len(),
            total = set.total_elements,
            "Extracted elements from markup"
        );
        set
    }

    pub fn from_elements(&self, elements: &[locus_common::protocol::ElementInput]) -> ElementSet {
        let set = elements::extract(elements, self.config.text_limit, self.config.max_elements);
        tracing::debug!(
            kept = set.len(),
            total = set.total_elements,
            "Extracted elements from element list"
        );
        set
    }
}
