use super::anchor::{Anchor, Strategy};
use super::volatility::VolatilityDetector;
use super::Candidate;
use crate::dom::{ElementRecord, ElementSet};
use locus_common::LocatorKind;
use locus_common::locator::{LocatorKindHint, is_css_identifier};

const MAX_CLASSES: usize = 3;

pub struct CandidateGenerator<'a> {
    volatility: VolatilityDetector<'a>,
    max_text_len: usize,
    max_candidates: usize,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(
        volatility: VolatilityDetector<'a>,
        max_text_len: usize,
        max_candidates: usize,
    ) -> Self {
        Self {
            volatility,
            max_text_len,
            max_candidates,
        }
    }

    /// Generate candidates for every element, highest-priority strategies
    /// first, capped at `max_candidates`.
    pub fn generate(&self, elements: &ElementSet, hint: LocatorKindHint) -> Vec<Candidate> {
        let kinds: Vec<LocatorKind> = LocatorKind::ALL
            .into_iter()
            .filter(|k| hint.allows(*k))
            .collect();

        let mut by_strategy: [Vec<Candidate>; 3] = Default::default();
        for record in &elements.records {
            let attribute = self.anchor_for(record, Strategy::Attribute);
            let text = self.anchor_for(record, Strategy::Text);
            let structural = if attribute.is_none() && text.is_none() {
                self.anchor_for(record, Strategy::Structural)
            } else {
                None
            };

            for anchor in [attribute, text, structural].into_iter().flatten() {
                let bucket = &mut by_strategy[anchor.strategy().priority() as usize];
                for kind in &kinds {
                    bucket.push(Candidate::new(record.id, *kind, anchor.clone()));
                }
            }
        }

        let total: usize = by_strategy.iter().map(Vec::len).sum();
        let mut candidates: Vec<Candidate> = by_strategy.into_iter().flatten().collect();
        if candidates.len() > self.max_candidates {
            tracing::debug!(
                generated = total,
                cap = self.max_candidates,
                "Candidate cap reached, dropping lowest-priority strategies"
            );
            candidates.truncate(self.max_candidates);
        }
        candidates
    }

    /// The anchor one strategy yields for an element, if any.
    pub fn anchor_for(&self, record: &ElementRecord, strategy: Strategy) -> Option<Anchor> {
        match strategy {
            Strategy::Attribute => self.attribute_anchor(record),
            Strategy::Text => self.text_anchor(record),
            Strategy::Structural => {
                (!record.path.is_empty()).then(|| Anchor::Position(record.path.clone()))
            }
        }
    }

    fn stable(&self, value: &str) -> bool {
        !value.trim().is_empty() && !self.volatility.is_volatile(value)
    }

    fn attribute_anchor(&self, record: &ElementRecord) -> Option<Anchor> {
        let attrs = &record.attributes;
        let tag = if record.tag.is_empty() {
            "*".to_string()
        } else {
            record.tag.clone()
        };

        if let Some((attr, value)) = &attrs.test_id
            && self.stable(value)
        {
            return Some(Anchor::TestId {
                attr: attr.clone(),
                value: value.clone(),
            });
        }

        if let Some(id) = &attrs.id
            && self.stable(id)
        {
            return Some(Anchor::Id(id.clone()));
        }

        if let Some(name) = &attrs.name
            && self.stable(name)
        {
            return Some(Anchor::Name {
                tag,
                value: name.clone(),
            });
        }

        if let Some(role) = &record.role
            && let Some(name) = &record.accessible_name
            && name.chars().count() <= self.max_text_len
        {
            let via_aria = attrs.aria_label.as_deref() == Some(name.as_str());
            let matches_text = record.text.as_deref() == Some(name.as_str());
            if via_aria || matches_text {
                return Some(Anchor::RoleName {
                    role: role.clone(),
                    name: name.clone(),
                    via_aria,
                });
            }
        }

        if record.tag.is_empty() {
            return None;
        }
        let classes: Vec<String> = attrs
            .classes
            .iter()
            .filter(|c| is_css_identifier(c) && self.stable(c))
            .take(MAX_CLASSES)
            .cloned()
            .collect();
        (!classes.is_empty()).then(|| Anchor::TagClasses {
            tag: record.tag.clone(),
            classes,
        })
    }

    fn text_anchor(&self, record: &ElementRecord) -> Option<Anchor> {
        if record.tag.is_empty() {
            return None;
        }
        let text = record.text.as_deref()?.trim();
        if text.is_empty()
            || text.chars().count() > self.max_text_len
            || text.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        Some(Anchor::Text {
            tag: record.tag.clone(),
            text: text.to_string(),
        })
    }
}
