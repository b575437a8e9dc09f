//! Candidate locator generation.

pub mod anchor;
pub mod generator;
pub mod volatility;

pub use anchor::{Anchor, Strategy};
pub use generator::CandidateGenerator;
pub use volatility::VolatilityDetector;

use crate::dom::ElementId;
use locus_common::LocatorKind;

/// One replacement locator for one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub locator: String,
    pub kind: LocatorKind,
    pub element: ElementId,
    pub anchor: Anchor,
}

impl Candidate {
    pub fn new(element: ElementId, kind: LocatorKind, anchor: Anchor) -> Self {
        Self {
            locator: anchor.render(kind),
            kind,
            element,
            anchor,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.anchor.strategy()
    }
}
