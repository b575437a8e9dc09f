//! Vision hinting: auxiliary per-element signals read off a screenshot.
//!
//! Hints are attached to the response for callers to inspect; they never
//! change scores or order.

mod llm;

pub use llm::LlmVisionHinter;

use crate::dom::{ElementId, ElementSet};
use crate::llm::LlmError;
use crate::rank::Ranking;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Failed to read screenshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Vision service timed out after {0:?}")]
    Timeout(Duration),

    #[error("Vision answer unusable: {0}")]
    Unusable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisionTarget {
    pub element: ElementId,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub locator: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisionRequest {
    pub screenshot_ref: String,
    pub failed_selector: String,
    pub page_url: Option<String>,
    pub targets: Vec<VisionTarget>,
}

impl VisionRequest {
    /// One target per distinct element in the ranking, in rank order.
    pub fn from_ranking(
        ranking: &Ranking,
        elements: &ElementSet,
        screenshot_ref: &str,
        failed_selector: &str,
        page_url: Option<&str>,
    ) -> Self {
        let mut seen = HashSet::new();
        let targets = ranking
            .iter()
            .filter(|ranked| seen.insert(ranked.candidate.element))
            .filter_map(|ranked| {
                let record = elements.get(ranked.candidate.element)?;
                Some(VisionTarget {
                    element: record.id,
                    tag: record.tag.clone(),
                    text: record.text.clone(),
                    locator: ranked.candidate.locator.clone(),
                })
            })
            .collect();
        Self {
            screenshot_ref: screenshot_ref.to_string(),
            failed_selector: failed_selector.to_string(),
            page_url: page_url.map(str::to_string),
            targets,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisionHints {
    /// Visual prominence per element, in [0, 1].
    pub prominence: BTreeMap<ElementId, f64>,
    pub summary: Option<String>,
}

impl VisionHints {
    /// Attach prominence to every ranked candidate of a hinted element.
    pub fn attach(&self, ranking: &mut Ranking) {
        for ranked in ranking.iter_mut() {
            if let Some(value) = self.prominence.get(&ranked.candidate.element) {
                ranked.visual_prominence = Some(value.clamp(0.0, 1.0));
            }
        }
    }
}

#[async_trait]
pub trait VisionHinter: Send + Sync {
    async fn hint(&self, request: &VisionRequest) -> Result<VisionHints, VisionError>;
}

pub async fn hint_with_timeout(
    hinter: &dyn VisionHinter,
    request: &VisionRequest,
    timeout: Duration,
) -> Result<VisionHints, VisionError> {
    tokio::time::timeout(timeout, hinter.hint(request))
        .await
        .map_err(|_| VisionError::Timeout(timeout))?
}

static EMBEDDED_OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

#[derive(Debug, Deserialize)]
struct RawHints {
    #[serde(default)]
    elements: Vec<RawHint>,
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawHint {
    id: ElementId,
    prominence: f64,
}

/// Parse `{"elements": [{"id": 0, "prominence": 0.8}], "summary": "..."}`,
/// possibly wrapped in prose. Unknown element ids and non-finite values are
/// dropped.
pub fn parse_hints(answer: &str, request: &VisionRequest) -> Result<VisionHints, VisionError> {
    let json = EMBEDDED_OBJECT_RE
        .find(answer)
        .map(|m| m.as_str())
        .ok_or_else(|| VisionError::Unusable("no JSON object in answer".to_string()))?;
    let raw: RawHints =
        serde_json::from_str(json).map_err(|e| VisionError::Unusable(e.to_string()))?;

    let known: HashSet<ElementId> = request.targets.iter().map(|t| t.element).collect();
    let prominence = raw
        .elements
        .into_iter()
        .filter(|h| known.contains(&h.id) && h.prominence.is_finite())
        .map(|h| (h.id, h.prominence.clamp(0.0, 1.0)))
        .collect();

    Ok(VisionHints {
        prominence,
        summary: raw.summary.filter(|s| !s.trim().is_empty()),
    })
}
