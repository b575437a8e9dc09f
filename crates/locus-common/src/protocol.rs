use crate::error::HealError;
use crate::locator::{Coverage, LocatorKindHint};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Custom deserializer for HashMap<String, String> that filters out null values.
/// Capture scripts report absent attributes as null.
fn deserialize_nullable_string_map<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let map: Option<HashMap<String, Option<String>>> = Option::deserialize(deserializer)?;
    Ok(map
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| v.map(|val| (k, val)))
        .collect())
}

// ============================================================================
// Requests
// ============================================================================

/// A single heal request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HealRequest {
    /// The locator that no longer resolves.
    #[serde(default)]
    pub failed_selector: String,

    /// Raw page markup.
    #[serde(default, alias = "html", skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,

    /// Pre-extracted interactive elements.
    #[serde(
        default,
        alias = "interactive_elements",
        skip_serializing_if = "Option::is_none"
    )]
    pub element_list: Option<Vec<ElementInput>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,

    /// Free-text description of what the locator is used for,
    /// e.g. "focus on password field".
    #[serde(
        default,
        alias = "use_of_selector",
        skip_serializing_if = "Option::is_none"
    )]
    pub usage_description: Option<String>,

    #[serde(default)]
    pub coverage: Coverage,

    #[serde(default, alias = "selector_type")]
    pub locator_kind_hint: LocatorKindHint,

    #[serde(
        default,
        alias = "screenshot_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub screenshot_ref: Option<String>,
}

impl HealRequest {
    pub fn new(failed_selector: impl Into<String>) -> Self {
        Self {
            failed_selector: failed_selector.into(),
            ..Default::default()
        }
    }

    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = Some(markup.into());
        self
    }

    pub fn with_elements(mut self, elements: Vec<ElementInput>) -> Self {
        self.element_list = Some(elements);
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage_description = Some(usage.into());
        self
    }

    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    /// Reject requests that cannot be computed on. Runs before any work.
    pub fn validate(&self) -> Result<(), HealError> {
        if self.failed_selector.trim().is_empty() {
            return Err(HealError::invalid("failed_selector must not be empty"));
        }
        let has_markup = self.markup.as_deref().is_some_and(|m| !m.trim().is_empty());
        if !has_markup && self.element_list.is_none() {
            return Err(HealError::invalid(
                "one of markup or element_list must be provided",
            ));
        }
        Ok(())
    }

    /// Usage description, if present and not blank.
    pub fn usage(&self) -> Option<&str> {
        self.usage_description
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

/// One element of a pre-extracted element list.
///
/// Upstream capture must only send elements that pass the interactive
/// allowlist (see `locus_engine::dom::interactive`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ElementInput {
    #[serde(alias = "type", skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessible_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(deserialize_with = "deserialize_nullable_string_map")]
    pub attributes: HashMap<String, String>,
    /// Absolute positional path, e.g. `/html/body/form/input[2]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sibling_index: Option<u32>,
    #[serde(alias = "bounding_box", skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

impl ElementInput {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchHealRequest {
    #[serde(alias = "selectors")]
    pub requests: Vec<HealRequest>,
}

/// A batch whose items have not been decoded yet.
///
/// Items are decoded one by one so a malformed item fails its own slot
/// instead of the whole batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBatchHealRequest {
    #[serde(alias = "selectors")]
    pub requests: Vec<serde_json::Value>,
}

impl RawBatchHealRequest {
    pub fn decode(&self) -> Vec<Result<HealRequest, HealError>> {
        self.requests
            .iter()
            .map(|item| {
                HealRequest::deserialize(item).map_err(|e| HealError::invalid(e.to_string()))
            })
            .collect()
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealResponse {
    pub message: String,
    pub css_candidates: Vec<CandidateView>,
    pub xpath_candidates: Vec<CandidateView>,
    pub auto_selected: AutoSelected,
    pub metadata: ResponseMetadata,
}

/// A ranked replacement locator as reported to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateView {
    pub rank: usize,
    pub score: f64,
    pub base_score: f64,
    pub stability_score: f64,
    pub semantic_score: f64,
    pub selector: String,
    pub strategy: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Auxiliary screenshot hint. Never affects `score` or `rank`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_prominence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AutoSelected {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
}

impl AutoSelected {
    pub fn is_empty(&self) -> bool {
        self.css.is_none() && self.xpath.is_none()
    }
}

/// Stages a heal request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Extracted,
    CandidatesGenerated,
    Scored,
    Reranked,
    Selected,
    Returned,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResponseMetadata {
    pub processing_time_ms: f64,
    pub reranked: bool,
    pub vision_used: bool,
    /// Scored candidates before deduplication and truncation.
    pub candidates_considered: usize,
    pub total_elements: usize,
    pub skipped_candidates: usize,
    #[serde(default)]
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<String>,
    #[serde(default)]
    pub stages: Vec<PipelineStage>,
}

/// One slot of a batch response. Exactly one of `result`/`error` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchItem {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<HealResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItem {
    pub fn ok(index: usize, response: HealResponse) -> Self {
        Self {
            index,
            result: Some(response),
            error: None,
        }
    }

    pub fn failed(index: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchHealResponse {
    pub results: Vec<BatchItem>,
    pub total_processed: usize,
    pub total_succeeded: usize,
    pub total_failed: usize,
    pub processing_time_ms: f64,
}
