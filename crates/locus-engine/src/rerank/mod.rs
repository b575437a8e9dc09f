//! Context reranking: an external reasoning pass that may promote one of the
//! heuristic top candidates given what the locator is used for.

mod llm;

pub use llm::LlmReranker;

use crate::dom::ElementSet;
use crate::llm::LlmError;
use crate::rank::Ranking;
use async_trait::async_trait;
use locus_common::LocatorKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RerankError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Reranker timed out after {0:?}")]
    Timeout(Duration),

    #[error("Reranker answer unusable: {0}")]
    Unusable(String),
}

/// A candidate as submitted to the reranker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankCandidate {
    /// 1-based position in the submitted list.
    pub index: usize,
    pub selector: String,
    pub kind: LocatorKind,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankRequest {
    pub failed_selector: String,
    pub usage: String,
    pub candidates: Vec<RerankCandidate>,
}

impl RerankRequest {
    /// Take the top `top_k` candidates across both buckets.
    pub fn from_ranking(
        ranking: &Ranking,
        elements: &ElementSet,
        failed_selector: &str,
        usage: &str,
        top_k: usize,
    ) -> Self {
        let candidates = ranking
            .top(top_k)
            .into_iter()
            .enumerate()
            .map(|(idx, ranked)| {
                let record = elements.get(ranked.candidate.element);
                RerankCandidate {
                    index: idx + 1,
                    selector: ranked.candidate.locator.clone(),
                    kind: ranked.candidate.kind,
                    tag: record.map(|r| r.tag.clone()).unwrap_or_default(),
                    text: record.and_then(|r| r.text.clone()),
                    role: record.and_then(|r| r.role.clone()),
                    score: ranked.composite,
                }
            })
            .collect();
        Self {
            failed_selector: failed_selector.to_string(),
            usage: usage.to_string(),
            candidates,
        }
    }

    pub fn find(&self, selector: &str) -> Option<&RerankCandidate> {
        self.candidates.iter().find(|c| c.selector == selector)
    }
}

/// The candidate the reranker picked.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankChoice {
    pub selector: String,
    pub kind: LocatorKind,
    pub reason: Option<String>,
}

#[async_trait]
pub trait ContextReranker: Send + Sync {
    /// Pick one of `request.candidates`. Implementations may return any
    /// selector; callers validate it against the request.
    async fn choose(&self, request: &RerankRequest) -> Result<RerankChoice, RerankError>;
}

/// Run a reranker under a timeout and check that its answer was one of the
/// submitted candidates.
pub async fn rerank_with_timeout(
    reranker: &dyn ContextReranker,
    request: &RerankRequest,
    timeout: Duration,
) -> Result<RerankChoice, RerankError> {
    let choice = tokio::time::timeout(timeout, reranker.choose(request))
        .await
        .map_err(|_| RerankError::Timeout(timeout))??;

    match request.find(&choice.selector) {
        Some(candidate) => Ok(RerankChoice {
            kind: candidate.kind,
            ..choice
        }),
        None => Err(RerankError::Unusable(format!(
            "'{}' is not one of the submitted candidates",
            choice.selector
        ))),
    }
}

static EMBEDDED_OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

static INDEX_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s*").unwrap());

static BARE_INDEX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)\.?$").unwrap());

#[derive(Debug, Deserialize)]
struct RawChoice {
    chosen_selector: Option<serde_json::Value>,
    #[serde(default)]
    reason: Option<String>,
}

/// Interpret a free-form reasoning-service answer.
///
/// Accepts `{"chosen_selector": ..., "reason": ...}` (optionally wrapped in
/// prose), a selector carrying a `"2. "` list prefix, or a bare 1-based index.
pub fn parse_choice(answer: &str, request: &RerankRequest) -> Result<RerankChoice, RerankError> {
    let answer = answer.trim();
    let raw: Option<RawChoice> = serde_json::from_str(answer).ok().or_else(|| {
        EMBEDDED_OBJECT_RE
            .find(answer)
            .and_then(|m| serde_json::from_str(m.as_str()).ok())
    });

    let (chosen, reason) = match raw {
        Some(RawChoice {
            chosen_selector: Some(serde_json::Value::String(s)),
            reason,
        }) => (s, reason),
        Some(RawChoice {
            chosen_selector: Some(serde_json::Value::Number(n)),
            reason,
        }) => (n.to_string(), reason),
        Some(_) => {
            return Err(RerankError::Unusable(
                "answer has no chosen_selector".to_string(),
            ));
        }
        None => (answer.to_string(), None),
    };

    let chosen = chosen.trim().trim_matches(|c| c == '`');
    let candidate = request
        .find(chosen)
        .or_else(|| request.find(INDEX_PREFIX_RE.replace(chosen, "").trim()))
        .or_else(|| {
            let caps = BARE_INDEX_RE.captures(chosen)?;
            let index: usize = caps[1].parse().ok()?;
            request.candidates.iter().find(|c| c.index == index)
        })
        .ok_or_else(|| RerankError::Unusable(format!("unknown selector '{}'", chosen)))?;

    Ok(RerankChoice {
        selector: candidate.selector.clone(),
        kind: candidate.kind,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RerankRequest {
        let candidate = |index: usize, selector: &str| RerankCandidate {
            index,
            selector: selector.to_string(),
            kind: LocatorKind::Css,
            tag: "input".into(),
            text: None,
            role: None,
            score: 0.5,
        };
        RerankRequest {
            failed_selector: "#pw".into(),
            usage: "focus on password field".into(),
            candidates: vec![candidate(1, "#username"), candidate(2, "#password")],
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let choice = parse_choice(
            r##"{"chosen_selector": "#password", "reason": "password input"}"##,
            &request(),
        )
        .unwrap();
        assert_eq!(choice.selector, "#password");
        assert_eq!(choice.reason.as_deref(), Some("password input"));
    }

    #[test]
    fn test_parse_tolerates_prose_and_prefixes() {
        let wrapped = parse_choice(
            r##"Sure! {"chosen_selector": "2. #password"} hope that helps"##,
            &request(),
        )
        .unwrap();
        assert_eq!(wrapped.selector, "#password");

        let bare = parse_choice("1", &request()).unwrap();
        assert_eq!(bare.selector, "#username");
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(matches!(
            parse_choice(r##"{"chosen_selector": "#email"}"##, &request()),
            Err(RerankError::Unusable(_))
        ));
        assert!(parse_choice("no idea", &request()).is_err());
        assert!(parse_choice("7", &request()).is_err());
    }
}
