use super::{ContextReranker, RerankChoice, RerankError, RerankRequest, parse_choice};
use crate::config::LlmConfig;
use crate::llm::ChatClient;
use async_trait::async_trait;

const SYSTEM_PROMPT: &str = "You select the single best locator for a web element from a numbered list. \
Choose exactly one entry from the list; never invent a new locator. \
Pick the entry that best matches the intended use. \
When several fit equally, prefer test ids and ids over classes, and unique attributes over generic ones. \
Answer with JSON only: {\"chosen_selector\": \"<exact locator from the list>\", \"reason\": \"<short explanation>\"}";

/// Reranker backed by a chat completions endpoint.
pub struct LlmReranker {
    client: ChatClient,
}

impl LlmReranker {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: ChatClient::new(config),
        }
    }

    fn user_prompt(request: &RerankRequest) -> String {
        let mut lines = Vec::with_capacity(request.candidates.len() + 6);
        lines.push("CANDIDATES:".to_string());
        for candidate in &request.candidates {
            let mut line = format!(
                "{}. {}  ({} <{}>",
                candidate.index, candidate.selector, candidate.kind, candidate.tag
            );
            if let Some(role) = &candidate.role {
                line.push_str(&format!(" role={}", role));
            }
            if let Some(text) = &candidate.text {
                line.push_str(&format!(" text=\"{}\"", text));
            }
            line.push(')');
            lines.push(line);
        }
        lines.push(String::new());
        lines.push(format!("FAILED LOCATOR: {}", request.failed_selector));
        lines.push(format!("INTENDED USE: {}", request.usage));
        lines.push(String::new());
        lines.push("Which locator best serves the intended use?".to_string());
        lines.join("\n")
    }
}

#[async_trait]
impl ContextReranker for LlmReranker {
    async fn choose(&self, request: &RerankRequest) -> Result<RerankChoice, RerankError> {
        let prompt = Self::user_prompt(request);
        let answer = self
            .client
            .complete(SYSTEM_PROMPT, serde_json::Value::String(prompt), true)
            .await?;
        tracing::debug!(answer = %answer, "Reranker answered");
        parse_choice(&answer, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rerank::RerankCandidate;
    use locus_common::LocatorKind;

    #[test]
    fn test_prompt_lists_numbered_candidates() {
        let request = RerankRequest {
            failed_selector: "#old".into(),
            usage: "submit the form".into(),
            candidates: vec![RerankCandidate {
                index: 1,
                selector: "[data-testid='submit']".into(),
                kind: LocatorKind::Css,
                tag: "button".into(),
                text: Some("Submit".into()),
                role: None,
                score: 0.9,
            }],
        };
        let prompt = LlmReranker::user_prompt(&request);
        assert!(prompt.contains("1. [data-testid='submit']  (css <button> text=\"Submit\")"));
        assert!(prompt.contains("INTENDED USE: submit the form"));
    }
}
