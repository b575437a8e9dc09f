use super::{VisionError, VisionHinter, VisionHints, VisionRequest, parse_hints};
use crate::config::LlmConfig;
use crate::llm::ChatClient;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use std::path::Path;

const SYSTEM_PROMPT: &str = "You are a UI analyst. Given a screenshot and a list of page elements, \
rate how visually prominent each element is, from 0 (invisible or buried) to 1 (the obvious focus). \
Answer with JSON only: {\"elements\": [{\"id\": <element id>, \"prominence\": <0..1>}], \"summary\": \"<one sentence>\"}";

/// Vision hinter backed by a multimodal chat completions endpoint.
pub struct LlmVisionHinter {
    client: ChatClient,
}

impl LlmVisionHinter {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: ChatClient::new(config),
        }
    }

    fn mime_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            _ => "image/png",
        }
    }

    async fn data_url(screenshot_ref: &str) -> Result<String, VisionError> {
        let path = Path::new(screenshot_ref);
        let bytes = tokio::fs::read(path).await?;
        Ok(format!(
            "data:{};base64,{}",
            Self::mime_type(path),
            STANDARD.encode(bytes)
        ))
    }

    fn user_prompt(request: &VisionRequest) -> String {
        let mut lines = vec![
            format!("Failed locator: {}", request.failed_selector),
            format!("Page URL: {}", request.page_url.as_deref().unwrap_or("N/A")),
            "Elements:".to_string(),
        ];
        for target in &request.targets {
            lines.push(format!(
                "- id={} <{}> {} {}",
                target.element,
                target.tag,
                target.locator,
                target.text.as_deref().unwrap_or("")
            ));
        }
        lines.join("\n")
    }
}

#[async_trait]
impl VisionHinter for LlmVisionHinter {
    async fn hint(&self, request: &VisionRequest) -> Result<VisionHints, VisionError> {
        if request.targets.is_empty() {
            return Ok(VisionHints::default());
        }
        let image = Self::data_url(&request.screenshot_ref).await?;
        let content = json!([
            {"type": "text", "text": Self::user_prompt(request)},
            {"type": "image_url", "image_url": {"url": image}}
        ]);
        let answer = self.client.complete(SYSTEM_PROMPT, content, false).await?;
        parse_hints(&answer, request)
    }
}
