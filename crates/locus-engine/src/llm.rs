//! Minimal client for OpenAI-compatible chat completions endpoints.
//!
//! Shared by the production reranker and vision hinter. Timeouts are applied
//! by callers so they can be bounded by the request deadline.

use crate::config::LlmConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API key environment variable '{0}' is not set")]
    MissingApiKey(String),

    #[error("Service returned no message content")]
    EmptyResponse,

    #[error("Failed to decode service response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Value,
}

#[derive(Debug, Serialize)]
struct ChatPayload<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl ChatClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn api_key(&self) -> Result<String, LlmError> {
        std::env::var(&self.config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(self.config.api_key_env.clone()))
    }

    /// Send one system + user exchange and return the assistant's text.
    ///
    /// `user` is either a plain string or a list of content parts (text and
    /// image_url), passed through as-is.
    pub async fn complete(&self, system: &str, user: Value, json_mode: bool) -> Result<String, LlmError> {
        let api_key = self.api_key()?;
        let payload = ChatPayload {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Value::String(system.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: json_mode.then(|| serde_json::json!({"type": "json_object"})),
        };

        tracing::debug!(model = %self.config.model, endpoint = %self.config.endpoint, "Calling chat completions");
        let body = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let response: ChatResponse = serde_json::from_str(&body)?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}
