//! Completion client abstraction and HTTP transport.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default messages endpoint of the hosted completion service.
const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";

/// Default model for contextual reasoning.
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Abstraction over a text-completion backend.
///
/// Callers dispatch statically; tests implement this with scripted replies
/// instead of a network round trip.
#[allow(async_fn_in_trait)] // static dispatch only
pub trait Completer {
    /// Sends a prompt and returns the raw completion text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the reply has no text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// HTTP transport for the hosted completion service.
#[derive(Debug, Clone)]
pub struct HttpCompleter {
    http_client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl HttpCompleter {
    /// Creates a completer with the default endpoint and model.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4000,
            temperature: 0.3,
        }
    }

    /// Overrides the service endpoint (e.g. a regional or proxy URL).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Overrides the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the maximum number of tokens the reply may use.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        }
    }
}

impl Completer for HttpCompleter {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&self.request_body(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, message });
        }

        let completion: CompletionResponse = response.json().await?;
        completion
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or(Error::EmptyCompletion)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let completer = HttpCompleter::new("key")
            .with_model("test-model")
            .with_max_tokens(100)
            .with_temperature(0.5);

        let body = serde_json::to_value(completer.request_body("hello")).unwrap();

        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_response_text_extraction() {
        let raw = r#"{"content": [{"type": "text", "text": "the reply"}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();

        let text = parsed.content.into_iter().find_map(|b| b.text);
        assert_eq!(text.as_deref(), Some("the reply"));
    }

    #[test]
    fn test_response_without_text_blocks() {
        let raw = r#"{"content": [{"type": "tool_use"}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();

        assert!(parsed.content.into_iter().find_map(|b| b.text).is_none());
    }

    #[test]
    fn test_builder_defaults() {
        let completer = HttpCompleter::new("key");
        assert_eq!(completer.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(completer.model, DEFAULT_MODEL);
    }
}
