//! OpenAI SDK boundary
//!
//! Talks to OpenAI's Chat Completions API. `OpenAiClient` is the async
//! client built once per step invocation; `ScriptClient` is the synchronous
//! facade handed to user scripts under the `openai` and `client` names,
//! bridging back into the async runtime through a stored handle.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rhai::{Engine, EvalAltResult, ImmutableString};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use crate::config::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Backend for script-visible chat calls.
///
/// Production uses [`OpenAiClient`]; tests swap in [`MockChatBackend`].
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn default_model(&self) -> &str;
    async fn chat(&self, model: &str, prompt: &str) -> Result<String>;
}

/// Chat Completions client
pub struct OpenAiClient {
    /// HTTP client
    client: reqwest::Client,
    /// API key
    api_key: String,
    /// Base URL (credential override or the default endpoint)
    base_url: String,
    /// Model used when the script does not name one
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Set a custom base URL. Empty strings keep the default endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        if !base_url.is_empty() {
            self.base_url = base_url;
        }
        self
    }

    /// Set the default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatBackend for OpenAiClient {
    fn default_model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, model: &str, prompt: &str) -> Result<String> {
        let payload = ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        tracing::debug!(
            model = %payload.model,
            prompt_len = prompt.len(),
            "Sending request to OpenAI API"
        );

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                error = %error_text,
                "OpenAI API error"
            );
            anyhow::bail!("OpenAI API error ({}): {}", status, error_text);
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        let content = api_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        tracing::debug!(reply_len = content.len(), "OpenAI API response received");

        Ok(content)
    }
}

/// Canned backend for tests: replies with a fixed string
pub struct MockChatBackend {
    reply: String,
}

impl MockChatBackend {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into() }
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn chat(&self, _model: &str, _prompt: &str) -> Result<String> {
        Ok(self.reply.clone())
    }
}

/// The `openai` / `client` object visible to user scripts.
///
/// Calls are synchronous from the interpreter's point of view; the whole
/// step invocation suspends while the request runs on the async runtime,
/// and resumes when it settles.
#[derive(Clone)]
pub struct ScriptClient {
    backend: Arc<dyn ChatBackend>,
    handle: Handle,
}

impl ScriptClient {
    pub fn new(backend: Arc<dyn ChatBackend>, handle: Handle) -> Self {
        Self { backend, handle }
    }

    fn chat_blocking(&self, model: &str, prompt: &str) -> Result<String, Box<EvalAltResult>> {
        self.handle
            .block_on(self.backend.chat(model, prompt))
            .map_err(|e| e.to_string().into())
    }

    /// Register the client type and its script-visible methods
    pub fn register(engine: &mut Engine) {
        engine.register_type_with_name::<ScriptClient>("OpenAiClient");

        engine.register_fn(
            "chat",
            |client: &mut ScriptClient, prompt: ImmutableString| -> Result<String, Box<EvalAltResult>> {
                let model = client.backend.default_model().to_string();
                client.chat_blocking(&model, &prompt)
            },
        );

        engine.register_fn(
            "chat",
            |client: &mut ScriptClient,
             model: ImmutableString,
             prompt: ImmutableString|
             -> Result<String, Box<EvalAltResult>> {
                client.chat_blocking(&model, &prompt)
            },
        );

        engine.register_fn("default_model", |client: &mut ScriptClient| -> ImmutableString {
            client.backend.default_model().into()
        });
    }
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_url_joins_cleanly() {
        let client = OpenAiClient::new("k");
        assert_eq!(
            client.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );

        let client = OpenAiClient::new("k").with_base_url("https://proxy.internal/v1/");
        assert_eq!(
            client.completions_url(),
            "https://proxy.internal/v1/chat/completions"
        );
    }

    #[test]
    fn empty_base_url_keeps_default() {
        let client = OpenAiClient::new("k").with_base_url("");
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn with_model_overrides_default() {
        let client = OpenAiClient::new("k").with_model("gpt-4-turbo");
        assert_eq!(client.default_model(), "gpt-4-turbo");
    }

    #[tokio::test]
    async fn mock_backend_replies() {
        let backend = MockChatBackend::new("canned");
        assert_eq!(backend.default_model(), "mock-model");
        assert_eq!(backend.chat("m", "p").await.unwrap(), "canned");
    }
}
