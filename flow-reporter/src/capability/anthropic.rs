//! Anthropic Messages API text binding

use super::http_retry::send_with_retry;
use super::{blocking_runtime, TextGenerator};
use crate::{Capability, Error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const API_VERSION: &str = "2023-06-01";
const API_TIMEOUT_SECS: u64 = 60;

/// Anthropic API request body
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Anthropic API response body
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Text generation through the Anthropic messages endpoint
pub struct AnthropicTextGenerator {
    /// API endpoint
    pub api_endpoint: String,
    /// Model to use
    pub model: String,
    /// Response token limit
    pub max_tokens: u32,
    /// Temperature for generation
    pub temperature: f32,
    /// Attempts per call, including the first
    pub max_retries: u32,
    api_key: String,
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl AnthropicTextGenerator {
    /// Create with an explicit API key
    pub fn new(api_key: &str) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::external(Capability::TextGeneration, e.to_string()))?;

        Ok(Self {
            api_endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 2048,
            temperature: 0.3,
            max_retries: 3,
            api_key: api_key.to_string(),
            client,
            runtime: blocking_runtime(Capability::TextGeneration)?,
        })
    }

    /// Create with the key from `ANTHROPIC_API_KEY`
    pub fn from_env() -> crate::Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            Error::external(Capability::TextGeneration, "ANTHROPIC_API_KEY is not set")
        })?;
        Self::new(&api_key)
    }

    fn request_body(&self, prompt: &str) -> AnthropicRequest {
        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        }
    }

    async fn call(&self, prompt: &str) -> crate::Result<String> {
        debug!("Calling Anthropic API with prompt length: {}", prompt.len());

        let body = self.request_body(prompt);
        let response = send_with_retry(
            &self.client,
            |c| {
                c.post(&self.api_endpoint)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", API_VERSION)
                    .header("content-type", "application/json")
                    .json(&body)
            },
            self.max_retries,
            Capability::TextGeneration,
            "anthropic",
        )
        .await?;

        let parsed: AnthropicResponse = response.json().await.map_err(|e| {
            Error::external(
                Capability::TextGeneration,
                format!("failed to parse Anthropic response: {}", e),
            )
        })?;

        let text = join_text_blocks(parsed);
        if text.trim().is_empty() {
            return Err(Error::external(
                Capability::TextGeneration,
                "Anthropic response contained no text",
            ));
        }
        Ok(text)
    }
}

fn join_text_blocks(response: AnthropicResponse) -> String {
    response
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("")
}

impl TextGenerator for AnthropicTextGenerator {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str) -> crate::Result<String> {
        self.runtime.block_on(self.call(prompt))
    }
}
