//! Gemini image generation binding

use super::http_retry::send_with_retry;
use super::{blocking_runtime, ImageGenerator};
use crate::synthesis::{ImageFormat, SocialImage};
use crate::{Capability, Error};
use base64::prelude::*;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
const API_TIMEOUT_SECS: u64 = 120;

/// Image generation through Gemini `generateContent`
pub struct GeminiImageGenerator {
    /// API base URL
    pub base_url: String,
    /// Model to use
    pub model: String,
    /// Requested aspect ratio, e.g. "16:9"
    pub aspect_ratio: String,
    /// Attempts per call, including the first
    pub max_retries: u32,
    api_key: String,
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl GeminiImageGenerator {
    /// Create with an explicit API key
    pub fn new(api_key: &str) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::external(Capability::ImageGeneration, e.to_string()))?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            aspect_ratio: "16:9".to_string(),
            max_retries: 3,
            api_key: api_key.to_string(),
            client,
            runtime: blocking_runtime(Capability::ImageGeneration)?,
        })
    }

    /// Create with the key from `GEMINI_API_KEY`
    pub fn from_env() -> crate::Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            Error::external(Capability::ImageGeneration, "GEMINI_API_KEY is not set")
        })?;
        Self::new(&api_key)
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "contents": [{
                "parts": [{ "text": prompt }],
                "role": "user"
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": { "aspectRatio": self.aspect_ratio }
            }
        })
    }

    async fn call(&self, prompt: &str) -> crate::Result<SocialImage> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = self.request_body(prompt);
        debug!(model = %self.model, "Requesting image from Gemini");

        let response = send_with_retry(
            &self.client,
            |c| {
                c.post(&url)
                    .header("x-goog-api-key", &self.api_key)
                    .header("content-type", "application/json")
                    .json(&body)
            },
            self.max_retries,
            Capability::ImageGeneration,
            "gemini",
        )
        .await?;

        let json: Value = response.json().await.map_err(|e| {
            Error::external(
                Capability::ImageGeneration,
                format!("failed to parse Gemini response: {}", e),
            )
        })?;

        extract_image(&json)
    }
}

/// Pull the first inline image out of a `generateContent` response
fn extract_image(response: &Value) -> crate::Result<SocialImage> {
    let parts = response["candidates"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|c| c["content"]["parts"].as_array())
        .flatten();

    for part in parts {
        let inline = &part["inlineData"];
        if let Some(data) = inline["data"].as_str() {
            let bytes = BASE64_STANDARD.decode(data).map_err(|e| {
                Error::external(
                    Capability::ImageGeneration,
                    format!("failed to decode base64 image: {}", e),
                )
            })?;
            let format = inline["mimeType"]
                .as_str()
                .map(ImageFormat::from_mime)
                .unwrap_or_default();
            return Ok(SocialImage { bytes, format });
        }
    }

    Err(Error::external(
        Capability::ImageGeneration,
        "no image data found in Gemini response",
    ))
}

impl ImageGenerator for GeminiImageGenerator {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn generate_image(&self, prompt: &str) -> crate::Result<SocialImage> {
        self.runtime.block_on(self.call(prompt))
    }
}
