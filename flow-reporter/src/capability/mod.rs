//! External Capabilities
//!
//! Narrow interfaces to text and image generation, with HTTP bindings for
//! the Anthropic messages API and Gemini image generation.

pub mod http_retry;
pub mod anthropic;
pub mod gemini;

pub use anthropic::AnthropicTextGenerator;
pub use gemini::GeminiImageGenerator;
pub use http_retry::send_with_retry;

use crate::synthesis::SocialImage;
use crate::{Capability, Error};

/// Prompt in, text out
pub trait TextGenerator {
    /// Identifier of the model behind this generator; part of every cache key
    fn model_id(&self) -> &str;

    /// Generate a completion for `prompt`
    fn generate(&self, prompt: &str) -> crate::Result<String>;
}

/// Prompt in, image out
pub trait ImageGenerator {
    /// Identifier of the model behind this generator; part of every cache key
    fn model_id(&self) -> &str;

    /// Generate an image for `prompt`
    fn generate_image(&self, prompt: &str) -> crate::Result<SocialImage>;
}

/// Binding that could not be built, such as one missing its API key.
///
/// Reports the configured model, so responses already in the cache still
/// resolve. A call that would reach the provider fails with `reason`.
#[derive(Debug, Clone)]
pub struct UnavailableGenerator {
    model: String,
    reason: String,
}

impl UnavailableGenerator {
    pub fn new(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

impl TextGenerator for UnavailableGenerator {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn generate(&self, _prompt: &str) -> crate::Result<String> {
        Err(Error::external(Capability::TextGeneration, self.reason.clone()))
    }
}

impl ImageGenerator for UnavailableGenerator {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn generate_image(&self, _prompt: &str) -> crate::Result<SocialImage> {
        Err(Error::external(Capability::ImageGeneration, self.reason.clone()))
    }
}

/// Create the blocking runtime the HTTP bindings drive their requests on
pub(crate) fn blocking_runtime(capability: Capability) -> crate::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::external(capability, format!("failed to start runtime: {}", e)))
}
