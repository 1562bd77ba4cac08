//! Social Image Composition
//!
//! Derives one creative prompt from a flow summary and fetches the image
//! through the response cache.

use super::narrative::FlowSummary;
use crate::cache::{Fingerprint, Namespace, ResponseCache};
use crate::capability::ImageGenerator;
use crate::{Capability, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Bumped whenever the image prompt wording changes
pub const IMAGE_PROMPT_VERSION: &str = "social-v1";

const MAX_NARRATIVE_CHARS: usize = 600;

/// Declared encoding of a generated image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    /// Map a MIME type such as `image/jpeg`; anything unknown is PNG
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => ImageFormat::Jpeg,
            "image/webp" => ImageFormat::Webp,
            _ => ImageFormat::Png,
        }
    }

    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
        }
    }
}

/// Generated image bytes plus their format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialImage {
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
    #[serde(default)]
    pub format: ImageFormat,
}

impl SocialImage {
    /// File name for this image, e.g. `social_image.png`
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.format.extension())
    }
}

/// Image bytes are stored as base64 text inside cache entries
mod base64_bytes {
    use base64::prelude::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64_STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Produces the social image for a summary
#[derive(Debug, Clone)]
pub struct ImageComposer {
    cache: ResponseCache,
}

impl ImageComposer {
    pub fn new(cache: ResponseCache) -> Self {
        Self { cache }
    }

    /// Compose the image for `summary`, calling `generator` only on a cache miss.
    ///
    /// An empty image counts as a generator failure and is not cached.
    pub fn compose(
        &self,
        summary: &FlowSummary,
        generator: &dyn ImageGenerator,
    ) -> crate::Result<SocialImage> {
        let prompt = build_image_prompt(summary);
        let fingerprint = self.fingerprint(&prompt, generator.model_id());
        debug!(fingerprint = %fingerprint, "Composing social image");

        let image: SocialImage = self.cache.get_or_compute(Namespace::Image, &fingerprint, || {
            let image = generator.generate_image(&prompt)?;
            if image.bytes.is_empty() {
                return Err(Error::external(
                    Capability::ImageGeneration,
                    "generator returned an empty image",
                ));
            }
            Ok(image)
        })?;

        info!(
            bytes = image.bytes.len(),
            format = image.format.extension(),
            "Social image ready"
        );
        Ok(image)
    }

    /// Cache key for generating an image from `prompt` with `model_id`
    pub fn fingerprint(&self, prompt: &str, model_id: &str) -> Fingerprint {
        Fingerprint::derive(["social-image", IMAGE_PROMPT_VERSION, model_id, prompt])
    }
}

/// Build the image prompt from the summary title and narrative
pub fn build_image_prompt(summary: &FlowSummary) -> String {
    let narrative: String = if summary.overall_narrative.chars().count() > MAX_NARRATIVE_CHARS {
        let cut: String = summary.overall_narrative.chars().take(MAX_NARRATIVE_CHARS).collect();
        format!("{}…", cut.trim_end())
    } else {
        summary.overall_narrative.clone()
    };

    format!(
        "Create a clean, modern social media banner illustrating a software walkthrough titled \"{}\". \
The walkthrough: {} \
Use a bright, friendly flat illustration style with a clear focal point. \
Do not render any text, letters or user interface screenshots.",
        summary.title, narrative
    )
}
