//! Configuration Management

use crate::capability::{
    anthropic, gemini, AnthropicTextGenerator, GeminiImageGenerator, ImageGenerator, TextGenerator,
    UnavailableGenerator,
};
use crate::workflow::{default_cache_dir, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Output locations
    #[serde(default)]
    pub output: OutputConfig,
    /// Text generation binding
    #[serde(default)]
    pub text: TextConfig,
    /// Image generation binding
    #[serde(default)]
    pub image: ImageConfig,
}

/// Response cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Global cache switch
    pub enabled: bool,
    /// Cache directory (defaults to ~/.flow_reporter/cache)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for the report and the image
    pub dir: PathBuf,
    /// Report file name
    pub report_file: String,
    /// Image file name without extension
    pub image_stem: String,
}

/// Text generation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Messages API endpoint
    pub endpoint: String,
    /// Model for summarization
    pub model: String,
    /// Response token limit
    pub max_tokens: u32,
    /// Temperature for generation
    pub temperature: f32,
    /// Attempts per call
    pub max_retries: u32,
}

/// Image generation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// API base URL
    pub endpoint: String,
    /// Image model
    pub model: String,
    /// Requested aspect ratio
    pub aspect_ratio: String,
    /// Attempts per call
    pub max_retries: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            report_file: "flow_summary.md".to_string(),
            image_stem: "social_image".to_string(),
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            endpoint: anthropic::DEFAULT_ENDPOINT.to_string(),
            model: anthropic::DEFAULT_MODEL.to_string(),
            max_tokens: 2048,
            temperature: 0.3,
            max_retries: 3,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            endpoint: gemini::DEFAULT_BASE_URL.to_string(),
            model: gemini::DEFAULT_MODEL.to_string(),
            aspect_ratio: "16:9".to_string(),
            max_retries: 3,
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_file_name("output.report_file", &self.output.report_file)?;
        validate_file_name("output.image_stem", &self.output.image_stem)?;

        if self.text.model.trim().is_empty() {
            return Err(crate::Error::Config("text.model must not be empty".to_string()));
        }
        if self.text.endpoint.trim().is_empty() {
            return Err(crate::Error::Config("text.endpoint must not be empty".to_string()));
        }
        if self.text.max_tokens == 0 {
            return Err(crate::Error::Config("text.max_tokens must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.text.temperature) {
            return Err(crate::Error::Config(format!(
                "text.temperature must be in [0, 1], got {}", self.text.temperature
            )));
        }
        if self.text.max_retries == 0 {
            return Err(crate::Error::Config("text.max_retries must be > 0".to_string()));
        }

        if self.image.model.trim().is_empty() {
            return Err(crate::Error::Config("image.model must not be empty".to_string()));
        }
        if self.image.endpoint.trim().is_empty() {
            return Err(crate::Error::Config("image.endpoint must not be empty".to_string()));
        }
        if self.image.max_retries == 0 {
            return Err(crate::Error::Config("image.max_retries must be > 0".to_string()));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &Path) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save to default location
    pub fn save_default(&self) -> Result<(), crate::Error> {
        self.save(&Self::default_path())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".flow_reporter").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Effective cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.cache.dir.clone().unwrap_or_else(default_cache_dir)
    }

    /// Pipeline configuration derived from this file
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            cache_enabled: self.cache.enabled,
            cache_dir: self.cache_dir(),
            output_dir: self.output.dir.clone(),
            report_file: self.output.report_file.clone(),
            image_stem: self.output.image_stem.clone(),
            skip_image: false,
        }
    }

    /// Text binding configured from `[text]`, keyed from the environment
    pub fn text_generator(&self) -> Result<AnthropicTextGenerator, crate::Error> {
        let mut generator = AnthropicTextGenerator::from_env()?;
        generator.api_endpoint = self.text.endpoint.clone();
        generator.model = self.text.model.clone();
        generator.max_tokens = self.text.max_tokens;
        generator.temperature = self.text.temperature;
        generator.max_retries = self.text.max_retries;
        Ok(generator)
    }

    /// Image binding configured from `[image]`, keyed from the environment
    pub fn image_generator(&self) -> Result<GeminiImageGenerator, crate::Error> {
        let mut generator = GeminiImageGenerator::from_env()?;
        generator.base_url = self.image.endpoint.clone();
        generator.model = self.image.model.clone();
        generator.aspect_ratio = self.image.aspect_ratio.clone();
        generator.max_retries = self.image.max_retries;
        Ok(generator)
    }

    /// Text binding for a run. A binding that cannot be built is replaced
    /// by one that still serves cached summaries for `text.model`.
    pub fn text_binding(&self) -> Box<dyn TextGenerator> {
        match self.text_generator() {
            Ok(generator) => Box::new(generator),
            Err(e) => {
                warn!(model = %self.text.model, "Text binding unavailable: {}", e);
                Box::new(UnavailableGenerator::new(&self.text.model, e.to_string()))
            }
        }
    }

    /// Image binding for a run, degraded the same way as `text_binding`
    pub fn image_binding(&self) -> Box<dyn ImageGenerator> {
        match self.image_generator() {
            Ok(generator) => Box::new(generator),
            Err(e) => {
                warn!(model = %self.image.model, "Image binding unavailable: {}", e);
                Box::new(UnavailableGenerator::new(&self.image.model, e.to_string()))
            }
        }
    }
}

fn validate_file_name(field: &str, value: &str) -> Result<(), crate::Error> {
    if value.trim().is_empty() {
        return Err(crate::Error::Config(format!("{} must not be empty", field)));
    }
    if value.contains('/') || value.contains('\\') {
        return Err(crate::Error::Config(format!(
            "{} must be a file name, got {}", field, value
        )));
    }
    Ok(())
}
