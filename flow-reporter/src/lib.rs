//! # Flow Reporter
//!
//! Turns a recorded user-interaction flow (clicks, searches, screenshots,
//! chapters, video segments) into a markdown report and a social image.
//!
//! ## Quick Start
//!
//! ```no_run
//! use flow_reporter::capability::{AnthropicTextGenerator, GeminiImageGenerator};
//! use flow_reporter::workflow::{FlowPipeline, PipelineConfig};
//!
//! let text = AnthropicTextGenerator::from_env().expect("text binding");
//! let image = GeminiImageGenerator::from_env().expect("image binding");
//!
//! let pipeline = FlowPipeline::new(PipelineConfig::default(), Box::new(text), Box::new(image));
//! let outcome = pipeline.run(std::path::Path::new("flow.json")).expect("pipeline failed");
//! println!("{}", outcome.report_path.display());
//! ```
//!
//! ## Architecture
//!
//! - [`flow`]: flow document loading and the structured digest
//! - [`normalize`]: raw step records to uniform, described steps
//! - [`cache`]: content-addressed on-disk response cache
//! - [`capability`]: text/image generation traits and HTTP bindings
//! - [`synthesis`]: narrative summarizer and social image composer
//! - [`codegen`]: markdown report rendering
//! - [`workflow`]: the linear pipeline entry point
//! - [`app`]: CLI and configuration management
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌──────────┐
//! │  Loader  │──▶│ Normalizer │──▶│ Summarizer │──▶│  Composer  │──▶│ Renderer │
//! └──────────┘   └────────────┘   └─────┬──────┘   └─────┬──────┘   └──────────┘
//!                                       │                │
//!                                       ▼                ▼
//!                                 ┌──────────────────────────┐
//!                                 │   ResponseCache (disk)   │
//!                                 └──────────────────────────┘
//! ```

pub mod flow;
pub mod normalize;
pub mod cache;
pub mod capability;
pub mod synthesis;
pub mod codegen;
pub mod workflow;
pub mod app;

pub use flow::{FlowDocument, FlowMeta, RawStep};
pub use normalize::{normalize, NormalizedStep, StepKind};
pub use cache::{Fingerprint, Namespace, ResponseCache};
pub use capability::{ImageGenerator, TextGenerator};
pub use synthesis::{FlowSummary, ImageComposer, NarrativeSummarizer, SocialImage};
pub use codegen::ReportRenderer;
pub use workflow::{FlowPipeline, PipelineConfig, RunOutcome};

/// Result type alias for the flow reporter
pub type Result<T> = std::result::Result<T, Error>;

/// External capability a pipeline stage depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    TextGeneration,
    ImageGeneration,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::TextGeneration => write!(f, "text generation"),
            Capability::ImageGeneration => write!(f, "image generation"),
        }
    }
}

/// Error types for the flow reporter
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Input error: {0}")]
    Input(String),

    #[error("{capability} call failed: {message}")]
    ExternalCall {
        capability: Capability,
        message: String,
    },

    #[error("Cache I/O error: {0}")]
    CacheIo(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build an external call error for the given capability
    pub fn external(capability: Capability, message: impl Into<String>) -> Self {
        Error::ExternalCall {
            capability,
            message: message.into(),
        }
    }

    /// Whether this error came from a text or image capability
    pub fn is_external_call(&self) -> bool {
        matches!(self, Error::ExternalCall { .. })
    }
}
