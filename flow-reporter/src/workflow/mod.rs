//! Workflow Module
//!
//! Orchestrates the complete run from flow document to report and image.

pub mod pipeline;

pub use pipeline::{default_cache_dir, write_atomic, FlowPipeline, PipelineConfig, RunOutcome};
