//! Narrative & Image Synthesis
//!
//! Turns normalized steps into a summary, and a summary into a social image.
//! Both go through the response cache.

pub mod narrative;
pub mod image_composer;

pub use narrative::{
    parse_summary, FlowContext, FlowSummary, NarrativeSummarizer, PROMPT_TEMPLATE_VERSION,
};
pub use image_composer::{
    build_image_prompt, ImageComposer, ImageFormat, SocialImage, IMAGE_PROMPT_VERSION,
};
