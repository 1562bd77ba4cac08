//! Flow Loading
//!
//! Recorded flow documents, their raw step records, and the structured digest.

pub mod types;
pub mod loader;
pub mod digest;

pub use types::{ClickContext, FlowMeta, Hotspot, PageContext, RawStep, StepTimestamp};
pub use loader::FlowDocument;
pub use digest::{ChapterDigest, FlowDigest, StepDigest};
