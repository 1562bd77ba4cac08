//! Report Generation
//!
//! Renders a flow summary and its image reference as markdown.

pub mod report_renderer;

pub use report_renderer::{ReportDocument, ReportRenderer};
