//! Step Normalization
//!
//! Turns raw, type-dependent step records into uniformly described steps.

pub mod step_normalizer;

pub use step_normalizer::{
    normalize, normalize_with_warnings, ClickTarget, NormalizedStep, StepAction,
    StepDecodeWarning, StepKind, UNRECOGNIZED_DESCRIPTION,
};
