//! Step Normalization
//!
//! Maps heterogeneous raw step records onto a uniform, described form.

use crate::flow::types::{scalar_to_string, RawStep};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Longest label carried into a description
const MAX_LABEL_CHARS: usize = 120;

/// Fallback description for steps nothing is known about
pub const UNRECOGNIZED_DESCRIPTION: &str = "Performed an action";

const SEARCH_KEYS: &[&str] = &["query", "searchQuery", "search"];
const INPUT_KEYS: &[&str] = &["value", "inputValue", "input", "typedText"];
const CLICK_KEYS: &[&str] = &["clickTarget", "target", "label", "elementLabel"];

/// Validated step type tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    Image,
    Chapter,
    Video,
    /// Any tag this normalizer does not know, kept verbatim
    Other(String),
}

impl StepKind {
    /// Parse a type tag, case-insensitively
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "IMAGE" => StepKind::Image,
            "CHAPTER" => StepKind::Chapter,
            "VIDEO" => StepKind::Video,
            _ => StepKind::Other(tag.to_string()),
        }
    }

    /// Whether the tag is one of the known kinds
    pub fn is_recognized(&self) -> bool {
        !matches!(self, StepKind::Other(_))
    }

    /// Canonical tag text
    pub fn as_str(&self) -> &str {
        match self {
            StepKind::Image => "IMAGE",
            StepKind::Chapter => "CHAPTER",
            StepKind::Video => "VIDEO",
            StepKind::Other(tag) => tag,
        }
    }
}

/// What the user clicked on
#[derive(Debug, Clone, PartialEq)]
pub enum ClickTarget {
    Label(String),
    Coordinates { x: f64, y: f64 },
    Unlabeled,
}

/// Interpreted user action for one step
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    Search { query: String },
    Input { value: String },
    Click { target: ClickTarget },
    Chapter { title: Option<String> },
    View { page: Option<String> },
    Watch,
    Unrecognized,
}

impl StepAction {
    /// Human-readable description; never empty
    pub fn describe(&self) -> String {
        match self {
            StepAction::Search { query } => format!("Searched for {}", query),
            StepAction::Input { value } => format!("Entered {}", value),
            StepAction::Click { target } => match target {
                ClickTarget::Label(label) => format!("Clicked on {}", label),
                ClickTarget::Coordinates { x, y } => format!(
                    "Clicked on the element at ({}, {})",
                    screen_coordinate(*x),
                    screen_coordinate(*y)
                ),
                ClickTarget::Unlabeled => "Clicked on an element".to_string(),
            },
            StepAction::Chapter { title: Some(title) } => format!("Started the \"{}\" chapter", title),
            StepAction::Chapter { title: None } => "Started a new chapter".to_string(),
            StepAction::View { page: Some(page) } => format!("Viewed {}", page),
            StepAction::View { page: None } => "Viewed a screen".to_string(),
            StepAction::Watch => "Watched a recorded segment".to_string(),
            StepAction::Unrecognized => UNRECOGNIZED_DESCRIPTION.to_string(),
        }
    }
}

/// Whole-pixel coordinate, clamped so the description stays short
fn screen_coordinate(v: f64) -> i64 {
    const LIMIT: f64 = 1_000_000.0;
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(-LIMIT, LIMIT) as i64
}

/// Uniform view of one step
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedStep<'a> {
    /// Position in the flow, contiguous from 0
    pub index: usize,
    /// Validated type tag
    pub kind: StepKind,
    /// Short description of what the user did
    pub human_description: String,
    /// Originating raw record
    #[serde(skip)]
    pub raw: &'a RawStep,
}

/// A step, or one of its fields, that could not be understood
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDecodeWarning {
    /// Step position
    pub index: usize,
    /// What was not understood
    pub reason: String,
}

/// Normalize steps, logging any decode warnings.
pub fn normalize(raw_steps: &[RawStep]) -> Vec<NormalizedStep<'_>> {
    let (steps, warnings) = normalize_with_warnings(raw_steps);
    for w in &warnings {
        warn!(index = w.index, reason = %w.reason, "Step decode warning");
    }
    steps
}

/// Normalize steps and return the decode warnings alongside.
pub fn normalize_with_warnings(
    raw_steps: &[RawStep],
) -> (Vec<NormalizedStep<'_>>, Vec<StepDecodeWarning>) {
    let mut warnings = Vec::new();

    let steps = raw_steps
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let kind = raw
                .step_type
                .as_deref()
                .map(StepKind::parse)
                .unwrap_or_else(|| StepKind::Other(String::new()));

            if let Some(reason) = &raw.decode_error {
                warnings.push(StepDecodeWarning {
                    index,
                    reason: reason.clone(),
                });
            } else if !kind.is_recognized() {
                let reason = match raw.step_type.as_deref() {
                    Some(tag) => format!("unrecognized step type `{}`", tag),
                    None => "missing step type".to_string(),
                };
                warnings.push(StepDecodeWarning { index, reason });
            }
            for field in &raw.dropped_fields {
                warnings.push(StepDecodeWarning {
                    index,
                    reason: format!("dropped field {}", field),
                });
            }

            let action = if raw.decode_error.is_some() {
                StepAction::Unrecognized
            } else {
                interpret(&kind, raw)
            };

            NormalizedStep {
                index,
                kind,
                human_description: action.describe(),
                raw,
            }
        })
        .collect();

    (steps, warnings)
}

/// Interpret a decoded step of the given kind
pub fn interpret(kind: &StepKind, raw: &RawStep) -> StepAction {
    match kind {
        StepKind::Video => StepAction::Watch,
        StepKind::Other(_) => StepAction::Unrecognized,
        StepKind::Image | StepKind::Chapter => {
            if let Some(query) = first_text(raw, SEARCH_KEYS) {
                return StepAction::Search { query };
            }
            if let Some(value) = first_text(raw, INPUT_KEYS) {
                return StepAction::Input { value };
            }
            if let Some(target) = click_target(raw) {
                return StepAction::Click { target };
            }
            if *kind == StepKind::Chapter {
                StepAction::Chapter {
                    title: raw.title.as_deref().and_then(clean_label),
                }
            } else {
                StepAction::View {
                    page: raw
                        .page_context
                        .as_ref()
                        .and_then(|p| p.title.as_deref())
                        .and_then(clean_label),
                }
            }
        }
    }
}

/// Best-effort click target; `None` when the step carries no click data at all
fn click_target(raw: &RawStep) -> Option<ClickTarget> {
    let mut has_click_data = false;

    for key in CLICK_KEYS {
        if let Some(value) = raw.meta(key) {
            has_click_data = true;
            if let Some(label) = scalar_to_string(value).as_deref().and_then(clean_label) {
                return Some(ClickTarget::Label(label));
            }
        }
    }

    if let Some(click) = &raw.click_context {
        has_click_data = true;
        if let Some(label) = click.text.as_deref().and_then(clean_label) {
            return Some(ClickTarget::Label(label));
        }
    }

    if !raw.hotspots.is_empty() {
        has_click_data = true;
        if let Some(label) = raw
            .hotspots
            .iter()
            .filter_map(|h| h.label.as_deref())
            .find_map(clean_label)
        {
            return Some(ClickTarget::Label(label));
        }
    }

    if let Some((x, y)) = coordinates(raw) {
        return Some(ClickTarget::Coordinates { x, y });
    }

    has_click_data.then_some(ClickTarget::Unlabeled)
}

fn coordinates(raw: &RawStep) -> Option<(f64, f64)> {
    if let (Some(x), Some(y)) = (
        raw.meta("x").and_then(Value::as_f64),
        raw.meta("y").and_then(Value::as_f64),
    ) {
        return Some((x, y));
    }

    match raw.meta("coordinates")? {
        Value::Object(map) => Some((
            map.get("x").and_then(Value::as_f64)?,
            map.get("y").and_then(Value::as_f64)?,
        )),
        Value::Array(pair) if pair.len() == 2 => {
            Some((pair[0].as_f64()?, pair[1].as_f64()?))
        }
        _ => None,
    }
}

fn first_text(raw: &RawStep, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| raw.meta(key))
        .filter_map(scalar_to_string)
        .find_map(|s| clean_label(&s))
}

/// Collapse whitespace and bound the length; `None` for blank text
fn clean_label(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    if collapsed.chars().count() <= MAX_LABEL_CHARS {
        return Some(collapsed);
    }
    let truncated: String = collapsed.chars().take(MAX_LABEL_CHARS - 1).collect();
    Some(format!("{}…", truncated.trim_end()))
}
