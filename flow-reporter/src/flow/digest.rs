//! Structured Flow Digest
//!
//! A compact JSON view of a flow: metadata, chapter outline, and the
//! page/click context of every step next to its normalized description.

use super::loader::FlowDocument;
use super::types::{FlowMeta, StepTimestamp};
use crate::normalize::{normalize, StepKind};
use serde::Serialize;

/// Chapter outline entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterDigest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

/// Per-step digest entry
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDigest {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<StepTimestamp>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_element_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hotspot_labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

/// Whole-flow digest
#[derive(Debug, Clone, Serialize)]
pub struct FlowDigest {
    pub meta: FlowMeta,
    pub chapters: Vec<ChapterDigest>,
    pub steps: Vec<StepDigest>,
}

impl FlowDigest {
    /// Build the digest for a loaded flow
    pub fn build(flow: &FlowDocument) -> Self {
        let normalized = normalize(&flow.steps);

        let steps = normalized
            .iter()
            .map(|step| {
                let raw = step.raw;
                let mut digest = StepDigest {
                    index: step.index,
                    id: raw.id.clone(),
                    step_type: raw.step_type.clone().unwrap_or_default(),
                    timestamp: raw.timestamp.clone(),
                    description: step.human_description.clone(),
                    ..Default::default()
                };

                match &step.kind {
                    StepKind::Image | StepKind::Video => {
                        if let Some(page) = &raw.page_context {
                            digest.page_title = page.title.clone();
                            digest.page_url = page.url.clone();
                        }
                        if let Some(click) = &raw.click_context {
                            digest.click_text = click.text.clone();
                            digest.click_selector = click.css_selector.clone();
                            digest.click_element_type = click.element_type.clone();
                        }
                        digest.hotspot_labels = raw
                            .hotspots
                            .iter()
                            .filter_map(|h| h.label.clone())
                            .filter(|l| !l.is_empty())
                            .collect();
                    }
                    StepKind::Chapter => {
                        digest.title = raw.title.clone();
                        digest.subtitle = raw.subtitle.clone();
                    }
                    StepKind::Other(_) => {}
                }
                digest
            })
            .collect();

        Self {
            meta: flow.meta.clone(),
            chapters: chapters(flow),
            steps,
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// CHAPTER steps in flow order
pub fn chapters(flow: &FlowDocument) -> Vec<ChapterDigest> {
    flow.steps
        .iter()
        .filter(|s| {
            s.step_type
                .as_deref()
                .map(StepKind::parse)
                .is_some_and(|k| k == StepKind::Chapter)
        })
        .map(|s| ChapterDigest {
            id: s.id.clone(),
            title: s.title.clone(),
            subtitle: s.subtitle.clone(),
        })
        .collect()
}
