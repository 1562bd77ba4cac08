//! Flow Document Loading
//!
//! Reads a recorded flow from disk into an ordered sequence of raw steps.

use super::types::{FlowMeta, RawStep};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// A loaded flow: metadata plus steps in recorded order
#[derive(Debug, Clone, Default)]
pub struct FlowDocument {
    /// Flow-level metadata
    pub meta: FlowMeta,
    /// Steps in recorded order
    pub steps: Vec<RawStep>,
}

impl FlowDocument {
    /// Load a flow document from a file.
    ///
    /// An unreadable file or invalid JSON is an input error. Individual steps
    /// that fail to decode are kept as placeholders.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Input(format!("failed to read {}: {}", path.display(), e))
        })?;
        let document = Self::from_json_str(&content)
            .map_err(|e| crate::Error::Input(format!("{}: {}", path.display(), e)))?;

        debug!(
            path = %path.display(),
            steps = document.steps.len(),
            "Loaded flow document"
        );
        Ok(document)
    }

    /// Parse a flow document from JSON text
    pub fn from_json_str(content: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| format!("invalid JSON: {}", e))?;
        Self::from_value(value)
    }

    /// Build a flow document from a parsed JSON value.
    ///
    /// Accepts either an object with a `steps` array or a bare array of steps.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Array(items) => Ok(Self {
                meta: FlowMeta::default(),
                steps: decode_steps(items),
            }),
            Value::Object(mut map) => {
                let steps = match map.remove("steps") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(items)) => decode_steps(items),
                    Some(_) => return Err("`steps` must be an array".to_string()),
                };
                let meta: FlowMeta = serde_json::from_value(Value::Object(map))
                    .map_err(|e| format!("invalid flow metadata: {}", e))?;
                Ok(Self { meta, steps })
            }
            _ => Err("flow document must be a JSON object or array".to_string()),
        }
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the flow has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index steps by their `id`; steps without one are skipped
    pub fn index_steps_by_id(&self) -> HashMap<&str, &RawStep> {
        self.steps
            .iter()
            .filter_map(|s| s.id.as_deref().map(|id| (id, s)))
            .collect()
    }
}

fn decode_steps(items: Vec<Value>) -> Vec<RawStep> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let step = RawStep::decode(item);
            if let Some(reason) = &step.decode_error {
                warn!(index, reason = %reason, "Step could not be decoded, keeping placeholder");
            }
            for field in &step.dropped_fields {
                debug!(index, field = %field, "Dropped malformed step field");
            }
            step
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_object_document() {
        let doc = FlowDocument::from_json_str(
            r#"{
                "name": "Checkout",
                "useCase": "demo",
                "steps": [
                    {"id": "a", "type": "CHAPTER", "title": "Intro"},
                    {"id": "b", "type": "IMAGE"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(doc.meta.name.as_deref(), Some("Checkout"));
        assert_eq!(doc.meta.use_case.as_deref(), Some("demo"));
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.steps[0].title.as_deref(), Some("Intro"));
    }

    #[test]
    fn test_load_bare_array() {
        let doc = FlowDocument::from_json_str(r#"[{"type": "VIDEO"}, {"type": "IMAGE"}]"#).unwrap();
        assert!(doc.meta.is_empty());
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_missing_steps_is_empty_flow() {
        let doc = FlowDocument::from_json_str(r#"{"name": "Empty", "steps": null}"#).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_non_array_steps_rejected() {
        let err = FlowDocument::from_json_str(r#"{"steps": "nope"}"#).unwrap_err();
        assert!(err.contains("steps"));
    }

    #[test]
    fn test_scalar_document_rejected() {
        assert!(FlowDocument::from_json_str("42").is_err());
    }

    #[test]
    fn test_malformed_step_kept_in_order() {
        let doc = FlowDocument::from_json_str(r#"[{"type": "VIDEO"}, 17, {"type": "IMAGE"}]"#).unwrap();
        assert_eq!(doc.len(), 3);
        assert!(doc.steps[1].decode_error.is_some());
        assert_eq!(doc.steps[2].step_type.as_deref(), Some("IMAGE"));
    }

    #[test]
    fn test_load_invalid_json_is_input_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("flow.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = FlowDocument::load(&path);
        assert!(matches!(result, Err(crate::Error::Input(_))));
    }

    #[test]
    fn test_load_missing_file_is_input_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let result = FlowDocument::load(&temp_dir.path().join("missing.json"));
        match result {
            Err(crate::Error::Input(msg)) => assert!(msg.contains("missing.json")),
            other => panic!("Expected input error, got {:?}", other),
        }
    }

    #[test]
    fn test_index_steps_by_id() {
        let doc = FlowDocument::from_json_str(
            r#"[{"id": "x", "type": "IMAGE"}, {"type": "VIDEO"}, {"id": "y", "type": "CHAPTER"}]"#,
        )
        .unwrap();

        let index = doc.index_steps_by_id();
        assert_eq!(index.len(), 2);
        assert_eq!(index["y"].step_type.as_deref(), Some("CHAPTER"));
    }
}
