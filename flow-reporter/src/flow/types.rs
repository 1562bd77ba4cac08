//! Flow Data Structures
//!
//! Raw step records as they appear in a recorded flow document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Accept any JSON scalar and keep it as text; objects and arrays are dropped.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| scalar_to_string(&v)))
}

/// Render a JSON scalar as display text.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Flow-level metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowMeta {
    /// Flow name
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// What the flow demonstrates
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub use_case: Option<String>,
    /// Version of the recording tool's schema
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Free-text description
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Publication status
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Creation time as recorded
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

impl FlowMeta {
    /// True when no metadata field is set
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.use_case.is_none()
            && self.schema_version.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.created.is_none()
    }
}

/// Step timestamp, either epoch-based or textual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepTimestamp {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

/// Page the user was on when the step was captured
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageContext {
    #[serde(deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub url: Option<String>,
}

/// Element the user clicked
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClickContext {
    #[serde(deserialize_with = "lenient_string")]
    pub text: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub css_selector: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub element_type: Option<String>,
}

/// Highlighted region annotated on a screenshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hotspot {
    #[serde(deserialize_with = "lenient_string")]
    pub label: Option<String>,
}

/// One step record as loaded from the flow document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawStep {
    /// Step identifier
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    /// Step type tag (IMAGE, CHAPTER, VIDEO, ...)
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub step_type: Option<String>,
    /// Capture time
    pub timestamp: Option<StepTimestamp>,
    /// Type-dependent free-form metadata
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: Map<String, Value>,
    /// Screenshot or frame reference
    #[serde(alias = "imageUrl", deserialize_with = "lenient_string")]
    pub image_ref: Option<String>,
    /// Chapter title
    #[serde(deserialize_with = "lenient_string")]
    pub title: Option<String>,
    /// Chapter subtitle
    #[serde(deserialize_with = "lenient_string")]
    pub subtitle: Option<String>,
    /// Page context for IMAGE/VIDEO steps
    pub page_context: Option<PageContext>,
    /// Click context for IMAGE/VIDEO steps
    pub click_context: Option<ClickContext>,
    /// Annotated hotspots
    #[serde(deserialize_with = "null_as_default")]
    pub hotspots: Vec<Hotspot>,
    /// Why this record could not be decoded at all, if it could not
    #[serde(skip)]
    pub decode_error: Option<String>,
    /// Fields that had the wrong shape and were dropped
    #[serde(skip)]
    pub dropped_fields: Vec<String>,
}

impl RawStep {
    /// Decode one step from its JSON value.
    ///
    /// Never fails. Each field is read on its own: a field with the wrong
    /// shape is dropped and noted in `dropped_fields`, the rest of the step
    /// is kept. A record that is not an object becomes an untyped
    /// placeholder carrying the decode error.
    pub fn decode(value: Value) -> Self {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Self::placeholder(format!("step is not an object: {}", json_kind(&other)))
            }
        };

        let mut fields = FieldReader {
            map,
            dropped: Vec::new(),
        };
        let image_ref = match fields.text("imageRef") {
            Some(image_ref) => Some(image_ref),
            None => fields.text("imageUrl"),
        };

        Self {
            id: fields.text("id"),
            step_type: fields.text("type"),
            timestamp: fields.typed("timestamp"),
            metadata: fields.typed("metadata").unwrap_or_default(),
            image_ref,
            title: fields.text("title"),
            subtitle: fields.text("subtitle"),
            page_context: fields.typed("pageContext"),
            click_context: fields.typed("clickContext"),
            hotspots: fields.list("hotspots"),
            decode_error: None,
            dropped_fields: fields.dropped,
        }
    }

    fn placeholder(reason: String) -> Self {
        Self {
            decode_error: Some(reason),
            ..Default::default()
        }
    }

    /// Look up a metadata field
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

/// Reads step fields one at a time, collecting the ones it had to drop
struct FieldReader {
    map: Map<String, Value>,
    dropped: Vec<String>,
}

impl FieldReader {
    /// Present, non-null value for `key`
    fn take(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key).filter(|v| !v.is_null())
    }

    /// Any scalar as text
    fn text(&mut self, key: &str) -> Option<String> {
        let value = self.take(key)?;
        let text = scalar_to_string(&value);
        if text.is_none() {
            self.dropped
                .push(format!("`{}`: expected a scalar, found {}", key, json_kind(&value)));
        }
        text
    }

    fn typed<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let value = self.take(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                self.dropped.push(format!("`{}`: {}", key, e));
                None
            }
        }
    }

    /// Array items decoded independently; bad items are dropped
    fn list<T: DeserializeOwned>(&mut self, key: &str) -> Vec<T> {
        let items = match self.take(key) {
            None => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.dropped
                    .push(format!("`{}`: expected an array, found {}", key, json_kind(&other)));
                return Vec::new();
            }
        };

        let mut decoded = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            match serde_json::from_value(item) {
                Ok(v) => decoded.push(v),
                Err(e) => self.dropped.push(format!("`{}[{}]`: {}", key, i, e)),
            }
        }
        decoded
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
