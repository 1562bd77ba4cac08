//! Narrative Summarization
//!
//! Turns the normalized step sequence into a titled narrative with one gloss
//! per step. The text capability is called through the response cache; its
//! reply is parsed leniently and every missing piece falls back to something
//! derived from the steps themselves.

use crate::cache::{canonical_json, Fingerprint, Namespace, ResponseCache};
use crate::capability::TextGenerator;
use crate::flow::FlowMeta;
use crate::normalize::NormalizedStep;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Bumped whenever the prompt wording changes, so old entries stop matching
pub const PROMPT_TEMPLATE_VERSION: &str = "narrative-v1";

const DEFAULT_TITLE: &str = "Recorded flow";

/// Structured summary of one flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSummary {
    /// Short title for the flow
    pub title: String,
    /// Prose describing the whole flow
    pub overall_narrative: String,
    /// One gloss per normalized step, same order
    pub step_descriptions: Vec<String>,
}

/// Flow-level facts that go into the prompt alongside the steps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowContext {
    pub name: Option<String>,
    pub use_case: Option<String>,
}

impl FlowContext {
    pub fn from_meta(meta: &FlowMeta) -> Self {
        Self {
            name: non_blank(meta.name.as_deref()),
            use_case: non_blank(meta.use_case.as_deref()),
        }
    }
}

/// Narrative summarizer backed by a text generator
#[derive(Debug, Clone)]
pub struct NarrativeSummarizer {
    cache: ResponseCache,
    context: FlowContext,
}

impl NarrativeSummarizer {
    /// Create a summarizer that stores replies in `cache`
    pub fn new(cache: ResponseCache) -> Self {
        Self {
            cache,
            context: FlowContext::default(),
        }
    }

    /// Attach flow-level context
    pub fn with_context(mut self, context: FlowContext) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &FlowContext {
        &self.context
    }

    /// Summarize `steps`, calling `generator` only on a cache miss.
    ///
    /// A generator failure is returned as is. A reply that is malformed or
    /// short still yields a complete summary.
    pub fn summarize(
        &self,
        steps: &[NormalizedStep<'_>],
        generator: &dyn TextGenerator,
    ) -> crate::Result<FlowSummary> {
        let fingerprint = self.fingerprint(steps, generator.model_id());
        let prompt = self.build_prompt(steps);

        debug!(
            steps = steps.len(),
            fingerprint = %fingerprint,
            "Summarizing flow"
        );

        let response: String = self
            .cache
            .get_or_compute(Namespace::Text, &fingerprint, || generator.generate(&prompt))?;

        let summary = parse_summary(&response, steps, &self.context);
        info!(title = %summary.title, "Flow summarized");
        Ok(summary)
    }

    /// Cache key for summarizing `steps` with the model `model_id`
    pub fn fingerprint(&self, steps: &[NormalizedStep<'_>], model_id: &str) -> Fingerprint {
        let request = json!({
            "flow_name": self.context.name,
            "use_case": self.context.use_case,
            "steps": steps.iter().map(|s| s.human_description.as_str()).collect::<Vec<_>>(),
        });

        Fingerprint::derive([
            "narrative",
            PROMPT_TEMPLATE_VERSION,
            model_id,
            canonical_json(&request).as_str(),
        ])
    }

    /// Build the prompt sent to the text generator
    pub fn build_prompt(&self, steps: &[NormalizedStep<'_>]) -> String {
        let step_list = steps
            .iter()
            .map(|s| format!("{}. {}", s.index + 1, s.human_description))
            .collect::<Vec<_>>()
            .join("\n");

        let mut context = String::new();
        if let Some(name) = &self.context.name {
            context.push_str(&format!("Flow name: {}\n", name));
        }
        if let Some(use_case) = &self.context.use_case {
            context.push_str(&format!("Use case: {}\n", use_case));
        }

        format!(
            r#"You are writing a short report about a recorded user flow.

{}Steps, in order:
{}

Write:
1. A concise title for the flow
2. A narrative paragraph describing what the user accomplished
3. Exactly {} step descriptions, one per step above and in the same order

Respond in JSON format:
{{
  "title": "...",
  "narrative": "...",
  "steps": ["...", "..."]
}}"#,
            context,
            step_list,
            steps.len()
        )
    }
}

/// Interpret a text generator reply, filling every gap from the steps.
pub fn parse_summary(
    response: &str,
    steps: &[NormalizedStep<'_>],
    context: &FlowContext,
) -> FlowSummary {
    let parsed = extract_json_object(response);
    if parsed.is_none() {
        warn!("Summary response was not a JSON object, using step descriptions");
    }
    let object = parsed.as_ref();

    let title = object
        .and_then(|o| string_field(o, &["title"]))
        .or_else(|| context.name.clone())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let overall_narrative = object
        .and_then(|o| string_field(o, &["narrative", "overallNarrative"]))
        .unwrap_or_else(|| fallback_narrative(steps));

    let glosses: Vec<Option<String>> = object
        .and_then(|o| o.get("steps").or_else(|| o.get("stepDescriptions")))
        .and_then(Value::as_array)
        .map(|items| items.iter().map(gloss_text).collect())
        .unwrap_or_default();

    if object.is_some() && glosses.len() != steps.len() {
        warn!(
            expected = steps.len(),
            received = glosses.len(),
            "Summary step count mismatch, filling from step descriptions"
        );
    }

    let step_descriptions = steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            glosses
                .get(i)
                .cloned()
                .flatten()
                .unwrap_or_else(|| step.human_description.clone())
        })
        .collect();

    FlowSummary {
        title,
        overall_narrative,
        step_descriptions,
    }
}

/// The span between the first `{` and the last `}`, parsed as an object
fn extract_json_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            debug!("Failed to parse summary JSON: {}", e);
            None
        }
    }
}

fn string_field(object: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .find_map(|v| non_blank(v.as_str()))
}

fn gloss_text(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => non_blank(Some(s)),
        Value::Object(map) => string_field(map, &["description", "text"]),
        _ => None,
    }
}

fn fallback_narrative(steps: &[NormalizedStep<'_>]) -> String {
    if steps.is_empty() {
        return "The flow contains no recorded steps.".to_string();
    }
    let joined = steps
        .iter()
        .map(|s| s.human_description.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    let noun = if steps.len() == 1 { "step" } else { "steps" };
    format!("The flow covers {} {}: {}.", steps.len(), noun, joined)
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::RawStep;
    use crate::normalize::normalize;
    use crate::{Capability, Error};
    use std::cell::Cell;
    use tempfile::TempDir;

    struct ScriptedText {
        reply: Result<String, String>,
        calls: Cell<usize>,
    }

    impl ScriptedText {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: Cell::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err("service unavailable".to_string()),
                calls: Cell::new(0),
            }
        }
    }

    impl TextGenerator for ScriptedText {
        fn model_id(&self) -> &str {
            "scripted"
        }

        fn generate(&self, _prompt: &str) -> crate::Result<String> {
            self.calls.set(self.calls.get() + 1);
            self.reply
                .clone()
                .map_err(|m| Error::external(Capability::TextGeneration, m))
        }
    }

    fn raw_steps() -> Vec<RawStep> {
        vec![
            RawStep::decode(json!({"type": "CHAPTER", "metadata": {"clickTarget": "Checkout"}})),
            RawStep::decode(json!({"type": "IMAGE", "metadata": {"query": "blue shoes"}})),
            RawStep::decode(json!({"type": "VIDEO"})),
        ]
    }

    const GOOD_REPLY: &str = r#"Here you go:
```json
{"title": "Buying shoes", "narrative": "The user checked out, searched and watched.", "steps": ["Opened checkout", "Looked for blue shoes", "Watched the demo"]}
```"#;

    #[test]
    fn test_parse_well_formed_reply() {
        let raw = raw_steps();
        let steps = normalize(&raw);
        let summary = parse_summary(GOOD_REPLY, &steps, &FlowContext::default());

        assert_eq!(summary.title, "Buying shoes");
        assert_eq!(summary.overall_narrative, "The user checked out, searched and watched.");
        assert_eq!(
            summary.step_descriptions,
            vec!["Opened checkout", "Looked for blue shoes", "Watched the demo"]
        );
    }

    #[test]
    fn test_parse_short_reply_fills_missing_glosses() {
        let raw = raw_steps();
        let steps = normalize(&raw);
        let summary = parse_summary(
            r#"{"title": "T", "overallNarrative": "N", "stepDescriptions": ["first", ""]}"#,
            &steps,
            &FlowContext::default(),
        );

        assert_eq!(summary.overall_narrative, "N");
        assert_eq!(
            summary.step_descriptions,
            vec!["first", "Searched for blue shoes", "Watched a recorded segment"]
        );
    }

    #[test]
    fn test_parse_extra_glosses_are_dropped() {
        let raw = raw_steps();
        let steps = normalize(&raw[..1]);
        let summary = parse_summary(
            r#"{"title": "T", "narrative": "N", "steps": ["a", "b", "c"]}"#,
            &steps,
            &FlowContext::default(),
        );
        assert_eq!(summary.step_descriptions, vec!["a"]);
    }

    #[test]
    fn test_parse_garbage_degrades_to_step_descriptions() {
        let raw = raw_steps();
        let steps = normalize(&raw);
        let context = FlowContext {
            name: Some("Shoe shop".to_string()),
            use_case: None,
        };
        let summary = parse_summary("I cannot help with that.", &steps, &context);

        assert_eq!(summary.title, "Shoe shop");
        assert_eq!(
            summary.overall_narrative,
            "The flow covers 3 steps: Clicked on Checkout; Searched for blue shoes; Watched a recorded segment."
        );
        assert_eq!(summary.step_descriptions.len(), 3);
        assert_eq!(summary.step_descriptions[0], "Clicked on Checkout");
    }

    #[test]
    fn test_parse_blank_title_uses_default() {
        let summary = parse_summary(r#"{"title": "  "}"#, &[], &FlowContext::default());
        assert_eq!(summary.title, "Recorded flow");
        assert_eq!(summary.overall_narrative, "The flow contains no recorded steps.");
        assert!(summary.step_descriptions.is_empty());
    }

    #[test]
    fn test_prompt_lists_steps_in_order() {
        let raw = raw_steps();
        let steps = normalize(&raw);
        let summarizer = NarrativeSummarizer::new(ResponseCache::disabled()).with_context(FlowContext {
            name: Some("Shoe shop".to_string()),
            use_case: Some("Purchase".to_string()),
        });
        let prompt = summarizer.build_prompt(&steps);

        assert!(prompt.contains("Flow name: Shoe shop"));
        assert!(prompt.contains("Use case: Purchase"));
        assert!(prompt.contains("Exactly 3 step descriptions"));
        let first = prompt.find("1. Clicked on Checkout").unwrap();
        let third = prompt.find("3. Watched a recorded segment").unwrap();
        assert!(first < third);
    }

    #[test]
    fn test_fingerprint_tracks_inputs() {
        let raw = raw_steps();
        let steps = normalize(&raw);
        let summarizer = NarrativeSummarizer::new(ResponseCache::disabled());

        let base = summarizer.fingerprint(&steps, "model-a");
        assert_eq!(base, summarizer.fingerprint(&steps, "model-a"));
        assert_ne!(base, summarizer.fingerprint(&steps, "model-b"));
        assert_ne!(base, summarizer.fingerprint(&steps[..2], "model-a"));

        let mut edited = raw_steps();
        edited[1] = RawStep::decode(json!({"type": "IMAGE", "metadata": {"query": "red shoes"}}));
        let edited_steps = normalize(&edited);
        assert_ne!(base, summarizer.fingerprint(&edited_steps, "model-a"));

        let named = NarrativeSummarizer::new(ResponseCache::disabled()).with_context(FlowContext {
            name: Some("Other".to_string()),
            use_case: None,
        });
        assert_ne!(base, named.fingerprint(&steps, "model-a"));
    }

    #[test]
    fn test_summarize_twice_calls_generator_once() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let summarizer = NarrativeSummarizer::new(ResponseCache::new(temp_dir.path(), true));
        let generator = ScriptedText::ok(GOOD_REPLY);
        let raw = raw_steps();
        let steps = normalize(&raw);

        let first = summarizer.summarize(&steps, &generator).unwrap();
        let second = summarizer.summarize(&steps, &generator).unwrap();

        assert_eq!(first, second);
        assert_eq!(generator.calls.get(), 1);
    }

    #[test]
    fn test_summarize_failure_is_external_and_not_cached() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache = ResponseCache::new(temp_dir.path(), true);
        let summarizer = NarrativeSummarizer::new(cache.clone());
        let raw = raw_steps();
        let steps = normalize(&raw);

        let err = summarizer.summarize(&steps, &ScriptedText::failing()).unwrap_err();
        assert!(err.is_external_call());
        assert!(!cache.contains(Namespace::Text, &summarizer.fingerprint(&steps, "scripted")));
    }
}
