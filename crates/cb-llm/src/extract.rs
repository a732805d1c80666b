//! Structured extraction — the shared hard-failure boundary between the
//! generation model's free text and the typed pipeline.
//!
//! Every feature that asks the model for structured output goes through
//! `StructuredExtractor::extract`; the cleaning and validation logic is
//! deliberately not duplicated per feature.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{LlmError, LlmResult};
use crate::ollama::OllamaClient;

/// Length of the diagnostic prefixes attached to `LlmError::Extraction`.
const ERROR_PREFIX_CHARS: usize = 200;

/// Expected JSON kind of a required key, used to back-fill a
/// type-appropriate empty default under the lenient policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    List,
    Text,
    Object,
    Number,
    Bool,
}

impl FieldKind {
    fn empty_value(self) -> Value {
        match self {
            FieldKind::List => Value::Array(vec![]),
            FieldKind::Text => Value::String(String::new()),
            FieldKind::Object => Value::Object(Map::new()),
            FieldKind::Number => Value::from(0),
            FieldKind::Bool => Value::Bool(false),
        }
    }
}

/// A required key in the extracted mapping.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn list(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::List,
        }
    }
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
        }
    }
    pub const fn object(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Object,
        }
    }
    pub const fn number(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Number,
        }
    }
    pub const fn boolean(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Bool,
        }
    }
}

/// How to treat missing required keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    /// A missing key is a `Validation` error.
    Strict,
    /// A missing key is back-filled with a type-appropriate empty default
    /// and logged. Used where partial output is common and recoverable.
    Lenient,
}

/// Turns a generation call into a validated JSON object.
#[derive(Clone)]
pub struct StructuredExtractor {
    client: Arc<OllamaClient>,
}

impl StructuredExtractor {
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<OllamaClient> {
        &self.client
    }

    /// Ask the model for JSON and validate it.
    ///
    /// Tolerates markdown fencing, leading prose ("Here is the JSON:"),
    /// trailing commentary, and stray control characters. Never silently
    /// returns an empty structure: irrecoverable output is an
    /// `Extraction` error carrying diagnostic prefixes.
    pub async fn extract(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: f64,
        max_tokens: u32,
        required: &[FieldSpec],
        policy: KeyPolicy,
    ) -> LlmResult<Map<String, Value>> {
        let raw = self
            .client
            .generate(prompt, system, Some(temperature), Some(max_tokens))
            .await?;
        tracing::debug!(prefix = %char_prefix(&raw, 300), "raw model response");

        let mut object = parse_object(&raw)?;
        apply_key_policy(&mut object, required, policy)?;
        Ok(object)
    }
}

/// Parse possibly-noisy model output into a JSON object, with one
/// control-character recovery pass.
pub fn parse_object(raw: &str) -> LlmResult<Map<String, Value>> {
    let isolated = isolate_json(raw);

    let value = match serde_json::from_str::<Value>(&isolated) {
        Ok(v) => v,
        Err(first_err) => {
            let cleaned = strip_control_chars(&isolated);
            match serde_json::from_str::<Value>(&cleaned) {
                Ok(v) => {
                    tracing::warn!(
                        error = %first_err,
                        "JSON parse recovered after removing control characters"
                    );
                    v
                }
                Err(_) => {
                    return Err(LlmError::Extraction {
                        original_prefix: char_prefix(raw, ERROR_PREFIX_CHARS),
                        cleaned_prefix: char_prefix(&cleaned, ERROR_PREFIX_CHARS),
                    });
                }
            }
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(LlmError::Validation(format!(
            "top-level JSON value is not an object: {other}"
        ))),
    }
}

/// Isolate the JSON object inside noisy model output: strip markdown
/// fencing, then take the substring from the first `{` to the last `}`.
pub fn isolate_json(text: &str) -> String {
    let mut text = text.trim().to_string();

    if let Some(start) = text.find("```json") {
        let after = &text[start + 7..];
        let end = after.find("```").unwrap_or(after.len());
        text = after[..end].trim().to_string();
    } else if text.starts_with("```") {
        text = text
            .lines()
            .filter(|line| !line.trim_start().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            text = text[start..=end].to_string();
        }
    }

    text.trim().to_string()
}

/// Remove non-printable control characters, preserving newline, carriage
/// return, and tab.
pub fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

fn apply_key_policy(
    object: &mut Map<String, Value>,
    required: &[FieldSpec],
    policy: KeyPolicy,
) -> LlmResult<()> {
    for spec in required {
        if object.contains_key(spec.name) {
            continue;
        }
        match policy {
            KeyPolicy::Strict => {
                return Err(LlmError::Validation(format!(
                    "missing required key: {}",
                    spec.name
                )));
            }
            KeyPolicy::Lenient => {
                tracing::warn!(key = spec.name, "back-filling missing key with empty default");
                object.insert(spec.name.to_string(), spec.kind.empty_value());
            }
        }
    }
    Ok(())
}

fn char_prefix(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── isolate_json ─────────────────────────────────────────────

    #[test]
    fn isolate_raw_object() {
        let input = r#"{"service_type": "短期入所"}"#;
        assert_eq!(isolate_json(input), input);
    }

    #[test]
    fn isolate_json_fence_with_language_tag() {
        let input = "```json\n{\"a\": 1}\n```";
        assert_eq!(isolate_json(input), "{\"a\": 1}");
    }

    #[test]
    fn isolate_plain_fence() {
        let input = "```\n{\"a\": 1}\n```";
        assert_eq!(isolate_json(input), "{\"a\": 1}");
    }

    #[test]
    fn isolate_with_leading_prose_and_trailing_commentary() {
        let input = "以下がJSONです:\n```json\n{\"a\": 1}\n```\n以上です。";
        assert_eq!(isolate_json(input), "{\"a\": 1}");
    }

    #[test]
    fn isolate_prose_without_fence() {
        let input = "Here is the JSON: {\"a\": 1} — hope that helps!";
        assert_eq!(isolate_json(input), "{\"a\": 1}");
    }

    #[test]
    fn fenced_output_parses_same_as_unwrapped() {
        let bare = r#"{"keywords": ["送迎", "医療的ケア"], "district": "八幡西区"}"#;
        let wrapped = format!("結果:\n```json\n{bare}\n```\nご確認ください。");
        assert_eq!(parse_object(bare).unwrap(), parse_object(&wrapped).unwrap());
    }

    // ── control-character recovery ───────────────────────────────

    #[test]
    fn recovers_after_stripping_control_chars() {
        let input = "{\"a\": \"b\u{0000}c\"}";
        let object = parse_object(input).unwrap();
        assert_eq!(object["a"], "bc");
    }

    #[test]
    fn preserves_whitespace_control_chars() {
        assert_eq!(strip_control_chars("a\n\tb\u{0007}c"), "a\n\tbc");
    }

    #[test]
    fn irrecoverable_output_is_extraction_error() {
        let err = parse_object("the model refused to answer").unwrap_err();
        match err {
            LlmError::Extraction {
                original_prefix, ..
            } => assert!(original_prefix.starts_with("the model")),
            other => panic!("expected Extraction, got {other:?}"),
        }
    }

    #[test]
    fn non_object_top_level_is_validation_error() {
        // A bare array has no outer braces, so brace isolation leaves it
        // untouched and parsing yields a non-object.
        let err = parse_object("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, LlmError::Validation(_)));
    }

    // ── key policy ───────────────────────────────────────────────

    fn object_with(keys: &[(&str, Value)]) -> Map<String, Value> {
        keys.iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn strict_policy_rejects_missing_key() {
        let mut object = object_with(&[("strengths", Value::Array(vec![]))]);
        let required = [FieldSpec::list("strengths"), FieldSpec::list("challenges")];
        let err = apply_key_policy(&mut object, &required, KeyPolicy::Strict).unwrap_err();
        assert!(err.to_string().contains("challenges"));
    }

    #[test]
    fn lenient_policy_backfills_typed_defaults() {
        let mut object = object_with(&[]);
        let required = [
            FieldSpec::list("needs"),
            FieldSpec::text("note"),
            FieldSpec::object("classification"),
            FieldSpec::number("score"),
            FieldSpec::boolean("sufficient"),
        ];
        apply_key_policy(&mut object, &required, KeyPolicy::Lenient).unwrap();
        assert_eq!(object["needs"], Value::Array(vec![]));
        assert_eq!(object["note"], Value::String(String::new()));
        assert!(object["classification"].as_object().unwrap().is_empty());
        assert_eq!(object["score"], Value::from(0));
        assert_eq!(object["sufficient"], Value::Bool(false));
    }

    #[test]
    fn present_keys_are_untouched() {
        let mut object = object_with(&[("needs", serde_json::json!(["就労支援"]))]);
        apply_key_policy(&mut object, &[FieldSpec::list("needs")], KeyPolicy::Strict).unwrap();
        assert_eq!(object["needs"], serde_json::json!(["就労支援"]));
    }
}
