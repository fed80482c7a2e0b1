//! Validation of whatever text the backend sent back.

use serde_json::{Map, Value};

use pulse_core::errors::InferenceError;
use pulse_core::insight::{normalize_confidence, MAX_ACTIONS};

/// Used when the payload's confidence is missing or not numeric.
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// A payload that passed validation, already normalized.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedPayload {
    pub summary: String,
    pub confidence: f64,
    /// Trimmed, non-empty, at most [`MAX_ACTIONS`]. May be empty.
    pub actions: Vec<String>,
    pub reasoning: Option<String>,
}

/// Outcome of parsing a backend reply.
#[derive(Clone, Debug, PartialEq)]
pub enum PayloadParse {
    Valid(ValidatedPayload),
    /// Valid JSON that does not satisfy the contract.
    SchemaError(String),
    /// No JSON object could be read from the text.
    ParseError(String),
}

impl PayloadParse {
    pub fn into_result(self) -> Result<ValidatedPayload, InferenceError> {
        match self {
            Self::Valid(payload) => Ok(payload),
            Self::SchemaError(msg) => Err(InferenceError::SchemaViolation(msg)),
            Self::ParseError(msg) => Err(InferenceError::MalformedPayload(msg)),
        }
    }
}

/// Parse and validate a raw reply.
pub fn parse_payload(text: &str) -> PayloadParse {
    let Some(span) = extract_json_object(text) else {
        return PayloadParse::ParseError("no JSON object found in response".into());
    };

    let object: Map<String, Value> = match serde_json::from_str(span) {
        Ok(object) => object,
        Err(e) => return PayloadParse::ParseError(format!("invalid JSON: {e}")),
    };

    let summary = match object.get("summary") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::String(_)) => return PayloadParse::SchemaError("summary is empty".into()),
        Some(_) => return PayloadParse::SchemaError("summary is not a string".into()),
        None => return PayloadParse::SchemaError("summary is missing".into()),
    };

    PayloadParse::Valid(ValidatedPayload {
        summary,
        confidence: coerce_confidence(object.get("confidence")),
        actions: coerce_actions(object.get("actions")),
        reasoning: object
            .get("reasoning")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
    })
}

/// First balanced `{...}` span in `text`, skipping braces inside JSON strings.
/// A `{` that never closes is skipped and the scan resumes at the next one.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut from = 0;
    while let Some(found) = text[from..].find('{') {
        let start = from + found;
        if let Some(end) = balanced_end(&text[start..]) {
            return Some(&text[start..start + end]);
        }
        from = start + 1;
    }
    None
}

/// Byte length of the balanced object opening at the start of `text`.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn coerce_confidence(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.and_then(normalize_confidence)
        .unwrap_or(DEFAULT_CONFIDENCE)
}

fn coerce_actions(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .filter(|action| !action.is_empty())
        .take(MAX_ACTIONS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(text: &str) -> ValidatedPayload {
        match parse_payload(text) {
            PayloadParse::Valid(p) => p,
            other => panic!("expected valid payload, got {other:?}"),
        }
    }

    #[test]
    fn plain_object() {
        let p = valid(r#"{"summary":"On track","confidence":0.82,"actions":["a","b"],"reasoning":"fine"}"#);
        assert_eq!(p.summary, "On track");
        assert_eq!(p.confidence, 0.82);
        assert_eq!(p.actions, vec!["a", "b"]);
        assert_eq!(p.reasoning.as_deref(), Some("fine"));
    }

    #[test]
    fn tolerates_preamble_and_postamble() {
        let text = "Sure! Here is my assessment:\n```json\n{\"summary\": \"ok {not a brace}\", \"nested\": {\"x\": \"}\"}}\n```\nHope that helps {really}.";
        let p = valid(text);
        assert_eq!(p.summary, "ok {not a brace}");
    }

    #[test]
    fn extract_handles_escaped_quotes() {
        let text = r#"prefix {"summary": "say \"}\" loudly"} suffix"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"summary": "say \"}\" loudly"}"#)
        );
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{\"unterminated\": 1"), None);
    }

    #[test]
    fn unclosed_preamble_brace_is_skipped() {
        let text = r#"Note {draft: {"summary":"x"}"#;
        assert_eq!(extract_json_object(text), Some(r#"{"summary":"x"}"#));
        assert_eq!(valid(text).summary, "x");
    }

    #[test]
    fn confidence_normalization() {
        assert_eq!(valid(r#"{"summary":"s","confidence":5}"#).confidence, 0.99);
        assert_eq!(valid(r#"{"summary":"s","confidence":"abc"}"#).confidence, 0.7);
        assert_eq!(valid(r#"{"summary":"s","confidence":"0.456"}"#).confidence, 0.46);
        assert_eq!(valid(r#"{"summary":"s","confidence":0.001}"#).confidence, 0.05);
        assert_eq!(valid(r#"{"summary":"s"}"#).confidence, 0.7);
        assert_eq!(valid(r#"{"summary":"s","confidence":null}"#).confidence, 0.7);
    }

    #[test]
    fn actions_are_coerced_trimmed_and_capped() {
        let p = valid(r#"{"summary":"s","actions":["  one  ", "", 2, null, {"x":1}, "three", "four", "five", "six"]}"#);
        assert_eq!(p.actions, vec!["one", "2", "three", "four"]);

        assert!(valid(r#"{"summary":"s","actions":"not a list"}"#).actions.is_empty());
    }

    #[test]
    fn schema_errors() {
        assert!(matches!(parse_payload(r#"{"confidence":0.5}"#), PayloadParse::SchemaError(_)));
        assert!(matches!(parse_payload(r#"{"summary":42}"#), PayloadParse::SchemaError(_)));
        assert!(matches!(parse_payload(r#"{"summary":"   "}"#), PayloadParse::SchemaError(_)));
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(parse_payload("I could not decide."), PayloadParse::ParseError(_)));
        assert!(matches!(parse_payload("{summary: unquoted}"), PayloadParse::ParseError(_)));
    }

    #[test]
    fn into_result_maps_to_inference_errors() {
        assert!(matches!(
            parse_payload("nope").into_result(),
            Err(InferenceError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_payload("{}").into_result(),
            Err(InferenceError::SchemaViolation(_))
        ));
        assert!(parse_payload(r#"{"summary":"x"}"#).into_result().is_ok());
    }
}
