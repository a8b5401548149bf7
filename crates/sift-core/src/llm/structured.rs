//! Structured output helpers: schema generation, prompt wrapping and decoding.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::LLMError;

/// JSON schema for `T` as a plain JSON value.
pub fn schema_for<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(&schema).unwrap_or(Value::Null)
}

/// Appends schema instructions to a prompt for models without native
/// structured decoding.
pub fn with_schema_instructions(prompt: &str, schema: &Value) -> String {
    let rendered = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "{prompt}\n\nYou MUST respond with a valid JSON object that matches this schema:\n{rendered}\n\nOnly respond with the JSON object, no additional text or markdown formatting."
    )
}

/// Extracts JSON from a response that might be wrapped in markdown code fences.
///
/// A reply that already starts as a JSON object or array is returned as is,
/// so backticks inside string values are left alone.
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        // Skip a language tag such as `json`.
        let body_start = after
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(after.len());
        let after = &after[body_start..];
        let body = match after.rfind("```") {
            Some(end) => &after[..end],
            None => after,
        };
        return body.trim();
    }

    trimmed
}

/// Decodes a model reply into `T`, stripping code fences first.
pub fn parse_structured<T: DeserializeOwned>(response: &str) -> Result<T, LLMError> {
    let json_str = extract_json(response);
    serde_json::from_str(json_str).map_err(|e| LLMError::StructuredDecode {
        message: e.to_string(),
        raw: response.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Answer {
        value: u32,
    }

    #[test]
    fn test_extract_plain() {
        assert_eq!(extract_json("  {\"value\": 1}\n"), "{\"value\": 1}");
    }

    #[test]
    fn test_extract_fenced_with_language() {
        assert_eq!(extract_json("```json\n{\"value\": 1}\n```"), "{\"value\": 1}");
    }

    #[test]
    fn test_extract_fenced_single_line() {
        assert_eq!(extract_json("```{\"value\": 1}```"), "{\"value\": 1}");
    }

    #[test]
    fn test_extract_fenced_after_preamble() {
        let reply = "Here you go:\n```json\n{\"value\": 2}\n```\nThanks";
        assert_eq!(extract_json(reply), "{\"value\": 2}");
    }

    #[test]
    fn test_backticks_inside_bare_json_are_kept() {
        let reply = r#"{"value": 3, "note": "use ```macro_rules``` here"}"#;
        assert_eq!(extract_json(reply), reply);

        #[derive(Debug, Deserialize)]
        struct Noted {
            value: u32,
            note: String,
        }
        let parsed: Noted = parse_structured(reply).unwrap();
        assert_eq!(parsed.value, 3);
        assert_eq!(parsed.note, "use ```macro_rules``` here");
    }

    #[test]
    fn test_parse_failure_keeps_raw_text() {
        let err = parse_structured::<Answer>("not json").unwrap_err();
        match err {
            LLMError::StructuredDecode { raw, .. } => assert_eq!(raw, "not json"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_schema_lists_fields() {
        let schema = schema_for::<Answer>();
        assert!(schema["properties"]["value"].is_object());
        let prompt = with_schema_instructions("Count.", &schema);
        assert!(prompt.starts_with("Count."));
        assert!(prompt.contains("\"value\""));
    }
}
