//! crates/redpen_core/src/extract.rs
//!
//! Extraction of the correction payload from the external service's free
//! text. The response is expected to contain exactly one JSON object, but
//! models wrap it in reasoning delimiters, markdown fences, or prose; the
//! extractor strips known wrapper markers, locates the outermost balanced
//! JSON object, and decodes it. Each failure mode has its own error kind so
//! callers can report an external-service fault precisely.

use serde::Deserialize;
use serde_json::Value;

/// Why a response could not be turned into a payload.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("response contains no JSON object")]
    NoJsonObject,
    #[error("response JSON object is unbalanced")]
    UnbalancedObject,
    #[error("response JSON does not decode: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The decoded provider payload. `corrections` stays as raw values; the
/// validator decides per candidate what survives.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderPayload {
    pub original_text: Option<String>,
    pub corrections: Vec<Value>,
}

/// Parses a raw response body into the provider payload.
pub fn parse_payload(response: &str) -> Result<ProviderPayload, ExtractError> {
    let object = extract_json_object(response)?;
    Ok(serde_json::from_str(&object)?)
}

/// Locates the outermost balanced JSON object in `response`, after
/// stripping known wrapper markers.
pub fn extract_json_object(response: &str) -> Result<String, ExtractError> {
    let stripped = strip_wrappers(response);

    let open = stripped.find('{').ok_or(ExtractError::NoJsonObject)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in stripped[open..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Ok(stripped[open..open + offset + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    Err(ExtractError::UnbalancedObject)
}

/// Drops reasoning delimiters and markdown fences so the object search only
/// sees payload text. `<think>` blocks are removed wholesale; an unclosed
/// block drops everything up to its opening marker's end.
fn strip_wrappers(response: &str) -> String {
    let mut text = response.to_string();

    for (open, close) in [("<think>", "</think>"), ("<reasoning>", "</reasoning>")] {
        while let Some(start) = text.find(open) {
            match text[start..].find(close) {
                Some(relative_end) => {
                    text.replace_range(start..start + relative_end + close.len(), "");
                }
                None => {
                    text.replace_range(start.., "");
                    break;
                }
            }
        }
    }

    text.replace("```json", "").replace("```", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{"original_text": "He go", "corrections": [{"type": "grammar", "original_segment": "go", "corrected_segment": "goes", "startIndex": 3, "endIndex": 5}]}"#;

    #[test]
    fn bare_object_parses() {
        let payload = parse_payload(PAYLOAD).unwrap();
        assert_eq!(payload.original_text.as_deref(), Some("He go"));
        assert_eq!(payload.corrections.len(), 1);
    }

    #[test]
    fn thinking_wrapper_is_stripped() {
        let response = format!("<think>counting characters carefully...</think>\n{}", PAYLOAD);
        let payload = parse_payload(&response).unwrap();
        assert_eq!(payload.corrections.len(), 1);
    }

    #[test]
    fn markdown_fence_is_stripped() {
        let response = format!("```json\n{}\n```", PAYLOAD);
        assert!(parse_payload(&response).is_ok());
    }

    #[test]
    fn surrounding_prose_is_ignored() {
        let response = format!("Here are the corrections:\n{}\nHope that helps!", PAYLOAD);
        let payload = parse_payload(&response).unwrap();
        assert_eq!(payload.corrections.len(), 1);
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scan() {
        let response = r#"{"original_text": "a { b } c", "corrections": []}"#;
        let payload = parse_payload(response).unwrap();
        assert_eq!(payload.original_text.as_deref(), Some("a { b } c"));
    }

    #[test]
    fn missing_object_is_a_specific_error() {
        assert!(matches!(
            parse_payload("no corrections needed"),
            Err(ExtractError::NoJsonObject)
        ));
    }

    #[test]
    fn truncated_object_is_a_specific_error() {
        assert!(matches!(
            parse_payload(r#"{"original_text": "cut off"#),
            Err(ExtractError::UnbalancedObject)
        ));
    }

    #[test]
    fn missing_corrections_field_defaults_to_empty() {
        let payload = parse_payload(r#"{"original_text": "fine as is"}"#).unwrap();
        assert!(payload.corrections.is_empty());
    }
}
