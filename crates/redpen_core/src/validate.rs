//! crates/redpen_core/src/validate.rs
//!
//! The trust boundary between the untrusted generative source and the
//! canonical correction set. Every candidate is checked against the
//! original text; a candidate violating any rule is dropped silently,
//! never surfaced as an error.

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{char_len, char_slice, Correction, CorrectionKind, CorrectionStatus};

/// The partial shape a candidate may arrive in. Fields can be absent;
/// indices arrive as raw JSON numbers and are only accepted if they are
/// non-negative integers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CandidateCorrection {
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: Option<CorrectionKind>,
    pub original_segment: Option<String>,
    pub corrected_segment: Option<String>,
    pub explanation: Option<String>,
    #[serde(rename = "startIndex")]
    pub start_index: Option<f64>,
    #[serde(rename = "endIndex")]
    pub end_index: Option<f64>,
    pub status: Option<CorrectionStatus>,
}

/// Filters and normalizes untrusted candidates against `text`.
///
/// The relative order of retained candidates is preserved; nothing is
/// resorted. Rules, each a silent drop when violated:
/// 1. id assigned if absent; status defaults to pending, explanation to "";
/// 2. indices are integers with `0 <= start <= end <= char_len(text)`;
/// 3. the text's slice at `[start, end)` equals `original_segment` exactly;
/// 4. the type is one of grammar / spelling / punctuation;
/// 5. `corrected_segment` is non-empty after trimming.
pub fn validate_candidates(text: &str, candidates: &[Value]) -> Vec<Correction> {
    candidates
        .iter()
        .filter_map(|value| {
            let candidate: CandidateCorrection = serde_json::from_value(value.clone()).ok()?;
            admit(text, candidate)
        })
        .collect()
}

fn admit(text: &str, candidate: CandidateCorrection) -> Option<Correction> {
    let start = as_index(candidate.start_index?)?;
    let end = as_index(candidate.end_index?)?;
    if start > end || end > char_len(text) {
        return None;
    }

    let original_segment = candidate.original_segment?;
    if char_slice(text, start, end) != original_segment {
        return None;
    }

    let kind = candidate.kind?;

    let corrected_segment = candidate.corrected_segment?;
    if corrected_segment.trim().is_empty() {
        return None;
    }

    Some(Correction {
        id: candidate.id.unwrap_or_else(Uuid::new_v4),
        kind,
        original_segment,
        corrected_segment,
        explanation: candidate.explanation.unwrap_or_default(),
        start_index: start,
        end_index: end,
        status: candidate.status.unwrap_or(CorrectionStatus::Pending),
    })
}

/// A JSON number is a usable index only when it is a non-negative integer.
fn as_index(value: f64) -> Option<usize> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Some(value as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEXT: &str = "He go to school";

    #[test]
    fn retained_candidates_match_the_source_slice() {
        let candidates = vec![
            json!({
                "type": "grammar",
                "original_segment": "go",
                "corrected_segment": "goes",
                "explanation": "subject-verb agreement",
                "startIndex": 3,
                "endIndex": 5
            }),
            json!({
                "type": "grammar",
                "original_segment": "went", // does not match [3,5)
                "corrected_segment": "goes",
                "startIndex": 3,
                "endIndex": 5
            }),
        ];

        let kept = validate_candidates(TEXT, &candidates);
        assert_eq!(kept.len(), 1);
        for c in &kept {
            assert_eq!(char_slice(TEXT, c.start_index, c.end_index), c.original_segment);
        }
    }

    #[test]
    fn defaults_are_assigned() {
        let candidates = vec![json!({
            "type": "spelling",
            "original_segment": "go",
            "corrected_segment": "goes",
            "startIndex": 3,
            "endIndex": 5
        })];

        let kept = validate_candidates(TEXT, &candidates);
        assert_eq!(kept[0].status, CorrectionStatus::Pending);
        assert_eq!(kept[0].explanation, "");
    }

    #[test]
    fn out_of_range_or_inverted_spans_are_dropped() {
        let candidates = vec![
            json!({"type": "grammar", "original_segment": "", "corrected_segment": ".", "startIndex": 5, "endIndex": 3}),
            json!({"type": "grammar", "original_segment": "", "corrected_segment": ".", "startIndex": -1, "endIndex": 2}),
            json!({"type": "grammar", "original_segment": "", "corrected_segment": ".", "startIndex": 0, "endIndex": 99}),
            json!({"type": "grammar", "original_segment": "", "corrected_segment": ".", "startIndex": 1.5, "endIndex": 3}),
        ];
        assert!(validate_candidates(TEXT, &candidates).is_empty());
    }

    #[test]
    fn unknown_type_is_dropped() {
        let candidates = vec![json!({
            "type": "style",
            "original_segment": "go",
            "corrected_segment": "goes",
            "startIndex": 3,
            "endIndex": 5
        })];
        assert!(validate_candidates(TEXT, &candidates).is_empty());
    }

    #[test]
    fn blank_replacement_is_dropped() {
        let candidates = vec![json!({
            "type": "grammar",
            "original_segment": "go",
            "corrected_segment": "   ",
            "startIndex": 3,
            "endIndex": 5
        })];
        assert!(validate_candidates(TEXT, &candidates).is_empty());
    }

    #[test]
    fn malformed_shapes_are_dropped_per_candidate() {
        let candidates = vec![
            json!("not an object"),
            json!({"startIndex": "three", "endIndex": 5}),
            json!({
                "type": "grammar",
                "original_segment": "go",
                "corrected_segment": "goes",
                "startIndex": 3,
                "endIndex": 5
            }),
        ];
        assert_eq!(validate_candidates(TEXT, &candidates).len(), 1);
    }

    #[test]
    fn zero_width_insertion_at_text_end_is_admitted() {
        let candidates = vec![json!({
            "type": "punctuation",
            "original_segment": "",
            "corrected_segment": ".",
            "explanation": "missing period",
            "startIndex": 15,
            "endIndex": 15
        })];
        let kept = validate_candidates(TEXT, &candidates);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].start_index, char_len(TEXT));
    }

    #[test]
    fn input_order_is_preserved() {
        let candidates = vec![
            json!({"type": "grammar", "original_segment": "school", "corrected_segment": "schools", "startIndex": 9, "endIndex": 15}),
            json!({"type": "grammar", "original_segment": "go", "corrected_segment": "goes", "startIndex": 3, "endIndex": 5}),
        ];
        let kept = validate_candidates(TEXT, &candidates);
        assert_eq!(kept[0].original_segment, "school");
        assert_eq!(kept[1].original_segment, "go");
    }
}
