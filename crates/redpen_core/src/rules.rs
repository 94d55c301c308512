//! crates/redpen_core/src/rules.rs
//!
//! The deterministic pattern scanner. A pure function from text to
//! correction candidates: no I/O, no failures, identical output for
//! identical input (ids aside, fresh per call).

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::domain::{char_len, Correction, CorrectionKind, CorrectionStatus};

/// Ambiguous unapostrophized word forms and their contractions. Scanned in
/// this fixed order so output ordering is stable.
const CONTRACTIONS: &[(&str, &str)] = &[
    ("lets", "let's"),
    ("dont", "don't"),
    ("cant", "can't"),
    ("wont", "won't"),
    ("isnt", "isn't"),
    ("didnt", "didn't"),
];

static CONTRACTION_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    CONTRACTIONS
        .iter()
        .map(|(wrong, correct)| {
            let pattern = format!(r"(?i)\b{}\b", wrong);
            (Regex::new(&pattern).expect("contraction pattern"), *correct)
        })
        .collect()
});

// Three alphabetic tokens joined by single spaces and a bare "and". Commas
// anywhere in the phrase break the match, so already-punctuated lists are
// not flagged.
static SERIAL_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z]+) ([A-Za-z]+) and ([A-Za-z]+)\b").expect("serial list pattern")
});

/// Scans `text` and returns every rule-engine correction candidate, all
/// status `pending` with fresh ids.
pub fn run_rules(text: &str) -> Vec<Correction> {
    let mut corrections = Vec::new();

    // Rule 1: known contractions, preserving leading-capital casing.
    for (pattern, correct) in CONTRACTION_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            let original = m.as_str();
            let corrected = if original.chars().next().is_some_and(|c| c.is_uppercase()) {
                let mut chars = correct.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            } else {
                (*correct).to_string()
            };

            corrections.push(Correction {
                id: Uuid::new_v4(),
                kind: CorrectionKind::Spelling,
                original_segment: original.to_string(),
                corrected_segment: corrected,
                explanation: "missing apostrophe in contraction".to_string(),
                start_index: char_index(text, m.start()),
                end_index: char_index(text, m.end()),
                status: CorrectionStatus::Pending,
            });
        }
    }

    // Rule 2: serial lists missing commas. Heuristic: any "word word and
    // word" phrase is flagged, so plain three-token "and" phrases produce
    // false positives.
    for caps in SERIAL_LIST.captures_iter(text) {
        let m = caps.get(0).expect("whole match");
        corrections.push(Correction {
            id: Uuid::new_v4(),
            kind: CorrectionKind::Punctuation,
            original_segment: m.as_str().to_string(),
            corrected_segment: format!("{}, {}, and {}", &caps[1], &caps[2], &caps[3]),
            explanation: "possible missing commas in a list".to_string(),
            start_index: char_index(text, m.start()),
            end_index: char_index(text, m.end()),
            status: CorrectionStatus::Pending,
        });
    }

    // Rule 3: sentence-ending punctuation, as a zero-width insertion at the
    // end of the untrimmed text.
    let trimmed = text.trim();
    if !trimmed.is_empty() && !trimmed.ends_with(['.', '!', '?']) {
        let position = char_len(text);
        corrections.push(Correction {
            id: Uuid::new_v4(),
            kind: CorrectionKind::Punctuation,
            original_segment: String::new(),
            corrected_segment: ".".to_string(),
            explanation: "missing sentence-ending punctuation".to_string(),
            start_index: position,
            end_index: position,
            status: CorrectionStatus::Pending,
        });
    }

    corrections
}

/// Converts a regex byte offset into the character offset used by spans.
fn char_index(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::char_slice;

    #[test]
    fn contraction_preserves_leading_capital() {
        let corrections = run_rules("Lets eat grandma.");
        assert_eq!(corrections.len(), 1);
        let c = &corrections[0];
        assert_eq!(c.kind, CorrectionKind::Spelling);
        assert_eq!(c.original_segment, "Lets");
        assert_eq!(c.corrected_segment, "Let's");
        assert_eq!((c.start_index, c.end_index), (0, 4));
    }

    #[test]
    fn contraction_is_lowercase_when_token_is() {
        let corrections = run_rules("we dont know.");
        assert_eq!(corrections[0].original_segment, "dont");
        assert_eq!(corrections[0].corrected_segment, "don't");
    }

    #[test]
    fn contraction_requires_whole_word() {
        assert!(run_rules("the cantaloupe is ripe.").is_empty());
    }

    #[test]
    fn serial_list_proposes_comma_insertions() {
        let corrections = run_rules("bring pens pencils and erasers.");
        assert_eq!(corrections.len(), 1);
        let c = &corrections[0];
        assert_eq!(c.kind, CorrectionKind::Punctuation);
        assert_eq!(c.original_segment, "pens pencils and erasers");
        assert_eq!(c.corrected_segment, "pens, pencils, and erasers");
    }

    #[test]
    fn serial_list_skips_already_punctuated_phrases() {
        assert!(run_rules("bring pens, pencils, and erasers.").is_empty());
    }

    #[test]
    fn terminal_punctuation_inserts_at_untrimmed_length() {
        let text = "hello there";
        let corrections = run_rules(text);
        assert_eq!(corrections.len(), 1);
        let c = &corrections[0];
        assert_eq!(c.original_segment, "");
        assert_eq!(c.corrected_segment, ".");
        assert_eq!((c.start_index, c.end_index), (11, 11));
        assert_eq!(char_slice(text, c.start_index, c.end_index), "");
    }

    #[test]
    fn terminal_punctuation_checks_trimmed_tail() {
        assert!(run_rules("all good!  ").is_empty());
        assert!(run_rules("   ").is_empty());
    }

    #[test]
    fn spans_are_character_offsets() {
        let text = "héllo wont stop";
        let corrections = run_rules(text);
        let wont = corrections
            .iter()
            .find(|c| c.original_segment == "wont")
            .expect("contraction match");
        assert_eq!(
            char_slice(text, wont.start_index, wont.end_index),
            wont.original_segment
        );
    }

    #[test]
    fn scanner_is_deterministic() {
        let text = "Lets go home and sleep";
        let strip = |cs: Vec<Correction>| {
            cs.into_iter()
                .map(|c| (c.kind, c.original_segment, c.corrected_segment, c.start_index, c.end_index))
                .collect::<Vec<_>>()
        };
        assert_eq!(strip(run_rules(text)), strip(run_rules(text)));
    }
}
