//! crates/redpen_core/src/reconcile.rs
//!
//! The accept/reject state machine over a canonical correction set and the
//! text-reconstruction algorithm. All functions here are pure; loading and
//! persisting the session around them is the caller's job.

use uuid::Uuid;

use crate::domain::{char_slice, Correction, CorrectionStatus};

/// Applies a status transition to the matching correction.
///
/// Returns `true` when a correction with `correction_id` exists. An unknown
/// id is a non-fatal miss: nothing changes and the caller proceeds. Setting
/// a status the correction already has is idempotent.
pub fn set_correction_status(
    corrections: &mut [Correction],
    correction_id: Uuid,
    status: CorrectionStatus,
) -> bool {
    match corrections.iter_mut().find(|c| c.id == correction_id) {
        Some(correction) => {
            correction.status = status;
            true
        }
        None => false,
    }
}

/// Rebuilds the derived text by applying every accepted correction to the
/// original text.
///
/// Accepted corrections are applied highest-start-first so that each
/// replacement leaves the indices of corrections not yet applied valid:
/// every index is defined in the ORIGINAL text's coordinate space, never
/// the mutating copy. Overlapping accepted corrections are not guarded
/// against here; the merge engine keeps canonical sets overlap-free.
pub fn apply_accepted(original_text: &str, corrections: &[Correction]) -> String {
    let mut accepted: Vec<&Correction> = corrections
        .iter()
        .filter(|c| c.status == CorrectionStatus::Accepted)
        .collect();

    if accepted.is_empty() {
        return original_text.to_string();
    }

    accepted.sort_by(|a, b| b.start_index.cmp(&a.start_index));

    let mut working: Vec<char> = original_text.chars().collect();
    for correction in accepted {
        let start = correction.start_index.min(working.len());
        let end = correction.end_index.clamp(start, working.len());
        working.splice(start..end, correction.corrected_segment.chars());
    }

    working.into_iter().collect()
}

/// One element of the interactive-view projection.
#[derive(Debug, Clone, PartialEq)]
pub enum TextSegment {
    /// A literal run of text between corrections.
    Literal(String),
    /// A correction marker covering its span's current text.
    Marker { correction: Correction, text: String },
}

/// Projects `text` and its correction set into an ordered sequence
/// alternating literal spans and correction markers, sorted by start index
/// ascending and covering `[0, char_len(text))`.
///
/// Non-overlapping corrections are a precondition trusted by this
/// projection, not enforced here.
pub fn segment_view(text: &str, corrections: &[Correction]) -> Vec<TextSegment> {
    let mut ordered: Vec<&Correction> = corrections.iter().collect();
    ordered.sort_by_key(|c| c.start_index);

    let mut segments = Vec::new();
    let mut cursor = 0usize;

    for correction in ordered {
        if correction.start_index > cursor {
            segments.push(TextSegment::Literal(char_slice(
                text,
                cursor,
                correction.start_index,
            )));
        }
        segments.push(TextSegment::Marker {
            correction: correction.clone(),
            text: char_slice(text, correction.start_index, correction.end_index),
        });
        cursor = correction.end_index;
    }

    let tail = char_slice(text, cursor, usize::MAX);
    if !tail.is_empty() {
        segments.push(TextSegment::Literal(tail));
    }

    segments
}
