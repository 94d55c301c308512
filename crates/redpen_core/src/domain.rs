//! crates/redpen_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization backend;
//! the serde derives only pin the wire field names used by the external
//! correction schema (`type`, `startIndex`, `endIndex`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The category of a proposed edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionKind {
    Grammar,
    Spelling,
    Punctuation,
}

/// Lifecycle of a correction within a session.
///
/// `Pending` corrections transition to `Accepted` or `Rejected` through the
/// reconciler; re-issuing a transition is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A proposed minimal edit to a half-open character span of text.
///
/// `start_index`/`end_index` are character (Unicode scalar) offsets into the
/// session's ORIGINAL text, `end_index` exclusive. A zero-width span
/// (`start_index == end_index`) is an insertion. At validation time
/// `original_segment` equals the text's slice at that span; this is not
/// re-checked afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: CorrectionKind,
    pub original_segment: String,
    pub corrected_segment: String,
    pub explanation: String,
    #[serde(rename = "startIndex")]
    pub start_index: usize,
    #[serde(rename = "endIndex")]
    pub end_index: usize,
    pub status: CorrectionStatus,
}

impl Correction {
    /// True when `other` occupies a strictly overlapping, non-identical span.
    pub fn overlaps(&self, other: &Correction) -> bool {
        self.start_index < other.end_index && other.start_index < self.end_index
    }
}

/// The persisted record of one check request: immutable original text, the
/// canonical correction set, and the derived text recomputed by the
/// reconciler.
#[derive(Debug, Clone)]
pub struct CheckSession {
    pub id: Uuid,
    pub account_id: Uuid,
    pub model: String,
    pub original_text: String,
    pub corrected_text: String,
    pub corrections: Vec<Correction>,
    pub created_at: DateTime<Utc>,
}

/// Two independently tracked credit pools for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditBalance {
    pub account_id: Uuid,
    pub subscription_credits: i64,
    pub purchased_credits: i64,
    pub last_reset: DateTime<Utc>,
}

impl CreditBalance {
    /// Total spendable credits across both pools.
    pub fn available(&self) -> i64 {
        self.subscription_credits + self.purchased_credits
    }
}

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Subscription,
    Purchase,
    Usage,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Subscription => "subscription",
            TransactionKind::Purchase => "purchase",
            TransactionKind::Usage => "usage",
        }
    }
}

/// Append-only ledger entry, written once and never mutated.
#[derive(Debug, Clone)]
pub struct CreditTransaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub amount: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

// --- Character-span helpers -------------------------------------------------
//
// All span arithmetic in this crate runs over character offsets, never byte
// offsets, so the same coordinates the external service reports stay valid
// for non-ASCII text.

/// Number of characters in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// The substring of `text` at the half-open character span `[start, end)`.
pub fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_slice_counts_characters_not_bytes() {
        let text = "naïve café";
        assert_eq!(char_len(text), 10);
        assert_eq!(char_slice(text, 0, 5), "naïve");
        assert_eq!(char_slice(text, 6, 10), "café");
    }

    #[test]
    fn char_slice_is_empty_for_degenerate_spans() {
        assert_eq!(char_slice("abc", 2, 2), "");
        assert_eq!(char_slice("abc", 3, 2), "");
    }

    #[test]
    fn overlap_is_strict_for_zero_width_spans() {
        let insertion = correction_at(5, 5);
        let adjacent = correction_at(0, 5);
        let covering = correction_at(3, 7);
        assert!(!insertion.overlaps(&adjacent));
        assert!(insertion.overlaps(&covering));
    }

    fn correction_at(start: usize, end: usize) -> Correction {
        Correction {
            id: Uuid::new_v4(),
            kind: CorrectionKind::Punctuation,
            original_segment: String::new(),
            corrected_segment: ".".to_string(),
            explanation: String::new(),
            start_index: start,
            end_index: end,
            status: CorrectionStatus::Pending,
        }
    }
}
