//! crates/redpen_core/src/merge.rs
//!
//! Combines the deterministic rule-engine candidates with the validated
//! external candidates into one canonical, conflict-free correction set.

use std::collections::HashSet;

use crate::domain::Correction;

/// Merges the two ordered candidate lists, deterministic source first.
///
/// A single forward pass keeps the first occurrence per exact
/// `(start_index, end_index)` key; later duplicates of an already-seen span
/// are dropped regardless of differing content. A candidate whose span
/// strictly overlaps an already-kept span (without being identical) is also
/// dropped, so the canonical set is overlap-free and safe to apply and to
/// project into segments.
pub fn merge_corrections(
    rule_corrections: Vec<Correction>,
    external_corrections: Vec<Correction>,
) -> Vec<Correction> {
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut merged: Vec<Correction> = Vec::new();

    for candidate in rule_corrections.into_iter().chain(external_corrections) {
        let key = (candidate.start_index, candidate.end_index);
        if seen.contains(&key) {
            continue;
        }
        if merged.iter().any(|kept| kept.overlaps(&candidate)) {
            continue;
        }
        seen.insert(key);
        merged.push(candidate);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CorrectionKind, CorrectionStatus};
    use uuid::Uuid;

    fn correction(start: usize, end: usize, corrected: &str) -> Correction {
        Correction {
            id: Uuid::new_v4(),
            kind: CorrectionKind::Grammar,
            original_segment: String::new(),
            corrected_segment: corrected.to_string(),
            explanation: String::new(),
            start_index: start,
            end_index: end,
            status: CorrectionStatus::Pending,
        }
    }

    #[test]
    fn exact_span_duplicate_keeps_the_first_list_entry() {
        let from_rules = vec![correction(0, 4, "rule")];
        let from_llm = vec![correction(0, 4, "llm")];

        let merged = merge_corrections(from_rules, from_llm);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].corrected_segment, "rule");
    }

    #[test]
    fn duplicates_within_one_list_are_also_collapsed() {
        let from_llm = vec![correction(2, 6, "first"), correction(2, 6, "second")];
        let merged = merge_corrections(Vec::new(), from_llm);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].corrected_segment, "first");
    }

    #[test]
    fn overlapping_spans_are_rejected_in_favor_of_the_earlier_entry() {
        let from_rules = vec![correction(0, 5, "kept")];
        let from_llm = vec![correction(2, 8, "dropped"), correction(5, 9, "disjoint")];

        let merged = merge_corrections(from_rules, from_llm);
        let spans: Vec<_> = merged.iter().map(|c| (c.start_index, c.end_index)).collect();
        assert_eq!(spans, vec![(0, 5), (5, 9)]);
    }

    #[test]
    fn disjoint_spans_from_both_sources_all_survive_in_order() {
        let from_rules = vec![correction(0, 4, "a")];
        let from_llm = vec![correction(10, 12, "b"), correction(6, 8, "c")];

        let merged = merge_corrections(from_rules, from_llm);
        let spans: Vec<_> = merged.iter().map(|c| (c.start_index, c.end_index)).collect();
        assert_eq!(spans, vec![(0, 4), (10, 12), (6, 8)]);
    }

    #[test]
    fn zero_width_duplicates_collapse_but_adjacent_insertions_survive() {
        let from_rules = vec![correction(7, 7, "rule-insert")];
        let from_llm = vec![correction(7, 7, "llm-insert"), correction(0, 7, "prefix")];

        let merged = merge_corrections(from_rules, from_llm);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].corrected_segment, "rule-insert");
        assert_eq!(merged[1].corrected_segment, "prefix");
    }
}
