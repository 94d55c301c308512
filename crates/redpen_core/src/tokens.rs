//! crates/redpen_core/src/tokens.rs
//!
//! Character-based token estimation for the pre-call authorization gate.
//! The estimate is deliberately a conservative over-estimate: it gates
//! spending before the real cost is known, so it must never undercount.
//! Actual billing uses the usage the provider reports, never this number.

use crate::models::ModelProfile;

/// Role-formatting overhead per chat message.
const MESSAGE_OVERHEAD: u64 = 4;
/// Conversation start/end framing tokens.
const CONVERSATION_OVERHEAD: u64 = 3;

/// Estimates the token footprint of a single text for a given encoding
/// ratio: `ceil(chars * ratio)` plus half a token per special character.
pub fn estimate_text_tokens(text: &str, chars_per_token_ratio: f64) -> u64 {
    let char_count = text.chars().count();
    let base_tokens = (char_count as f64 * chars_per_token_ratio).ceil() as u64;

    let special_chars = text
        .chars()
        .filter(|c| !c.is_alphanumeric() && *c != '_' && !c.is_whitespace())
        .count();
    let format_tokens = (special_chars as f64 * 0.5).ceil() as u64;

    base_tokens + format_tokens
}

/// Estimates the total token cost of one check call: the model's system
/// instructions plus the user text as a two-message chat, message and
/// conversation overheads, and the model's fixed request overhead and
/// completion buffer.
pub fn estimate_check_tokens(text: &str, profile: &ModelProfile) -> u64 {
    let ratio = profile.encoding.chars_per_token_ratio();
    let system_prompt = profile.system_prompt();

    let mut content_tokens = CONVERSATION_OVERHEAD;
    for message in [system_prompt.as_str(), text] {
        content_tokens += MESSAGE_OVERHEAD;
        content_tokens += estimate_text_tokens(message, ratio);
    }

    content_tokens + profile.request_overhead + profile.completion_buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelCatalog;

    #[test]
    fn plain_text_estimate_is_ceiling_of_char_ratio() {
        // 5 chars * 0.25 = 1.25, ceil = 2; no special characters.
        assert_eq!(estimate_text_tokens("Hello", 0.25), 2);
    }

    #[test]
    fn special_characters_add_half_a_token_each() {
        // 5 chars * 0.25 = 1.25 -> 2; one apostrophe -> ceil(0.5) = 1.
        assert_eq!(estimate_text_tokens("don't", 0.25), 3);
        // Underscores and whitespace are not special.
        assert_eq!(estimate_text_tokens("a_b c", 0.25), 2);
    }

    #[test]
    fn empty_text_still_carries_fixed_overheads() {
        let catalog = ModelCatalog::new();
        let profile = catalog.get("openai/gpt-oss-120b").unwrap();
        let estimate = estimate_check_tokens("", profile);
        assert!(estimate >= profile.request_overhead + profile.completion_buffer);
    }

    #[test]
    fn estimate_grows_with_input_and_never_undercounts_the_parts() {
        let catalog = ModelCatalog::new();
        let profile = catalog.get("qwen/qwen3-32b").unwrap();
        let ratio = profile.encoding.chars_per_token_ratio();

        let short = estimate_check_tokens("short", profile);
        let long = estimate_check_tokens(&"long ".repeat(100), profile);
        assert!(long > short);

        let floor = estimate_text_tokens("short", ratio)
            + estimate_text_tokens(&profile.system_prompt(), ratio)
            + profile.request_overhead
            + profile.completion_buffer;
        assert!(short >= floor);
    }

    #[test]
    fn estimate_is_deterministic() {
        let catalog = ModelCatalog::new();
        let profile = catalog.get("llama-3.3-70b-versatile").unwrap();
        let text = "He go to school, dont he?";
        assert_eq!(
            estimate_check_tokens(text, profile),
            estimate_check_tokens(text, profile)
        );
    }
}
