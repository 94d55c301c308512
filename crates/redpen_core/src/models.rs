//! crates/redpen_core/src/models.rs
//!
//! Immutable model and plan catalogs, built once at startup and injected
//! into the service state. Model entries carry everything the credit ledger
//! and the provider adapter need: encoding family for token estimation,
//! fixed request overheads, and the per-model prompt rules appended to the
//! shared base instruction block.

use std::collections::HashMap;

/// Token-encoding family of a model, used for the chars-per-token ratio in
/// the pre-call estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Cl100kBase,
    R50kBase,
}

impl Encoding {
    /// Approximate tokens per character for this family.
    pub fn chars_per_token_ratio(&self) -> f64 {
        match self {
            Encoding::Cl100kBase => 0.25, // ~4 chars per token
            Encoding::R50kBase => 0.3,    // ~3.3 chars per token
        }
    }
}

/// Static configuration for one upstream model.
#[derive(Debug, Clone)]
pub struct ModelProfile {
    pub name: &'static str,
    pub encoding: Encoding,
    /// Fixed per-request token overhead added to every estimate.
    pub request_overhead: u64,
    /// Fixed completion-size buffer; keeps the estimate a conservative
    /// over-count of what the call can consume.
    pub completion_buffer: u64,
    pub credits_per_1k_tokens: u32,
    /// Model-specific rule block appended to the base system instructions.
    rules: &'static str,
}

impl ModelProfile {
    /// The full system-instruction text sent to this model.
    pub fn system_prompt(&self) -> String {
        BASE_PROMPT.replace("{MODEL_SPECIFIC_RULES}", self.rules)
    }
}

const BASE_PROMPT: &str = r#"SYSTEM INSTRUCTION: You are a grammar correction engine.

STRICT RULES:
- Only fix grammar, spelling, and punctuation.
- Make sure all punctuation marks, including periods (.), full stops, question marks (?), exclamation marks (!), commas (,), semicolons (;), colons (:), and inverted commas ("") are correct.
- Do NOT rewrite sentences or improve style.
- Do NOT change meaning, tone, tense, or wording.
- Do NOT add or remove sentences.
- If text is already correct, return it unchanged.
- Do NOT combine multiple corrections into one; each correction must be atomic.
{MODEL_SPECIFIC_RULES}

OUTPUT RULES:
- Output VALID JSON ONLY.
- Do NOT include explanations outside JSON.
- Do NOT include <think>, reasoning, analysis, or commentary.
- Exclude any text outside the JSON structure.
- Do NOT include markdown or extra text.

INDEXING RULES:
- Use 0-based character indexing.
- "startIndex" and "endIndex" refer to character positions in the ORIGINAL input text.
- "endIndex" is exclusive.
- For insertions, set startIndex = endIndex.

ALLOWED TYPES:
- "grammar"
- "spelling"
- "punctuation"

JSON SCHEMA (MUST MATCH EXACTLY):
{
  "original_text": "...",
  "corrections": [
    {
      "type": "grammar | spelling | punctuation",
      "original_segment": "...",
      "corrected_segment": "...",
      "explanation": "short reason",
      "startIndex": 0,
      "endIndex": 0
    }
  ]
}
"#;

const PROFILES: &[ModelProfile] = &[
    ModelProfile {
        name: "openai/gpt-oss-120b",
        encoding: Encoding::Cl100kBase,
        request_overhead: 70,
        completion_buffer: 500,
        credits_per_1k_tokens: 10,
        rules: "- Do NOT invent errors.\n- Take care of context while providing corrections.",
    },
    ModelProfile {
        name: "llama-3.3-70b-versatile",
        encoding: Encoding::R50kBase,
        request_overhead: 60,
        completion_buffer: 800,
        credits_per_1k_tokens: 3,
        rules: "- Prefer conservative corrections.\n- Return correct startIndex / endIndex; spaces also count as index.\n- The corrected_segment must be an exact replacement for original_segment.\n- Avoid flagging ambiguous grammar unless clearly incorrect.",
    },
    ModelProfile {
        name: "qwen/qwen3-32b",
        encoding: Encoding::R50kBase,
        request_overhead: 65,
        completion_buffer: 900,
        credits_per_1k_tokens: 4,
        rules: "- Spaces, punctuation, and line breaks ALL count as characters when calculating indexes.\n- original_segment MUST exactly match the substring at startIndex:endIndex.\n- Do NOT guess indexes. Count characters carefully.\n- Be stricter with comma splices and run-on sentences.",
    },
    ModelProfile {
        name: "openai/gpt-oss-20b",
        encoding: Encoding::Cl100kBase,
        request_overhead: 70,
        completion_buffer: 500,
        credits_per_1k_tokens: 2,
        rules: "- Apply the strictest punctuation validation.\n- Detect edge cases in complex or compound sentences.",
    },
];

/// Lookup table over the supported upstream models.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    profiles: HashMap<&'static str, &'static ModelProfile>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self {
            profiles: PROFILES.iter().map(|p| (p.name, p)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&'static ModelProfile> {
        self.profiles.get(name).copied()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription plan: monthly allotment plus the models it unlocks.
#[derive(Debug, Clone)]
pub struct Plan {
    pub id: &'static str,
    pub monthly_credits: i64,
    pub models: &'static [&'static str],
}

const FREE_MODELS: &[&str] = &["openai/gpt-oss-120b"];
const STANDARD_MODELS: &[&str] = &["openai/gpt-oss-120b", "llama-3.3-70b-versatile"];
const ALL_MODELS: &[&str] = &[
    "openai/gpt-oss-120b",
    "llama-3.3-70b-versatile",
    "qwen/qwen3-32b",
    "openai/gpt-oss-20b",
];

const PLANS: &[Plan] = &[
    Plan { id: "free", monthly_credits: 500, models: FREE_MODELS },
    Plan { id: "standard", monthly_credits: 5_000, models: STANDARD_MODELS },
    Plan { id: "pro", monthly_credits: 20_000, models: ALL_MODELS },
];

/// Lookup table over the subscription plans.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: HashMap<&'static str, &'static Plan>,
}

impl PlanCatalog {
    pub fn new() -> Self {
        Self {
            plans: PLANS.iter().map(|p| (p.id, p)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&'static Plan> {
        self.plans.get(id).copied()
    }

    /// Whether an account on `plan_id` may call `model`. Unknown plans
    /// unlock nothing.
    pub fn allows_model(&self, plan_id: &str, model: &str) -> bool {
        self.get(plan_id)
            .map(|plan| plan.models.contains(&model))
            .unwrap_or(false)
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_resolves_every_profile() {
        let catalog = ModelCatalog::new();
        for profile in PROFILES {
            assert!(catalog.get(profile.name).is_some());
        }
        assert!(catalog.get("nonexistent-model").is_none());
    }

    #[test]
    fn system_prompt_embeds_model_rules() {
        let catalog = ModelCatalog::new();
        let profile = catalog.get("openai/gpt-oss-120b").unwrap();
        let prompt = profile.system_prompt();
        assert!(prompt.contains("grammar correction engine"));
        assert!(prompt.contains("Do NOT invent errors."));
        assert!(!prompt.contains("{MODEL_SPECIFIC_RULES}"));
    }

    #[test]
    fn plan_gating_is_tiered() {
        let plans = PlanCatalog::new();
        assert!(plans.allows_model("free", "openai/gpt-oss-120b"));
        assert!(!plans.allows_model("free", "qwen/qwen3-32b"));
        assert!(plans.allows_model("standard", "llama-3.3-70b-versatile"));
        assert!(!plans.allows_model("standard", "openai/gpt-oss-20b"));
        assert!(plans.allows_model("pro", "openai/gpt-oss-20b"));
        assert!(!plans.allows_model("enterprise", "openai/gpt-oss-120b"));
    }
}
