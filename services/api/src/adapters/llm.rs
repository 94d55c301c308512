//! services/api/src/adapters/llm.rs
//!
//! This module contains the adapter for the external generative correction
//! service. It implements the `CorrectionProvider` port from the `core`
//! crate against any OpenAI-compatible chat-completions endpoint.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use redpen_core::extract;
use redpen_core::models::ModelProfile;
use redpen_core::ports::{CorrectionProvider, PortError, PortResult, ProviderOutcome};
use tracing::warn;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CorrectionProvider` using an
/// OpenAI-compatible LLM endpoint.
#[derive(Clone)]
pub struct OpenAiCorrectionAdapter {
    client: Client<OpenAIConfig>,
}

impl OpenAiCorrectionAdapter {
    /// Creates a new `OpenAiCorrectionAdapter`.
    pub fn new(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }
}

//=========================================================================================
// `CorrectionProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl CorrectionProvider for OpenAiCorrectionAdapter {
    /// Requests correction candidates for `text` from the profile's model.
    async fn propose_corrections(
        &self,
        text: &str,
        profile: &ModelProfile,
    ) -> PortResult<ProviderOutcome> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(profile.system_prompt())
                .build()
                .map_err(|e| PortError::Provider(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(text)
                .build()
                .map_err(|e| PortError::Provider(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(profile.name)
            .messages(messages)
            .temperature(0.0)
            .build()
            .map_err(|e| PortError::Provider(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Provider(e.to_string()))?;

        // Actual usage drives billing; a response without it deducts nothing.
        let tokens_used = match &response.usage {
            Some(usage) => u64::from(usage.total_tokens),
            None => {
                warn!("provider response for {} carried no usage data", profile.name);
                0
            }
        };

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Provider("correction response contained no text content".to_string())
            })?;

        let payload = extract::parse_payload(&content)
            .map_err(|e| PortError::Provider(e.to_string()))?;

        Ok(ProviderOutcome {
            candidates: payload.corrections,
            tokens_used,
        })
    }
}
