//! LLM-backed [`UnlockAssistant`].

use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, instrument, warn};

use mediavault_core::{
    Error, GenerationBackend, Result, UnlockAssistant, UnlockDecision, UnlockRequest,
};

use crate::prompt::{decision_schema, system_prompt};

/// Unlock assistant that asks a generation backend for a structured decision.
pub struct LlmUnlockAssistant<B> {
    backend: B,
}

impl<B: GenerationBackend> LlmUnlockAssistant<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: GenerationBackend + 'static> UnlockAssistant for LlmUnlockAssistant<B> {
    #[instrument(
        skip(self, request),
        fields(subsystem = "inference", component = "unlock_assistant", model = %self.backend.model_name())
    )]
    async fn decide(&self, request: &UnlockRequest) -> Result<UnlockDecision> {
        let start = Instant::now();
        let system = system_prompt(&request.note_title);

        let raw = self
            .backend
            .generate_json_with_system(&system, &request.user_message, &decision_schema())
            .await?;

        let decision = parse_decision(&raw).inspect_err(|e| {
            warn!(error = %e, response_len = raw.len(), "Unusable decision from model");
        })?;

        debug!(
            should_unlock = decision.should_unlock,
            reply_len = decision.reply.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Unlock decision received"
        );
        Ok(decision)
    }

    fn name(&self) -> &str {
        self.backend.model_name()
    }
}

/// Parse raw model output into a decision.
///
/// Reasoning blocks (`<think>...</think>`) and Markdown code fences are
/// removed first. Both fields are mandatory; anything else is an error.
pub fn parse_decision(raw: &str) -> Result<UnlockDecision> {
    let cleaned = strip_code_fences(&strip_thinking(raw)?);
    serde_json::from_str::<UnlockDecision>(&cleaned)
        .map_err(|e| Error::Inference(format!("Malformed unlock decision: {}", e)))
}

fn strip_thinking(raw: &str) -> Result<String> {
    let closed = Regex::new(r"(?s)<think>.*?</think>")
        .map_err(|e| Error::Internal(format!("Invalid thinking pattern: {}", e)))?;
    let without = closed.replace_all(raw, "");
    // An unclosed block swallows the rest of the response.
    Ok(match without.find("<think>") {
        Some(idx) => without[..idx].to_string(),
        None => without.into_owned(),
    })
}

fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}
