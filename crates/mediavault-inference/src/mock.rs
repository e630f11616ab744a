//! Mock generation backend for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mediavault_inference::{mock::MockGenerationBackend, LlmUnlockAssistant};
//!
//! let backend = MockGenerationBackend::new()
//!     .with_response(r#"{"reply":"Verified.","shouldUnlock":true}"#);
//! let assistant = LlmUnlockAssistant::new(backend.clone());
//! // ... drive a negotiation, then inspect backend.calls()
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use mediavault_core::{Error, GenerationBackend, Result};

/// Reply used when nothing else is scripted.
pub const DEFAULT_MOCK_RESPONSE: &str =
    r#"{"reply":"Please tell me more about why you need this note.","shouldUnlock":false}"#;

/// One recorded generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub system: String,
    pub prompt: String,
    pub schema: Value,
}

#[derive(Debug, Clone)]
enum Reply {
    Respond(String),
    Fail(String),
}

impl Reply {
    fn into_result(self) -> Result<String> {
        match self {
            Reply::Respond(text) => Ok(text),
            Reply::Fail(message) => Err(Error::Inference(message)),
        }
    }
}

#[derive(Debug)]
struct MockState {
    script: VecDeque<Reply>,
    default_response: Reply,
    latency: Duration,
    calls: Vec<MockCall>,
}

/// Scripted backend. Clones share the script and the call log.
#[derive(Debug, Clone)]
pub struct MockGenerationBackend {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockGenerationBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerationBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                script: VecDeque::new(),
                default_response: Reply::Respond(DEFAULT_MOCK_RESPONSE.to_string()),
                latency: Duration::ZERO,
                calls: Vec::new(),
            })),
        }
    }

    /// Answer every unscripted request with `response`.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        let response = response.into();
        self.update(|s| s.default_response = Reply::Respond(response));
        self
    }

    /// Fail every unscripted request.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.update(|s| s.default_response = Reply::Fail(message));
        self
    }

    /// Queue a one-shot response, consumed before the default.
    pub fn then_respond(self, response: impl Into<String>) -> Self {
        let response = response.into();
        self.update(|s| s.script.push_back(Reply::Respond(response)));
        self
    }

    /// Queue a one-shot failure, consumed before the default.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.update(|s| s.script.push_back(Reply::Fail(message)));
        self
    }

    /// Simulated latency per request.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.update(|s| s.latency = latency);
        self
    }

    /// Requests received so far, oldest first.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    fn update(&self, f: impl FnOnce(&mut MockState)) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
    }

    fn next_response(&self, call: MockCall) -> Result<(Duration, Result<String>)> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::Internal("Mock backend state poisoned".to_string()))?;
        state.calls.push(call);
        let reply = state
            .script
            .pop_front()
            .unwrap_or_else(|| state.default_response.clone());
        Ok((state.latency, reply.into_result()))
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate_json_with_system(
        &self,
        system: &str,
        prompt: &str,
        schema: &Value,
    ) -> Result<String> {
        let (latency, response) = self.next_response(MockCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
            schema: schema.clone(),
        })?;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        response
    }

    fn model_name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
