//! # mediavault-inference
//!
//! Reasoning service behind the unlock negotiation dialog.
//!
//! [`LlmUnlockAssistant`] renders the security persona for a note title,
//! asks a [`GenerationBackend`](mediavault_core::GenerationBackend) for a
//! JSON decision and parses it strictly. Backends:
//! - [`ollama::OllamaBackend`] (feature `ollama`, default)
//! - [`openai::OpenAIBackend`] (feature `openai`)
//! - [`mock::MockGenerationBackend`] (feature `mock`)

pub mod assistant;
pub mod config;
pub mod prompt;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;

pub use assistant::{parse_decision, LlmUnlockAssistant};
pub use config::{assistant_from_env, build_assistant, ConfigError, InferenceBackend};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockGenerationBackend;
#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;
#[cfg(feature = "openai")]
pub use openai::{OpenAIBackend, OpenAIConfig};
