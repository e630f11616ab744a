//! OpenAI-compatible generation backend.
//!
//! Works with any endpoint speaking the chat-completions protocol: OpenAI,
//! Azure OpenAI, vLLM, LocalAI, LM Studio or Ollama's `/v1` compatibility
//! layer.
//!
//! # Example
//!
//! ```rust,no_run
//! use mediavault_inference::openai::{OpenAIBackend, OpenAIConfig};
//!
//! let backend = OpenAIBackend::new(OpenAIConfig {
//!     base_url: "http://localhost:11434/v1".to_string(),
//!     ..Default::default()
//! })
//! .unwrap();
//! ```

mod backend;
mod error;
mod types;

pub use backend::{
    OpenAIBackend, OpenAIConfig, DEFAULT_GEN_MODEL, DEFAULT_OPENAI_URL, DEFAULT_TIMEOUT_SECS,
};
pub use error::{to_core_error, OpenAIErrorCode};
pub use types::*;
