//! Backend selection.
//!
//! `MEDIAVAULT_INFERENCE_BACKEND` picks the generation backend
//! (`ollama` by default, `openai`, or `mock`); each backend then reads its
//! own variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use mediavault_core::UnlockAssistant;

use crate::assistant::LlmUnlockAssistant;

/// Environment variable naming the backend.
pub const BACKEND_ENV: &str = "MEDIAVAULT_INFERENCE_BACKEND";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid backend: {0}")]
    InvalidBackend(String),

    #[error("Backend {0} is not compiled in; enable the `{0}` feature")]
    Disabled(InferenceBackend),

    #[error("Failed to initialize backend: {0}")]
    Init(#[from] mediavault_core::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Generation backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InferenceBackend {
    #[default]
    Ollama,
    OpenAI,
    Mock,
}

impl FromStr for InferenceBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "mock" => Ok(Self::Mock),
            _ => Err(ConfigError::InvalidBackend(s.to_string())),
        }
    }
}

impl fmt::Display for InferenceBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAI => write!(f, "openai"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

impl InferenceBackend {
    /// Read [`BACKEND_ENV`]; unset or empty means the default.
    pub fn from_env() -> ConfigResult<Self> {
        match env::var(BACKEND_ENV) {
            Ok(v) if !v.trim().is_empty() => v.parse(),
            _ => Ok(Self::default()),
        }
    }
}

/// Build the unlock assistant for `backend`, configured from the environment.
pub fn build_assistant(backend: InferenceBackend) -> ConfigResult<Arc<dyn UnlockAssistant>> {
    let assistant: Arc<dyn UnlockAssistant> = match backend {
        #[cfg(feature = "ollama")]
        InferenceBackend::Ollama => Arc::new(LlmUnlockAssistant::new(
            crate::ollama::OllamaBackend::from_env()?,
        )),
        #[cfg(feature = "openai")]
        InferenceBackend::OpenAI => Arc::new(LlmUnlockAssistant::new(
            crate::openai::OpenAIBackend::from_env()?,
        )),
        #[cfg(feature = "mock")]
        InferenceBackend::Mock => Arc::new(LlmUnlockAssistant::new(
            crate::mock::MockGenerationBackend::new(),
        )),
        #[allow(unreachable_patterns)]
        other => return Err(ConfigError::Disabled(other)),
    };

    info!(
        subsystem = "inference",
        backend = %backend,
        model = assistant.name(),
        "Unlock assistant configured"
    );
    Ok(assistant)
}

/// [`InferenceBackend::from_env`] followed by [`build_assistant`].
pub fn assistant_from_env() -> ConfigResult<Arc<dyn UnlockAssistant>> {
    build_assistant(InferenceBackend::from_env()?)
}
