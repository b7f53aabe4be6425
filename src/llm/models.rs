//! Provider selection
//!
//! Maps configuration onto a concrete service, wrapped for logging.

use super::{GeminiService, LlmService, LoggingService, OllamaService};
use crate::config::{ConfigError, LlmConfig};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Gemini,
    Ollama,
}

impl Provider {
    /// Get the display name for this provider
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Ollama => "Ollama",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "ollama" => Ok(Provider::Ollama),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Build the configured service
pub fn create_service(config: &LlmConfig) -> Result<Arc<dyn LlmService>, ConfigError> {
    let service: Arc<dyn LlmService> = match config.provider {
        Provider::Gemini => {
            let api_key = config.api_key.clone().ok_or(ConfigError::MissingApiKey {
                var: "GEMINI_API_KEY",
                provider: Provider::Gemini.display_name(),
            })?;
            Arc::new(GeminiService::new(
                api_key,
                &config.model,
                config.base_url.as_deref(),
                config.request_timeout,
            )?)
        }
        Provider::Ollama => Arc::new(OllamaService::new(
            &config.model,
            config.base_url.as_deref(),
            config.request_timeout,
        )?),
    };

    tracing::info!(
        provider = %config.provider,
        model = %config.model,
        "LLM service configured"
    );

    Ok(Arc::new(LoggingService::new(service)))
}
