//! Environment configuration
//!
//! Everything is read through a lookup function so tests can supply their
//! own variables.

use crate::llm::{LlmError, Provider};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:latest";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown LLM_PROVIDER '{value}' (expected 'gemini' or 'ollama')")]
    UnknownProvider { value: String },
    #[error("{var} must be set to use {provider}")]
    MissingApiKey { var: &'static str, provider: &'static str },
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
    #[error("cannot locate a home directory; set CHAT_LOG_PATH")]
    NoLogPath,
    #[error("failed to create LLM client: {0}")]
    Client(#[from] LlmError),
}

/// Configuration for the LLM provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub provider: Provider,
    pub model: String,
    pub api_key: Option<String>,
    /// Gemini API base or Ollama server URL
    pub base_url: Option<String>,
    pub max_output_tokens: Option<u32>,
    /// Longest wait for more reply bytes, not for the whole reply
    pub request_timeout: Duration,
}

impl LlmConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("LLM_PROVIDER") {
            Some(value) => value
                .parse::<Provider>()
                .map_err(|_| ConfigError::UnknownProvider { value })?,
            None => Provider::Gemini,
        };

        let (model, api_key, base_url) = match provider {
            Provider::Gemini => {
                let key = get("GEMINI_API_KEY").ok_or(ConfigError::MissingApiKey {
                    var: "GEMINI_API_KEY",
                    provider: provider.display_name(),
                })?;
                (
                    get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                    Some(key),
                    get("GEMINI_BASE_URL"),
                )
            }
            Provider::Ollama => (
                get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
                None,
                get("OLLAMA_URL"),
            ),
        };

        let max_output_tokens = get("CHAT_MAX_OUTPUT_TOKENS")
            .map(|v| parse_positive("CHAT_MAX_OUTPUT_TOKENS", v))
            .transpose()?;
        let timeout_secs = get("CHAT_REQUEST_TIMEOUT_SECS")
            .map(|v| parse_positive("CHAT_REQUEST_TIMEOUT_SECS", v))
            .transpose()?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            provider,
            model,
            api_key,
            base_url,
            max_output_tokens,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_positive<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigError::InvalidNumber { var, value }),
    }
}

/// Everything the binary needs before taking over the terminal
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub log_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let log_path = match lookup("CHAT_LOG_PATH").filter(|v| !v.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => lookup("HOME")
                .filter(|v| !v.is_empty())
                .map(|home| PathBuf::from(home).join(".gemini-chat").join("chat.log"))
                .ok_or(ConfigError::NoLogPath)?,
        };

        Ok(Self {
            llm: LlmConfig::from_lookup(&lookup)?,
            log_path,
        })
    }
}
