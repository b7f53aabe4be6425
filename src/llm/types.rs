//! Common types for LLM interactions

use super::LlmError;
use futures::Stream;
use std::pin::Pin;

/// A single-prompt generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmRequest {
    pub prompt: String,
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: None,
        }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// One increment of streamed reply text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextChunk {
    /// `None` when the service sent a chunk without any text part
    pub text: Option<String>,
}

impl TextChunk {
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            text: Some(s.into()),
        }
    }

    pub fn empty() -> Self {
        Self { text: None }
    }
}

/// Lazy sequence of chunks; ends on completion, or with one `Err` item
pub type TextStream = Pin<Box<dyn Stream<Item = Result<TextChunk, LlmError>> + Send>>;
