//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::llm::{LlmError, LlmRequest, LlmService, TextStream};
use async_trait::async_trait;
use std::sync::Arc;

/// Client for generating replies
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Start a reply stream for one standalone prompt
    async fn generate(&self, prompt: &str) -> Result<TextStream, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn generate(&self, prompt: &str) -> Result<TextStream, LlmError> {
        (**self).generate(prompt).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

/// LLM client backed by a configured service
pub struct ServiceLlmClient {
    service: Arc<dyn LlmService>,
    max_tokens: Option<u32>,
}

impl ServiceLlmClient {
    pub fn new(service: Arc<dyn LlmService>, max_tokens: Option<u32>) -> Self {
        Self {
            service,
            max_tokens,
        }
    }
}

#[async_trait]
impl LlmClient for ServiceLlmClient {
    async fn generate(&self, prompt: &str) -> Result<TextStream, LlmError> {
        let request = LlmRequest::new(prompt).with_max_tokens(self.max_tokens);
        self.service.stream(&request).await
    }

    fn model_id(&self) -> &str {
        self.service.model_id()
    }
}
