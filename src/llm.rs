//! LLM provider abstraction
//!
//! Provides a common streaming interface over the supported providers.

mod error;
pub mod framing;
mod gemini;
mod models;
mod ollama;
mod types;

pub use error::LlmError;
pub use gemini::GeminiService;
pub use models::{create_service, Provider};
pub use ollama::OllamaService;
pub use types::*;

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for streamed replies
///
/// `idle_timeout` bounds each wait for more bytes rather than the whole
/// request, so a long reply is never cut off while it keeps producing.
fn streaming_client(idle_timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .read_timeout(idle_timeout)
        .build()
        .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))
}

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Start generating a reply. Errors before the first chunk surface here,
    /// later ones as the stream's final item.
    async fn stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError> {
        let start = std::time::Instant::now();
        let mut inner = match self.inner.stream(request).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %start.elapsed().as_millis(),
                    error = %e.message,
                    transient = e.kind.is_transient(),
                    "LLM request failed"
                );
                return Err(e);
            }
        };

        let model_id = self.model_id.clone();
        let logged = async_stream::stream! {
            let mut chunks = 0usize;
            let mut chars = 0usize;
            while let Some(item) = inner.next().await {
                match &item {
                    Ok(chunk) => {
                        chunks += 1;
                        chars += chunk.text.as_deref().map_or(0, |t| t.chars().count());
                    }
                    Err(e) => {
                        tracing::error!(
                            model = %model_id,
                            duration_ms = %start.elapsed().as_millis(),
                            chunks,
                            error = %e.message,
                            transient = e.kind.is_transient(),
                            "LLM stream failed"
                        );
                    }
                }
                let failed = item.is_err();
                yield item;
                if failed {
                    return;
                }
            }
            tracing::info!(
                model = %model_id,
                duration_ms = %start.elapsed().as_millis(),
                chunks,
                chars,
                "LLM stream completed"
            );
        };

        Ok(Box::pin(logged))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
