//! Ollama provider implementation
//!
//! Streams from a local `/api/generate` endpoint, which answers with one
//! JSON object per line.

use super::framing::LineDecoder;
use super::types::{LlmRequest, TextChunk, TextStream};
use super::{streaming_client, LlmError, LlmService};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama service implementation
pub struct OllamaService {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaService {
    pub fn new(model: &str, base_url: Option<&str>, idle_timeout: Duration) -> Result<Self, LlmError> {
        let client = streaming_client(idle_timeout)?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            stream: true,
            options: request.max_tokens.map(|n| OllamaOptions { num_predict: n }),
        }
    }
}

/// One NDJSON line: `Ok(None)` marks the final `done` line
fn parse_line(line: &str) -> Result<Option<TextChunk>, LlmError> {
    let resp: OllamaStreamLine = serde_json::from_str(line)
        .map_err(|e| LlmError::unknown(format!("Failed to parse stream line: {e} - data: {line}")))?;

    if let Some(error) = resp.error {
        return Err(LlmError::server_error(format!("Ollama error: {error}")));
    }
    if resp.done && resp.response.as_deref().map_or(true, str::is_empty) {
        return Ok(None);
    }
    Ok(Some(TextChunk { text: resp.response }))
}

#[async_trait]
impl LlmService for OllamaService {
    async fn stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&self.translate_request(request))
            .send()
            .await
            .map_err(|e| {
                let mut err = LlmError::from_reqwest(&e);
                if e.is_connect() {
                    err.message.push_str(". Make sure Ollama is running with: ollama serve");
                }
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;
            let message = serde_json::from_str::<OllamaErrorResponse>(&body)
                .map(|r| r.error)
                .unwrap_or(body);
            return Err(LlmError::from_status(status.as_u16(), &message));
        }

        let stream = async_stream::try_stream! {
            let mut decoder = LineDecoder::new();
            let mut body = response.bytes_stream();

            'read: while let Some(bytes) = body.next().await {
                let bytes = bytes.map_err(|e| LlmError::from_reqwest(&e))?;
                for line in decoder.push(&bytes) {
                    match parse_line(&line)? {
                        Some(chunk) => yield chunk,
                        None => break 'read,
                    }
                }
            }

            if let Some(line) = decoder.finish() {
                if let Some(chunk) = parse_line(&line)? {
                    yield chunk;
                }
            }
        };

        Ok(Box::pin(stream))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaStreamLine {
    response: Option<String>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorResponse {
    error: String,
}
