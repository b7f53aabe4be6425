//! Google Gemini provider implementation
//!
//! Streams replies from `models/{model}:streamGenerateContent` with
//! `alt=sse`, one `GenerateContentResponse` per event.

use super::framing::SseDecoder;
use super::types::{LlmRequest, TextChunk, TextStream};
use super::{streaming_client, LlmError, LlmService};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    endpoint: String,
    model_id: String,
}

impl GeminiService {
    pub fn new(
        api_key: String,
        model: &str,
        base_url: Option<&str>,
        idle_timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = streaming_client(idle_timeout)?;

        Ok(Self {
            client,
            api_key,
            endpoint: stream_endpoint(base_url.unwrap_or(DEFAULT_BASE_URL), model),
            model_id: model.to_string(),
        })
    }

    fn translate_request(request: &LlmRequest) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(request.prompt.clone()),
                    thought: None,
                }],
            }],
            generation_config: request.max_tokens.map(|max| GeminiGenerationConfig {
                max_output_tokens: max,
            }),
        }
    }
}

fn stream_endpoint(base_url: &str, model: &str) -> String {
    format!(
        "{}/models/{}:streamGenerateContent?alt=sse",
        base_url.trim_end_matches('/'),
        model
    )
}

/// What one streamed event contributes
#[derive(Debug)]
struct StreamStep {
    chunk: TextChunk,
    /// Set when the reply was cut off after this chunk's text
    stop: Option<LlmError>,
}

fn parse_event(payload: &str) -> Result<StreamStep, LlmError> {
    let resp: GeminiStreamResponse = serde_json::from_str(payload).map_err(|e| {
        LlmError::unknown(format!("Failed to parse stream event: {e} - data: {payload}"))
    })?;

    if let Some(error) = resp.error {
        let status = error.code.and_then(|c| u16::try_from(c).ok()).unwrap_or(500);
        return Err(LlmError::from_status(status, &error.message));
    }

    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(LlmError::blocked(format!("Prompt blocked: {reason}")));
    }

    let Some(candidate) = resp.candidates.into_iter().next() else {
        return Ok(StreamStep {
            chunk: TextChunk::empty(),
            stop: None,
        });
    };

    let texts: Vec<String> = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|p| p.thought != Some(true))
        .filter_map(|p| p.text)
        .collect();
    let chunk = if texts.is_empty() {
        TextChunk::empty()
    } else {
        TextChunk::text(texts.concat())
    };

    let stop = match candidate.finish_reason.as_deref() {
        None | Some("STOP" | "MAX_TOKENS" | "FINISH_REASON_UNSPECIFIED") => None,
        Some(other) => Some(LlmError::blocked(format!("Response stopped: {other}"))),
    };

    Ok(StreamStep { chunk, stop })
}

#[async_trait]
impl LlmService for GeminiService {
    async fn stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError> {
        let gemini_request = Self::translate_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map(|r| r.error.message)
                .unwrap_or(body);
            return Err(LlmError::from_status(status.as_u16(), &message));
        }

        let stream = async_stream::try_stream! {
            let mut decoder = SseDecoder::new();
            let mut body = response.bytes_stream();

            while let Some(bytes) = body.next().await {
                let bytes = bytes.map_err(|e| LlmError::from_reqwest(&e))?;
                for payload in decoder.push(&bytes) {
                    let step = parse_event(&payload)?;
                    yield step.chunk;
                    if let Some(stop) = step.stop {
                        Err::<(), LlmError>(stop)?;
                    }
                }
            }

            if let Some(payload) = decoder.finish() {
                let step = parse_event(&payload)?;
                yield step.chunk;
                if let Some(stop) = step.stop {
                    Err::<(), LlmError>(stop)?;
                }
            }
        };

        Ok(Box::pin(stream))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
    code: Option<i32>,
}
