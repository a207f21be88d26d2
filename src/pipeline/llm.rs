//! Model interaction: one multimodal request per document.
//!
//! [`VisionModel`] is the seam between the pipeline and a hosted model. The
//! production implementation, [`GeminiModel`], speaks the Gemini
//! `generateContent` REST API directly: the request carries the prompt text
//! first and then every page image in order, inside a single user turn.
//!
//! There is no retry policy. Any transport failure, non-success status, API
//! error body, blocked prompt or empty candidate is reported once as
//! [`ClaimsError::ExternalService`].

use crate::config::{ApiCredential, ExtractionConfig};
use crate::error::ClaimsError;
use crate::pipeline::encode::InlineImage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Everything a model needs to answer one extraction request.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub prompt: String,
    /// Page images, in page order.
    pub images: Vec<InlineImage>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Text reply plus token usage, when the provider reports it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub prompt_tokens: usize,
    pub output_tokens: usize,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A hosted multimodal model.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Model identifier, for logs and progress events.
    fn name(&self) -> &str;

    /// Send one request and return the raw reply text.
    async fn generate(&self, request: &VisionRequest) -> Result<ModelReply, ClaimsError>;
}

// ── Gemini wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    status: Option<String>,
}

fn build_request(request: &VisionRequest) -> GenerateContentRequest<'_> {
    let mut parts = Vec::with_capacity(request.images.len() + 1);
    parts.push(Part::Text {
        text: &request.prompt,
    });
    parts.extend(request.images.iter().map(|img| Part::InlineData {
        inline_data: Blob {
            mime_type: &img.mime_type,
            data: &img.data,
        },
    }));

    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts,
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
        },
    }
}

fn service_error(status: Option<u16>, message: impl Into<String>) -> ClaimsError {
    ClaimsError::ExternalService {
        service: "gemini".to_string(),
        status,
        message: message.into(),
    }
}

/// Pull the reply text out of a successful response body.
fn reply_from_response(response: GenerateContentResponse) -> Result<ModelReply, ClaimsError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|f| f.block_reason)
    {
        return Err(service_error(None, format!("prompt blocked ({reason})")));
    }

    let usage = response.usage_metadata.unwrap_or_default();
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| service_error(None, "response contained no candidates"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
        return Err(service_error(
            None,
            format!("empty candidate (finish reason: {reason})"),
        ));
    }

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if reason != "STOP" {
            warn!("Gemini finished with reason {}; reply may be truncated", reason);
        }
    }

    Ok(ModelReply {
        text,
        prompt_tokens: usage.prompt_token_count,
        output_tokens: usage.candidates_token_count,
    })
}

/// Turn a non-success response body into a readable message.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => match env.error.status {
            Some(s) => format!("HTTP {} {}: {}", status.as_u16(), s, env.error.message),
            None => format!("HTTP {}: {}", status.as_u16(), env.error.message),
        },
        Err(_) => {
            let snippet: String = body.chars().take(200).collect();
            format!("HTTP {}: {}", status, snippet.trim())
        }
    }
}

/// Gemini `generateContent` client.
pub struct GeminiModel {
    client: reqwest::Client,
    credential: ApiCredential,
    model: String,
    api_base: String,
}

impl GeminiModel {
    pub fn new(credential: ApiCredential, config: &ExtractionConfig) -> Result<Self, ClaimsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ClaimsError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            credential,
            model: config.model.clone(),
            api_base: config.api_base.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl VisionModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &VisionRequest) -> Result<ModelReply, ClaimsError> {
        let body = build_request(request);
        debug!(
            "POST {} ({} image(s))",
            self.endpoint(),
            request.images.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    service_error(None, "request timed out")
                } else {
                    service_error(None, e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| service_error(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(service_error(
                Some(status.as_u16()),
                error_message(status, &text),
            ));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            service_error(
                Some(status.as_u16()),
                format!("unreadable response body: {}", e),
            )
        })?;

        let reply = reply_from_response(parsed)?;
        debug!(
            "Gemini reply: {} chars, {} prompt tokens, {} output tokens",
            reply.text.len(),
            reply.prompt_tokens,
            reply.output_tokens
        );
        Ok(reply)
    }
}
