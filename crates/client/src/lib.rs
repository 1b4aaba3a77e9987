//! OpenAI-compatible completion client.
//!
//! Works with OpenAI and any endpoint exposing a compatible
//! `/chat/completions` route (LM Studio, Ollama, vLLM, OpenRouter, ...).
//!
//! The client's job is transport plus error classification; retry and
//! fallback policy live in the engine. HTTP statuses map to the typed
//! [`CompletionError`] variants the processor classifies on:
//! 429 → `RateLimited`, 401/403 → `AuthenticationFailed`, anything else
//! non-200 → `ApiError`, request timeout → `Timeout`, transport failure →
//! `Network`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use scribeact_config::EngineConfig;
use scribeact_core::{CompletionClient, CompletionError, CompletionRequest, CompletionResponse};

/// A completion client for OpenAI-compatible endpoints.
///
/// Safe for concurrent use: the inner `reqwest::Client` pools connections.
pub struct OpenAiCompletionClient {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompletionClient {
    /// Create a client against the given base URL.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    /// Create a client from the engine configuration's endpoint section.
    pub fn from_config(config: &EngineConfig) -> Result<Self, CompletionError> {
        Self::new(
            "openai",
            config.endpoint.base_url.clone(),
            config.endpoint.api_key.clone(),
            std::time::Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            CompletionError::NotConfigured("no API key (set SCRIBEACT_API_KEY)".into())
        })?;

        let url = format!("{}/chat/completions", self.base_url);
        let body = ApiRequest {
            model: &request.model,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: request.system.clone(),
                },
                ApiMessage {
                    role: "user",
                    content: request.user.clone(),
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!(client = %self.name, model = %request.model, "sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(e.to_string())
                } else {
                    CompletionError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(CompletionError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(CompletionError::AuthenticationFailed(
                "invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "endpoint returned error");
            return Err(CompletionError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| CompletionError::ApiError {
                status_code: 200,
                message: format!("failed to parse response: {e}"),
            })?;

        let output = api_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CompletionError::ApiError {
                status_code: 200,
                message: "no choices in response".into(),
            })?;

        Ok(CompletionResponse {
            output,
            tokens_used: api_response.usage.map(|u| u.total_tokens),
            model: api_response.model,
        })
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    total_tokens: u32,
}
