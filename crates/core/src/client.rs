//! CompletionClient trait — the abstraction over remote completion endpoints.
//!
//! A client knows how to send one chat-style completion request and return
//! either the generated text or a typed error. The remote processor drives
//! retry and fallback policy on top of this boundary without ever touching a
//! concrete transport, which keeps the engine testable with scripted mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;

/// A single completion request.
///
/// The engine always sends exactly one system instruction and one user
/// message; conversation history is not this engine's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (already resolved — never empty).
    pub model: String,

    /// The fixed system instruction.
    pub system: String,

    /// The user message: the action prompt plus the labeled transcript.
    pub user: String,

    /// Sampling temperature (0.0 = deterministic, 2.0 = maximum).
    pub temperature: f32,

    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

/// A completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text.
    pub output: String,

    /// Total token usage, when the endpoint reports it.
    pub tokens_used: Option<u32>,

    /// Which model actually responded (may differ from requested).
    pub model: String,
}

/// The completion client boundary.
///
/// Implementations must be safe for concurrent use by simultaneous action
/// runs; connection pooling is the implementation's concern.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// A human-readable name for this client (e.g. `"openai"`).
    fn name(&self) -> &str;

    /// Send a request and get a complete response or a typed error.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, CompletionError>;
}
