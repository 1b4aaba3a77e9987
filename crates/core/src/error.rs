//! Error types for the Scribeact domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Scribeact operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Remote completion errors ---
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    // --- Template evaluation errors ---
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors returned by a [`crate::CompletionClient`].
///
/// The remote processor classifies these into retryable and non-retryable
/// failures; see [`CompletionError::is_retryable`].
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by endpoint, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl CompletionError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Authentication failures are permanent — retrying with the same
    /// credentials cannot help. Everything else (rate limits, server errors,
    /// timeouts, network blips, unknown failures) is treated as transient,
    /// erring on the side of retrying within the bounded attempt budget.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CompletionError::AuthenticationFailed(_))
    }
}

/// Errors from the template evaluator.
///
/// These only cover malformed template *syntax*. Unknown field names and
/// unknown pipeline functions are deliberately not errors — authors edit
/// templates interactively, and a typo must never abort rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unterminated placeholder starting at byte {position}")]
    Unterminated { position: usize },

    #[error("malformed placeholder at byte {position}: {reason}")]
    Malformed { position: usize, reason: String },
}
