//! Configuration loading, validation, and management for Scribeact.
//!
//! Loads configuration from `scribeact.toml` with environment variable
//! overrides. Validates all settings at load time.
//!
//! Defaults are an explicit value passed into the engine at construction —
//! nothing here is a process-wide global, so several engines with different
//! defaults can coexist in one process (the tests rely on this).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use scribeact_core::ValidationLimits;

/// The root configuration structure.
///
/// Maps directly to `scribeact.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model used when an action leaves `model` blank.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Temperature used when an action leaves `temperature` unset.
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens used when an action leaves `maxTokens` unset or zero.
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Models a remote-completion action may request.
    #[serde(default = "default_allowed_models")]
    pub allowed_models: Vec<String>,

    /// Per-attempt timeout for the completion call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Overall deadline for one action run, retries included.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Retry and backoff policy.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Completion endpoint settings.
    #[serde(default)]
    pub endpoint: EndpointConfig,
}

fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_allowed_models() -> Vec<String> {
    ValidationLimits::default().allowed_models
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_deadline_secs() -> u64 {
    60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            allowed_models: default_allowed_models(),
            request_timeout_secs: default_request_timeout_secs(),
            deadline_secs: default_deadline_secs(),
            retry: RetryConfig::default(),
            endpoint: EndpointConfig::default(),
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("allowed_models", &self.allowed_models)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("deadline_secs", &self.deadline_secs)
            .field("retry", &self.retry)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Retry and backoff policy for remote completion attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, first try included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Multiplier applied to the delay after each failed attempt.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Upper bound on any single backoff delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    200
}
fn default_backoff_factor() -> f64 {
    2.0
}
fn default_max_delay_ms() -> u64 {
    2_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// The backoff delay after the given zero-based failed attempt,
    /// exponential and capped at `max_delay_ms`.
    pub fn delay_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let raw = self.base_delay_ms as f64 * self.backoff_factor.powi(attempt as i32);
        let capped = raw.min(self.max_delay_ms as f64);
        std::time::Duration::from_millis(capped as u64)
    }
}

/// Completion endpoint settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; also settable via `SCRIBEACT_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("base_url", &self.base_url)
            .field(
                "api_key",
                &match self.api_key {
                    Some(_) => "[REDACTED]",
                    None => "None",
                },
            )
            .finish()
    }
}

impl EngineConfig {
    /// Load configuration from the default path (`./scribeact.toml`).
    ///
    /// Environment variables take priority over the file:
    /// - `SCRIBEACT_API_KEY` (falls back to `OPENAI_API_KEY`)
    /// - `SCRIBEACT_BASE_URL`
    /// - `SCRIBEACT_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(Path::new("scribeact.toml"))?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        // Overrides can change the model, so the invariants must hold again.
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides from the given lookup.
    fn apply_env_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(key) = get("SCRIBEACT_API_KEY") {
            self.endpoint.api_key = Some(key);
        } else if self.endpoint.api_key.is_none() {
            self.endpoint.api_key = get("OPENAI_API_KEY");
        }

        if let Some(url) = get("SCRIBEACT_BASE_URL") {
            self.endpoint.base_url = url;
        }

        if let Some(model) = get("SCRIBEACT_MODEL") {
            self.default_model = model;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.default_max_tokens == 0 || self.default_max_tokens > 4_000 {
            return Err(ConfigError::ValidationError(
                "default_max_tokens must be between 1 and 4000".into(),
            ));
        }

        if !self.allowed_models.contains(&self.default_model) {
            return Err(ConfigError::ValidationError(format!(
                "default_model '{}' is not in allowed_models",
                self.default_model
            )));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".into(),
            ));
        }

        if self.retry.backoff_factor < 1.0 {
            return Err(ConfigError::ValidationError(
                "retry.backoff_factor must be at least 1.0".into(),
            ));
        }

        Ok(())
    }

    /// The validation limits implied by this configuration.
    pub fn validation_limits(&self) -> ValidationLimits {
        ValidationLimits {
            allowed_models: self.allowed_models.clone(),
            ..ValidationLimits::default()
        }
    }

    /// Whether an API key is available (from file or environment).
    pub fn has_api_key(&self) -> bool {
        self.endpoint.api_key.is_some()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}
