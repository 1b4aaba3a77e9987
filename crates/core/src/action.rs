//! Action definitions, per-run context, and results.
//!
//! An *action* is a user-authored post-transcription transformation: either a
//! deterministic template expansion or a remote LLM completion. The wire form
//! ([`ActionDraft`]) is stringly-typed because users author it; the validated
//! form ([`ActionDefinition`]) uses a tagged union so that invalid states —
//! a remote-completion action carrying a `template` field, an unknown kind —
//! cannot be constructed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validate::{ValidationLimits, validate};

/// A user-authored action as it arrives over the wire (JSON or TOML).
///
/// Every field is optional: the validator, not the deserializer, decides what
/// is missing or out of bounds, so malformed input yields violations rather
/// than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionDraft {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Action kind: `"template"` or `"remote-completion"`.
    pub kind: Option<String>,
    /// Template body (template kind only).
    pub template: Option<String>,
    /// Prompt text (remote-completion kind only).
    pub prompt: Option<String>,
    /// Requested model; empty or absent means "use the configured default".
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ActionDraft {
    /// Validate and convert into an [`ActionDefinition`].
    ///
    /// Returns the full violation list on failure — never a partial
    /// definition. This is the only way to construct an `ActionKind`, so an
    /// unrecognized kind can never reach the processing service.
    pub fn into_definition(
        self,
        limits: &ValidationLimits,
    ) -> std::result::Result<ActionDefinition, Vec<String>> {
        let violations = validate(&self, limits);
        if !violations.is_empty() {
            return Err(violations);
        }

        // Validation guarantees name and the kind-specific fields are present.
        let kind = match self.kind.as_deref() {
            Some("template") => ActionKind::Template {
                template: self.template.unwrap_or_default(),
            },
            Some("remote-completion") => ActionKind::RemoteCompletion {
                prompt: self.prompt.unwrap_or_default(),
                model: self.model.filter(|m| !m.is_empty()),
                temperature: self.temperature,
                // Zero means "use the configured default", same as absent.
                max_tokens: self.max_tokens.filter(|t| *t != 0),
            },
            _ => unreachable!("validator rejects unknown kinds"),
        };

        Ok(ActionDefinition {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: self.name.unwrap_or_default(),
            description: self.description,
            kind,
        })
    }
}

/// A validated, immutable action definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Opaque stable identifier.
    pub id: String,
    /// Display label, 1–100 characters.
    pub name: String,
    /// Optional description, at most 500 characters.
    pub description: Option<String>,
    /// Kind-specific payload.
    #[serde(flatten)]
    pub kind: ActionKind,
}

/// The two ways an action can be rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ActionKind {
    /// Pure variable/function substitution, no network call.
    Template { template: String },
    /// A call to a remote LLM completion endpoint.
    RemoteCompletion {
        prompt: String,
        /// `None` means "use the configured default model".
        model: Option<String>,
        /// `None` means "use the configured default temperature".
        temperature: Option<f32>,
        /// `None` means "use the configured default max tokens".
        max_tokens: Option<u32>,
    },
}

impl ActionKind {
    /// The wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Template { .. } => "template",
            ActionKind::RemoteCompletion { .. } => "remote-completion",
        }
    }
}

/// The per-run data an action is evaluated against.
///
/// Constructed fresh for each invocation from the upstream transcription
/// result and discarded after the call returns. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionContext {
    /// The raw transcript text. May be empty.
    pub transcript: String,
    /// Original media file name, e.g. `"call.mp3"`.
    pub filename: String,
    /// Media type label, e.g. `"audio/mpeg"` or `"mp3"`.
    pub file_type: String,
    /// Whitespace-separated word count of the transcript.
    pub word_count: u64,
    /// Character count of the transcript.
    pub char_count: u64,
    /// Media duration in seconds, if known.
    pub duration_seconds: f64,
    /// How long the transcription itself took, in seconds.
    pub processing_time_seconds: f64,
}

impl ActionContext {
    /// Build a context from a transcript, deriving word and character counts.
    pub fn from_transcript(transcript: impl Into<String>, filename: impl Into<String>) -> Self {
        let transcript = transcript.into();
        let word_count = transcript.split_whitespace().count() as u64;
        let char_count = transcript.chars().count() as u64;
        Self {
            transcript,
            filename: filename.into(),
            word_count,
            char_count,
            ..Default::default()
        }
    }

    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = file_type.into();
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn with_processing_time(mut self, seconds: f64) -> Self {
        self.processing_time_seconds = seconds;
        self
    }
}

/// The engine's sole output type.
///
/// Every processing path — template render, remote success, degraded
/// fallback, hard failure — terminates in one of these. The caller shows
/// `output` on success (flagging `used_fallback` as a degraded result) and
/// `error` only on true failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    /// Rendered output; present iff `success`.
    pub output: Option<String>,
    /// Human-readable failure reason; present iff `!success`.
    pub error: Option<String>,
    /// Copied from the definition for observability.
    pub action_name: String,
    /// The wire name of the action kind (`"template"`, `"remote-completion"`).
    pub action_kind: String,
    /// The model actually used; `""` for template-kind actions.
    pub model: String,
    /// Reported token usage; 0 for template-kind and fallback results.
    pub tokens_used: u32,
    /// Stamped when processing completed.
    pub processed_at: DateTime<Utc>,
    /// True when a remote-completion action degraded to template rendering.
    pub used_fallback: bool,
    /// Wall-clock processing time for this action run.
    pub duration_ms: u64,
}

impl ActionResult {
    /// A successful result. `processed_at` is stamped now.
    pub fn success(def: &ActionDefinition, output: String) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
            action_name: def.name.clone(),
            action_kind: def.kind.as_str().into(),
            model: String::new(),
            tokens_used: 0,
            processed_at: Utc::now(),
            used_fallback: false,
            duration_ms: 0,
        }
    }

    /// A failed result. `processed_at` is stamped now.
    pub fn failure(def: &ActionDefinition, error: String) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error),
            action_name: def.name.clone(),
            action_kind: def.kind.as_str().into(),
            model: String::new(),
            tokens_used: 0,
            processed_at: Utc::now(),
            used_fallback: false,
            duration_ms: 0,
        }
    }
}
