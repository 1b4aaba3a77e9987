//! # Scribeact Core
//!
//! Domain types, traits, and error definitions for the Scribeact post-transcription
//! action engine. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The completion backend is defined as a trait here; implementations live in
//! their own crates. This enables:
//! - Swapping endpoints via configuration
//! - Deterministic unit tests with scripted mock clients
//! - Clean dependency graph (all crates depend inward on core)

pub mod action;
pub mod client;
pub mod error;
pub mod validate;

// Re-export key types at crate root for ergonomics
pub use action::{ActionContext, ActionDefinition, ActionDraft, ActionKind, ActionResult};
pub use client::{CompletionClient, CompletionRequest, CompletionResponse};
pub use error::{CompletionError, Error, Result, TemplateError};
pub use validate::{ValidationLimits, validate};
