//! # Scribeact Engine
//!
//! The action processing engine: takes a validated [`ActionDefinition`] and a
//! per-run [`ActionContext`], and produces an [`ActionResult`] — by template
//! expansion, or by calling a remote completion endpoint with bounded retry
//! and graceful degradation.
//!
//! The engine holds no shared mutable state; concurrent invocations are fully
//! independent. The only blocking points are the completion call and the
//! backoff sleeps, both bounded by the caller-supplied deadline.
//!
//! [`ActionDefinition`]: scribeact_core::ActionDefinition
//! [`ActionContext`]: scribeact_core::ActionContext
//! [`ActionResult`]: scribeact_core::ActionResult

pub mod processor;
pub mod service;

pub use processor::RemoteProcessor;
pub use service::ActionService;
