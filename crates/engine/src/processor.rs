//! Remote completion processing — the engine's state machine.
//!
//! One logical "run this AI action" call walks through:
//!
//! ```text
//! Building → Attempting → { Success,
//!                           RetryWait → Attempting,
//!                           Exhausted → Fallback,
//!                           AuthFailure → Fallback }
//! ```
//!
//! A transient failure (rate limit, server error, timeout, network) is
//! retried with capped exponential backoff inside the caller's deadline. An
//! authentication failure skips retries entirely. When attempts are
//! exhausted, the processor does not return an error: it degrades to a
//! deterministic template rendering of the action's prompt, because the user
//! already has the transcript and a degraded secondary artifact beats a hard
//! failure. The underlying cause goes to the log, not to the caller.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use scribeact_config::EngineConfig;
use scribeact_core::{
    ActionContext, ActionDefinition, ActionKind, ActionResult, CompletionClient,
    CompletionError, CompletionRequest,
};

/// The fixed system instruction sent with every completion request.
const SYSTEM_INSTRUCTION: &str = "You are an assistant that processes audio and video \
     transcripts. Follow the user's instruction, using only the transcript provided. \
     Be concise and factual.";

/// Orchestrates one remote completion run: request building, failure
/// classification, the retry loop, and the degradation path.
pub struct RemoteProcessor {
    client: Arc<dyn CompletionClient>,
    config: EngineConfig,
}

impl RemoteProcessor {
    pub fn new(client: Arc<dyn CompletionClient>, config: EngineConfig) -> Self {
        Self { client, config }
    }

    /// Run a remote-completion action to completion within `deadline`.
    ///
    /// Always returns a well-formed result; the only `success = false` path
    /// is a fallback rendering failure.
    pub async fn run(
        &self,
        def: &ActionDefinition,
        ctx: &ActionContext,
        deadline: Duration,
    ) -> ActionResult {
        let ActionKind::RemoteCompletion {
            prompt,
            model,
            temperature,
            max_tokens,
        } = &def.kind
        else {
            return ActionResult::failure(def, "not a remote-completion action".into());
        };

        // Building: resolve defaults and compose the request.
        let request = CompletionRequest {
            model: model
                .clone()
                .unwrap_or_else(|| self.config.default_model.clone()),
            system: SYSTEM_INSTRUCTION.into(),
            user: format!("{prompt}\n\nTranscript:\n{}", ctx.transcript),
            temperature: temperature.unwrap_or(self.config.default_temperature),
            max_tokens: max_tokens.unwrap_or(self.config.default_max_tokens),
        };

        let deadline_at = Instant::now() + deadline;
        let per_attempt_timeout = Duration::from_secs(self.config.request_timeout_secs);
        let retry = &self.config.retry;
        let mut last_error: Option<CompletionError> = None;

        for attempt in 0..retry.max_attempts {
            let remaining = deadline_at.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    action = %def.name,
                    attempt,
                    "deadline exhausted before attempt, degrading to fallback"
                );
                break;
            }

            debug!(
                action = %def.name,
                client = %self.client.name(),
                model = %request.model,
                attempt = attempt + 1,
                total = retry.max_attempts,
                "sending completion request"
            );

            match tokio::time::timeout(
                per_attempt_timeout.min(remaining),
                self.client.complete(request.clone()),
            )
            .await
            {
                Ok(Ok(response)) => {
                    let mut result = ActionResult::success(def, response.output);
                    result.model = if response.model.is_empty() {
                        request.model
                    } else {
                        response.model
                    };
                    result.tokens_used = response.tokens_used.unwrap_or(0);
                    return result;
                }
                Ok(Err(e)) => {
                    warn!(
                        action = %def.name,
                        attempt = attempt + 1,
                        error = %e,
                        retryable = e.is_retryable(),
                        "completion attempt failed"
                    );
                    let retryable = e.is_retryable();
                    last_error = Some(e);
                    if !retryable {
                        // AuthFailure: retrying with the same credentials cannot help.
                        break;
                    }
                }
                Err(_) => {
                    warn!(
                        action = %def.name,
                        attempt = attempt + 1,
                        timeout_secs = per_attempt_timeout.as_secs(),
                        "completion attempt timed out"
                    );
                    last_error = Some(CompletionError::Timeout(format!(
                        "attempt exceeded {}s",
                        per_attempt_timeout.as_secs()
                    )));
                }
            }

            // RetryWait: sleep before the next attempt, clamped to the
            // remaining deadline budget.
            if attempt + 1 < retry.max_attempts {
                let remaining = deadline_at.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                tokio::time::sleep(retry.delay_for_attempt(attempt).min(remaining)).await;
            }
        }

        self.fallback(def, prompt, ctx, last_error)
    }

    /// Exhausted/AuthFailure → Fallback: render the prompt deterministically.
    ///
    /// The prompt goes through the template evaluator (for most prompts this
    /// is the literal text) and the transcript is appended under a label, so
    /// the user still gets the content the action was meant to transform.
    fn fallback(
        &self,
        def: &ActionDefinition,
        prompt: &str,
        ctx: &ActionContext,
        cause: Option<CompletionError>,
    ) -> ActionResult {
        warn!(
            action = %def.name,
            cause = %cause
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt completed".into()),
            "remote completion unavailable, rendering fallback"
        );

        let rendered = match scribeact_template::render(prompt, ctx) {
            Ok(rendered) => rendered,
            Err(e) => {
                // Catastrophic: even the deterministic path failed.
                return ActionResult::failure(
                    def,
                    format!("AI processing unavailable and fallback rendering failed: {e}"),
                );
            }
        };

        // A prompt made entirely of unknown placeholders renders empty; fall
        // back to the literal prompt text so the output stays non-empty.
        let mut output = if rendered.trim().is_empty() {
            prompt.to_string()
        } else {
            rendered
        };

        if !ctx.transcript.is_empty() {
            output.push_str("\n\nTranscript:\n");
            output.push_str(&ctx.transcript);
        }

        let mut result = ActionResult::success(def, output);
        result.used_fallback = true;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scribeact_core::CompletionResponse;
    use std::sync::Mutex;

    /// A mock client that always fails with the given error.
    struct FailingClient {
        error: CompletionError,
        call_count: Mutex<usize>,
    }

    impl FailingClient {
        fn new(error: CompletionError) -> Self {
            Self {
                error,
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl CompletionClient for FailingClient {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, CompletionError> {
            *self.call_count.lock().unwrap() += 1;
            Err(self.error.clone())
        }
    }

    /// A mock client that always succeeds and records the request.
    struct SuccessClient {
        output: String,
        tokens: u32,
        call_count: Mutex<usize>,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    impl SuccessClient {
        fn new(output: &str, tokens: u32) -> Self {
            Self {
                output: output.into(),
                tokens,
                call_count: Mutex::new(0),
                last_request: Mutex::new(None),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }

        fn last_request(&self) -> CompletionRequest {
            self.last_request.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl CompletionClient for SuccessClient {
        fn name(&self) -> &str {
            "success"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, CompletionError> {
            *self.call_count.lock().unwrap() += 1;
            *self.last_request.lock().unwrap() = Some(request);
            Ok(CompletionResponse {
                output: self.output.clone(),
                tokens_used: Some(self.tokens),
                model: String::new(),
            })
        }
    }

    /// A mock client that fails a fixed number of times, then succeeds.
    struct FlakyClient {
        failures_left: Mutex<u32>,
        call_count: Mutex<usize>,
    }

    impl FlakyClient {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: Mutex::new(failures),
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl CompletionClient for FlakyClient {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, CompletionError> {
            *self.call_count.lock().unwrap() += 1;
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(CompletionError::ApiError {
                    status_code: 500,
                    message: "Internal Server Error".into(),
                });
            }
            Ok(CompletionResponse {
                output: "recovered".into(),
                tokens_used: Some(42),
                model: "gpt-3.5-turbo".into(),
            })
        }
    }

    /// A mock client that hangs forever (for timeout testing).
    struct HangingClient;

    #[async_trait]
    impl CompletionClient for HangingClient {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, CompletionError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    fn remote_def(prompt: &str) -> ActionDefinition {
        ActionDefinition {
            id: "a-1".into(),
            name: "Summary".into(),
            description: None,
            kind: ActionKind::RemoteCompletion {
                prompt: prompt.into(),
                model: None,
                temperature: None,
                max_tokens: None,
            },
        }
    }

    fn test_ctx() -> ActionContext {
        ActionContext::from_transcript("We agreed on the budget.", "call.mp3")
    }

    fn deadline() -> Duration {
        Duration::from_secs(60)
    }

    #[tokio::test(start_paused = true)]
    async fn remote_happy_path() {
        let client = Arc::new(SuccessClient::new("Key decisions: budget approved", 256));
        let processor = RemoteProcessor::new(client.clone(), EngineConfig::default());

        let result = processor
            .run(&remote_def("Extract key decisions"), &test_ctx(), deadline())
            .await;

        assert!(result.success);
        assert_eq!(result.output.as_deref(), Some("Key decisions: budget approved"));
        assert_eq!(result.tokens_used, 256);
        assert!(!result.used_fallback);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn request_carries_prompt_and_labeled_transcript() {
        let client = Arc::new(SuccessClient::new("ok", 1));
        let processor = RemoteProcessor::new(client.clone(), EngineConfig::default());

        processor
            .run(&remote_def("Summarize this"), &test_ctx(), deadline())
            .await;

        let request = client.last_request();
        assert!(request.user.starts_with("Summarize this"));
        assert!(request.user.contains("Transcript:\nWe agreed on the budget."));
        assert!(!request.system.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn defaults_are_resolved_into_the_request() {
        let client = Arc::new(SuccessClient::new("ok", 1));
        let processor = RemoteProcessor::new(client.clone(), EngineConfig::default());

        processor
            .run(&remote_def("Summarize"), &test_ctx(), deadline())
            .await;

        let request = client.last_request();
        assert_eq!(request.model, "gpt-3.5-turbo");
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(request.max_tokens, 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_parameters_override_defaults() {
        let client = Arc::new(SuccessClient::new("ok", 1));
        let processor = RemoteProcessor::new(client.clone(), EngineConfig::default());

        let mut def = remote_def("Summarize");
        def.kind = ActionKind::RemoteCompletion {
            prompt: "Summarize".into(),
            model: Some("gpt-4o".into()),
            temperature: Some(1.5),
            max_tokens: Some(200),
        };
        processor.run(&def, &test_ctx(), deadline()).await;

        let request = client.last_request();
        assert_eq!(request.model, "gpt-4o");
        assert!((request.temperature - 1.5).abs() < f32::EPSILON);
        assert_eq!(request.max_tokens, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_on_every_call_degrades_within_attempt_budget() {
        let client = Arc::new(FailingClient::new(CompletionError::RateLimited {
            retry_after_secs: 5,
        }));
        let processor = RemoteProcessor::new(client.clone(), EngineConfig::default());

        let result = processor
            .run(&remote_def("Summarize the call"), &test_ctx(), deadline())
            .await;

        assert!(result.success);
        assert!(result.used_fallback);
        assert_eq!(result.tokens_used, 0);
        // Default budget is 3 attempts; never more than 4 for any config.
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_falls_back_after_exactly_one_call() {
        let client = Arc::new(FailingClient::new(CompletionError::AuthenticationFailed(
            "invalid key".into(),
        )));
        let processor = RemoteProcessor::new(client.clone(), EngineConfig::default());

        let result = processor
            .run(&remote_def("Summarize"), &test_ctx(), deadline())
            .await;

        assert!(result.success);
        assert!(result.used_fallback);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn server_error_recovers_on_second_attempt() {
        let client = Arc::new(FlakyClient::new(1));
        let processor = RemoteProcessor::new(client.clone(), EngineConfig::default());

        let result = processor
            .run(&remote_def("Summarize"), &test_ctx(), deadline())
            .await;

        assert!(result.success);
        assert!(!result.used_fallback);
        assert_eq!(result.output.as_deref(), Some("recovered"));
        assert_eq!(result.tokens_used, 42);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_output_contains_prompt_and_transcript() {
        let client = Arc::new(FailingClient::new(CompletionError::Network(
            "conn refused".into(),
        )));
        let processor = RemoteProcessor::new(client, EngineConfig::default());

        let result = processor
            .run(&remote_def("List the action items"), &test_ctx(), deadline())
            .await;

        let output = result.output.unwrap();
        assert!(output.starts_with("List the action items"));
        assert!(output.contains("Transcript:\nWe agreed on the budget."));
        assert_eq!(result.tokens_used, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_output_is_nonempty_for_empty_transcript() {
        let client = Arc::new(FailingClient::new(CompletionError::Network("down".into())));
        let processor = RemoteProcessor::new(client, EngineConfig::default());
        let ctx = ActionContext::from_transcript("", "empty.wav");

        let result = processor.run(&remote_def("Summarize"), &ctx, deadline()).await;

        assert!(result.success);
        assert_eq!(result.output.as_deref(), Some("Summarize"));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_client_times_out_and_degrades() {
        let processor = RemoteProcessor::new(Arc::new(HangingClient), EngineConfig::default());

        let result = processor
            .run(&remote_def("Summarize"), &test_ctx(), Duration::from_secs(10))
            .await;

        assert!(result.success);
        assert!(result.used_fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_exhausted_mid_retry_stops_retrying() {
        let client = Arc::new(FailingClient::new(CompletionError::ApiError {
            status_code: 503,
            message: "overloaded".into(),
        }));
        let mut config = EngineConfig::default();
        // Backoff longer than the whole deadline: only one attempt fits.
        config.retry.base_delay_ms = 10_000;
        config.retry.max_delay_ms = 10_000;
        let processor = RemoteProcessor::new(client.clone(), config);

        let result = processor
            .run(&remote_def("Summarize"), &test_ctx(), Duration::from_secs(5))
            .await;

        assert!(result.success);
        assert!(result.used_fallback);
        assert!(client.calls() <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_prompt_makes_fallback_catastrophic() {
        let client = Arc::new(FailingClient::new(CompletionError::Network("down".into())));
        let processor = RemoteProcessor::new(client, EngineConfig::default());

        // An unterminated placeholder breaks the fallback render too.
        let result = processor
            .run(&remote_def("Summarize {{.Transcript"), &test_ctx(), deadline())
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("fallback rendering failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_attempt_budget_is_honored() {
        let client = Arc::new(FailingClient::new(CompletionError::RateLimited {
            retry_after_secs: 1,
        }));
        let mut config = EngineConfig::default();
        config.retry.max_attempts = 4;
        let processor = RemoteProcessor::new(client.clone(), config);

        let result = processor
            .run(&remote_def("Summarize"), &test_ctx(), deadline())
            .await;

        assert!(result.used_fallback);
        assert_eq!(client.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn template_definition_is_rejected() {
        let processor =
            RemoteProcessor::new(Arc::new(SuccessClient::new("ok", 1)), EngineConfig::default());
        let def = ActionDefinition {
            id: "t-1".into(),
            name: "Plain".into(),
            description: None,
            kind: ActionKind::Template {
                template: "{{.Transcript}}".into(),
            },
        };

        let result = processor.run(&def, &test_ctx(), deadline()).await;
        assert!(!result.success);
    }
}
