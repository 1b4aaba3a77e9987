//! The public entry point: dispatch an action by kind and stamp metadata.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use scribeact_config::EngineConfig;
use scribeact_core::{
    ActionContext, ActionDefinition, ActionDraft, ActionKind, ActionResult, CompletionClient,
};

use crate::processor::RemoteProcessor;

/// The action processing service.
///
/// Constructed with a completion client and an explicit configuration value;
/// two services with different defaults can coexist in one process. Holds no
/// per-call state, so one instance can serve concurrent invocations.
pub struct ActionService {
    config: EngineConfig,
    processor: RemoteProcessor,
}

impl ActionService {
    pub fn new(client: Arc<dyn CompletionClient>, config: EngineConfig) -> Self {
        let processor = RemoteProcessor::new(client, config.clone());
        Self { config, processor }
    }

    /// Validate a user-authored draft against this service's limits.
    pub fn validate(&self, draft: &ActionDraft) -> Vec<String> {
        scribeact_core::validate(draft, &self.config.validation_limits())
    }

    /// Process an action with the configured default deadline.
    pub async fn process(&self, def: &ActionDefinition, ctx: &ActionContext) -> ActionResult {
        self.process_with_deadline(def, ctx, Duration::from_secs(self.config.deadline_secs))
            .await
    }

    /// Process an action, bounding the remote path (retries included) by
    /// `deadline`. Every branch returns a stamped, well-formed result.
    pub async fn process_with_deadline(
        &self,
        def: &ActionDefinition,
        ctx: &ActionContext,
        deadline: Duration,
    ) -> ActionResult {
        let started = std::time::Instant::now();
        debug!(action = %def.name, kind = def.kind.as_str(), "processing action");

        let mut result = match &def.kind {
            ActionKind::Template { template } => match scribeact_template::render(template, ctx) {
                Ok(output) => ActionResult::success(def, output),
                // Deterministic input: retrying a broken template cannot help.
                Err(e) => ActionResult::failure(def, format!("template rendering failed: {e}")),
            },
            ActionKind::RemoteCompletion { .. } => self.processor.run(def, ctx, deadline).await,
        };

        result.processed_at = Utc::now();
        result.duration_ms = started.elapsed().as_millis() as u64;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scribeact_core::{CompletionError, CompletionRequest, CompletionResponse};

    struct StaticClient {
        reply: Result<CompletionResponse, CompletionError>,
    }

    #[async_trait]
    impl CompletionClient for StaticClient {
        fn name(&self) -> &str {
            "static"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, CompletionError> {
            self.reply.clone()
        }
    }

    fn service_with(reply: Result<CompletionResponse, CompletionError>) -> ActionService {
        ActionService::new(Arc::new(StaticClient { reply }), EngineConfig::default())
    }

    fn template_def(template: &str) -> ActionDefinition {
        ActionDefinition {
            id: "t-1".into(),
            name: "Summary".into(),
            description: None,
            kind: ActionKind::Template {
                template: template.into(),
            },
        }
    }

    fn remote_def(prompt: &str) -> ActionDefinition {
        ActionDefinition {
            id: "r-1".into(),
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

    fn ok_reply(output: &str, tokens: u32) -> Result<CompletionResponse, CompletionError> {
        Ok(CompletionResponse {
            output: output.into(),
            tokens_used: Some(tokens),
            model: "gpt-3.5-turbo".into(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn template_happy_path() {
        let service = service_with(ok_reply("unused", 0));
        let mut ctx = ActionContext::from_transcript("hello world", "call.mp3");
        ctx.word_count = 120;

        let def = template_def("Summary for {{.Filename}}: {{.WordCount}} words");
        let result = service.process(&def, &ctx).await;

        assert!(result.success);
        assert_eq!(result.output.as_deref(), Some("Summary for call.mp3: 120 words"));
        assert_eq!(result.model, "");
        assert_eq!(result.tokens_used, 0);
        assert!(!result.used_fallback);
        assert_eq!(result.action_kind, "template");
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_template_is_a_caller_bug_not_a_retry() {
        let service = service_with(ok_reply("unused", 0));
        let ctx = ActionContext::from_transcript("hello", "a.mp3");

        let result = service.process(&template_def("broken {{.Transcript"), &ctx).await;

        assert!(!result.success);
        assert!(result.output.is_none());
        assert!(result.error.unwrap().contains("template rendering failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_happy_path_reports_usage() {
        let service = service_with(ok_reply("Key decisions: budget approved", 256));
        let ctx = ActionContext::from_transcript("budget talk", "call.mp3");

        let result = service.process(&remote_def("Extract key decisions"), &ctx).await;

        assert!(result.success);
        assert_eq!(result.output.as_deref(), Some("Key decisions: budget approved"));
        assert_eq!(result.tokens_used, 256);
        assert_eq!(result.model, "gpt-3.5-turbo");
        assert!(!result.used_fallback);
        assert_eq!(result.action_kind, "remote-completion");
    }

    #[tokio::test(start_paused = true)]
    async fn remote_failure_surfaces_as_degraded_success() {
        let service = service_with(Err(CompletionError::AuthenticationFailed("bad key".into())));
        let ctx = ActionContext::from_transcript("budget talk", "call.mp3");

        let result = service.process(&remote_def("Summarize"), &ctx).await;

        assert!(result.success);
        assert!(result.used_fallback);
        assert!(result.error.is_none());
        assert!(result.output.unwrap().starts_with("Summarize"));
    }

    #[tokio::test(start_paused = true)]
    async fn every_branch_stamps_metadata() {
        let service = service_with(ok_reply("ok", 1));
        let ctx = ActionContext::from_transcript("x", "a.mp3");

        let before = Utc::now();
        let result = service.process(&template_def("{{.Transcript}}"), &ctx).await;
        assert!(result.processed_at >= before);
        assert_eq!(result.action_name, "Summary");

        let result = service.process(&remote_def("Summarize"), &ctx).await;
        assert!(result.processed_at >= before);
    }

    #[tokio::test(start_paused = true)]
    async fn validate_uses_configured_allow_list() {
        let mut config = EngineConfig::default();
        config.allowed_models = vec!["gpt-4o".into()];
        config.default_model = "gpt-4o".into();
        let service = ActionService::new(
            Arc::new(StaticClient {
                reply: ok_reply("ok", 1),
            }),
            config,
        );

        let draft = ActionDraft {
            name: Some("Summary".into()),
            kind: Some("remote-completion".into()),
            prompt: Some("Summarize".into()),
            model: Some("gpt-3.5-turbo".into()),
            ..Default::default()
        };
        let violations = service.validate(&draft);
        assert!(violations.iter().any(|v| v.contains("model not allowed")));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_invocations_share_one_service() {
        let service = Arc::new(service_with(ok_reply("ok", 1)));
        let ctx = ActionContext::from_transcript("shared transcript", "a.mp3");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                service.process(&remote_def("Summarize"), &ctx).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().success);
        }
    }
}
