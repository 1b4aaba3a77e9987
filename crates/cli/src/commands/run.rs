//! `scribeact run` — process an action end to end.

use anyhow::bail;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use scribeact_client::OpenAiCompletionClient;
use scribeact_engine::ActionService;

pub async fn run(
    config_path: Option<PathBuf>,
    action_path: PathBuf,
    transcript_path: PathBuf,
    filename: Option<String>,
    duration: Option<f64>,
) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let draft = super::load_draft(&action_path)?;

    let def = match draft.into_definition(&config.validation_limits()) {
        Ok(def) => def,
        Err(violations) => {
            eprintln!(
                "{}: {} violation(s)",
                action_path.display(),
                violations.len()
            );
            for violation in &violations {
                eprintln!("  - {violation}");
            }
            bail!("action definition is invalid");
        }
    };

    if !config.has_api_key() {
        warn!("no API key configured; remote-completion actions will fall back");
    }

    let mut ctx = super::load_context(&transcript_path, filename)?;
    if let Some(seconds) = duration {
        ctx.duration_seconds = seconds;
    }

    let client = OpenAiCompletionClient::from_config(&config)
        .map_err(|e| anyhow::anyhow!("building completion client: {e}"))?;
    let service = ActionService::new(Arc::new(client), config);

    let result = service.process(&def, &ctx).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        bail!("action failed");
    }
    Ok(())
}
