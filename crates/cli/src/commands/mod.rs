//! CLI command implementations.

pub mod render;
pub mod run;
pub mod validate;

use anyhow::Context;
use std::path::{Path, PathBuf};

use scribeact_config::EngineConfig;
use scribeact_core::{ActionContext, ActionDraft};

/// Load the engine configuration, honoring an explicit `--config` path.
pub fn load_config(path: Option<PathBuf>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load_from(&path)?,
        None => EngineConfig::load()?,
    };
    Ok(config)
}

/// Load an action draft from a TOML or JSON file, by extension.
pub fn load_draft(path: &Path) -> anyhow::Result<ActionDraft> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading action file {}", path.display()))?;

    let draft = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("parsing JSON action file {}", path.display()))?,
        _ => toml::from_str(&content)
            .with_context(|| format!("parsing TOML action file {}", path.display()))?,
    };
    Ok(draft)
}

/// Build an action context from a transcript file.
pub fn load_context(
    transcript_path: &Path,
    filename_override: Option<String>,
) -> anyhow::Result<ActionContext> {
    let transcript = std::fs::read_to_string(transcript_path)
        .with_context(|| format!("reading transcript {}", transcript_path.display()))?;

    let filename = filename_override.unwrap_or_else(|| {
        transcript_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let file_type = Path::new(&filename)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ActionContext::from_transcript(transcript, filename).with_file_type(file_type))
}
