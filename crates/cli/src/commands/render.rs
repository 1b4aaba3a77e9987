//! `scribeact render` — evaluate a template locally, no network.

use anyhow::Context;
use std::path::PathBuf;

pub fn run(
    template: String,
    from_file: bool,
    transcript_path: PathBuf,
    filename: Option<String>,
) -> anyhow::Result<()> {
    let template = if from_file {
        std::fs::read_to_string(&template)
            .with_context(|| format!("reading template file {template}"))?
    } else {
        template
    };

    let ctx = super::load_context(&transcript_path, filename)?;
    let output = scribeact_template::render(&template, &ctx)
        .map_err(|e| anyhow::anyhow!("template rendering failed: {e}"))?;

    println!("{output}");
    Ok(())
}
