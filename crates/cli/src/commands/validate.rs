//! `scribeact validate` — check an action definition file.

use anyhow::bail;
use std::path::PathBuf;

use scribeact_core::validate;

pub fn run(config_path: Option<PathBuf>, action_path: PathBuf) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let draft = super::load_draft(&action_path)?;

    let violations = validate(&draft, &config.validation_limits());
    if violations.is_empty() {
        println!("OK: {}", action_path.display());
        return Ok(());
    }

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
