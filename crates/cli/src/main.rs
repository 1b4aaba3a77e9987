//! Scribeact CLI — the main entry point.
//!
//! Commands:
//! - `validate` — Check an action definition file, print violations
//! - `render`   — Evaluate a template against a transcript locally
//! - `run`      — Run an action end to end (remote completion + fallback)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "scribeact",
    about = "Scribeact — post-transcription action engine",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file (default: ./scribeact.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an action definition file (TOML or JSON)
    Validate {
        /// Path to the action definition
        action: PathBuf,
    },

    /// Render a template against a transcript without any network call
    Render {
        /// The template string, or a path when --from-file is set
        template: String,

        /// Treat TEMPLATE as a file path
        #[arg(long)]
        from_file: bool,

        /// Path to the transcript text file
        #[arg(short, long)]
        transcript: PathBuf,

        /// Override the filename reported to the template
        #[arg(long)]
        filename: Option<String>,
    },

    /// Run an action end to end and print the result as JSON
    Run {
        /// Path to the action definition (TOML or JSON)
        #[arg(short, long)]
        action: PathBuf,

        /// Path to the transcript text file
        #[arg(short, long)]
        transcript: PathBuf,

        /// Override the filename reported to the action
        #[arg(long)]
        filename: Option<String>,

        /// Media duration in seconds
        #[arg(long)]
        duration: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Validate { action } => commands::validate::run(cli.config, action),
        Commands::Render {
            template,
            from_file,
            transcript,
            filename,
        } => commands::render::run(template, from_file, transcript, filename),
        Commands::Run {
            action,
            transcript,
            filename,
            duration,
        } => commands::run::run(cli.config, action, transcript, filename, duration).await,
    }
}
