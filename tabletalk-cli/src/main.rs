//! Tabletalk CLI — chat with a CSV file in the terminal.
//!
//! Loads a table, runs the Gemini analysis, and drops into an interactive
//! REPL for follow-up questions, spoken replies, and PDF export.

mod render;
mod repl;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tabletalk_core::{load_config, Session};

/// Tabletalk: conversational analysis for tabular data
#[derive(Parser, Debug)]
#[command(name = "tabletalk", version, about, long_about = None)]
struct Cli {
    /// CSV file to load (the REPL can also load one with /load)
    file: Option<PathBuf>,

    /// Gemini model to use for analysis and chat
    #[arg(short, long)]
    model: Option<String>,

    /// Voice name for speech synthesis
    #[arg(long)]
    voice: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Export a PDF report to this path and exit (requires a file)
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let mut config = load_config(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // Apply CLI overrides
    if let Some(model) = &cli.model {
        config.gemini.model = model.clone();
    }
    if let Some(voice) = &cli.voice {
        config.gemini.voice = voice.clone();
    }

    let mut session =
        Session::new(config).map_err(|e| anyhow::anyhow!("Failed to start session: {}", e))?;

    if let Some(path) = &cli.file {
        println!("Loading {}...", path.display());
        session
            .load_file(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load file: {}", e))?;
        if !cli.quiet {
            let rows = session.table().map(|t| t.row_count());
            if let Some(analysis) = session.analysis() {
                render::print_analysis(analysis, rows);
            }
        }
    }

    // One-shot report mode: export and exit without entering the REPL.
    if let Some(report_path) = &cli.report {
        if cli.file.is_none() {
            anyhow::bail!("--report requires a CSV file argument");
        }
        let written = session
            .export_report(Some(report_path))
            .map_err(|e| anyhow::anyhow!("Export failed: {}", e))?;
        println!("Report written to {}", written.display());
        return Ok(());
    }

    repl::run(session).await
}
