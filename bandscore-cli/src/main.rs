//! Bandscore CLI: score IELTS responses from the terminal.
//!
//! Reads a learner response from a file or stdin, runs it through the
//! scoring pipeline and prints the canonical record as JSON.

mod commands;

use bandscore_core::Skill;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Bandscore: level-calibrated AI scoring for IELTS writing and speaking
#[derive(Parser, Debug)]
#[command(name = "bandscore", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (searched for .bandscore/config.toml)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path (replaces user and workspace config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options describing the submission, shared by `score` and `prompt`.
#[derive(clap::Args, Debug, Clone)]
struct SubmissionArgs {
    /// Read the response from this file instead of stdin
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Skill being assessed: writing or speaking
    #[arg(short, long, default_value = "writing")]
    skill: Skill,

    /// CEFR level of the learner (A1-C2); unknown labels fall back to B1
    #[arg(short, long)]
    level: Option<String>,

    /// Task label shown to the examiner, e.g. "Task 1" or "Part 2"
    #[arg(short, long)]
    task_type: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Score a response with the configured model
    Score {
        #[command(flatten)]
        submission: SubmissionArgs,

        /// Model to use for this request only
        #[arg(short, long)]
        model: Option<String>,

        /// Produce a placeholder score without contacting any model
        #[arg(long)]
        offline: bool,
    },
    /// Print the scoring prompt without sending it
    Prompt {
        #[command(flatten)]
        submission: SubmissionArgs,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default workspace configuration file
    Init,
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = bandscore_core::config::log_dir().unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "bandscore.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.config.as_deref()).await
}
