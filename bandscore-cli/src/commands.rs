//! Subcommand handlers.

use crate::{Commands, ConfigAction, SubmissionArgs};
use bandscore_core::config::{self, ScoringConfig};
use bandscore_core::fallback::placeholder_record;
use bandscore_core::{
    PROMPT_VERSION, PromptBuilder, ProficiencyLevel, ScoreRequest, ScoreSource, ScoringError,
    ScoringMetadata, ScoringOutcome, ScoringPipeline,
};
use serde_json::{Value, json};
use std::path::Path;
use tokio::io::AsyncReadExt;

pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Score {
            submission,
            model,
            offline,
        } => {
            let config = load(workspace, config_path)?;
            let text = read_submission(&submission).await?;
            let request = build_request(&submission, text, &config, model);
            match score_submission(&request, &config, offline).await {
                Ok(outcome) => {
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                    Ok(())
                }
                Err(err) => {
                    println!("{}", serde_json::to_string_pretty(&error_body(&err))?);
                    Err(anyhow::anyhow!(err))
                }
            }
        }
        Commands::Prompt { submission } => {
            let config = load(workspace, config_path)?;
            let text = read_submission(&submission).await?;
            let request = build_request(&submission, text, &config, None);
            println!("{}", PromptBuilder::new().build(&request));
            Ok(())
        }
        Commands::Config { action } => handle_config(action, workspace, config_path),
    }
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".bandscore");
            std::fs::create_dir_all(&config_dir)?;

            let path = config_dir.join("config.toml");
            if path.exists() {
                println!("Configuration file already exists at: {}", path.display());
                return Ok(());
            }

            std::fs::write(&path, config::to_toml(&ScoringConfig::default())?)?;
            println!("Created default configuration at: {}", path.display());
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace, config_path)?;
            for warning in config.llm.validate() {
                eprintln!("warning: {warning}");
            }
            println!("{}", config::to_toml(&config)?);
            Ok(())
        }
    }
}

fn load(workspace: &Path, config_path: Option<&Path>) -> anyhow::Result<ScoringConfig> {
    let config = match config_path {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Some(workspace), None),
    };
    config.map_err(|e| anyhow::anyhow!("Configuration error: {}", e))
}

async fn read_submission(args: &SubmissionArgs) -> anyhow::Result<String> {
    match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e)),
        None => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            Ok(text)
        }
    }
}

fn build_request(
    args: &SubmissionArgs,
    text: String,
    config: &ScoringConfig,
    model: Option<String>,
) -> ScoreRequest {
    let level = args
        .level
        .as_deref()
        .map(ProficiencyLevel::parse_or_default)
        .unwrap_or(config.scoring.default_level);
    let task_type = args
        .task_type
        .clone()
        .unwrap_or_else(|| config.scoring.default_task_type.clone());

    let request = ScoreRequest::new(text, args.skill)
        .with_level(level)
        .with_task_type(task_type);
    match model {
        Some(model) => request.with_model_override(model),
        None => request,
    }
}

/// Score one request, either through the model or with an offline
/// placeholder.
async fn score_submission(
    request: &ScoreRequest,
    config: &ScoringConfig,
    offline: bool,
) -> Result<ScoringOutcome, ScoringError> {
    if !offline {
        let pipeline = ScoringPipeline::from_config(config).map_err(ScoringError::provider)?;
        return pipeline.score(request).await;
    }

    if request.raw_text.trim().is_empty() {
        return Err(ScoringError::invalid_request("rawText is empty"));
    }
    tracing::info!(skill = %request.skill, "Producing offline placeholder score");
    Ok(ScoringOutcome {
        record: placeholder_record(request),
        metadata: ScoringMetadata {
            source: ScoreSource::Fallback,
            model: "offline".to_string(),
            prompt_version: PROMPT_VERSION.to_string(),
            latency_ms: 0,
            scored_at: chrono::Utc::now(),
        },
    })
}

/// The `{status, error}` body printed for a failed score.
fn error_body(err: &ScoringError) -> Value {
    json!({
        "status": err.http_status,
        "error": err.public_message,
    })
}
