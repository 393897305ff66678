//! Scoring pipeline: prompt, invoke, validate.
//!
//! Each call is independent. The only shared state is the static
//! calibration table and the provider's HTTP client pool.

use crate::brain::LlmProvider;
use crate::config::ScoringConfig;
use crate::error::{LlmError, ScoringError};
use crate::invoker::ModelInvoker;
use crate::prompt::{PROMPT_VERSION, PromptBuilder};
use crate::providers::create_provider;
use crate::score::{ScoreRequest, ScoreSource, ScoringMetadata, ScoringOutcome};
use crate::validator;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Orchestrates one scoring request end to end.
pub struct ScoringPipeline {
    builder: PromptBuilder,
    invoker: ModelInvoker,
}

impl ScoringPipeline {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &ScoringConfig) -> Self {
        Self {
            builder: PromptBuilder::new(),
            invoker: ModelInvoker::new(provider, &config.llm),
        }
    }

    /// Build the provider from configuration and wrap it in a pipeline.
    pub fn from_config(config: &ScoringConfig) -> Result<Self, LlmError> {
        for warning in config.llm.validate() {
            warn!(%warning, "LLM configuration warning");
        }
        let provider = create_provider(&config.llm)?;
        Ok(Self::new(provider, config))
    }

    pub fn invoker(&self) -> &ModelInvoker {
        &self.invoker
    }

    /// Score one submission.
    ///
    /// Blank text is rejected with 400 before the prompt is built. Every
    /// other failure comes from the invoker (503, 504, 502) or the
    /// validator (502); no default score is ever substituted.
    pub async fn score(&self, request: &ScoreRequest) -> Result<ScoringOutcome, ScoringError> {
        if request.raw_text.trim().is_empty() {
            return Err(ScoringError::invalid_request("rawText is empty"));
        }

        let started = Instant::now();
        let prompt = self.builder.build(request);
        debug!(
            skill = %request.skill,
            level = request.proficiency_level.as_str(),
            prompt_chars = prompt.len(),
            "Built scoring prompt"
        );

        let result = async {
            let invocation = self
                .invoker
                .invoke(&prompt, request.skill, request.model_override.as_deref())
                .await?;
            let record = validator::normalize(&invocation.text, request.skill)?;
            Ok::<_, ScoringError>((invocation, record))
        }
        .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok((invocation, record)) => {
                info!(
                    skill = %request.skill,
                    model = %invocation.model,
                    structured = invocation.structured,
                    overall = record.overall,
                    tokens = invocation.usage.total(),
                    latency_ms,
                    "Scored submission"
                );
                Ok(ScoringOutcome {
                    record,
                    metadata: ScoringMetadata {
                        source: ScoreSource::Ai,
                        model: invocation.model,
                        prompt_version: PROMPT_VERSION.to_string(),
                        latency_ms,
                        scored_at: Utc::now(),
                    },
                })
            }
            Err(err) => {
                warn!(
                    skill = %request.skill,
                    status = err.http_status,
                    cause = %err.cause,
                    latency_ms,
                    "Scoring failed"
                );
                Err(err)
            }
        }
    }
}
