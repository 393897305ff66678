//! # Bandscore Core
//!
//! Scoring pipeline for IELTS writing and speaking responses.
//! Builds level-calibrated prompts, invokes an OpenAI-compatible model
//! under a bounded wait, and validates the untrusted reply into a
//! canonical score record.

pub mod brain;
pub mod calibration;
pub mod config;
pub mod error;
pub mod fallback;
pub mod invoker;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod score;
pub mod types;
pub mod validator;

// Re-export commonly used types at the crate root.
pub use brain::{LlmProvider, MockLlmProvider};
pub use config::{LlmConfig, ScoringConfig, ScoringDefaults};
pub use error::{ConfigError, LlmError, ScoringError, ScoringFailure};
pub use invoker::{Invocation, ModelInvoker};
pub use pipeline::ScoringPipeline;
pub use prompt::{PROMPT_VERSION, PromptBuilder};
pub use score::{
    CanonicalScoreRecord, Criterion, DEFAULT_LEVEL, ProficiencyLevel, ScoreRequest, ScoreSource,
    ScoringMetadata, ScoringOutcome, Skill, ValidatedScore,
};
pub use types::{CompletionRequest, CompletionResponse, Message, ResponseFormat, Role, TokenUsage};
