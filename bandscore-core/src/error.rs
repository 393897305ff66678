//! Error types for the Bandscore core library.
//!
//! Uses `thiserror` for the provider, configuration and scoring domains.
//! `ScoringError` is the only error the pipeline hands back to callers: it
//! pairs an HTTP status hint and a user-safe message with the detailed cause,
//! which is meant for logs only.

use std::path::PathBuf;

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("Request rejected by provider (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Provider does not support {feature}: {message}")]
    UnsupportedFeature { feature: String, message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

impl LlmError {
    /// Whether the provider refused the *shape* of the request rather than
    /// failing to serve it. Only these errors justify a retry with a simpler
    /// request.
    pub fn is_capability_rejection(&self) -> bool {
        match self {
            LlmError::UnsupportedFeature { .. } => true,
            LlmError::Rejected { status, .. } => matches!(status, 400 | 422),
            _ => false,
        }
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::ParseError {
            message: err.to_string(),
        }
    }
}

/// Detailed cause of a scoring failure. Never shown to end users.
#[derive(Debug, thiserror::Error)]
pub enum ScoringFailure {
    #[error("Invalid scoring request: {message}")]
    InvalidRequest { message: String },

    #[error("No API credential configured (env var '{env_var}')")]
    NotConfigured { env_var: String },

    #[error("Model invocation exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Provider error: {0}")]
    Provider(#[from] LlmError),

    #[error("Model output is not a JSON object: {message}")]
    MalformedResponse { message: String },

    #[error("Score failed schema validation: {}", violations.join("; "))]
    SchemaViolation { violations: Vec<String> },
}

pub const MSG_INVALID_REQUEST: &str = "Response text is required.";
pub const MSG_NOT_CONFIGURED: &str = "AI scoring not configured";
pub const MSG_TIMEOUT: &str = "AI scoring timed out, please try again.";
pub const MSG_PROVIDER_FAILED: &str = "AI scoring failed, please try again.";
pub const MSG_INVALID_RESPONSE: &str = "AI returned an invalid response. Please try again.";
pub const MSG_INVALID_FORMAT: &str = "AI returned an invalid score format. Please try again.";

/// A scoring failure as seen by the caller.
///
/// `http_status` is meant to be forwarded verbatim by the HTTP layer and
/// `public_message` is the only text safe to display.
#[derive(Debug, thiserror::Error)]
#[error("{public_message} (HTTP {http_status})")]
pub struct ScoringError {
    pub http_status: u16,
    pub public_message: String,
    #[source]
    pub cause: ScoringFailure,
}

impl ScoringError {
    fn new(http_status: u16, public_message: &str, cause: ScoringFailure) -> Self {
        Self {
            http_status,
            public_message: public_message.to_string(),
            cause,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(
            400,
            MSG_INVALID_REQUEST,
            ScoringFailure::InvalidRequest {
                message: message.into(),
            },
        )
    }

    pub fn not_configured(env_var: impl Into<String>) -> Self {
        Self::new(
            503,
            MSG_NOT_CONFIGURED,
            ScoringFailure::NotConfigured {
                env_var: env_var.into(),
            },
        )
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self::new(504, MSG_TIMEOUT, ScoringFailure::Timeout { timeout_ms })
    }

    /// Classify a provider error. Provider-side timeouts keep their 504.
    pub fn provider(err: LlmError) -> Self {
        if let LlmError::Timeout { timeout_secs } = err {
            return Self::timeout(timeout_secs.saturating_mul(1000));
        }
        Self::new(502, MSG_PROVIDER_FAILED, ScoringFailure::Provider(err))
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(
            502,
            MSG_INVALID_RESPONSE,
            ScoringFailure::MalformedResponse {
                message: message.into(),
            },
        )
    }

    pub fn schema_violation(violations: Vec<String>) -> Self {
        Self::new(
            502,
            MSG_INVALID_FORMAT,
            ScoringFailure::SchemaViolation { violations },
        )
    }
}
