//! Configuration system for Bandscore.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/bandscore/config.toml` and/or
//! `.bandscore/config.toml` in the workspace directory.

use crate::error::ConfigError;
use crate::score::{DEFAULT_TASK_TYPE, ProficiencyLevel};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub scoring: ScoringDefaults,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name. Only OpenAI-compatible endpoints are supported:
    /// "openai", "azure", "local". A "local" provider runs without an API key.
    pub provider: String,
    /// Model identifier (e.g., "gpt-4o-mini").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Inline API key. Takes precedence over `api_key_env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Optional base URL override for the API endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Upper bound on generated tokens per scoring reply.
    pub max_tokens: usize,
    /// Sampling temperature; kept low for repeatable grading.
    pub temperature: f32,
    /// Wall-clock budget for one scoring invocation, both attempts included.
    pub timeout_secs: u64,
    /// Whether to request schema-constrained output first.
    pub structured_output: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: 900,
            temperature: 0.2,
            timeout_secs: 25,
            structured_output: true,
        }
    }
}

impl LlmConfig {
    /// The invocation timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate this LLM config and return any warnings.
    ///
    /// Returns an empty Vec if the config is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.temperature < 0.0 || self.temperature > 1.0 {
            warnings.push(format!(
                "temperature ({}) is outside 0.0-1.0; grading may be inconsistent",
                self.temperature
            ));
        }
        if self.timeout_secs == 0 {
            warnings.push("timeout_secs is 0; every invocation will time out".to_string());
        }
        if self.max_tokens < 300 {
            warnings.push(format!(
                "max_tokens ({}) is low; replies with eight comments may be truncated",
                self.max_tokens
            ));
        }
        if !matches!(self.provider.as_str(), "openai" | "azure" | "local") {
            warnings.push(format!(
                "provider '{}' is treated as OpenAI-compatible",
                self.provider
            ));
        }
        warnings
    }
}

/// Defaults applied to requests that omit optional fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringDefaults {
    pub default_level: ProficiencyLevel,
    pub default_task_type: String,
}

impl Default for ScoringDefaults {
    fn default() -> Self {
        Self {
            default_level: ProficiencyLevel::B1,
            default_task_type: DEFAULT_TASK_TYPE.to_string(),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "bandscore", "bandscore")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `BANDSCORE_`)
/// 3. Workspace-local config (`.bandscore/config.toml`)
/// 4. User config (`~/.config/bandscore/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&ScoringConfig>,
) -> Result<ScoringConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(ScoringConfig::default()));

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".bandscore").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // BANDSCORE_LLM__MODEL, BANDSCORE_LLM__TIMEOUT_SECS, ...
    figment = figment.merge(Env::prefixed("BANDSCORE_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    Ok(figment.extract()?)
}

/// Load configuration from one explicit file, still honouring environment
/// variables.
pub fn load_config_file(path: &Path) -> Result<ScoringConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let config: ScoringConfig = Figment::from(Serialized::defaults(ScoringConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BANDSCORE_").split("__"))
        .extract()?;
    Ok(config)
}

/// Render a configuration as TOML, for `config show`.
pub fn to_toml(config: &ScoringConfig) -> Result<String, ConfigError> {
    toml::to_string_pretty(config).map_err(|e| ConfigError::Invalid {
        message: e.to_string(),
    })
}

/// Path of the daily-rolled log directory.
pub fn log_dir() -> Option<std::path::PathBuf> {
    project_dirs().map(|d| d.data_dir().join("logs"))
}
