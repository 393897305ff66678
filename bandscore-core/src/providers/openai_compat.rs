//! OpenAI-compatible LLM provider.
//!
//! Supports OpenAI, Azure OpenAI, Ollama, vLLM, LM Studio, and any
//! endpoint that follows the OpenAI chat completions API format.

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::types::{
    CompletionRequest, CompletionResponse, Message, ResponseFormat, Role, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

/// Models known not to accept `response_format: json_schema`.
fn lacks_structured_output(model: &str) -> bool {
    model.starts_with("gpt-3.5")
        || model.starts_with("gpt-4-")
        || model == "gpt-4"
        || model.starts_with("llama2")
        || model.starts_with("mistral:")
}

/// OpenAI-compatible LLM provider.
pub struct OpenAiCompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
    model: String,
    structured_output: bool,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider from configuration.
    ///
    /// Reads the API key from `config.api_key`, then from the environment
    /// variable named in `config.api_key_env`. A missing key is not an error
    /// here; the invoker checks `has_credentials` before any request.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let is_local = config.provider == "local";

        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var(&config.api_key_env)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
            .or_else(|| {
                if is_local {
                    // Local servers (Ollama, vLLM, LM Studio) don't check the bearer token
                    debug!("No API key set for local provider; using placeholder bearer token");
                    Some("local".to_string())
                } else {
                    None
                }
            });

        Self::build(config, api_key)
    }

    /// Create a new provider with an explicitly provided API key.
    pub fn new_with_key(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        Self::build(config, Some(api_key))
    }

    fn build(config: &LlmConfig, api_key: Option<String>) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::Connection {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            api_key_env: config.api_key_env.clone(),
            model: config.model.clone(),
            structured_output: config.structured_output && !lacks_structured_output(&config.model),
        })
    }

    /// Convert internal messages to OpenAI JSON format.
    fn messages_to_json(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                };
                json!({
                    "role": role,
                    "content": msg.content,
                })
            })
            .collect()
    }

    /// Convert a response format to the `response_format` request field.
    fn response_format_to_json(format: &ResponseFormat) -> Value {
        match format {
            ResponseFormat::JsonObject => json!({ "type": "json_object" }),
            ResponseFormat::JsonSchema {
                name,
                schema,
                strict,
            } => json!({
                "type": "json_schema",
                "json_schema": {
                    "name": name,
                    "schema": schema,
                    "strict": strict,
                }
            }),
        }
    }

    /// Build the request body for a completion.
    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": request.model.as_deref().unwrap_or(&self.model),
            "messages": Self::messages_to_json(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(format) = &request.response_format {
            body["response_format"] = Self::response_format_to_json(format);
        }
        body
    }

    /// Parse an OpenAI-format response body into a CompletionResponse.
    fn parse_response(body: &Value, model: &str) -> Result<CompletionResponse, LlmError> {
        let choice =
            body.get("choices")
                .and_then(|c| c.get(0))
                .ok_or_else(|| LlmError::ResponseParse {
                    message: "No choices in response".to_string(),
                })?;

        let message = choice
            .get("message")
            .ok_or_else(|| LlmError::ResponseParse {
                message: "No message in choice".to_string(),
            })?;

        if let Some(refusal) = message.get("refusal").and_then(|r| r.as_str()) {
            return Err(LlmError::ResponseParse {
                message: format!("Model refused: {}", refusal),
            });
        }

        let text = message
            .get("content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| LlmError::ResponseParse {
                message: "No text content in message".to_string(),
            })?
            .to_string();

        let finish_reason = choice
            .get("finish_reason")
            .and_then(|f| f.as_str())
            .map(|s| s.to_string());

        let usage_obj = body.get("usage");
        let usage = TokenUsage {
            input_tokens: usage_obj
                .and_then(|u| u.get("prompt_tokens"))
                .and_then(|t| t.as_u64())
                .unwrap_or(0) as usize,
            output_tokens: usage_obj
                .and_then(|u| u.get("completion_tokens"))
                .and_then(|t| t.as_u64())
                .unwrap_or(0) as usize,
        };

        let resp_model = body
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(model)
            .to_string();

        Ok(CompletionResponse {
            text,
            usage,
            model: resp_model,
            finish_reason,
        })
    }

    /// Map an HTTP status code to the appropriate LlmError.
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        let api_message = serde_json::from_str::<Value>(body).ok().and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(|s| s.to_string())
        });

        match status.as_u16() {
            401 | 403 => {
                debug!(body = %body, "Authentication failed ({})", status);
                LlmError::AuthFailed {
                    provider: "OpenAI-compatible".to_string(),
                }
            }
            429 => {
                // "Rate limit reached ... Please try again in 7s."
                let retry_secs = api_message
                    .as_deref()
                    .and_then(|msg| msg.split("in ").last())
                    .and_then(|s| {
                        s.trim_end_matches('.')
                            .trim_end_matches('s')
                            .parse::<u64>()
                            .ok()
                    })
                    .unwrap_or(5);
                LlmError::RateLimited {
                    retry_after_secs: retry_secs,
                }
            }
            code @ (400 | 422) => {
                let message = api_message.unwrap_or_else(|| body.to_string());
                let lowered = message.to_lowercase();
                if lowered.contains("response_format")
                    || lowered.contains("json_schema")
                    || lowered.contains("structured output")
                {
                    LlmError::UnsupportedFeature {
                        feature: "response_format".to_string(),
                        message,
                    }
                } else {
                    LlmError::Rejected {
                        status: code,
                        message,
                    }
                }
            }
            code if code >= 500 => LlmError::ApiRequest {
                message: format!("Server error ({}): {}", status, body),
            },
            code => LlmError::Rejected {
                status: code,
                message: api_message.unwrap_or_else(|| body.to_string()),
            },
        }
    }

    /// Classify a transport-level failure.
    fn map_transport_error(err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout { timeout_secs: 10 }
        } else if err.is_connect() {
            LlmError::Connection {
                message: format!("Connection failed: {}", err),
            }
        } else {
            LlmError::ApiRequest {
                message: format!("Request failed: {}", err),
            }
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| LlmError::AuthFailed {
            provider: format!("OpenAI-compatible: env var '{}' not set", self.api_key_env),
        })?;
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        debug!(
            url = %url,
            model = %body["model"],
            structured = request.response_format.is_some(),
            "Sending OpenAI completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| LlmError::ApiRequest {
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON: {}", e),
            })?;

        Self::parse_response(&json, &self.model)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn credential_source(&self) -> &str {
        &self.api_key_env
    }

    fn supports_structured_output(&self) -> bool {
        self.structured_output
    }
}
