//! Model invocation.
//!
//! Sends a scoring prompt to the provider under one wall-clock budget.
//! The first attempt pins the reply to the score JSON schema; if the
//! endpoint rejects that request shape, a single unconstrained attempt
//! follows and the prompt's own output contract carries the format.

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::{LlmError, ScoringError};
use crate::prompt::{SYSTEM_PROMPT, score_schema};
use crate::score::Skill;
use crate::types::{CompletionRequest, Message, ResponseFormat, TokenUsage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const SCHEMA_NAME: &str = "ielts_score";

/// Raw model output plus what produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub text: String,
    pub model: String,
    /// Whether the schema-constrained attempt produced this text.
    pub structured: bool,
    pub usage: TokenUsage,
}

/// Issues scoring requests against one provider.
pub struct ModelInvoker {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
    max_tokens: usize,
    temperature: f32,
}

impl ModelInvoker {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            provider,
            timeout: config.timeout(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Run the prompt and return the model's raw text.
    ///
    /// Fails with 503 before any request when no credential is configured,
    /// 504 when both attempts together exceed the timeout, and 502 for any
    /// other provider failure.
    pub async fn invoke(
        &self,
        prompt: &str,
        skill: Skill,
        model_override: Option<&str>,
    ) -> Result<Invocation, ScoringError> {
        if !self.provider.has_credentials() {
            warn!(
                credential = %self.provider.credential_source(),
                "AI scoring requested but no API credential is configured"
            );
            return Err(ScoringError::not_configured(
                self.provider.credential_source(),
            ));
        }

        // Dropping the attempt future on expiry aborts the in-flight request.
        match tokio::time::timeout(self.timeout, self.attempt(prompt, skill, model_override)).await
        {
            Ok(result) => result.map_err(|e| {
                warn!(error = %e, "Model invocation failed");
                ScoringError::provider(e)
            }),
            Err(_) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                warn!(timeout_ms, "Model invocation timed out");
                Err(ScoringError::timeout(timeout_ms))
            }
        }
    }

    async fn attempt(
        &self,
        prompt: &str,
        skill: Skill,
        model_override: Option<&str>,
    ) -> Result<Invocation, LlmError> {
        if self.provider.supports_structured_output() {
            let request = self.request(prompt, skill, model_override, true);
            match self.provider.complete(request).await {
                Ok(resp) => {
                    return Ok(Invocation {
                        text: resp.text,
                        model: resp.model,
                        structured: true,
                        usage: resp.usage,
                    });
                }
                Err(e) if e.is_capability_rejection() => {
                    warn!(
                        error = %e,
                        "Structured request rejected; retrying without response schema"
                    );
                }
                Err(e) => return Err(e),
            }
        } else {
            debug!("Provider lacks structured output; sending unconstrained request");
        }

        let request = self.request(prompt, skill, model_override, false);
        let resp = self.provider.complete(request).await?;
        Ok(Invocation {
            text: resp.text,
            model: resp.model,
            structured: false,
            usage: resp.usage,
        })
    }

    fn request(
        &self,
        prompt: &str,
        skill: Skill,
        model_override: Option<&str>,
        structured: bool,
    ) -> CompletionRequest {
        CompletionRequest {
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            model: model_override.map(str::to_string),
            response_format: structured.then(|| ResponseFormat::JsonSchema {
                name: SCHEMA_NAME.to_string(),
                schema: score_schema(skill),
                strict: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::types::Role;

    fn invoker(mock: &Arc<MockLlmProvider>) -> ModelInvoker {
        ModelInvoker::new(mock.clone(), &LlmConfig::default())
    }

    #[tokio::test]
    async fn test_missing_credentials_makes_no_call() {
        let mock = Arc::new(MockLlmProvider::without_credentials());
        let err = invoker(&mock)
            .invoke("prompt", Skill::Writing, None)
            .await
            .unwrap_err();
        assert_eq!(err.http_status, 503);
        assert_eq!(err.public_message, "AI scoring not configured");
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_structured_attempt_succeeds() {
        let mock = Arc::new(MockLlmProvider::with_response("{}"));
        let inv = invoker(&mock)
            .invoke("prompt", Skill::Speaking, Some("gpt-4o"))
            .await
            .unwrap();
        assert!(inv.structured);
        assert_eq!(inv.text, "{}");
        assert_eq!(mock.call_count(), 1);

        let request = &mock.recorded_requests()[0];
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[1].content, "prompt");
        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert_eq!(request.max_tokens, Some(900));
        assert_eq!(request.temperature, 0.2);
        match &request.response_format {
            Some(ResponseFormat::JsonSchema { name, schema, strict }) => {
                assert_eq!(name, "ielts_score");
                assert!(*strict);
                assert!(schema["properties"]["criteria"]["properties"]["pronunciation"].is_object());
            }
            other => panic!("expected json_schema format, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_capability_rejection_retries_once_unconstrained() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_error(LlmError::UnsupportedFeature {
            feature: "response_format".into(),
            message: "json_schema unsupported".into(),
        });
        mock.queue_response(MockLlmProvider::text_response("{\"ok\": true}"));

        let inv = invoker(&mock)
            .invoke("prompt", Skill::Writing, None)
            .await
            .unwrap();
        assert!(!inv.structured);
        assert_eq!(mock.call_count(), 2);
        let requests = mock.recorded_requests();
        assert!(requests[0].response_format.is_some());
        assert!(requests[1].response_format.is_none());
        assert_eq!(requests[0].messages, requests[1].messages);
    }

    #[tokio::test]
    async fn test_non_capability_error_is_not_retried() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_error(LlmError::ApiRequest {
            message: "Server error (500)".into(),
        });
        mock.queue_response(MockLlmProvider::text_response("{}"));

        let err = invoker(&mock)
            .invoke("prompt", Skill::Writing, None)
            .await
            .unwrap_err();
        assert_eq!(err.http_status, 502);
        assert_eq!(err.public_message, "AI scoring failed, please try again.");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_both_attempts_failing_is_502() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_error(LlmError::Rejected {
            status: 400,
            message: "bad request".into(),
        });
        mock.queue_error(LlmError::Connection {
            message: "reset by peer".into(),
        });

        let err = invoker(&mock)
            .invoke("prompt", Skill::Writing, None)
            .await
            .unwrap_err();
        assert_eq!(err.http_status, 502);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unstructured_provider_skips_schema() {
        let mock = Arc::new(MockLlmProvider::with_response("{}").without_structured_output());
        let inv = invoker(&mock)
            .invoke("prompt", Skill::Writing, None)
            .await
            .unwrap();
        assert!(!inv.structured);
        assert_eq!(mock.call_count(), 1);
        assert!(mock.recorded_requests()[0].response_format.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_504() {
        let mock = Arc::new(
            MockLlmProvider::with_response("{}").with_delay(Duration::from_secs(30)),
        );
        let err = invoker(&mock)
            .invoke("prompt", Skill::Writing, None)
            .await
            .unwrap_err();
        assert_eq!(err.http_status, 504);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_covers_both_attempts() {
        let mock = Arc::new(MockLlmProvider::new().with_delay(Duration::from_secs(15)));
        mock.queue_error(LlmError::Rejected {
            status: 422,
            message: "unsupported schema".into(),
        });
        mock.queue_response(MockLlmProvider::text_response("{}"));

        let err = invoker(&mock)
            .invoke("prompt", Skill::Writing, None)
            .await
            .unwrap_err();
        assert_eq!(err.http_status, 504);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_provider_timeout_is_504() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_error(LlmError::Timeout { timeout_secs: 10 });
        let err = invoker(&mock)
            .invoke("prompt", Skill::Writing, None)
            .await
            .unwrap_err();
        assert_eq!(err.http_status, 504);
    }
}
