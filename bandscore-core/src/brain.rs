//! LLM provider abstraction.
//!
//! Defines the `LlmProvider` trait the model invoker talks to, plus a
//! scriptable `MockLlmProvider` for tests.

use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, TokenUsage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Trait for chat-completion providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Return the default model name.
    fn model_name(&self) -> &str;

    /// Whether an API credential is available. Providers without one must
    /// not be asked to `complete`.
    fn has_credentials(&self) -> bool;

    /// Name of the environment variable the credential is read from, for
    /// diagnostics.
    fn credential_source(&self) -> &str {
        "unknown"
    }

    /// Whether this provider supports structured output (JSON schema).
    fn supports_structured_output(&self) -> bool {
        false
    }
}

/// A mock LLM provider for testing.
///
/// Results are returned in the order they were queued; an empty queue
/// yields a `Connection` error. Every call to `complete` is counted and
/// its request recorded, including calls that end in an error.
pub struct MockLlmProvider {
    model: String,
    has_credentials: bool,
    structured_output: bool,
    delay: Option<Duration>,
    responses: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            has_credentials: true,
            structured_output: true,
            delay: None,
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock that always answers with the given text.
    ///
    /// Queues several copies so it can serve repeated calls.
    pub fn with_response(text: &str) -> Self {
        let provider = Self::new();
        for _ in 0..10 {
            provider.queue_response(Self::text_response(text));
        }
        provider
    }

    /// A mock that reports no configured credential.
    pub fn without_credentials() -> Self {
        Self {
            has_credentials: false,
            ..Self::new()
        }
    }

    /// Report that structured output is unsupported.
    pub fn without_structured_output(mut self) -> Self {
        self.structured_output = false;
        self
    }

    /// Sleep before answering every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response to be returned by the next `complete` call.
    pub fn queue_response(&self, response: CompletionResponse) {
        self.queue_result(Ok(response));
    }

    /// Queue an error to be returned by the next `complete` call.
    pub fn queue_error(&self, error: LlmError) {
        self.queue_result(Err(error));
    }

    fn queue_result(&self, result: Result<CompletionResponse, LlmError>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(result);
    }

    /// Create a simple text response for testing.
    pub fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            text: text.to_string(),
            usage: TokenUsage {
                input_tokens: 600,
                output_tokens: 180,
            },
            model: "mock-model".to_string(),
            finish_reason: Some("stop".to_string()),
        }
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, oldest first.
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::Connection {
                    message: "mock provider has no queued responses".to_string(),
                })
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn has_credentials(&self) -> bool {
        self.has_credentials
    }

    fn credential_source(&self) -> &str {
        "MOCK_API_KEY"
    }

    fn supports_structured_output(&self) -> bool {
        self.structured_output
    }
}
