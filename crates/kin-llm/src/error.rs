//! LLM backend/client error type.

use thiserror::Error;

/// Failures from talking to, or configuring, an LLM backend.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider's API key env var is unset.
    #[error("API key for provider {provider} is not configured")]
    ApiKeyNotConfigured {
        /// Provider name.
        provider: String,
    },
    /// The HTTP request reached the provider but it returned an error.
    #[error("API request failed: {0}")]
    ApiRequestFailed(String),
    /// The provider returned HTTP 429.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded {
        /// Suggested backoff, in seconds.
        retry_after_secs: u64,
    },
    /// The response body didn't match the expected wire shape.
    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),
    /// `model_ref` did not resolve to a configured model.
    #[error("model not supported: {model}")]
    ModelNotSupported {
        /// The unresolved model name.
        model: String,
    },
    /// The request would exceed the model's context window.
    #[error("context length exceeded: {current} tokens > {max} max")]
    ContextLengthExceeded {
        /// Tokens the request would use.
        current: u64,
        /// The model's context window.
        max: u64,
    },
    /// Failure parsing a streamed chunk.
    #[error("streaming error: {0}")]
    StreamingError(String),
    /// Failure serializing a request body.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// Underlying transport failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider/model resolution failure at the config layer.
    #[error("config error: {0}")]
    ConfigError(String),
}

/// Convenience alias for this crate's `Result`.
pub type LlmResult<T> = Result<T, LlmError>;
