//! Crate-wide error type for failures that abort a session or the process.

use thiserror::Error;

/// Errors that can surface from the agent core.
///
/// Transient network errors, malformed-response degradation, and
/// tool-level failures are handled closer to their source (backend retry,
/// parser `FailedToolCall`, tool runner tagging) and do not normally reach
/// this enum — it covers the failures that must abort a whole `act()` call
/// or the process.
#[derive(Debug, Error)]
pub enum KinError {
    /// The configured API key is missing or empty.
    #[error("missing API key for provider {provider} (expected env var {env_var})")]
    MissingApiKey {
        /// Provider name.
        provider: String,
        /// Env var that was checked.
        env_var: String,
    },

    /// The configured backend kind has no matching implementation.
    #[error("invalid backend for provider {provider}: {reason}")]
    InvalidBackend {
        /// Provider name.
        provider: String,
        /// Why the backend is invalid.
        reason: String,
    },

    /// `system_prompt` referenced a prompt id that does not exist.
    #[error("invalid system prompt id: {0}")]
    InvalidSystemPromptId(String),

    /// A profile marked `subagent_only` was used to start a top-level
    /// session, or a subagent tried to spawn a non-subagent profile.
    #[error("profile {0} cannot be used in this context")]
    ProfileNotAllowed(String),

    /// The operation was cancelled by the user.
    #[error("cancelled")]
    Cancelled,

    /// Wraps an underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for conditions not covered above.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias for fallible operations returning [`KinError`].
pub type KinResult<T> = Result<T, KinError>;
