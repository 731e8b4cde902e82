//! The two failure channels a tool invocation can raise: a recoverable
//! domain failure, or a rejection that the tool runner re-classifies as a
//! denial rather than an error.

use thiserror::Error;

/// A tool-level domain failure. Recoverable: the runner renders this as the
/// tool's result text and the conversation continues.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wraps an underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The arguments failed schema validation or a tool-specific check.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool ran but could not complete its task.
    #[error("{0}")]
    ExecutionFailed(String),

    /// A referenced path does not exist.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// The invocation exceeded its timeout, in milliseconds.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// Catch-all for conditions not covered above.
    #[error("{0}")]
    Other(String),
}

/// Raised instead of [`ToolError`] when a call is denied rather than
/// failed: a denylist pattern matched, or the approval callback said no.
/// The tool runner converts this into a rejection (stats: rejected), not a
/// failure.
#[derive(Debug, Error)]
#[error("tool call rejected: {0}")]
pub struct ToolPermissionError(pub String);

/// Convenience alias for a tool's terminal outcome.
pub type ToolResult = Result<String, ToolError>;
