//! Errors the Agent Loop can surface, wrapping each collaborator's own
//! error type instead of re-describing their failures.

use thiserror::Error;

/// Failures that can abort an `act()` call or a runtime-level operation.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An error from the core type vocabulary (missing key, invalid
    /// backend, disallowed profile, ...).
    #[error(transparent)]
    Core(#[from] kin_core::KinError),

    /// An error from the LLM client/backend.
    #[error(transparent)]
    Llm(#[from] kin_llm::LlmError),

    /// A middleware's `after_turn` returned `InjectMessage`, which is an
    /// implementation error.
    #[error(transparent)]
    Middleware(#[from] kin_middleware::InjectInAfterTurnError),

    /// The call was cancelled by the user between turns (not inside a
    /// tool, which is reported as an interrupted `ToolResultEvent`
    /// instead of this error).
    #[error("cancelled")]
    Cancelled,
}

/// Convenience alias for fallible runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
