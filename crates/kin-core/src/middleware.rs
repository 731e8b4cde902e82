//! The four-valued verdict middlewares return to the agent loop.

use std::collections::HashMap;

use serde_json::Value;

/// What a middleware asked the loop to do.
#[derive(Debug, Clone, PartialEq)]
pub enum MiddlewareAction {
    /// No action; continue the loop normally.
    Continue,
    /// Stop the loop after emitting a terminal, tagged assistant event.
    Stop,
    /// Run compaction before continuing.
    Compact,
    /// Splice a message into the conversation before the next LLM call.
    ///
    /// Only valid as a `before_turn` result; `after_turn` must never
    /// return this.
    InjectMessage,
}

/// The full result of one middleware hook invocation.
#[derive(Debug, Clone, Default)]
pub struct MiddlewareResult {
    /// The requested action.
    pub action: Option<MiddlewareAction>,
    /// Payload for `InjectMessage`, or additional context for `Stop`.
    pub message: Option<String>,
    /// Human-readable reason, surfaced in `<kin_stop_event>` text.
    pub reason: Option<String>,
    /// Free-form metadata (e.g. `{old_tokens, threshold}` for compaction).
    pub metadata: HashMap<String, Value>,
}

impl MiddlewareResult {
    /// The default, no-op result.
    #[must_use]
    pub fn cont() -> Self {
        Self {
            action: Some(MiddlewareAction::Continue),
            ..Self::default()
        }
    }

    /// A `Stop` result carrying a reason.
    #[must_use]
    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            action: Some(MiddlewareAction::Stop),
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// A `Compact` result carrying metadata.
    #[must_use]
    pub fn compact(metadata: HashMap<String, Value>) -> Self {
        Self {
            action: Some(MiddlewareAction::Compact),
            metadata,
            ..Self::default()
        }
    }

    /// An `InjectMessage` result carrying the text to splice in.
    #[must_use]
    pub fn inject(message: impl Into<String>) -> Self {
        Self {
            action: Some(MiddlewareAction::InjectMessage),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Whether this result requests `Continue` (the default when unset).
    #[must_use]
    pub fn is_continue(&self) -> bool {
        matches!(self.action, None | Some(MiddlewareAction::Continue))
    }
}
