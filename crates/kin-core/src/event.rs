//! The closed event-stream vocabulary emitted by the Agent Loop.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One item of the typed event stream `act()` produces.
///
/// Ordering is enforced by the agent loop, not by this type:
/// `User -> (Reasoning* | Assistant*)+ ->
/// (ToolCall -> ToolStream* -> ToolResult)* -> repeat or end`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The user message that started this `act()` call.
    User {
        /// The message text as submitted.
        content: String,
    },
    /// A chunk (or the whole, for non-streaming) of assistant text.
    Assistant {
        /// Visible text content.
        content: String,
        /// The message id this content will be attached to once appended.
        message_id: Option<String>,
        /// Set when this event is the loop's terminal event because a
        /// middleware returned STOP.
        stopped_by_middleware: bool,
    },
    /// A chunk of reasoning/thinking content.
    Reasoning {
        /// Reasoning text.
        content: String,
    },
    /// A resolved tool call is about to execute (or be skipped).
    ToolCall {
        /// Tool name.
        tool_name: String,
        /// Resolved tool class/name (kept distinct from `tool_name` so a
        /// future aliasing layer has somewhere to go; identical today).
        tool_class: String,
        /// Schema-validated arguments.
        validated_args: Value,
        /// Call id this event correlates to.
        call_id: String,
    },
    /// A progress update from inside a running tool invocation.
    ToolStream {
        /// Tool name.
        tool_name: String,
        /// Progress message.
        message: String,
        /// Call id this event correlates to.
        call_id: String,
    },
    /// The terminal outcome of one tool call.
    ToolResult {
        /// Tool name.
        tool_name: String,
        /// Resolved tool class/name.
        tool_class: String,
        /// Rendered result, if the call succeeded.
        result: Option<String>,
        /// Rendered error, if the call failed or was skipped.
        error: Option<String>,
        /// Whether the call was skipped rather than executed.
        skipped: bool,
        /// Why the call was skipped, if `skipped`.
        skip_reason: Option<String>,
        /// Wall-clock duration of the invocation, in milliseconds.
        duration_ms: u64,
        /// Call id this event correlates to.
        call_id: String,
    },
    /// Compaction is starting.
    CompactStart {
        /// Context token count that triggered compaction.
        current: u64,
        /// The threshold that was crossed.
        threshold: u64,
    },
    /// Compaction has finished.
    CompactEnd {
        /// Context token count before compaction.
        old: u64,
        /// Context token count after compaction.
        new: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_a_type_tag() {
        let e = Event::User {
            content: "hi".to_string(),
        };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "user");
        assert_eq!(v["content"], "hi");
    }

    #[test]
    fn tool_result_round_trips() {
        let e = Event::ToolResult {
            tool_name: "shell".into(),
            tool_class: "shell".into(),
            result: Some("ok".into()),
            error: None,
            skipped: false,
            skip_reason: None,
            duration_ms: 12,
            call_id: "call_1".into(),
        };
        let s = serde_json::to_string(&e).unwrap();
        let back: Event = serde_json::from_str(&s).unwrap();
        match back {
            Event::ToolResult { call_id, .. } => assert_eq!(call_id, "call_1"),
            _ => panic!("wrong variant"),
        }
    }
}
