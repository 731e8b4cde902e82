//! The canonical message type flowing through history, the LLM client, and
//! the event stream.

use serde::{Deserialize, Serialize};

use crate::tool_call::ToolCall;

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The system prompt. Always `messages[0]`.
    System,
    /// A human (or programmatic caller) turn.
    User,
    /// An LLM turn, possibly carrying tool calls.
    Assistant,
    /// The result of one tool call, addressed by `tool_call_id`.
    Tool,
}

/// A single message in the conversation history.
///
/// `id` is stable across edits (e.g. streaming aggregation does not change
/// it once the message is appended) so event consumers can correlate a
/// message with the events it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Stable identifier, assigned once at construction.
    pub id: String,
    /// Who produced this message.
    pub role: Role,
    /// Visible text content, if any.
    pub content: Option<String>,
    /// Extracted reasoning/thinking content, kept separate from `content`.
    pub reasoning_content: Option<String>,
    /// Tool calls the assistant asked to perform, in call order.
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Set iff `role == Tool`: which call this message answers.
    pub tool_call_id: Option<String>,
    /// Set iff `role == Tool`: the name of the tool that produced this result.
    pub tool_name: Option<String>,
}

impl Message {
    fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn bare(role: Role) -> Self {
        Self {
            id: Self::new_id(),
            role,
            content: None,
            reasoning_content: None,
            tool_calls: None,
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// The system prompt message. Must be `messages[0]`.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::bare(Role::System)
        }
    }

    /// A plain user turn.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::bare(Role::User)
        }
    }

    /// A plain assistant turn with no tool calls.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::bare(Role::Assistant)
        }
    }

    /// An assistant turn that only carries tool calls (content may be empty).
    #[must_use]
    pub fn assistant_with_tools(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content,
            tool_calls: Some(tool_calls),
            ..Self::bare(Role::Assistant)
        }
    }

    /// A tool-role message answering `tool_call_id`.
    #[must_use]
    pub fn tool_result(tool_call_id: impl Into<String>, tool_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_name: Some(tool_name.into()),
            ..Self::bare(Role::Tool)
        }
    }

    /// Whether this message carries any tool calls.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_message_has_no_tool_fields() {
        let m = Message::system("you are kin");
        assert_eq!(m.role, Role::System);
        assert!(m.tool_call_id.is_none());
    }

    #[test]
    fn tool_result_carries_call_id_and_name() {
        let m = Message::tool_result("call_1", "shell", "a\nb\n");
        assert_eq!(m.role, Role::Tool);
        assert_eq!(m.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(m.tool_name.as_deref(), Some("shell"));
    }

    #[test]
    fn assistant_with_tools_reports_has_tool_calls() {
        let m = Message::assistant_with_tools(
            None,
            vec![ToolCall::new("call_1", "shell", "{}")],
        );
        assert!(m.has_tool_calls());
    }

    #[test]
    fn ids_are_unique_per_message() {
        let a = Message::user("hi");
        let b = Message::user("hi");
        assert_ne!(a.id, b.id);
    }
}
