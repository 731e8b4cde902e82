#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Conversation-history invariant repair.
//!
//! `clean()` enforces, before every LLM call: every assistant tool call has
//! a matching tool-role response, and the history never ends on a tool-role
//! message.

use kin_core::{Message, Role};

const INTERRUPTED_TEXT: &str = "Tool execution interrupted - no response available";
const TERMINAL_ASSISTANT_TEXT: &str = "Understood.";

/// Enforce tool-response completeness and the terminal-assistant-message
/// invariant in place. Idempotent: running it twice in a row is a no-op.
pub fn clean(messages: &mut Vec<Message>) {
    repair_tool_responses(messages);
    ensure_terminal_assistant_message(messages);
}

fn repair_tool_responses(messages: &mut Vec<Message>) {
    let mut i = 0;
    while i < messages.len() {
        let Some(expected_ids) = expected_tool_call_ids(&messages[i]) else {
            i += 1;
            continue;
        };

        let mut cursor = i + 1;
        for expected_id in expected_ids {
            let already_present = cursor < messages.len()
                && messages[cursor].role == Role::Tool
                && messages[cursor].tool_call_id.as_deref() == Some(expected_id.as_str());

            if already_present {
                cursor += 1;
                continue;
            }

            messages.insert(
                cursor,
                Message::tool_result(expected_id.clone(), String::new(), INTERRUPTED_TEXT),
            );
            cursor += 1;
        }

        i = cursor;
    }
}

fn expected_tool_call_ids(message: &Message) -> Option<Vec<String>> {
    if message.role != Role::Assistant {
        return None;
    }
    let calls = message.tool_calls.as_ref()?;
    if calls.is_empty() {
        return None;
    }
    Some(calls.iter().map(|c| c.id.clone()).collect())
}

fn ensure_terminal_assistant_message(messages: &mut Vec<Message>) {
    if matches!(messages.last(), Some(m) if m.role == Role::Tool) {
        messages.push(Message::assistant(TERMINAL_ASSISTANT_TEXT));
    }
}

/// Swap `messages[0]` (the system prompt) for `new_text`, preserving
/// everything after it.
pub fn replace_system_message(messages: &mut [Message], new_text: impl Into<String>) {
    if let Some(first) = messages.first_mut() {
        first.content = Some(new_text.into());
    }
}
