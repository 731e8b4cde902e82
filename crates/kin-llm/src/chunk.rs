//! The additive `Chunk` shape: concatenating every chunk's
//! `message.content`/`message.reasoning_content` and merging their
//! `message.tool_calls` in order yields the final message.

use kin_core::ToolCall;
use serde::{Deserialize, Serialize};

/// One (possibly partial) piece of an assistant response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMessage {
    /// Text content contributed by this chunk, if any.
    pub content: Option<String>,
    /// Reasoning content contributed by this chunk, if any.
    pub reasoning_content: Option<String>,
    /// Complete tool calls contributed by this chunk. A backend only
    /// yields a tool call once it has a full id/name/arguments triple,
    /// so this is never itself partial.
    pub tool_calls: Vec<ToolCall>,
}

/// Token accounting for one `complete`/`complete_streaming` call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens consumed.
    pub prompt_tokens: u64,
    /// Completion tokens generated.
    pub completion_tokens: u64,
}

/// One unit a backend yields: a message fragment plus, only on the final
/// chunk of a stream (or always, for `complete`), usage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chunk {
    /// This chunk's message contribution.
    pub message: ChunkMessage,
    /// Usage, present only once per call (typically the last chunk).
    pub usage: Option<Usage>,
}

/// Fold a sequence of chunks into one canonical message plus the usage
/// that appeared among them.
#[must_use]
pub fn aggregate(chunks: &[Chunk]) -> (ChunkMessage, Option<Usage>) {
    let mut content = String::new();
    let mut reasoning_content = String::new();
    let mut tool_calls = Vec::new();
    let mut usage = None;
    let mut saw_content = false;
    let mut saw_reasoning = false;

    for chunk in chunks {
        if let Some(c) = &chunk.message.content {
            content.push_str(c);
            saw_content = true;
        }
        if let Some(r) = &chunk.message.reasoning_content {
            reasoning_content.push_str(r);
            saw_reasoning = true;
        }
        tool_calls.extend(chunk.message.tool_calls.iter().cloned());
        if chunk.usage.is_some() {
            usage = chunk.usage;
        }
    }

    let message = ChunkMessage {
        content: saw_content.then_some(content),
        reasoning_content: saw_reasoning.then_some(reasoning_content),
        tool_calls,
    };
    (message, usage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_concatenates_text_and_merges_tool_calls() {
        let chunks = vec![
            Chunk {
                message: ChunkMessage {
                    content: Some("Hel".to_string()),
                    ..Default::default()
                },
                usage: None,
            },
            Chunk {
                message: ChunkMessage {
                    content: Some("lo".to_string()),
                    tool_calls: vec![ToolCall::new("call_1", "shell", "{}")],
                    ..Default::default()
                },
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                }),
            },
        ];
        let (message, usage) = aggregate(&chunks);
        assert_eq!(message.content.as_deref(), Some("Hello"));
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(usage.unwrap().completion_tokens, 5);
    }

    #[test]
    fn aggregate_of_empty_chunks_has_no_content() {
        let (message, usage) = aggregate(&[]);
        assert!(message.content.is_none());
        assert!(usage.is_none());
    }
}
