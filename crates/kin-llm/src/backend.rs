//! The backend port: the interface every concrete provider implements,
//! with an explicit `open()/close()` lifecycle and `complete` /
//! `complete_streaming` as distinct operations.

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use kin_core::Message;
use serde_json::Value;

use crate::chunk::Chunk;
use crate::error::LlmResult;

/// A tool definition as sent to the backend (name + JSON schema).
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    /// Tool name as the model will call it.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON schema for the tool's arguments.
    pub input_schema: Value,
}

/// How the backend should choose whether/which tool to call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// Let the model decide.
    #[default]
    Auto,
    /// Forbid tool calls entirely.
    None,
    /// Force a specific named tool.
    Named(String),
}

/// Everything one `complete`/`complete_streaming` call needs, independent
/// of any particular wire format.
pub struct CompletionRequest<'a> {
    /// Model name as sent to the provider.
    pub model: &'a str,
    /// Conversation history, system message included as `messages[0]`.
    pub messages: &'a [Message],
    /// Tools the model may call.
    pub tools: &'a [ToolDefinition],
    /// Sampling temperature.
    pub temperature: f64,
    /// Optional output token cap.
    pub max_tokens: Option<u64>,
    /// Tool-calling policy for this request.
    pub tool_choice: ToolChoice,
    /// Headers to attach in addition to the backend's defaults.
    pub extra_headers: HashMap<String, String>,
}

/// A boxed, send-able stream of chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = LlmResult<Chunk>> + Send>>;

/// The interface every concrete provider backend implements.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Short, stable name (e.g. `"anthropic"`, `"openai-compat"`).
    fn name(&self) -> &str;

    /// Acquire whatever transport-level resources this backend needs
    /// (connection pools, auth refresh). A no-op for stateless backends.
    async fn open(&self) -> LlmResult<()> {
        Ok(())
    }

    /// Release resources acquired by `open`. A no-op for stateless
    /// backends.
    async fn close(&self) -> LlmResult<()> {
        Ok(())
    }

    /// One full, non-streaming response.
    async fn complete(&self, request: &CompletionRequest<'_>) -> LlmResult<Chunk>;

    /// A lazy sequence of partial chunks; see [`crate::chunk::aggregate`]
    /// for how callers fold them into the final message.
    async fn complete_streaming(&self, request: &CompletionRequest<'_>) -> LlmResult<ChunkStream>;

    /// Approximate (or backend-exact) token count for `messages` plus
    /// `tools`, under `model`.
    fn count_tokens(&self, model: &str, messages: &[Message], tools: &[ToolDefinition]) -> u64;
}
