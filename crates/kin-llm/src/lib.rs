#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The LLM backend port and client.
//!
//! `LlmBackend` is the pluggable provider interface (non-streaming,
//! streaming, token counting, open/close lifecycle); `LlmClient` wraps a
//! backend with header injection and stats recording. Two concrete
//! backends ship: OpenAI-compatible chat-completions and the Anthropic
//! Messages API, both folding their SSE streams into the same additive
//! `Chunk` shape.

mod anthropic;
mod backend;
mod chunk;
mod client;
mod error;
mod openai_compat;
mod retry;

pub use anthropic::AnthropicBackend;
pub use backend::{ChunkStream, CompletionRequest, LlmBackend, ToolChoice, ToolDefinition};
pub use chunk::{aggregate, Chunk, ChunkMessage, Usage};
pub use client::LlmClient;
pub use error::{LlmError, LlmResult};
pub use openai_compat::OpenAiCompatBackend;
