#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Extraction of tool calls and reasoning content from raw LLM output.
//!
//! Models disagree about where tool calls and reasoning live: a
//! structured `tool_calls` field, `<function=...>` XML embedded in
//! content, a provider-named reasoning field, `<think>` tags. One
//! extractor strategy per shape, plus auto-detecting variants with a
//! fixed precedence, normalizes all of them into `ParsedToolCall` and
//! a canonical `reasoning_content`.

mod reasoning;
mod tool_calls;

pub use reasoning::{
    extract_reasoning, AutoReasoningExtractor, FieldReasoningExtractor,
    ReasoningDetailBlock, ReasoningDetailsExtractor, ReasoningExtraction, ReasoningExtractor,
    RawReasoningInput, ThinkTagExtractor,
};
pub use tool_calls::{
    extract_tool_calls, ApiToolCallExtractor, AutoToolCallExtractor, NoneToolCallExtractor,
    RawAssistantMessage, ToolCallExtraction, ToolCallExtractor, XmlToolCallExtractor,
};
