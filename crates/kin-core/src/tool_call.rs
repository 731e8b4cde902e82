//! Tool call types and the three-stage refinement pipeline
//! `ParsedToolCall` -> `ResolvedToolCall` | `FailedToolCall`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool call as it appears on an assistant [`crate::Message`].
///
/// `id` is either provider-issued (API format) or synthesized as
/// `xml_<12 lowercase hex chars>` when parsed out of XML content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier; referenced by the matching tool-role message.
    pub id: String,
    /// The tool's name as written by the model.
    pub function_name: String,
    /// Raw, unparsed JSON text of the arguments.
    pub arguments_json_text: String,
}

impl ToolCall {
    /// Construct a tool call from its three fields.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        function_name: impl Into<String>,
        arguments_json_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            function_name: function_name.into(),
            arguments_json_text: arguments_json_text.into(),
        }
    }

    /// Whether this call's id was synthesized by the XML extractor.
    #[must_use]
    pub fn is_synthetic_xml_id(&self) -> bool {
        self.id.starts_with("xml_")
    }
}

/// A single, untyped key in [`ParsedToolCall::raw_args`]: either a bare
/// string (the common XML case) or a value that parsed as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawArgValue {
    /// The textual value did not parse as JSON; kept verbatim.
    Text(String),
    /// The textual value parsed as JSON.
    Json(Value),
}

/// The output of the response parser, before tool lookup/validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedToolCall {
    /// Name of the tool as requested by the model.
    pub tool_name: String,
    /// The call id this refers back to (matches a [`ToolCall::id`]).
    pub call_id: String,
    /// Unvalidated argument map.
    pub raw_args: HashMap<String, RawArgValue>,
}

/// A `ParsedToolCall` that was found in the Tool Manager and whose arguments
/// validated against the tool's schema.
#[derive(Debug, Clone)]
pub struct ResolvedToolCall {
    /// Name of the tool to invoke.
    pub tool_class: String,
    /// The call id this refers back to.
    pub call_id: String,
    /// Schema-validated arguments, ready to hand to `Tool::invoke`.
    pub validated_args: Value,
}

/// A `ParsedToolCall` that could not be resolved: unknown tool name, or
/// arguments failing schema validation.
#[derive(Debug, Clone)]
pub struct FailedToolCall {
    /// The call id this refers back to.
    pub call_id: String,
    /// Name of the tool as requested by the model (possibly unknown).
    pub tool_name: String,
    /// Human-readable reason, surfaced to the LLM as `<tool_error>`.
    pub error: String,
}

/// Per-tool (or per-pattern) authorization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolPermission {
    /// Ask the approval callback every time.
    Ask,
    /// Always allow without asking.
    Always,
    /// Always deny; tool never executes.
    Never,
}
