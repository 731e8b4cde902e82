//! Model/provider configuration types.

use serde::{Deserialize, Serialize};

/// Which strategy the Response Parser uses to extract tool calls from a
/// model's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolCallFormat {
    /// Structured `message.tool_calls` field only.
    Api,
    /// `<function=name><parameter=k>v</parameter></function>` in content.
    Xml,
    /// API if present and non-empty, else XML.
    Auto,
    /// Never extract tool calls.
    None,
}

/// Whether extracted reasoning content is kept in the next turn's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReasoningMode {
    /// Drop reasoning before sending the message back to the backend.
    Strip,
    /// Keep reasoning as part of the serialized assistant message.
    Preserve,
}

/// Per-model pricing, in USD per million tokens.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Prices {
    /// Price per million input (prompt) tokens.
    pub input_per_million: f64,
    /// Price per million output (completion) tokens.
    pub output_per_million: f64,
}

/// Reasoning behavior toggles for one model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Whether the model is expected to emit reasoning content at all.
    pub enabled: bool,
    /// Extraction mode; informational when `enabled` is false.
    pub mode: Option<ReasoningMode>,
    /// Optional provider-side reasoning token budget.
    pub budget: Option<u64>,
}

/// Configuration for one model as selected by an [`crate::AgentProfile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name as sent to the provider.
    pub name: String,
    /// Which [`ProviderConfig`] this model is served through.
    pub provider_ref: String,
    /// Short human-facing alias (e.g. shown in subagent reports).
    pub alias: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Optional nucleus sampling parameter.
    pub top_p: Option<f64>,
    /// Reasoning extraction behavior.
    pub reasoning: ReasoningConfig,
    /// How tool calls are extracted from this model's output.
    pub tool_call_format: ToolCallFormat,
    /// Maximum context window, if known.
    pub context_window: Option<u64>,
    /// Pricing used to derive `AgentStats::session_cost`.
    pub prices: Prices,
}

/// Configuration for one backend provider (OpenAI-compatible, Anthropic,
/// etc).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name, referenced by [`ModelConfig::provider_ref`].
    pub name: String,
    /// Base URL of the API.
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env_var: String,
    /// Which wire protocol this provider speaks.
    pub backend_kind: BackendKind,
    /// Field name this provider uses for reasoning content, if non-standard.
    pub reasoning_field_name: String,
}

/// Which concrete [`crate`]-external backend implementation a provider maps
/// to. Named here only as an enum tag; wire format is out of this crate's
/// scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// OpenAI-compatible chat-completions API.
    OpenAiCompat,
    /// Anthropic Messages API.
    Anthropic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_format_round_trips_through_serde() {
        let f = ToolCallFormat::Auto;
        let s = serde_json::to_string(&f).unwrap();
        assert_eq!(s, "\"AUTO\"");
        let back: ToolCallFormat = serde_json::from_str(&s).unwrap();
        assert_eq!(back, f);
    }
}
