//! Tool-call extraction: structured `tool_calls` field vs embedded
//! `<function=...>` XML.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use kin_core::{ParsedToolCall, RawArgValue, ToolCall, ToolCallFormat};

/// Matches `<function=name>...</function>`, case-insensitively, across
/// newlines.
static FUNCTION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<function=([^>]+)>(.*?)</function>").unwrap());

/// Matches `<parameter=name>value</parameter>` within one function body.
static PARAMETER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<parameter=([^>]+)>(.*?)</parameter>").unwrap());

/// An assistant message as seen by the parser: structured tool calls (if
/// the provider returned any) plus the raw text content.
#[derive(Debug, Clone, Default)]
pub struct RawAssistantMessage {
    /// Text content, possibly containing embedded XML tool-call tags.
    pub content: Option<String>,
    /// Structured tool calls from the provider's API, if any.
    pub api_tool_calls: Option<Vec<ToolCall>>,
}

/// Result of one extraction pass: the parsed calls, and the content with
/// matched spans removed (`None` if content was not modified).
#[derive(Debug, Clone, Default)]
pub struct ToolCallExtraction {
    /// Calls found in this message.
    pub tool_calls: Vec<ParsedToolCall>,
    /// Content after stripping extracted tags, if it changed.
    pub modified_content: Option<String>,
}

/// One tool-call extraction strategy.
pub trait ToolCallExtractor {
    /// Extract tool calls from `message`. When `strip_from_content` is
    /// true, matched XML spans are removed from the returned content.
    fn extract(&self, message: &RawAssistantMessage, strip_from_content: bool) -> ToolCallExtraction;
}

/// Parses a JSON-looking value, falling back to the raw string.
fn parse_arg_value(raw: &str) -> RawArgValue {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(RawArgValue::Json)
        .unwrap_or_else(|_| RawArgValue::Text(raw.to_string()))
}

/// Extracts from the structured `tool_calls` field. Content is never
/// modified.
#[derive(Debug, Default)]
pub struct ApiToolCallExtractor;

impl ToolCallExtractor for ApiToolCallExtractor {
    fn extract(&self, message: &RawAssistantMessage, _strip_from_content: bool) -> ToolCallExtraction {
        let mut tool_calls = Vec::new();
        for tc in message.api_tool_calls.iter().flatten() {
            let raw_args = match serde_json::from_str::<serde_json::Value>(&tc.arguments_json_text) {
                Ok(serde_json::Value::Object(map)) => map
                    .into_iter()
                    .map(|(k, v)| (k, RawArgValue::Json(v)))
                    .collect::<HashMap<_, _>>(),
                _ => HashMap::new(),
            };
            tool_calls.push(ParsedToolCall {
                tool_name: tc.function_name.clone(),
                call_id: tc.id.clone(),
                raw_args,
            });
        }
        ToolCallExtraction {
            tool_calls,
            modified_content: None,
        }
    }
}

/// Extracts `<function=name><parameter=k>v</parameter></function>` tags
/// from `content`.
#[derive(Debug, Default)]
pub struct XmlToolCallExtractor;

impl ToolCallExtractor for XmlToolCallExtractor {
    fn extract(&self, message: &RawAssistantMessage, strip_from_content: bool) -> ToolCallExtraction {
        let Some(content) = message.content.as_deref() else {
            return ToolCallExtraction::default();
        };

        let mut tool_calls = Vec::new();
        for caps in FUNCTION_TAG.captures_iter(content) {
            let func_name = caps[1].trim().to_string();
            let func_body = &caps[2];

            let mut raw_args = HashMap::new();
            for pcaps in PARAMETER_TAG.captures_iter(func_body) {
                let name = pcaps[1].trim().to_string();
                let value = pcaps[2].trim();
                raw_args.insert(name, parse_arg_value(value));
            }

            // The xml_ prefix marks the id as synthesized here rather
            // than provider-issued; 12 hex chars is enough to correlate.
            let call_id = format!("xml_{}", &uuid::Uuid::new_v4().simple().to_string()[..12]);

            tool_calls.push(ParsedToolCall {
                tool_name: func_name,
                call_id,
                raw_args,
            });
        }

        if tool_calls.is_empty() {
            return ToolCallExtraction::default();
        }

        let modified_content = if strip_from_content {
            Some(FUNCTION_TAG.replace_all(content, "").trim().to_string())
        } else {
            None
        };

        ToolCallExtraction {
            tool_calls,
            modified_content,
        }
    }
}

/// Tries the API extractor first; falls back to XML only when no
/// structured tool calls are present and `<function=` appears in content.
#[derive(Debug, Default)]
pub struct AutoToolCallExtractor {
    api: ApiToolCallExtractor,
    xml: XmlToolCallExtractor,
}

impl ToolCallExtractor for AutoToolCallExtractor {
    fn extract(&self, message: &RawAssistantMessage, strip_from_content: bool) -> ToolCallExtraction {
        if message.api_tool_calls.as_ref().is_some_and(|v| !v.is_empty()) {
            return self.api.extract(message, strip_from_content);
        }
        let has_xml = message
            .content
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains("<function="));
        if has_xml {
            return self.xml.extract(message, strip_from_content);
        }
        ToolCallExtraction::default()
    }
}

/// No-op extractor for `ToolCallFormat::None`.
#[derive(Debug, Default)]
pub struct NoneToolCallExtractor;

impl ToolCallExtractor for NoneToolCallExtractor {
    fn extract(&self, _message: &RawAssistantMessage, _strip_from_content: bool) -> ToolCallExtraction {
        ToolCallExtraction::default()
    }
}

/// Extract tool calls from `message` per the configured `format`.
#[must_use]
pub fn extract_tool_calls(
    format: ToolCallFormat,
    message: &RawAssistantMessage,
    strip_from_content: bool,
) -> ToolCallExtraction {
    match format {
        ToolCallFormat::Api => ApiToolCallExtractor.extract(message, strip_from_content),
        ToolCallFormat::Xml => XmlToolCallExtractor.extract(message, strip_from_content),
        ToolCallFormat::Auto => AutoToolCallExtractor::default().extract(message, strip_from_content),
        ToolCallFormat::None => NoneToolCallExtractor.extract(message, strip_from_content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_extractor_parses_json_arguments() {
        let msg = RawAssistantMessage {
            content: None,
            api_tool_calls: Some(vec![ToolCall::new(
                "call_1",
                "shell",
                r#"{"cmd": "ls"}"#,
            )]),
        };
        let result = ApiToolCallExtractor.extract(&msg, true);
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].tool_name, "shell");
        assert_eq!(result.tool_calls[0].call_id, "call_1");
        assert!(result.modified_content.is_none());
    }

    #[test]
    fn api_extractor_falls_back_to_empty_args_on_bad_json() {
        let msg = RawAssistantMessage {
            content: None,
            api_tool_calls: Some(vec![ToolCall::new("call_1", "shell", "not json")]),
        };
        let result = ApiToolCallExtractor.extract(&msg, true);
        assert!(result.tool_calls[0].raw_args.is_empty());
    }

    #[test]
    fn xml_extractor_parses_single_function_call() {
        let msg = RawAssistantMessage {
            content: Some(
                "Let me look.\n<function=read_file><parameter=path>x.py</parameter></function>"
                    .to_string(),
            ),
            api_tool_calls: None,
        };
        let result = XmlToolCallExtractor.extract(&msg, true);
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].tool_name, "read_file");
        assert!(result.tool_calls[0].call_id.starts_with("xml_"));
        assert_eq!(result.tool_calls[0].call_id.len(), "xml_".len() + 12);
        assert_eq!(result.modified_content.as_deref(), Some("Let me look."));
    }

    #[test]
    fn xml_extractor_returns_none_when_no_tags_present() {
        let msg = RawAssistantMessage {
            content: Some("just text".to_string()),
            api_tool_calls: None,
        };
        let result = XmlToolCallExtractor.extract(&msg, true);
        assert!(result.tool_calls.is_empty());
        assert!(result.modified_content.is_none());
    }

    #[test]
    fn auto_prefers_api_over_xml() {
        let msg = RawAssistantMessage {
            content: Some("<function=ignored></function>".to_string()),
            api_tool_calls: Some(vec![ToolCall::new("call_1", "shell", "{}")]),
        };
        let result = AutoToolCallExtractor::default().extract(&msg, true);
        assert_eq!(result.tool_calls[0].tool_name, "shell");
    }

    #[test]
    fn auto_falls_back_to_xml_when_no_api_calls() {
        let msg = RawAssistantMessage {
            content: Some("<function=read_file></function>".to_string()),
            api_tool_calls: None,
        };
        let result = AutoToolCallExtractor::default().extract(&msg, true);
        assert_eq!(result.tool_calls[0].tool_name, "read_file");
    }

    #[test]
    fn none_extractor_always_empty() {
        let msg = RawAssistantMessage {
            content: Some("<function=read_file></function>".to_string()),
            api_tool_calls: Some(vec![ToolCall::new("call_1", "shell", "{}")]),
        };
        let result = NoneToolCallExtractor.extract(&msg, true);
        assert!(result.tool_calls.is_empty());
    }

    #[test]
    fn xml_parameter_value_that_looks_like_json_is_parsed() {
        let msg = RawAssistantMessage {
            content: Some(
                "<function=f><parameter=n>42</parameter></function>".to_string(),
            ),
            api_tool_calls: None,
        };
        let result = XmlToolCallExtractor.extract(&msg, true);
        assert_eq!(
            result.tool_calls[0].raw_args.get("n"),
            Some(&RawArgValue::Json(serde_json::json!(42)))
        );
    }
}
