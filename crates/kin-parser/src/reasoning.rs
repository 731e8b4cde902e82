//! Reasoning-content extraction: OpenRouter's `reasoning_details` array,
//! a provider-named field, and `<think>...</think>` tags in content.

use std::sync::LazyLock;

use regex::Regex;

use kin_core::ReasoningMode;

static THINK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>(.*?)</think>").unwrap());

/// One block of OpenRouter's `reasoning_details` array.
#[derive(Debug, Clone)]
pub enum ReasoningDetailBlock {
    /// `{"type": "reasoning.summary", "summary": "..."}`
    Summary(String),
    /// `{"type": "reasoning.text", "text": "..."}`
    Text(String),
    /// `{"type": "reasoning.encrypted", ...}` — not readable, skipped.
    Encrypted,
}

/// Inputs a reasoning extractor needs: the raw content string, the
/// provider's `reasoning_details` array (if any), and a named field value
/// (if the provider puts reasoning under a non-standard field).
#[derive(Debug, Clone, Default)]
pub struct RawReasoningInput<'a> {
    /// Message content, possibly containing `<think>` tags.
    pub content: Option<&'a str>,
    /// OpenRouter-style typed reasoning blocks, if present.
    pub reasoning_details: Option<&'a [ReasoningDetailBlock]>,
    /// Value already present under the provider's configured field name
    /// (distinct from the canonical `reasoning_content`), if any.
    pub named_field_value: Option<&'a str>,
}

/// Result of one reasoning extraction pass.
#[derive(Debug, Clone, Default)]
pub struct ReasoningExtraction {
    /// Extracted reasoning text, if any was found.
    pub reasoning_content: Option<String>,
    /// Content with `<think>` tags removed, if they were stripped.
    pub cleaned_content: Option<String>,
}

/// One reasoning extraction strategy.
pub trait ReasoningExtractor {
    /// Extract reasoning from `input`. `preserve_in_content` only affects
    /// the `<think>`-tag strategy: when true, tags are left in place.
    fn extract(&self, input: &RawReasoningInput<'_>, preserve_in_content: bool) -> ReasoningExtraction;
}

/// Renames a provider's named reasoning field to the canonical one.
#[derive(Debug, Default)]
pub struct FieldReasoningExtractor;

impl ReasoningExtractor for FieldReasoningExtractor {
    fn extract(&self, input: &RawReasoningInput<'_>, _preserve_in_content: bool) -> ReasoningExtraction {
        ReasoningExtraction {
            reasoning_content: input.named_field_value.map(str::to_string),
            cleaned_content: None,
        }
    }
}

/// Concatenates OpenRouter's `reasoning.summary`/`reasoning.text` blocks,
/// skipping `reasoning.encrypted`.
#[derive(Debug, Default)]
pub struct ReasoningDetailsExtractor;

impl ReasoningExtractor for ReasoningDetailsExtractor {
    fn extract(&self, input: &RawReasoningInput<'_>, _preserve_in_content: bool) -> ReasoningExtraction {
        let Some(blocks) = input.reasoning_details else {
            return ReasoningExtraction::default();
        };
        let parts: Vec<&str> = blocks
            .iter()
            .filter_map(|b| match b {
                ReasoningDetailBlock::Summary(s) | ReasoningDetailBlock::Text(s) => {
                    (!s.is_empty()).then_some(s.as_str())
                }
                ReasoningDetailBlock::Encrypted => None,
            })
            .collect();
        ReasoningExtraction {
            reasoning_content: (!parts.is_empty()).then(|| parts.join("\n")),
            cleaned_content: None,
        }
    }
}

/// Extracts `<think>...</think>` blocks from content.
#[derive(Debug, Default)]
pub struct ThinkTagExtractor;

impl ReasoningExtractor for ThinkTagExtractor {
    fn extract(&self, input: &RawReasoningInput<'_>, preserve_in_content: bool) -> ReasoningExtraction {
        let Some(content) = input.content else {
            return ReasoningExtraction::default();
        };
        let parts: Vec<String> = THINK_TAG
            .captures_iter(content)
            .map(|c| c[1].trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            return ReasoningExtraction::default();
        }
        let reasoning_content = Some(parts.join("\n"));
        let cleaned_content = if preserve_in_content {
            None
        } else {
            Some(THINK_TAG.replace_all(content, "").trim().to_string())
        };
        ReasoningExtraction {
            reasoning_content,
            cleaned_content,
        }
    }
}

/// Tries `reasoning_details`, then the named field, then `<think>` tags;
/// first match wins.
#[derive(Debug, Default)]
pub struct AutoReasoningExtractor {
    details: ReasoningDetailsExtractor,
    field: FieldReasoningExtractor,
    think: ThinkTagExtractor,
}

impl ReasoningExtractor for AutoReasoningExtractor {
    fn extract(&self, input: &RawReasoningInput<'_>, preserve_in_content: bool) -> ReasoningExtraction {
        if input.reasoning_details.is_some() {
            let r = self.details.extract(input, preserve_in_content);
            if r.reasoning_content.is_some() {
                return r;
            }
        }
        if input.named_field_value.is_some() {
            let r = self.field.extract(input, preserve_in_content);
            if r.reasoning_content.is_some() {
                return r;
            }
        }
        let has_think = input
            .content
            .is_some_and(|c| c.to_lowercase().contains("<think>"));
        if has_think {
            return self.think.extract(input, preserve_in_content);
        }
        ReasoningExtraction::default()
    }
}

/// Extract reasoning per `mode` (`Strip` removes `<think>` tags from
/// content, `Preserve` leaves them).
#[must_use]
pub fn extract_reasoning(input: &RawReasoningInput<'_>, mode: ReasoningMode) -> ReasoningExtraction {
    AutoReasoningExtractor::default().extract(input, mode == ReasoningMode::Preserve)
}
