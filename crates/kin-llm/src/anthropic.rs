//! An Anthropic Messages API backend.
//!
//! The system prompt travels as a top-level field, assistant tool calls
//! become `tool_use` content blocks, tool-role messages become user-side
//! `tool_result` blocks, and the SSE stream is folded from
//! `content_block_start`/`content_block_delta`/`content_block_stop`
//! events into this crate's additive [`Chunk`] shape, with
//! `thinking_delta` fragments mapped onto `reasoning_content`.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use kin_core::{Message, Role, ToolCall};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::backend::{ChunkStream, CompletionRequest, LlmBackend, ToolChoice};
use crate::chunk::{Chunk, ChunkMessage, Usage};
use crate::error::{LlmError, LlmResult};
use crate::retry::send_with_retry;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u64 = 4096;

/// A backend speaking the Anthropic Messages wire format.
pub struct AnthropicBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl AnthropicBackend {
    /// Construct a backend pointed at `base_url` (e.g.
    /// `https://api.anthropic.com/v1/messages`), authenticating with
    /// `api_key`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn build_request_body(&self, request: &CompletionRequest<'_>) -> Value {
        let system = request
            .messages
            .first()
            .filter(|m| m.role == Role::System)
            .and_then(|m| m.content.clone());
        let messages: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(convert_message)
            .collect();

        let mut body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": messages,
            "temperature": request.temperature,
            "stream": true,
        });
        if let Some(system) = system {
            body["system"] = Value::String(system);
        }
        if !request.tools.is_empty() && request.tool_choice != ToolChoice::None {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.input_schema,
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
            if let ToolChoice::Named(name) = &request.tool_choice {
                body["tool_choice"] = serde_json::json!({"type": "tool", "name": name});
            }
        }
        body
    }

    fn send_request(&self, request: &CompletionRequest<'_>) -> LlmResult<reqwest::RequestBuilder> {
        let Some(api_key) = self.api_key.as_deref().filter(|k| !k.is_empty()) else {
            return Err(LlmError::ApiKeyNotConfigured {
                provider: "anthropic".to_string(),
            });
        };
        let mut key_header = reqwest::header::HeaderValue::try_from(api_key)
            .map_err(|e| LlmError::ConfigError(format!("invalid API key characters: {e}")))?;
        key_header.set_sensitive(true);

        let mut builder = self
            .client
            .post(&self.base_url)
            .header("x-api-key", key_header)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json");
        for (key, value) in &request.extra_headers {
            builder = builder.header(key, value);
        }
        Ok(builder)
    }
}

/// One message in Anthropic's format. The system message never reaches
/// this function; it travels as the top-level `system` field instead.
fn convert_message(message: &Message) -> Value {
    match message.role {
        Role::System | Role::User => serde_json::json!({
            "role": "user",
            "content": message.content.clone().unwrap_or_default(),
        }),
        Role::Tool => serde_json::json!({
            "role": "user",
            "content": [{
                "type": "tool_result",
                "tool_use_id": message.tool_call_id,
                "content": message.content.clone().unwrap_or_default(),
            }],
        }),
        Role::Assistant => {
            let mut blocks = Vec::new();
            if let Some(text) = &message.content {
                if !text.is_empty() {
                    blocks.push(serde_json::json!({"type": "text", "text": text}));
                }
            }
            if let Some(calls) = &message.tool_calls {
                for call in calls {
                    let input: Value = serde_json::from_str(&call.arguments_json_text)
                        .unwrap_or_else(|_| serde_json::json!({}));
                    blocks.push(serde_json::json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.function_name,
                        "input": input,
                    }));
                }
            }
            if blocks.is_empty() {
                blocks.push(serde_json::json!({"type": "text", "text": ""}));
            }
            serde_json::json!({"role": "assistant", "content": blocks})
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamingEvent {
    MessageStart {
        message: MessageStartBody,
    },
    ContentBlockStart {
        content_block: ContentBlockStart,
    },
    ContentBlockDelta {
        delta: Delta,
    },
    ContentBlockStop {},
    MessageDelta {
        usage: Option<DeltaUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: Value,
    },
}

#[derive(Debug, Deserialize)]
struct MessageStartBody {
    #[serde(default)]
    usage: Option<StartUsage>,
}

#[derive(Debug, Deserialize)]
struct StartUsage {
    input_tokens: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockStart {
    Text {},
    Thinking {},
    ToolUse { id: String, name: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    SignatureDelta {},
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Deserialize)]
struct DeltaUsage {
    output_tokens: u64,
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> LlmResult<Chunk> {
        let mut stream = self.complete_streaming(request).await?;
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk?);
        }
        let (message, usage) = crate::chunk::aggregate(&chunks);
        Ok(Chunk { message, usage })
    }

    async fn complete_streaming(&self, request: &CompletionRequest<'_>) -> LlmResult<ChunkStream> {
        let body = self.build_request_body(request);
        debug!(model = request.model, url = %self.base_url, "starting anthropic stream");

        let response = send_with_retry(self.send_request(request)?.json(&body)).await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "anthropic request failed");
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimitExceeded { retry_after_secs: 60 });
            }
            return Err(LlmError::ApiRequestFailed(format!("HTTP {status}: {text}")));
        }

        let stream = try_stream! {
            let mut bytes_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut prompt_tokens = 0u64;
            let mut tool_id: Option<String> = None;
            let mut tool_name = String::new();
            let mut tool_args = String::new();

            while let Some(bytes) = bytes_stream.next().await {
                let bytes = bytes.map_err(LlmError::Http)?;
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(event_end) = buffer.find("\n\n") {
                    let event_data = buffer[..event_end].to_string();
                    let rest_start = event_end + 2;
                    buffer = buffer[rest_start..].to_string();

                    for line in event_data.lines() {
                        let Some(data) = line.strip_prefix("data: ") else { continue };
                        let Ok(event) = serde_json::from_str::<StreamingEvent>(data) else { continue };

                        match event {
                            StreamingEvent::MessageStart { message } => {
                                if let Some(usage) = message.usage {
                                    prompt_tokens = usage.input_tokens;
                                }
                            }
                            StreamingEvent::ContentBlockStart { content_block } => {
                                if let ContentBlockStart::ToolUse { id, name } = content_block {
                                    tool_id = Some(id);
                                    tool_name = name;
                                    tool_args.clear();
                                }
                            }
                            StreamingEvent::ContentBlockDelta { delta } => match delta {
                                Delta::TextDelta { text } => {
                                    yield Chunk {
                                        message: ChunkMessage { content: Some(text), ..Default::default() },
                                        usage: None,
                                    };
                                }
                                Delta::ThinkingDelta { thinking } => {
                                    yield Chunk {
                                        message: ChunkMessage {
                                            reasoning_content: Some(thinking),
                                            ..Default::default()
                                        },
                                        usage: None,
                                    };
                                }
                                Delta::InputJsonDelta { partial_json } => {
                                    tool_args.push_str(&partial_json);
                                }
                                Delta::SignatureDelta {} => {}
                            },
                            StreamingEvent::ContentBlockStop {} => {
                                if let Some(id) = tool_id.take() {
                                    let args = if tool_args.is_empty() { "{}" } else { tool_args.as_str() };
                                    yield Chunk {
                                        message: ChunkMessage {
                                            tool_calls: vec![ToolCall::new(id, tool_name.clone(), args)],
                                            ..Default::default()
                                        },
                                        usage: None,
                                    };
                                }
                            }
                            StreamingEvent::MessageDelta { usage } => {
                                if let Some(usage) = usage {
                                    yield Chunk {
                                        message: ChunkMessage::default(),
                                        usage: Some(Usage {
                                            prompt_tokens,
                                            completion_tokens: usage.output_tokens,
                                        }),
                                    };
                                }
                            }
                            StreamingEvent::MessageStop => return,
                            StreamingEvent::Ping => {}
                            StreamingEvent::Error { error: body } => {
                                error!(body = %body, "anthropic stream error event");
                                Err(LlmError::StreamingError(body.to_string()))?;
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    fn count_tokens(&self, _model: &str, messages: &[Message], _tools: &[crate::backend::ToolDefinition]) -> u64 {
        let chars: usize = messages
            .iter()
            .map(|m| m.content.as_deref().map_or(0, str::len))
            .sum();
        (chars / 4) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ToolDefinition;
    use std::collections::HashMap;

    fn request<'a>(messages: &'a [Message], tools: &'a [ToolDefinition]) -> CompletionRequest<'a> {
        CompletionRequest {
            model: "claude-sonnet-4",
            messages,
            tools,
            temperature: 0.5,
            max_tokens: None,
            tool_choice: ToolChoice::Auto,
            extra_headers: HashMap::new(),
        }
    }

    #[test]
    fn system_message_becomes_the_top_level_field() {
        let backend = AnthropicBackend::new("https://api.anthropic.com/v1/messages", Some("key".into()));
        let messages = vec![Message::system("You are terse."), Message::user("hi")];
        let body = backend.build_request_body(&request(&messages, &[]));
        assert_eq!(body["system"], "You are terse.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn assistant_tool_calls_become_tool_use_blocks() {
        let message = Message::assistant_with_tools(
            Some("Let me check.".to_string()),
            vec![ToolCall::new("toolu_1", "bash", r#"{"command": "ls"}"#)],
        );
        let converted = convert_message(&message);
        let blocks = converted["content"].as_array().unwrap();
        assert_eq!(blocks[0]["type"], "text");
        assert_eq!(blocks[1]["type"], "tool_use");
        assert_eq!(blocks[1]["id"], "toolu_1");
        assert_eq!(blocks[1]["input"]["command"], "ls");
    }

    #[test]
    fn tool_role_messages_become_user_side_tool_results() {
        let message = Message::tool_result("toolu_1", "bash", "a\nb\n");
        let converted = convert_message(&message);
        assert_eq!(converted["role"], "user");
        assert_eq!(converted["content"][0]["type"], "tool_result");
        assert_eq!(converted["content"][0]["tool_use_id"], "toolu_1");
    }

    #[tokio::test]
    async fn missing_api_key_is_rejected_before_any_request() {
        let backend = AnthropicBackend::new("https://api.anthropic.com/v1/messages", None);
        let messages = vec![Message::user("hi")];
        let err = backend.complete_streaming(&request(&messages, &[])).await.err().unwrap();
        assert!(matches!(err, LlmError::ApiKeyNotConfigured { .. }));
    }
}
