//! An OpenAI-compatible chat-completions backend.
//!
//! Speaks the SSE streaming wire format and folds the deltas into this
//! crate's additive [`Chunk`] shape: content and reasoning fragments are
//! yielded as they arrive, tool-call argument deltas accumulate until a
//! new call id or a finish reason flushes them as one complete call.

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

/// A backend speaking the OpenAI chat-completions wire format, usable
/// against OpenAI itself or any compatible endpoint (LM Studio, vLLM,
/// Ollama).
pub struct OpenAiCompatBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatBackend {
    /// Construct a backend pointed at `base_url`, authenticating with
    /// `api_key` if given (local endpoints typically need none).
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn build_request_body(&self, request: &CompletionRequest<'_>) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(convert_message).collect();
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "stream": true,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = Value::from(max_tokens);
        }
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.input_schema,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = match &request.tool_choice {
                ToolChoice::Auto => Value::String("auto".to_string()),
                ToolChoice::None => Value::String("none".to_string()),
                ToolChoice::Named(name) => serde_json::json!({
                    "type": "function",
                    "function": { "name": name },
                }),
            };
        }
        body
    }

    fn send_request(&self, request: &CompletionRequest<'_>) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(&self.base_url)
            .header("content-type", "application/json");
        if let Some(api_key) = &self.api_key {
            let mut header = reqwest::header::HeaderValue::try_from(format!("Bearer {api_key}"))
                .unwrap_or_else(|_| reqwest::header::HeaderValue::from_static(""));
            header.set_sensitive(true);
            builder = builder.header("authorization", header);
        }
        for (key, value) in &request.extra_headers {
            builder = builder.header(key, value);
        }
        builder
    }
}

fn convert_message(message: &Message) -> Value {
    match message.role {
        Role::System => serde_json::json!({"role": "system", "content": message.content}),
        Role::User => serde_json::json!({"role": "user", "content": message.content}),
        Role::Tool => serde_json::json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id,
            "content": message.content,
        }),
        Role::Assistant => {
            let mut value = serde_json::json!({
                "role": "assistant",
                "content": message.content,
            });
            if let Some(tool_calls) = &message.tool_calls {
                let calls: Vec<Value> = tool_calls
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "id": c.id,
                            "type": "function",
                            "function": {
                                "name": c.function_name,
                                "arguments": c.arguments_json_text,
                            },
                        })
                    })
                    .collect();
                value["tool_calls"] = Value::Array(calls);
            }
            value
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamEventBody {
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[async_trait]
impl LlmBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        "openai-compat"
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
        if self.api_key.as_deref().is_none_or(str::is_empty) && !is_local_url(&self.base_url) {
            return Err(LlmError::ApiKeyNotConfigured {
                provider: self.name().to_string(),
            });
        }

        let body = self.build_request_body(request);
        debug!(model = request.model, url = %self.base_url, "starting openai-compat stream");

        let response = crate::retry::send_with_retry(self.send_request(request).json(&body)).await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "openai-compat request failed");
            return Err(LlmError::ApiRequestFailed(format!("HTTP {status}: {text}")));
        }

        let stream = try_stream! {
            let mut bytes_stream = response.bytes_stream();
            let mut buffer = String::new();
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
                        if data.trim() == "[DONE]" {
                            if let Some(id) = tool_id.take() {
                                yield Chunk {
                                    message: ChunkMessage {
                                        tool_calls: vec![ToolCall::new(id, tool_name.clone(), tool_args.clone())],
                                        ..Default::default()
                                    },
                                    usage: None,
                                };
                            }
                            return;
                        }

                        let Ok(event) = serde_json::from_str::<StreamEventBody>(data) else { continue };
                        let Some(choice) = event.choices.first() else { continue };

                        if choice.delta.content.is_some() || choice.delta.reasoning_content.is_some() {
                            yield Chunk {
                                message: ChunkMessage {
                                    content: choice.delta.content.clone(),
                                    reasoning_content: choice.delta.reasoning_content.clone(),
                                    tool_calls: Vec::new(),
                                },
                                usage: None,
                            };
                        }

                        if let Some(deltas) = &choice.delta.tool_calls {
                            for delta in deltas {
                                if delta.id.is_some() {
                                    if let Some(id) = tool_id.take() {
                                        yield Chunk {
                                            message: ChunkMessage {
                                                tool_calls: vec![ToolCall::new(id, tool_name.clone(), tool_args.clone())],
                                                ..Default::default()
                                            },
                                            usage: None,
                                        };
                                    }
                                    tool_id = delta.id.clone();
                                    tool_name.clear();
                                    tool_args.clear();
                                }
                                if let Some(function) = &delta.function {
                                    if let Some(name) = &function.name {
                                        tool_name.push_str(name);
                                    }
                                    if let Some(args) = &function.arguments {
                                        tool_args.push_str(args);
                                    }
                                }
                            }
                        }

                        if choice.finish_reason.is_some() {
                            if let Some(id) = tool_id.take() {
                                yield Chunk {
                                    message: ChunkMessage {
                                        tool_calls: vec![ToolCall::new(id, tool_name.clone(), tool_args.clone())],
                                        ..Default::default()
                                    },
                                    usage: None,
                                };
                            }
                            if let Some(usage) = &event.usage {
                                yield Chunk {
                                    message: ChunkMessage::default(),
                                    usage: Some(Usage {
                                        prompt_tokens: usage.prompt_tokens,
                                        completion_tokens: usage.completion_tokens,
                                    }),
                                };
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

fn is_local_url(url: &str) -> bool {
    url.contains("localhost") || url.contains("127.0.0.1")
}
