//! The agent loop: `act`, `compact`, `switch_agent`, `clear_history`,
//! `reload_with_initial_messages`.
//!
//! One `act()` call drives turns until the model stops asking for tools
//! or a middleware stops the loop, streaming typed `Event`s as it goes.
//! The event stream is produced with `async_stream::stream!` (the same
//! macro the chunk streams use), which lets the generator hold a
//! `&mut self` borrow across `yield` points without an indirection
//! through a channel and a driving task. The whole loop is one
//! cooperative coroutine, never a producer/consumer pair.

use std::path::PathBuf;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use kin_core::{
    tag, AgentProfile, AgentStats, ErrorTag, Event, FailedToolCall, Message, MiddlewareAction,
    ModelConfig, ParsedToolCall, RawArgValue, ReasoningMode, ResolvedToolCall, ToolCall,
};
use kin_llm::{CompletionRequest, LlmBackend, LlmClient, ToolChoice};
use kin_middleware::{MiddlewareContext, MiddlewarePipeline, ResetReason};
use kin_parser::{RawAssistantMessage, RawReasoningInput};
use kin_tools::{ApprovalCallback, DenyAllApproval, SubAgentSpawner, ToolContext, ToolManager, UserInputCallback};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeResult;
use crate::observer::{MessageObserver, NullObserver};
use crate::tool_runner::{render_failed_call, run_one_resolved_call, RunnerItem, ToolRunnerConfig};

const UTILITY_PROMPT_COMPACT: &str =
    "Summarize this conversation so far, preserving the goal, decisions made, and any \
     unresolved work, so it can continue from the summary alone.";

/// Batch size for chunk-to-event coalescing during a streaming turn.
const STREAM_BATCH_SIZE: usize = 5;

/// Everything [`AgentLoop::new`] needs. Fields with no sensible default
/// (profile, client, tool manager, workspace root) are required; the rest
/// fall back to permissive/no-op defaults via the builder-style `with_*`
/// methods on [`AgentLoop`] itself once constructed is the wrong
/// ergonomics for an init-time-only struct, so defaults live here instead.
pub struct AgentLoopConfig {
    /// The profile this loop runs under.
    pub agent_profile: AgentProfile,
    /// The bound LLM client.
    pub llm_client: LlmClient,
    /// Discovery-resolved, filtered tool set for this session.
    pub tool_manager: ToolManager,
    /// Root directory tool invocations are scoped to.
    pub workspace_root: PathBuf,
    /// Tool Runner policy (auto-approve, allow/deny patterns).
    pub runner_config: ToolRunnerConfig,
    /// Approval gate for `ToolPermission::Ask` calls. Defaults to
    /// [`DenyAllApproval`] if not overridden by the caller.
    pub approval_callback: Option<Arc<dyn ApprovalCallback>>,
    /// Mid-invocation user-input channel, if the frontend supports it.
    pub user_input_callback: Option<Arc<dyn UserInputCallback>>,
    /// Sub-agent spawning, wired in only for profiles allowed to use the
    /// `task` tool.
    pub agent_manager: Option<Arc<dyn SubAgentSpawner>>,
    /// Message-append sink. Defaults to [`NullObserver`].
    pub message_observer: Option<Arc<dyn MessageObserver>>,
    /// Whether to drive the LLM with `complete_streaming` (chunk-batched
    /// events) or `complete` (one call, one event).
    pub enable_streaming: bool,
    /// Middlewares to install, in order.
    pub middlewares: Vec<Box<dyn kin_middleware::Middleware>>,
    /// Pre-existing history to resume from. `None` starts a fresh session
    /// with just the system message.
    pub initial_messages: Option<Vec<Message>>,
}

/// Owns the conversation, stats, and every collaborator one session needs;
/// `act()` is the only way messages get appended once the loop starts.
pub struct AgentLoop {
    messages: Vec<Message>,
    stats: AgentStats,
    middleware_pipeline: MiddlewarePipeline,
    tool_manager: ToolManager,
    llm_client: LlmClient,
    agent_profile: AgentProfile,
    session_id: String,
    workspace_root: PathBuf,
    shared_cwd: Arc<RwLock<PathBuf>>,
    runner_config: ToolRunnerConfig,
    approval_callback: Arc<dyn ApprovalCallback>,
    user_input_callback: Option<Arc<dyn UserInputCallback>>,
    agent_manager: Option<Arc<dyn SubAgentSpawner>>,
    enable_streaming: bool,
    message_observer: Arc<dyn MessageObserver>,
    last_observed_index: usize,
}

impl AgentLoop {
    /// Build a fresh loop from `config`.
    #[must_use]
    pub fn new(config: AgentLoopConfig) -> Self {
        let messages = config.initial_messages.unwrap_or_else(|| {
            vec![Message::system(config.agent_profile.system_prompt.clone())]
        });

        let mut stats = AgentStats::default();
        stats.input_price_per_million = config.llm_client.model().prices.input_per_million;
        stats.output_price_per_million = config.llm_client.model().prices.output_per_million;
        if let Some(window) = config.llm_client.model().context_window {
            stats.max_context_window = window;
        }

        let mut middleware_pipeline = MiddlewarePipeline::new();
        for middleware in config.middlewares {
            middleware_pipeline.push(middleware);
        }

        Self {
            messages,
            stats,
            middleware_pipeline,
            tool_manager: config.tool_manager,
            llm_client: config.llm_client,
            shared_cwd: Arc::new(RwLock::new(config.workspace_root.clone())),
            workspace_root: config.workspace_root,
            runner_config: config.runner_config,
            approval_callback: config.approval_callback.unwrap_or_else(|| Arc::new(DenyAllApproval)),
            user_input_callback: config.user_input_callback,
            agent_manager: config.agent_manager,
            enable_streaming: config.enable_streaming,
            message_observer: config.message_observer.unwrap_or_else(|| Arc::new(NullObserver)),
            last_observed_index: 0,
            agent_profile: config.agent_profile,
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Read-only view of accumulated session statistics.
    #[must_use]
    pub fn stats(&self) -> &AgentStats {
        &self.stats
    }

    /// Read-only view of the current message history.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The active agent profile.
    #[must_use]
    pub fn agent_profile(&self) -> &AgentProfile {
        &self.agent_profile
    }

    /// The session id; rotated on compaction and on `clear_history`.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Alias of the model this loop currently drives.
    #[must_use]
    pub fn model_alias(&self) -> &str {
        &self.llm_client.model().alias
    }

    fn flush(&mut self) {
        while self.last_observed_index < self.messages.len() {
            self.message_observer.on_message(&self.messages[self.last_observed_index]);
            self.last_observed_index += 1;
        }
    }

    /// Drive one `act()` call: append `user_message_text`, run turns until
    /// the loop naturally ends (no tool calls and `after_turn` doesn't
    /// request more work), a middleware says STOP, or `cancel` fires.
    pub fn act<'a>(
        &'a mut self,
        user_message_text: &'a str,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Event> + 'a {
        async_stream::stream! {
            self.messages.push(Message::user(user_message_text));
            yield Event::User { content: user_message_text.to_string() };
            self.stats.steps += 1;
            tracing::debug!(session_id = %self.session_id, "act: user turn started");

            loop {
                kin_history::clean(&mut self.messages);

                let before = {
                    let ctx = MiddlewareContext {
                        messages: &self.messages,
                        stats: &self.stats,
                        agent_profile_name: &self.agent_profile.name,
                    };
                    self.middleware_pipeline.run_before_turn(&ctx)
                };
                match before.action {
                    Some(MiddlewareAction::Stop) => {
                        let text = tag(ErrorTag::KinStopEvent, before.reason.unwrap_or_default());
                        yield Event::Assistant { content: text, message_id: None, stopped_by_middleware: true };
                        self.flush();
                        return;
                    }
                    Some(MiddlewareAction::InjectMessage) => {
                        if let Some(text) = before.message {
                            splice_into_last(&mut self.messages, &text);
                        }
                    }
                    Some(MiddlewareAction::Compact) => {
                        let current = self.stats.context_tokens;
                        let threshold = before
                            .metadata
                            .get("threshold")
                            .and_then(serde_json::Value::as_u64)
                            .unwrap_or(0);
                        yield Event::CompactStart { current, threshold };
                        match self.compact().await {
                            Ok(_) => {}
                            Err(_) => { self.flush(); return; }
                        }
                        yield Event::CompactEnd { old: current, new: self.stats.context_tokens };
                    }
                    Some(MiddlewareAction::Continue) | None => {}
                }

                self.stats.steps += 1;

                let Some(turn) = self.drive_llm_turn(&cancel).await else {
                    self.flush();
                    return;
                };
                for event in turn.events {
                    yield event;
                }

                if cancel.is_cancelled() {
                    self.flush();
                    return;
                }

                if turn.parsed_tool_calls.is_empty() {
                    let after_result = {
                        let ctx = MiddlewareContext {
                            messages: &self.messages,
                            stats: &self.stats,
                            agent_profile_name: &self.agent_profile.name,
                        };
                        self.middleware_pipeline.run_after_turn(&ctx)
                    };
                    match after_result {
                        Ok(after) => match after.action {
                            Some(MiddlewareAction::Stop) => {
                                let text = tag(ErrorTag::KinStopEvent, after.reason.unwrap_or_default());
                                yield Event::Assistant { content: text, message_id: None, stopped_by_middleware: true };
                            }
                            Some(MiddlewareAction::Compact) => {
                                let current = self.stats.context_tokens;
                                yield Event::CompactStart { current, threshold: current };
                                let _ = self.compact().await;
                                yield Event::CompactEnd { old: current, new: self.stats.context_tokens };
                            }
                            Some(MiddlewareAction::Continue) | Some(MiddlewareAction::InjectMessage) | None => {}
                        },
                        // A middleware bug, not a model or user failure;
                        // surface it as a terminal stop rather than
                        // dropping it on the floor.
                        Err(e) => {
                            let text = tag(ErrorTag::KinStopEvent, e.to_string());
                            yield Event::Assistant { content: text, message_id: None, stopped_by_middleware: true };
                        }
                    }
                    break;
                }

                let (resolved, failed) = resolve_tool_calls(&turn.parsed_tool_calls, &self.tool_manager);

                for failed_call in &failed {
                    let (event, message) = render_failed_call(failed_call);
                    self.stats.tool_calls_failed += 1;
                    self.messages.push(message);
                    yield event;
                }

                let mut cancelled_during_tool = false;
                for call in &resolved {
                    let tool_ctx = ToolContext::with_shared_cwd(
                        self.workspace_root.clone(),
                        Arc::clone(&self.shared_cwd),
                        call.call_id.clone(),
                    );
                    let mut tool_ctx = tool_ctx.with_approval(Arc::clone(&self.approval_callback));
                    if let Some(mgr) = &self.agent_manager {
                        tool_ctx = tool_ctx.with_agent_manager(Arc::clone(mgr));
                    }
                    tool_ctx.user_input_callback = self.user_input_callback.clone();

                    let mut call_stream = run_one_resolved_call(
                        call,
                        &self.tool_manager,
                        &tool_ctx,
                        &self.runner_config,
                        &self.agent_profile,
                        &self.approval_callback,
                        &cancel,
                    );
                    while let Some(item) = call_stream.next().await {
                        match item {
                            RunnerItem::Emit(event) => yield event,
                            RunnerItem::Append(message) => self.messages.push(message),
                            RunnerItem::Outcome(outcome) => {
                                if outcome.agreed { self.stats.tool_calls_agreed += 1; }
                                if outcome.rejected { self.stats.tool_calls_rejected += 1; }
                                if outcome.succeeded { self.stats.tool_calls_succeeded += 1; }
                                if outcome.failed { self.stats.tool_calls_failed += 1; }
                                if outcome.cancelled { cancelled_during_tool = true; }
                            }
                        }
                    }
                    if cancelled_during_tool {
                        break;
                    }
                }

                if cancelled_during_tool {
                    self.flush();
                    return;
                }

                self.flush();
            }

            self.flush();
        }
    }

    async fn drive_llm_turn(&mut self, cancel: &CancellationToken) -> Option<TurnOutcome> {
        let model_name = self.llm_client.model().name.clone();
        let temperature = self.llm_client.model().temperature;
        let tool_call_format = self.llm_client.model().tool_call_format;
        let reasoning_mode = self.llm_client.model().reasoning.mode.unwrap_or(ReasoningMode::Strip);
        let tool_defs = self.tool_manager.schemas_for_llm();
        let tool_choice = if tool_defs.is_empty() { ToolChoice::None } else { ToolChoice::Auto };
        let message_id = uuid::Uuid::new_v4().to_string();

        let mut events = Vec::new();

        let (content, reasoning_content, tool_calls) = if self.enable_streaming {
            let request = CompletionRequest {
                model: &model_name,
                messages: &self.messages,
                tools: &tool_defs,
                temperature,
                max_tokens: None,
                tool_choice,
                extra_headers: std::collections::HashMap::new(),
            };
            let started = std::time::Instant::now();
            let stream = match self.llm_client.complete_streaming(request).await {
                Ok(s) => s,
                Err(e) => {
                    events.push(terminal_error_event(&e.to_string()));
                    return Some(TurnOutcome { events, parsed_tool_calls: Vec::new() });
                }
            };
            tokio::pin!(stream);

            let mut chunks = Vec::new();
            let mut content_buf = String::new();
            let mut content_count = 0usize;
            let mut reasoning_buf = String::new();
            let mut reasoning_count = 0usize;
            let mut last_was_reasoning = false;

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => { break; }
                    next = stream.next() => {
                        let Some(chunk) = next else { break };
                        let chunk = match chunk {
                            Ok(c) => c,
                            Err(e) => {
                                events.push(terminal_error_event(&e.to_string()));
                                return Some(TurnOutcome { events, parsed_tool_calls: Vec::new() });
                            }
                        };

                        if let Some(r) = chunk.message.reasoning_content.clone() {
                            if !last_was_reasoning && !content_buf.is_empty() {
                                events.push(Event::Assistant {
                                    content: std::mem::take(&mut content_buf),
                                    message_id: Some(message_id.clone()),
                                    stopped_by_middleware: false,
                                });
                                content_count = 0;
                            }
                            reasoning_buf.push_str(&r);
                            reasoning_count += 1;
                            last_was_reasoning = true;
                            if reasoning_count >= STREAM_BATCH_SIZE {
                                events.push(Event::Reasoning { content: std::mem::take(&mut reasoning_buf) });
                                reasoning_count = 0;
                            }
                        }
                        if let Some(c) = chunk.message.content.clone() {
                            if last_was_reasoning && !reasoning_buf.is_empty() {
                                events.push(Event::Reasoning { content: std::mem::take(&mut reasoning_buf) });
                                reasoning_count = 0;
                            }
                            content_buf.push_str(&c);
                            content_count += 1;
                            last_was_reasoning = false;
                            if content_count >= STREAM_BATCH_SIZE {
                                events.push(Event::Assistant {
                                    content: std::mem::take(&mut content_buf),
                                    message_id: Some(message_id.clone()),
                                    stopped_by_middleware: false,
                                });
                                content_count = 0;
                            }
                        }
                        chunks.push(chunk);
                    }
                }
            }

            if !reasoning_buf.is_empty() {
                events.push(Event::Reasoning { content: reasoning_buf });
            }
            if !content_buf.is_empty() {
                events.push(Event::Assistant {
                    content: content_buf,
                    message_id: Some(message_id.clone()),
                    stopped_by_middleware: false,
                });
            }

            let (final_message, usage) = kin_llm::aggregate(&chunks);
            self.llm_client.record_stream_stats(
                &mut self.stats,
                &kin_llm::Chunk { message: final_message.clone(), usage },
                started,
            );
            (final_message.content, final_message.reasoning_content, final_message.tool_calls)
        } else {
            let request = CompletionRequest {
                model: &model_name,
                messages: &self.messages,
                tools: &tool_defs,
                temperature,
                max_tokens: None,
                tool_choice,
                extra_headers: std::collections::HashMap::new(),
            };
            let chunk = match self.llm_client.complete(request, &mut self.stats).await {
                Ok(c) => c,
                Err(e) => {
                    events.push(terminal_error_event(&e.to_string()));
                    return Some(TurnOutcome { events, parsed_tool_calls: Vec::new() });
                }
            };
            // Events for this branch are emitted below, once extraction
            // has stripped think tags and XML tool calls out of the text.
            (chunk.message.content, chunk.message.reasoning_content, chunk.message.tool_calls)
        };

        let mut content = content;
        let mut reasoning_content = reasoning_content;
        if reasoning_content.is_none() {
            let input = RawReasoningInput {
                content: content.as_deref(),
                reasoning_details: None,
                named_field_value: None,
            };
            let extraction = kin_parser::extract_reasoning(&input, reasoning_mode);
            reasoning_content = extraction.reasoning_content;
            if let Some(cleaned) = extraction.cleaned_content {
                content = Some(cleaned);
            }
        }

        let raw = RawAssistantMessage {
            content: content.clone(),
            api_tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        };
        let extraction = kin_parser::extract_tool_calls(tool_call_format, &raw, true);
        if let Some(modified) = extraction.modified_content {
            content = Some(modified);
        }

        // The streaming path already emitted its batched events while the
        // chunks arrived (necessarily with the raw text). A non-streaming
        // call emits only here, after extraction, so its Assistant event
        // carries the stripped content rather than the tagged text — and
        // exactly one Reasoning/Assistant event per populated field, even
        // an empty one, since there's no later chunk to fold it into.
        if !self.enable_streaming {
            if let Some(r) = &reasoning_content {
                events.push(Event::Reasoning { content: r.clone() });
            }
            if let Some(c) = &content {
                events.push(Event::Assistant {
                    content: c.clone(),
                    message_id: Some(message_id.clone()),
                    stopped_by_middleware: false,
                });
            }
        }

        let core_tool_calls: Vec<ToolCall> = extraction.tool_calls.iter().map(parsed_to_core_tool_call).collect();

        let assistant_msg = Message {
            id: message_id,
            role: kin_core::Role::Assistant,
            content,
            reasoning_content,
            tool_calls: (!core_tool_calls.is_empty()).then_some(core_tool_calls),
            tool_call_id: None,
            tool_name: None,
        };
        self.messages.push(assistant_msg);

        Some(TurnOutcome { events, parsed_tool_calls: extraction.tool_calls })
    }

    /// Conservative summarization of the entire history: ask the model
    /// for a summary, then replace everything but the system message
    /// with it.
    ///
    /// # Errors
    ///
    /// Returns the underlying LLM error if the summarization call fails.
    pub async fn compact(&mut self) -> RuntimeResult<String> {
        kin_history::clean(&mut self.messages);
        self.flush();

        self.messages.push(Message::user(UTILITY_PROMPT_COMPACT));

        let model_name = self.llm_client.model().name.clone();
        let temperature = self.llm_client.model().temperature;
        let request = CompletionRequest {
            model: &model_name,
            messages: &self.messages,
            tools: &[],
            temperature,
            max_tokens: None,
            tool_choice: ToolChoice::None,
            extra_headers: std::collections::HashMap::new(),
        };
        let chunk = self.llm_client.complete(request, &mut self.stats).await?;
        let summary = chunk.message.content.unwrap_or_default();
        tracing::info!(session_id = %self.session_id, "compacted conversation history");

        let system_text = self.messages[0].content.clone().unwrap_or_default();
        self.messages = vec![Message::system(system_text), Message::user(summary.clone())];
        self.stats.context_tokens = self.llm_client.count_tokens(&self.messages, &[]);
        self.session_id = uuid::Uuid::new_v4().to_string();
        self.middleware_pipeline.reset(ResetReason::Compact);
        self.tool_manager.reset_all();
        self.last_observed_index = 0;
        self.flush();

        Ok(summary)
    }

    /// Switch to `new_profile` if different from the current one, then
    /// reload (system prompt, tools, prices); preserves history.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if reload fails.
    pub async fn switch_agent(&mut self, new_profile: AgentProfile) -> RuntimeResult<()> {
        if new_profile.name != self.agent_profile.name {
            self.agent_profile = new_profile;
            self.reload_with_initial_messages(None, None).await?;
        }
        Ok(())
    }

    /// Persist, then keep only the system message, reset stats (preserving
    /// prices), reset middleware, reset tools, rotate the session id.
    pub fn clear_history(&mut self) {
        self.flush();
        self.messages.truncate(1);
        self.stats.reset_preserving_prices();
        self.middleware_pipeline.reset(ResetReason::Stop);
        self.tool_manager.reset_all();
        self.session_id = uuid::Uuid::new_v4().to_string();
        self.last_observed_index = 0;
    }

    /// Rebuild the tool set, recompute and swap in the system prompt,
    /// refresh prices/context-window, optionally swap the model or the
    /// middleware pipeline, and re-notify the observer of the full
    /// history. This crate doesn't own a config type, so the caller
    /// (which does) constructs the replacement model/pipeline and hands
    /// it in.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if switching the model backend fails.
    pub async fn reload_with_initial_messages(
        &mut self,
        new_model: Option<(Arc<dyn LlmBackend>, ModelConfig)>,
        new_middleware_pipeline: Option<MiddlewarePipeline>,
    ) -> RuntimeResult<()> {
        self.flush();
        self.tool_manager.reset_all();
        kin_history::replace_system_message(&mut self.messages, self.agent_profile.system_prompt.clone());

        if let Some((backend, model)) = new_model {
            self.llm_client.switch_model(backend, model).await?;
        }
        if let Some(pipeline) = new_middleware_pipeline {
            self.middleware_pipeline = pipeline;
        }

        self.stats.input_price_per_million = self.llm_client.model().prices.input_per_million;
        self.stats.output_price_per_million = self.llm_client.model().prices.output_per_million;
        if let Some(window) = self.llm_client.model().context_window {
            self.stats.max_context_window = window;
        }
        self.stats.context_tokens = self.llm_client.count_tokens(&self.messages, &[]);

        self.last_observed_index = 0;
        self.flush();
        Ok(())
    }
}

struct TurnOutcome {
    events: Vec<Event>,
    parsed_tool_calls: Vec<ParsedToolCall>,
}

fn terminal_error_event(text: &str) -> Event {
    Event::Assistant {
        content: tag(ErrorTag::ToolError, text),
        message_id: None,
        stopped_by_middleware: true,
    }
}

fn splice_into_last(messages: &mut [Message], text: &str) {
    let Some(last) = messages.last_mut() else { return };
    last.content = Some(match &last.content {
        Some(existing) if !existing.is_empty() => format!("{existing}\n\n{text}"),
        _ => text.to_string(),
    });
}

fn raw_arg_to_value(v: &RawArgValue) -> Value {
    match v {
        RawArgValue::Text(s) => Value::String(s.clone()),
        RawArgValue::Json(j) => j.clone(),
    }
}

fn parsed_to_core_tool_call(p: &ParsedToolCall) -> ToolCall {
    let args: serde_json::Map<String, Value> =
        p.raw_args.iter().map(|(k, v)| (k.clone(), raw_arg_to_value(v))).collect();
    ToolCall::new(p.call_id.clone(), p.tool_name.clone(), Value::Object(args).to_string())
}

fn resolve_tool_calls(
    parsed: &[ParsedToolCall],
    tool_manager: &ToolManager,
) -> (Vec<ResolvedToolCall>, Vec<FailedToolCall>) {
    let mut resolved = Vec::new();
    let mut failed = Vec::new();
    for pc in parsed {
        let Some(tool) = tool_manager.get(&pc.tool_name) else {
            failed.push(FailedToolCall {
                call_id: pc.call_id.clone(),
                tool_name: pc.tool_name.clone(),
                error: format!("unknown tool: {}", pc.tool_name),
            });
            continue;
        };
        let raw_args_value: Value =
            Value::Object(pc.raw_args.iter().map(|(k, v)| (k.clone(), raw_arg_to_value(v))).collect());
        match tool.validate(&raw_args_value) {
            Ok(validated) => resolved.push(ResolvedToolCall {
                tool_class: pc.tool_name.clone(),
                call_id: pc.call_id.clone(),
                validated_args: validated,
            }),
            Err(e) => failed.push(FailedToolCall {
                call_id: pc.call_id.clone(),
                tool_name: pc.tool_name.clone(),
                error: e.to_string(),
            }),
        }
    }
    (resolved, failed)
}
