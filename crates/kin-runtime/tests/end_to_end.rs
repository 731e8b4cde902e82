//! Black-box scenarios for `AgentLoop::act`, one per state-machine path the
//! loop can take: plain reply, a tool round-trip, XML-extracted tool
//! calls, a middleware stop, auto-compaction, cancellation mid-tool, and
//! the chunk-batched streaming turn.
//!
//! The backend is a small scripted stand-in (queued [`Chunk`]s, one per
//! `complete` call) rather than a real provider, matching the stub used in
//! `kin-llm`'s own client tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use kin_core::{AgentProfile, Event, Message, ModelConfig, Prices, ReasoningConfig, Role, ToolCall, ToolCallFormat};
use kin_llm::{Chunk, ChunkMessage, ChunkStream, CompletionRequest, LlmBackend, LlmClient, LlmResult, ToolDefinition, Usage};
use kin_middleware::{AutoCompact, TurnLimit};
use kin_runtime::{AgentLoop, AgentLoopConfig, ToolRunnerConfig};
use kin_tools::{ApprovalCallback, ApprovalDecision, Pattern, ToolManager, ToolManagerConfig};
use tokio_util::sync::CancellationToken;

struct ScriptedBackend {
    responses: Mutex<VecDeque<Chunk>>,
    token_counts: Mutex<VecDeque<u64>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<Chunk>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            token_counts: Mutex::new(VecDeque::new()),
        }
    }

    fn with_token_counts(responses: Vec<Chunk>, token_counts: Vec<u64>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            token_counts: Mutex::new(token_counts.into()),
        }
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _request: &CompletionRequest<'_>) -> LlmResult<Chunk> {
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn complete_streaming(&self, _request: &CompletionRequest<'_>) -> LlmResult<ChunkStream> {
        unimplemented!("these scenarios only exercise the non-streaming path")
    }

    fn count_tokens(&self, _model: &str, _messages: &[Message], _tools: &[ToolDefinition]) -> u64 {
        self.token_counts.lock().unwrap().pop_front().unwrap_or(0)
    }
}

fn test_model(format: ToolCallFormat) -> ModelConfig {
    ModelConfig {
        name: "test-model".to_string(),
        provider_ref: "test".to_string(),
        alias: "test".to_string(),
        temperature: 0.0,
        top_p: None,
        reasoning: ReasoningConfig::default(),
        tool_call_format: format,
        context_window: Some(1000),
        prices: Prices::default(),
    }
}

fn text_chunk(text: &str) -> Chunk {
    Chunk {
        message: ChunkMessage { content: Some(text.to_string()), ..Default::default() },
        usage: Some(Usage { prompt_tokens: 5, completion_tokens: 5 }),
    }
}

fn tool_call_chunk(content: &str, name: &str, args_json: &str) -> Chunk {
    Chunk {
        message: ChunkMessage {
            content: Some(content.to_string()),
            reasoning_content: None,
            tool_calls: vec![ToolCall::new("call_1", name, args_json)],
        },
        usage: Some(Usage { prompt_tokens: 5, completion_tokens: 5 }),
    }
}

fn base_config(backend: Arc<dyn LlmBackend>, model: ModelConfig, workspace: std::path::PathBuf) -> AgentLoopConfig {
    AgentLoopConfig {
        agent_profile: AgentProfile::primary("default", "You are a helpful assistant."),
        llm_client: LlmClient::new(backend, model, "test-session"),
        tool_manager: ToolManager::new(&ToolManagerConfig::default()),
        workspace_root: workspace,
        runner_config: ToolRunnerConfig { auto_approve: true, ..Default::default() },
        approval_callback: None,
        user_input_callback: None,
        agent_manager: None,
        message_observer: None,
        enable_streaming: false,
        middlewares: Vec::new(),
        initial_messages: None,
    }
}

#[tokio::test]
async fn echo_scenario() {
    let backend = Arc::new(ScriptedBackend::new(vec![text_chunk("hi")]));
    let config = base_config(backend, test_model(ToolCallFormat::Api), std::env::temp_dir());
    let mut agent = AgentLoop::new(config);

    let events: Vec<Event> = {
        let stream = agent.act("hello", CancellationToken::new());
        stream.collect().await
    };

    assert!(matches!(&events[0], Event::User { content } if content == "hello"));
    assert!(matches!(
        &events[1],
        Event::Assistant { content, stopped_by_middleware, .. }
            if content == "hi" && !stopped_by_middleware
    ));
    assert_eq!(events.len(), 2);
    assert_eq!(agent.messages().len(), 3);
    assert_eq!(agent.stats().steps, 2);
}

#[tokio::test]
async fn single_shell_tool_scenario() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        tool_call_chunk("", "bash", r#"{"command": "printf 'a\nb\n'"}"#),
        text_chunk("Found a and b."),
    ]));
    let config = base_config(backend, test_model(ToolCallFormat::Api), std::env::temp_dir());
    let mut agent = AgentLoop::new(config);

    let events: Vec<Event> = {
        let stream = agent.act("list files", CancellationToken::new());
        stream.collect().await
    };

    assert!(matches!(&events[0], Event::User { .. }));
    assert!(matches!(&events[1], Event::Assistant { content, .. } if content.is_empty()));
    assert!(matches!(&events[2], Event::ToolCall { tool_name, .. } if tool_name == "bash"));
    let tool_result_ok = events.iter().any(|e| matches!(e, Event::ToolResult { result: Some(_), error: None, .. }));
    assert!(tool_result_ok, "expected a successful ToolResult among {events:?}");
    let final_event = events.last().unwrap();
    assert!(matches!(final_event, Event::Assistant { content, .. } if content == "Found a and b."));

    assert_eq!(agent.messages().len(), 5);
    assert_eq!(agent.messages()[4].role, Role::Assistant);
}

#[tokio::test]
async fn xml_only_tool_call_scenario() {
    let workspace = std::env::temp_dir().join(format!("kin-runtime-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&workspace).unwrap();
    std::fs::write(workspace.join("x.py"), "print('hi')\n").unwrap();

    let content = "Let me look.\n<function=read_file><parameter=file_path>x.py</parameter></function>";
    let backend = Arc::new(ScriptedBackend::new(vec![text_chunk(content), text_chunk("It prints hi.")]));
    let config = base_config(backend, test_model(ToolCallFormat::Xml), workspace.clone());
    let mut agent = AgentLoop::new(config);

    let events: Vec<Event> = {
        let stream = agent.act("check x.py", CancellationToken::new());
        stream.collect().await
    };

    let assistant_event = events
        .iter()
        .find(|e| matches!(e, Event::Assistant { content, .. } if content == "Let me look."));
    assert!(assistant_event.is_some(), "expected the stripped XML content among {events:?}");

    let tool_call_event = events.iter().find_map(|e| match e {
        Event::ToolCall { tool_name, call_id, .. } => Some((tool_name.clone(), call_id.clone())),
        _ => None,
    });
    let (tool_name, call_id) = tool_call_event.expect("expected one ToolCall event");
    assert_eq!(tool_name, "read_file");
    assert!(call_id.starts_with("xml_"));
    assert_eq!(call_id.len(), "xml_".len() + 12);

    std::fs::remove_dir_all(&workspace).ok();
}

#[tokio::test]
async fn turn_limit_scenario() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        tool_call_chunk("", "bash", r#"{"command": "true"}"#),
        tool_call_chunk("", "bash", r#"{"command": "true"}"#),
    ]));
    let mut config = base_config(backend, test_model(ToolCallFormat::Api), std::env::temp_dir());
    config.middlewares.push(Box::new(TurnLimit::new(1)));
    let mut agent = AgentLoop::new(config);

    let events: Vec<Event> = {
        let stream = agent.act("keep going", CancellationToken::new());
        stream.collect().await
    };

    let stopped = events.iter().find(|e| {
        matches!(e, Event::Assistant { stopped_by_middleware: true, content, .. }
            if content.contains("<kin_stop_event>Turn limit of 1 reached</kin_stop_event>"))
    });
    assert!(stopped.is_some(), "expected a middleware stop event among {events:?}");
}

#[tokio::test]
async fn auto_compact_scenario() {
    // First turn pushes `context_tokens` to 950 via its own usage, which is
    // what the second turn's before-turn check reads.
    let backend = Arc::new(ScriptedBackend::with_token_counts(
        vec![
            Chunk {
                message: ChunkMessage { content: Some("ok".to_string()), ..Default::default() },
                usage: Some(Usage { prompt_tokens: 900, completion_tokens: 50 }),
            },
            text_chunk("SUMMARY"),
            text_chunk("got it"),
        ],
        vec![50],
    ));
    let mut config = base_config(backend, test_model(ToolCallFormat::Api), std::env::temp_dir());
    config.middlewares.push(Box::new(AutoCompact::new(0.9, 1000, None)));
    let mut agent = AgentLoop::new(config);

    {
        let stream = agent.act("hi", CancellationToken::new());
        let _: Vec<Event> = stream.collect().await;
    }
    assert_eq!(agent.stats().context_tokens, 950);

    let events: Vec<Event> = {
        let stream = agent.act("hi again", CancellationToken::new());
        stream.collect().await
    };

    let start = events.iter().find_map(|e| match e {
        Event::CompactStart { current, threshold } => Some((*current, *threshold)),
        _ => None,
    });
    assert_eq!(start, Some((950, 900)));

    let end = events.iter().find_map(|e| match e {
        Event::CompactEnd { old, new } => Some((*old, *new)),
        _ => None,
    });
    assert_eq!(end, Some((950, 50)));

    // Compaction replaces the whole history, discarding the pending
    // "hi again" user message; the turn that follows it lands on top.
    assert_eq!(agent.messages().len(), 3);
    assert_eq!(agent.messages()[1].content.as_deref(), Some("SUMMARY"));
    assert_eq!(agent.messages()[2].content.as_deref(), Some("got it"));
}

#[tokio::test]
async fn user_cancel_during_tool_scenario() {
    let backend = Arc::new(ScriptedBackend::new(vec![tool_call_chunk(
        "",
        "bash",
        r#"{"command": "sleep 0.1 && echo done"}"#,
    )]));
    let config = base_config(backend, test_model(ToolCallFormat::Api), std::env::temp_dir());
    let mut agent = AgentLoop::new(config);
    let cancel = CancellationToken::new();

    let mut events = Vec::new();
    {
        let stream = agent.act("run it", cancel.clone());
        tokio::pin!(stream);
        while let Some(event) = stream.next().await {
            let is_tool_call = matches!(event, Event::ToolCall { .. });
            events.push(event);
            if is_tool_call {
                cancel.cancel();
            }
        }
    }

    let cancelled_result = events.iter().find(|e| {
        matches!(e, Event::ToolResult { error: Some(err), .. } if err.contains("<user_cancellation>"))
    });
    assert!(cancelled_result.is_some(), "expected a cancelled ToolResult among {events:?}");

    // A second `act` call starts cleanly: `History.clean()` must be a no-op
    // on history left behind by the cancelled call.
    let before_ids: Vec<String> = agent.messages().iter().map(|m| m.id.clone()).collect();
    let events2: Vec<Event> = {
        let stream = agent.act("are you there", CancellationToken::new());
        stream.collect().await
    };
    assert!(events2.iter().any(|e| matches!(e, Event::User { .. })));
    let after_ids: Vec<String> = agent.messages().iter().map(|m| m.id.clone()).take(before_ids.len()).collect();
    assert_eq!(after_ids, before_ids, "History.clean() must not alter history left by a cancelled call");
}

#[tokio::test]
async fn denylist_skip_reports_plain_feedback() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        tool_call_chunk("", "bash", r#"{"command": "rm -rf /"}"#),
        text_chunk("understood"),
    ]));
    let mut config = base_config(backend, test_model(ToolCallFormat::Api), std::env::temp_dir());
    config.runner_config = ToolRunnerConfig {
        auto_approve: false,
        denylists: HashMap::from([("bash".to_string(), vec![Pattern::parse("rm *").unwrap()])]),
        ..Default::default()
    };
    let mut agent = AgentLoop::new(config);

    let events: Vec<Event> = {
        let stream = agent.act("delete everything", CancellationToken::new());
        stream.collect().await
    };

    let reason = events
        .iter()
        .find_map(|e| match e {
            Event::ToolResult { skipped: true, skip_reason: Some(reason), .. } => Some(reason.clone()),
            _ => None,
        })
        .expect("expected a skipped ToolResult");
    assert!(reason.contains("denylisted"), "got {reason:?}");
    assert!(!reason.contains("<user_cancellation>"), "policy denial must not be tagged as a user cancellation: {reason:?}");
}

struct SilentReject;

#[async_trait]
impl ApprovalCallback for SilentReject {
    async fn approve(&self, _tool_name: &str, _args_json: &str, _call_id: &str) -> ApprovalDecision {
        ApprovalDecision::No { feedback: None }
    }
}

#[tokio::test]
async fn bare_user_rejection_reports_the_tagged_default() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        tool_call_chunk("", "bash", r#"{"command": "true"}"#),
        text_chunk("understood"),
    ]));
    let mut config = base_config(backend, test_model(ToolCallFormat::Api), std::env::temp_dir());
    config.runner_config = ToolRunnerConfig::default();
    config.approval_callback = Some(Arc::new(SilentReject));
    let mut agent = AgentLoop::new(config);

    let events: Vec<Event> = {
        let stream = agent.act("run it", CancellationToken::new());
        stream.collect().await
    };

    let reason = events
        .iter()
        .find_map(|e| match e {
            Event::ToolResult { skipped: true, skip_reason: Some(reason), .. } => Some(reason.clone()),
            _ => None,
        })
        .expect("expected a skipped ToolResult");
    assert!(reason.contains("<user_cancellation>"), "got {reason:?}");
    assert_eq!(agent.stats().tool_calls_rejected, 1);
}

struct StreamingScriptedBackend {
    streams: Mutex<VecDeque<Vec<Chunk>>>,
}

impl StreamingScriptedBackend {
    fn new(streams: Vec<Vec<Chunk>>) -> Self {
        Self {
            streams: Mutex::new(streams.into()),
        }
    }
}

#[async_trait]
impl LlmBackend for StreamingScriptedBackend {
    fn name(&self) -> &str {
        "streaming-scripted"
    }

    async fn complete(&self, _request: &CompletionRequest<'_>) -> LlmResult<Chunk> {
        unimplemented!("these scenarios only exercise the streaming path")
    }

    async fn complete_streaming(&self, _request: &CompletionRequest<'_>) -> LlmResult<ChunkStream> {
        let chunks = self.streams.lock().unwrap().pop_front().unwrap_or_default();
        Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
    }

    fn count_tokens(&self, _model: &str, _messages: &[Message], _tools: &[ToolDefinition]) -> u64 {
        0
    }
}

fn content_chunk(text: &str, usage: Option<Usage>) -> Chunk {
    Chunk {
        message: ChunkMessage { content: Some(text.to_string()), ..Default::default() },
        usage,
    }
}

fn reasoning_chunk(text: &str) -> Chunk {
    Chunk {
        message: ChunkMessage { reasoning_content: Some(text.to_string()), ..Default::default() },
        usage: None,
    }
}

fn streaming_config(streams: Vec<Vec<Chunk>>, model: ModelConfig) -> AgentLoopConfig {
    let mut config = base_config(
        Arc::new(StreamingScriptedBackend::new(streams)),
        model,
        std::env::temp_dir(),
    );
    config.enable_streaming = true;
    config
}

#[tokio::test]
async fn streaming_turn_batches_content_chunks_into_events() {
    let chunks: Vec<Chunk> = (1..=7)
        .map(|i| content_chunk(&format!("c{i}"), (i == 7).then_some(Usage { prompt_tokens: 5, completion_tokens: 7 })))
        .collect();
    let config = streaming_config(vec![chunks], test_model(ToolCallFormat::Api));
    let mut agent = AgentLoop::new(config);

    let events: Vec<Event> = {
        let stream = agent.act("hello", CancellationToken::new());
        stream.collect().await
    };

    let assistant_chunks: Vec<(String, Option<String>)> = events
        .iter()
        .filter_map(|e| match e {
            Event::Assistant { content, message_id, .. } => Some((content.clone(), message_id.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(assistant_chunks.len(), 2, "one full batch of 5 plus the tail flush: {events:?}");
    assert_eq!(assistant_chunks[0].0, "c1c2c3c4c5");
    assert_eq!(assistant_chunks[1].0, "c6c7");
    assert_eq!(
        assistant_chunks[0].1, assistant_chunks[1].1,
        "both batches belong to the same appended message"
    );

    assert_eq!(agent.messages().len(), 3);
    assert_eq!(agent.messages()[2].content.as_deref(), Some("c1c2c3c4c5c6c7"));
}

#[tokio::test]
async fn streaming_flushes_reasoning_at_the_content_boundary() {
    let chunks = vec![
        reasoning_chunk("r1"),
        reasoning_chunk("r2"),
        content_chunk("a", None),
        content_chunk("b", Some(Usage { prompt_tokens: 5, completion_tokens: 4 })),
    ];
    let config = streaming_config(vec![chunks], test_model(ToolCallFormat::Api));
    let mut agent = AgentLoop::new(config);

    let events: Vec<Event> = {
        let stream = agent.act("hello", CancellationToken::new());
        stream.collect().await
    };

    assert!(matches!(&events[1], Event::Reasoning { content } if content == "r1r2"));
    assert!(matches!(&events[2], Event::Assistant { content, .. } if content == "ab"));

    let assistant = &agent.messages()[2];
    assert_eq!(assistant.content.as_deref(), Some("ab"));
    assert_eq!(assistant.reasoning_content.as_deref(), Some("r1r2"));
}

#[tokio::test]
async fn streaming_with_zero_nonempty_chunks_still_appends_an_assistant_message() {
    let chunks = vec![Chunk {
        message: ChunkMessage::default(),
        usage: Some(Usage { prompt_tokens: 5, completion_tokens: 0 }),
    }];
    let config = streaming_config(vec![chunks], test_model(ToolCallFormat::Api));
    let mut agent = AgentLoop::new(config);

    let events: Vec<Event> = {
        let stream = agent.act("hello", CancellationToken::new());
        stream.collect().await
    };

    assert!(
        !events.iter().any(|e| matches!(e, Event::Assistant { .. })),
        "empty stream must not produce an AssistantEvent: {events:?}"
    );
    assert_eq!(agent.messages().len(), 3);
    assert_eq!(agent.messages()[2].role, Role::Assistant);
    assert!(agent.messages()[2].content.is_none());
}

#[tokio::test]
async fn think_tag_spanning_streamed_chunks_is_recombined() {
    let chunks = vec![
        content_chunk("<thi", None),
        content_chunk("nk>secret</th", None),
        content_chunk("ink>Visible", Some(Usage { prompt_tokens: 5, completion_tokens: 6 })),
    ];
    let config = streaming_config(vec![chunks], test_model(ToolCallFormat::Api));
    let mut agent = AgentLoop::new(config);

    let _: Vec<Event> = {
        let stream = agent.act("hello", CancellationToken::new());
        stream.collect().await
    };

    let assistant = &agent.messages()[2];
    assert_eq!(assistant.content.as_deref(), Some("Visible"));
    assert_eq!(assistant.reasoning_content.as_deref(), Some("secret"));
}
