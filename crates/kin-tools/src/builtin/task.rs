//! The Task tool: delegates to a fresh, independent sub-agent loop.
//!
//! This tool only asks [`crate::context::SubAgentSpawner`] to run the
//! request and renders its report; the fresh-loop, profile-restriction,
//! and fallback machinery lives in the runtime crate that implements the
//! spawner. While the spawner runs, the one-line summaries it sends
//! through the request's progress channel are surfaced as this tool's
//! own stream events.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::contract::{single_result, Tool, ToolEvent, ToolEventStream, ToolStreamEvent};
use crate::error::ToolError;
use crate::subagent::{SubAgentRequest, SubAgentResult};
use crate::ToolContext;

const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Built-in tool for delegating a task to a sub-agent.
pub struct TaskTool;

#[async_trait]
impl Tool for TaskTool {
    fn name(&self) -> &str {
        "task"
    }

    fn description(&self) -> &str {
        "Delegates a self-contained task to a fresh sub-agent and returns its final summary. \
         Use for focused investigation or multi-step work that doesn't need to share this \
         conversation's history."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "description": {"type": "string", "description": "Short description of the task (for progress display)"},
                "prompt": {"type": "string", "description": "The task given to the sub-agent"},
                "agent_profile_name": {"type": "string", "description": "Name of the subagent-only profile to run under"},
                "include_reasoning": {"type": "boolean", "description": "Include the sub-agent's reasoning in the report (default false)"},
                "timeout_secs": {"type": "integer", "description": "Wall-clock budget in seconds (default 300)"}
            },
            "required": ["description", "prompt", "agent_profile_name"]
        })
    }

    fn validate(&self, raw_args: &Value) -> Result<Value, ToolError> {
        for field in ["description", "prompt", "agent_profile_name"] {
            raw_args
                .get(field)
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::InvalidArguments(format!("{field} is required")))?;
        }
        Ok(raw_args.clone())
    }

    async fn invoke(&self, ctx: &ToolContext, validated_args: Value) -> ToolEventStream {
        let Some(spawner) = ctx.agent_manager.clone() else {
            return single_result(Err(ToolError::ExecutionFailed(
                "no subagent spawner configured for this session".into(),
            )
            .into()));
        };

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let request = build_request(&validated_args, progress_tx);

        Box::pin(async_stream::stream! {
            let run = spawner.spawn(request);
            tokio::pin!(run);
            let mut progress_open = true;
            let report = loop {
                if progress_open {
                    tokio::select! {
                        biased;
                        message = progress_rx.recv() => {
                            match message {
                                Some(message) => yield ToolEvent::Progress(ToolStreamEvent { message }),
                                None => progress_open = false,
                            }
                        }
                        outcome = &mut run => {
                            while let Ok(message) = progress_rx.try_recv() {
                                yield ToolEvent::Progress(ToolStreamEvent { message });
                            }
                            break outcome;
                        }
                    }
                } else {
                    break (&mut run).await;
                }
            };
            yield ToolEvent::Done(
                report
                    .map(|r| render_report(&r))
                    .map_err(|e| ToolError::ExecutionFailed(e).into()),
            );
        })
    }

    fn get_call_display(&self, validated_args: &Value) -> String {
        validated_args.get("description").and_then(Value::as_str).unwrap_or("").to_string()
    }

    fn get_result_display(&self, result: &str) -> String {
        result.lines().next().unwrap_or(result).to_string()
    }
}

fn build_request(args: &Value, progress: mpsc::UnboundedSender<String>) -> SubAgentRequest {
    let timeout_secs = args.get("timeout_secs").and_then(Value::as_u64).unwrap_or(DEFAULT_TIMEOUT_SECS);
    SubAgentRequest {
        description: args.get("description").and_then(Value::as_str).unwrap_or_default().to_string(),
        prompt: args.get("prompt").and_then(Value::as_str).unwrap_or_default().to_string(),
        agent_profile_name: args
            .get("agent_profile_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        include_reasoning: args.get("include_reasoning").and_then(Value::as_bool).unwrap_or(false),
        timeout: Some(Duration::from_secs(timeout_secs)),
        progress: Some(progress),
    }
}

fn render_report(report: &SubAgentResult) -> String {
    let mut out = report.response.clone();
    if let Some(reasoning) = &report.reasoning {
        out.push_str("\n\nReasoning:\n");
        out.push_str(reasoning);
    }
    out.push_str(&format!(
        "\n\n(turns_used={}, completed={}, model={}/{})",
        report.turns_used, report.completed, report.provider, report.model_alias
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SubAgentSpawner;
    use futures::StreamExt;
    use std::sync::Arc;

    struct StubSpawner {
        reasoning: Option<String>,
    }

    #[async_trait]
    impl SubAgentSpawner for StubSpawner {
        async fn spawn(&self, request: SubAgentRequest) -> Result<SubAgentResult, String> {
            if let Some(tx) = &request.progress {
                tx.send("bash: ok".to_string()).ok();
            }
            Ok(SubAgentResult {
                response: format!("done: {}", request.prompt),
                reasoning: request.include_reasoning.then(|| self.reasoning.clone()).flatten(),
                turns_used: 2,
                completed: true,
                model_alias: "fast".to_string(),
                provider: "openai".to_string(),
            })
        }
    }

    fn ctx_with_spawner(reasoning: Option<String>) -> ToolContext {
        ToolContext::new(std::env::temp_dir(), "call_1")
            .with_agent_manager(Arc::new(StubSpawner { reasoning }))
    }

    #[tokio::test]
    async fn delegates_forwards_progress_and_renders_the_report() {
        let ctx = ctx_with_spawner(None);
        let stream = TaskTool
            .invoke(
                &ctx,
                serde_json::json!({"description": "investigate", "prompt": "find the bug", "agent_profile_name": "worker"}),
            )
            .await;
        let events: Vec<ToolEvent> = stream.collect().await;

        assert!(events.iter().any(
            |e| matches!(e, ToolEvent::Progress(ToolStreamEvent { message }) if message == "bash: ok")
        ));
        match events.last().unwrap() {
            ToolEvent::Done(Ok(output)) => {
                assert!(output.contains("done: find the bug"));
                assert!(output.contains("turns_used=2"));
                assert!(output.contains("openai/fast"));
                assert!(!output.contains("Reasoning:"));
            }
            other => panic!("unexpected terminal event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reasoning_appears_only_when_requested() {
        let ctx = ctx_with_spawner(Some("thought hard".to_string()));
        let stream = TaskTool
            .invoke(
                &ctx,
                serde_json::json!({
                    "description": "x", "prompt": "y", "agent_profile_name": "worker",
                    "include_reasoning": true
                }),
            )
            .await;
        let events: Vec<ToolEvent> = stream.collect().await;
        match events.last().unwrap() {
            ToolEvent::Done(Ok(output)) => {
                assert!(output.contains("Reasoning:\nthought hard"));
            }
            other => panic!("unexpected terminal event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_spawner_is_an_execution_failure() {
        let ctx = ToolContext::new(std::env::temp_dir(), "call_1");
        let mut stream = TaskTool
            .invoke(
                &ctx,
                serde_json::json!({"description": "x", "prompt": "y", "agent_profile_name": "worker"}),
            )
            .await;
        match stream.next().await.unwrap() {
            ToolEvent::Done(Err(crate::contract::ToolFailure::Domain(ToolError::ExecutionFailed(_)))) => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
