//! The sub-agent executor: implements [`SubAgentSpawner`] for the `task`
//! tool by running a fresh, independent [`AgentLoop`] to completion.
//!
//! The child gets its own message list, stats, and tool manager; only the
//! approval callback is shared, so the user stays in control of
//! irreversible tools. A fixed prompt suffix asks for a final summary,
//! the run races a wall-clock timeout, each child tool result is
//! summarized through the tool's own display helper and sent back live
//! through the request's progress channel, and reasoning is accumulated
//! for callers that asked for it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;
use futures::StreamExt;
use kin_core::{AgentProfile, Event, ModelConfig, Role};
use kin_llm::LlmBackend;
use kin_tools::{ApprovalCallback, SubAgentRequest, SubAgentResult, SubAgentSpawner, ToolManager, ToolManagerConfig};
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::agent_loop::{AgentLoop, AgentLoopConfig};
use crate::observer::NullObserver;
use crate::tool_runner::ToolRunnerConfig;

const SUMMARY_SUFFIX: &str = "\n\nWhen you are finished, reply with a concise final summary of what you found or did. Do not call any more tools once you have your answer.";

const NO_SUMMARY_SENTINEL: &str =
    "Subagent completed tool execution but did not provide a summary of the results.";

const SUMMARY_MAX_CHARS: usize = 120;

static MALFORMED_XML: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(function[=\s]|tool_call>|parameter[=\s])").unwrap());

fn looks_malformed(text: &str) -> bool {
    MALFORMED_XML.is_match(text)
}

fn fallback_from_history(messages: &[kin_core::Message]) -> Option<String> {
    messages.iter().rev().find_map(|m| {
        if m.role != Role::Assistant {
            return None;
        }
        m.content.as_ref().filter(|c| !c.is_empty() && !looks_malformed(c)).cloned()
    })
}

fn short_line(text: &str) -> String {
    let first = text.lines().next().unwrap_or("");
    if first.chars().count() > SUMMARY_MAX_CHARS {
        let truncated: String = first.chars().take(SUMMARY_MAX_CHARS).collect();
        format!("{truncated}...")
    } else {
        first.to_string()
    }
}

/// Everything [`SubAgentExecutor::new`] needs to spin up a fresh loop per
/// request.
pub struct SubAgentExecutor {
    profiles: HashMap<String, AgentProfile>,
    backend: Arc<dyn LlmBackend>,
    model: ModelConfig,
    tool_manager_config: ToolManagerConfig,
    workspace_root: PathBuf,
    runner_config: ToolRunnerConfig,
    approval_callback: Arc<dyn ApprovalCallback>,
    enable_streaming: bool,
}

impl SubAgentExecutor {
    /// Build an executor that only accepts requests naming a profile in
    /// `profiles`, and only if that profile is `subagent_only`.
    #[must_use]
    pub fn new(
        profiles: HashMap<String, AgentProfile>,
        backend: Arc<dyn LlmBackend>,
        model: ModelConfig,
        tool_manager_config: ToolManagerConfig,
        workspace_root: PathBuf,
        runner_config: ToolRunnerConfig,
        approval_callback: Arc<dyn ApprovalCallback>,
        enable_streaming: bool,
    ) -> Self {
        Self {
            profiles,
            backend,
            model,
            tool_manager_config,
            workspace_root,
            runner_config,
            approval_callback,
            enable_streaming,
        }
    }
}

#[async_trait]
impl SubAgentSpawner for SubAgentExecutor {
    async fn spawn(&self, request: SubAgentRequest) -> Result<SubAgentResult, String> {
        let profile = self
            .profiles
            .get(&request.agent_profile_name)
            .cloned()
            .ok_or_else(|| format!("unknown subagent profile: {}", request.agent_profile_name))?;

        if !profile.subagent_only {
            return Err(format!(
                "profile {} may not be used as a subagent (not subagent_only)",
                profile.name
            ));
        }
        tracing::debug!(profile = %profile.name, description = %request.description, "spawning subagent");

        let llm_client = kin_llm::LlmClient::new(
            Arc::clone(&self.backend),
            self.model.clone(),
            uuid::Uuid::new_v4().to_string(),
        );
        let tool_manager = ToolManager::new(&self.tool_manager_config);
        // A second manager of the same shape, kept out of the loop so the
        // event consumer below can reach each tool's display helper.
        let display_tools = ToolManager::new(&self.tool_manager_config);

        let mut sub_loop = AgentLoop::new(AgentLoopConfig {
            agent_profile: profile,
            llm_client,
            tool_manager,
            workspace_root: self.workspace_root.clone(),
            runner_config: self.runner_config.clone(),
            approval_callback: Some(Arc::clone(&self.approval_callback)),
            user_input_callback: None,
            agent_manager: None,
            message_observer: Some(Arc::new(NullObserver)),
            enable_streaming: self.enable_streaming,
            middlewares: Vec::new(),
            initial_messages: None,
        });

        let prompt = format!("{}{}", request.prompt, SUMMARY_SUFFIX);
        let cancel = CancellationToken::new();

        let mut response = String::new();
        let mut reasoning = String::new();
        let mut early_stop = false;

        let run = async {
            let stream = sub_loop.act(&prompt, cancel.clone());
            tokio::pin!(stream);
            while let Some(event) = stream.next().await {
                match event {
                    Event::Assistant { content, stopped_by_middleware, .. } => {
                        response.push_str(&content);
                        if stopped_by_middleware {
                            early_stop = true;
                        }
                    }
                    Event::Reasoning { content } => {
                        reasoning.push_str(&content);
                    }
                    Event::ToolCall { .. } => {
                        response.clear();
                    }
                    Event::ToolResult { tool_name, result, error, skipped, .. } => {
                        if let Some(tx) = &request.progress {
                            let text = result.as_deref().or(error.as_deref()).unwrap_or("");
                            let rendered = display_tools
                                .get(&tool_name)
                                .map_or_else(|| text.to_string(), |t| t.get_result_display(text));
                            let status = if skipped { " (skipped)" } else { "" };
                            let _ = tx.send(format!("{tool_name}{status}: {}", short_line(&rendered)));
                        }
                    }
                    _ => {}
                }
            }
        };

        let timed_out = match request.timeout {
            Some(duration) => tokio::time::timeout(duration, run).await.is_err(),
            None => {
                run.await;
                false
            }
        };
        if timed_out {
            cancel.cancel();
            early_stop = true;
        }

        let mut malformed_fallback = false;
        if response.trim().is_empty() || looks_malformed(&response) {
            malformed_fallback = true;
            tracing::warn!("subagent response was empty or malformed, falling back to history scan");
            response = fallback_from_history(sub_loop.messages())
                .unwrap_or_else(|| NO_SUMMARY_SENTINEL.to_string());
        }

        Ok(SubAgentResult {
            response,
            reasoning: (request.include_reasoning && !reasoning.is_empty()).then_some(reasoning),
            turns_used: sub_loop.stats().steps,
            completed: !timed_out && !early_stop && !malformed_fallback,
            model_alias: self.model.alias.clone(),
            provider: self.model.provider_ref.clone(),
        })
    }
}
