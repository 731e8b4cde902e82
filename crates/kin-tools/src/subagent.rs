//! Types for requesting and reporting a sub-agent run.
//!
//! These live here, next to the `Task` tool that uses them, rather than
//! in the runtime crate that implements the spawner, so the tool crate
//! never depends on the runtime. The request names a profile so the
//! spawner can enforce that only delegate-only profiles are accepted,
//! and carries a progress channel so the child's tool results can be
//! forwarded back as the `Task` tool's own stream events.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

/// What the `Task` tool asks a fresh, independent Agent Loop to do.
#[derive(Debug, Clone)]
pub struct SubAgentRequest {
    /// Short, human-readable description of the task (shown in progress
    /// displays, not sent to the model).
    pub description: String,
    /// The prompt the sub-agent receives as its initial user message.
    pub prompt: String,
    /// Name of the `subagent_only` profile to run under.
    pub agent_profile_name: String,
    /// Whether the child's accumulated reasoning content should be part of
    /// the report. Off by default; reasoning is often long.
    pub include_reasoning: bool,
    /// Wall-clock budget for the whole run. `None` means no timeout beyond
    /// whatever the spawner itself enforces.
    pub timeout: Option<Duration>,
    /// Where the spawner sends a one-line summary of each tool result the
    /// child produces, if the caller wants them forwarded live.
    pub progress: Option<UnboundedSender<String>>,
}

/// What a sub-agent run reports back to the `Task` tool.
#[derive(Debug, Clone)]
pub struct SubAgentResult {
    /// Final candidate response text.
    pub response: String,
    /// Accumulated reasoning content, present only when the request set
    /// `include_reasoning` and the child actually produced any.
    pub reasoning: Option<String>,
    /// Number of LLM turns the run took before completing or stopping.
    pub turns_used: u64,
    /// Whether the run completed normally (as opposed to hitting the
    /// timeout or a malformed-output fallback).
    pub completed: bool,
    /// The model alias the sub-agent ran under.
    pub model_alias: String,
    /// The provider the sub-agent ran under.
    pub provider: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_the_restricted_profile_name() {
        let request = SubAgentRequest {
            description: "investigate".to_string(),
            prompt: "find the bug".to_string(),
            agent_profile_name: "task-worker".to_string(),
            include_reasoning: false,
            timeout: Some(Duration::from_secs(60)),
            progress: None,
        };
        assert_eq!(request.agent_profile_name, "task-worker");
    }
}
