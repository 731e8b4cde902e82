//! The context every tool invocation runs with: the shared working
//! directory, the call id to correlate events against, and the optional
//! approval/subagent/user-input callbacks a tool may reach back into.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::subagent::{SubAgentRequest, SubAgentResult};

/// A frontend's decision on one approval request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// The user allowed the call to proceed.
    Yes,
    /// The user declined, optionally explaining why. The feedback text is
    /// surfaced to the model as part of the rejection.
    No {
        /// Why the user declined, if they said.
        feedback: Option<String>,
    },
}

/// Asks a human (or an automated frontend policy) whether a tool call may
/// proceed. A tool never asks directly; the tool runner calls this when
/// `check_allowlist_denylist` returns neither `ALWAYS` nor `NEVER`.
#[async_trait]
pub trait ApprovalCallback: Send + Sync {
    /// Request approval for `tool_name` with `args_json`, correlated by
    /// `call_id`.
    async fn approve(&self, tool_name: &str, args_json: &str, call_id: &str) -> ApprovalDecision;
}

/// The default approval policy: reject everything. Safe fallback when no
/// frontend has wired up its own callback.
pub struct DenyAllApproval;

#[async_trait]
impl ApprovalCallback for DenyAllApproval {
    async fn approve(&self, _tool_name: &str, _args_json: &str, _call_id: &str) -> ApprovalDecision {
        ApprovalDecision::No {
            feedback: Some("not permitted".to_string()),
        }
    }
}

/// Lets a tool ask the user a free-form question mid-invocation (used by
/// interactive tools that need clarification before proceeding).
#[async_trait]
pub trait UserInputCallback: Send + Sync {
    /// Ask `prompt` and return whatever the user typed.
    async fn ask(&self, prompt: &str) -> String;
}

/// Spawns an independent sub-agent loop and returns its report. Defined
/// here (rather than in the runtime crate that implements it) so this
/// crate's `Task` tool can depend on the trait without creating a
/// circular dependency between `kin-tools` and `kin-runtime`.
#[async_trait]
pub trait SubAgentSpawner: Send + Sync {
    /// Run `request` to completion (or timeout) and report the outcome.
    async fn spawn(&self, request: SubAgentRequest) -> Result<SubAgentResult, String>;
}

/// Everything a [`crate::contract::Tool`] invocation needs beyond its
/// validated arguments.
pub struct ToolContext {
    /// Root of the workspace this session is operating in.
    pub workspace_root: PathBuf,
    /// Current working directory, shared across tool calls so a shell
    /// tool's `cd` persists to the next invocation.
    pub cwd: Arc<RwLock<PathBuf>>,
    /// The call id this invocation is answering; correlates emitted
    /// `ToolStreamEvent`s back to the triggering `ToolCallEvent`.
    pub tool_call_id: String,
    /// Approval gate, consulted when allowlist/denylist is inconclusive.
    pub approval_callback: Option<Arc<dyn ApprovalCallback>>,
    /// Sub-agent spawning, available only to the `Task` tool.
    pub agent_manager: Option<Arc<dyn SubAgentSpawner>>,
    /// Mid-invocation user prompts, available to tools that need them.
    pub user_input_callback: Option<Arc<dyn UserInputCallback>>,
}

impl ToolContext {
    /// A context with its own fresh `cwd`, no approval/subagent/input
    /// wiring. Suitable for unit tests and one-off invocations.
    #[must_use]
    pub fn new(workspace_root: PathBuf, tool_call_id: impl Into<String>) -> Self {
        let cwd = workspace_root.clone();
        Self {
            workspace_root,
            cwd: Arc::new(RwLock::new(cwd)),
            tool_call_id: tool_call_id.into(),
            approval_callback: None,
            agent_manager: None,
            user_input_callback: None,
        }
    }

    /// A context sharing an existing `cwd` handle with another invocation,
    /// used by the tool runner so every call in one session sees the same
    /// shell working directory.
    #[must_use]
    pub fn with_shared_cwd(
        workspace_root: PathBuf,
        cwd: Arc<RwLock<PathBuf>>,
        tool_call_id: impl Into<String>,
    ) -> Self {
        Self {
            workspace_root,
            cwd,
            tool_call_id: tool_call_id.into(),
            approval_callback: None,
            agent_manager: None,
            user_input_callback: None,
        }
    }

    /// The current working directory, resolved at the time of the call.
    pub async fn current_dir(&self) -> PathBuf {
        self.cwd.read().await.clone()
    }

    /// Update the shared working directory (e.g. after a shell `cd`).
    pub async fn set_current_dir(&self, dir: PathBuf) {
        *self.cwd.write().await = dir;
    }

    /// Attach an approval callback, builder-style.
    #[must_use]
    pub fn with_approval(mut self, callback: Arc<dyn ApprovalCallback>) -> Self {
        self.approval_callback = Some(callback);
        self
    }

    /// Attach a sub-agent spawner, builder-style.
    #[must_use]
    pub fn with_agent_manager(mut self, manager: Arc<dyn SubAgentSpawner>) -> Self {
        self.agent_manager = Some(manager);
        self
    }
}

/// True if `path` lies within `root` (after best-effort canonicalization).
#[must_use]
pub fn is_within(root: &Path, path: &Path) -> bool {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    path.starts_with(&root)
}
