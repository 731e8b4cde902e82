//! Named bundles of system prompt + tool policy selected by the CLI or a
//! parent agent loop.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tool_call::ToolPermission;

/// A named agent profile: which system prompt to use, which per-tool
/// permission overrides apply, and whether the profile may be used as a
/// top-level agent or only as a subagent delegate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Profile name, e.g. `"default"`, `"plan"`, `"explore"`.
    pub name: String,
    /// System prompt id or literal text, resolved by the caller.
    pub system_prompt: String,
    /// Per-tool permission overrides for this profile.
    pub tool_permissions: HashMap<String, ToolPermission>,
    /// If true, this profile may only be used for subagent delegation;
    /// the loop refuses to start a top-level session with it and refuses
    /// to let it spawn further subagents.
    pub subagent_only: bool,
}

impl AgentProfile {
    /// A minimal primary profile with no overrides.
    #[must_use]
    pub fn primary(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            tool_permissions: HashMap::new(),
            subagent_only: false,
        }
    }

    /// A subagent-only profile, for delegation via the task tool.
    #[must_use]
    pub fn subagent(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            tool_permissions: HashMap::new(),
            subagent_only: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subagent_profile_is_marked_delegate_only() {
        let p = AgentProfile::subagent("task-worker", "You are a focused sub-agent.");
        assert!(p.subagent_only);
    }
}
