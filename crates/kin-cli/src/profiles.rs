//! The built-in agent profiles: which system prompt each mode runs under
//! and which per-tool permission overrides it carries.

use std::collections::HashMap;

use kin_core::{AgentProfile, ToolPermission};

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are Kin, a coding assistant working inside the user's project directory.

Investigate before you act: read the relevant files and understand the existing \
conventions before editing anything. Prefer small, focused changes. When a task is \
ambiguous, say what you assumed. Use the available tools rather than guessing at \
file contents or command output, and report what you actually observed.";

const PLAN_SYSTEM_PROMPT: &str = "\
You are Kin, a coding assistant working in read-only planning mode.

Investigate the project with the read-only tools and produce a concrete plan: which \
files change, in what order, and what the risks are. Do not modify the project in \
this mode.";

const RESEARCHER_SYSTEM_PROMPT: &str = "\
You are a focused sub-agent. Complete exactly the task you were given, using the \
available tools, and finish with a concise summary of what you found or did. Do not \
ask clarifying questions; make reasonable assumptions and note them.";

/// Every profile this binary knows about, keyed by name. `researcher` is
/// the delegate profile the `task` tool spawns; the rest are top-level.
pub fn builtin_profiles() -> HashMap<String, AgentProfile> {
    let mut profiles = HashMap::new();

    profiles.insert(
        "default".to_string(),
        AgentProfile::primary("default", DEFAULT_SYSTEM_PROMPT),
    );

    let mut plan = AgentProfile::primary("plan", PLAN_SYSTEM_PROMPT);
    for tool in ["bash", "write_file", "edit_file"] {
        plan.tool_permissions.insert(tool.to_string(), ToolPermission::Never);
    }
    profiles.insert("plan".to_string(), plan);

    let mut researcher = AgentProfile::subagent("researcher", RESEARCHER_SYSTEM_PROMPT);
    for tool in ["write_file", "edit_file", "task"] {
        researcher.tool_permissions.insert(tool.to_string(), ToolPermission::Never);
    }
    profiles.insert("researcher".to_string(), researcher);

    profiles
}
