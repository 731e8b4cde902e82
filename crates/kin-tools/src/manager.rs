//! The tool manager: discovery, enable/disable filtering, and per-session
//! caching of tool instances.
//!
//! Discovery order is fixed: builtins, then the user global directory,
//! then the trusted project-local directory. Names are filtered by
//! glob or `re:`-prefixed regex patterns before anything is exposed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use kin_llm::ToolDefinition;

use crate::builtin;
use crate::contract::{Tool, ToolDescription};
use crate::external::ExternalTool;
use crate::pattern::Pattern;

/// Tool discovery and name-filtering policy, independent of any one
/// session so it can be built once from config and shared.
pub struct ToolManagerConfig {
    /// Directory holding user-global tool manifests, if configured.
    pub user_global_dir: Option<PathBuf>,
    /// Directory holding trusted-project-local tool manifests, if the
    /// current workspace is a trusted folder.
    pub trusted_project_dir: Option<PathBuf>,
    /// If non-empty, only tools matching one of these patterns are
    /// exposed (whitelist). Takes priority over `disabled_tools`.
    pub enabled_tools: Vec<String>,
    /// Tools matching one of these patterns are hidden (blacklist). Only
    /// consulted when `enabled_tools` is empty.
    pub disabled_tools: Vec<String>,
}

impl Default for ToolManagerConfig {
    fn default() -> Self {
        Self {
            user_global_dir: None,
            trusted_project_dir: None,
            enabled_tools: Vec::new(),
            disabled_tools: Vec::new(),
        }
    }
}

/// Discovers, filters, and caches tool instances for one Agent Loop.
pub struct ToolManager {
    /// Every discovered tool, builtin first, in discovery order.
    all: Vec<Arc<dyn Tool>>,
    /// Names visible after `enabled_tools`/`disabled_tools` filtering, in
    /// discovery order.
    visible: Vec<String>,
    /// Per-name cache: `get(name)` returns the same instance for the rest
    /// of the loop's lifetime until `invalidate` drops it.
    cache: HashMap<String, Arc<dyn Tool>>,
}

impl ToolManager {
    /// Build a manager from `config`, running discovery immediately.
    #[must_use]
    pub fn new(config: &ToolManagerConfig) -> Self {
        let mut all: Vec<Arc<dyn Tool>> = builtin::default_tools();

        if let Some(dir) = &config.user_global_dir {
            all.extend(ExternalTool::discover(dir).into_iter().map(|t| Arc::new(t) as Arc<dyn Tool>));
        }
        if let Some(dir) = &config.trusted_project_dir {
            all.extend(ExternalTool::discover(dir).into_iter().map(|t| Arc::new(t) as Arc<dyn Tool>));
        }

        let visible = compute_visible(&all, config);
        let cache = all
            .iter()
            .filter(|t| visible.contains(&t.name().to_string()))
            .map(|t| (t.name().to_string(), Arc::clone(t)))
            .collect();

        Self { all, visible, cache }
    }

    /// Whether `name` has no `:` in it, i.e. is a builtin (as opposed to a
    /// namespaced external/MCP-style tool — reserved for future use).
    #[must_use]
    pub fn is_builtin(name: &str) -> bool {
        !name.contains(':')
    }

    /// Visible tool names, in discovery order.
    #[must_use]
    pub fn list(&self) -> &[String] {
        &self.visible
    }

    /// The cached instance for `name`, if it's visible.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.cache.get(name).cloned()
    }

    /// Drop `name`'s cached instance so the next `get` re-resolves it
    /// (e.g. after a permission change propagated mid-session).
    pub fn invalidate(&mut self, name: &str) {
        self.cache.remove(name);
        if let Some(tool) = self.all.iter().find(|t| t.name() == name) {
            if self.visible.iter().any(|n| n == name) {
                self.cache.insert(name.to_string(), Arc::clone(tool));
            }
        }
    }

    /// LLM-facing schemas for every visible tool.
    #[must_use]
    pub fn schemas_for_llm(&self) -> Vec<ToolDefinition> {
        self.visible
            .iter()
            .filter_map(|name| self.cache.get(name))
            .map(|t| describe_to_definition(&t.describe()))
            .collect()
    }

    /// Drop every cached instance, called on context compaction so the
    /// next turn starts from a clean discovery pass' cache.
    pub fn reset_all(&mut self) {
        self.cache = self
            .all
            .iter()
            .filter(|t| self.visible.iter().any(|n| n == t.name()))
            .map(|t| (t.name().to_string(), Arc::clone(t)))
            .collect();
    }
}

fn compute_visible(all: &[Arc<dyn Tool>], config: &ToolManagerConfig) -> Vec<String> {
    if !config.enabled_tools.is_empty() {
        let patterns = compile_patterns(&config.enabled_tools);
        all.iter()
            .map(|t| t.name().to_string())
            .filter(|name| patterns.iter().any(|p| p.matches(name)))
            .collect()
    } else {
        let patterns = compile_patterns(&config.disabled_tools);
        all.iter()
            .map(|t| t.name().to_string())
            .filter(|name| !patterns.iter().any(|p| p.matches(name)))
            .collect()
    }
}

fn compile_patterns(specs: &[String]) -> Vec<Pattern> {
    specs.iter().filter_map(|s| Pattern::parse(s).ok()).collect()
}

fn describe_to_definition(desc: &ToolDescription) -> ToolDefinition {
    ToolDefinition {
        name: desc.name.clone(),
        description: desc.description.clone(),
        input_schema: desc.input_schema.clone(),
    }
}
