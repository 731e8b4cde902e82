//! Glob tool — finds files matching a glob pattern, most recently
//! modified first.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use serde_json::Value;
use walkdir::WalkDir;

use crate::contract::{single_result, Tool, ToolEventStream};
use crate::error::ToolError;
use crate::ToolContext;

/// Built-in tool for finding files by glob pattern.
pub struct GlobTool;

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "Finds files matching a glob pattern (e.g. \"**/*.rs\", \"src/**/*.ts\"). \
         Returns matching file paths sorted by modification time (most recent first)."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string", "description": "Glob pattern to match files against"},
                "path": {"type": "string", "description": "Directory to search in (defaults to workspace root)"}
            },
            "required": ["pattern"]
        })
    }

    fn validate(&self, raw_args: &Value) -> Result<Value, ToolError> {
        raw_args
            .get("pattern")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("pattern is required".into()))?;
        Ok(raw_args.clone())
    }

    async fn invoke(&self, ctx: &ToolContext, validated_args: Value) -> ToolEventStream {
        single_result(run_glob(ctx, &validated_args).await.map_err(Into::into))
    }

    fn get_call_display(&self, validated_args: &Value) -> String {
        validated_args.get("pattern").and_then(Value::as_str).unwrap_or("").to_string()
    }
}

async fn run_glob(ctx: &ToolContext, args: &Value) -> Result<String, ToolError> {
    let pattern = args.get("pattern").and_then(Value::as_str).expect("validated");
    let search_dir = args
        .get("path")
        .and_then(Value::as_str)
        .map_or_else(|| ctx.workspace_root.clone(), PathBuf::from);

    if !search_dir.exists() {
        return Err(ToolError::PathNotFound(search_dir.display().to_string()));
    }
    let search_dir = search_dir.canonicalize()?;

    let glob = globset::GlobBuilder::new(pattern)
        .literal_separator(false)
        .build()
        .map_err(|e| ToolError::InvalidArguments(format!("invalid glob pattern: {e}")))?
        .compile_matcher();

    let mut matches: Vec<(PathBuf, SystemTime)> = Vec::new();
    for entry in WalkDir::new(&search_dir).follow_links(false).into_iter().filter_entry(|e| {
        e.depth() == 0 || e.file_name().to_str().is_none_or(|s| !s.starts_with('.'))
    }) {
        let Ok(entry) = entry else { continue };
        if entry.file_type().is_dir() {
            continue;
        }
        let rel_path = entry.path().strip_prefix(&search_dir).unwrap_or(entry.path());
        if glob.is_match(rel_path) {
            let mtime = entry.metadata().ok().and_then(|m| m.modified().ok()).unwrap_or(SystemTime::UNIX_EPOCH);
            matches.push((entry.path().to_path_buf(), mtime));
        }
    }
    matches.sort_by(|a, b| b.1.cmp(&a.1));

    if matches.is_empty() {
        return Ok(format!("No files matching \"{pattern}\" found"));
    }

    let mut output = String::new();
    for (path, _) in &matches {
        output.push_str(&path.display().to_string());
        output.push('\n');
    }
    let _ = write!(output, "\n({} files matched)", matches.len());
    Ok(output)
}
