//! Grep tool — searches file contents by regular expression, walking the
//! tree with hidden directories skipped.

use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use walkdir::WalkDir;

use crate::contract::{single_result, Tool, ToolEventStream};
use crate::error::ToolError;
use crate::ToolContext;

const MAX_MATCHES: usize = 200;

/// Built-in tool for searching file contents by regular expression.
pub struct GrepTool;

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Searches file contents for a regular expression. Returns matching lines as \
         \"path:line_number:text\", most recently modified files first. Stops after 200 matches."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string", "description": "Regular expression to search for"},
                "path": {"type": "string", "description": "Directory to search in (defaults to workspace root)"},
                "glob": {"type": "string", "description": "Only search files whose name matches this glob"}
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
        single_result(run_grep(ctx, &validated_args).await.map_err(Into::into))
    }

    fn get_call_display(&self, validated_args: &Value) -> String {
        validated_args.get("pattern").and_then(Value::as_str).unwrap_or("").to_string()
    }
}

async fn run_grep(ctx: &ToolContext, args: &Value) -> Result<String, ToolError> {
    let pattern = args.get("pattern").and_then(Value::as_str).expect("validated");
    let search_dir = args
        .get("path")
        .and_then(Value::as_str)
        .map_or_else(|| ctx.workspace_root.clone(), PathBuf::from);
    let name_glob = args.get("glob").and_then(Value::as_str);

    if !search_dir.exists() {
        return Err(ToolError::PathNotFound(search_dir.display().to_string()));
    }

    let regex = Regex::new(pattern).map_err(|e| ToolError::InvalidArguments(format!("invalid regex: {e}")))?;
    let name_matcher = name_glob
        .map(|g| {
            globset::GlobBuilder::new(g)
                .literal_separator(false)
                .build()
                .map(|g| g.compile_matcher())
        })
        .transpose()
        .map_err(|e| ToolError::InvalidArguments(format!("invalid glob: {e}")))?;

    let mut lines_out: Vec<String> = Vec::new();
    'outer: for entry in WalkDir::new(&search_dir).follow_links(false).into_iter().filter_entry(|e| {
        e.depth() == 0 || e.file_name().to_str().is_none_or(|s| !s.starts_with('.'))
    }) {
        let Ok(entry) = entry else { continue };
        if entry.file_type().is_dir() {
            continue;
        }
        if let Some(matcher) = &name_matcher {
            let rel = entry.path().strip_prefix(&search_dir).unwrap_or(entry.path());
            if !matcher.is_match(rel) {
                continue;
            }
        }
        let Ok(content) = tokio::fs::read_to_string(entry.path()).await else { continue };
        for (idx, line) in content.lines().enumerate() {
            if regex.is_match(line) {
                lines_out.push(format!("{}:{}:{}", entry.path().display(), idx.saturating_add(1), line));
                if lines_out.len() >= MAX_MATCHES {
                    break 'outer;
                }
            }
        }
    }

    if lines_out.is_empty() {
        return Ok(format!("No matches for \"{pattern}\""));
    }

    let mut output = lines_out.join("\n");
    let _ = write!(output, "\n\n({} matches)", lines_out.len());
    Ok(output)
}
