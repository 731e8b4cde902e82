//! List directory tool — lists immediate entries of a directory, sorted,
//! with directories suffixed by `/`.

use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::contract::{single_result, Tool, ToolEventStream};
use crate::error::ToolError;
use crate::ToolContext;

/// Built-in tool for listing a directory's immediate entries.
pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "Lists the immediate entries of a directory, one per line, directories suffixed with \"/\"."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Directory to list (defaults to workspace root)"}
            }
        })
    }

    fn validate(&self, raw_args: &Value) -> Result<Value, ToolError> {
        Ok(raw_args.clone())
    }

    async fn invoke(&self, ctx: &ToolContext, validated_args: Value) -> ToolEventStream {
        single_result(run_list(ctx, &validated_args).await.map_err(Into::into))
    }

    fn get_call_display(&self, validated_args: &Value) -> String {
        validated_args.get("path").and_then(Value::as_str).unwrap_or(".").to_string()
    }
}

async fn run_list(ctx: &ToolContext, args: &Value) -> Result<String, ToolError> {
    let dir = args
        .get("path")
        .and_then(Value::as_str)
        .map_or_else(|| ctx.workspace_root.clone(), PathBuf::from);

    if !dir.exists() {
        return Err(ToolError::PathNotFound(dir.display().to_string()));
    }
    if !dir.is_dir() {
        return Err(ToolError::InvalidArguments(format!("{} is not a directory", dir.display())));
    }

    let mut entries = tokio::fs::read_dir(&dir).await?;
    let mut names: Vec<String> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if file_type.is_dir() {
            names.push(format!("{name}/"));
        } else {
            names.push(name);
        }
    }
    names.sort();

    if names.is_empty() {
        return Ok("(empty directory)".to_string());
    }

    let mut output = names.join("\n");
    let _ = write!(output, "\n\n({} entries)", names.len());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ToolEvent;
    use futures::StreamExt;
    use tempfile::TempDir;

    fn ctx_with_root(root: &std::path::Path) -> ToolContext {
        ToolContext::new(root.to_path_buf(), "call_1")
    }

    #[tokio::test]
    async fn lists_files_and_suffixes_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let mut stream = ListDirectoryTool.invoke(&ctx_with_root(dir.path()), serde_json::json!({})).await;
        match stream.next().await.unwrap() {
            ToolEvent::Done(Ok(output)) => {
                assert!(output.contains("a.txt"));
                assert!(output.contains("sub/"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_directory_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut stream = ListDirectoryTool.invoke(&ctx_with_root(dir.path()), serde_json::json!({})).await;
        match stream.next().await.unwrap() {
            ToolEvent::Done(Ok(output)) => assert_eq!(output, "(empty directory)"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_directory_is_path_not_found() {
        let dir = TempDir::new().unwrap();
        let mut stream = ListDirectoryTool
            .invoke(&ctx_with_root(dir.path()), serde_json::json!({"path": dir.path().join("nope").to_str().unwrap()}))
            .await;
        match stream.next().await.unwrap() {
            ToolEvent::Done(Err(crate::contract::ToolFailure::Domain(ToolError::PathNotFound(_)))) => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
