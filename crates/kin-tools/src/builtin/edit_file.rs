//! Edit file tool — performs exact string replacements in files.

use async_trait::async_trait;
use serde_json::Value;

use crate::contract::{single_result, Tool, ToolEventStream};
use crate::error::ToolError;
use crate::ToolContext;

/// Built-in tool for editing files via string replacement.
pub struct EditFileTool;

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Performs exact string replacements in files. The old_string must be unique in the file \
         unless replace_all is true. Fails if old_string is not found or matches multiple times \
         (without replace_all)."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {"type": "string", "description": "Absolute path to the file to edit"},
                "old_string": {"type": "string", "description": "The exact text to find and replace"},
                "new_string": {"type": "string", "description": "The replacement text"},
                "replace_all": {"type": "boolean", "description": "Replace all occurrences (default: false)", "default": false}
            },
            "required": ["file_path", "old_string", "new_string"]
        })
    }

    fn validate(&self, raw_args: &Value) -> Result<Value, ToolError> {
        for field in ["file_path", "old_string", "new_string"] {
            raw_args
                .get(field)
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::InvalidArguments(format!("{field} is required")))?;
        }
        Ok(raw_args.clone())
    }

    async fn invoke(&self, _ctx: &ToolContext, validated_args: Value) -> ToolEventStream {
        single_result(edit_file(&validated_args).await.map_err(Into::into))
    }

    fn get_call_display(&self, validated_args: &Value) -> String {
        validated_args.get("file_path").and_then(Value::as_str).unwrap_or("").to_string()
    }
}

async fn edit_file(args: &Value) -> Result<String, ToolError> {
    let file_path = args.get("file_path").and_then(Value::as_str).expect("validated");
    let old_string = args.get("old_string").and_then(Value::as_str).expect("validated");
    let new_string = args.get("new_string").and_then(Value::as_str).expect("validated");
    let replace_all = args.get("replace_all").and_then(Value::as_bool).unwrap_or(false);

    let path = std::path::Path::new(file_path);
    if !path.exists() {
        return Err(ToolError::PathNotFound(file_path.to_string()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let count = content.matches(old_string).count();

    if count == 0 {
        return Err(ToolError::ExecutionFailed(format!("old_string not found in {file_path}")));
    }
    if count > 1 && !replace_all {
        return Err(ToolError::ExecutionFailed(format!(
            "old_string found {count} times in {file_path} — use replace_all or provide more context to make it unique"
        )));
    }

    let new_content = if replace_all {
        content.replace(old_string, new_string)
    } else {
        content.replacen(old_string, new_string, 1)
    };

    tokio::fs::write(path, &new_content).await?;

    if replace_all && count > 1 {
        Ok(format!("Replaced {count} occurrences in {file_path}"))
    } else {
        Ok(format!("Edited {file_path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ToolEvent;
    use futures::StreamExt;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn ctx() -> ToolContext {
        ToolContext::new(std::env::temp_dir(), "call_1")
    }

    #[tokio::test]
    async fn replaces_a_unique_match() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "hello world").unwrap();

        let mut stream = EditFileTool
            .invoke(
                &ctx(),
                serde_json::json!({"file_path": f.path().to_str().unwrap(), "old_string": "hello", "new_string": "goodbye"}),
            )
            .await;
        match stream.next().await.unwrap() {
            ToolEvent::Done(Ok(output)) => assert!(output.contains("Edited")),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(std::fs::read_to_string(f.path()).unwrap(), "goodbye world");
    }

    #[tokio::test]
    async fn non_unique_match_fails_without_replace_all() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "aaa bbb aaa").unwrap();

        let mut stream = EditFileTool
            .invoke(
                &ctx(),
                serde_json::json!({"file_path": f.path().to_str().unwrap(), "old_string": "aaa", "new_string": "ccc"}),
            )
            .await;
        match stream.next().await.unwrap() {
            ToolEvent::Done(Err(crate::contract::ToolFailure::Domain(ToolError::ExecutionFailed(msg)))) => {
                assert!(msg.contains("2 times"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn replace_all_replaces_every_match() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "aaa bbb aaa").unwrap();

        let mut stream = EditFileTool
            .invoke(
                &ctx(),
                serde_json::json!({
                    "file_path": f.path().to_str().unwrap(),
                    "old_string": "aaa",
                    "new_string": "ccc",
                    "replace_all": true
                }),
            )
            .await;
        match stream.next().await.unwrap() {
            ToolEvent::Done(Ok(output)) => assert!(output.contains("2 occurrences")),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(std::fs::read_to_string(f.path()).unwrap(), "ccc bbb ccc");
    }
}
