//! Read file tool — reads a file with line numbers (`cat -n` style).

use std::fmt::Write as _;

use async_trait::async_trait;
use serde_json::Value;

use crate::contract::{single_result, Tool, ToolEventStream};
use crate::error::ToolError;
use crate::ToolContext;

const DEFAULT_LINE_LIMIT: usize = 2000;
const MAX_LINE_LENGTH: usize = 2000;

/// Built-in tool for reading files.
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads a file from the filesystem. Returns contents with line numbers (cat -n format). \
         Default reads up to 2000 lines. Use offset and limit for large files. \
         Lines longer than 2000 characters are truncated."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Absolute path to the file to read"
                },
                "offset": {
                    "type": "integer",
                    "description": "Line number to start reading from (1-based). Only provide for large files."
                },
                "limit": {
                    "type": "integer",
                    "description": "Number of lines to read. Only provide for large files."
                }
            },
            "required": ["file_path"]
        })
    }

    fn validate(&self, raw_args: &Value) -> Result<Value, ToolError> {
        raw_args
            .get("file_path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("file_path is required".into()))?;
        Ok(raw_args.clone())
    }

    async fn invoke(&self, _ctx: &ToolContext, validated_args: Value) -> ToolEventStream {
        single_result(read_file(&validated_args).await.map_err(Into::into))
    }

    fn get_call_display(&self, validated_args: &Value) -> String {
        validated_args.get("file_path").and_then(Value::as_str).unwrap_or("").to_string()
    }
}

async fn read_file(args: &Value) -> Result<String, ToolError> {
    let file_path = args
        .get("file_path")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments("file_path is required".into()))?;

    let offset = args.get("offset").and_then(Value::as_u64).map(|v| usize::try_from(v).unwrap_or(usize::MAX));
    let limit = args
        .get("limit")
        .and_then(Value::as_u64)
        .map_or(DEFAULT_LINE_LIMIT, |v| usize::try_from(v).unwrap_or(usize::MAX));

    let path = std::path::Path::new(file_path);
    if !path.exists() {
        return Err(ToolError::PathNotFound(file_path.to_string()));
    }

    let raw = tokio::fs::read(path).await?;
    let check_len = raw.len().min(8192);
    if raw[..check_len].contains(&0) {
        return Err(ToolError::ExecutionFailed(format!("{file_path} appears to be a binary file")));
    }

    let content = String::from_utf8(raw).map_err(|_| ToolError::ExecutionFailed(format!("{file_path} is not valid UTF-8")))?;

    let lines: Vec<&str> = content.lines().collect();
    let total_lines = lines.len();

    let start = offset.map_or(0, |o| o.saturating_sub(1));
    let end = start.saturating_add(limit).min(total_lines);

    if start >= total_lines {
        return Ok(format!("(file has {total_lines} lines, offset {start} is past end)"));
    }

    let mut output = String::new();
    for (idx, &line) in lines[start..end].iter().enumerate() {
        let line_num = start.saturating_add(idx).saturating_add(1);
        let display_line = if line.len() > MAX_LINE_LENGTH { &line[..MAX_LINE_LENGTH] } else { line };
        let _ = writeln!(output, "{line_num:>6}\t{display_line}");
    }

    if end < total_lines {
        let _ = write!(
            output,
            "\n(showing lines {}-{} of {total_lines}; use offset/limit for more)",
            start.saturating_add(1),
            end
        );
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ToolEvent;
    use futures::StreamExt;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ctx() -> ToolContext {
        ToolContext::new(std::env::temp_dir(), "call_1")
    }

    #[tokio::test]
    async fn reads_lines_with_numbers() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "line one").unwrap();
        writeln!(f, "line two").unwrap();

        let mut stream = ReadFileTool
            .invoke(&ctx(), serde_json::json!({"file_path": f.path().to_str().unwrap()}))
            .await;
        match stream.next().await.unwrap() {
            ToolEvent::Done(Ok(output)) => {
                assert!(output.contains("     1\tline one"));
                assert!(output.contains("     2\tline two"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_file_is_path_not_found() {
        let mut stream = ReadFileTool
            .invoke(&ctx(), serde_json::json!({"file_path": "/tmp/kin_nonexistent_12345.txt"}))
            .await;
        match stream.next().await.unwrap() {
            ToolEvent::Done(Err(crate::contract::ToolFailure::Domain(ToolError::PathNotFound(_)))) => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn offset_and_limit_are_honored() {
        let mut f = NamedTempFile::new().unwrap();
        for i in 1..=20 {
            writeln!(f, "line {i}").unwrap();
        }

        let mut stream = ReadFileTool
            .invoke(&ctx(), serde_json::json!({"file_path": f.path().to_str().unwrap(), "offset": 5, "limit": 3}))
            .await;
        match stream.next().await.unwrap() {
            ToolEvent::Done(Ok(output)) => {
                assert!(output.contains("line 5"));
                assert!(output.contains("line 7"));
                assert!(!output.contains("line 8"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
