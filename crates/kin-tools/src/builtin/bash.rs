//! Shell tool — runs a command, tracking `cd`-induced working-directory
//! changes across invocations via a sentinel line appended to the
//! command, so one call's `cd` is visible to the next through the
//! context's shared cwd.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::contract::{single_result, Tool, ToolEventStream};
use crate::error::ToolError;
use crate::ToolContext;

const DEFAULT_TIMEOUT_MS: u64 = 120_000;
const MAX_TIMEOUT_MS: u64 = 600_000;
const CWD_SENTINEL: &str = "__KIN_CWD__";

/// Built-in tool for running shell commands.
pub struct BashTool;

struct ValidatedArgs {
    command: String,
    timeout_ms: u64,
}

fn validate_args(raw_args: &Value) -> Result<ValidatedArgs, ToolError> {
    let command = raw_args
        .get("command")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments("command is required".into()))?
        .to_string();

    let timeout_ms = raw_args
        .get("timeout_ms")
        .and_then(Value::as_u64)
        .map_or(DEFAULT_TIMEOUT_MS, |v| v.min(MAX_TIMEOUT_MS));

    Ok(ValidatedArgs { command, timeout_ms })
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Runs a shell command and returns its stdout, stderr, and exit code. \
         The working directory persists across calls within one session, so a \
         `cd` in one call is visible to the next."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to run"
                },
                "timeout_ms": {
                    "type": "integer",
                    "description": "Maximum time to allow the command to run, in milliseconds (default 120000, max 600000)"
                }
            },
            "required": ["command"]
        })
    }

    fn validate(&self, raw_args: &Value) -> Result<Value, ToolError> {
        let parsed = validate_args(raw_args)?;
        Ok(serde_json::json!({"command": parsed.command, "timeout_ms": parsed.timeout_ms}))
    }

    fn match_text(&self, validated_args: &Value) -> String {
        validated_args.get("command").and_then(Value::as_str).unwrap_or_default().to_string()
    }

    async fn invoke(&self, ctx: &ToolContext, validated_args: Value) -> ToolEventStream {
        let Ok(parsed) = validate_args(&validated_args) else {
            return single_result(Err(ToolError::InvalidArguments("missing command".into()).into()));
        };
        let cwd = ctx.current_dir().await;

        let wrapped = format!(
            "{}\n__KIN_EXIT__=$?\necho \"{CWD_SENTINEL}\"\npwd\nexit $__KIN_EXIT__",
            parsed.command
        );

        let result = match tokio::time::timeout(Duration::from_millis(parsed.timeout_ms), run_bash(&wrapped, &cwd)).await {
            Ok(Ok((stdout, stderr, exit_code))) => {
                let (output, new_cwd) = parse_sentinel_output(&stdout);
                if let Some(new_cwd) = new_cwd {
                    ctx.set_current_dir(new_cwd).await;
                }
                Ok(render_result(&output, &stderr, exit_code))
            }
            Ok(Err(err)) => Err(ToolError::from(err)),
            Err(_) => Err(ToolError::Timeout(parsed.timeout_ms)),
        };

        single_result(result.map_err(Into::into))
    }

    fn get_call_display(&self, validated_args: &Value) -> String {
        validated_args.get("command").and_then(Value::as_str).unwrap_or("").to_string()
    }
}

async fn run_bash(command: &str, cwd: &PathBuf) -> std::io::Result<(String, String, i32)> {
    let output = tokio::process::Command::new("bash")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .output()
        .await?;
    Ok((
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
        output.status.code().unwrap_or(-1),
    ))
}

/// Splits `stdout` on [`CWD_SENTINEL`], returning the command's real output
/// and, if the sentinel was found, the `pwd` line that followed it.
fn parse_sentinel_output(stdout: &str) -> (String, Option<PathBuf>) {
    match stdout.rsplit_once(CWD_SENTINEL) {
        Some((before, after)) => {
            let new_cwd = after.lines().find(|l| !l.trim().is_empty()).map(|l| PathBuf::from(l.trim()));
            (before.trim_end_matches('\n').to_string(), new_cwd)
        }
        None => (stdout.to_string(), None),
    }
}

fn render_result(stdout: &str, stderr: &str, exit_code: i32) -> String {
    let mut parts = Vec::new();
    if stdout.is_empty() && stderr.is_empty() {
        parts.push("(no output)".to_string());
    } else if !stdout.is_empty() {
        parts.push(stdout.to_string());
    }
    if !stderr.is_empty() {
        parts.push(format!("STDERR:\n{stderr}"));
    }
    if exit_code != 0 {
        parts.push(format!("(exit code: {exit_code})"));
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ToolEvent;
    use futures::StreamExt;

    fn ctx(root: PathBuf) -> ToolContext {
        ToolContext::new(root, "call_1")
    }

    #[tokio::test]
    async fn echo_returns_stdout() {
        let ctx = ctx(std::env::temp_dir());
        let mut stream = BashTool
            .invoke(&ctx, serde_json::json!({"command": "echo hi"}))
            .await;
        match stream.next().await.unwrap() {
            ToolEvent::Done(Ok(output)) => assert!(output.contains("hi")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let ctx = ctx(std::env::temp_dir());
        let mut stream = BashTool
            .invoke(&ctx, serde_json::json!({"command": "exit 7"}))
            .await;
        match stream.next().await.unwrap() {
            ToolEvent::Done(Ok(output)) => assert!(output.contains("exit code: 7")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cwd_persists_across_invocations() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        let ctx = ctx(dir.path().to_path_buf());

        let mut first = BashTool.invoke(&ctx, serde_json::json!({"command": "cd sub"})).await;
        first.next().await;

        let mut second = BashTool.invoke(&ctx, serde_json::json!({"command": "pwd"})).await;
        match second.next().await.unwrap() {
            ToolEvent::Done(Ok(output)) => assert!(output.contains("sub")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_is_enforced() {
        let ctx = ctx(std::env::temp_dir());
        let mut stream = BashTool
            .invoke(&ctx, serde_json::json!({"command": "sleep 2", "timeout_ms": 50}))
            .await;
        match stream.next().await.unwrap() {
            ToolEvent::Done(Err(crate::contract::ToolFailure::Domain(ToolError::Timeout(ms)))) => assert_eq!(ms, 50),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn sentinel_output_without_sentinel_is_passed_through() {
        let (output, cwd) = parse_sentinel_output("plain output\n");
        assert_eq!(output, "plain output");
        assert!(cwd.is_none());
    }
}
