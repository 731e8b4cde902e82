//! User-provided tools discovered from a directory: one `<name>.json`
//! manifest per tool, each describing a shell command to run. This is the
//! "user global directory" / "trusted-project-local directory" tier the
//! Tool Manager's discovery order names.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::contract::{single_result, Tool, ToolEventStream};
use crate::error::ToolError;
use crate::ToolContext;

#[derive(Debug, Deserialize)]
struct Manifest {
    name: String,
    description: String,
    #[serde(default = "default_schema")]
    input_schema: Value,
    command: String,
}

fn default_schema() -> Value {
    serde_json::json!({"type": "object"})
}

/// A tool backed by a manifest-described shell command. `{{args}}` in the
/// command template is replaced with the JSON-encoded validated arguments.
pub struct ExternalTool {
    manifest: Manifest,
}

impl ExternalTool {
    /// Load one manifest file. Returns `None` (logged, not an error) if the
    /// file cannot be parsed, so one malformed manifest doesn't break
    /// discovery of the rest.
    #[must_use]
    pub fn load(path: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str::<Manifest>(&text) {
            Ok(manifest) => Some(Self { manifest }),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping malformed tool manifest");
                None
            }
        }
    }

    /// Discover every `*.json` manifest directly under `dir`, skipping
    /// entries that fail to load. Returns an empty vec if `dir` does not
    /// exist.
    #[must_use]
    pub fn discover(dir: &Path) -> Vec<Self> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|e| Self::load(&e.path()))
            .collect()
    }
}

#[async_trait]
impl Tool for ExternalTool {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn description(&self) -> &str {
        &self.manifest.description
    }

    fn input_schema(&self) -> Value {
        self.manifest.input_schema.clone()
    }

    fn validate(&self, raw_args: &Value) -> Result<Value, ToolError> {
        Ok(raw_args.clone())
    }

    async fn invoke(&self, ctx: &ToolContext, validated_args: Value) -> ToolEventStream {
        let command = self.manifest.command.replace("{{args}}", &validated_args.to_string());
        let cwd = ctx.current_dir().await;
        let result = run_command(&command, &cwd).await;
        single_result(result.map_err(Into::into))
    }
}

async fn run_command(command: &str, cwd: &PathBuf) -> Result<String, ToolError> {
    let output = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .output()
        .await?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if output.status.success() {
        Ok(stdout.into_owned())
    } else {
        Err(ToolError::ExecutionFailed(format!(
            "{command} exited with {}: {stderr}",
            output.status
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn loads_and_runs_a_manifest_backed_command() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("greet.json"),
            r#"{"name": "greet", "description": "says hi", "command": "echo hi"}"#,
        )
        .unwrap();

        let tools = ExternalTool::discover(dir.path());
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "greet");

        let ctx = ToolContext::new(dir.path().to_path_buf(), "call_1");
        let mut stream = tools[0].invoke(&ctx, serde_json::json!({})).await;
        let event = futures::StreamExt::next(&mut stream).await.unwrap();
        match event {
            crate::contract::ToolEvent::Done(Ok(output)) => assert!(output.contains("hi")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn malformed_manifest_is_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        assert!(ExternalTool::discover(dir.path()).is_empty());
    }
}
