//! The tool contract: `describe`, `validate`, `check_allowlist_denylist`,
//! `invoke`, and the presentational display helpers.
//!
//! `invoke()` returns a stream of [`ToolEvent`]s terminated by exactly
//! one `Done` rather than a single future, so long-running tools can
//! surface progress while they work.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;

use crate::error::{ToolError, ToolPermissionError};
use crate::pattern::Pattern;
use crate::ToolContext;

/// A progress update a tool emits while it runs, before its terminal
/// result. Rendered to the frontend as `Event::ToolStream`.
#[derive(Debug, Clone)]
pub struct ToolStreamEvent {
    /// Human-readable progress text.
    pub message: String,
}

/// Why an invocation did not produce a result: a domain failure
/// (recoverable, reported as the tool's error text) or a permission
/// rejection (re-classified by the runner as a denial, not a failure).
#[derive(Debug)]
pub enum ToolFailure {
    /// The tool ran but failed.
    Domain(ToolError),
    /// The call was denied.
    Permission(ToolPermissionError),
}

impl From<ToolError> for ToolFailure {
    fn from(err: ToolError) -> Self {
        Self::Domain(err)
    }
}

impl From<ToolPermissionError> for ToolFailure {
    fn from(err: ToolPermissionError) -> Self {
        Self::Permission(err)
    }
}

/// One item of a tool's invocation stream: any number of `Progress` events,
/// followed by exactly one `Done`.
#[derive(Debug)]
pub enum ToolEvent {
    /// A progress update; does not terminate the stream.
    Progress(ToolStreamEvent),
    /// The terminal outcome. The stream must not yield after this.
    Done(Result<String, ToolFailure>),
}

/// A boxed, send-able stream of [`ToolEvent`]s.
pub type ToolEventStream = Pin<Box<dyn Stream<Item = ToolEvent> + Send>>;

/// A tool's static description, as exposed to the LLM.
#[derive(Debug, Clone)]
pub struct ToolDescription {
    /// Tool name, as the model will call it.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema of the tool's arguments.
    pub input_schema: Value,
}

/// Whether a pattern check settles a call's fate outright, bypassing user
/// approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowlistVerdict {
    /// A denylist pattern matched; the call must be skipped.
    Never,
    /// An allowlist pattern matched (and no denylist pattern did); the
    /// call may proceed without asking.
    Always,
    /// Neither list was conclusive; fall through to `ToolPermission`/user
    /// approval.
    None,
}

/// A tool: polymorphic over `{describe, validate, invoke, display}`.
///
/// Implementations must not hold mutable state shared across invocations;
/// whatever a tool needs to track (e.g. a shell's working directory) lives
/// on [`ToolContext`], which the Tool Manager threads through instead.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, unique within one Tool Manager.
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON schema of the tool's arguments.
    fn input_schema(&self) -> Value;

    /// The tool's static description, as exposed to the LLM.
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }

    /// Validate and normalize `raw_args` before `invoke` ever sees them.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] if a required field is
    /// missing or malformed.
    fn validate(&self, raw_args: &Value) -> Result<Value, ToolError>;

    /// Extract the text `check_allowlist_denylist`'s patterns are matched
    /// against. Tools with no meaningful pattern surface (most of them)
    /// use the default, which matches the whole argument object.
    fn match_text(&self, validated_args: &Value) -> String {
        validated_args
            .as_str()
            .map_or_else(|| validated_args.to_string(), str::to_string)
    }

    /// Pattern-only check against configured allow/deny lists; does not
    /// consult the user. A denylist match always wins over an allowlist
    /// match on the same call.
    fn check_allowlist_denylist(
        &self,
        validated_args: &Value,
        allowlist: &[Pattern],
        denylist: &[Pattern],
    ) -> AllowlistVerdict {
        let text = self.match_text(validated_args);
        if denylist.iter().any(|p| p.matches(&text)) {
            AllowlistVerdict::Never
        } else if allowlist.iter().any(|p| p.matches(&text)) {
            AllowlistVerdict::Always
        } else {
            AllowlistVerdict::None
        }
    }

    /// Run the tool. Exactly one [`ToolEvent::Done`] must terminate the
    /// stream; any [`ToolEvent::Progress`] items before it are optional.
    async fn invoke(&self, ctx: &ToolContext, validated_args: Value) -> ToolEventStream;

    /// Presentational hint for rendering a call before it executes.
    fn get_call_display(&self, validated_args: &Value) -> String {
        format!("{}({})", self.name(), validated_args)
    }

    /// Presentational hint for rendering a completed result.
    fn get_result_display(&self, result: &str) -> String {
        result.to_string()
    }
}

/// Wrap a single, already-computed [`crate::error::ToolResult`] as a
/// one-event stream. Most builtin tools have no meaningful progress to
/// report and use this instead of hand-rolling a stream.
#[must_use]
pub fn single_result(result: Result<String, ToolFailure>) -> ToolEventStream {
    Box::pin(futures::stream::once(async move { ToolEvent::Done(result) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "echoes its input"
        }

        fn input_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }

        fn validate(&self, raw_args: &Value) -> Result<Value, ToolError> {
            Ok(raw_args.clone())
        }

        async fn invoke(&self, _ctx: &ToolContext, validated_args: Value) -> ToolEventStream {
            single_result(Ok(validated_args.to_string()))
        }
    }

    #[tokio::test]
    async fn single_result_stream_yields_exactly_one_done() {
        let ctx = ToolContext::new(std::env::temp_dir(), "call_1");
        let mut stream = EchoTool.invoke(&ctx, serde_json::json!({"a": 1})).await;
        let first = stream.next().await;
        assert!(matches!(first, Some(ToolEvent::Done(Ok(_)))));
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn denylist_wins_over_allowlist_on_the_same_call() {
        let allow = vec![Pattern::parse("git *").unwrap()];
        let deny = vec![Pattern::parse("git push*").unwrap()];
        let verdict = EchoTool.check_allowlist_denylist(&serde_json::json!("git push origin"), &allow, &deny);
        assert_eq!(verdict, AllowlistVerdict::Never);
    }
}
