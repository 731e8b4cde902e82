//! The tool runner: turns one assistant turn's resolved/failed tool calls
//! into events and tool-role messages.
//!
//! Each call goes through the same chain: `auto_approve`, then
//! `Tool::check_allowlist_denylist`, then the per-tool `ToolPermission`,
//! then the approval callback. Calls execute serially, in the order the
//! model issued them.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use futures::{Stream, StreamExt};
use kin_core::{tag, AgentProfile, ErrorTag, Event, FailedToolCall, Message, ResolvedToolCall, ToolPermission};
use kin_tools::{
    AllowlistVerdict, ApprovalCallback, ApprovalDecision, Pattern, ToolContext, ToolEvent,
    ToolFailure, ToolManager,
};
use tokio_util::sync::CancellationToken;

/// Allow/deny pattern lists and the blanket auto-approve switch the tool
/// runner consults before falling through to the approval callback.
///
/// Kept separate from [`kin_core::AgentProfile`], which only carries
/// per-tool [`ToolPermission`] values: pattern lists are session policy
/// set by the frontend, not part of a named profile.
#[derive(Debug, Clone, Default)]
pub struct ToolRunnerConfig {
    /// When set, every resolved call executes without consulting patterns,
    /// per-tool permission, or the approval callback.
    pub auto_approve: bool,
    /// Per-tool allowlist patterns, keyed by tool name.
    pub allowlists: HashMap<String, Vec<Pattern>>,
    /// Per-tool denylist patterns, keyed by tool name.
    pub denylists: HashMap<String, Vec<Pattern>>,
}

impl ToolRunnerConfig {
    fn allow_for<'a>(&'a self, tool_name: &str) -> &'a [Pattern] {
        self.allowlists.get(tool_name).map_or(&[], Vec::as_slice)
    }

    fn deny_for<'a>(&'a self, tool_name: &str) -> &'a [Pattern] {
        self.denylists.get(tool_name).map_or(&[], Vec::as_slice)
    }
}

enum Decision {
    Execute,
    /// `Some` carries feedback (denylist match, disabled permission, or a
    /// user-supplied reason) emitted as plain text; `None` is a bare user
    /// rejection, rendered as the tagged default cancellation message.
    Skip(Option<String>),
}

/// One delta produced while running a single resolved call: an event to
/// forward to the `act()` caller, a message to append to history, or the
/// call's final bookkeeping outcome.
pub enum RunnerItem {
    /// Forward this event to the `act()` caller verbatim.
    Emit(Event),
    /// Append this message to history.
    Append(Message),
    /// The call finished; apply these deltas to `AgentStats`.
    Outcome(CallOutcome),
}

/// Stat deltas one resolved call produced, applied by the caller after the
/// call completes (kept out of this module so it never needs a mutable
/// borrow of `AgentStats` alongside the generator's other captures).
#[derive(Debug, Clone, Copy, Default)]
pub struct CallOutcome {
    /// The call was approved for execution (auto or user).
    pub agreed: bool,
    /// The call was skipped or its approval was revoked mid-flight.
    pub rejected: bool,
    /// The call ran to completion successfully.
    pub succeeded: bool,
    /// The call ran and failed.
    pub failed: bool,
    /// The call was interrupted by user cancellation.
    pub cancelled: bool,
}

/// Render one [`FailedToolCall`] (unknown tool, or arguments that failed
/// validation) as its event plus the tool-role message the model sees.
#[must_use]
pub fn render_failed_call(failed: &FailedToolCall) -> (Event, Message) {
    let text = tag(ErrorTag::ToolError, &failed.error);
    let event = Event::ToolResult {
        tool_name: failed.tool_name.clone(),
        tool_class: failed.tool_name.clone(),
        result: None,
        error: Some(text.clone()),
        skipped: true,
        skip_reason: Some(text.clone()),
        duration_ms: 0,
        call_id: failed.call_id.clone(),
    };
    let message = Message::tool_result(failed.call_id.clone(), failed.tool_name.clone(), text);
    (event, message)
}

/// Run one resolved call to completion, yielding [`RunnerItem`]s as it
/// goes. A nested generator (rather than a plain async fn returning a
/// `Vec`) so `ToolStreamEvent`s reach the `act()` caller as they're
/// produced instead of being buffered until the call finishes.
#[allow(clippy::too_many_arguments)]
pub fn run_one_resolved_call<'a>(
    call: &'a ResolvedToolCall,
    tool_manager: &'a ToolManager,
    tool_ctx: &'a ToolContext,
    runner_config: &'a ToolRunnerConfig,
    profile: &'a AgentProfile,
    approval_callback: &'a Arc<dyn ApprovalCallback>,
    cancel: &'a CancellationToken,
) -> Pin<Box<dyn Stream<Item = RunnerItem> + Send + 'a>> {
    Box::pin(async_stream::stream! {
        let Some(tool) = tool_manager.get(&call.tool_class) else {
            let text = tag(ErrorTag::ToolError, format!("tool {} is no longer available", call.tool_class));
            yield RunnerItem::Emit(Event::ToolResult{
                tool_name: call.tool_class.clone(), tool_class: call.tool_class.clone(),
                result: None, error: Some(text.clone()), skipped: true, skip_reason: Some(text.clone()),
                duration_ms: 0, call_id: call.call_id.clone(),
            });
            yield RunnerItem::Append(Message::tool_result(call.call_id.clone(), call.tool_class.clone(), text));
            yield RunnerItem::Outcome(CallOutcome{rejected: true, ..CallOutcome::default()});
            return;
        };

        yield RunnerItem::Emit(Event::ToolCall{
            tool_name: tool.name().to_string(),
            tool_class: call.tool_class.clone(),
            validated_args: call.validated_args.clone(),
            call_id: call.call_id.clone(),
        });

        let decision = if runner_config.auto_approve {
            Decision::Execute
        } else {
            match tool.check_allowlist_denylist(
                &call.validated_args,
                runner_config.allow_for(tool.name()),
                runner_config.deny_for(tool.name()),
            ) {
                AllowlistVerdict::Always => Decision::Execute,
                AllowlistVerdict::Never => {
                    Decision::Skip(Some(format!("{} is denylisted for this call", tool.name())))
                }
                AllowlistVerdict::None => match profile.tool_permissions.get(tool.name()) {
                    Some(ToolPermission::Always) => Decision::Execute,
                    Some(ToolPermission::Never) => {
                        Decision::Skip(Some(format!("{} is permanently disabled", tool.name())))
                    }
                    Some(ToolPermission::Ask) | None => {
                        let args_json = call.validated_args.to_string();
                        match approval_callback.approve(tool.name(), &args_json, &call.call_id).await {
                            ApprovalDecision::Yes => Decision::Execute,
                            ApprovalDecision::No { feedback } => Decision::Skip(feedback),
                        }
                    }
                },
            }
        };

        match decision {
            Decision::Skip(feedback) => {
                let text = feedback.unwrap_or_else(|| {
                    tag(ErrorTag::UserCancellation, "Tool execution skipped by user")
                });
                yield RunnerItem::Emit(Event::ToolResult{
                    tool_name: tool.name().to_string(), tool_class: call.tool_class.clone(),
                    result: None, error: Some(text.clone()), skipped: true, skip_reason: Some(text.clone()),
                    duration_ms: 0, call_id: call.call_id.clone(),
                });
                yield RunnerItem::Append(Message::tool_result(call.call_id.clone(), tool.name(), text));
                yield RunnerItem::Outcome(CallOutcome{rejected: true, ..CallOutcome::default()});
            }
            Decision::Execute => {
                let started = Instant::now();
                let mut stream = tool.invoke(tool_ctx, call.validated_args.clone()).await;
                let mut cancelled = false;
                let mut outcome = None;

                loop {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => { cancelled = true; break; }
                        next = stream.next() => {
                            match next {
                                Some(ToolEvent::Progress(p)) => {
                                    yield RunnerItem::Emit(Event::ToolStream{
                                        tool_name: tool.name().to_string(),
                                        message: p.message,
                                        call_id: call.call_id.clone(),
                                    });
                                }
                                Some(ToolEvent::Done(result)) => { outcome = Some(result); break; }
                                None => break,
                            }
                        }
                    }
                }

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = started.elapsed().as_millis() as u64;

                if cancelled {
                    let text = tag(ErrorTag::UserCancellation, "tool execution interrupted");
                    yield RunnerItem::Emit(Event::ToolResult{
                        tool_name: tool.name().to_string(), tool_class: call.tool_class.clone(),
                        result: None, error: Some(text.clone()), skipped: false, skip_reason: None,
                        duration_ms, call_id: call.call_id.clone(),
                    });
                    yield RunnerItem::Append(Message::tool_result(call.call_id.clone(), tool.name(), text));
                    yield RunnerItem::Outcome(CallOutcome{agreed: true, cancelled: true, ..CallOutcome::default()});
                } else {
                    match outcome {
                        Some(Ok(text)) => {
                            yield RunnerItem::Emit(Event::ToolResult{
                                tool_name: tool.name().to_string(), tool_class: call.tool_class.clone(),
                                result: Some(text.clone()), error: None, skipped: false, skip_reason: None,
                                duration_ms, call_id: call.call_id.clone(),
                            });
                            yield RunnerItem::Append(Message::tool_result(call.call_id.clone(), tool.name(), text));
                            yield RunnerItem::Outcome(CallOutcome{agreed: true, succeeded: true, ..CallOutcome::default()});
                        }
                        Some(Err(ToolFailure::Permission(e))) => {
                            let text = tag(ErrorTag::ToolError, e.to_string());
                            yield RunnerItem::Emit(Event::ToolResult{
                                tool_name: tool.name().to_string(), tool_class: call.tool_class.clone(),
                                result: None, error: Some(text.clone()), skipped: true, skip_reason: Some(text.clone()),
                                duration_ms, call_id: call.call_id.clone(),
                            });
                            yield RunnerItem::Append(Message::tool_result(call.call_id.clone(), tool.name(), text));
                            yield RunnerItem::Outcome(CallOutcome{rejected: true, ..CallOutcome::default()});
                        }
                        Some(Err(ToolFailure::Domain(e))) => {
                            let text = tag(ErrorTag::ToolError, e.to_string());
                            yield RunnerItem::Emit(Event::ToolResult{
                                tool_name: tool.name().to_string(), tool_class: call.tool_class.clone(),
                                result: None, error: Some(text.clone()), skipped: false, skip_reason: None,
                                duration_ms, call_id: call.call_id.clone(),
                            });
                            yield RunnerItem::Append(Message::tool_result(call.call_id.clone(), tool.name(), text));
                            yield RunnerItem::Outcome(CallOutcome{agreed: true, failed: true, ..CallOutcome::default()});
                        }
                        None => {
                            let text = tag(ErrorTag::ToolError, "tool stream ended without a result");
                            yield RunnerItem::Emit(Event::ToolResult{
                                tool_name: tool.name().to_string(), tool_class: call.tool_class.clone(),
                                result: None, error: Some(text.clone()), skipped: false, skip_reason: None,
                                duration_ms, call_id: call.call_id.clone(),
                            });
                            yield RunnerItem::Append(Message::tool_result(call.call_id.clone(), tool.name(), text));
                            yield RunnerItem::Outcome(CallOutcome{agreed: true, failed: true, ..CallOutcome::default()});
                        }
                    }
                }
            }
        }
    })
}
