#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The agent loop, tool runner, and sub-agent executor that tie every
//! other `kin-*` crate together into one running session: a
//! before/after-turn middleware pipeline around each LLM call, a
//! pattern-then-permission-then-approval decision tree per tool call,
//! and delegation to isolated child loops through the `task` tool.

mod agent_loop;
mod error;
mod observer;
mod subagent_executor;
mod tool_runner;

pub use agent_loop::{AgentLoop, AgentLoopConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use observer::{MessageObserver, NullObserver};
pub use subagent_executor::SubAgentExecutor;
pub use tool_runner::{render_failed_call, run_one_resolved_call, CallOutcome, RunnerItem, ToolRunnerConfig};
