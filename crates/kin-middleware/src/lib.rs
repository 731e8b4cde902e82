#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The before/after-turn middleware pipeline.
//!
//! Hooks run in registration order with a four-valued verdict
//! (continue/stop/compact/inject-message); the first stop or compact
//! short-circuits the rest. A middleware only ever sees a read-only
//! `{messages, stats, agent_profile}` view and influences the loop
//! exclusively through its returned verdict.

mod concrete;
mod pipeline;

pub use concrete::{AutoCompact, ContextWarning, PlanAgentReminder, PriceLimit, TurnLimit};
pub use pipeline::{InjectInAfterTurnError, MiddlewarePipeline};

use kin_core::{AgentStats, Message, MiddlewareResult};

/// Why a middleware's state is being reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// The loop is stopping entirely.
    Stop,
    /// The history is about to be (or was just) compacted.
    Compact,
}

/// The read-only view a middleware sees of the loop's state.
pub struct MiddlewareContext<'a> {
    /// Current message history.
    pub messages: &'a [Message],
    /// Current stats snapshot.
    pub stats: &'a AgentStats,
    /// Name of the active agent profile (e.g. `"plan"`).
    pub agent_profile_name: &'a str,
}

/// One before/after-turn hook in the pipeline.
pub trait Middleware: Send + Sync {
    /// Short, stable name used in diagnostics.
    fn name(&self) -> &str;

    /// Called before each LLM turn.
    fn before_turn(&mut self, ctx: &MiddlewareContext<'_>) -> MiddlewareResult;

    /// Called after a turn that produced no tool calls, before the loop
    /// would otherwise terminate. Must never return `InjectMessage`.
    fn after_turn(&mut self, ctx: &MiddlewareContext<'_>) -> MiddlewareResult;

    /// Clear or preserve internal state depending on why the loop reset.
    fn reset(&mut self, reason: ResetReason);
}
