//! The concrete middlewares: turn and price caps, automatic compaction,
//! the one-shot context warning, and the plan-mode reminder.

use std::collections::HashMap;

use kin_core::MiddlewareResult;

use crate::{Middleware, MiddlewareContext, ResetReason};

/// Stops the loop after `max_turns` completed turns.
pub struct TurnLimit {
    max_turns: u64,
}

impl TurnLimit {
    /// Construct with the given turn cap.
    #[must_use]
    pub fn new(max_turns: u64) -> Self {
        Self { max_turns }
    }
}

impl Middleware for TurnLimit {
    fn name(&self) -> &str {
        "turn_limit"
    }

    fn before_turn(&mut self, ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
        if ctx.stats.steps.saturating_sub(1) >= self.max_turns {
            return MiddlewareResult::stop(format!("Turn limit of {} reached", self.max_turns));
        }
        MiddlewareResult::cont()
    }

    fn after_turn(&mut self, _ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
        MiddlewareResult::cont()
    }

    fn reset(&mut self, _reason: ResetReason) {}
}

/// Stops the loop once session cost exceeds `max_dollars`.
pub struct PriceLimit {
    max_dollars: f64,
}

impl PriceLimit {
    /// Construct with the given dollar cap.
    #[must_use]
    pub fn new(max_dollars: f64) -> Self {
        Self { max_dollars }
    }
}

impl Middleware for PriceLimit {
    fn name(&self) -> &str {
        "price_limit"
    }

    fn before_turn(&mut self, ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
        if ctx.stats.session_cost() > self.max_dollars {
            return MiddlewareResult::stop(format!(
                "Price limit of ${:.2} exceeded",
                self.max_dollars
            ));
        }
        MiddlewareResult::cont()
    }

    fn after_turn(&mut self, _ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
        MiddlewareResult::cont()
    }

    fn reset(&mut self, _reason: ResetReason) {}
}

/// Triggers compaction once context usage crosses `percent * max_context`,
/// capped at `hard_ceiling` tokens if one is configured.
pub struct AutoCompact {
    percent: f64,
    max_context: u64,
    hard_ceiling: Option<u64>,
}

impl AutoCompact {
    /// Construct with a usage fraction, the model's context window, and an
    /// optional absolute token ceiling.
    #[must_use]
    pub fn new(percent: f64, max_context: u64, hard_ceiling: Option<u64>) -> Self {
        Self {
            percent,
            max_context,
            hard_ceiling,
        }
    }

    fn threshold(&self) -> u64 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let by_percent = (self.percent * self.max_context as f64) as u64;
        self.hard_ceiling.map_or(by_percent, |c| by_percent.min(c))
    }
}

impl Middleware for AutoCompact {
    fn name(&self) -> &str {
        "auto_compact"
    }

    fn before_turn(&mut self, ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
        let threshold = self.threshold();
        if ctx.stats.context_tokens >= threshold {
            let mut metadata = HashMap::new();
            metadata.insert(
                "old_tokens".to_string(),
                serde_json::json!(ctx.stats.context_tokens),
            );
            metadata.insert("threshold".to_string(), serde_json::json!(threshold));
            return MiddlewareResult::compact(metadata);
        }
        MiddlewareResult::cont()
    }

    fn after_turn(&mut self, _ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
        MiddlewareResult::cont()
    }

    fn reset(&mut self, _reason: ResetReason) {}
}

/// Injects a one-time warning the first time context usage crosses
/// `fraction * max_context`. The fired flag clears on `Compact` resets
/// (compaction makes the warning relevant again) but survives `Stop`
/// resets.
pub struct ContextWarning {
    fraction: f64,
    max_context: u64,
    fired: bool,
}

impl ContextWarning {
    /// Construct with a usage fraction and the model's context window.
    #[must_use]
    pub fn new(fraction: f64, max_context: u64) -> Self {
        Self {
            fraction,
            max_context,
            fired: false,
        }
    }
}

impl Middleware for ContextWarning {
    fn name(&self) -> &str {
        "context_warning"
    }

    fn before_turn(&mut self, ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let threshold = (self.fraction * self.max_context as f64) as u64;
        if !self.fired && ctx.stats.context_tokens >= threshold {
            self.fired = true;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let percent = (self.fraction * 100.0) as u64;
            return MiddlewareResult::inject(format!(
                "<kin_warning>{percent}% of context used</kin_warning>"
            ));
        }
        MiddlewareResult::cont()
    }

    fn after_turn(&mut self, _ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
        MiddlewareResult::cont()
    }

    fn reset(&mut self, reason: ResetReason) {
        if reason == ResetReason::Compact {
            self.fired = false;
        }
    }
}

/// Reminds the model it is in read-only "plan" mode when the active
/// profile is named `"plan"`.
#[derive(Default)]
pub struct PlanAgentReminder;

const PLAN_REMINDER: &str =
    "<kin_warning>You are in plan mode: investigate and propose, but do not modify the project.</kin_warning>";

impl Middleware for PlanAgentReminder {
    fn name(&self) -> &str {
        "plan_agent_reminder"
    }

    fn before_turn(&mut self, ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
        if ctx.agent_profile_name == "plan" {
            return MiddlewareResult::inject(PLAN_REMINDER);
        }
        MiddlewareResult::cont()
    }

    fn after_turn(&mut self, _ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
        MiddlewareResult::cont()
    }

    fn reset(&mut self, _reason: ResetReason) {
        // Stateless; state survives every reset because there is none.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kin_core::{AgentStats, MiddlewareAction};

    fn ctx(stats: &AgentStats) -> MiddlewareContext<'_> {
        MiddlewareContext {
            messages: &[],
            stats,
            agent_profile_name: "default",
        }
    }

    #[test]
    fn turn_limit_stops_once_reached() {
        let mut mw = TurnLimit::new(1);
        let mut stats = AgentStats::default();
        stats.steps = 2; // one user-message increment + one turn increment
        let result = mw.before_turn(&ctx(&stats));
        assert_eq!(result.action, Some(MiddlewareAction::Stop));
        assert!(result.reason.unwrap().contains("Turn limit of 1"));
    }

    #[test]
    fn turn_limit_continues_before_reached() {
        let mut mw = TurnLimit::new(5);
        let mut stats = AgentStats::default();
        stats.steps = 2;
        assert!(mw.before_turn(&ctx(&stats)).is_continue());
    }

    #[test]
    fn price_limit_stops_when_exceeded() {
        let mut mw = PriceLimit::new(1.0);
        let mut stats = AgentStats {
            input_price_per_million: 1_000_000.0,
            ..Default::default()
        };
        stats.record_turn(2, 0, 10);
        let result = mw.before_turn(&ctx(&stats));
        assert_eq!(result.action, Some(MiddlewareAction::Stop));
    }

    #[test]
    fn auto_compact_triggers_at_threshold() {
        let mut mw = AutoCompact::new(0.9, 1000, None);
        let mut stats = AgentStats::default();
        stats.context_tokens = 950;
        let result = mw.before_turn(&ctx(&stats));
        assert_eq!(result.action, Some(MiddlewareAction::Compact));
        assert_eq!(result.metadata["old_tokens"], serde_json::json!(950));
        assert_eq!(result.metadata["threshold"], serde_json::json!(900));
    }

    #[test]
    fn auto_compact_respects_hard_ceiling() {
        let mw_threshold = AutoCompact::new(0.9, 1_000_000, Some(500)).threshold();
        assert_eq!(mw_threshold, 500);
    }

    #[test]
    fn context_warning_fires_once() {
        let mut mw = ContextWarning::new(0.5, 1000);
        let mut stats = AgentStats::default();
        stats.context_tokens = 600;
        let first = mw.before_turn(&ctx(&stats));
        assert_eq!(first.action, Some(MiddlewareAction::InjectMessage));
        let second = mw.before_turn(&ctx(&stats));
        assert!(second.is_continue());
    }

    #[test]
    fn context_warning_clears_on_compact_not_stop() {
        let mut mw = ContextWarning::new(0.5, 1000);
        let mut stats = AgentStats::default();
        stats.context_tokens = 600;
        mw.before_turn(&ctx(&stats));
        mw.reset(ResetReason::Stop);
        assert!(mw.before_turn(&ctx(&stats)).is_continue());
        mw.reset(ResetReason::Compact);
        assert!(!mw.before_turn(&ctx(&stats)).is_continue());
    }

    #[test]
    fn plan_reminder_fires_only_for_plan_profile() {
        let mut mw = PlanAgentReminder;
        let stats = AgentStats::default();
        let default_ctx = MiddlewareContext {
            messages: &[],
            stats: &stats,
            agent_profile_name: "default",
        };
        assert!(mw.before_turn(&default_ctx).is_continue());

        let plan_ctx = MiddlewareContext {
            messages: &[],
            stats: &stats,
            agent_profile_name: "plan",
        };
        assert_eq!(
            mw.before_turn(&plan_ctx).action,
            Some(MiddlewareAction::InjectMessage)
        );
    }
}
