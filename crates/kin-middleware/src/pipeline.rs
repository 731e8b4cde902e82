//! Ordered execution of a list of [`crate::Middleware`]s.

use kin_core::{MiddlewareAction, MiddlewareResult};
use thiserror::Error;

use crate::{Middleware, MiddlewareContext, ResetReason};

/// Raised when an `after_turn` hook returns `InjectMessage`. There is no
/// later LLM call in the turn to observe the injected text, so doing
/// this is always an implementation error in the middleware.
#[derive(Debug, Error)]
#[error("middleware {0} returned InjectMessage from after_turn, which is not allowed")]
pub struct InjectInAfterTurnError(pub String);

/// An ordered list of middlewares, run in registration order.
#[derive(Default)]
pub struct MiddlewarePipeline {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewarePipeline {
    /// An empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware to the end of the pipeline.
    pub fn push(&mut self, middleware: Box<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Run every middleware's `before_turn` in order.
    ///
    /// The first `Stop` or `Compact` short-circuits and is returned
    /// immediately. Otherwise, any `InjectMessage` payloads are collected
    /// and returned joined by blank lines; if none fired, `Continue`.
    pub fn run_before_turn(&mut self, ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
        let mut injected = Vec::new();
        for middleware in &mut self.middlewares {
            let result = middleware.before_turn(ctx);
            match result.action {
                Some(MiddlewareAction::Stop) | Some(MiddlewareAction::Compact) => return result,
                Some(MiddlewareAction::InjectMessage) => {
                    if let Some(message) = result.message {
                        injected.push(message);
                    }
                }
                Some(MiddlewareAction::Continue) | None => {}
            }
        }
        if injected.is_empty() {
            MiddlewareResult::cont()
        } else {
            MiddlewareResult::inject(injected.join("\n\n"))
        }
    }

    /// Run every middleware's `after_turn` in order. `InjectMessage` is not
    /// a valid result here; returning one is an implementation error.
    pub fn run_after_turn(
        &mut self,
        ctx: &MiddlewareContext<'_>,
    ) -> Result<MiddlewareResult, InjectInAfterTurnError> {
        for middleware in &mut self.middlewares {
            let result = middleware.after_turn(ctx);
            match result.action {
                Some(MiddlewareAction::Stop) | Some(MiddlewareAction::Compact) => {
                    return Ok(result)
                }
                Some(MiddlewareAction::InjectMessage) => {
                    return Err(InjectInAfterTurnError(middleware.name().to_string()))
                }
                Some(MiddlewareAction::Continue) | None => {}
            }
        }
        Ok(MiddlewareResult::cont())
    }

    /// Forward a reset to every middleware.
    pub fn reset(&mut self, reason: ResetReason) {
        for middleware in &mut self.middlewares {
            middleware.reset(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kin_core::AgentStats;

    struct AlwaysInject(&'static str);
    impl Middleware for AlwaysInject {
        fn name(&self) -> &str {
            "always_inject"
        }
        fn before_turn(&mut self, _ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
            MiddlewareResult::inject(self.0)
        }
        fn after_turn(&mut self, _ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
            MiddlewareResult::inject(self.0)
        }
        fn reset(&mut self, _reason: ResetReason) {}
    }

    struct AlwaysStop;
    impl Middleware for AlwaysStop {
        fn name(&self) -> &str {
            "always_stop"
        }
        fn before_turn(&mut self, _ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
            MiddlewareResult::stop("stopped")
        }
        fn after_turn(&mut self, _ctx: &MiddlewareContext<'_>) -> MiddlewareResult {
            MiddlewareResult::stop("stopped")
        }
        fn reset(&mut self, _reason: ResetReason) {}
    }

    fn ctx(stats: &AgentStats) -> MiddlewareContext<'_> {
        MiddlewareContext {
            messages: &[],
            stats,
            agent_profile_name: "default",
        }
    }

    #[test]
    fn before_turn_combines_multiple_injects() {
        let mut pipeline = MiddlewarePipeline::new();
        pipeline.push(Box::new(AlwaysInject("first")));
        pipeline.push(Box::new(AlwaysInject("second")));
        let stats = AgentStats::default();
        let result = pipeline.run_before_turn(&ctx(&stats));
        assert_eq!(result.message.as_deref(), Some("first\n\nsecond"));
    }

    #[test]
    fn before_turn_short_circuits_on_stop() {
        let mut pipeline = MiddlewarePipeline::new();
        pipeline.push(Box::new(AlwaysInject("never seen")));
        pipeline.push(Box::new(AlwaysStop));
        let stats = AgentStats::default();
        let result = pipeline.run_before_turn(&ctx(&stats));
        assert_eq!(result.action, Some(MiddlewareAction::Stop));
    }

    #[test]
    fn after_turn_rejects_inject_message() {
        let mut pipeline = MiddlewarePipeline::new();
        pipeline.push(Box::new(AlwaysInject("bad")));
        let stats = AgentStats::default();
        let result = pipeline.run_after_turn(&ctx(&stats));
        assert!(result.is_err());
    }
}
