//! Process-local, observable statistics for one agent session.

use serde::{Deserialize, Serialize};

/// Mutable, observable counters for one [`crate`] agent loop instance.
///
/// `session_cost` is derived from the token counters and the configured
/// prices; every other field is written at most once per turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentStats {
    /// Number of completed scheduler steps.
    ///
    /// Incremented twice per call to `act`: once for the user message and
    /// once per LLM turn. Frontends display the raw value, so this is not
    /// "turns" in the LLM-call sense.
    pub steps: u64,
    /// Prompt tokens accumulated across the whole session.
    pub session_prompt_tokens: u64,
    /// Completion tokens accumulated across the whole session.
    pub session_completion_tokens: u64,
    /// Current estimated context size (prompt + completion of the last turn).
    pub context_tokens: u64,
    /// Wall-clock duration of the last turn, in milliseconds.
    pub last_turn_duration_ms: u64,
    /// Prompt tokens used by the last turn.
    pub last_turn_prompt_tokens: u64,
    /// Completion tokens used by the last turn.
    pub last_turn_completion_tokens: u64,
    /// Tool calls that were approved for execution (auto or user).
    pub tool_calls_agreed: u64,
    /// Tool calls that were skipped (denylist, disabled permission, or user
    /// rejection).
    pub tool_calls_rejected: u64,
    /// Tool calls that ran to completion successfully.
    pub tool_calls_succeeded: u64,
    /// Tool calls that ran and failed.
    pub tool_calls_failed: u64,
    /// Completion tokens per second over the last turn.
    pub tokens_per_second: f64,
    /// Configured input price per million tokens for the active model.
    pub input_price_per_million: f64,
    /// Configured output price per million tokens for the active model.
    pub output_price_per_million: f64,
    /// Maximum context window of the active model, in tokens.
    pub max_context_window: u64,
}

impl AgentStats {
    /// Reset everything except the configured prices (used by
    /// `clear_history`, which is documented to preserve prices).
    pub fn reset_preserving_prices(&mut self) {
        let input_price = self.input_price_per_million;
        let output_price = self.output_price_per_million;
        let max_context_window = self.max_context_window;
        *self = Self {
            input_price_per_million: input_price,
            output_price_per_million: output_price,
            max_context_window,
            ..Self::default()
        };
    }

    /// Derived session cost in USD from accumulated token counters and the
    /// configured per-million prices.
    #[must_use]
    pub fn session_cost(&self) -> f64 {
        let input = self.session_prompt_tokens as f64 / 1_000_000.0 * self.input_price_per_million;
        let output =
            self.session_completion_tokens as f64 / 1_000_000.0 * self.output_price_per_million;
        input + output
    }

    /// Record one LLM turn's usage, updating both last-turn and session
    /// accumulators plus the derived context/tokens-per-second fields.
    pub fn record_turn(&mut self, prompt_tokens: u64, completion_tokens: u64, duration_ms: u64) {
        self.last_turn_prompt_tokens = prompt_tokens;
        self.last_turn_completion_tokens = completion_tokens;
        self.last_turn_duration_ms = duration_ms;
        self.session_prompt_tokens += prompt_tokens;
        self.session_completion_tokens += completion_tokens;
        self.context_tokens = prompt_tokens + completion_tokens;
        self.tokens_per_second = if duration_ms == 0 {
            0.0
        } else {
            completion_tokens as f64 / (duration_ms as f64 / 1000.0)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cost_is_derived_from_prices_and_tokens() {
        let mut stats = AgentStats {
            input_price_per_million: 3.0,
            output_price_per_million: 15.0,
            ..Default::default()
        };
        stats.record_turn(1_000_000, 1_000_000, 1000);
        assert!((stats.session_cost() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn reset_preserving_prices_keeps_prices_clears_rest() {
        let mut stats = AgentStats {
            input_price_per_million: 3.0,
            output_price_per_million: 15.0,
            max_context_window: 128_000,
            ..Default::default()
        };
        stats.record_turn(100, 100, 500);
        stats.steps = 7;
        stats.reset_preserving_prices();
        assert_eq!(stats.steps, 0);
        assert_eq!(stats.session_prompt_tokens, 0);
        assert_eq!(stats.input_price_per_million, 3.0);
        assert_eq!(stats.max_context_window, 128_000);
    }
}
