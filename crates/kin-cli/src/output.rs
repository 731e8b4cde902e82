//! The programmatic output formats (`text`, `json`, `streaming`) and the
//! plain-text rendering the interactive loop uses.

use clap::ValueEnum;
use kin_core::Event;

/// How programmatic mode reports the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Only the final assistant text, to stdout.
    Text,
    /// One JSON object holding the full event list, at the end.
    Json,
    /// One JSON object per event, newline-delimited, in real time.
    Streaming,
}

/// Consumes the event stream of one programmatic run and produces the
/// selected output.
pub struct EventSink {
    mode: OutputMode,
    collected: Vec<serde_json::Value>,
    final_text: String,
    stopped_by_middleware: bool,
}

impl EventSink {
    /// A sink producing `mode` output.
    #[must_use]
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            collected: Vec::new(),
            final_text: String::new(),
            stopped_by_middleware: false,
        }
    }

    /// Feed one event through the sink.
    pub fn observe(&mut self, event: &Event) {
        match self.mode {
            OutputMode::Streaming => {
                if let Ok(line) = serde_json::to_string(event) {
                    println!("{line}");
                }
            }
            OutputMode::Json => {
                if let Ok(value) = serde_json::to_value(event) {
                    self.collected.push(value);
                }
            }
            OutputMode::Text => {}
        }

        // The "final" assistant text is whatever the model said after its
        // last tool call, matching how the subagent report accumulates.
        match event {
            Event::Assistant { content, stopped_by_middleware, .. } => {
                if *stopped_by_middleware {
                    self.stopped_by_middleware = true;
                } else {
                    self.final_text.push_str(content);
                }
            }
            Event::ToolCall { .. } => self.final_text.clear(),
            _ => {}
        }
    }

    /// Whether a middleware STOP ended the run (limit exceeded).
    #[must_use]
    pub fn stopped_by_middleware(&self) -> bool {
        self.stopped_by_middleware
    }

    /// Emit whatever the mode defers to the end of the run.
    pub fn finish(self) {
        match self.mode {
            OutputMode::Text => println!("{}", self.final_text.trim()),
            OutputMode::Json => {
                let body = serde_json::json!({ "events": self.collected });
                println!("{body}");
            }
            OutputMode::Streaming => {}
        }
    }
}

const INTERACTIVE_RESULT_MAX_CHARS: usize = 2000;

/// Render one event for the interactive loop.
pub fn render_interactive(event: &Event) {
    match event {
        Event::User { .. } => {}
        Event::Assistant { content, .. } => {
            if !content.is_empty() {
                println!("{content}");
            }
        }
        Event::Reasoning { content } => {
            for line in content.lines().filter(|l| !l.is_empty()) {
                println!("  · {line}");
            }
        }
        Event::ToolCall { tool_name, validated_args, .. } => {
            println!("[tool] {tool_name} {validated_args}");
        }
        Event::ToolStream { message, .. } => {
            println!("  | {message}");
        }
        Event::ToolResult { result, error, skipped, skip_reason, .. } => {
            if *skipped {
                let reason = skip_reason.as_deref().unwrap_or("skipped");
                println!("  skipped: {reason}");
            } else if let Some(error) = error {
                println!("  error: {error}");
            } else if let Some(result) = result {
                println!("{}", clip(result, INTERACTIVE_RESULT_MAX_CHARS));
            }
        }
        Event::CompactStart { current, threshold } => {
            println!("[compacting context: {current} tokens >= {threshold}]");
        }
        Event::CompactEnd { old, new } => {
            println!("[context compacted: {old} -> {new} tokens]");
        }
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}\n  [... output clipped]")
    } else {
        text.to_string()
    }
}
