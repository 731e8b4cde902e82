//! Interactive tool approval on the controlling terminal.
//!
//! Prompts on `/dev/tty` when it can be opened, so approval still works
//! when stdin was a pipe that has already been drained; falls back to
//! stderr/stdin otherwise.

use std::io::{BufRead, BufReader, Write};

use async_trait::async_trait;
use kin_tools::{ApprovalCallback, ApprovalDecision};

/// Asks the user on the terminal before each `Ask`-gated tool call.
pub struct InteractiveApproval;

#[async_trait]
impl ApprovalCallback for InteractiveApproval {
    async fn approve(&self, tool_name: &str, args_json: &str, _call_id: &str) -> ApprovalDecision {
        let tool_name = tool_name.to_string();
        let args = shorten(args_json, 200);
        tokio::task::spawn_blocking(move || prompt_on_terminal(&tool_name, &args))
            .await
            .unwrap_or(ApprovalDecision::No { feedback: None })
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

fn prompt_on_terminal(tool_name: &str, args: &str) -> ApprovalDecision {
    let tty = std::fs::OpenOptions::new().read(true).write(true).open("/dev/tty").ok();

    let wrote = match &tty {
        Some(tty) => {
            let mut out = tty;
            write!(out, "\nkin wants to run {tool_name} {args}\n  allow? [y/N, or explain why not]: ")
                .and_then(|()| out.flush())
                .is_ok()
        }
        None => {
            let mut err = std::io::stderr();
            write!(err, "\nkin wants to run {tool_name} {args}\n  allow? [y/N, or explain why not]: ")
                .and_then(|()| err.flush())
                .is_ok()
        }
    };
    if !wrote {
        return ApprovalDecision::No { feedback: None };
    }

    let mut line = String::new();
    let read = match tty {
        Some(tty) => BufReader::new(tty).read_line(&mut line),
        None => std::io::stdin().lock().read_line(&mut line),
    };
    if read.is_err() {
        return ApprovalDecision::No { feedback: None };
    }

    let answer = line.trim();
    match answer.to_lowercase().as_str() {
        "y" | "yes" => ApprovalDecision::Yes,
        "" | "n" | "no" => ApprovalDecision::No { feedback: None },
        _ => ApprovalDecision::No {
            feedback: Some(answer.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_arguments_are_shortened_for_display() {
        let long = "x".repeat(300);
        let shown = shorten(&long, 200);
        assert_eq!(shown.chars().count(), 203);
        assert!(shown.ends_with("..."));
    }
}
