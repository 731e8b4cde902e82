//! Web fetch tool — retrieves a page and reduces HTML to readable text.
//!
//! The companion to `web_search`: search returns URLs, fetch returns their
//! content. HTML is reduced with a small tag-stripping pass rather than a
//! full DOM parser, skipping script/style/head subtrees.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::contract::{single_result, Tool, ToolEventStream};
use crate::error::ToolError;
use crate::ToolContext;

const TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 5;
const MAX_CONTENT_BYTES: usize = 100_000;
const MAX_CONTENT_CHARS: usize = 50_000;

/// Built-in tool for fetching page content from a URL.
pub struct WebFetchTool;

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        "web_fetch"
    }

    fn description(&self) -> &str {
        "Fetches a URL over HTTP GET and returns its content. HTML pages are reduced to \
         plain text; large pages are truncated. Only http and https URLs are allowed."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "URL to fetch"},
                "max_length": {"type": "integer", "description": "Maximum content length to return, in characters"}
            },
            "required": ["url"]
        })
    }

    fn validate(&self, raw_args: &Value) -> Result<Value, ToolError> {
        let url = raw_args
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("url is required".into()))?;
        validate_url(url)?;
        if let Some(max_length) = raw_args.get("max_length").and_then(Value::as_u64) {
            if max_length == 0 {
                return Err(ToolError::InvalidArguments("max_length must be positive".into()));
            }
        }
        Ok(raw_args.clone())
    }

    async fn invoke(&self, _ctx: &ToolContext, validated_args: Value) -> ToolEventStream {
        single_result(run_fetch(&validated_args).await.map_err(Into::into))
    }

    fn get_call_display(&self, validated_args: &Value) -> String {
        validated_args.get("url").and_then(Value::as_str).unwrap_or("").to_string()
    }

    fn get_result_display(&self, result: &str) -> String {
        result.lines().next().unwrap_or(result).to_string()
    }
}

fn validate_url(url: &str) -> Result<(), ToolError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ToolError::InvalidArguments(format!("invalid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ToolError::InvalidArguments(format!(
            "unsupported URL scheme {scheme}: only http and https are allowed"
        ))),
    }
}

async fn run_fetch(args: &Value) -> Result<String, ToolError> {
    let url = args.get("url").and_then(Value::as_str).expect("validated");
    let max_chars = args
        .get("max_length")
        .and_then(Value::as_u64)
        .map_or(MAX_CONTENT_CHARS, |v| usize::try_from(v).unwrap_or(usize::MAX).min(MAX_CONTENT_CHARS));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .user_agent(concat!("kin-code/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

    let response = client
        .get(url)
        .header("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .send()
        .await
        .map_err(|e| ToolError::ExecutionFailed(format!("fetch failed: {e}")))?;
    if !response.status().is_success() {
        return Err(ToolError::ExecutionFailed(format!(
            "{url} returned HTTP {}",
            response.status()
        )));
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ToolError::ExecutionFailed(format!("reading body failed: {e}")))?;
    let capped = &bytes[..bytes.len().min(MAX_CONTENT_BYTES)];
    let text = String::from_utf8_lossy(capped);

    let (title, content) = if content_type.contains("text/html") || content_type.contains("application/xhtml") {
        extract_text(&text)
    } else {
        (None, text.into_owned())
    };

    let truncated = content.chars().count() > max_chars;
    let content: String = content.chars().take(max_chars).collect();

    let mut output = String::new();
    output.push_str(url);
    if let Some(title) = title {
        output.push_str("\nTitle: ");
        output.push_str(&title);
    }
    output.push_str("\n\n");
    output.push_str(&content);
    if truncated {
        output.push_str("\n\n(content truncated)");
    }
    Ok(output)
}

/// Reduce HTML to plain text: drop tags, skip script/style subtrees,
/// capture the `<title>`, and collapse blank runs.
fn extract_text(html: &str) -> (Option<String>, String) {
    const SKIP_TAGS: [&str; 3] = ["script", "style", "noscript"];

    let mut text = String::new();
    let mut title = String::new();
    let mut rest = html;
    let mut skip_until: Option<String> = None;
    let mut in_title = false;

    while let Some(open) = rest.find('<') {
        let before = &rest[..open];
        if skip_until.is_none() {
            if in_title {
                title.push_str(before);
            } else {
                text.push_str(before);
            }
        }
        let Some(close) = rest[open..].find('>') else { break };
        let tag_body = &rest[open + 1..open + close];
        let tag_name: String = tag_body
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        let is_closing = tag_body.starts_with('/');

        match &skip_until {
            Some(awaited) => {
                if is_closing && tag_name == *awaited {
                    skip_until = None;
                }
            }
            None => {
                if SKIP_TAGS.contains(&tag_name.as_str()) && !is_closing {
                    skip_until = Some(tag_name.clone());
                } else if tag_name == "title" {
                    in_title = !is_closing;
                } else if !is_closing && matches!(tag_name.as_str(), "p" | "br" | "div" | "li" | "tr") {
                    text.push('\n');
                }
            }
        }
        rest = &rest[open + close + 1..];
    }
    if skip_until.is_none() && !in_title {
        text.push_str(rest);
    }

    let collapsed: String = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let title = title.trim().to_string();
    ((!title.is_empty()).then_some(title), collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_http_and_https_are_accepted() {
        assert!(validate_url("https://example.com/page").is_ok());
        assert!(validate_url("http://localhost:8080").is_ok());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn html_is_reduced_to_text_with_title() {
        let html = "<html><head><title>My Page</title><style>body{}</style></head>\
                    <body><p>Hello</p><script>evil()</script><p>World</p></body></html>";
        let (title, text) = extract_text(html);
        assert_eq!(title.as_deref(), Some("My Page"));
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
        assert!(!text.contains("evil"));
        assert!(!text.contains("body{}"));
    }

    #[test]
    fn block_tags_introduce_line_breaks() {
        let (_, text) = extract_text("<div>one</div><div>two</div>");
        assert_eq!(text, "one\ntwo");
    }

    #[test]
    fn max_length_zero_is_rejected() {
        let err = WebFetchTool.validate(&serde_json::json!({"url": "https://a.example", "max_length": 0}));
        assert!(err.is_err());
    }
}
