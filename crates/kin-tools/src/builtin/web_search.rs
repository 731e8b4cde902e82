//! Web search tool backed by the Brave Search API.
//!
//! Returns lightweight metadata (title, URL, description) per result to
//! keep context manageable; `web_fetch` retrieves full page content from
//! a chosen URL. Requires the `BRAVE_API_KEY` environment variable.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::contract::{single_result, Tool, ToolEventStream};
use crate::error::ToolError;
use crate::ToolContext;

const BRAVE_API_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";
const API_KEY_ENV_VAR: &str = "BRAVE_API_KEY";
const DEFAULT_COUNT: u64 = 10;
const MAX_COUNT: u64 = 20;
const MAX_SNIPPET_CHARS: usize = 500;
const TIMEOUT_SECS: u64 = 30;

/// Built-in tool for web search via the Brave Search API.
pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Searches the web using the Brave Search API. Returns titles, URLs, and snippets \
         for matching results. Use web_fetch to retrieve full page content from a result."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "The search query"},
                "count": {"type": "integer", "description": "Number of results to return (1-20, default 10)"},
                "freshness": {
                    "type": "string",
                    "description": "Time filter: 'pd' (past day), 'pw' (past week), 'pm' (past month), 'py' (past year)"
                }
            },
            "required": ["query"]
        })
    }

    fn validate(&self, raw_args: &Value) -> Result<Value, ToolError> {
        raw_args
            .get("query")
            .and_then(Value::as_str)
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("query is required".into()))?;
        if let Some(count) = raw_args.get("count").and_then(Value::as_u64) {
            if count == 0 || count > MAX_COUNT {
                return Err(ToolError::InvalidArguments(format!(
                    "count must be between 1 and {MAX_COUNT}"
                )));
            }
        }
        if let Some(freshness) = raw_args.get("freshness").and_then(Value::as_str) {
            if !matches!(freshness, "pd" | "pw" | "pm" | "py") {
                return Err(ToolError::InvalidArguments(
                    "freshness must be one of pd, pw, pm, py".into(),
                ));
            }
        }
        Ok(raw_args.clone())
    }

    async fn invoke(&self, _ctx: &ToolContext, validated_args: Value) -> ToolEventStream {
        single_result(run_search(&validated_args).await.map_err(Into::into))
    }

    fn get_call_display(&self, validated_args: &Value) -> String {
        validated_args.get("query").and_then(Value::as_str).unwrap_or("").to_string()
    }

    fn get_result_display(&self, result: &str) -> String {
        result.lines().last().unwrap_or(result).to_string()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    web: Option<WebResults>,
}

#[derive(Debug, Deserialize)]
struct WebResults {
    #[serde(default)]
    results: Vec<ResultItem>,
}

#[derive(Debug, Deserialize)]
struct ResultItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

async fn run_search(args: &Value) -> Result<String, ToolError> {
    let query = args.get("query").and_then(Value::as_str).expect("validated");
    let count = args.get("count").and_then(Value::as_u64).unwrap_or(DEFAULT_COUNT);
    let freshness = args.get("freshness").and_then(Value::as_str);

    let api_key = std::env::var(API_KEY_ENV_VAR).map_err(|_| {
        ToolError::ExecutionFailed(format!(
            "{API_KEY_ENV_VAR} is not set; web_search needs a Brave Search API key"
        ))
    })?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .build()
        .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

    let mut request = client
        .get(BRAVE_API_ENDPOINT)
        .header("accept", "application/json")
        .header("x-subscription-token", api_key)
        .query(&[("q", query), ("count", &count.to_string())]);
    if let Some(freshness) = freshness {
        request = request.query(&[("freshness", freshness)]);
    }

    let response = request
        .send()
        .await
        .map_err(|e| ToolError::ExecutionFailed(format!("search request failed: {e}")))?;
    if !response.status().is_success() {
        return Err(ToolError::ExecutionFailed(format!(
            "Brave Search returned HTTP {}",
            response.status()
        )));
    }
    let body: SearchResponse = response
        .json()
        .await
        .map_err(|e| ToolError::ExecutionFailed(format!("unexpected search response: {e}")))?;

    let results = body.web.map(|w| w.results).unwrap_or_default();
    Ok(render_results(query, &results))
}

fn render_results(query: &str, results: &[ResultItem]) -> String {
    if results.is_empty() {
        return format!("No results for \"{query}\"");
    }
    let mut output = String::new();
    for (idx, item) in results.iter().enumerate() {
        let snippet: String = item.description.chars().take(MAX_SNIPPET_CHARS).collect();
        let _ = writeln!(output, "{}. {}\n   {}\n   {}", idx + 1, item.title, item.url, snippet);
    }
    let _ = write!(output, "\n{} results for \"{query}\"", results.len());
    output
}
