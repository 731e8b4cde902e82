//! The LLM client: binds a model to a backend, owns the backend's
//! lifecycle, injects the standard headers, and keeps `AgentStats`
//! current on every call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use kin_core::{AgentStats, ModelConfig};

use crate::backend::{ChunkStream, CompletionRequest, LlmBackend, ToolDefinition};
use crate::chunk::Chunk;
use crate::error::LlmResult;

const KIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wraps a concrete [`LlmBackend`], injecting standard headers and
/// recording [`AgentStats`] on every call.
pub struct LlmClient {
    backend: Arc<dyn LlmBackend>,
    model: ModelConfig,
    session_id: String,
}

impl LlmClient {
    /// Construct a client for `model`, routed through `backend`, tagging
    /// requests with `session_id` for sticky routing.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, model: ModelConfig, session_id: impl Into<String>) -> Self {
        Self {
            backend,
            model,
            session_id: session_id.into(),
        }
    }

    /// The model this client is currently bound to.
    #[must_use]
    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    /// Swap to a new backend/model pair, resetting the old backend first.
    ///
    /// # Errors
    ///
    /// Returns an [`crate::error::LlmError`] if closing the old backend
    /// fails.
    pub async fn switch_model(&mut self, backend: Arc<dyn LlmBackend>, model: ModelConfig) -> LlmResult<()> {
        self.backend.close().await?;
        self.backend = backend;
        self.model = model;
        Ok(())
    }

    fn standard_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("user-agent".to_string(), format!("kin-code/{KIN_VERSION}"));
        headers.insert("x-affinity".to_string(), self.session_id.clone());
        headers
    }

    /// One full, non-streaming completion, with the backend opened for
    /// the duration of the call and closed after. Updates `stats` on
    /// success.
    ///
    /// # Errors
    ///
    /// Returns whatever [`LlmBackend::complete`] returns.
    pub async fn complete(
        &self,
        mut request: CompletionRequest<'_>,
        stats: &mut AgentStats,
    ) -> LlmResult<Chunk> {
        for (k, v) in self.standard_headers() {
            request.extra_headers.entry(k).or_insert(v);
        }
        self.backend.open().await?;
        let started = Instant::now();
        let result = self.backend.complete(&request).await;
        self.backend.close().await?;
        let chunk = result?;
        self.record_stats(stats, &chunk, started);
        Ok(chunk)
    }

    /// A streaming completion; the caller is responsible for aggregating
    /// chunks and must call [`LlmClient::record_stream_stats`] once the
    /// stream has been fully consumed. The backend is opened here; it is
    /// closed when the model is switched (a stream must be fully consumed
    /// or cancelled before close, and only the caller knows when that is).
    ///
    /// # Errors
    ///
    /// Returns whatever [`LlmBackend::complete_streaming`] returns.
    pub async fn complete_streaming(
        &self,
        mut request: CompletionRequest<'_>,
    ) -> LlmResult<ChunkStream> {
        for (k, v) in self.standard_headers() {
            request.extra_headers.entry(k).or_insert(v);
        }
        self.backend.open().await?;
        self.backend.complete_streaming(&request).await
    }

    /// Record stats for a streamed call once the final aggregated chunk
    /// (or its usage) is known. Kept separate from `complete_streaming`
    /// because the caller, not this client, owns draining the stream.
    pub fn record_stream_stats(&self, stats: &mut AgentStats, chunk: &Chunk, started: Instant) {
        self.record_stats(stats, chunk, started);
    }

    fn record_stats(&self, stats: &mut AgentStats, chunk: &Chunk, started: Instant) {
        let Some(usage) = chunk.usage else { return };
        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = started.elapsed().as_millis() as u64;
        stats.input_price_per_million = self.model.prices.input_per_million;
        stats.output_price_per_million = self.model.prices.output_per_million;
        if let Some(window) = self.model.context_window {
            stats.max_context_window = window;
        }
        stats.record_turn(usage.prompt_tokens, usage.completion_tokens, duration_ms);
    }

    /// Approximate token count for `messages` under the active model.
    #[must_use]
    pub fn count_tokens(&self, messages: &[kin_core::Message], tools: &[ToolDefinition]) -> u64 {
        self.backend.count_tokens(&self.model.name, messages, tools)
    }
}
