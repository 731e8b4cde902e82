//! Transient-failure retry at the backend boundary: HTTP 408/409/425/429
//! and 5xx responses, plus connect-level transport errors, are retried
//! with exponential backoff before the failure surfaces to the client.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};

use crate::error::LlmResult;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 500;
const JITTER_WINDOW_MS: u64 = 250;

pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 409 | 425 | 429) || status.is_server_error()
}

fn backoff_delay(attempt: u32) -> Duration {
    let base = BASE_DELAY_MS * 2u64.pow(attempt);
    let jitter = u64::from(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.subsec_nanos()),
    ) % JITTER_WINDOW_MS;
    Duration::from_millis(base + jitter)
}

/// Send `request`, retrying transient failures up to [`MAX_ATTEMPTS`]
/// times. The builder is cloned per attempt; a builder whose body cannot
/// be cloned (a streaming upload) is sent once with no retry.
pub(crate) async fn send_with_retry(request: RequestBuilder) -> LlmResult<Response> {
    let mut attempt = 0;
    loop {
        let Some(this_attempt) = request.try_clone() else {
            return Ok(request.send().await?);
        };
        match this_attempt.send().await {
            Ok(response) if is_retryable_status(response.status()) && attempt + 1 < MAX_ATTEMPTS => {
                let status = response.status();
                let delay = backoff_delay(attempt);
                tracing::warn!(
                    status = %status,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "transient provider failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Ok(response) => return Ok(response),
            Err(e) if e.is_connect() && attempt + 1 < MAX_ATTEMPTS => {
                let delay = backoff_delay(attempt);
                tracing::warn!(error = %e, attempt, "connection failed, backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
