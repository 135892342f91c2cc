//! Request executor
//!
//! Runs one logical call: wait for a rate-limit slot, send, and on failure ask
//! the retry policy whether to back off and go round again. Every retry takes
//! a fresh rate-limit slot.

use super::rate_limit::RateLimiter;
use super::request::RequestSpec;
use super::retry::{classify_status, RetryDecision, RetryPolicy};
use super::stream::{ResponseStream, TextStream};
use super::transport::{RawResponse, Transport};
use crate::error::{Error, Result};
use crate::types::{BodyMode, JsonValue};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Drives requests through rate limiting, transport and retry
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, limiter: RateLimiter, policy: RetryPolicy) -> Self {
        Self {
            transport,
            limiter,
            policy,
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `request` until it succeeds or fails terminally.
    ///
    /// Returns the first 2xx response. 4xx responses come back as
    /// [`Error::NonRetryable`] after a single attempt; transient failures that
    /// outlast the policy come back as [`Error::RetriesExhausted`].
    pub async fn execute(&self, request: &RequestSpec, mode: BodyMode) -> Result<RawResponse> {
        let method = request.method();
        let path = request.path();
        let max_attempts = self.policy.max_attempts();
        let mut attempts = 0;

        loop {
            self.limiter.acquire().await;
            attempts += 1;
            debug!(%method, path, attempt = attempts, "Sending request");

            let failure = match self.transport.send(request, mode).await {
                Ok(response) if response.status.is_success() => {
                    debug!(%method, path, status = response.status.as_u16(), "Request succeeded");
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status;
                    classify_status(status, response.into_text().await)
                }
                Err(e) => e,
            };

            match self.policy.evaluate(&failure, attempts) {
                RetryDecision::Retry { delay } => {
                    warn!(
                        %method,
                        path,
                        attempt = attempts,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "Request failed, retrying"
                    );
                    sleep(delay).await;
                }
                RetryDecision::Fail => {
                    error!(%method, path, error = %failure, "Request failed with non-retryable error");
                    return Err(failure);
                }
                RetryDecision::Exhausted => {
                    error!(%method, path, attempts, error = %failure, "Request failed, retries exhausted");
                    return Err(Error::RetriesExhausted {
                        attempts,
                        source: Box::new(failure),
                    });
                }
            }
        }
    }

    /// Execute a buffered request and decode the body as JSON
    pub async fn execute_json(&self, request: &RequestSpec) -> Result<JsonValue> {
        let response = self.execute(request, BodyMode::Buffered).await?;
        let body = response.into_bytes().await?;
        decode_json(&body)
    }

    /// Execute a streaming request; retries cover only establishing the exchange
    pub async fn execute_stream(&self, request: &RequestSpec) -> Result<ResponseStream> {
        let response = self.execute(request, BodyMode::Streaming).await?;
        Ok(TextStream::new(response.into_stream()))
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("limiter", &self.limiter)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Decode a buffered body; blank bodies count as malformed
pub(crate) fn decode_json(body: &[u8]) -> Result<JsonValue> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::decode("empty response body"));
    }
    serde_json::from_slice(body).map_err(|e| Error::decode(e.to_string()))
}
