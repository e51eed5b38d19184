//! Bounded-retry execution of one logical HTTP call

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::http::retry::{RetryDecision, RetryHandler, RetryPolicy};
use crate::http::transport::{HttpTransport, RawResponse, WireRequest};

/// Sends a request through an [`HttpTransport`], retrying connection failures
///
/// Attempts never overlap: each one completes or times out before the next
/// begins. Any fully received response is returned as-is, error statuses
/// included.
#[derive(Clone)]
pub struct TransportExecutor {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl TransportExecutor {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute a request with retry logic
    pub async fn send(&self, request: &WireRequest) -> Result<RawResponse> {
        self.send_observed(request, |_, _| {}).await
    }

    /// Like [`send`](Self::send), reporting each scheduled retry as
    /// `(failed_attempt, delay)` before sleeping
    pub async fn send_observed<F>(&self, request: &WireRequest, mut on_retry: F) -> Result<RawResponse>
    where
        F: FnMut(u32, Duration),
    {
        let mut handler = RetryHandler::new(self.policy.clone());

        loop {
            let attempt = handler.begin_attempt();
            debug!(attempt, url = %request.url, "Sending request");

            match self.transport.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(failure) => match handler.should_retry(&failure) {
                    RetryDecision::Retry { delay } => {
                        warn!(
                            "Request failed (attempt {}), retrying after {:?}: {}",
                            attempt, delay, failure
                        );
                        on_retry(attempt, delay);
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::NoRetry => {
                        error!(
                            "Request failed after {} attempts, not retrying: {}",
                            attempt, failure
                        );
                        return Err(failure.into_error(attempt));
                    }
                },
            }
        }
    }
}
