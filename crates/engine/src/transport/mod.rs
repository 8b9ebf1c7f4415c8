//! Resilient request transport.
//!
//! [`FillTransport`] issues exactly one request; [`ResilientTransport`] wraps
//! it with the retry policy and threads the cancellation token through every
//! attempt and every backoff sleep.

mod http;
mod retry;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use verdant_types::FillEndpoint;

use crate::error::FillError;

pub use http::HttpFillTransport;
pub use retry::{RETRYABLE_STATUSES, RetryPolicy, is_retryable_status};
use retry::RetryState;

/// Raw reply of one request. Non-2xx statuses are still replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A request that produced no reply at all (connect, DNS, reset, body read).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportFailure {
    message: String,
}

impl TransportFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Issues one POST with a JSON body against a fill endpoint.
///
/// Implementations attach whatever credentials they were configured with and
/// must not retry on their own.
#[async_trait]
pub trait FillTransport: Send + Sync {
    async fn post_json(&self, endpoint: FillEndpoint, payload: &Value) -> Result<HttpReply, TransportFailure>;
}

#[async_trait]
impl<T: FillTransport + ?Sized> FillTransport for Arc<T> {
    async fn post_json(&self, endpoint: FillEndpoint, payload: &Value) -> Result<HttpReply, TransportFailure> {
        (**self).post_json(endpoint, payload).await
    }
}

/// Retrying, cancellable wrapper around a [`FillTransport`].
pub struct ResilientTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: FillTransport> ResilientTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `payload` to `endpoint`, retrying transient failures.
    ///
    /// Returns the first non-retryable reply, or the last reply when attempts
    /// run out on a retryable status. Fails with [`FillError::Cancelled`] as
    /// soon as the token fires, and with an exhaustion error when the final
    /// attempt produced no reply.
    pub async fn send(&self, endpoint: FillEndpoint, payload: &Value, cancel: &CancellationToken) -> Result<HttpReply, FillError> {
        let max_attempts = self.policy.max_attempts();
        let mut state = RetryState::new(&self.policy);

        for attempt in 0..max_attempts {
            if cancel.is_cancelled() {
                return Err(FillError::Cancelled);
            }
            state.attempt = attempt;
            let has_more_attempts = attempt + 1 < max_attempts;
            debug!(%endpoint, attempt = attempt + 1, max_attempts, "sending fill request");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FillError::Cancelled),
                outcome = self.inner.post_json(endpoint, payload) => outcome,
            };

            match outcome {
                Ok(reply) => {
                    state.observe_status(reply.status);
                    if !is_retryable_status(reply.status) || !has_more_attempts {
                        return Ok(reply);
                    }
                    warn!(%endpoint, status = reply.status, attempt = attempt + 1, "retryable status from fill endpoint");
                }
                Err(failure) => {
                    warn!(%endpoint, error = %failure, attempt = attempt + 1, "fill request failed");
                    state.observe_failure(failure);
                    if !has_more_attempts {
                        break;
                    }
                }
            }

            let delay = state.backoff_delay();
            debug!(%endpoint, delay_ms = delay.as_millis(), "backing off before retry");
            sleep_or_cancel(delay, cancel).await?;
        }

        Err(state.into_exhausted_error())
    }
}

async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<(), FillError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FillError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
