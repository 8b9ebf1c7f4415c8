use std::time::Duration;

use verdant_types::RetrySettings;

use super::TransportFailure;
use crate::error::FillError;

/// Statuses that are worth another attempt after a pause.
pub const RETRYABLE_STATUSES: [u16; 4] = [429, 502, 503, 504];

const GATEWAY_TIMEOUT: u16 = 504;

pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Attempt budget and exponential backoff of the resilient transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub gateway_timeout_backoff: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// `base * 2^attempt`, saturating.
    pub fn delay_for_attempt(&self, base: Duration, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        base.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_backoff: Duration::from_millis(settings.base_backoff_ms),
            gateway_timeout_backoff: Duration::from_millis(settings.gateway_timeout_backoff_ms),
        }
    }
}

/// Bookkeeping for one `send` call. Dropped when the call returns.
#[derive(Debug)]
pub(super) struct RetryState<'p> {
    policy: &'p RetryPolicy,
    pub attempt: u32,
    pub last_status: Option<u16>,
    pub last_error: Option<TransportFailure>,
    base: Duration,
}

impl<'p> RetryState<'p> {
    pub fn new(policy: &'p RetryPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            last_status: None,
            last_error: None,
            base: policy.base_backoff,
        }
    }

    pub fn observe_status(&mut self, status: u16) {
        self.last_status = Some(status);
        if status == GATEWAY_TIMEOUT {
            self.base = self.policy.gateway_timeout_backoff;
        }
    }

    pub fn observe_failure(&mut self, failure: TransportFailure) {
        self.last_error = Some(failure);
    }

    pub fn backoff_delay(&self) -> Duration {
        self.policy.delay_for_attempt(self.base, self.attempt)
    }

    pub fn into_exhausted_error(self) -> FillError {
        let attempts = self.policy.max_attempts();
        if self.last_status == Some(GATEWAY_TIMEOUT) {
            return FillError::GatewayTimeout { attempts };
        }
        let message = self
            .last_error
            .map(|failure| failure.to_string())
            .unwrap_or_else(|| "request failed after retries".to_string());
        FillError::Exhausted { attempts, message }
    }
}
