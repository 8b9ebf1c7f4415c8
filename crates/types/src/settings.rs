//! Configuration values injected into the API client and the fill engine.
//!
//! Every member has a default so partial JSON files deserialize cleanly.

use serde::{Deserialize, Serialize};

use crate::FillEndpoint;

/// Root settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VerdantSettings {
    pub api: ApiSettings,
    pub fill: FillSettings,
}

/// Connection and credential settings for the plant-fill backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL the endpoint paths are resolved against.
    pub base_url: String,
    /// Sent as `Authorization: Bearer <token>` when present.
    pub bearer_token: Option<String>,
    /// Sent as `X-Admin-Token` when present.
    pub admin_token: Option<String>,
    /// Per-request timeout applied by the HTTP client.
    pub request_timeout_secs: u64,
    pub endpoints: EndpointPaths,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            bearer_token: None,
            admin_token: None,
            request_timeout_secs: 120,
            endpoints: EndpointPaths::default(),
        }
    }
}

/// Endpoint paths relative to [`ApiSettings::base_url`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointPaths {
    pub batch: String,
    pub field: String,
    pub record: String,
}

impl EndpointPaths {
    pub fn path_for(&self, endpoint: FillEndpoint) -> &str {
        match endpoint {
            FillEndpoint::Batch => &self.batch,
            FillEndpoint::Field => &self.field,
            FillEndpoint::Record => &self.record,
        }
    }
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            batch: FillEndpoint::Batch.default_path().into(),
            field: FillEndpoint::Field.default_path().into(),
            record: FillEndpoint::Record.default_path().into(),
        }
    }
}

/// Scheduling knobs for a fill run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FillSettings {
    /// Maximum number of fields processed together (and in flight at once).
    pub batch_size: usize,
    pub retry: RetrySettings,
}

impl Default for FillSettings {
    fn default() -> Self {
        Self {
            batch_size: 4,
            retry: RetrySettings::default(),
        }
    }
}

/// Retry and backoff policy of the resilient transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    /// Replaces `base_backoff_ms` for the rest of a call once a 504 is seen.
    pub gateway_timeout_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff_ms: 2000,
            gateway_timeout_backoff_ms: 3000,
        }
    }
}
