use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use verdant_api::VerdantClient;
use verdant_types::FillEndpoint;

use super::{FillTransport, HttpReply, TransportFailure};

/// [`FillTransport`] backed by a configured [`VerdantClient`].
///
/// Credentials are whatever headers the client was built with.
#[derive(Debug, Clone)]
pub struct HttpFillTransport {
    client: VerdantClient,
}

impl HttpFillTransport {
    pub fn new(client: VerdantClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FillTransport for HttpFillTransport {
    async fn post_json(&self, endpoint: FillEndpoint, payload: &Value) -> Result<HttpReply, TransportFailure> {
        let start = Instant::now();
        let response = self
            .client
            .post(endpoint)
            .json(payload)
            .send()
            .await
            .map_err(TransportFailure::from)?;
        let status = response.status();
        let body = response.text().await.map_err(TransportFailure::from)?;
        debug!(
            %endpoint,
            status = %status,
            body_len = body.len(),
            duration_ms = start.elapsed().as_millis(),
            "fill request completed"
        );
        Ok(HttpReply::new(status.as_u16(), body))
    }
}

impl From<reqwest::Error> for TransportFailure {
    fn from(error: reqwest::Error) -> Self {
        let detail = verdant_util::redact_sensitive(&error.to_string());
        if error.is_timeout() {
            Self::new(format!("request timed out: {detail}"))
        } else if error.is_connect() {
            Self::new(format!("connection failed: {detail}"))
        } else {
            Self::new(format!("network error: {detail}"))
        }
    }
}
