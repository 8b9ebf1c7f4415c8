//! Plant-fill API client utilities.
//!
//! This module provides a lightweight client for the AI plant-fill backend.
//! It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults
//! - Attaching the credentials supplied by [`ApiSettings`] to every request
//! - Validating the configured base URL for safety
//! - Resolving [`FillEndpoint`]s into absolute request URLs
//!
//! The primary entry point is [`VerdantClient`]. Create an instance via
//! [`VerdantClient::new`], and then build requests with
//! [`VerdantClient::post`].
//!
//! # Example
//!
//! ```ignore
//! use verdant_api::VerdantClient;
//! use verdant_types::{ApiSettings, FillEndpoint};
//!
//! async fn ping() -> anyhow::Result<()> {
//!     let client = VerdantClient::new(&ApiSettings::default())?;
//!     let res = client
//!         .post(FillEndpoint::Field)
//!         .json(&serde_json::json!({"plantName": "Fern"}))
//!         .send()
//!         .await?;
//!     println!("status: {}", res.status());
//!     Ok(())
//! }
//! ```

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, Url, header};
use tracing::debug;
use verdant_types::{ApiSettings, EndpointPaths, FillEndpoint};

/// Header carrying the optional static admin token.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for plant-fill access.
///
/// The client pre-configures credential headers and builds requests against a
/// validated base URL. Credentials are never read from the environment here;
/// they arrive through [`ApiSettings`].
pub struct VerdantClient {
    pub base_url: String,
    pub http: Client,
    pub user_agent: String,
    endpoints: EndpointPaths,
}

impl VerdantClient {
    /// Construct a [`VerdantClient`] from explicit settings.
    ///
    /// Non-localhost hosts must use HTTPS. Blank tokens are ignored.
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let base_url = settings.base_url.trim_end_matches('/').to_string();
        validate_base_url(&base_url)?;

        let default_headers = build_default_headers(settings)?;
        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("build http client")?;

        Ok(Self {
            base_url,
            http,
            user_agent: format!("verdant/0.1; {}", env::consts::OS),
            endpoints: settings.endpoints.clone(),
        })
    }

    /// Absolute URL of a fill endpoint.
    pub fn endpoint_url(&self, endpoint: FillEndpoint) -> String {
        let path = self.endpoints.path_for(endpoint);
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Build a POST `reqwest::RequestBuilder` for a fill endpoint.
    ///
    /// The resulting request includes the configured User-Agent and the
    /// credential headers installed at construction time.
    pub fn post(&self, endpoint: FillEndpoint) -> RequestBuilder {
        let url = self.endpoint_url(endpoint);
        debug!(%url, %endpoint, "building request");

        self.http.post(url).header(header::USER_AGENT, &self.user_agent)
    }
}

/// Build the headers attached to every request issued by the client.
fn build_default_headers(settings: &ApiSettings) -> Result<header::HeaderMap> {
    let mut default_headers = header::HeaderMap::new();
    default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

    if let Some(token) = non_blank(settings.bearer_token.as_deref()) {
        let mut value =
            header::HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| anyhow!("bearer token contains invalid header characters"))?;
        value.set_sensitive(true);
        default_headers.insert(header::AUTHORIZATION, value);
    }
    if let Some(token) = non_blank(settings.admin_token.as_deref()) {
        let mut value = header::HeaderValue::from_str(token).map_err(|_| anyhow!("admin token contains invalid header characters"))?;
        value.set_sensitive(true);
        default_headers.insert(ADMIN_TOKEN_HEADER, value);
    }
    Ok(default_headers)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|token| !token.is_empty())
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS
fn validate_base_url(base: &str) -> Result<()> {
    let parsed_base_url = Url::parse(base).map_err(|e| anyhow!("Invalid API base URL '{}': {}", base, e))?;

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| anyhow!("API base URL must include a host"))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed_base_url.scheme() != "https" {
        return Err(anyhow!(
            "API base URL must use https for non-localhost hosts; got '{}://'",
            parsed_base_url.scheme()
        ));
    }

    Ok(())
}
