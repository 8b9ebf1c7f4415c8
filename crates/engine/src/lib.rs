//! # Verdant Engine
//!
//! Fills the empty attributes of a plant record by asking an AI backend,
//! a few fields at a time.
//!
//! A run classifies the schema into a work list, splits it into groups, and
//! tries one batch request per group before falling back to concurrent
//! single-field requests. Every request goes through a retrying, cancellable
//! transport. Outcomes are merged into the existing record and reported to a
//! [`FillObserver`] as they arrive.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use verdant_api::VerdantClient;
//! use verdant_engine::{FieldFillOrchestrator, FillRequest, HttpFillTransport, NoopObserver};
//! use verdant_types::VerdantSettings;
//!
//! # async fn run(schema: verdant_types::FieldSchema) -> anyhow::Result<()> {
//! let settings = VerdantSettings::default();
//! let client = VerdantClient::new(&settings.api)?;
//! let orchestrator = FieldFillOrchestrator::new(HttpFillTransport::new(client), settings.fill.clone());
//!
//! let request = FillRequest::new("Monstera deliciosa", Some(schema)).continue_on_field_error(true);
//! let record = orchestrator.fill(&request, &NoopObserver).await?;
//! println!("{}", serde_json::Value::Object(record));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **`transport`**: single-request seam plus the retry/backoff wrapper
//! - **`classifier`**: protected-field filtering and work-list order
//! - **`scheduler`**: batch fast path and per-field fallback
//! - **`aggregator`**: merge rules and observer notifications
//! - **`orchestrator`**: public entry points

pub mod aggregator;
pub mod classifier;
pub mod error;
pub mod field;
pub mod observer;
pub mod orchestrator;
pub mod request;
pub mod scheduler;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use aggregator::{ResultAggregator, is_empty_value};
pub use classifier::{classify, is_protected_field};
pub use error::FillError;
pub use field::{FieldFetch, fetch_field};
pub use observer::{ChannelObserver, FillEvent, FillObserver, NoopObserver};
pub use orchestrator::FieldFillOrchestrator;
pub use request::FillRequest;
pub use transport::{FillTransport, HttpFillTransport, HttpReply, ResilientTransport, RetryPolicy, TransportFailure};
