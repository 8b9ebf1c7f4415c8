//! Entry point tying the classifier, scheduler and aggregator together.

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use verdant_types::{FieldSchema, FillEndpoint, FillSettings, ProgressEvent, RecordFillPayload};
use verdant_util::fill_status_message;

use crate::aggregator::ResultAggregator;
use crate::classifier::{classify, is_protected_field};
use crate::error::FillError;
use crate::field::{FieldFetch, decode_fill_response, fetch_field};
use crate::observer::FillObserver;
use crate::request::FillRequest;
use crate::scheduler::BatchScheduler;
use crate::transport::{FillTransport, ResilientTransport, RetryPolicy};

/// Fills the empty fields of one record through the AI backend.
///
/// Runs are independent; the orchestrator holds configuration only and can
/// serve any number of sequential or concurrent calls.
pub struct FieldFillOrchestrator<T> {
    transport: ResilientTransport<T>,
    settings: FillSettings,
}

impl<T: FillTransport> FieldFillOrchestrator<T> {
    pub fn new(transport: T, settings: FillSettings) -> Self {
        let policy = RetryPolicy::from(&settings.retry);
        Self {
            transport: ResilientTransport::new(transport, policy),
            settings,
        }
    }

    pub fn settings(&self) -> &FillSettings {
        &self.settings
    }

    /// Run one fill and return the merged record.
    ///
    /// With a schema, fields are processed in groups and every outcome is
    /// reported to `observer`. Without one, a single whole-record request is
    /// made and its data object is returned as the result. Protected fields
    /// never appear in the result.
    pub async fn fill(&self, request: &FillRequest, observer: &dyn FillObserver) -> Result<Map<String, Value>, FillError> {
        let Some(schema) = request.schema.as_ref() else {
            return self.fill_record(request, observer).await;
        };

        let work_list = classify(schema, request.explicit_fields.as_deref());
        let outbound_schema: FieldSchema = schema
            .iter()
            .filter(|(key, _)| !is_protected_field(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        info!(
            plant = %request.entity_name,
            fields = work_list.len(),
            batch_size = self.settings.batch_size,
            continue_on_field_error = request.continue_on_field_error,
            "starting field fill"
        );

        let mut aggregator = ResultAggregator::new(&request.existing_data, work_list.len(), request.continue_on_field_error, observer);
        aggregator.emit_init();
        BatchScheduler::new(&self.transport, self.settings.batch_size)
            .run(&work_list, &outbound_schema, request, &mut aggregator)
            .await?;

        info!(plant = %request.entity_name, completed = aggregator.completed(), "field fill finished");
        Ok(aggregator.finish())
    }

    /// Look up a single field outside of a run.
    pub async fn fetch_field(&self, fetch: &FieldFetch, cancel: &CancellationToken) -> Result<Option<Value>, FillError> {
        fetch_field(&self.transport, fetch, cancel).await
    }

    async fn fill_record(&self, request: &FillRequest, observer: &dyn FillObserver) -> Result<Map<String, Value>, FillError> {
        if request.cancellation.is_cancelled() {
            return Err(FillError::Cancelled);
        }
        info!(plant = %request.entity_name, "starting whole-record fill");

        let existing_data: Map<String, Value> = request
            .existing_data
            .iter()
            .filter(|(key, _)| !is_protected_field(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let payload = RecordFillPayload {
            plant_name: request.entity_name.clone(),
            schema: None,
            existing_data: (!existing_data.is_empty()).then_some(existing_data),
            language: request.language.clone(),
        };
        let payload = serde_json::to_value(&payload).map_err(|error| FillError::Request(format!("could not encode record request: {error}")))?;

        let reply = self
            .transport
            .send(FillEndpoint::Record, &payload, &request.cancellation)
            .await?;
        if !reply.is_success() {
            return Err(FillError::Request(fill_status_message(reply.status, &request.entity_name)));
        }
        let response = decode_fill_response(&reply).map_err(FillError::InvalidResponse)?;
        if !response.success {
            let message = response
                .error_message()
                .unwrap_or_else(|| format!("Failed to fill '{}'", request.entity_name));
            return Err(FillError::Request(message));
        }
        let mut data = match response.data {
            Value::Object(data) => data,
            Value::Null => Map::new(),
            other => {
                warn!(plant = %request.entity_name, "whole-record data is not an object");
                return Err(FillError::InvalidResponse(format!("record data is not an object: {other}")));
            }
        };

        // The backend's object is the result; only protected keys are dropped.
        data.retain(|key, _| !is_protected_field(key));
        info!(plant = %request.entity_name, fields = data.len(), "whole-record fill finished");
        observer.on_progress(&ProgressEvent::complete(1));
        Ok(data)
    }
}
