//! Group-by-group execution of a work list.
//!
//! Each group first tries the batch endpoint; any failure of that request
//! demotes the whole group to concurrent single-field lookups. Groups run
//! strictly one after another, which bounds the requests in flight to the
//! group size.

use futures_util::future::join_all;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use verdant_types::{BatchFillPayload, FieldKey, FieldOutcome, FieldSchema, FillEndpoint};

use crate::aggregator::ResultAggregator;
use crate::error::FillError;
use crate::field::{FieldFetch, decode_fill_response, fetch_field};
use crate::request::FillRequest;
use crate::transport::{FillTransport, ResilientTransport};

pub struct BatchScheduler<'t, T> {
    transport: &'t ResilientTransport<T>,
    batch_size: usize,
}

impl<'t, T: FillTransport> BatchScheduler<'t, T> {
    /// A `batch_size` of zero is treated as one.
    pub fn new(transport: &'t ResilientTransport<T>, batch_size: usize) -> Self {
        Self {
            transport,
            batch_size: batch_size.max(1),
        }
    }

    /// Process `work_list` in order, feeding every outcome to `aggregator`.
    pub async fn run(
        &self,
        work_list: &[FieldKey],
        schema: &FieldSchema,
        request: &FillRequest,
        aggregator: &mut ResultAggregator<'_>,
    ) -> Result<(), FillError> {
        for (index, group) in work_list.chunks(self.batch_size).enumerate() {
            if request.cancellation.is_cancelled() {
                info!(group = index + 1, completed = aggregator.completed(), "fill cancelled between groups");
                return Err(FillError::Cancelled);
            }
            debug!(group = index + 1, fields = ?group, "processing field group");
            aggregator.mark_started(group);

            let outcomes = if group.len() > 1 {
                match self.fetch_batch(group, schema, request).await {
                    Ok(outcomes) => outcomes,
                    Err(FillError::Cancelled) => return Err(FillError::Cancelled),
                    Err(error) => {
                        warn!(group = index + 1, error = %error, "batch request failed; falling back to single-field requests");
                        self.fetch_individually(group, schema, request).await?
                    }
                }
            } else {
                self.fetch_individually(group, schema, request).await?
            };

            for outcome in outcomes {
                aggregator.record(outcome)?;
            }
        }
        Ok(())
    }

    /// One combined request for the whole group.
    ///
    /// Any transport error, non-2xx status, `success: false` or unreadable
    /// body is an error here so the caller can fall back.
    async fn fetch_batch(&self, group: &[FieldKey], schema: &FieldSchema, request: &FillRequest) -> Result<Vec<FieldOutcome>, FillError> {
        let existing_data: Map<String, Value> = group
            .iter()
            .filter_map(|key| request.existing_data.get(key).map(|value| (key.clone(), value.clone())))
            .collect();
        let payload = BatchFillPayload {
            plant_name: request.entity_name.clone(),
            schema: schema.clone(),
            field_keys: group.to_vec(),
            existing_data: (!existing_data.is_empty()).then_some(existing_data),
            language: request.language.clone(),
        };
        let payload = serde_json::to_value(&payload).map_err(|error| FillError::Request(format!("could not encode batch request: {error}")))?;

        let reply = self.transport.send(FillEndpoint::Batch, &payload, &request.cancellation).await?;
        if !reply.is_success() {
            return Err(FillError::Request(format!("batch request failed with status {}", reply.status)));
        }
        let response = decode_fill_response(&reply).map_err(FillError::InvalidResponse)?;
        if !response.success {
            return Err(FillError::Request(
                response.error_message().unwrap_or_else(|| "batch request was not successful".to_string()),
            ));
        }
        let empty = Map::new();
        let data = match &response.data {
            Value::Object(data) => data,
            Value::Null => &empty,
            other => return Err(FillError::InvalidResponse(format!("batch data is not an object: {other}"))),
        };

        Ok(group
            .iter()
            .map(|field| match response.field_error(field) {
                Some(error) => FieldOutcome::Failure {
                    field: field.clone(),
                    error,
                },
                None => FieldOutcome::Success {
                    field: field.clone(),
                    value: data.get(field).cloned().unwrap_or(Value::Null),
                },
            })
            .collect())
    }

    /// Concurrent single-field requests; all settle before outcomes are returned.
    ///
    /// Outcomes keep group order. Cancellation of any request cancels the run.
    async fn fetch_individually(&self, group: &[FieldKey], schema: &FieldSchema, request: &FillRequest) -> Result<Vec<FieldOutcome>, FillError> {
        let fetches: Vec<FieldFetch> = group
            .iter()
            .map(|field| {
                FieldFetch::new(request.entity_name.clone(), schema.clone(), field.clone())
                    .with_existing_value(request.existing_data.get(field).cloned())
                    .with_language(request.language.clone())
            })
            .collect();

        let settled = join_all(
            fetches
                .iter()
                .map(|fetch| fetch_field(self.transport, fetch, &request.cancellation)),
        )
        .await;

        let mut outcomes = Vec::with_capacity(settled.len());
        for (field, result) in group.iter().zip(settled) {
            outcomes.push(match result {
                Ok(value) => FieldOutcome::Success {
                    field: field.clone(),
                    value: value.unwrap_or(Value::Null),
                },
                Err(FillError::Cancelled) => return Err(FillError::Cancelled),
                Err(error) => FieldOutcome::Failure {
                    field: field.clone(),
                    error: error.to_string(),
                },
            });
        }
        Ok(outcomes)
    }
}
