//! Merges field outcomes into the cumulative record and drives the observer.

use serde_json::{Map, Value};
use tracing::{debug, warn};
use verdant_types::{FieldKey, FieldOutcome, ProgressEvent};

use crate::classifier::is_protected_field;
use crate::error::FillError;
use crate::observer::FillObserver;

/// Cumulative result of one run, owned by the scheduler for its duration.
///
/// A success overwrites the key, or removes it when the value is empty. A
/// failure leaves the key untouched and either aborts the run or is reported
/// through [`FillObserver::on_field_error`]. Protected keys are never held.
pub struct ResultAggregator<'o> {
    result: Map<String, Value>,
    completed: usize,
    total: usize,
    continue_on_field_error: bool,
    observer: &'o dyn FillObserver,
}

impl<'o> ResultAggregator<'o> {
    pub fn new(existing_data: &Map<String, Value>, total: usize, continue_on_field_error: bool, observer: &'o dyn FillObserver) -> Self {
        let result = existing_data
            .iter()
            .filter(|(key, _)| !is_protected_field(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self {
            result,
            completed: 0,
            total,
            continue_on_field_error,
            observer,
        }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn emit_init(&self) {
        self.observer.on_progress(&ProgressEvent::init(self.total));
    }

    /// Announce that `fields` are starting, with the count completed so far.
    pub fn mark_started(&self, fields: &[FieldKey]) {
        for field in fields {
            self.observer.on_progress(&ProgressEvent::field(field.clone(), self.completed, self.total));
        }
    }

    /// Apply one outcome.
    ///
    /// Returns the field's error when the outcome is a failure and the run
    /// does not continue past field errors.
    pub fn record(&mut self, outcome: FieldOutcome) -> Result<(), FillError> {
        match outcome {
            FieldOutcome::Success { field, value } => {
                let stored = self.apply_value(&field, value).cloned();
                self.completed += 1;
                debug!(field = %field, cleared = stored.is_none(), completed = self.completed, "field filled");
                self.observer.on_field_complete(&field, stored.as_ref());
                self.observer
                    .on_progress(&ProgressEvent::field(field, self.completed, self.total));
            }
            FieldOutcome::Failure { field, error } => {
                let error = FillError::Field {
                    field: field.clone(),
                    message: error,
                };
                if !self.continue_on_field_error {
                    warn!(field = %field, error = %error, "field failed; aborting fill");
                    return Err(error);
                }
                self.completed += 1;
                warn!(field = %field, error = %error, "field failed; continuing");
                self.observer.on_field_error(&field, &error);
                self.observer
                    .on_progress(&ProgressEvent::field(field, self.completed, self.total));
            }
        }
        Ok(())
    }

    /// Emit the final progress event and hand over the result.
    pub fn finish(self) -> Map<String, Value> {
        self.observer.on_progress(&ProgressEvent::complete(self.total));
        self.result
    }

    fn apply_value(&mut self, field: &str, value: Value) -> Option<&Value> {
        if is_protected_field(field) {
            warn!(field = %field, "ignoring value for protected field");
            return None;
        }
        if is_empty_value(&value) {
            self.result.remove(field);
            return None;
        }
        self.result.insert(field.to_string(), value);
        self.result.get(field)
    }
}

/// Null, empty strings and empty containers count as "no answer".
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
