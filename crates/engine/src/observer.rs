//! Observer sink notified while a fill run advances.

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use verdant_types::{FieldKey, ProgressEvent};

use crate::error::FillError;

/// Receives progress, per-field completions and per-field errors.
///
/// All methods default to no-ops so implementors pick what they need. Calls
/// are made from the task driving the run, never concurrently.
pub trait FillObserver: Send + Sync {
    fn on_progress(&self, _event: &ProgressEvent) {}

    /// `value` is `None` when the backend declined to answer and the field was cleared.
    fn on_field_complete(&self, _field: &str, _value: Option<&Value>) {}

    /// Only called when the run continues past field errors.
    fn on_field_error(&self, _field: &str, _error: &FillError) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl FillObserver for NoopObserver {}

/// Event forwarded by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum FillEvent {
    Progress(ProgressEvent),
    FieldCompleted { field: FieldKey, value: Option<Value> },
    FieldFailed { field: FieldKey, message: String },
}

/// Forwards every notification over an unbounded Tokio channel.
///
/// A dropped receiver is not an error; the run keeps going.
pub struct ChannelObserver {
    event_tx: UnboundedSender<FillEvent>,
}

impl ChannelObserver {
    pub fn new(event_tx: UnboundedSender<FillEvent>) -> Self {
        Self { event_tx }
    }
}

impl FillObserver for ChannelObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        let _ = self.event_tx.send(FillEvent::Progress(event.clone()));
    }

    fn on_field_complete(&self, field: &str, value: Option<&Value>) {
        let _ = self.event_tx.send(FillEvent::FieldCompleted {
            field: field.to_string(),
            value: value.cloned(),
        });
    }

    fn on_field_error(&self, field: &str, error: &FillError) {
        let _ = self.event_tx.send(FillEvent::FieldFailed {
            field: field.to_string(),
            message: error.to_string(),
        });
    }
}
