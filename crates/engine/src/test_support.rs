//! In-memory transport and observer used by the engine tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use verdant_types::{FieldSchema, FillEndpoint, ProgressEvent};

use crate::error::FillError;
use crate::observer::FillObserver;
use crate::transport::{FillTransport, HttpReply, TransportFailure};

type Handler = Box<dyn FnMut(FillEndpoint, &Value) -> Result<HttpReply, TransportFailure> + Send>;

/// Transport that answers from a closure and records every request body.
pub struct ScriptedTransport {
    handler: Mutex<Handler>,
    latency: Duration,
    requests: Mutex<Vec<(FillEndpoint, Value)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(handler: impl FnMut(FillEndpoint, &Value) -> Result<HttpReply, TransportFailure> + Send + 'static) -> Arc<Self> {
        Self::delayed(Duration::ZERO, handler)
    }

    /// Every request waits `latency` (virtual time in paused tests) before answering.
    pub fn delayed(
        latency: Duration,
        handler: impl FnMut(FillEndpoint, &Value) -> Result<HttpReply, TransportFailure> + Send + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Mutex::new(Box::new(handler)),
            latency,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        })
    }

    /// Answers with `replies` in order, regardless of endpoint.
    pub fn sequence(replies: Vec<Result<HttpReply, TransportFailure>>) -> Arc<Self> {
        let mut replies = replies.into_iter();
        Self::new(move |_, _| replies.next().expect("scripted reply"))
    }

    pub fn requests(&self) -> Vec<(FillEndpoint, Value)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Highest number of requests that were waiting on their reply at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn count_for(&self, endpoint: FillEndpoint) -> usize {
        self.requests().iter().filter(|(seen, _)| *seen == endpoint).count()
    }

    /// `fieldKey` of every single-field request, in issue order.
    pub fn single_field_requests(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter(|(endpoint, _)| *endpoint == FillEndpoint::Field)
            .filter_map(|(_, body)| body["fieldKey"].as_str().map(str::to_string))
            .collect()
    }

    /// Every field key mentioned by any request, batch or single.
    pub fn all_requested_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        for (_, body) in self.requests() {
            if let Some(key) = body["fieldKey"].as_str() {
                fields.push(key.to_string());
            }
            if let Some(keys) = body["fieldKeys"].as_array() {
                fields.extend(keys.iter().filter_map(Value::as_str).map(str::to_string));
            }
        }
        fields
    }
}

#[async_trait]
impl FillTransport for ScriptedTransport {
    async fn post_json(&self, endpoint: FillEndpoint, payload: &Value) -> Result<HttpReply, TransportFailure> {
        self.requests.lock().unwrap().push((endpoint, payload.clone()));
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let mut handler = self.handler.lock().unwrap();
        (handler)(endpoint, payload)
    }
}

pub fn json_reply(body: Value) -> Result<HttpReply, TransportFailure> {
    Ok(HttpReply::new(200, body.to_string()))
}

pub fn status_reply(status: u16) -> Result<HttpReply, TransportFailure> {
    Ok(HttpReply::new(status, json!({"success": false, "error": format!("status {status}")}).to_string()))
}

/// Batch reply answering every requested key with `"<key>-value"`.
pub fn echo_batch(body: &Value) -> Result<HttpReply, TransportFailure> {
    let mut data = serde_json::Map::new();
    for key in body["fieldKeys"].as_array().into_iter().flatten().filter_map(Value::as_str) {
        data.insert(key.to_string(), json!(format!("{key}-value")));
    }
    json_reply(json!({"success": true, "data": data}))
}

/// Single-field reply answering with `"<key>-value"`.
pub fn echo_field(body: &Value) -> Result<HttpReply, TransportFailure> {
    let key = body["fieldKey"].as_str().unwrap_or_default();
    json_reply(json!({"success": true, "data": format!("{key}-value")}))
}

pub fn schema_of(keys: &[&str]) -> FieldSchema {
    keys.iter()
        .map(|key| (key.to_string(), json!({"type": "string", "description": format!("{key} of the plant")})))
        .collect()
}

/// Observer that keeps everything it is told.
#[derive(Default)]
pub struct RecordingObserver {
    pub progress: Mutex<Vec<ProgressEvent>>,
    pub completed: Mutex<Vec<(String, Option<Value>)>>,
    pub errors: Mutex<Vec<(String, String)>>,
}

impl RecordingObserver {
    pub fn progress(&self) -> Vec<ProgressEvent> {
        self.progress.lock().unwrap().clone()
    }

    pub fn completed_fields(&self) -> Vec<String> {
        self.completed.lock().unwrap().iter().map(|(field, _)| field.clone()).collect()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors.lock().unwrap().clone()
    }
}

impl FillObserver for RecordingObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        self.progress.lock().unwrap().push(event.clone());
    }

    fn on_field_complete(&self, field: &str, value: Option<&Value>) {
        self.completed.lock().unwrap().push((field.to_string(), value.cloned()));
    }

    fn on_field_error(&self, field: &str, error: &FillError) {
        self.errors.lock().unwrap().push((field.to_string(), error.to_string()));
    }
}
