//! Single-field lookups against the field endpoint.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use verdant_types::{FieldFillPayload, FieldKey, FieldSchema, FillEndpoint, FillResponse};
use verdant_util::{fill_status_message, parse_fill_body};

use crate::error::FillError;
use crate::transport::{FillTransport, HttpReply, ResilientTransport};

/// Parameters of one single-field lookup.
#[derive(Debug, Clone)]
pub struct FieldFetch {
    pub entity_name: String,
    pub schema: FieldSchema,
    pub field_key: FieldKey,
    pub existing_value: Option<Value>,
    pub language: Option<String>,
}

impl FieldFetch {
    pub fn new(entity_name: impl Into<String>, schema: FieldSchema, field_key: impl Into<FieldKey>) -> Self {
        Self {
            entity_name: entity_name.into(),
            schema,
            field_key: field_key.into(),
            existing_value: None,
            language: None,
        }
    }

    pub fn with_existing_value(mut self, value: Option<Value>) -> Self {
        self.existing_value = value;
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    fn payload(&self) -> FieldFillPayload {
        FieldFillPayload {
            plant_name: self.entity_name.clone(),
            schema: self.schema.clone(),
            field_key: self.field_key.clone(),
            existing_field: self.existing_value.clone(),
            language: self.language.clone(),
        }
    }
}

/// Ask the backend for one field's value.
///
/// Returns `Ok(None)` when the backend answered with `null`. Every error
/// except cancellation is attributed to the field and its message names it.
pub async fn fetch_field<T: FillTransport>(
    transport: &ResilientTransport<T>,
    fetch: &FieldFetch,
    cancel: &CancellationToken,
) -> Result<Option<Value>, FillError> {
    let key = fetch.field_key.as_str();
    let payload = serde_json::to_value(fetch.payload())
        .map_err(|error| FillError::Request(format!("could not encode request: {error}")).for_field(key))?;

    let reply = transport
        .send(FillEndpoint::Field, &payload, cancel)
        .await
        .map_err(|error| error.for_field(key))?;

    if !reply.is_success() {
        return Err(field_error(key, fill_status_message(reply.status, key)));
    }

    let response = decode_fill_response(&reply)
        .map_err(|detail| field_error(key, format!("Invalid response while filling '{key}': {detail}")))?;

    if !response.success {
        let message = response
            .error_message()
            .unwrap_or_else(|| format!("Failed to fill field '{key}'"));
        return Err(field_error(key, message));
    }

    debug!(field = %key, empty = response.data.is_null(), "field value received");
    Ok(match response.data {
        Value::Null => None,
        value => Some(value),
    })
}

/// Decode a 2xx reply into the shared response envelope.
pub(crate) fn decode_fill_response(reply: &HttpReply) -> Result<FillResponse, String> {
    let value = parse_fill_body(&reply.body, Some(reply.status)).map_err(|error| error.to_string())?;
    if !value.is_object() {
        return Err(format!("expected a JSON object, got {value}"));
    }
    serde_json::from_value(value).map_err(|error| error.to_string())
}

fn field_error(field: &str, message: String) -> FillError {
    FillError::Field {
        field: field.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTransport, json_reply, schema_of, status_reply};
    use crate::transport::RetryPolicy;
    use serde_json::json;

    fn fetch(key: &str) -> FieldFetch {
        FieldFetch::new("Monstera", schema_of(&["height", "soil"]), key)
    }

    #[tokio::test(start_paused = true)]
    async fn returns_data_value_and_sends_field_payload() {
        let transport = ScriptedTransport::new(|_, _| json_reply(json!({"success": true, "data": "2 m"})));
        let resilient = ResilientTransport::new(transport.clone(), RetryPolicy::default());

        let request = fetch("height")
            .with_existing_value(Some(json!("1 m")))
            .with_language(Some("de".into()));
        let value = fetch_field(&resilient, &request, &CancellationToken::new()).await.unwrap();
        assert_eq!(value, Some(json!("2 m")));

        let (endpoint, body) = transport.requests().remove(0);
        assert_eq!(endpoint, FillEndpoint::Field);
        assert_eq!(body["plantName"], "Monstera");
        assert_eq!(body["fieldKey"], "height");
        assert_eq!(body["existingField"], "1 m");
        assert_eq!(body["language"], "de");
        assert!(body["schema"].is_object());
    }

    #[tokio::test(start_paused = true)]
    async fn null_data_is_none() {
        let transport = ScriptedTransport::new(|_, _| json_reply(json!({"success": true, "data": null})));
        let resilient = ResilientTransport::new(transport, RetryPolicy::default());
        let value = fetch_field(&resilient, &fetch("height"), &CancellationToken::new()).await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test(start_paused = true)]
    async fn status_failures_name_the_field() {
        let transport = ScriptedTransport::new(|_, _| status_reply(504));
        let resilient = ResilientTransport::new(transport.clone(), RetryPolicy::default());
        let error = fetch_field(&resilient, &fetch("soil"), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(error.field(), Some("soil"));
        assert!(error.to_string().contains("Gateway timeout"));
        assert!(error.to_string().contains("'soil'"));
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unsuccessful_body_uses_its_error_or_generic_message() {
        let transport = ScriptedTransport::sequence(vec![
            json_reply(json!({"success": false, "error": "Field not supported"})),
            json_reply(json!({"success": false})),
        ]);
        let resilient = ResilientTransport::new(transport, RetryPolicy::default());
        let cancel = CancellationToken::new();

        let error = fetch_field(&resilient, &fetch("soil"), &cancel).await.unwrap_err();
        assert_eq!(error.to_string(), "Field not supported");
        let error = fetch_field(&resilient, &fetch("soil"), &cancel).await.unwrap_err();
        assert_eq!(error.to_string(), "Failed to fill field 'soil'");
    }

    #[tokio::test(start_paused = true)]
    async fn structured_body_error_keeps_its_message() {
        let transport = ScriptedTransport::new(|_, _| {
            json_reply(json!({"success": false, "error": {"code": "QUOTA", "message": "Monthly AI quota reached"}}))
        });
        let resilient = ResilientTransport::new(transport, RetryPolicy::default());
        let error = fetch_field(&resilient, &fetch("soil"), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(error.field(), Some("soil"));
        assert_eq!(error.to_string(), "Monthly AI quota reached");
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_body_is_a_field_error() {
        let transport = ScriptedTransport::new(|_, _| Ok(HttpReply::new(200, "<html>oops</html>")));
        let resilient = ResilientTransport::new(transport, RetryPolicy::default());
        let error = fetch_field(&resilient, &fetch("height"), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(error.field(), Some("height"));
        assert!(error.to_string().starts_with("Invalid response while filling 'height'"));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_transport_errors_are_attributed() {
        let transport = ScriptedTransport::new(|_, _| Err(crate::transport::TransportFailure::new("connection refused")));
        let resilient = ResilientTransport::new(transport, RetryPolicy::default());
        let error = fetch_field(&resilient, &fetch("height"), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(error.field(), Some("height"));
        assert_eq!(error.to_string(), "Failed to fill 'height': request failed after 3 attempts: connection refused");
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_is_not_attributed() {
        let transport = ScriptedTransport::new(|_, _| json_reply(json!({"success": true, "data": 1})));
        let resilient = ResilientTransport::new(transport, RetryPolicy::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let error = fetch_field(&resilient, &fetch("height"), &cancel).await.unwrap_err();
        assert_eq!(error, FillError::Cancelled);
    }
}
