//! Wire payloads exchanged with the plant-fill endpoints.
//!
//! All bodies are camelCase JSON. Optional members are omitted rather than
//! sent as `null` so the backend can tell "not provided" from "explicitly
//! empty".

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{FieldKey, FieldSchema};

/// Body of a multi-field request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchFillPayload {
    pub plant_name: String,
    pub schema: FieldSchema,
    pub field_keys: Vec<FieldKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Body of a single-field request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldFillPayload {
    pub plant_name: String,
    pub schema: FieldSchema,
    pub field_key: FieldKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_field: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Body of a whole-record request, used when no schema is available.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordFillPayload {
    pub plant_name: String,
    pub schema: Option<FieldSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Response envelope shared by all fill endpoints.
///
/// `data` is a single value for the field endpoint and an object keyed by
/// field for the batch and record endpoints. `errors` is only populated by the
/// batch endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FillResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub errors: Option<Map<String, Value>>,
    /// Whole-request error. Usually a string, sometimes an object with a `message`.
    #[serde(default)]
    pub error: Option<Value>,
}

impl FillResponse {
    /// Error message attached to `field` in the batch `errors` map, if any.
    pub fn field_error(&self, field: &str) -> Option<String> {
        self.errors.as_ref()?.get(field).map(error_text)
    }

    /// Whole-request error message, if the body carries a non-blank one.
    pub fn error_message(&self) -> Option<String> {
        self.error
            .as_ref()
            .filter(|entry| !entry.is_null())
            .map(error_text)
            .filter(|message| !message.trim().is_empty())
    }
}

fn error_text(entry: &Value) -> String {
    match entry {
        Value::String(message) => message.clone(),
        Value::Object(details) => details
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| entry.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_payload_omits_absent_optionals() {
        let payload = BatchFillPayload {
            plant_name: "Monstera deliciosa".into(),
            schema: FieldSchema::new(),
            field_keys: vec!["height".into(), "soil".into()],
            existing_data: None,
            language: None,
        };
        let encoded = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            encoded,
            json!({"plantName": "Monstera deliciosa", "schema": {}, "fieldKeys": ["height", "soil"]})
        );
    }

    #[test]
    fn record_payload_sends_null_schema() {
        let payload = RecordFillPayload {
            plant_name: "Fern".into(),
            schema: None,
            existing_data: None,
            language: Some("fr".into()),
        };
        let encoded = serde_json::to_value(&payload).unwrap();
        assert_eq!(encoded, json!({"plantName": "Fern", "schema": null, "language": "fr"}));
    }

    #[test]
    fn field_error_accepts_strings_and_objects() {
        let response: FillResponse = serde_json::from_value(json!({
            "success": true,
            "data": {},
            "errors": {"height": "declined", "soil": {"message": "schema entry malformed"}, "light": 42}
        }))
        .unwrap();
        assert_eq!(response.field_error("height").as_deref(), Some("declined"));
        assert_eq!(response.field_error("soil").as_deref(), Some("schema entry malformed"));
        assert_eq!(response.field_error("light").as_deref(), Some("42"));
        assert!(response.field_error("water").is_none());
    }

    #[test]
    fn request_error_accepts_strings_and_objects() {
        let response: FillResponse = serde_json::from_value(json!({
            "success": false,
            "error": {"code": "QUOTA", "message": "Monthly AI quota reached"}
        }))
        .unwrap();
        assert_eq!(response.error_message().as_deref(), Some("Monthly AI quota reached"));

        let response: FillResponse = serde_json::from_value(json!({"success": false, "error": "Field not supported"})).unwrap();
        assert_eq!(response.error_message().as_deref(), Some("Field not supported"));

        let response: FillResponse = serde_json::from_value(json!({"success": false, "error": "  "})).unwrap();
        assert!(response.error_message().is_none());
        let response: FillResponse = serde_json::from_value(json!({"success": false, "error": null})).unwrap();
        assert!(response.error_message().is_none());
    }

    #[test]
    fn missing_success_flag_reads_as_failure() {
        let response: FillResponse = serde_json::from_value(json!({"data": 3})).unwrap();
        assert!(!response.success);
    }
}
