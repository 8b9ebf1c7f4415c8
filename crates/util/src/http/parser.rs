//! # HTTP Utilities
//!
//! Helpers for turning plant-fill responses into values or readable errors.

use serde_json::Value;
use thiserror::Error;

/// Return a user-facing message for a non-success status on a fill request.
///
/// `subject` is the field key (or the plant name for whole-record requests),
/// so failures collected from several concurrent requests can be told apart.
///
/// # Example
/// ```rust
/// use verdant_util::http::fill_status_message;
///
/// let message = fill_status_message(504, "height");
/// assert!(message.contains("Gateway timeout"));
/// assert!(message.contains("'height'"));
///
/// let message = fill_status_message(418, "soil");
/// assert!(message.contains("418"));
/// ```
pub fn fill_status_message(status_code: u16, subject: &str) -> String {
    match status_code {
        504 => format!("Gateway timeout (504) while filling '{subject}': the AI service took too long to respond"),
        503 => format!("Service unavailable (503) while filling '{subject}': the AI service is temporarily down"),
        502 => format!("Bad gateway (502) while filling '{subject}': the AI service returned an invalid upstream response"),
        429 => format!("Rate limited (429) while filling '{subject}': too many requests, try again shortly"),
        other => format!("Request for '{subject}' failed with status {other}"),
    }
}

/// Characters of the body kept in a [`BodyParseError`].
const PREVIEW_CHARS: usize = 200;

/// Parse a fill response body as JSON.
///
/// On failure the error carries the HTTP status (when known) and a short,
/// single-line preview of the body so a proxy error page is recognisable in
/// logs.
pub fn parse_fill_body(text: &str, status: Option<u16>) -> Result<Value, BodyParseError> {
    serde_json::from_str::<Value>(text).map_err(|source| BodyParseError {
        status,
        source,
        preview: body_preview(text),
    })
}

fn body_preview(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "<empty>".to_string();
    }
    match collapsed.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &collapsed[..cut]),
        None => collapsed,
    }
}

/// A fill response body that is not valid JSON.
#[derive(Debug, Error)]
#[error("malformed JSON body ({}): {source}; body: {preview}", status_label(.status))]
pub struct BodyParseError {
    status: Option<u16>,
    #[source]
    source: serde_json::Error,
    preview: String,
}

impl BodyParseError {
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn preview(&self) -> &str {
        &self.preview
    }
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "no status".to_string(), |code| format!("status {code}"))
}
