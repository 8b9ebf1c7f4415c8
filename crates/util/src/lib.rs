//! Shared helpers for the Verdant client crates.

use once_cell::sync::Lazy;
use regex::Regex;

pub mod http;
pub mod settings;

pub use http::{BodyParseError, fill_status_message, parse_fill_body};
pub use settings::{SettingsError, load_settings};

static SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization: )([\w\-\.=:/+ ]+)",
        r"(?i)(bearer )([\w\-\.=:/+]+)",
        r"(?i)(x-admin-token: )([^\s]+)",
        r"(?i)([A-Z0-9_]*?(KEY|TOKEN|SECRET|PASSWORD)=)([^\s]+)",
        r#"(?i)("[a-z_]*(token|secret|password)"\s*:\s*)("[^"]*")"#,
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Redacts values that look like secrets in a string.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for re in SECRET_PATTERNS.iter() {
        redacted = re
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}<redacted>", prefix)
            })
            .to_string();
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_authorization_and_admin_headers() {
        let line = "authorization: Bearer abc.def-123\nx-admin-token: s3cr3t";
        let redacted = redact_sensitive(line);
        assert!(!redacted.contains("abc.def-123"));
        assert!(!redacted.contains("s3cr3t"));
        assert!(redacted.contains("x-admin-token: <redacted>"));
    }

    #[test]
    fn redacts_env_assignments_and_json_tokens() {
        let redacted = redact_sensitive(r#"ADMIN_STATIC_TOKEN=deadbeef {"access_token": "xyz"}"#);
        assert_eq!(redacted, r#"ADMIN_STATIC_TOKEN=<redacted> {"access_token": <redacted>}"#);
    }

    #[test]
    fn leaves_plain_text_alone() {
        let text = "field 'height' filled in 120ms";
        assert_eq!(redact_sensitive(text), text);
    }
}
