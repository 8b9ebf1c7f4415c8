//! Error taxonomy of the fill engine.

use thiserror::Error;
use verdant_types::FieldKey;

/// Failure of a fill run, a field lookup, or one resilient transport call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FillError {
    /// The cancellation token fired. Never retried and never swallowed.
    #[error("fill cancelled")]
    Cancelled,

    /// Retries ran out and the last status observed was a 504.
    #[error("gateway timeout after {attempts} attempts")]
    GatewayTimeout { attempts: u32 },

    /// Retries ran out after transport-level failures.
    #[error("request failed after {attempts} attempts: {message}")]
    Exhausted { attempts: u32, message: String },

    /// A single field could not be filled. The message names the field.
    #[error("{message}")]
    Field { field: FieldKey, message: String },

    /// A request that is not tied to one field failed (batch or whole-record).
    #[error("{0}")]
    Request(String),

    /// The backend answered with a body that could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl FillError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Field the error is attributed to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Field { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Attribute this error to `field`, keeping cancellation and errors that
    /// already name a field untouched.
    pub(crate) fn for_field(self, field: &str) -> Self {
        match self {
            Self::Cancelled | Self::Field { .. } => self,
            other => Self::Field {
                field: field.to_string(),
                message: format!("Failed to fill '{field}': {other}"),
            },
        }
    }
}
