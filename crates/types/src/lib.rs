use std::{error::Error, fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub mod fill;
pub mod settings;

pub use fill::{BatchFillPayload, FieldFillPayload, FillResponse, RecordFillPayload};
pub use settings::{ApiSettings, EndpointPaths, FillSettings, RetrySettings, VerdantSettings};

/// Identifier of one record attribute (e.g. `"watering_frequency"`). Case-sensitive.
pub type FieldKey = String;

/// Field schema keyed by field name. Iteration order is the schema order.
pub type FieldSchema = IndexMap<FieldKey, Value>;

/// Which stage of a run a [`ProgressEvent`] describes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProgressField {
    /// Emitted once before any request is issued.
    Init,
    /// A field has started or finished.
    Field(FieldKey),
    /// Emitted once after the last group settled.
    Complete,
}

impl ProgressField {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Init => "init",
            Self::Field(key) => key.as_str(),
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for ProgressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProgressField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProgressField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "init" => Self::Init,
            "complete" => Self::Complete,
            _ => Self::Field(raw),
        })
    }
}

/// Progress notification emitted while a fill run advances.
///
/// `completed` never decreases within one run; the final event of a finished
/// run has `completed == total`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub field: ProgressField,
    pub completed: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub fn init(total: usize) -> Self {
        Self {
            field: ProgressField::Init,
            completed: 0,
            total,
        }
    }

    pub fn field(field: impl Into<FieldKey>, completed: usize, total: usize) -> Self {
        Self {
            field: ProgressField::Field(field.into()),
            completed,
            total,
        }
    }

    pub fn complete(total: usize) -> Self {
        Self {
            field: ProgressField::Complete,
            completed: total,
            total,
        }
    }
}

/// Result of asking the backend for a single field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldOutcome {
    /// The backend answered. A null or empty value means "no opinion".
    Success { field: FieldKey, value: Value },
    /// The backend (or the transport) reported an error for this field.
    Failure { field: FieldKey, error: String },
}

impl FieldOutcome {
    pub fn field(&self) -> &str {
        match self {
            Self::Success { field, .. } | Self::Failure { field, .. } => field,
        }
    }
}

/// Backend endpoints used by the fill engine.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillEndpoint {
    /// Multi-field endpoint used for groups larger than one field.
    Batch,
    /// Single-field endpoint used for fallbacks and standalone lookups.
    Field,
    /// Whole-record endpoint used when no schema is supplied.
    Record,
}

impl FillEndpoint {
    pub fn default_path(&self) -> &'static str {
        match self {
            Self::Batch => "/api/ai/plant-fill/batch",
            Self::Field => "/api/ai/plant-fill/field",
            Self::Record => "/api/ai/plant-fill",
        }
    }
}

impl fmt::Display for FillEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Batch => "batch",
            Self::Field => "field",
            Self::Record => "record",
        };
        f.write_str(label)
    }
}

impl FromStr for FillEndpoint {
    type Err = ParseFillEndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "batch" => Ok(Self::Batch),
            "field" => Ok(Self::Field),
            "record" => Ok(Self::Record),
            _ => Err(ParseFillEndpointError),
        }
    }
}

#[derive(Debug)]
pub struct ParseFillEndpointError;

impl fmt::Display for ParseFillEndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid fill endpoint")
    }
}

impl Error for ParseFillEndpointError {}
