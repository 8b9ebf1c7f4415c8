use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use verdant_types::{FieldKey, FieldSchema};

/// Everything one fill run needs. Not modified while the run is in progress.
#[derive(Debug, Clone)]
pub struct FillRequest {
    /// Sent to the backend as `plantName`.
    pub entity_name: String,
    /// `None` switches to a single whole-record request.
    pub schema: Option<FieldSchema>,
    /// Current record; seeds the result and gives the backend context.
    pub existing_data: Map<String, Value>,
    /// Restricts the run to these fields when non-empty.
    pub explicit_fields: Option<Vec<FieldKey>>,
    pub language: Option<String>,
    /// When false, the first field failure aborts the run.
    pub continue_on_field_error: bool,
    pub cancellation: CancellationToken,
}

impl FillRequest {
    pub fn new(entity_name: impl Into<String>, schema: Option<FieldSchema>) -> Self {
        Self {
            entity_name: entity_name.into(),
            schema,
            existing_data: Map::new(),
            explicit_fields: None,
            language: None,
            continue_on_field_error: false,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_existing_data(mut self, existing_data: Map<String, Value>) -> Self {
        self.existing_data = existing_data;
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldKey>) -> Self {
        self.explicit_fields = Some(fields);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn continue_on_field_error(mut self, enabled: bool) -> Self {
        self.continue_on_field_error = enabled;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}
