//! Work-list computation: which schema fields a run may fill, in what order.

use indexmap::IndexSet;
use verdant_types::{FieldKey, FieldSchema};

/// Identity, media and audit fields. Compared case-insensitively.
const PROTECTED_FIELDS: &[&str] = &[
    "id",
    "name",
    "image",
    "images",
    "imageurl",
    "image_url",
    "image-url",
    "imageurls",
    "image_urls",
    "meta",
    "metadata",
];

/// Whether `key` is never fillable, regardless of schema contents.
pub fn is_protected_field(key: &str) -> bool {
    PROTECTED_FIELDS.iter().any(|protected| key.eq_ignore_ascii_case(protected))
}

/// Compute the ordered, duplicate-free list of fields to fill.
///
/// A non-empty `explicit_fields` selects those keys that exist in the schema,
/// in the caller's order; otherwise every schema key is taken in schema order.
/// Protected fields are removed in both cases.
pub fn classify(schema: &FieldSchema, explicit_fields: Option<&[FieldKey]>) -> Vec<FieldKey> {
    let candidates: Vec<&FieldKey> = match explicit_fields {
        Some(fields) if !fields.is_empty() => fields.iter().filter(|key| schema.contains_key(key.as_str())).collect(),
        _ => schema.keys().collect(),
    };

    candidates
        .into_iter()
        .filter(|key| !is_protected_field(key))
        .cloned()
        .collect::<IndexSet<FieldKey>>()
        .into_iter()
        .collect()
}
