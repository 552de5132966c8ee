//! Schema derivation for the target collection.
//!
//! A single sample row is typed by [`inference::infer_schema`]; the result is then
//! turned into something the sink accepts by [`finalize::finalize_schema`], which may
//! also stamp a synthetic `row_id` onto every extracted record.

pub mod columns;
pub mod finalize;
pub mod inference;

pub use columns::{declared_type, is_denylisted, strip_denylisted};
pub use finalize::{ROW_ID_FIELD, finalize_schema};
pub use inference::infer_schema;

use crate::models::CollectionSchema;
use log::{info, warn};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("no valid fields could be inferred from the sample row")]
    NoInferableFields,
    #[error("no fields remain after removing key field '{0}'")]
    NoFieldsAfterKeyRemoval(String),
    #[error("finalized schema is missing required key '{0}'")]
    MissingKey(&'static str),
    #[error("default sorting field '{0}' must be an existing int64 or float field")]
    InvalidSortField(String),
}

/// Write one `name: type` line per field. Failures are logged, never returned.
pub async fn write_field_listing(path: &Path, schema: &CollectionSchema) {
    let listing: String = schema
        .fields
        .iter()
        .map(|field| format!("{}: {}\n", field.name, field.field_type))
        .collect();

    match tokio::fs::write(path, listing).await {
        Ok(()) => info!(
            "schema: wrote {} field names to {}",
            schema.fields.len(),
            path.display()
        ),
        Err(err) => warn!(
            "schema: failed to write field listing {}: {err}",
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldDescriptor, FieldType};

    #[tokio::test]
    async fn field_listing_has_one_line_per_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people_fields.txt");
        let schema = CollectionSchema {
            name: "people".to_string(),
            fields: vec![
                FieldDescriptor::optional("name", FieldType::String),
                FieldDescriptor::optional("visits", FieldType::Int64),
            ],
            default_sort_field: "visits".to_string(),
        };

        write_field_listing(&path, &schema).await;

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "name: string\nvisits: int64\n");
    }

    #[tokio::test]
    async fn unwritable_listing_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("fields.txt");
        let schema = CollectionSchema {
            name: "people".to_string(),
            fields: vec![FieldDescriptor::optional("visits", FieldType::Int64)],
            default_sort_field: "visits".to_string(),
        };

        write_field_listing(&path, &schema).await;
        assert!(!path.exists());
    }
}
