use super::SchemaError;
use crate::models::{CollectionSchema, FieldDescriptor, FieldType, FieldValue, SourceRow};
use log::{info, warn};
use std::collections::HashSet;

/// Name of the synthetic sort key added when no numeric sort field exists.
pub const ROW_ID_FIELD: &str = "row_id";

/// Turn an inferred schema into one the sink will accept.
///
/// Drops the source key, strips quote characters from field names (renaming record
/// keys to match), flags identifier-like fields as facets, settles the default sort
/// field and, when that field is not numeric, appends a mandatory `row_id` and
/// numbers every record 1..=n in extraction order.
pub fn finalize_schema(
    mut schema: CollectionSchema,
    records: &mut [SourceRow],
    key_field: &str,
    sort_override: Option<&str>,
) -> Result<CollectionSchema, SchemaError> {
    schema.fields.retain(|field| field.name != key_field);
    if schema.fields.is_empty() {
        return Err(SchemaError::NoFieldsAfterKeyRemoval(key_field.to_string()));
    }

    sanitize_field_names(&mut schema, records);
    if schema.fields.is_empty() {
        return Err(SchemaError::MissingKey("fields"));
    }

    for field in schema.fields.iter_mut() {
        if looks_like_identifier(&field.name)
            && matches!(field.field_type, FieldType::Int64 | FieldType::String)
        {
            field.facet = true;
        }
    }

    let sort_field = choose_sort_field(&schema, sort_override);
    let sort_type = schema.field(&sort_field).map(|field| field.field_type);

    if sort_type.is_some_and(|field_type| field_type.is_numeric()) {
        if let Some(field) = schema.fields.iter_mut().find(|f| f.name == sort_field) {
            field.optional = false;
        }
        schema.default_sort_field = sort_field;
    } else {
        info!("schema: default sorting field '{sort_field}' is not numeric, adding {ROW_ID_FIELD}");
        schema.fields.retain(|field| field.name != ROW_ID_FIELD);
        schema.fields.push(FieldDescriptor {
            name: ROW_ID_FIELD.to_string(),
            field_type: FieldType::Int64,
            optional: false,
            facet: false,
        });
        schema.default_sort_field = ROW_ID_FIELD.to_string();

        for (position, record) in records.iter_mut().enumerate() {
            record.insert(ROW_ID_FIELD.to_string(), FieldValue::Int(position as i64 + 1));
        }
    }

    validate(&schema)?;
    Ok(schema)
}

fn looks_like_identifier(name: &str) -> bool {
    name.to_lowercase().contains("id")
}

fn choose_sort_field(schema: &CollectionSchema, sort_override: Option<&str>) -> String {
    let exists = |name: &str| schema.field(name).is_some();

    if let Some(requested) = sort_override {
        if exists(requested) {
            return requested.to_string();
        }
        warn!("schema: requested sort field '{requested}' is not in the schema, ignoring");
    }

    if exists(&schema.default_sort_field) {
        return schema.default_sort_field.clone();
    }

    schema
        .fields
        .iter()
        .find(|field| looks_like_identifier(&field.name) && field.name.chars().count() > 3)
        .or_else(|| schema.fields.first())
        .map(|field| field.name.clone())
        .unwrap_or_default()
}

fn sanitize_field_names(schema: &mut CollectionSchema, records: &mut [SourceRow]) {
    let mut seen = HashSet::new();
    let mut renames = Vec::new();

    schema.fields.retain_mut(|field| {
        let clean: String = field
            .name
            .chars()
            .filter(|ch| *ch != '\'' && *ch != '"')
            .collect();

        if clean.is_empty() || !seen.insert(clean.clone()) {
            warn!("schema: dropping field '{}' after quote sanitizing", field.name);
            return false;
        }

        if clean != field.name {
            renames.push((field.name.clone(), clean.clone()));
            if schema.default_sort_field == field.name {
                schema.default_sort_field = clean.clone();
            }
            field.name = clean;
        }
        true
    });

    if renames.is_empty() {
        return;
    }

    for record in records.iter_mut() {
        for (from, to) in &renames {
            if let Some(value) = record.shift_remove(from) {
                record.insert(to.clone(), value);
            }
        }
    }
}

fn validate(schema: &CollectionSchema) -> Result<(), SchemaError> {
    if schema.name.trim().is_empty() {
        return Err(SchemaError::MissingKey("name"));
    }
    if schema.fields.is_empty() {
        return Err(SchemaError::MissingKey("fields"));
    }
    if schema.default_sort_field.is_empty() {
        return Err(SchemaError::MissingKey("default_sorting_field"));
    }

    match schema.field(&schema.default_sort_field) {
        Some(field) if field.field_type.is_numeric() => Ok(()),
        _ => Err(SchemaError::InvalidSortField(
            schema.default_sort_field.clone(),
        )),
    }
}
