use super::SchemaError;
use super::columns::{declared_type, is_denylisted};
use crate::models::{CollectionSchema, FieldDescriptor, FieldType, FieldValue, SourceRow};
use log::{info, warn};

/// Derive typed field descriptors from a single sample row.
///
/// Denylisted columns are skipped outright. Columns with a declared type must accept
/// a coercion of the sample value to that type; otherwise the runtime kind of the
/// sample decides. Anything that cannot be typed (nulls, timestamps, composites) is
/// dropped with a warning. Every surviving field starts out optional.
pub fn infer_schema(
    collection_name: &str,
    sample: &SourceRow,
) -> Result<CollectionSchema, SchemaError> {
    let mut fields = Vec::with_capacity(sample.len());

    for (name, value) in sample {
        if is_denylisted(name) {
            info!("schema: skipping denylisted field '{name}'");
            continue;
        }

        let field_type = match declared_type(name) {
            Some(declared) => match coerce(declared, value) {
                Ok(_) => declared,
                Err(reason) => {
                    warn!("schema: skipping field '{name}' due to casting error: {reason}");
                    continue;
                }
            },
            None => match value.inferred_type() {
                Some(inferred) => inferred,
                None => {
                    warn!(
                        "schema: skipping field '{name}' (unsupported or null sample: {})",
                        kind_name(value)
                    );
                    continue;
                }
            },
        };

        fields.push(FieldDescriptor::optional(name.clone(), field_type));
    }

    let default_sort_field = fields
        .iter()
        .find(|field| {
            matches!(
                field.field_type,
                FieldType::Int64 | FieldType::Float | FieldType::String
            )
        })
        .or_else(|| fields.first())
        .map(|field| field.name.clone())
        .ok_or(SchemaError::NoInferableFields)?;

    Ok(CollectionSchema {
        name: collection_name.to_string(),
        fields,
        default_sort_field,
    })
}

/// Coerce a sample value to a declared column type.
pub fn coerce(target: FieldType, value: &FieldValue) -> Result<FieldValue, String> {
    match target {
        FieldType::Int64 => coerce_int(value).map(FieldValue::Int),
        FieldType::Float => coerce_float(value).map(FieldValue::Float),
        FieldType::Bool => Ok(FieldValue::Bool(truthy(value))),
        FieldType::String => Ok(FieldValue::Text(match value {
            FieldValue::Null => String::new(),
            FieldValue::Text(text) => text.clone(),
            other => match other.to_document_value() {
                serde_json::Value::String(text) => text,
                json => json.to_string(),
            },
        })),
    }
}

fn coerce_int(value: &FieldValue) -> Result<i64, String> {
    match value {
        FieldValue::Int(int) => Ok(*int),
        FieldValue::Bool(flag) => Ok(i64::from(*flag)),
        FieldValue::Float(float) if float.is_finite() => Ok(float.trunc() as i64),
        FieldValue::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|err| format!("'{text}' is not an integer: {err}")),
        other => Err(format!("cannot convert {} to int64", kind_name(other))),
    }
}

fn coerce_float(value: &FieldValue) -> Result<f64, String> {
    match value {
        FieldValue::Float(float) => Ok(*float),
        FieldValue::Int(int) => Ok(*int as f64),
        FieldValue::Bool(flag) => Ok(if *flag { 1.0 } else { 0.0 }),
        FieldValue::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|err| format!("'{text}' is not a float: {err}")),
        other => Err(format!("cannot convert {} to float", kind_name(other))),
    }
}

fn truthy(value: &FieldValue) -> bool {
    match value {
        FieldValue::Null => false,
        FieldValue::Bool(flag) => *flag,
        FieldValue::Int(int) => *int != 0,
        FieldValue::Float(float) => *float != 0.0,
        FieldValue::Text(text) => !text.is_empty(),
        FieldValue::Json(serde_json::Value::Array(items)) => !items.is_empty(),
        FieldValue::Json(serde_json::Value::Object(map)) => !map.is_empty(),
        _ => true,
    }
}

fn kind_name(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Null => "null",
        FieldValue::Bool(_) => "bool",
        FieldValue::Int(_) => "int",
        FieldValue::Float(_) => "float",
        FieldValue::Text(_) => "text",
        FieldValue::Timestamp(_) | FieldValue::NaiveTimestamp(_) => "timestamp",
        FieldValue::Date(_) => "date",
        FieldValue::Uuid(_) => "uuid",
        FieldValue::Json(_) => "json",
    }
}
