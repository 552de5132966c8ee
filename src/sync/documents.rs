//! Shaping extracted records into import documents.

use crate::config::DocumentOptions;
use crate::models::{CleanedRecord, FieldValue};
use crate::schema::strip_denylisted;
use serde_json::{Map, Value};

/// Strip denylisted columns and the source key, then coerce the identifier-like
/// columns to integers.
pub fn prepare_record(record: &mut CleanedRecord, options: &DocumentOptions) {
    strip_denylisted(record);
    record.shift_remove(&options.key_field);

    for field in &options.integer_fields {
        let strip_separators = options.separator_fields.contains(field);
        if let Some(value) = record.get_mut(field) {
            *value = FieldValue::Int(coerce_integer(value, strip_separators));
        }
    }
}

/// Integer form of an identifier value; `0` when it cannot be read as one.
///
/// With `strip_separators`, `-` and spaces inside a string value are dropped before
/// parsing. Otherwise only surrounding whitespace is ignored, so a leading `-` keeps
/// its sign.
pub fn coerce_integer(value: &FieldValue, strip_separators: bool) -> i64 {
    match value {
        FieldValue::Int(int) => *int,
        FieldValue::Bool(flag) => i64::from(*flag),
        FieldValue::Float(float) if float.is_finite() => float.trunc() as i64,
        FieldValue::Text(text) if strip_separators => {
            let digits: String = text
                .trim()
                .chars()
                .filter(|ch| *ch != '-' && *ch != ' ')
                .collect();
            digits.parse().unwrap_or(0)
        }
        FieldValue::Text(text) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

pub fn to_document(record: &CleanedRecord) -> Map<String, Value> {
    record
        .iter()
        .map(|(name, value)| (name.clone(), value.to_document_value()))
        .collect()
}

/// Prepare every record in place and serialize them as newline-delimited JSON
/// (no trailing newline).
pub fn encode_batch(
    records: &mut [CleanedRecord],
    options: &DocumentOptions,
) -> Result<String, serde_json::Error> {
    let mut lines = Vec::with_capacity(records.len());
    for record in records.iter_mut() {
        prepare_record(record, options);
        lines.push(serde_json::to_string(&to_document(record))?);
    }
    Ok(lines.join("\n"))
}
