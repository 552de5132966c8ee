use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One scalar cell read from the source table.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    NaiveTimestamp(NaiveDateTime),
    Date(NaiveDate),
    Uuid(Uuid),
    /// Composite values (arrays, objects, json columns). Never typed by inference.
    Json(serde_json::Value),
}

impl FieldValue {
    /// Runtime kind used when no declared column type applies.
    pub fn inferred_type(&self) -> Option<FieldType> {
        match self {
            FieldValue::Bool(_) => Some(FieldType::Bool),
            FieldValue::Int(_) => Some(FieldType::Int64),
            FieldValue::Float(_) => Some(FieldType::Float),
            FieldValue::Text(_) => Some(FieldType::String),
            _ => None,
        }
    }

    /// Wire form of the value inside an import document.
    ///
    /// Nulls become empty strings, temporal values ISO-8601 strings and UUIDs their
    /// hyphenated form. Everything else passes through unchanged.
    pub fn to_document_value(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            FieldValue::Null => Value::String(String::new()),
            FieldValue::Bool(value) => Value::Bool(*value),
            FieldValue::Int(value) => Value::from(*value),
            FieldValue::Float(value) => serde_json::Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(value) => Value::String(value.clone()),
            FieldValue::Timestamp(value) => {
                Value::String(value.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            }
            FieldValue::NaiveTimestamp(value) => {
                Value::String(value.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
            FieldValue::Date(value) => Value::String(value.format("%Y-%m-%d").to_string()),
            FieldValue::Uuid(value) => Value::String(value.hyphenated().to_string()),
            FieldValue::Json(value) => value.clone(),
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(flag) => FieldValue::Bool(flag),
            Value::Number(number) => match number.as_i64() {
                Some(int) => FieldValue::Int(int),
                None => number
                    .as_f64()
                    .map(FieldValue::Float)
                    .unwrap_or(FieldValue::Json(Value::Number(number))),
            },
            Value::String(text) => FieldValue::Text(text),
            other => FieldValue::Json(other),
        }
    }
}

/// Ordered column name to value mapping, exactly as the source returned it.
pub type SourceRow = IndexMap<String, FieldValue>;

/// A [`SourceRow`] with the denylisted columns removed.
pub type CleanedRecord = SourceRow;

/// The four primitive field types the sink accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "string")]
    String,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Int64 => "int64",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::String => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int64 | FieldType::Float)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub optional: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub facet: bool,
}

impl FieldDescriptor {
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            optional: true,
            facet: false,
        }
    }
}

/// Collection definition in the shape `POST /collections` expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    #[serde(rename = "default_sorting_field")]
    pub default_sort_field: String,
}

impl CollectionSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Contiguous slice of the extracted record set, owned by exactly one worker.
#[derive(Debug, Clone)]
pub struct Batch {
    pub start_offset: usize,
    pub records: Vec<CleanedRecord>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One line of the failed-batch audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedBatchEntry {
    pub timestamp: String,
    pub collection: String,
    pub batch_start: usize,
    pub batch_size: usize,
    pub reason: String,
}

impl FailedBatchEntry {
    pub fn now(
        collection: impl Into<String>,
        batch_start: usize,
        batch_size: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            collection: collection.into(),
            batch_start,
            batch_size,
            reason: reason.into(),
        }
    }
}
