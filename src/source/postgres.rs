use super::{RowSource, SourceError, TableName};
use crate::models::{FieldValue, SourceRow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{debug, info, warn};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, ConnectOptions, Row, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Direct Postgres connection backend.
#[derive(Clone)]
pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    /// Connect with an optional session `statement_timeout`, which is what makes slow
    /// pages surface as timeouts rather than hanging.
    pub async fn connect(
        uri: &str,
        max_connections: u32,
        statement_timeout: Option<Duration>,
    ) -> Result<Self, SourceError> {
        let mut options = PgConnectOptions::from_str(uri)?.log_statements(log::LevelFilter::Debug);
        if let Some(timeout) = statement_timeout {
            options = options.options([("statement_timeout", timeout.as_millis().to_string())]);
        }

        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        info!(
            "postgres source: connected (max {} connections, statement timeout {:?})",
            max_connections.max(1),
            statement_timeout
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl RowSource for PgSource {
    async fn fetch_page(
        &self,
        table: &TableName,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<SourceRow>, SourceError> {
        let query = format!("SELECT * FROM {table} OFFSET {offset} LIMIT {limit}");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn fetch_sample(&self, table: &TableName) -> Result<Option<SourceRow>, SourceError> {
        debug!("postgres source: fetching sample row from '{table}'");
        let query = format!("SELECT * FROM {table} LIMIT 1");
        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(decode_row))
    }
}

fn decode_row(row: &PgRow) -> SourceRow {
    let mut decoded = SourceRow::with_capacity(row.len());
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name());
        decoded.insert(column.name().to_string(), value);
    }
    decoded
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> FieldValue {
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return FieldValue::Null,
        Ok(_) => {}
        Err(err) => {
            warn!("postgres source: column {index} unreadable: {err}");
            return FieldValue::Null;
        }
    }

    let decoded = match type_name {
        "BOOL" => row.try_get::<bool, _>(index).map(FieldValue::Bool),
        "INT2" => row
            .try_get::<i16, _>(index)
            .map(|value| FieldValue::Int(value.into())),
        "INT4" => row
            .try_get::<i32, _>(index)
            .map(|value| FieldValue::Int(value.into())),
        "INT8" => row.try_get::<i64, _>(index).map(FieldValue::Int),
        "FLOAT4" => row
            .try_get::<f32, _>(index)
            .map(|value| FieldValue::Float(value.into())),
        "FLOAT8" => row.try_get::<f64, _>(index).map(FieldValue::Float),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<String, _>(index).map(FieldValue::Text)
        }
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(FieldValue::Timestamp),
        "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(index)
            .map(FieldValue::NaiveTimestamp),
        "DATE" => row.try_get::<NaiveDate, _>(index).map(FieldValue::Date),
        "UUID" => row.try_get::<Uuid, _>(index).map(FieldValue::Uuid),
        "JSON" | "JSONB" => row
            .try_get::<serde_json::Value, _>(index)
            .map(FieldValue::Json),
        other => {
            debug!("postgres source: unsupported column type {other}, reading as null");
            return FieldValue::Null;
        }
    };

    decoded.unwrap_or_else(|err| {
        warn!("postgres source: failed to decode {type_name} column {index}: {err}");
        FieldValue::Null
    })
}
