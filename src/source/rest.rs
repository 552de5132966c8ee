use super::error::mentions_statement_timeout;
use super::{RowSource, SourceError, TableName};
use crate::models::{FieldValue, SourceRow};
use indexmap::IndexMap;
use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;

/// PostgREST-compatible backend (Supabase `rest/v1`).
#[derive(Clone)]
pub struct RestSource {
    http: Client,
    base_url: String,
    api_key: String,
}

impl RestSource {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("typesense-sync/0.1")
            .build()
            .map_err(SourceError::Http)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn select_all(&self, table: &TableName) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        self.http
            .get(url)
            .query(&[("select", "*")])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn fetch_rows(&self, request: RequestBuilder) -> Result<Vec<SourceRow>, SourceError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Vec::new());
        }

        let body = response.text().await?;
        if !status.is_success() {
            if mentions_statement_timeout(&body) {
                return Err(SourceError::Timeout(body));
            }
            return Err(SourceError::Status { status, body });
        }

        let rows: Vec<IndexMap<String, serde_json::Value>> =
            serde_json::from_str(&body).map_err(|err| SourceError::Decode(err.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(column, value)| (column, FieldValue::from(value)))
                    .collect()
            })
            .collect())
    }
}

impl RowSource for RestSource {
    async fn fetch_page(
        &self,
        table: &TableName,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<SourceRow>, SourceError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let end = offset + limit - 1;
        debug!("rest source: selecting {table} range {offset}-{end}");
        let request = self
            .select_all(table)
            .header("Range-Unit", "items")
            .header("Range", format!("{offset}-{end}"));
        self.fetch_rows(request).await
    }

    async fn fetch_sample(&self, table: &TableName) -> Result<Option<SourceRow>, SourceError> {
        let request = self.select_all(table).query(&[("limit", "1")]);
        let rows = self.fetch_rows(request).await?;
        Ok(rows.into_iter().next())
    }
}
