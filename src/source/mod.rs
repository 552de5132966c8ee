//! Row sources: where the table being synchronized is read from.
//!
//! Two backends are supported and behave identically as far as the pipeline is
//! concerned: a direct Postgres connection and a PostgREST-style REST service
//! (Supabase). Both expose offset/limit paging plus a single-row sample.

pub mod error;
pub mod postgres;
pub mod rest;
pub mod table;

pub use error::SourceError;
pub use postgres::PgSource;
pub use rest::RestSource;
pub use table::TableName;

use crate::config::SourceSettings;
use crate::models::SourceRow;
use std::future::Future;

/// Paged access to one table.
pub trait RowSource: Send + Sync {
    /// Rows `[offset, offset + limit)` in the source's natural order.
    fn fetch_page(
        &self,
        table: &TableName,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SourceRow>, SourceError>> + Send;

    /// First row of the table, if any.
    fn fetch_sample(
        &self,
        table: &TableName,
    ) -> impl Future<Output = Result<Option<SourceRow>, SourceError>> + Send;
}

/// The configured backend.
pub enum SourceBackend {
    Postgres(PgSource),
    Rest(RestSource),
}

impl SourceBackend {
    pub async fn connect(settings: &SourceSettings) -> Result<Self, SourceError> {
        match settings {
            SourceSettings::Postgres {
                uri,
                max_connections,
                statement_timeout,
            } => {
                let source = PgSource::connect(uri, *max_connections, *statement_timeout).await?;
                Ok(SourceBackend::Postgres(source))
            }
            SourceSettings::Rest {
                base_url,
                api_key,
                request_timeout,
            } => {
                let source = RestSource::new(base_url, api_key, *request_timeout)?;
                Ok(SourceBackend::Rest(source))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SourceBackend::Postgres(_) => "postgres",
            SourceBackend::Rest(_) => "rest",
        }
    }
}

impl RowSource for SourceBackend {
    async fn fetch_page(
        &self,
        table: &TableName,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<SourceRow>, SourceError> {
        match self {
            SourceBackend::Postgres(source) => source.fetch_page(table, offset, limit).await,
            SourceBackend::Rest(source) => source.fetch_page(table, offset, limit).await,
        }
    }

    async fn fetch_sample(&self, table: &TableName) -> Result<Option<SourceRow>, SourceError> {
        match self {
            SourceBackend::Postgres(source) => source.fetch_sample(table).await,
            SourceBackend::Rest(source) => source.fetch_sample(table).await,
        }
    }
}
