//! Typesense sink: collection administration and bulk document import.

pub mod client;
pub mod error;
pub mod provision;

pub use client::{CreateOutcome, DeleteOutcome, TypesenseClient};
pub use error::SearchError;
pub use provision::{drop_collection, provision};

use reqwest::StatusCode;
use std::future::Future;

/// Raw outcome of one import request.
#[derive(Debug, Clone)]
pub struct ImportResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Anything that accepts newline-delimited JSON upserts for a collection.
pub trait DocumentSink: Send + Sync + 'static {
    fn import_documents(
        &self,
        collection: &str,
        body: String,
    ) -> impl Future<Output = Result<ImportResponse, SearchError>> + Send;
}
