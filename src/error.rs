use crate::config::ConfigError;
use crate::schema::SchemaError;
use crate::search::SearchError;
use crate::source::SourceError;
use crate::sync::extractor::ExtractionError;
use thiserror::Error;

/// Failures that abort a synchronization run.
///
/// Batch-level problems never show up here; they are reflected in the run's
/// metrics and the failed-batch log instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("could not connect to source: {0}")]
    Connect(#[from] SourceError),
    #[error("could not set up typesense client: {0}")]
    SinkSetup(#[source] SearchError),
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("schema inference failed: {0}")]
    SchemaInference(#[from] SchemaError),
    #[error("collection provisioning failed: {0}")]
    CollectionProvisioning(#[source] SearchError),
}
