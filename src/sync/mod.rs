//! Table to collection synchronization.
//!
//! # Pipeline
//!
//! 1. **Extraction** (`extractor`): one cursor pages through the source table with a
//!    self-tuning page size. Strictly sequential.
//! 2. **Schema** (`crate::schema`): a sample row is typed, then finalized against the
//!    full record set, which may receive a synthetic `row_id`.
//! 3. **Provisioning** (`crate::search::provision`): the collection is recreated.
//!    Nothing is indexed unless this succeeds.
//! 4. **Indexing** (`indexer`): records are split into batches and uploaded by a
//!    bounded pool of workers with per-batch retries (`retry`), a failed-batch log
//!    (`failure_log`) and an optional notification hook (`callback`).
//!
//! Fatal problems in stages 1 to 3 end the run with a [`SyncError`]. Stage 4 never
//! fails the run; its outcome is the returned [`SyncMetrics`].

pub mod callback;
pub mod documents;
pub mod extractor;
pub mod failure_log;
pub mod indexer;
pub mod metrics;
pub mod retry;

pub use callback::CallbackNotifier;
pub use extractor::{ExtractionError, PageSizeController, extract};
pub use failure_log::FailureLog;
pub use indexer::{BulkIndexer, partition_batches};
pub use metrics::{MetricsRegistry, SyncMetrics};
pub use retry::RetryPolicy;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::models::CollectionSchema;
use crate::schema::{finalize_schema, infer_schema, write_field_listing};
use crate::search::{TypesenseClient, drop_collection, provision};
use crate::source::{RowSource, TableName};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub extracted_rows: usize,
    /// `None` when the source was empty and nothing was provisioned.
    pub schema: Option<CollectionSchema>,
    pub metrics: SyncMetrics,
}

/// Run the whole pipeline for one table.
pub async fn run_sync<S: RowSource>(
    source: &S,
    client: &TypesenseClient,
    config: &SyncConfig,
) -> Result<SyncReport, SyncError> {
    config.validate()?;

    if config.drop_collection {
        drop_collection(client, &config.collection_name).await;
    }

    let mut records = extract(
        source,
        &config.table_name,
        config.page_size,
        config.global_limit,
        &config.pagination,
    )
    .await?;

    if records.is_empty() {
        warn!(
            "sync: no rows found in '{}', nothing to index",
            config.table_name
        );
        return Ok(SyncReport {
            extracted_rows: 0,
            schema: None,
            metrics: SyncMetrics::default(),
        });
    }

    let table = TableName::parse(&config.table_name).map_err(ExtractionError::from)?;
    let sample = match source.fetch_sample(&table).await {
        Ok(Some(sample)) => sample,
        Ok(None) => records[0].clone(),
        Err(err) => {
            warn!("sync: sample query failed ({err}), inferring from the first extracted row");
            records[0].clone()
        }
    };

    let inferred = infer_schema(&config.collection_name, &sample)?;
    info!(
        "sync: inferred {} fields from sample row",
        inferred.fields.len()
    );
    if let Some(path) = &config.fields_file {
        write_field_listing(path, &inferred).await;
    }

    let schema = finalize_schema(
        inferred,
        &mut records,
        &config.documents.key_field,
        config.sort_field.as_deref(),
    )?;

    provision(client, &schema)
        .await
        .map_err(SyncError::CollectionProvisioning)?;

    let callback = config
        .callback
        .clone()
        .and_then(|callback| match CallbackNotifier::new(callback) {
            Ok(notifier) => Some(notifier),
            Err(err) => {
                warn!("sync: callback disabled, could not build HTTP client: {err}");
                None
            }
        });

    let extracted_rows = records.len();
    let indexer = BulkIndexer::new(Arc::new(client.clone()))
        .with_failure_log(FailureLog::new(config.failed_batch_log.clone()))
        .with_callback(callback)
        .with_retry(config.retry)
        .with_documents(config.documents.clone());

    let metrics = indexer
        .push(
            records,
            &config.collection_name,
            config.batch_size,
            config.concurrency,
        )
        .await;

    Ok(SyncReport {
        extracted_rows,
        schema: Some(schema),
        metrics,
    })
}
