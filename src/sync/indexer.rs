//! Concurrent batch upload into the sink.
//!
//! The record set is split once into contiguous [`Batch`]es, each moved into the task
//! that indexes it, so no two workers share a record. At most `concurrency` batches
//! are in flight; they are started in order but may finish in any order. A batch
//! that fails terminally is logged and counted without disturbing its siblings.

use super::callback::{BatchNotification, CallbackNotifier};
use super::documents::encode_batch;
use super::failure_log::FailureLog;
use super::metrics::{MetricsRegistry, SyncMetrics};
use super::retry::{AttemptFailure, RetryDecision, RetryPolicy};
use crate::config::DocumentOptions;
use crate::models::{Batch, CleanedRecord, FailedBatchEntry};
use crate::search::DocumentSink;
use log::{debug, error, info, warn};
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Split `records` into ordered, disjoint batches of at most `batch_size`.
pub fn partition_batches(records: Vec<CleanedRecord>, batch_size: usize) -> Vec<Batch> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(records.len().div_ceil(batch_size));
    let mut remaining = records.into_iter();
    let mut start_offset = 0;

    loop {
        let chunk: Vec<CleanedRecord> = remaining.by_ref().take(batch_size).collect();
        if chunk.is_empty() {
            break;
        }
        let len = chunk.len();
        batches.push(Batch {
            start_offset,
            records: chunk,
        });
        start_offset += len;
    }

    batches
}

/// Count `success: true` lines in an import response. Other lines are logged.
pub fn count_document_successes(body: &str, batch_start: usize) -> usize {
    let mut succeeded = 0;
    for (position, line) in body.lines().filter(|l| !l.trim().is_empty()).enumerate() {
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(result) if result.get("success").and_then(|v| v.as_bool()) == Some(true) => {
                succeeded += 1;
            }
            Ok(_) => warn!(
                "indexer: document {} failed: {line}",
                batch_start + position
            ),
            Err(err) => warn!("indexer: could not parse import result line '{line}': {err}"),
        }
    }
    succeeded
}

struct WorkerContext<K> {
    sink: Arc<K>,
    collection: String,
    metrics: Arc<MetricsRegistry>,
    failure_log: FailureLog,
    callback: Option<CallbackNotifier>,
    retry: RetryPolicy,
    documents: DocumentOptions,
}

pub struct BulkIndexer<K: DocumentSink> {
    sink: Arc<K>,
    metrics: Arc<MetricsRegistry>,
    failure_log: FailureLog,
    callback: Option<CallbackNotifier>,
    retry: RetryPolicy,
    documents: DocumentOptions,
}

impl<K: DocumentSink> BulkIndexer<K> {
    pub fn new(sink: Arc<K>) -> Self {
        Self {
            sink,
            metrics: Arc::new(MetricsRegistry::new()),
            failure_log: FailureLog::disabled(),
            callback: None,
            retry: RetryPolicy::default(),
            documents: DocumentOptions::default(),
        }
    }

    pub fn with_failure_log(mut self, failure_log: FailureLog) -> Self {
        self.failure_log = failure_log;
        self
    }

    pub fn with_callback(mut self, callback: Option<CallbackNotifier>) -> Self {
        self.callback = callback;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_documents(mut self, documents: DocumentOptions) -> Self {
        self.documents = documents;
        self
    }

    /// Index every record and return the counters once all batches have finished.
    pub async fn push(
        &self,
        records: Vec<CleanedRecord>,
        collection: &str,
        batch_size: usize,
        concurrency: usize,
    ) -> SyncMetrics {
        let record_count = records.len();
        let batches = partition_batches(records, batch_size);
        info!(
            "indexer: pushing {record_count} records into '{collection}' as {} batches, \
             {} at a time",
            batches.len(),
            concurrency.max(1)
        );

        let context = Arc::new(WorkerContext {
            sink: Arc::clone(&self.sink),
            collection: collection.to_string(),
            metrics: Arc::clone(&self.metrics),
            failure_log: self.failure_log.clone(),
            callback: self.callback.clone(),
            retry: self.retry,
            documents: self.documents.clone(),
        });

        let inflight = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for batch in batches {
            let permit = match Arc::clone(&inflight).acquire_owned().await {
                Ok(permit) => permit,
                Err(err) => {
                    error!("indexer: worker pool closed: {err}");
                    break;
                }
            };
            let context = Arc::clone(&context);
            tasks.spawn(async move {
                let _permit = permit;
                index_batch(&context, batch).await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!("indexer: batch task aborted: {err}");
            }
        }

        let metrics = self.metrics.snapshot();
        info!(
            "indexer: done, {} batches ({} failed), {} documents indexed",
            metrics.total_batches, metrics.failed_batches, metrics.successful_documents
        );
        metrics
    }
}

async fn index_batch<K: DocumentSink>(context: &WorkerContext<K>, mut batch: Batch) {
    let start = batch.start_offset;
    let size = batch.len();
    context.metrics.record_batch_started();
    debug!("indexer: batch {start} starting ({size} records)");

    let body = match encode_batch(&mut batch.records, &context.documents) {
        Ok(body) => body,
        Err(err) => {
            fail_batch(context, start, size, format!("encode failed: {err}")).await;
            return;
        }
    };

    let mut attempt = 1;
    loop {
        let failure = match context
            .sink
            .import_documents(&context.collection, body.clone())
            .await
        {
            Ok(response) if response.status == StatusCode::OK => {
                let added = count_document_successes(&response.body, start);
                context.metrics.record_documents(added);
                info!("indexer: batch {start} indexed {added}/{size} documents");

                if let Some(callback) = &context.callback {
                    callback
                        .notify(&BatchNotification {
                            collection: &context.collection,
                            batch_start: start,
                            batch_size: size,
                            added,
                        })
                        .await;
                }
                return;
            }
            Ok(response) => AttemptFailure::from_status(response.status, response.body),
            Err(err) => AttemptFailure::Transport(err.to_string()),
        };

        match context.retry.decide(attempt, &failure) {
            RetryDecision::RetryAfter(wait) => {
                warn!(
                    "indexer: batch {start} attempt {attempt}/{} failed ({failure}), \
                     retrying in {wait:?}",
                    context.retry.max_attempts
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            RetryDecision::GiveUp => {
                error!("indexer: batch {start} failed after {attempt} attempt(s): {failure}");
                fail_batch(context, start, size, failure.to_string()).await;
                return;
            }
        }
    }
}

async fn fail_batch<K>(context: &WorkerContext<K>, start: usize, size: usize, reason: String) {
    context.metrics.record_batch_failed();
    context
        .failure_log
        .record(&FailedBatchEntry::now(
            context.collection.as_str(),
            start,
            size,
            reason,
        ))
        .await;
}
