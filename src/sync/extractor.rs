//! Sequential, self-tuning extraction of a whole table.
//!
//! The page size grows after a run of successful pages and retreats to the last
//! size that was known to work when the source reports a timeout, so it settles
//! near whatever the source tolerates without that limit being configured.

use crate::config::PaginationTuning;
use crate::models::CleanedRecord;
use crate::schema::strip_denylisted;
use crate::source::{RowSource, SourceError, TableName};
use log::{debug, info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("giving up at offset {offset} after {timeouts} consecutive timeouts")]
    TooManyTimeouts { offset: usize, timeouts: usize },
}

/// Page-size feedback state.
#[derive(Debug, Clone)]
pub struct PageSizeController {
    tuning: PaginationTuning,
    page_size: usize,
    last_good_size: usize,
    consecutive_successes: usize,
}

impl PageSizeController {
    pub fn new(initial_page_size: usize, tuning: PaginationTuning) -> Self {
        let page_size = initial_page_size.max(tuning.min_page_size);
        Self {
            tuning,
            page_size,
            last_good_size: page_size,
            consecutive_successes: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn last_good_size(&self) -> usize {
        self.last_good_size
    }

    /// Count a successful page. Returns the new size when this success triggered growth.
    pub fn record_success(&mut self) -> Option<usize> {
        self.consecutive_successes += 1;
        if self.consecutive_successes < self.tuning.growth_after {
            return None;
        }

        self.last_good_size = self.page_size;
        let grown = (self.page_size as f64 * self.tuning.growth_factor).round() as usize;
        self.page_size = grown.max(self.tuning.min_page_size);
        self.consecutive_successes = 0;
        Some(self.page_size)
    }

    /// Whether a timeout at the current size is recoverable.
    pub fn can_retreat(&self) -> bool {
        self.page_size > self.tuning.min_page_size
    }

    /// Retreat to the last known-good size and return it.
    pub fn record_timeout(&mut self) -> usize {
        self.page_size = self.last_good_size.max(self.tuning.min_page_size);
        self.consecutive_successes = 0;
        self.page_size
    }
}

/// Read every row of `table`, stripping denylisted columns from each one.
///
/// Stops at the first empty page or once `global_limit` rows are held. Timeouts
/// shrink the page and retry the same offset after a fixed pause; any other source
/// error aborts extraction.
pub async fn extract<S: RowSource>(
    source: &S,
    table: &str,
    initial_page_size: usize,
    global_limit: Option<usize>,
    tuning: &PaginationTuning,
) -> Result<Vec<CleanedRecord>, ExtractionError> {
    let table = TableName::parse(table)?;
    let mut controller = PageSizeController::new(initial_page_size, tuning.clone());
    let mut records: Vec<CleanedRecord> = Vec::new();
    let mut offset = 0usize;
    let mut consecutive_timeouts = 0usize;

    info!(
        "extract: reading '{table}' starting at page size {}",
        controller.page_size()
    );

    loop {
        if global_limit.is_some_and(|limit| records.len() >= limit) {
            break;
        }

        let page_size = controller.page_size();
        let rows = match source.fetch_page(&table, offset, page_size).await {
            Ok(rows) => rows,
            Err(err) if err.is_timeout() && controller.can_retreat() => {
                consecutive_timeouts += 1;
                if consecutive_timeouts > tuning.max_consecutive_timeouts {
                    return Err(ExtractionError::TooManyTimeouts {
                        offset,
                        timeouts: consecutive_timeouts,
                    });
                }

                let reduced = controller.record_timeout();
                warn!(
                    "extract: page at offset {offset} (size {page_size}) timed out: {err}; \
                     retrying at size {reduced} after {:?}",
                    tuning.timeout_backoff
                );
                tokio::time::sleep(tuning.timeout_backoff).await;
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        consecutive_timeouts = 0;

        if rows.is_empty() {
            break;
        }

        let fetched = rows.len();
        offset += fetched;
        records.extend(rows.into_iter().map(|mut row| {
            strip_denylisted(&mut row);
            row
        }));
        debug!("extract: fetched {fetched} rows, {} total", records.len());

        if let Some(limit) = global_limit {
            if records.len() >= limit {
                records.truncate(limit);
                break;
            }
        }

        if let Some(grown) = controller.record_success() {
            info!("extract: increasing page size to {grown}");
        }
    }

    info!("extract: finished '{table}' with {} rows", records.len());
    Ok(records)
}
