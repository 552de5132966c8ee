use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Errors that occur while talking to the Typesense server.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("typesense HTTP error: {0}")]
    Http(reqwest::Error),
    #[error("typesense request timed out after {0:?}")]
    Timeout(Duration),
    #[error("typesense returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid typesense host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SearchError {
    pub fn status(status: StatusCode, body: String) -> Self {
        SearchError::Status { status, body }
    }

    /// Map a reqwest failure, keeping timeouts distinguishable.
    pub fn transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            SearchError::Timeout(timeout)
        } else {
            SearchError::Http(err)
        }
    }
}
