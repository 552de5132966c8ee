use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while reading rows from a source backend.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid table name '{0}'")]
    InvalidTable(String),
    #[error("source query timed out: {0}")]
    Timeout(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("source HTTP error: {0}")]
    Http(reqwest::Error),
    #[error("source service returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode source rows: {0}")]
    Decode(String),
}

impl SourceError {
    /// Timeouts are the one failure class the extractor recovers from.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SourceError::Timeout(_))
    }
}

pub(crate) fn mentions_statement_timeout(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("statement timeout")
        || lower.contains("read operation timed out")
        || lower.contains("57014")
}

impl From<sqlx::Error> for SourceError {
    fn from(err: sqlx::Error) -> Self {
        let timed_out = match &err {
            sqlx::Error::Database(db) => {
                db.code().as_deref() == Some("57014") || mentions_statement_timeout(db.message())
            }
            sqlx::Error::PoolTimedOut => true,
            sqlx::Error::Io(io) => io.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        };

        if timed_out {
            SourceError::Timeout(err.to_string())
        } else {
            SourceError::Database(err)
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else {
            SourceError::Http(err)
        }
    }
}
