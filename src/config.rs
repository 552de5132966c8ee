//! Run configuration for a synchronization job.
//!
//! The CLI assembles a [`SyncConfig`]; the tunables that steer pagination and retries
//! carry defaults that can be overridden from the environment.

use crate::sync::retry::RetryPolicy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TYPESENSE_HOST: &str = "http://localhost:8108";
pub const DEFAULT_FAILED_BATCH_LOG: &str = "failed_typesense_batches.log";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("provide either a Postgres URI or both a Supabase project ref/URL and anon key")]
    MissingSource,
    #[error("callback headers must be in 'Key:Value' format, got '{0}'")]
    InvalidCallbackHeader(String),
    #[error("{name} must be at least {min}, got {value}")]
    OutOfRange {
        name: &'static str,
        min: usize,
        value: usize,
    },
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(default)
}

fn env_duration_millis(key: &str, default_millis: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(default_millis))
}

/// Feedback constants for the self-tuning page size.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationTuning {
    /// Page size never drops below this.
    pub min_page_size: usize,
    /// Consecutive successful pages required before growing.
    pub growth_after: usize,
    pub growth_factor: f64,
    /// Fixed sleep after a timeout before retrying the same offset.
    pub timeout_backoff: Duration,
    /// Timeouts tolerated at one offset without progress before giving up.
    pub max_consecutive_timeouts: usize,
}

impl PaginationTuning {
    pub fn from_env() -> Self {
        Self {
            min_page_size: env_usize("SYNC_MIN_PAGE_SIZE", 10).max(1),
            growth_after: env_usize("SYNC_PAGE_GROWTH_AFTER", 10).max(1),
            growth_factor: env_f64("SYNC_PAGE_GROWTH_FACTOR", 1.5).max(1.0),
            timeout_backoff: env_duration_millis("SYNC_TIMEOUT_BACKOFF_MS", 12_000),
            max_consecutive_timeouts: env_usize("SYNC_MAX_CONSECUTIVE_TIMEOUTS", 10).max(1),
        }
    }
}

impl Default for PaginationTuning {
    fn default() -> Self {
        Self {
            min_page_size: 10,
            growth_after: 10,
            growth_factor: 1.5,
            timeout_backoff: Duration::from_secs(12),
            max_consecutive_timeouts: 10,
        }
    }
}

/// Where rows are read from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSettings {
    Postgres {
        uri: String,
        max_connections: u32,
        statement_timeout: Option<Duration>,
    },
    Rest {
        base_url: String,
        api_key: String,
        request_timeout: Duration,
    },
}

impl SourceSettings {
    /// Pick a backend: a Postgres URI wins over REST credentials.
    pub fn resolve(
        pg_uri: Option<String>,
        statement_timeout: Option<Duration>,
        rest_url: Option<String>,
        rest_project_ref: Option<String>,
        rest_api_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(uri) = pg_uri.filter(|uri| !uri.trim().is_empty()) {
            return Ok(SourceSettings::Postgres {
                uri,
                max_connections: 4,
                statement_timeout,
            });
        }

        let base_url = rest_url.or_else(|| rest_project_ref.map(|r| supabase_url(&r)));
        match (base_url, rest_api_key) {
            (Some(base_url), Some(api_key)) => Ok(SourceSettings::Rest {
                base_url,
                api_key,
                request_timeout: Duration::from_secs(60),
            }),
            _ => Err(ConfigError::MissingSource),
        }
    }
}

pub fn supabase_url(project_ref: &str) -> String {
    format!("https://{}.supabase.co", project_ref.trim())
}

/// Connection settings for the Typesense sink.
#[derive(Debug, Clone, PartialEq)]
pub struct TypesenseConfig {
    pub host: String,
    pub api_key: String,
    /// Collection create/delete calls.
    pub admin_timeout: Duration,
    /// Bulk import calls.
    pub import_timeout: Duration,
}

impl TypesenseConfig {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            admin_timeout: Duration::from_secs(10),
            import_timeout: Duration::from_secs(60),
        }
    }
}

/// Optional per-batch notification target.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackConfig {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl CallbackConfig {
    /// Returns `None` for a blank URL.
    pub fn new(url: &str, raw_headers: &[String]) -> Result<Option<Self>, ConfigError> {
        if url.trim().is_empty() {
            return Ok(None);
        }

        let headers = raw_headers
            .iter()
            .map(|raw| parse_callback_header(raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Self {
            url: url.trim().to_string(),
            headers,
            timeout: Duration::from_secs(30),
        }))
    }
}

pub fn parse_callback_header(raw: &str) -> Result<(String, String), ConfigError> {
    match raw.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ConfigError::InvalidCallbackHeader(raw.to_string())),
    }
}

/// How extracted rows are shaped into import documents.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOptions {
    /// Source identifier column, never indexed as payload.
    pub key_field: String,
    /// Identifier-like columns coerced to integers (0 when unparseable).
    pub integer_fields: Vec<String>,
    /// Integer fields whose string values may carry `-` and space separators.
    pub separator_fields: Vec<String>,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            key_field: "id".to_string(),
            integer_fields: vec!["dexter_id".to_string(), "kvk_number".to_string()],
            separator_fields: vec!["kvk_number".to_string()],
        }
    }
}

/// Everything one synchronization run needs.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub table_name: String,
    pub collection_name: String,
    pub source: SourceSettings,
    pub typesense: TypesenseConfig,
    pub page_size: usize,
    pub global_limit: Option<usize>,
    pub sort_field: Option<String>,
    pub batch_size: usize,
    pub concurrency: usize,
    pub drop_collection: bool,
    pub failed_batch_log: Option<PathBuf>,
    pub fields_file: Option<PathBuf>,
    pub callback: Option<CallbackConfig>,
    pub pagination: PaginationTuning,
    pub retry: RetryPolicy,
    pub documents: DocumentOptions,
}

impl SyncConfig {
    pub fn new(
        table_name: impl Into<String>,
        collection_name: impl Into<String>,
        source: SourceSettings,
        typesense: TypesenseConfig,
    ) -> Self {
        let collection_name = collection_name.into();
        let fields_file = PathBuf::from(format!("{collection_name}_fields.txt"));
        Self {
            table_name: table_name.into(),
            collection_name,
            source,
            typesense,
            page_size: 2500,
            global_limit: None,
            sort_field: None,
            batch_size: 50,
            concurrency: 20,
            drop_collection: false,
            failed_batch_log: Some(PathBuf::from(DEFAULT_FAILED_BATCH_LOG)),
            fields_file: Some(fields_file),
            callback: None,
            pagination: PaginationTuning::default(),
            retry: RetryPolicy::default(),
            documents: DocumentOptions::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let min_page = self.pagination.min_page_size;
        if self.page_size < min_page {
            return Err(ConfigError::OutOfRange {
                name: "chunk size",
                min: min_page,
                value: self.page_size,
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::OutOfRange {
                name: "batch size",
                min: 1,
                value: 0,
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::OutOfRange {
                name: "concurrency",
                min: 1,
                value: 0,
            });
        }
        Ok(())
    }
}

/// Treat an empty path argument as "disabled".
pub fn optional_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}
