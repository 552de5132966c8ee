use crate::models::FailedBatchEntry;
use log::warn;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Append-only JSONL audit of batches that could not be indexed.
///
/// Each entry is written with a single append of one complete line. Write failures
/// are logged and swallowed.
#[derive(Debug, Clone)]
pub struct FailureLog {
    path: Option<PathBuf>,
}

impl FailureLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub async fn record(&self, entry: &FailedBatchEntry) {
        let Some(path) = &self.path else {
            return;
        };

        if let Err(err) = append_line(path, entry).await {
            warn!(
                "failure log: could not write entry for batch {} to {}: {err}",
                entry.batch_start,
                path.display()
            );
        }
    }
}

async fn append_line(path: &Path, entry: &FailedBatchEntry) -> std::io::Result<()> {
    let mut line = serde_json::to_string(entry)?;
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_are_appended_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed.log");
        let log = FailureLog::new(Some(path.clone()));

        log.record(&FailedBatchEntry::now("people", 0, 50, "request too large"))
            .await;
        log.record(&FailedBatchEntry::now("people", 50, 7, "status 500"))
            .await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<FailedBatchEntry> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].batch_start, 0);
        assert_eq!(entries[0].reason, "request too large");
        assert_eq!(entries[1].batch_size, 7);
        assert!(entries[1].timestamp.contains('T'));
    }

    #[tokio::test]
    async fn write_failures_are_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("failed.log");
        let log = FailureLog::new(Some(path.clone()));

        log.record(&FailedBatchEntry::now("people", 0, 1, "x")).await;
        assert!(!path.exists());

        FailureLog::disabled()
            .record(&FailedBatchEntry::now("people", 0, 1, "x"))
            .await;
    }
}
