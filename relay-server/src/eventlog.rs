//! Append-only event logs.
//!
//! Every request, response and error the relay handles is appended to a
//! plaintext file under the log directory as a timestamped block:
//!
//! ```text
//!
//!
//! === 2024-01-01T00:00:00.000Z ===
//! {
//!   "pretty": "json"
//! }
//! ```
//!
//! Writes are fire-and-forget. Only the preparation step (rendering the block
//! and making sure the directory is usable) is reported back to the caller; a
//! failed append is visible on the diagnostic stream and nowhere else.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

/// One log file per event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFile {
    RegisterRequest,
    RegisterResponse,
    RegisterError,
    WebhookReceived,
    WebhookResponse,
    WebhookError,
    WebhookErrorResponse,
}

impl LogFile {
    /// File name inside the log directory.
    pub fn file_name(self) -> &'static str {
        match self {
            LogFile::RegisterRequest => "register_webhook_request.txt",
            LogFile::RegisterResponse => "register_webhook_response.txt",
            LogFile::RegisterError => "register_webhook_error.txt",
            LogFile::WebhookReceived => "webhook_received.txt",
            LogFile::WebhookResponse => "webhook_response.txt",
            LogFile::WebhookError => "webhook_error.txt",
            LogFile::WebhookErrorResponse => "webhook_error_response.txt",
        }
    }
}

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("failed to render log entry: {0}")]
    Render(#[from] serde_json::Error),

    #[error("log directory {} is unusable: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("log directory {} is read-only", .0.display())]
    ReadOnly(PathBuf),

    #[error("failed to append to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Destination for event log entries.
///
/// `append` returns once the entry has been handed off; it does not wait for
/// the entry to reach storage.
pub trait EventSink: Send + Sync {
    fn append(&self, file: LogFile, entry: &Value) -> Result<(), EventLogError>;
}

/// Current UTC time as ISO-8601 with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`.
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render a single log block with the current time.
pub fn render_entry(entry: &Value) -> Result<String, EventLogError> {
    let timestamp = iso_timestamp();
    let pretty = serde_json::to_string_pretty(entry)?;
    Ok(format!("\n\n=== {} ===\n{}", timestamp, pretty))
}

/// Event log backed by files in a directory.
///
/// The directory is checked until the first successful check; after that,
/// `append` does no filesystem work on the calling thread.
#[derive(Debug, Clone)]
pub struct FileEventLog {
    dir: PathBuf,
    ready: Arc<AtomicBool>,
}

impl FileEventLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the log directory if absent and check that it accepts writes.
    pub fn ensure_dir(&self) -> Result<(), EventLogError> {
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| self.directory_error(source))?;
        let metadata = std::fs::metadata(&self.dir).map_err(|source| self.directory_error(source))?;
        self.mark_ready(&metadata)
    }

    /// Async variant of [`FileEventLog::ensure_dir`].
    pub async fn prepare(&self) -> Result<(), EventLogError> {
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| self.directory_error(source))?;
        let metadata = tokio::fs::metadata(&self.dir)
            .await
            .map_err(|source| self.directory_error(source))?;
        self.mark_ready(&metadata)
    }

    fn directory_error(&self, source: io::Error) -> EventLogError {
        EventLogError::Directory {
            path: self.dir.clone(),
            source,
        }
    }

    fn mark_ready(&self, metadata: &Metadata) -> Result<(), EventLogError> {
        if metadata.permissions().readonly() {
            return Err(EventLogError::ReadOnly(self.dir.clone()));
        }

        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Append an entry and wait for the write to finish.
    pub async fn append_now(&self, file: LogFile, entry: &Value) -> Result<(), EventLogError> {
        let block = render_entry(entry)?;
        self.prepare().await?;
        write_block(self.dir.join(file.file_name()), block).await
    }
}

impl EventSink for FileEventLog {
    fn append(&self, file: LogFile, entry: &Value) -> Result<(), EventLogError> {
        let block = render_entry(entry)?;
        self.ensure_dir()?;

        let path = self.dir.join(file.file_name());
        tokio::spawn(async move {
            if let Err(e) = write_block(path, block).await {
                error!(error = %e, "event_log_write_failed");
            }
        });

        Ok(())
    }
}

async fn write_block(path: PathBuf, block: String) -> Result<(), EventLogError> {
    let result = async {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(block.as_bytes()).await?;
        file.flush().await
    }
    .await;

    match result {
        Ok(()) => {
            info!(path = %path.display(), bytes = block.len(), "event_log_saved");
            Ok(())
        }
        Err(source) => Err(EventLogError::Write { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_render_entry_format() {
        let block = render_entry(&json!({"shop_ids": ["S1"]})).unwrap();

        assert!(block.starts_with("\n\n=== "));
        let header_end = block.find(" ===\n").unwrap();
        let timestamp = &block[6..header_end];
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert!(timestamp.ends_with('Z'));
        assert!(block.ends_with("{\n  \"shop_ids\": [\n    \"S1\"\n  ]\n}"));
    }

    #[tokio::test]
    async fn test_append_now_creates_dir_and_appends() {
        let root = tempdir().unwrap();
        let log = FileEventLog::new(root.path().join("logs"));

        log.append_now(LogFile::WebhookReceived, &json!({"n": 1}))
            .await
            .unwrap();
        log.append_now(LogFile::WebhookReceived, &json!({"n": 2}))
            .await
            .unwrap();

        let contents =
            std::fs::read_to_string(root.path().join("logs/webhook_received.txt")).unwrap();
        assert_eq!(contents.matches("\n\n=== ").count(), 2);
        assert!(contents.find("\"n\": 1").unwrap() < contents.find("\"n\": 2").unwrap());
    }

    #[tokio::test]
    async fn test_append_is_written_in_background() {
        let root = tempdir().unwrap();
        let log = FileEventLog::new(root.path());

        log.append(LogFile::RegisterRequest, &json!({"franchise_ids": ["F1"]}))
            .unwrap();

        let path = root.path().join("register_webhook_request.txt");
        let mut contents = String::new();
        for _ in 0..50 {
            contents = std::fs::read_to_string(&path).unwrap_or_default();
            if !contents.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(contents.contains("\"F1\""));
    }

    #[tokio::test]
    async fn test_append_fails_when_dir_is_a_file() {
        let root = tempdir().unwrap();
        let blocker = root.path().join("logs");
        std::fs::write(&blocker, "not a directory").unwrap();

        let log = FileEventLog::new(&blocker);
        let err = log.append(LogFile::WebhookError, &json!({})).unwrap_err();
        assert!(matches!(err, EventLogError::Directory { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_append_fails_when_dir_is_read_only() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempdir().unwrap();
        let dir = root.path().join("logs");
        std::fs::create_dir(&dir).unwrap();
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o555)).unwrap();

        let log = FileEventLog::new(&dir);
        let sync_err = log.append(LogFile::WebhookReceived, &json!({})).unwrap_err();
        let async_err = log
            .append_now(LogFile::WebhookReceived, &json!({}))
            .await
            .unwrap_err();

        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(sync_err, EventLogError::ReadOnly(ref p) if *p == dir));
        assert!(matches!(async_err, EventLogError::ReadOnly(_)));
        assert!(sync_err.to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn test_failed_check_is_retried_until_dir_is_usable() {
        let root = tempdir().unwrap();
        let dir = root.path().join("logs");
        std::fs::write(&dir, "not a directory").unwrap();

        let log = FileEventLog::new(&dir);
        assert!(log.ensure_dir().is_err());

        std::fs::remove_file(&dir).unwrap();
        log.ensure_dir().unwrap();
        assert!(dir.is_dir());

        // Once checked, later appends skip the directory check.
        std::fs::remove_dir(&dir).unwrap();
        assert!(log.ensure_dir().is_ok());
        assert!(!dir.exists());
    }

    #[test]
    fn test_file_names_are_distinct() {
        let files = [
            LogFile::RegisterRequest,
            LogFile::RegisterResponse,
            LogFile::RegisterError,
            LogFile::WebhookReceived,
            LogFile::WebhookResponse,
            LogFile::WebhookError,
            LogFile::WebhookErrorResponse,
        ];
        let mut names: Vec<_> = files.iter().map(|f| f.file_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), files.len());
    }
}
