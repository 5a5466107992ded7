use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Default key the session record is stored under
pub const DEFAULT_STORAGE_KEY: &str = "relatara_user";

/// Local key-value medium holding the serialized session record
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    /// Read the stored record, if any
    async fn read(&self) -> Result<Option<String>>;

    /// Store a record, replacing any previous one
    async fn write(&self, record: &str) -> Result<()>;

    /// Remove the stored record; succeeds when there is nothing to remove
    async fn clear(&self) -> Result<()>;
}

/// JSON key-value file, the on-disk counterpart of browser `localStorage`.
///
/// Only `key` is touched; other entries in the file are preserved.
pub struct FileSessionStore {
    path: PathBuf,
    key: String,
}

impl FileSessionStore {
    /// Create a store backed by the given file using the default key
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    /// Use a different key inside the file
    pub fn with_key(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn load_entries(&self) -> Result<Map<String, Value>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(anyhow!(
                    "Failed to read session file {}: {}",
                    self.path.display(),
                    e
                ))
            }
        };

        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(entries)) => Ok(entries),
            Ok(_) => Err(anyhow!(
                "Session file {} does not contain a JSON object",
                self.path.display()
            )),
            Err(e) => Err(anyhow!(
                "Session file {} is not valid JSON: {}",
                self.path.display(),
                e
            )),
        }
    }

    /// Like `load_entries`, but a corrupt file is replaced rather than fatal
    async fn load_entries_for_update(&self) -> Result<Map<String, Value>> {
        match self.load_entries().await {
            Ok(entries) => Ok(entries),
            Err(e) if self.path.exists() => {
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable session file");
                Ok(Map::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn save_entries(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow!("Failed to create directory {}: {}", parent.display(), e)
                })?;
            }
        }

        let contents = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.path.with_extension("tmp");

        tokio::fs::write(&tmp_path, contents)
            .await
            .map_err(|e| anyhow!("Failed to write {}: {}", tmp_path.display(), e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| anyhow!("Failed to replace {}: {}", self.path.display(), e))?;

        Ok(())
    }
}

#[async_trait]
impl SessionPersistence for FileSessionStore {
    async fn read(&self) -> Result<Option<String>> {
        let entries = self.load_entries().await?;

        let record = match entries.get(&self.key) {
            Some(Value::String(raw)) => Some(raw.clone()),
            Some(Value::Null) | None => None,
            // Hand structured values back as text and let the decoder judge them
            Some(other) => Some(other.to_string()),
        };

        debug!(path = %self.path.display(), key = %self.key, found = record.is_some(), "Read session record");
        Ok(record)
    }

    async fn write(&self, record: &str) -> Result<()> {
        let mut entries = self.load_entries_for_update().await?;
        entries.insert(self.key.clone(), Value::String(record.to_string()));
        self.save_entries(&entries).await?;

        info!(path = %self.path.display(), key = %self.key, "Session record stored");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.load_entries_for_update().await?;

        if entries.remove(&self.key).is_some() {
            self.save_entries(&entries).await?;
            info!(path = %self.path.display(), key = %self.key, "Session record removed");
        } else {
            debug!(path = %self.path.display(), key = %self.key, "No session record to remove");
        }

        Ok(())
    }
}

/// In-memory persistence with failure injection, for tests and demos
#[derive(Default)]
pub struct MemorySessionStore {
    record: RwLock<Option<String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_clears: AtomicBool,
    writes: AtomicUsize,
    clears: AtomicUsize,
    delay: Option<Duration>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a record already stored
    pub fn with_record(record: impl Into<String>) -> Self {
        Self {
            record: RwLock::new(Some(record.into())),
            ..Self::default()
        }
    }

    /// Sleep before every operation
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_clears(&self, fail: bool) {
        self.fail_clears.store(fail, Ordering::SeqCst);
    }

    /// Number of write attempts, successful or not
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    /// Current record, bypassing failure injection
    pub async fn snapshot(&self) -> Option<String> {
        self.record.read().await.clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SessionPersistence for MemorySessionStore {
    async fn read(&self) -> Result<Option<String>> {
        self.pause().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("Simulated read failure"));
        }
        Ok(self.record.read().await.clone())
    }

    async fn write(&self, record: &str) -> Result<()> {
        self.pause().await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("Simulated write failure: storage quota exceeded"));
        }
        *self.record.write().await = Some(record.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.pause().await;
        self.clears.fetch_add(1, Ordering::SeqCst);
        if self.fail_clears.load(Ordering::SeqCst) {
            return Err(anyhow!("Simulated clear failure"));
        }
        *self.record.write().await = None;
        Ok(())
    }
}
