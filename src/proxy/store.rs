//! Whitelist persistence
//!
//! The storage abstraction owns durable encoding only; the in-memory
//! whitelist remains authoritative for the session when a read or write
//! fails.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::WhitelistSnapshot;

/// Load/save abstraction for whitelist snapshots
#[async_trait]
pub trait WhitelistStore: Send + Sync {
    /// Load the persisted snapshot. A missing or unreadable file degrades
    /// to an empty snapshot rather than an error.
    async fn load(&self) -> WhitelistSnapshot;

    /// Persist a snapshot.
    async fn save(&self, snapshot: &WhitelistSnapshot) -> Result<()>;
}

/// JSON file-backed store
///
/// Writes go through a temp file and rename so a crash mid-write never
/// truncates the previous snapshot.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl WhitelistStore for JsonFileStore {
    async fn load(&self) -> WhitelistSnapshot {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), "No whitelist file to load: {}", e);
                return WhitelistSnapshot::empty();
            }
        };

        match serde_json::from_str::<WhitelistSnapshot>(&raw) {
            Ok(snapshot) => {
                debug!(
                    path = %self.path.display(),
                    entries = snapshot.entries.len(),
                    "Loaded whitelist snapshot"
                );
                snapshot
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    "Corrupt whitelist file, starting empty: {}", e
                );
                WhitelistSnapshot::empty()
            }
        }
    }

    async fn save(&self, snapshot: &WhitelistSnapshot) -> Result<()> {
        let serialized = serde_json::to_string_pretty(snapshot)?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serialized.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(
            path = %self.path.display(),
            entries = snapshot.entries.len(),
            "Saved whitelist snapshot"
        );
        Ok(())
    }
}

/// In-memory store used by tests and as a null persistence backend
#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<WhitelistSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved_entries(&self) -> usize {
        self.snapshot
            .lock()
            .as_ref()
            .map(|s| s.entries.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl WhitelistStore for MemoryStore {
    async fn load(&self) -> WhitelistSnapshot {
        self.snapshot
            .lock()
            .clone()
            .unwrap_or_else(WhitelistSnapshot::empty)
    }

    async fn save(&self, snapshot: &WhitelistSnapshot) -> Result<()> {
        *self.snapshot.lock() = Some(snapshot.clone());
        Ok(())
    }
}

/// Write a plain-text proxy dump, one URL per line, for manual inspection
/// and reseeding.
pub async fn dump_proxy_list(path: impl AsRef<Path>, proxies: &[String]) -> Result<()> {
    let mut contents = proxies.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }
    tokio::fs::write(path.as_ref(), contents.as_bytes()).await?;
    Ok(())
}
