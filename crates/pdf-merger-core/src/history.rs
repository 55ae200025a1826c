//! Merge history.
//!
//! An append-only log of merge events owned by the running service. The
//! default backend is a bounded in-memory ring buffer that starts empty and
//! is lost on restart; configuring `history.persist_path` swaps in a sled
//! table that survives restarts.

use std::collections::VecDeque;
use std::path::Path;

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::HistoryConfig;
use crate::error::{Error, Result};

/// One merge event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Local>,
    pub filename: String,
    pub files_count: usize,
    pub total_pages: usize,
}

impl HistoryEntry {
    /// Entry stamped with the current local time.
    pub fn now(filename: impl Into<String>, files_count: usize, total_pages: usize) -> Self {
        Self {
            timestamp: Local::now(),
            filename: filename.into(),
            files_count,
            total_pages,
        }
    }

    /// `YYYY-mm-dd HH:MM:SS`
    pub fn timestamp_label(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Storage backend for the history log.
pub trait HistoryStore: Send + Sync {
    fn append(&self, entry: HistoryEntry) -> Result<()>;

    /// All retained entries, newest first.
    fn newest_first(&self) -> Vec<HistoryEntry>;

    fn clear(&self) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded in-memory ring buffer.
pub struct MemoryHistory {
    entries: RwLock<VecDeque<HistoryEntry>>,
    capacity: usize,
}

impl MemoryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.entries.write();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
        Ok(())
    }

    fn newest_first(&self) -> Vec<HistoryEntry> {
        self.entries.read().iter().rev().cloned().collect()
    }

    fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// sled-backed table keyed by a monotonically increasing id.
pub struct SledHistory {
    db: sled::Db,
    capacity: usize,
}

impl SledHistory {
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::HistoryStore(format!(
                    "Failed to create history directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let db = sled::open(path).map_err(|e| {
            Error::HistoryStore(format!("Failed to open history at {}: {}", path.display(), e))
        })?;

        debug!("Opened history table at {}", path.display());

        Ok(Self {
            db,
            capacity: capacity.max(1),
        })
    }
}

impl HistoryStore for SledHistory {
    fn append(&self, entry: HistoryEntry) -> Result<()> {
        let id = self.db.generate_id()?;
        let value =
            serde_json::to_vec(&entry).map_err(|e| Error::HistoryStore(e.to_string()))?;
        self.db.insert(id.to_be_bytes(), value)?;

        while self.db.len() > self.capacity {
            if self.db.pop_min()?.is_none() {
                break;
            }
        }

        self.db.flush()?;
        Ok(())
    }

    fn newest_first(&self) -> Vec<HistoryEntry> {
        self.db
            .iter()
            .rev()
            .filter_map(|item| match item {
                Ok((_, value)) => serde_json::from_slice(&value)
                    .map_err(|e| warn!("Skipping unreadable history entry: {}", e))
                    .ok(),
                Err(e) => {
                    warn!("History read error: {}", e);
                    None
                }
            })
            .collect()
    }

    fn clear(&self) -> Result<()> {
        self.db.clear()?;
        self.db.flush()?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.db.len()
    }
}

/// The service-owned history log.
pub struct HistoryLog {
    store: Box<dyn HistoryStore>,
}

impl HistoryLog {
    /// Build from configuration: sled if `persist_path` is set, else memory.
    pub fn new(config: &HistoryConfig) -> Result<Self> {
        let store: Box<dyn HistoryStore> = match &config.persist_path {
            Some(path) => Box::new(SledHistory::open(path, config.capacity)?),
            None => Box::new(MemoryHistory::new(config.capacity)),
        };
        Ok(Self { store })
    }

    pub fn in_memory(capacity: usize) -> Self {
        Self {
            store: Box::new(MemoryHistory::new(capacity)),
        }
    }

    /// Record a merge. Failures are logged, never propagated: history is a
    /// side effect of a merge that already succeeded.
    pub fn record(&self, entry: HistoryEntry) {
        if let Err(e) = self.store.append(entry) {
            warn!("Failed to record merge history: {}", e);
        }
    }

    pub fn newest_first(&self) -> Vec<HistoryEntry> {
        self.store.newest_first()
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filenames(entries: &[HistoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.filename.as_str()).collect()
    }

    #[test]
    fn test_memory_newest_first() {
        let log = HistoryLog::in_memory(10);
        assert!(log.is_empty());

        log.record(HistoryEntry::now("one.pdf", 2, 5));
        log.record(HistoryEntry::now("two.pdf", 3, 7));

        let entries = log.newest_first();
        assert_eq!(filenames(&entries), ["two.pdf", "one.pdf"]);
        assert_eq!(entries[0].files_count, 3);
        assert_eq!(entries[0].total_pages, 7);
    }

    #[test]
    fn test_memory_capacity_drops_oldest() {
        let log = HistoryLog::in_memory(2);
        log.record(HistoryEntry::now("one.pdf", 1, 1));
        log.record(HistoryEntry::now("two.pdf", 1, 1));
        log.record(HistoryEntry::now("three.pdf", 1, 1));

        assert_eq!(filenames(&log.newest_first()), ["three.pdf", "two.pdf"]);
    }

    #[test]
    fn test_clear() {
        let log = HistoryLog::in_memory(10);
        log.record(HistoryEntry::now("one.pdf", 1, 1));
        log.clear().unwrap();
        assert!(log.is_empty());
        assert!(log.newest_first().is_empty());
    }

    #[test]
    fn test_sled_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = HistoryConfig {
            capacity: 2,
            persist_path: Some(dir.path().join("history")),
        };

        {
            let log = HistoryLog::new(&config).unwrap();
            log.record(HistoryEntry::now("one.pdf", 1, 1));
            log.record(HistoryEntry::now("two.pdf", 2, 4));
            log.record(HistoryEntry::now("three.pdf", 3, 9));
        }

        let log = HistoryLog::new(&config).unwrap();
        assert_eq!(filenames(&log.newest_first()), ["three.pdf", "two.pdf"]);

        log.clear().unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_timestamp_label_format() {
        let entry = HistoryEntry::now("x.pdf", 1, 1);
        let label = entry.timestamp_label();
        assert_eq!(label.len(), 19);
        assert_eq!(&label[4..5], "-");
        assert_eq!(&label[10..11], " ");
    }
}
