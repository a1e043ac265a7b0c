//! The daemon state document and its persistence.
//!
//! State is always handled whole: read the full document, mutate it,
//! write the full document. There is no partial update and no file
//! locking, so concurrent writers against the same state file can lose
//! updates and tests must serialize access (or use the in-memory
//! store, which never touches disk).

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::invoice::Invoice;
use crate::{LnMockError, Result};

/// Default retention window for expired invoices, in seconds.
pub const DEFAULT_EXPIRED_BY: i64 = 86_400;

/// The whole persisted (or in-memory) document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonState {
    /// Seconds added to wall time to produce virtual time.
    pub time_offset: i64,
    /// Minimum virtual seconds between autoclean passes; 0 disables.
    pub autoclean_cycle_seconds: i64,
    /// Virtual timestamp of the last autoclean pass.
    pub autoclean_last_clean: Option<i64>,
    /// Seconds past expiry before a record becomes prunable.
    pub autoclean_expired_by: i64,
    /// High-watermark for pay_index assignment; never reused, even
    /// across deletions.
    #[serde(default)]
    pub last_pay_index: u64,
    /// All invoices in insertion order; labels are unique.
    pub invoices: Vec<Invoice>,
}

impl Default for DaemonState {
    fn default() -> Self {
        Self {
            time_offset: 0,
            autoclean_cycle_seconds: 0,
            autoclean_last_clean: None,
            autoclean_expired_by: DEFAULT_EXPIRED_BY,
            last_pay_index: 0,
            invoices: Vec::new(),
        }
    }
}

/// Whole-document state persistence.
///
/// Implemented by the host-facing stores; the node never touches
/// storage except through this seam.
pub trait StateStore: Send + Sync {
    /// Reads the full state, or the empty baseline if none exists yet.
    fn load(&self) -> Result<DaemonState>;

    /// Replaces the persisted state with `state`.
    fn persist(&self, state: &DaemonState) -> Result<()>;
}

/// File-backed store: one JSON document at an explicit path.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The well-known location under the system temp directory.
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join("lnmock-state.json")
    }

    /// The path this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileStateStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<DaemonState> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(DaemonState::default()),
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| LnMockError::Serialization(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DaemonState::default()),
            Err(e) => Err(LnMockError::Storage(e.to_string())),
        }
    }

    fn persist(&self, state: &DaemonState) -> Result<()> {
        // Pretty output with serde's stable field order keeps diffs
        // reproducible between runs.
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json).map_err(|e| LnMockError::Storage(e.to_string()))
    }
}

/// In-memory store: state lives for the life of the owning process and
/// is never serialized.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<DaemonState>,
}

impl MemoryStateStore {
    /// Store holding the empty baseline.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<DaemonState> {
        let guard = self
            .state
            .lock()
            .map_err(|_| LnMockError::Storage("state mutex poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn persist(&self, state: &DaemonState) -> Result<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| LnMockError::Storage("state mutex poisoned".to_string()))?;
        *guard = state.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::InvoiceStatus;

    fn sample_state() -> DaemonState {
        DaemonState {
            time_offset: 601,
            autoclean_cycle_seconds: 60,
            autoclean_last_clean: Some(100),
            autoclean_expired_by: 10,
            last_pay_index: 3,
            invoices: vec![Invoice {
                label: "a".to_string(),
                bolt11: "lnbc1stub".to_string(),
                payment_hash: "00".repeat(32),
                msatoshi: 10_000,
                status: InvoiceStatus::Unpaid,
                expires_at: 600,
                paid_at: None,
                msatoshi_received: None,
                pay_index: None,
            }],
        }
    }

    #[test]
    fn test_missing_file_loads_empty_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));
        let state = store.load().unwrap();
        assert_eq!(state.time_offset, 0);
        assert_eq!(state.autoclean_expired_by, DEFAULT_EXPIRED_BY);
        assert!(state.invoices.is_empty());
    }

    #[test]
    fn test_empty_file_loads_empty_baseline() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let store = FileStateStore::new(file.path());
        let state = store.load().unwrap();
        assert!(state.invoices.is_empty());
    }

    #[test]
    fn test_file_round_trip() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let store = FileStateStore::new(file.path());
        store.persist(&sample_state()).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.time_offset, 601);
        assert_eq!(loaded.last_pay_index, 3);
        assert_eq!(loaded.invoices.len(), 1);
        assert_eq!(loaded.invoices[0].label, "a");
    }

    #[test]
    fn test_corrupt_file_is_a_serialization_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{not json").unwrap();
        let store = FileStateStore::new(file.path());
        assert!(matches!(
            store.load(),
            Err(LnMockError::Serialization(_))
        ));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStateStore::new();
        assert!(store.load().unwrap().invoices.is_empty());
        store.persist(&sample_state()).unwrap();
        assert_eq!(store.load().unwrap().invoices.len(), 1);
    }
}
