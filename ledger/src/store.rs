//! Snapshot persistence seam.
//!
//! The ledger never picks a storage medium. Whoever embeds it implements
//! [`SnapshotStore`] over a file, a key-value database, browser storage, or
//! anything else that can hold one opaque string.

use parking_lot::Mutex;

use crate::error::StoreError;

/// Load-once, save-after-every-mutation persistence for a ledger snapshot.
pub trait SnapshotStore: Send + Sync {
    /// The last saved blob, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// Replace the stored blob.
    fn save(&self, blob: &str) -> Result<(), StoreError>;
}

/// An in-process store. Handy for tests and for embedding without
/// persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: Mutex<Option<String>>,
    saves: Mutex<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts out holding `blob`.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
            saves: Mutex::new(0),
        }
    }

    /// The currently stored blob.
    pub fn blob(&self) -> Option<String> {
        self.blob.lock().clone()
    }

    /// How many times `save` has been called.
    pub fn save_count(&self) -> u64 {
        *self.saves.lock()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.blob())
    }

    fn save(&self, blob: &str) -> Result<(), StoreError> {
        *self.blob.lock() = Some(blob.to_string());
        *self.saves.lock() += 1;
        Ok(())
    }
}
