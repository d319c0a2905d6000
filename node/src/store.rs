//! # Sled-backed Snapshot Store
//!
//! Keeps the ledger snapshot and the remembered username in a single sled
//! tree. The snapshot is one opaque UTF-8 blob under a fixed key; every save
//! is flushed before returning so a crash never loses an acknowledged write.

use std::path::Path;

use sled::{Db, Tree};

use postchain_ledger::config::{SNAPSHOT_KEY, USERNAME_KEY};
use postchain_ledger::{SnapshotStore, StoreError};

/// Name of the sled tree holding both keys.
const STATE_TREE: &str = "state";

/// Persistent key-value storage for one ledger.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    state: Tree,
}

impl SledStore {
    /// Open or create a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(storage)?;
        Self::from_db(db)
    }

    /// A store that lives only as long as the handle.
    #[cfg(test)]
    pub fn open_temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(storage)?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, StoreError> {
        let state = db.open_tree(STATE_TREE).map_err(storage)?;
        Ok(Self { db, state })
    }

    /// The identity remembered by `login`, if any.
    pub fn username(&self) -> Result<Option<String>, StoreError> {
        self.get_string(USERNAME_KEY)
    }

    pub fn set_username(&self, name: &str) -> Result<(), StoreError> {
        self.put_string(USERNAME_KEY, name)
    }

    pub fn clear_username(&self) -> Result<(), StoreError> {
        self.state.remove(USERNAME_KEY).map_err(storage)?;
        self.db.flush().map_err(storage)?;
        Ok(())
    }

    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.state.get(key).map_err(storage)? {
            Some(bytes) => {
                let text = String::from_utf8(bytes.to_vec())
                    .map_err(|e| StoreError::new(format!("value under {key:?} is not UTF-8: {e}")))?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    fn put_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.state.insert(key, value.as_bytes()).map_err(storage)?;
        self.db.flush().map_err(storage)?;
        Ok(())
    }
}

impl SnapshotStore for SledStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        self.get_string(SNAPSHOT_KEY)
    }

    fn save(&self, blob: &str) -> Result<(), StoreError> {
        self.put_string(SNAPSHOT_KEY, blob)
    }
}

fn storage(err: sled::Error) -> StoreError {
    StoreError::new(err.to_string())
}
