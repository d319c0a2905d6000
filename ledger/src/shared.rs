//! # Shared Ledger
//!
//! The mutual-exclusion boundary around a [`Ledger`] plus the
//! load-once/save-after-mutation lifecycle the persistence collaborator
//! expects.
//!
//! ## Locking
//!
//! ```text
//! ledger     RwLock<Ledger>  — every mutation takes the write lock briefly
//! seal_lock  Mutex<()>       — at most one seal pass in flight
//! ```
//!
//! Mining is the only slow operation, and it runs with *no* ledger lock
//! held. A pass copies the front pending post out under a read lock, mines
//! the copy, then takes the write lock just long enough to swap it onto the
//! chain. Readers and post creators are never stuck behind a nonce search.
//! Because only the holder of `seal_lock` ever removes pending posts or
//! extends the chain, the front post and the tip cannot change underneath
//! the copy.
//!
//! A pass seals the posts that were pending when it started. Posts created
//! while it runs wait for the next pass.
//!
//! ## Persistence
//!
//! After each mutation the write guard is downgraded to a read guard and the
//! new state is saved, so saves land in mutation order without blocking
//! readers on I/O. If a save fails, the in-memory mutation stands and the
//! error is returned; [`SharedLedger::persist`] retries.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::digest::HashFunction;
use crate::error::LedgerResult;
use crate::ledger::{CancelFlag, ChainStats, Ledger};
use crate::miner::{SealObserver, SealReport};
use crate::record::{DirectMessage, Post};
use crate::snapshot;
use crate::store::SnapshotStore;

/// A thread-safe, self-persisting ledger handle. Cheap to clone.
#[derive(Clone)]
pub struct SharedLedger {
    ledger: Arc<RwLock<Ledger>>,
    seal_lock: Arc<Mutex<()>>,
    store: Arc<dyn SnapshotStore>,
}

impl fmt::Debug for SharedLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ledger = self.ledger.read();
        f.debug_struct("SharedLedger")
            .field("height", &ledger.height())
            .field("pending", &ledger.pending_len())
            .field("messages", &ledger.messages().len())
            .finish()
    }
}

impl SharedLedger {
    /// Load the stored snapshot once and wrap the result.
    ///
    /// A blob that fails to decode is replaced by a fresh ledger. A store
    /// that cannot be read at all is an error.
    pub fn open(
        store: Arc<dyn SnapshotStore>,
        config: LedgerConfig,
        hasher: Arc<dyn HashFunction>,
        clock: Arc<dyn Clock>,
    ) -> LedgerResult<Self> {
        let blob = store.load()?;
        let ledger = snapshot::restore_or_fresh(blob.as_deref(), config, hasher, clock);
        Ok(Self::from_ledger(ledger, store))
    }

    /// Wrap an existing ledger. Nothing is saved until the first mutation.
    pub fn from_ledger(ledger: Ledger, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            seal_lock: Arc::new(Mutex::new(())),
            store,
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// See [`Ledger::create_post`]. Saves on success.
    pub fn create_post(&self, content: &str, author: &str) -> LedgerResult<Option<Post>> {
        let mut ledger = self.ledger.write();
        let Some(post) = ledger.create_post(content, author) else {
            return Ok(None);
        };
        self.save(&RwLockWriteGuard::downgrade(ledger))?;
        Ok(Some(post))
    }

    /// See [`Ledger::send_message`]. Saves on success.
    pub fn send_message(
        &self,
        sender: &str,
        recipient: &str,
        content: &str,
    ) -> LedgerResult<Option<DirectMessage>> {
        let mut ledger = self.ledger.write();
        let Some(message) = ledger.send_message(sender, recipient, content) else {
            return Ok(None);
        };
        self.save(&RwLockWriteGuard::downgrade(ledger))?;
        Ok(Some(message))
    }

    pub fn set_difficulty(&self, difficulty: u32) -> LedgerResult<()> {
        let mut ledger = self.ledger.write();
        ledger.set_difficulty(difficulty);
        self.save(&RwLockWriteGuard::downgrade(ledger))
    }

    /// Seal the posts pending at call time at the ledger's own difficulty.
    ///
    /// Blocks while another pass is running. `cancel` is checked before
    /// each post; each sealed post is saved as soon as it is chained, so an
    /// abandoned pass keeps its progress. The observer hears about the end
    /// of the pass even when a save error cuts it short.
    pub fn seal_pending(
        &self,
        observer: &dyn SealObserver,
        cancel: &CancelFlag,
    ) -> LedgerResult<SealReport> {
        let _pass = self.seal_lock.lock();

        let (batch, difficulty) = {
            let ledger = self.ledger.read();
            (ledger.pending_len(), ledger.difficulty())
        };
        let mut report = SealReport::default();

        info!(pending = batch, difficulty, "starting shared seal pass");

        for batch_index in 0..batch {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let Some(mut job) = self.ledger.read().next_seal_job() else {
                break;
            };

            let outcome = job.run(batch_index, difficulty, observer);

            let mut ledger = self.ledger.write();
            report
                .sealed
                .push(ledger.commit_seal(job, outcome, difficulty));
            let ledger = RwLockWriteGuard::downgrade(ledger);
            if let Err(e) = self.save(&ledger) {
                report.remaining = ledger.pending_len();
                drop(ledger);
                warn!(
                    error = %e,
                    sealed = report.sealed.len(),
                    "save failed, abandoning seal pass"
                );
                observer.on_batch_complete(&report);
                return Err(e);
            }
        }

        report.remaining = self.ledger.read().pending_len();
        info!(
            sealed = report.sealed.len(),
            remaining = report.remaining,
            cancelled = report.cancelled,
            "shared seal pass finished"
        );
        observer.on_batch_complete(&report);
        Ok(report)
    }

    /// Save the current state. Useful after a failed save.
    pub fn persist(&self) -> LedgerResult<()> {
        self.save(&self.ledger.read())
    }

    fn save(&self, ledger: &Ledger) -> LedgerResult<()> {
        let blob = snapshot::encode(ledger)?;
        self.store.save(&blob)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// An owned copy of the current state for read consumers.
    pub fn view(&self) -> Ledger {
        self.ledger.read().clone()
    }

    /// Run `f` against the current state under a read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.ledger.read())
    }

    pub fn is_valid(&self) -> bool {
        self.read(Ledger::is_valid)
    }

    pub fn stats(&self) -> ChainStats {
        self.read(Ledger::stats)
    }

    pub fn tip(&self) -> Post {
        self.read(|ledger| ledger.tip().clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::digest::FoldHash;
    use crate::error::{LedgerError, StoreError};
    use crate::miner::NoopObserver;
    use crate::store::MemoryStore;

    const T0: u64 = 1_700_000_000_000;

    fn open(store: Arc<MemoryStore>) -> SharedLedger {
        SharedLedger::open(
            store,
            LedgerConfig::default(),
            Arc::new(FoldHash),
            Arc::new(ManualClock::new(T0)),
        )
        .expect("open")
    }

    #[test]
    fn opens_fresh_from_empty_store() {
        let store = Arc::new(MemoryStore::new());
        let shared = open(Arc::clone(&store));
        assert_eq!(shared.stats().blocks, 1);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn malformed_blob_falls_back_to_fresh() {
        let store = Arc::new(MemoryStore::with_blob("{\"chain\": 42}"));
        let shared = open(store);
        assert_eq!(shared.stats().blocks, 1);
        assert!(shared.is_valid());
    }

    #[test]
    fn saves_after_each_successful_mutation() {
        let store = Arc::new(MemoryStore::new());
        let shared = open(Arc::clone(&store));

        shared.create_post("hello", "alice").unwrap().unwrap();
        assert_eq!(store.save_count(), 1);

        assert!(shared.create_post("", "alice").unwrap().is_none());
        assert_eq!(store.save_count(), 1, "declined input saves nothing");

        shared.send_message("alice", "bob", "hi").unwrap().unwrap();
        assert_eq!(store.save_count(), 2);

        let reopened = open(Arc::clone(&store));
        assert_eq!(reopened.read(|l| l.pending_len()), 1);
        assert_eq!(reopened.read(|l| l.messages().len()), 1);
    }

    #[test]
    fn seal_pass_persists_each_post() {
        let store = Arc::new(MemoryStore::new());
        let shared = open(Arc::clone(&store));
        shared.create_post("a", "alice").unwrap();
        shared.create_post("b", "alice").unwrap();
        let before = store.save_count();

        let report = shared.seal_pending(&NoopObserver, &CancelFlag::new()).unwrap();

        assert_eq!(report.sealed.len(), 2);
        assert_eq!(store.save_count(), before + 2);
        let reopened = open(store);
        assert_eq!(reopened.stats().blocks, 3);
        assert_eq!(reopened.stats().pending, 0);
        assert!(reopened.is_valid());
    }

    #[test]
    fn mining_runs_without_holding_the_ledger_lock() {
        struct Meddler {
            shared: SharedLedger,
            reads: Mutex<u32>,
        }
        impl SealObserver for Meddler {
            fn on_progress(&self, _: usize, _: &str, _: u64) {
                // Would deadlock if the pass held the write lock.
                let _ = self.shared.stats();
                let mut reads = self.reads.lock();
                if *reads == 0 {
                    self.shared.create_post("mid-pass", "carol").unwrap();
                }
                *reads += 1;
            }
        }

        let shared = open(Arc::new(MemoryStore::new()));
        shared.set_difficulty(8).unwrap();
        shared.create_post("unreachable target", "alice").unwrap();

        let meddler = Meddler {
            shared: shared.clone(),
            reads: Mutex::new(0),
        };
        let report = shared.seal_pending(&meddler, &CancelFlag::new()).unwrap();

        assert_eq!(report.sealed.len(), 1);
        assert_eq!(report.exhausted().count(), 1);
        assert!(*meddler.reads.lock() > 0);
        // Created mid-pass, so it waits for the next one.
        assert_eq!(report.remaining, 1);
        let pending = shared.read(|l| l.pending()[0].clone());
        assert_eq!(pending.content, "mid-pass");
        assert_eq!(pending.id, "2");
    }

    #[test]
    fn concurrent_posts_get_unique_ids() {
        let shared = open(Arc::new(MemoryStore::new()));
        std::thread::scope(|s| {
            for t in 0..4 {
                let shared = shared.clone();
                s.spawn(move || {
                    for i in 0..10 {
                        shared
                            .create_post(&format!("{t}-{i}"), &format!("user{t}"))
                            .unwrap();
                    }
                });
            }
        });

        let ids: std::collections::BTreeSet<String> =
            shared.read(|l| l.pending().iter().map(|p| p.id.clone()).collect());
        assert_eq!(ids.len(), 40);
    }

    #[test]
    fn store_failures_propagate() {
        struct BrokenStore;
        impl SnapshotStore for BrokenStore {
            fn load(&self) -> Result<Option<String>, StoreError> {
                Ok(None)
            }
            fn save(&self, _: &str) -> Result<(), StoreError> {
                Err(StoreError::new("read-only medium"))
            }
        }

        let shared = SharedLedger::open(
            Arc::new(BrokenStore),
            LedgerConfig::default(),
            Arc::new(FoldHash),
            Arc::new(ManualClock::new(T0)),
        )
        .unwrap();

        let err = shared.create_post("hello", "alice").unwrap_err();
        assert!(matches!(err, LedgerError::Store(_)));
        // The mutation itself stands.
        assert_eq!(shared.stats().pending, 1);
    }

    #[test]
    fn unreadable_store_fails_open() {
        struct Unreadable;
        impl SnapshotStore for Unreadable {
            fn load(&self) -> Result<Option<String>, StoreError> {
                Err(StoreError::new("permission denied"))
            }
            fn save(&self, _: &str) -> Result<(), StoreError> {
                Ok(())
            }
        }

        let result = SharedLedger::open(
            Arc::new(Unreadable),
            LedgerConfig::default(),
            Arc::new(FoldHash),
            Arc::new(ManualClock::new(T0)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn failed_save_still_completes_the_pass_and_persist_recovers() {
        #[derive(Default)]
        struct FlakyStore {
            failing: std::sync::atomic::AtomicBool,
            blob: Mutex<Option<String>>,
        }
        impl SnapshotStore for FlakyStore {
            fn load(&self) -> Result<Option<String>, StoreError> {
                Ok(self.blob.lock().clone())
            }
            fn save(&self, blob: &str) -> Result<(), StoreError> {
                if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
                    return Err(StoreError::new("disk full"));
                }
                *self.blob.lock() = Some(blob.to_string());
                Ok(())
            }
        }

        #[derive(Default)]
        struct Completions(Mutex<Vec<SealReport>>);
        impl SealObserver for Completions {
            fn on_batch_complete(&self, report: &SealReport) {
                self.0.lock().push(report.clone());
            }
        }

        let store = Arc::new(FlakyStore::default());
        let shared = SharedLedger::open(
            Arc::clone(&store) as Arc<dyn SnapshotStore>,
            LedgerConfig::default(),
            Arc::new(FoldHash),
            Arc::new(ManualClock::new(T0)),
        )
        .unwrap();
        shared.create_post("first", "alice").unwrap();
        shared.create_post("second", "alice").unwrap();

        store
            .failing
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let completions = Completions::default();
        let err = shared
            .seal_pending(&completions, &CancelFlag::new())
            .unwrap_err();

        assert!(matches!(err, LedgerError::Store(_)));
        let seen = completions.0.lock().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].sealed.len(), 1);
        assert_eq!(seen[0].remaining, 1);
        assert_eq!(shared.stats().blocks, 2);

        store
            .failing
            .store(false, std::sync::atomic::Ordering::SeqCst);
        shared.persist().unwrap();

        let reopened = open_from(Arc::clone(&store) as Arc<dyn SnapshotStore>);
        assert_eq!(reopened.tip(), shared.tip());
        assert_eq!(reopened.stats().pending, 1);
    }

    fn open_from(store: Arc<dyn SnapshotStore>) -> SharedLedger {
        SharedLedger::open(
            store,
            LedgerConfig::default(),
            Arc::new(FoldHash),
            Arc::new(ManualClock::new(T0)),
        )
        .expect("open")
    }
}
