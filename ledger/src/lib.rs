// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Postchain — Ledger Core
//!
//! A single-writer, in-memory, append-only ledger holding two kinds of
//! records: public posts, which are sealed into a hash-chained sequence with
//! a small proof-of-work, and private direct messages, which sit in a flat
//! log and are never chained.
//!
//! The ledger does not pick a storage medium and does not know who its
//! users are. It takes a serialized snapshot in at startup and hands one
//! back after each mutation; the calling layer decides where that blob lives
//! and which identifier signs each post.
//!
//! ## Architecture
//!
//! - **digest** — The fold-and-truncate digest (and a BLAKE3 alternative).
//! - **record** — `Post` and `DirectMessage`.
//! - **miner** — Nonce search with an attempt ceiling and progress hooks.
//! - **ledger** — Chain, pending queue, message log, and all queries.
//! - **shared** — Locking boundary plus save-after-mutation lifecycle.
//! - **snapshot** — JSON codec for the persistence collaborator.
//! - **store** — The load/save seam the persistence collaborator implements.
//! - **clock** — Wall-clock seam so timestamps can be pinned in tests.
//! - **config** — Constants and tunables.
//!
//! ## A word on the digest
//!
//! The default digest is a 32-bit polynomial fold. It exists for format
//! compatibility with previously persisted snapshots and gives tamper
//! *evidence* against accidental corruption only. Anyone who can edit a
//! snapshot can forge a matching hash in microseconds. Use
//! [`digest::Blake3Hash`] when that matters.

pub mod clock;
pub mod config;
pub mod digest;
pub mod error;
pub mod ledger;
pub mod miner;
pub mod record;
pub mod shared;
pub mod snapshot;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LedgerConfig;
pub use digest::{Blake3Hash, FoldHash, HashFunction};
pub use error::{LedgerError, SnapshotError, StoreError};
pub use ledger::{CancelFlag, ChainStats, ChainViolation, Ledger};
pub use miner::{Miner, NoopObserver, SealObserver, SealOutcome, SealReport, SealStatus, SealedPost};
pub use record::{DirectMessage, Post};
pub use shared::SharedLedger;
pub use store::{MemoryStore, SnapshotStore};
