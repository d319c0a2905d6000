//! Error types for the ledger.
//!
//! Only structural failures are errors here. A chain that fails validation
//! is reported as a value by [`crate::Ledger::validate`], an exhausted
//! nonce search is a [`crate::SealStatus`], and blank input to a mutation is
//! a `None` return.

use thiserror::Error;

/// Failures encoding or decoding a ledger snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The blob is not JSON or is missing a required field.
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The blob parsed but describes an impossible ledger.
    #[error("invalid snapshot: {0}")]
    Invalid(String),
}

/// Failures reported by a persistence collaborator.
#[derive(Debug, Error)]
#[error("snapshot store error: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Top-level error for ledger operations that touch persistence.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
