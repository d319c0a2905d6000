//! # Proof-of-Work Miner
//!
//! The miner seals a single post: it links the post to a given parent hash,
//! then bumps the nonce and rehashes until the hash starts with
//! `difficulty` zero hex digits or the attempt ceiling is hit.
//!
//! ## Search Loop
//!
//! ```text
//! 1. LINK     — previous_hash := parent, recompute hash
//! 2. CHECK    — hash meets target? done (Sealed)
//! 3. CEILING  — attempts == max_attempts? done (Exhausted)
//! 4. STEP     — nonce += 1, recompute hash, attempts += 1
//! 5. REPORT   — every `progress_interval` attempts, call the progress hook
//! 6. goto 2
//! ```
//!
//! Step 1 recomputes the hash before the first check. A post whose
//! provisional hash already happened to meet the target would otherwise be
//! chained with a digest that no longer matches its fields.
//!
//! ## Exhaustion
//!
//! Hitting the ceiling is not an error. The post keeps whatever nonce and
//! hash it last computed and the caller still chains it; the outcome is
//! surfaced as [`SealStatus::Exhausted`] so nobody mistakes it for a sealed
//! post. Progress reporting is advisory and cannot change the outcome.

use crate::config::{DEFAULT_MAX_ATTEMPTS, PROGRESS_INTERVAL};
use crate::digest::HashFunction;
use crate::record::Post;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// How a single post's nonce search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealStatus {
    /// The hash meets the difficulty target.
    Sealed,
    /// The attempt ceiling was reached first.
    Exhausted,
}

/// Result of [`Miner::seal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealOutcome {
    /// Trial hashes computed, not counting the initial relink.
    pub attempts: u64,
    pub status: SealStatus,
}

impl SealOutcome {
    pub fn is_sealed(&self) -> bool {
        self.status == SealStatus::Sealed
    }
}

/// One post's entry in a [`SealReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPost {
    pub id: String,
    pub hash: String,
    pub nonce: u64,
    pub attempts: u64,
    pub status: SealStatus,
}

/// Summary of a sealing pass over the pending queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SealReport {
    /// Posts moved onto the chain, in chain order.
    pub sealed: Vec<SealedPost>,
    /// Posts still pending when the pass ended.
    pub remaining: usize,
    /// Whether the pass was abandoned between posts.
    pub cancelled: bool,
}

impl SealReport {
    /// Posts that were chained without meeting the target.
    pub fn exhausted(&self) -> impl Iterator<Item = &SealedPost> {
        self.sealed
            .iter()
            .filter(|p| p.status == SealStatus::Exhausted)
    }

    /// Total trial hashes across the pass.
    pub fn total_attempts(&self) -> u64 {
        self.sealed.iter().map(|p| p.attempts).sum()
    }
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Receives progress and completion events from a sealing pass.
///
/// Purely observational: implementations must not expect their calls to be
/// delivered for correctness, and nothing they do affects the ledger.
pub trait SealObserver: Send + Sync {
    /// Called every `progress_interval` attempts while mining the post at
    /// `batch_index` within the current pass.
    fn on_progress(&self, _batch_index: usize, _post_id: &str, _attempts: u64) {}

    /// Called once when a pass finishes, cancelled or not.
    fn on_batch_complete(&self, _report: &SealReport) {}
}

/// An observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SealObserver for NoopObserver {}

// ---------------------------------------------------------------------------
// Miner
// ---------------------------------------------------------------------------

/// Nonce search with a hard attempt ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Miner {
    max_attempts: u64,
    progress_interval: u64,
}

impl Default for Miner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, PROGRESS_INTERVAL)
    }
}

impl Miner {
    /// A `progress_interval` of zero disables progress reporting.
    pub fn new(max_attempts: u64, progress_interval: u64) -> Self {
        Self {
            max_attempts,
            progress_interval,
        }
    }

    /// Seal `post` against `previous_hash` at `difficulty`.
    ///
    /// The nonce search starts from the post's current nonce. `progress`
    /// receives the running attempt count every `progress_interval`
    /// attempts.
    pub fn seal(
        &self,
        post: &mut Post,
        difficulty: u32,
        previous_hash: &str,
        hasher: &dyn HashFunction,
        mut progress: Option<&mut dyn FnMut(u64)>,
    ) -> SealOutcome {
        post.previous_hash = previous_hash.to_string();
        post.refresh_hash(hasher);

        let mut attempts = 0u64;
        while !post.meets_difficulty(difficulty) && attempts < self.max_attempts {
            post.nonce = post.nonce.wrapping_add(1);
            post.refresh_hash(hasher);
            attempts += 1;

            if self.progress_interval > 0 && attempts % self.progress_interval == 0 {
                if let Some(report) = progress.as_mut() {
                    (*report)(attempts);
                }
            }
        }

        let status = if post.meets_difficulty(difficulty) {
            SealStatus::Sealed
        } else {
            SealStatus::Exhausted
        };

        SealOutcome { attempts, status }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
