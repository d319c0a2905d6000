//! # Ledger
//!
//! The ledger owns three sequences and one number:
//!
//! ```text
//! chain     — sealed posts, genesis first, append-only
//! pending   — unsealed posts, FIFO, drained by a seal pass
//! messages  — direct messages, append-only, never chained
//! difficulty
//! ```
//!
//! ## Post Lifecycle
//!
//! ```text
//! create_post ──► pending ──seal pass──► chain
//!                  (provisional            (previous_hash relinked to the
//!                   previous_hash)          tip at seal time, then mined)
//! ```
//!
//! A seal pass takes posts from the front of the queue one at a time, links
//! each to the *current* tip, mines it, and appends it. The tip therefore
//! advances inside the pass and consecutive pending posts chain to each
//! other, not all to the pre-pass tip. Posts whose search hits the attempt
//! ceiling are still chained; the [`SealReport`] says which ones.
//!
//! ## Validation
//!
//! [`Ledger::validate`] walks the chain and recomputes every non-genesis
//! hash. It never rejects anything up front: a snapshot with doctored
//! content restores fine and only shows up here. What to do about an
//! invalid chain is the caller's call.
//!
//! ## Input Policy
//!
//! Blank content, blank identifiers, and messages addressed to oneself are
//! declined with `None` and leave the ledger untouched.

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::digest::{FoldHash, HashFunction};
use crate::miner::{Miner, SealObserver, SealOutcome, SealReport, SealStatus, SealedPost};
use crate::record::{DirectMessage, Post};

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared flag that asks a seal pass to stop before its next post.
///
/// The post being mined when the flag trips still finishes; cancellation
/// only takes effect between posts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// The first integrity violation found in a chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainViolation {
    /// A post's stored hash does not match its fields.
    #[error("post {id} at index {index} hash mismatch: stored={stored}, computed={computed}")]
    HashMismatch {
        index: usize,
        id: String,
        stored: String,
        computed: String,
    },

    /// A post does not point at its predecessor.
    #[error("post {id} at index {index} broken link: previous_hash={found}, predecessor hash={expected}")]
    BrokenLink {
        index: usize,
        id: String,
        expected: String,
        found: String,
    },
}

/// Point-in-time summary of a ledger, for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStats {
    /// Chain length including genesis.
    pub blocks: usize,
    pub pending: usize,
    pub messages: usize,
    pub difficulty: u32,
    pub valid: bool,
    /// Capture time of the tip post.
    pub tip_timestamp: u64,
    /// Chained posts (excluding genesis) whose hash misses the current
    /// difficulty target.
    pub below_target: usize,
}

// ---------------------------------------------------------------------------
// SealJob
// ---------------------------------------------------------------------------

/// A copy of the front pending post plus everything needed to mine it
/// without touching the ledger.
#[derive(Debug, Clone)]
pub(crate) struct SealJob {
    pub(crate) post: Post,
    previous_hash: String,
    miner: Miner,
    hasher: Arc<dyn HashFunction>,
}

impl SealJob {
    pub(crate) fn run(
        &mut self,
        batch_index: usize,
        difficulty: u32,
        observer: &dyn SealObserver,
    ) -> SealOutcome {
        let id = self.post.id.clone();
        let mut hook = |attempts: u64| observer.on_progress(batch_index, &id, attempts);
        self.miner.seal(
            &mut self.post,
            difficulty,
            &self.previous_hash,
            self.hasher.as_ref(),
            Some(&mut hook),
        )
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The post chain, the pending queue, and the message log.
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Post>,
    pending: VecDeque<Post>,
    messages: Vec<DirectMessage>,
    difficulty: u32,
    miner: Miner,
    hasher: Arc<dyn HashFunction>,
    clock: Arc<dyn Clock>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl Ledger {
    /// A fresh genesis-only ledger using the fold digest and the system
    /// clock.
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_parts(config, Arc::new(FoldHash), Arc::new(SystemClock))
    }

    /// A fresh genesis-only ledger with an explicit digest and clock.
    pub fn with_parts(
        config: LedgerConfig,
        hasher: Arc<dyn HashFunction>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let genesis = Post::genesis(clock.now_millis(), hasher.as_ref());
        Self::from_parts(
            vec![genesis],
            VecDeque::new(),
            Vec::new(),
            config.difficulty,
            config,
            hasher,
            clock,
        )
    }

    /// Assemble a ledger from restored state. The chain must not be empty.
    pub(crate) fn from_parts(
        chain: Vec<Post>,
        pending: VecDeque<Post>,
        messages: Vec<DirectMessage>,
        difficulty: u32,
        config: LedgerConfig,
        hasher: Arc<dyn HashFunction>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        debug_assert!(!chain.is_empty(), "chain always holds genesis");
        Self {
            chain,
            pending,
            messages,
            difficulty,
            miner: Miner::new(config.max_attempts, config.progress_interval),
            hasher,
            clock,
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Enqueue a new post for the next seal pass.
    ///
    /// The id is `chain length + pending length` and the provisional
    /// `previous_hash` is the current tip's hash; sealing relinks it.
    /// Returns a copy of the queued post, or `None` if `content` or
    /// `author` is blank.
    pub fn create_post(&mut self, content: &str, author: &str) -> Option<Post> {
        if is_blank(content) || is_blank(author) {
            debug!(author, "declining post with blank content or author");
            return None;
        }

        let id = (self.chain.len() + self.pending.len()).to_string();
        let post = Post::new(
            id,
            self.clock.now_millis(),
            content,
            author,
            self.tip().hash.clone(),
            self.hasher.as_ref(),
        );

        info!(id = %post.id, author, pending = self.pending.len() + 1, "post enqueued");
        self.pending.push_back(post.clone());
        Some(post)
    }

    /// Seal every pending post at `difficulty` and move it onto the chain.
    pub fn seal_pending(&mut self, difficulty: u32, observer: &dyn SealObserver) -> SealReport {
        self.seal_pending_until(difficulty, observer, &CancelFlag::new())
    }

    /// Like [`Ledger::seal_pending`], but checks `cancel` before each post.
    ///
    /// On cancellation, posts already chained stay chained and the rest
    /// stay pending for a later pass.
    pub fn seal_pending_until(
        &mut self,
        difficulty: u32,
        observer: &dyn SealObserver,
        cancel: &CancelFlag,
    ) -> SealReport {
        let batch = self.pending.len();
        let mut report = SealReport::default();

        info!(pending = batch, difficulty, "starting seal pass");

        for batch_index in 0..batch {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let Some(mut job) = self.next_seal_job() else {
                break;
            };
            let outcome = job.run(batch_index, difficulty, observer);
            report.sealed.push(self.commit_seal(job, outcome, difficulty));
        }

        report.remaining = self.pending.len();
        info!(
            sealed = report.sealed.len(),
            remaining = report.remaining,
            cancelled = report.cancelled,
            attempts = report.total_attempts(),
            "seal pass finished"
        );
        observer.on_batch_complete(&report);
        report
    }

    /// Copy the front pending post into a job linked to the current tip.
    pub(crate) fn next_seal_job(&self) -> Option<SealJob> {
        let post = self.pending.front()?.clone();
        Some(SealJob {
            post,
            previous_hash: self.tip().hash.clone(),
            miner: self.miner,
            hasher: Arc::clone(&self.hasher),
        })
    }

    /// Replace the front pending post with its mined copy at the chain tip.
    pub(crate) fn commit_seal(
        &mut self,
        job: SealJob,
        outcome: SealOutcome,
        difficulty: u32,
    ) -> SealedPost {
        let queued = self.pending.pop_front();
        debug_assert_eq!(
            queued.as_ref().map(|p| p.id.as_str()),
            Some(job.post.id.as_str()),
            "seal job must commit the post it was taken from"
        );

        let post = job.post;
        match outcome.status {
            SealStatus::Sealed => debug!(
                id = %post.id,
                hash = %post.hash,
                nonce = post.nonce,
                attempts = outcome.attempts,
                "post sealed"
            ),
            SealStatus::Exhausted => warn!(
                id = %post.id,
                hash = %post.hash,
                attempts = outcome.attempts,
                difficulty,
                "attempt ceiling reached, chaining post below difficulty target"
            ),
        }

        let sealed = SealedPost {
            id: post.id.clone(),
            hash: post.hash.clone(),
            nonce: post.nonce,
            attempts: outcome.attempts,
            status: outcome.status,
        };
        self.chain.push(post);
        sealed
    }

    /// Append a direct message to the log.
    ///
    /// Returns a copy of the logged message, or `None` if any argument is
    /// blank or the message is addressed to its sender.
    pub fn send_message(
        &mut self,
        sender: &str,
        recipient: &str,
        content: &str,
    ) -> Option<DirectMessage> {
        if is_blank(sender) || is_blank(recipient) || is_blank(content) || sender == recipient {
            debug!(sender, recipient, "declining message");
            return None;
        }

        let message = DirectMessage::new(
            self.messages.len().to_string(),
            sender,
            recipient,
            content,
            self.clock.now_millis(),
            self.hasher.as_ref(),
        );

        info!(id = %message.id, sender, recipient, "message logged");
        self.messages.push(message.clone());
        Some(message)
    }

    pub fn set_difficulty(&mut self, difficulty: u32) {
        self.difficulty = difficulty;
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The most recently chained post. Genesis guarantees there is one.
    pub fn tip(&self) -> &Post {
        // from_parts and every constructor keep genesis in place.
        &self.chain[self.chain.len() - 1]
    }

    /// Returns `true` if every non-genesis post hashes correctly and links
    /// to its predecessor.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Like [`Ledger::is_valid`], but says what is wrong.
    pub fn validate(&self) -> Result<(), ChainViolation> {
        for (index, pair) in self.chain.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let index = index + 1;

            let computed = current.compute_hash(self.hasher.as_ref());
            if current.hash != computed {
                let violation = ChainViolation::HashMismatch {
                    index,
                    id: current.id.clone(),
                    stored: current.hash.clone(),
                    computed,
                };
                debug!(%violation, "chain validation failed");
                return Err(violation);
            }

            if current.previous_hash != previous.hash {
                let violation = ChainViolation::BrokenLink {
                    index,
                    id: current.id.clone(),
                    expected: previous.hash.clone(),
                    found: current.previous_hash.clone(),
                };
                debug!(%violation, "chain validation failed");
                return Err(violation);
            }
        }
        Ok(())
    }

    /// Every chained post except genesis, oldest first.
    pub fn all_posts(&self) -> Vec<Post> {
        self.chain.iter().skip(1).cloned().collect()
    }

    /// Chained posts by `author`, oldest first. Genesis is never included,
    /// whatever its author string.
    pub fn posts_by_author(&self, author: &str) -> Vec<Post> {
        self.chain
            .iter()
            .skip(1)
            .filter(|post| post.author == author)
            .cloned()
            .collect()
    }

    /// Messages sent or received by `user`, in log order.
    pub fn messages_for(&self, user: &str) -> Vec<DirectMessage> {
        self.messages
            .iter()
            .filter(|msg| msg.involves(user))
            .cloned()
            .collect()
    }

    /// Messages between `a` and `b` in either direction, oldest first.
    /// Equal timestamps keep log order.
    pub fn conversation(&self, a: &str, b: &str) -> Vec<DirectMessage> {
        let mut messages: Vec<DirectMessage> = self
            .messages
            .iter()
            .filter(|msg| msg.is_between(a, b))
            .cloned()
            .collect();
        messages.sort_by_key(|msg| msg.timestamp);
        messages
    }

    /// Everyone `user` has exchanged at least one message with.
    pub fn correspondents(&self, user: &str) -> BTreeSet<String> {
        self.messages
            .iter()
            .filter_map(|msg| msg.counterpart(user))
            .filter(|other| *other != user)
            .map(str::to_string)
            .collect()
    }

    pub fn stats(&self) -> ChainStats {
        ChainStats {
            blocks: self.chain.len(),
            pending: self.pending.len(),
            messages: self.messages.len(),
            difficulty: self.difficulty,
            valid: self.is_valid(),
            tip_timestamp: self.tip().created_at,
            below_target: self
                .chain
                .iter()
                .skip(1)
                .filter(|post| !post.meets_difficulty(self.difficulty))
                .count(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The whole chain, genesis first.
    pub fn chain(&self) -> &[Post] {
        &self.chain
    }

    /// Posts awaiting the next seal pass, oldest first.
    pub fn pending(&self) -> &VecDeque<Post> {
        &self.pending
    }

    /// The message log in insertion order.
    pub fn messages(&self) -> &[DirectMessage] {
        &self.messages
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Chain length including genesis.
    pub fn height(&self) -> usize {
        self.chain.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
