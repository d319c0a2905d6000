//! # Digest Functions
//!
//! Two digests, one interface:
//!
//! - **Fold** — Our default. A 32-bit polynomial fold (`acc * 31 + unit`)
//!   over the UTF-16 code units of the preimage, truncated to 32 bits at
//!   every step. It is the format every persisted snapshot was written
//!   with, so it has to be reproduced bit for bit.
//!
//! - **BLAKE3** — For deployments that need the chain to resist deliberate
//!   tampering rather than just flag accidental corruption. Its hashes do
//!   not match fold hashes, so a snapshot sealed with one digest fails
//!   validation under the other.
//!
//! ## On the fold
//!
//! The fold is not collision resistant. Appending a decimal nonce moves the
//! accumulator by a small, predictable amount, which is why difficulties
//! above one are rarely met within the attempt ceiling. Treat it as a
//! checksum with good manners, nothing more.
//!
//! ## Two renderings
//!
//! Post hashes render `|acc|` as zero-padded 8-digit lowercase hex. Message
//! fingerprints render the *signed* accumulator without padding, so a
//! negative fold shows up as `-415eb82b`. Both renderings are on disk; keep
//! them distinct.

use std::fmt;

/// Fold a preimage into a signed 32-bit accumulator.
///
/// Iterates UTF-16 code units, not bytes or chars, so astral-plane
/// characters contribute two surrogate units each.
pub fn fold_hash(preimage: &str) -> i32 {
    preimage.encode_utf16().fold(0i32, |acc, unit| {
        acc.wrapping_shl(5).wrapping_sub(acc).wrapping_add(i32::from(unit))
    })
}

/// Render a fold accumulator as a post hash: absolute value, lowercase hex,
/// left-padded with zeros to 8 characters.
///
/// The absolute value is taken in 64 bits so `i32::MIN` renders as
/// `80000000` instead of overflowing.
pub fn render_seal(acc: i32) -> String {
    format!("{:08x}", i64::from(acc).unsigned_abs())
}

/// Render a fold accumulator as a message fingerprint: signed lowercase hex,
/// no padding.
pub fn render_fingerprint(acc: i32) -> String {
    if acc < 0 {
        format!("-{:x}", i64::from(acc).unsigned_abs())
    } else {
        format!("{:x}", acc)
    }
}

/// Post hash of a preimage under the fold digest.
pub fn seal_digest(preimage: &str) -> String {
    render_seal(fold_hash(preimage))
}

/// Message fingerprint of a preimage under the fold digest.
pub fn message_fingerprint(preimage: &str) -> String {
    render_fingerprint(fold_hash(preimage))
}

/// Returns `true` if `hash` starts with `difficulty` `'0'` characters.
///
/// Difficulty zero always passes. A difficulty longer than the hash itself
/// can never pass.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let required = difficulty as usize;
    hash.len() >= required && hash.bytes().take(required).all(|b| b == b'0')
}

// ---------------------------------------------------------------------------
// HashFunction
// ---------------------------------------------------------------------------

/// A digest the ledger seals posts and fingerprints messages with.
///
/// Implementations must be deterministic and pure: the same preimage always
/// yields the same string, on every platform.
pub trait HashFunction: Send + Sync + fmt::Debug {
    /// Digest a post preimage. The output is compared against the
    /// difficulty target, so it should be lowercase hex.
    fn seal_digest(&self, preimage: &str) -> String;

    /// Digest a message preimage. Defaults to [`HashFunction::seal_digest`].
    fn fingerprint(&self, preimage: &str) -> String {
        self.seal_digest(preimage)
    }
}

/// The fold digest. Snapshot-compatible, tamper-evident only.
#[derive(Debug, Clone, Copy, Default)]
pub struct FoldHash;

impl HashFunction for FoldHash {
    fn seal_digest(&self, preimage: &str) -> String {
        seal_digest(preimage)
    }

    fn fingerprint(&self, preimage: &str) -> String {
        message_fingerprint(preimage)
    }
}

/// BLAKE3 over the UTF-8 preimage, rendered as 64 hex characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hash;

impl HashFunction for Blake3Hash {
    fn seal_digest(&self, preimage: &str) -> String {
        hex::encode(blake3::hash(preimage.as_bytes()).as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
