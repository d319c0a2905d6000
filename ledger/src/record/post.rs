//! # Post Structure
//!
//! A post is one block of the chain: caller content plus the linkage and
//! proof-of-work fields that seal it in place.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Post                                        │
//! │  ├── id: String          (sequence number)   │
//! │  ├── created_at: u64     (ms since epoch)    │
//! │  ├── content: String     (opaque payload)    │
//! │  ├── author: String                          │
//! │  ├── previous_hash: String                   │
//! │  ├── hash: String        (digest of the rest)│
//! │  └── nonce: u64          (miner-owned)       │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Hash Computation
//!
//! The preimage is the plain concatenation `id || created_at || content ||
//! author || previous_hash || nonce`, integers in decimal. There are no
//! separators, so `("1", "23")` and `("12", "3")` collide. That is inherited
//! from the persisted format and is one more reason the digest only offers
//! tamper evidence.

use serde::{Deserialize, Serialize};

use crate::config::{GENESIS_AUTHOR, GENESIS_CONTENT, GENESIS_ID, GENESIS_PREVIOUS_HASH};
use crate::digest::{self, HashFunction};

/// A public post, sealed or awaiting sealing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Sequence id assigned at creation (chain length + pending length).
    pub id: String,
    /// Capture time in milliseconds since the Unix epoch. Stored as
    /// `timestamp` on disk.
    #[serde(rename = "timestamp")]
    pub created_at: u64,
    /// Caller payload. Never interpreted by the ledger.
    pub content: String,
    /// Caller-supplied author identifier.
    pub author: String,
    /// Hash of the preceding post in chain order. `"0"` for genesis.
    pub previous_hash: String,
    /// Digest over every other field.
    pub hash: String,
    /// Proof-of-work counter. Only the miner touches it.
    pub nonce: u64,
}

impl Post {
    /// Construct an unsealed post with nonce 0 and a freshly computed hash.
    pub fn new(
        id: impl Into<String>,
        created_at: u64,
        content: impl Into<String>,
        author: impl Into<String>,
        previous_hash: impl Into<String>,
        hasher: &dyn HashFunction,
    ) -> Self {
        let mut post = Post {
            id: id.into(),
            created_at,
            content: content.into(),
            author: author.into(),
            previous_hash: previous_hash.into(),
            hash: String::new(),
            nonce: 0,
        };
        post.refresh_hash(hasher);
        post
    }

    /// Construct the genesis post. It is never mined.
    pub fn genesis(created_at: u64, hasher: &dyn HashFunction) -> Self {
        Post::new(
            GENESIS_ID,
            created_at,
            GENESIS_CONTENT,
            GENESIS_AUTHOR,
            GENESIS_PREVIOUS_HASH,
            hasher,
        )
    }

    /// The string the digest runs over.
    pub fn preimage(&self) -> String {
        format!(
            "{}{}{}{}{}{}",
            self.id, self.created_at, self.content, self.author, self.previous_hash, self.nonce
        )
    }

    /// Recompute the digest from the current fields without storing it.
    ///
    /// Use this to check that `hash` still matches the content.
    pub fn compute_hash(&self, hasher: &dyn HashFunction) -> String {
        hasher.seal_digest(&self.preimage())
    }

    /// Recompute and store the digest.
    pub fn refresh_hash(&mut self, hasher: &dyn HashFunction) {
        self.hash = self.compute_hash(hasher);
    }

    /// Returns `true` if the stored hash meets a difficulty target.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        digest::meets_difficulty(&self.hash, difficulty)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::FoldHash;

    #[test]
    fn genesis_post_properties() {
        let genesis = Post::genesis(1_700_000_000_000, &FoldHash);
        assert_eq!(genesis.id, "0");
        assert_eq!(genesis.author, "System");
        assert_eq!(genesis.content, "Genesis Block");
        assert_eq!(genesis.previous_hash, "0");
        assert_eq!(genesis.nonce, 0);
        assert_eq!(genesis.hash, "22f92d8a");
    }

    #[test]
    fn preimage_is_plain_concatenation() {
        let post = Post::new("3", 42, "hi", "bob", "abcd", &FoldHash);
        assert_eq!(post.preimage(), "342hibobabcd0");
    }

    #[test]
    fn hash_tracks_fields() {
        let mut post = Post::new("1", 10, "hello", "alice", "0", &FoldHash);
        let original = post.hash.clone();
        assert_eq!(post.compute_hash(&FoldHash), original);

        post.content.push('!');
        assert_ne!(post.compute_hash(&FoldHash), original);
        assert_eq!(post.hash, original, "stored hash is not refreshed implicitly");

        post.refresh_hash(&FoldHash);
        assert_eq!(post.hash, post.compute_hash(&FoldHash));
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let post = Post::new("1", 10, "hello", "alice", "0", &FoldHash);
        let json = serde_json::to_value(&post).expect("serialize");
        assert_eq!(json["timestamp"], 10);
        assert_eq!(json["previousHash"], "0");
        assert!(json.get("createdAt").is_none());
        assert!(json.get("created_at").is_none());
    }
}
