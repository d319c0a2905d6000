//! # Snapshot Codec
//!
//! Serializes a ledger into the JSON document the persistence collaborator
//! stores, and back.
//!
//! ## Document Shape
//!
//! ```text
//! {
//!   "chain":        [Post, ...],          genesis first, required, non-empty
//!   "pendingPosts": [Post, ...],          required
//!   "difficulty":   u32,                  required
//!   "messages":     [DirectMessage, ...]  optional, absent or null = empty log
//! }
//!
//! Post          = {id, timestamp, content, author, previousHash, hash, nonce}
//! DirectMessage = {id, sender, recipient, content, timestamp?, hash?}
//! ```
//!
//! ## Restore Semantics
//!
//! Stored `hash` and `nonce` values are taken verbatim, never recomputed. A
//! blob whose content was edited behind the ledger's back restores without
//! complaint and then fails [`Ledger::validate`]; that is the detection
//! path, not a parse error. Decoding fails only on structure: bad JSON, a
//! missing required field, or an empty chain.
//!
//! Older message records may lack a timestamp (filled in with the current
//! time) or a hash (recomputed from the restored fields).

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::digest::HashFunction;
use crate::error::SnapshotError;
use crate::ledger::Ledger;
use crate::record::{DirectMessage, Post};

// ---------------------------------------------------------------------------
// Wire Types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRef<'a> {
    chain: &'a [Post],
    pending_posts: &'a VecDeque<Post>,
    difficulty: u32,
    messages: &'a [DirectMessage],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotDocument {
    chain: Vec<Post>,
    pending_posts: VecDeque<Post>,
    difficulty: u32,
    /// Absent and `null` both mean an empty log.
    #[serde(default)]
    messages: Option<Vec<MessageRecord>>,
}

#[derive(Deserialize)]
struct MessageRecord {
    id: String,
    sender: String,
    recipient: String,
    content: String,
    #[serde(default)]
    timestamp: Option<u64>,
    #[serde(default)]
    hash: Option<String>,
}

impl MessageRecord {
    fn into_message(self, hasher: &dyn HashFunction, clock: &dyn Clock) -> DirectMessage {
        let timestamp = self.timestamp.unwrap_or_else(|| clock.now_millis());
        let mut message = DirectMessage {
            id: self.id,
            sender: self.sender,
            recipient: self.recipient,
            content: self.content,
            timestamp,
            hash: String::new(),
        };
        message.hash = match self.hash {
            Some(hash) => hash,
            None => message.compute_hash(hasher),
        };
        message
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Serialize the full ledger state to a JSON string.
pub fn encode(ledger: &Ledger) -> Result<String, SnapshotError> {
    let doc = SnapshotRef {
        chain: ledger.chain(),
        pending_posts: ledger.pending(),
        difficulty: ledger.difficulty(),
        messages: ledger.messages(),
    };
    Ok(serde_json::to_string(&doc)?)
}

/// Rebuild a ledger from a JSON snapshot.
///
/// `config` supplies the miner parameters, which are not part of the
/// snapshot; the stored difficulty wins over `config.difficulty`.
pub fn decode(
    blob: &str,
    config: LedgerConfig,
    hasher: Arc<dyn HashFunction>,
    clock: Arc<dyn Clock>,
) -> Result<Ledger, SnapshotError> {
    let doc: SnapshotDocument = serde_json::from_str(blob)?;

    if doc.chain.is_empty() {
        return Err(SnapshotError::Invalid(
            "chain must contain at least the genesis post".to_string(),
        ));
    }

    let messages = doc
        .messages
        .unwrap_or_default()
        .into_iter()
        .map(|record| record.into_message(hasher.as_ref(), clock.as_ref()))
        .collect();

    Ok(Ledger::from_parts(
        doc.chain,
        doc.pending_posts,
        messages,
        doc.difficulty,
        config,
        hasher,
        clock,
    ))
}

/// Restore from `blob`, or start fresh if there is none or it does not
/// decode. Never fails.
pub fn restore_or_fresh(
    blob: Option<&str>,
    config: LedgerConfig,
    hasher: Arc<dyn HashFunction>,
    clock: Arc<dyn Clock>,
) -> Ledger {
    let Some(blob) = blob else {
        info!("no snapshot found, starting fresh ledger");
        return Ledger::with_parts(config, hasher, clock);
    };

    match decode(blob, config, Arc::clone(&hasher), Arc::clone(&clock)) {
        Ok(ledger) => {
            info!(
                height = ledger.height(),
                pending = ledger.pending_len(),
                messages = ledger.messages().len(),
                "ledger restored from snapshot"
            );
            ledger
        }
        Err(e) => {
            warn!(error = %e, "failed to restore snapshot, starting fresh ledger");
            Ledger::with_parts(config, hasher, clock)
        }
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
    use crate::miner::NoopObserver;

    const T0: u64 = 1_700_000_000_000;

    fn parts() -> (Arc<dyn HashFunction>, Arc<ManualClock>) {
        (Arc::new(FoldHash), Arc::new(ManualClock::new(T0)))
    }

    fn populated() -> Ledger {
        let (hasher, clock) = parts();
        let mut ledger = Ledger::with_parts(
            LedgerConfig::default(),
            hasher,
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        ledger.create_post("hello", "alice").unwrap();
        ledger.seal_pending(1, &NoopObserver);
        clock.advance(10);
        ledger.create_post("still pending", "bob").unwrap();
        ledger.send_message("alice", "bob", "hi").unwrap();
        ledger
    }

    fn restore(blob: &str) -> Result<Ledger, SnapshotError> {
        let (hasher, clock) = parts();
        decode(blob, LedgerConfig::default(), hasher, clock)
    }

    #[test]
    fn document_uses_wire_keys() {
        let blob = encode(&populated()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&blob).unwrap();

        assert!(value["chain"].is_array());
        assert!(value["pendingPosts"].is_array());
        assert_eq!(value["difficulty"], 1);
        assert_eq!(value["messages"][0]["sender"], "alice");
        assert_eq!(value["chain"][1]["previousHash"], value["chain"][0]["hash"]);
        assert_eq!(value["pendingPosts"][0]["timestamp"], T0 + 10);
    }

    #[test]
    fn round_trip_is_lossless() {
        let ledger = populated();
        let blob = encode(&ledger).unwrap();
        let restored = restore(&blob).unwrap();

        assert_eq!(restored.chain(), ledger.chain());
        assert_eq!(restored.pending(), ledger.pending());
        assert_eq!(restored.messages(), ledger.messages());
        assert_eq!(restored.difficulty(), ledger.difficulty());
        assert_eq!(encode(&restored).unwrap(), blob);
    }

    #[test]
    fn stored_hashes_are_taken_verbatim() {
        let blob = encode(&populated()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&blob).unwrap();
        value["chain"][1]["content"] = "doctored".into();
        value["messages"][0]["hash"] = "bogus".into();

        let restored = restore(&value.to_string()).unwrap();

        assert_eq!(restored.chain()[1].content, "doctored");
        assert_eq!(restored.messages()[0].hash, "bogus");
        assert!(!restored.is_valid());
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let err = restore(r#"{"chain": [], "difficulty": 1}"#).unwrap_err();
        assert!(matches!(err, SnapshotError::Malformed(_)));

        let err = restore("not json").unwrap_err();
        assert!(matches!(err, SnapshotError::Malformed(_)));
    }

    #[test]
    fn empty_chain_is_invalid() {
        let err = restore(r#"{"chain": [], "pendingPosts": [], "difficulty": 1}"#).unwrap_err();
        assert!(matches!(err, SnapshotError::Invalid(_)));
    }

    #[test]
    fn legacy_message_fields_are_filled_in() {
        let genesis = serde_json::to_value(Post::genesis(T0, &FoldHash)).unwrap();
        let blob = serde_json::json!({
            "chain": [genesis],
            "pendingPosts": [],
            "difficulty": 3,
            "messages": [
                {"id": "0", "sender": "alice", "recipient": "bob", "content": "hi"}
            ]
        })
        .to_string();

        let restored = restore(&blob).unwrap();
        let msg = &restored.messages()[0];
        assert_eq!(msg.timestamp, T0);
        assert_eq!(msg.hash, "463ec6e4");
        assert_eq!(restored.difficulty(), 3);
    }

    #[test]
    fn absent_messages_mean_empty_log() {
        let genesis = serde_json::to_value(Post::genesis(T0, &FoldHash)).unwrap();
        let blob = serde_json::json!({
            "chain": [genesis.clone()],
            "pendingPosts": [],
            "difficulty": 1
        })
        .to_string();
        assert!(restore(&blob).unwrap().messages().is_empty());

        let blob = serde_json::json!({
            "chain": [genesis],
            "pendingPosts": [],
            "difficulty": 1,
            "messages": null
        })
        .to_string();
        let restored = restore(&blob).expect("null message log restores");
        assert!(restored.messages().is_empty());
        assert_eq!(restored.height(), 1);
    }

    #[test]
    fn null_message_log_keeps_stored_chain() {
        let ledger = populated();
        let mut value: serde_json::Value =
            serde_json::from_str(&encode(&ledger).unwrap()).unwrap();
        value["messages"] = serde_json::Value::Null;

        let (hasher, clock) = parts();
        let restored = restore_or_fresh(
            Some(&value.to_string()),
            LedgerConfig::default(),
            hasher,
            clock,
        );
        assert_eq!(restored.chain(), ledger.chain());
        assert_eq!(restored.pending(), ledger.pending());
        assert!(restored.messages().is_empty());
    }

    #[test]
    fn restore_or_fresh_falls_back() {
        let (hasher, clock) = parts();
        let fresh = restore_or_fresh(
            Some("{\"chain\":"),
            LedgerConfig::default(),
            hasher,
            clock,
        );
        assert_eq!(fresh.height(), 1);
        assert!(fresh.messages().is_empty());

        let (hasher, clock) = parts();
        let none = restore_or_fresh(None, LedgerConfig::default(), hasher, clock);
        assert_eq!(none.height(), 1);
    }
}
