//! Direct messages.
//!
//! A message is a standalone record. It carries a fingerprint so accidental
//! corruption is noticeable, but it is never chained to its neighbours and
//! never mined.

use serde::{Deserialize, Serialize};

use crate::digest::HashFunction;

/// A private message between two identifiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    /// Sequence id within the message log.
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub content: String,
    /// Capture time in milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Fingerprint over `id || sender || recipient || content || timestamp`.
    pub hash: String,
}

impl DirectMessage {
    /// Construct a message and compute its fingerprint.
    pub fn new(
        id: impl Into<String>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
        timestamp: u64,
        hasher: &dyn HashFunction,
    ) -> Self {
        let mut message = DirectMessage {
            id: id.into(),
            sender: sender.into(),
            recipient: recipient.into(),
            content: content.into(),
            timestamp,
            hash: String::new(),
        };
        message.hash = message.compute_hash(hasher);
        message
    }

    pub fn preimage(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.id, self.sender, self.recipient, self.content, self.timestamp
        )
    }

    pub fn compute_hash(&self, hasher: &dyn HashFunction) -> String {
        hasher.fingerprint(&self.preimage())
    }

    /// Returns `true` if `user` sent or received this message.
    pub fn involves(&self, user: &str) -> bool {
        self.sender == user || self.recipient == user
    }

    /// Returns `true` if the message went between `a` and `b`, either way.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.sender == a && self.recipient == b) || (self.sender == b && self.recipient == a)
    }

    /// The other party, from `user`'s point of view.
    pub fn counterpart(&self, user: &str) -> Option<&str> {
        if self.sender == user {
            Some(&self.recipient)
        } else if self.recipient == user {
            Some(&self.sender)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::FoldHash;

    #[test]
    fn fingerprint_matches_reference() {
        let msg = DirectMessage::new("0", "alice", "bob", "hi", 1_700_000_000_000, &FoldHash);
        assert_eq!(msg.preimage(), "0alicebobhi1700000000000");
        assert_eq!(msg.hash, "463ec6e4");
    }

    #[test]
    fn direction_helpers() {
        let msg = DirectMessage::new("0", "alice", "bob", "hi", 1, &FoldHash);
        assert!(msg.involves("alice"));
        assert!(msg.involves("bob"));
        assert!(!msg.involves("carol"));
        assert!(msg.is_between("alice", "bob"));
        assert!(msg.is_between("bob", "alice"));
        assert!(!msg.is_between("alice", "carol"));
        assert_eq!(msg.counterpart("alice"), Some("bob"));
        assert_eq!(msg.counterpart("bob"), Some("alice"));
        assert_eq!(msg.counterpart("carol"), None);
    }
}
