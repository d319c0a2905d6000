//! # Records
//!
//! The two record kinds the ledger stores:
//!
//! ```text
//! post.rs    — Post: a chained, nonce-sealed public item (a block)
//! message.rs — DirectMessage: an unchained, fingerprinted private item
//! ```
//!
//! Both serialize with camelCase keys in the exact shape the snapshot
//! format expects, so they double as wire records.

pub mod message;
pub mod post;

pub use message::DirectMessage;
pub use post::Post;
