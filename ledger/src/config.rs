//! # Ledger Configuration & Constants
//!
//! Every magic number in the ledger lives here. The genesis values and the
//! storage keys are part of the persisted format: changing them breaks every
//! snapshot already written, so don't.

// ---------------------------------------------------------------------------
// Genesis
// ---------------------------------------------------------------------------

/// Sequence id of the genesis post.
pub const GENESIS_ID: &str = "0";

/// Author recorded on the genesis post.
pub const GENESIS_AUTHOR: &str = "System";

/// Content of the genesis post.
pub const GENESIS_CONTENT: &str = "Genesis Block";

/// `previous_hash` sentinel for the genesis post. Nothing precedes it.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

// ---------------------------------------------------------------------------
// Mining
// ---------------------------------------------------------------------------

/// Leading zero hex digits required of a freshly created ledger.
///
/// One digit means roughly one in sixteen nonces succeeds. With the fold
/// digest, two digits are already out of reach for most posts inside the
/// attempt ceiling, so don't raise this casually.
pub const DEFAULT_DIFFICULTY: u32 = 1;

/// Hard ceiling on trial hashes per post. Bounds worst-case sealing latency;
/// it is a safety valve, not part of the proof-of-work.
pub const DEFAULT_MAX_ATTEMPTS: u64 = 10_000;

/// The miner reports progress every this many attempts.
pub const PROGRESS_INTERVAL: u64 = 100;

// ---------------------------------------------------------------------------
// Persistence keys
// ---------------------------------------------------------------------------

/// Key under which a key-value store keeps the serialized ledger.
pub const SNAPSHOT_KEY: &str = "blockchain";

/// Key under which a key-value store keeps the remembered identity.
pub const USERNAME_KEY: &str = "username";

// ---------------------------------------------------------------------------
// Post bodies
// ---------------------------------------------------------------------------

/// Lifetime of a story post: 24 hours.
pub const STORY_LIFETIME_MS: u64 = 24 * 60 * 60 * 1000;

/// A story is flagged as expiring soon inside its last hour.
pub const STORY_EXPIRING_SOON_MS: u64 = 60 * 60 * 1000;

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Tunable parameters for a ledger instance.
///
/// `difficulty` only seeds a fresh ledger; a restored snapshot carries its
/// own difficulty, which wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Leading zero hex digits required of a sealed post's hash.
    pub difficulty: u32,

    /// Maximum trial hashes per post before the miner gives up.
    pub max_attempts: u64,

    /// Attempts between progress callbacks. Zero disables reporting.
    pub progress_interval: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_constants() {
        let config = LedgerConfig::default();
        assert_eq!(config.difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.progress_interval, PROGRESS_INTERVAL);
    }
}
