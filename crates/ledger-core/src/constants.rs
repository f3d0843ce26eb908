use std::time::Duration;

/// Leading zero hex digits a block hash needs unless configured otherwise.
pub const DEFAULT_DIFFICULTY: u32 = 3;
/// Fixed so that every node derives the same genesis hash.
pub const GENESIS_TIMESTAMP: u64 = 1_600_000_000;
pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(3);
/// Nonces handed to the worker pool per round of the parallel search.
pub const NONCES_PER_BATCH: u64 = 1 << 16;
