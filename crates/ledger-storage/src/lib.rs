//! Bulk export and import of a node's chain dump.
//!
//! Nothing here is written per block: a store holds one [`ChainSnapshot`] that is saved
//! on shutdown and read back on boot, where it is replayed through
//! `Ledger::rebuild_from_dump` before being trusted.

pub mod json_store;
pub mod sled_store;

use anyhow::Result;
use ledger_core::consensus::ChainSnapshot;

pub trait DumpStore: Send + Sync {
    /// Overwrites whatever dump was stored before.
    fn save(&self, dump: &ChainSnapshot) -> Result<()>;
    /// `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<ChainSnapshot>>;
}
