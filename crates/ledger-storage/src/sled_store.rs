use crate::DumpStore;
use anyhow::{Context, Result};
use ledger_core::{consensus::ChainSnapshot, Block};
use sled::{Db, Tree};
use std::path::Path;
use tracing::info;

const TREE_BLOCKS: &str = "blocks";
const TREE_PEERS: &str = "peers";
const KEY_SAVED: &[u8] = b"saved";

/// Dump kept in a sled database: one bincode record per block keyed by big-endian index,
/// one key per peer.
#[derive(Clone)]
pub struct SledStore {
  db: Db,
}

impl SledStore {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
    let db = sled::open(path)?;
    info!("sled store opened");
    Ok(Self { db })
  }

  fn blocks(&self) -> Result<Tree> {
    Ok(self.db.open_tree(TREE_BLOCKS)?)
  }

  fn peers(&self) -> Result<Tree> {
    Ok(self.db.open_tree(TREE_PEERS)?)
  }

  pub fn clear(&self) -> Result<()> {
    self.blocks()?.clear()?;
    self.peers()?.clear()?;
    self.db.remove(KEY_SAVED)?;
    self.db.flush()?;
    Ok(())
  }

  pub fn close(&self) -> Result<()> {
    self.db.flush()?;
    Ok(())
  }
}

impl DumpStore for SledStore {
  fn save(&self, dump: &ChainSnapshot) -> Result<()> {
    let blocks = self.blocks()?;
    let peers = self.peers()?;
    blocks.clear()?;
    peers.clear()?;

    for block in &dump.chain {
      let bytes = bincode::serialize(block)?;
      blocks.insert(block.index.to_be_bytes(), bytes)?;
    }
    for peer in &dump.peers {
      peers.insert(peer.as_bytes(), Vec::new())?;
    }
    self.db.insert(KEY_SAVED, vec![1u8])?;

    self.db.flush()?;
    info!("saved chain of {} blocks to sled", dump.chain.len());
    Ok(())
  }

  fn load(&self) -> Result<Option<ChainSnapshot>> {
    if self.db.get(KEY_SAVED)?.is_none() {
      return Ok(None);
    }
    let mut chain = Vec::new();
    for entry in self.blocks()?.iter() {
      let (key, value) = entry?;
      let block: Block = bincode::deserialize(&value)
        .with_context(|| format!("decoding block record {:?}", key.as_ref()))?;
      chain.push(block);
    }
    let mut peers = Vec::new();
    for entry in self.peers()?.iter() {
      let (key, _) = entry?;
      peers.push(String::from_utf8(key.to_vec()).context("decoding peer address")?);
    }
    Ok(Some(ChainSnapshot::new(chain, peers)))
  }
}
