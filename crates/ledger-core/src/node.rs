//! A single ledger node: its chain, pending pool and peer set, plus the operations the
//! transport layer exposes.

use crate::{
    chain::{Ledger, MineOutcome},
    consensus::{self, AnnounceReport, ChainSnapshot, PeerClient},
    constants::{DEFAULT_DIFFICULTY, DEFAULT_PEER_TIMEOUT},
    mine::mine_parallel,
    peers::{normalize_address, PeerRegistry},
    Block, LedgerError, NewTransaction, Result, Transaction,
};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Leading zero hex digits required of every block hash. Must match across the network.
    pub difficulty: u32,
    /// Upper bound on any single peer call.
    pub peer_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
        }
    }
}

/// Outcome of a consensus round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub replaced: bool,
    pub length: usize,
}

pub struct Node {
    address: String,
    config: NodeConfig,
    ledger: RwLock<Ledger>,
    peers: PeerRegistry,
    /// Serialises mining cycles so two never drain the same pool or append at the same index.
    mining: Mutex<()>,
}

impl Node {
    /// A node with a genesis-only ledger. `address` is what peers use to reach it.
    pub fn new(address: &str, config: NodeConfig) -> Self {
        let ledger = Ledger::new(config.difficulty);
        Self::with_ledger(address, config, ledger)
    }

    pub fn with_ledger(address: &str, config: NodeConfig, ledger: Ledger) -> Self {
        Self {
            address: normalize_address(address).unwrap_or_default(),
            config,
            ledger: RwLock::new(ledger),
            peers: PeerRegistry::new(),
            mining: Mutex::new(()),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    pub async fn submit_transaction(&self, tx: NewTransaction) -> Result<Transaction> {
        let tx = self.ledger.write().await.add_transaction(tx)?;
        info!("accepted transaction from {}", tx.author);
        Ok(tx)
    }

    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.ledger.read().await.pending().to_vec()
    }

    pub async fn chain_len(&self) -> usize {
        self.ledger.read().await.len()
    }

    pub async fn block(&self, index: u64) -> Option<Block> {
        self.ledger.read().await.block(index).cloned()
    }

    /// The full chain and the peer list, for readers and for peers fetching our chain.
    pub async fn chain_snapshot(&self) -> ChainSnapshot {
        let chain = self.ledger.read().await.blocks().to_vec();
        ChainSnapshot::new(chain, self.peers.all().await)
    }

    /// Runs one mining cycle.
    ///
    /// The candidate is taken from the pool under a short read lock, and the proof search
    /// runs on the blocking pool without holding the ledger, so submissions keep flowing
    /// and land in the next cycle. If the tip moved in the meantime the append is rejected
    /// and the pool is left for a retry.
    pub async fn trigger_mine(&self) -> Result<MineOutcome> {
        let _cycle = self.mining.lock().await;

        let (candidate, difficulty) = {
            let ledger = self.ledger.read().await;
            (ledger.candidate(), ledger.difficulty())
        };
        let Some(mut candidate) = candidate else {
            return Ok(MineOutcome::NothingPending);
        };

        let (candidate, proof) = tokio::task::spawn_blocking(move || {
            let proof = mine_parallel(&mut candidate.block, difficulty);
            (candidate, proof)
        })
        .await
        .map_err(|e| LedgerError::MiningTask(e.to_string()))?;

        let index = self.ledger.write().await.commit(candidate, &proof)?;
        Ok(MineOutcome::Mined(index))
    }

    /// Adopts the longest valid peer chain if it is strictly longer than ours.
    pub async fn resolve_conflicts<C: PeerClient>(&self, client: &C) -> Resolution {
        let peers = self.peers.all().await;
        let (local_len, difficulty) = {
            let ledger = self.ledger.read().await;
            (ledger.len(), ledger.difficulty())
        };
        let best = consensus::longest_valid_chain(
            client,
            &peers,
            local_len,
            difficulty,
            self.config.peer_timeout,
        )
        .await;

        let mut ledger = self.ledger.write().await;
        // The local chain may have grown while peers were queried; replace_chain re-checks.
        let replaced = best.is_some_and(|chain| ledger.replace_chain(chain));
        Resolution {
            replaced,
            length: ledger.len(),
        }
    }

    pub async fn announce<C: PeerClient>(&self, client: &C, block: &Block) -> AnnounceReport {
        let peers = self.peers.all().await;
        consensus::announce(client, block, &peers, self.config.peer_timeout).await
    }

    /// Mines, then checks the network: the new block is announced only if no peer has a
    /// longer valid chain.
    pub async fn mine_and_announce<C: PeerClient>(&self, client: &C) -> Result<MineOutcome> {
        let outcome = self.trigger_mine().await?;
        let MineOutcome::Mined(index) = outcome else {
            return Ok(outcome);
        };
        let resolution = self.resolve_conflicts(client).await;
        if resolution.replaced {
            info!("block #{index} superseded by a longer peer chain, not announcing");
            return Ok(outcome);
        }
        if let Some(block) = self.block(index).await {
            self.announce(client, &block).await;
        }
        Ok(outcome)
    }

    /// Records `address` as a peer and returns our state for it to bootstrap from.
    pub async fn register_peer(&self, address: &str) -> ChainSnapshot {
        if normalize_address(address).as_deref() != Some(self.address.as_str()) {
            self.peers.add(address).await;
        }
        self.chain_snapshot().await
    }

    /// Registers with `remote` and adopts its chain and peers.
    ///
    /// The returned chain is rebuilt block by block first; if that fails the error is
    /// returned and neither the chain nor the peer set is touched.
    pub async fn register_with<C: PeerClient>(&self, client: &C, remote: &str) -> Result<()> {
        let snapshot = consensus::with_timeout(
            remote,
            self.config.peer_timeout,
            client.register_with(remote, &self.address),
        )
        .await?;
        self.import(snapshot).await?;
        self.peers.add(remote).await;
        info!("registered with {remote}");
        Ok(())
    }

    /// Replaces the chain with a rebuilt copy of `snapshot.chain` and merges its peers.
    /// All or nothing: a corrupt dump leaves the node as it was.
    pub async fn import(&self, snapshot: ChainSnapshot) -> Result<()> {
        let rebuilt = Ledger::rebuild_from_dump(&snapshot.chain, self.config.difficulty)
            .inspect_err(|e| warn!("refusing chain dump: {e}"))?;
        self.ledger.write().await.adopt(rebuilt);
        let own = self.address.as_str();
        let others: Vec<&String> = snapshot
            .peers
            .iter()
            .filter(|p| normalize_address(p).as_deref() != Some(own))
            .collect();
        self.peers.extend(others).await;
        Ok(())
    }

    /// Appends a block mined elsewhere; `proof` is its claimed hash.
    pub async fn receive_announced_block(&self, block: Block, proof: &str) -> Result<u64> {
        let index = block.index;
        self.ledger.write().await.add_block(block, proof)?;
        info!("accepted announced block #{index}");
        Ok(index)
    }
}
