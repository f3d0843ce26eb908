//! Longest-valid-chain resolution and block propagation.
//!
//! Every peer interaction here is best effort: a peer that fails or exceeds the timeout
//! is logged and left out of the round.

use crate::{chain::check_chain_validity, Block, LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A node's exported state: its full chain plus the peers it knows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub length: usize,
    pub chain: Vec<Block>,
    #[serde(default)]
    pub peers: Vec<String>,
}

impl ChainSnapshot {
    pub fn new(chain: Vec<Block>, peers: Vec<String>) -> Self {
        Self {
            length: chain.len(),
            chain,
            peers,
        }
    }
}

/// Transport seam between a node and its peers.
pub trait PeerClient: Send + Sync {
    /// Fetches the peer's full chain.
    fn fetch_chain(&self, peer: &str) -> impl Future<Output = Result<ChainSnapshot>> + Send;

    /// Registers `own_address` with `remote` and returns the remote's state.
    fn register_with(
        &self,
        remote: &str,
        own_address: &str,
    ) -> impl Future<Output = Result<ChainSnapshot>> + Send;

    /// Delivers a newly appended block; `block.hash` carries the proof.
    fn announce_block(&self, peer: &str, block: &Block) -> impl Future<Output = Result<()>> + Send;
}

/// Runs a peer call under `timeout`, mapping expiry to [`LedgerError::PeerUnreachable`].
pub async fn with_timeout<T, F>(peer: &str, timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(LedgerError::PeerUnreachable {
            peer: peer.to_string(),
            reason: format!("no answer within {timeout:?}"),
        }),
    }
}

/// Queries every peer and returns the chain that should replace a local chain of
/// `local_len` blocks, if any.
///
/// A candidate must be strictly longer than the local chain and pass full validation.
/// Among candidates, one of equal or greater length than the best so far takes its place,
/// so the last equally-long chain observed in peer order wins.
pub async fn longest_valid_chain<C: PeerClient>(
    client: &C,
    peers: &[String],
    local_len: usize,
    difficulty: u32,
    timeout: Duration,
) -> Option<Vec<Block>> {
    let mut best: Option<Vec<Block>> = None;
    for peer in peers {
        let snapshot = match with_timeout(peer, timeout, client.fetch_chain(peer)).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("skipping {peer} this round: {e}");
                continue;
            }
        };
        let length = snapshot.chain.len();
        let best_len = best.as_ref().map_or(0, Vec::len);
        if length <= local_len || length < best_len {
            debug!("{peer} offers {length} blocks, not longer");
            continue;
        }
        if !check_chain_validity(&snapshot.chain, difficulty) {
            warn!("{peer} offers an invalid chain of {length} blocks");
            continue;
        }
        debug!("{peer} offers a valid chain of {length} blocks");
        best = Some(snapshot.chain);
    }
    best
}

/// Per-peer result of announcing a block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnounceReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

/// Sends `block` to every peer independently. Failures are not retried.
pub async fn announce<C: PeerClient>(
    client: &C,
    block: &Block,
    peers: &[String],
    timeout: Duration,
) -> AnnounceReport {
    let mut report = AnnounceReport::default();
    for peer in peers {
        match with_timeout(peer, timeout, client.announce_block(peer, block)).await {
            Ok(()) => report.delivered.push(peer.clone()),
            Err(e) => {
                warn!("announcing block {} to {peer} failed: {e}", block.index);
                report.failed.push(peer.clone());
            }
        }
    }
    info!(
        "announced block {} to {}/{} peers",
        block.index,
        report.delivered.len(),
        peers.len()
    );
    report
}
