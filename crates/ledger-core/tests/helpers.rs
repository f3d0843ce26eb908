#![allow(dead_code)]

use ledger_core::{
    consensus::{ChainSnapshot, PeerClient},
    node::{Node, NodeConfig},
    peers::normalize_address,
    Block, LedgerError, NewTransaction, Result,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub const DIFFICULTY: u32 = 2;

pub fn config() -> NodeConfig {
    NodeConfig {
        difficulty: DIFFICULTY,
        peer_timeout: Duration::from_millis(500),
    }
}

/// In-process stand-in for the HTTP transport: routes peer calls straight to `Node`s.
#[derive(Default)]
pub struct Network {
    nodes: RwLock<HashMap<String, Arc<Node>>>,
    offline: RwLock<HashSet<String>>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&self, address: &str) -> Arc<Node> {
        let node = Arc::new(Node::new(address, config()));
        self.nodes
            .write()
            .unwrap()
            .insert(node.address().to_string(), Arc::clone(&node));
        node
    }

    pub fn set_offline(&self, address: &str, offline: bool) {
        let address = normalize_address(address).unwrap();
        let mut set = self.offline.write().unwrap();
        if offline {
            set.insert(address);
        } else {
            set.remove(&address);
        }
    }

    fn get(&self, peer: &str) -> Result<Arc<Node>> {
        let unreachable = |reason: &str| LedgerError::PeerUnreachable {
            peer: peer.to_string(),
            reason: reason.to_string(),
        };
        let address = normalize_address(peer).ok_or_else(|| unreachable("bad address"))?;
        if self.offline.read().unwrap().contains(&address) {
            return Err(unreachable("offline"));
        }
        self.nodes
            .read()
            .unwrap()
            .get(&address)
            .cloned()
            .ok_or_else(|| unreachable("unknown host"))
    }
}

impl PeerClient for Network {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot> {
        let node = self.get(peer)?;
        Ok(node.chain_snapshot().await)
    }

    async fn register_with(&self, remote: &str, own_address: &str) -> Result<ChainSnapshot> {
        let node = self.get(remote)?;
        Ok(node.register_peer(own_address).await)
    }

    async fn announce_block(&self, peer: &str, block: &Block) -> Result<()> {
        let node = self.get(peer)?;
        let proof = block.hash.clone();
        node.receive_announced_block(block.clone(), &proof).await?;
        Ok(())
    }
}

/// A remote that always answers with the same snapshot.
pub struct FixedRemote(pub ChainSnapshot);

impl PeerClient for FixedRemote {
    async fn fetch_chain(&self, _peer: &str) -> Result<ChainSnapshot> {
        Ok(self.0.clone())
    }

    async fn register_with(&self, _remote: &str, _own: &str) -> Result<ChainSnapshot> {
        Ok(self.0.clone())
    }

    async fn announce_block(&self, _peer: &str, _block: &Block) -> Result<()> {
        Ok(())
    }
}

pub async fn mine_posts(node: &Node, author: &str, count: usize) {
    for i in 0..count {
        node.submit_transaction(NewTransaction::new(author, format!("{author} post {i}")))
            .await
            .expect("valid transaction");
        node.trigger_mine().await.expect("mine");
    }
}
