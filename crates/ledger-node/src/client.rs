use ledger_core::{
    consensus::{ChainSnapshot, PeerClient},
    peers::normalize_address,
    Block, LedgerError, Result,
};
use reqwest::{Client, Response};
use serde::Serialize;
use std::{fmt::Display, time::Duration};

#[derive(Serialize)]
struct RegisterNode<'a> {
    node_address: &'a str,
}

/// `PeerClient` over the node's own HTTP routes.
#[derive(Clone, Debug)]
pub struct HttpPeerClient {
    http: Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

fn endpoint(peer: &str, path: &str) -> String {
    let base = normalize_address(peer).unwrap_or_else(|| peer.to_string());
    format!("{base}{path}")
}

fn unreachable(peer: &str, reason: impl Display) -> LedgerError {
    LedgerError::PeerUnreachable {
        peer: peer.to_string(),
        reason: reason.to_string(),
    }
}

async fn checked(peer: &str, res: reqwest::Result<Response>) -> Result<Response> {
    let res = res.map_err(|e| unreachable(peer, e))?;
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(unreachable(peer, format!("{status}: {body}")))
}

impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot> {
        let res = checked(peer, self.http.get(endpoint(peer, "/chain")).send().await).await?;
        res.json().await.map_err(|e| unreachable(peer, e))
    }

    async fn register_with(&self, remote: &str, own_address: &str) -> Result<ChainSnapshot> {
        let body = RegisterNode {
            node_address: own_address,
        };
        let req = self.http.post(endpoint(remote, "/register_node")).json(&body);
        let res = checked(remote, req.send().await).await?;
        res.json().await.map_err(|e| unreachable(remote, e))
    }

    async fn announce_block(&self, peer: &str, block: &Block) -> Result<()> {
        let req = self.http.post(endpoint(peer, "/add_block")).json(block);
        checked(peer, req.send().await).await?;
        Ok(())
    }
}
