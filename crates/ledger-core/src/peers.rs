use std::collections::BTreeSet;
use tokio::sync::RwLock;
use tracing::debug;

/// Normalises a peer address to a base URL: trimmed, `http://` added when no scheme is
/// given, trailing slashes removed. Blank input yields `None`.
pub fn normalize_address(address: &str) -> Option<String> {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains("://") {
        Some(trimmed.to_string())
    } else {
        Some(format!("http://{trimmed}"))
    }
}

/// Concurrent set of known peer addresses. Iteration is in sorted address order.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<BTreeSet<String>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the normalised address. Returns true if it was not known before.
    pub async fn add(&self, address: &str) -> bool {
        let Some(address) = normalize_address(address) else {
            return false;
        };
        let inserted = self.peers.write().await.insert(address.clone());
        if inserted {
            debug!("registered peer {address}");
        }
        inserted
    }

    pub async fn extend<I, S>(&self, addresses: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for address in addresses {
            if self.add(address.as_ref()).await {
                added += 1;
            }
        }
        added
    }

    pub async fn contains(&self, address: &str) -> bool {
        match normalize_address(address) {
            Some(address) => self.peers.read().await.contains(&address),
            None => false,
        }
    }

    pub async fn all(&self) -> Vec<String> {
        self.peers.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }
}
