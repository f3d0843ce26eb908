use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod chain;
pub mod consensus;
pub mod constants;
pub mod error;
pub mod mine;
pub mod node;
pub mod peers;

pub use error::{LedgerError, Result};

/// Lowercase hex encoding of a SHA-256 digest.
pub type Hash = String;

/// A single author/content record. Immutable once it has been mined into a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub author: String,
    pub content: String,
    pub timestamp: u64,
}

/// Transaction as submitted from outside; fields are checked before it may enter the pool.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl NewTransaction {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            content: Some(content.into()),
            timestamp: None,
        }
    }

    /// Validates the required fields and stamps the transaction if it carries no timestamp.
    pub fn into_transaction(self) -> Result<Transaction> {
        let author = required(self.author, "author")?;
        let content = required(self.content, "content")?;
        Ok(Transaction {
            author,
            content,
            timestamp: self.timestamp.unwrap_or_else(unix_now),
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LedgerError::InvalidTransaction { field }),
    }
}

/// Seconds since the unix epoch, 0 if the clock is before it.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub timestamp: u64,
    pub previous_hash: Hash,
    pub nonce: u64,
    /// Empty until the block is appended; afterwards the accepted proof.
    #[serde(default)]
    pub hash: Hash,
}

impl Block {
    /// An unproven block: nonce 0 and no hash yet.
    pub fn candidate(
        index: u64,
        transactions: Vec<Transaction>,
        timestamp: u64,
        previous_hash: impl Into<Hash>,
    ) -> Self {
        Self {
            index,
            transactions,
            timestamp,
            previous_hash: previous_hash.into(),
            nonce: 0,
            hash: Hash::new(),
        }
    }

    pub fn compute_hash(&self) -> Hash {
        digest(self)
    }
}

/// Canonical encoding of every block field except `hash`.
///
/// Object keys are emitted in sorted order at every level, so two blocks with
/// the same field values always encode to the same bytes.
pub fn canonical_bytes(block: &Block) -> Vec<u8> {
    let transactions: Vec<serde_json::Value> = block
        .transactions
        .iter()
        .map(|t| {
            serde_json::json!({
                "author": t.author,
                "content": t.content,
                "timestamp": t.timestamp,
            })
        })
        .collect();
    serde_json::json!({
        "index": block.index,
        "nonce": block.nonce,
        "previous_hash": block.previous_hash,
        "timestamp": block.timestamp,
        "transactions": transactions,
    })
    .to_string()
    .into_bytes()
}

/// SHA-256 over the canonical encoding, hex encoded.
pub fn digest(block: &Block) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(canonical_bytes(block));
    hex::encode(hasher.finalize())
}

pub mod pow {
    use super::{digest, Block, Hash};

    /// Number of leading `'0'` characters in a hex digest.
    pub fn leading_zero_digits(hash: &str) -> u32 {
        hash.bytes().take_while(|c| *c == b'0').count() as u32
    }

    pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
        leading_zero_digits(hash) >= difficulty
    }

    /// Mine the block by counting the nonce up from zero until the digest has at
    /// least `difficulty` leading zero hex digits. Leaves the winning nonce on the
    /// block and returns the winning digest.
    pub fn mine(block: &mut Block, difficulty: u32) -> Hash {
        block.nonce = 0;
        let mut computed = digest(block);
        while !meets_difficulty(&computed, difficulty) {
            block.nonce += 1;
            computed = digest(block);
        }
        computed
    }

    /// True iff `proof` satisfies the difficulty and is the digest of `block`.
    pub fn is_valid_proof(block: &Block, proof: &str, difficulty: u32) -> bool {
        meets_difficulty(proof, difficulty) && proof == digest(block)
    }
}
