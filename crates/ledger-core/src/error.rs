use crate::Hash;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A submitted transaction is missing a required field.
    #[error("invalid transaction: `{field}` is missing or empty")]
    InvalidTransaction { field: &'static str },

    #[error("block {index} does not extend the tip: expected previous_hash {expected}, found {found}")]
    ChainLinkage {
        index: u64,
        expected: Hash,
        found: Hash,
    },

    #[error("block {index} has index out of sequence, expected {expected}")]
    IndexOutOfSequence { index: u64, expected: u64 },

    #[error("block {index} carries an invalid proof {proof}")]
    InvalidProof { index: u64, proof: Hash },

    /// An externally supplied chain dump could not be adopted.
    #[error("corrupt chain dump at position {position}: {reason}")]
    CorruptChain { position: usize, reason: String },

    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    #[error("mining task failed: {0}")]
    MiningTask(String),
}

impl LedgerError {
    /// Errors from a rejected append; the chain is untouched and the caller may retry.
    pub fn is_append_rejection(&self) -> bool {
        matches!(
            self,
            Self::ChainLinkage { .. } | Self::IndexOutOfSequence { .. } | Self::InvalidProof { .. }
        )
    }
}
