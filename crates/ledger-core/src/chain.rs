//! The ledger: an ordered block sequence rooted at a fixed genesis, plus the pool of
//! transactions waiting to be mined.

use crate::{
    constants::{DEFAULT_DIFFICULTY, GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP},
    pow, unix_now, Block, Hash, LedgerError, NewTransaction, Result, Transaction,
};
use tracing::{debug, info, warn};

/// The canonical genesis block. Every node derives the same one.
pub fn genesis_block() -> Block {
    let mut genesis = Block::candidate(0, vec![], GENESIS_TIMESTAMP, GENESIS_PREVIOUS_HASH);
    genesis.hash = genesis.compute_hash();
    genesis
}

/// Validates a whole chain: canonical genesis at index 0, then for every later block an
/// index in sequence, linkage to its predecessor, and a valid proof.
pub fn check_chain_validity(chain: &[Block], difficulty: u32) -> bool {
    match chain.first() {
        Some(first) if *first == genesis_block() => {}
        _ => return false,
    }
    chain.windows(2).enumerate().all(|(i, pair)| {
        let (prev, block) = (&pair[0], &pair[1]);
        block.index == (i + 1) as u64
            && block.previous_hash == prev.hash
            && pow::is_valid_proof(block, &block.hash, difficulty)
    })
}

/// What a mining cycle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MineOutcome {
    /// A block was appended at this index.
    Mined(u64),
    NothingPending,
}

/// A block assembled from the pool but not yet proven.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub block: Block,
    /// How many transactions from the front of the pool went into the block.
    pub included: usize,
}

#[derive(Clone, Debug)]
pub struct Ledger {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
    difficulty: u32,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl Ledger {
    /// A genesis-only ledger.
    pub fn new(difficulty: u32) -> Self {
        Self {
            blocks: vec![genesis_block()],
            pending: Vec::new(),
            difficulty,
        }
    }

    /// Rebuilds a ledger from an exported block list.
    ///
    /// Element 0 stands for the genesis block and is not re-checked; every later element
    /// is replayed through [`Ledger::add_block`] with its dumped hash as the proof. Any
    /// rejection aborts the whole rebuild, so a partial ledger is never returned.
    pub fn rebuild_from_dump(dump: &[Block], difficulty: u32) -> Result<Self> {
        if dump.is_empty() {
            return Err(LedgerError::CorruptChain {
                position: 0,
                reason: "dump holds no genesis block".to_string(),
            });
        }
        let mut ledger = Self::new(difficulty);
        for (position, dumped) in dump.iter().enumerate().skip(1) {
            let proof = dumped.hash.clone();
            let mut block = dumped.clone();
            block.hash = Hash::new();
            ledger
                .add_block(block, &proof)
                .map_err(|e| LedgerError::CorruptChain {
                    position,
                    reason: e.to_string(),
                })?;
        }
        debug!("rebuilt ledger of {} blocks from dump", ledger.len());
        Ok(ledger)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true: the genesis block is always present.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn tip(&self) -> &Block {
        // Invariant: the genesis block is never removed.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn block(&self, index: u64) -> Option<&Block> {
        self.blocks.get(usize::try_from(index).ok()?)
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Appends `block` with `proof` as its hash, or rejects it leaving the ledger unchanged.
    pub fn add_block(&mut self, mut block: Block, proof: &str) -> Result<()> {
        let tip = self.tip();
        if block.previous_hash != tip.hash {
            warn!("rejected block {}: does not link to tip {}", block.index, tip.index);
            return Err(LedgerError::ChainLinkage {
                index: block.index,
                expected: tip.hash.clone(),
                found: block.previous_hash,
            });
        }
        if block.index != tip.index + 1 {
            return Err(LedgerError::IndexOutOfSequence {
                index: block.index,
                expected: tip.index + 1,
            });
        }
        if !pow::is_valid_proof(&block, proof, self.difficulty) {
            warn!("rejected block {}: invalid proof", block.index);
            return Err(LedgerError::InvalidProof {
                index: block.index,
                proof: proof.to_string(),
            });
        }
        block.hash = proof.to_string();
        debug!("appended block {} ({})", block.index, block.hash);
        self.blocks.push(block);
        Ok(())
    }

    /// Accepts a transaction into the pending pool.
    pub fn add_transaction(&mut self, tx: NewTransaction) -> Result<Transaction> {
        let tx = tx.into_transaction()?;
        self.pending.push(tx.clone());
        Ok(tx)
    }

    /// Assembles a block from the whole current pool on top of the tip, or `None` if the
    /// pool is empty.
    pub fn candidate(&self) -> Option<Candidate> {
        if self.pending.is_empty() {
            return None;
        }
        let tip = self.tip();
        Some(Candidate {
            block: Block::candidate(
                tip.index + 1,
                self.pending.clone(),
                unix_now(),
                tip.hash.clone(),
            ),
            included: self.pending.len(),
        })
    }

    /// Appends a proven candidate and drops exactly the transactions it included.
    ///
    /// Transactions that entered the pool after the candidate was assembled stay queued.
    /// On rejection the pool is left alone.
    pub fn commit(&mut self, candidate: Candidate, proof: &str) -> Result<u64> {
        let Candidate { block, included } = candidate;
        let index = block.index;
        self.add_block(block, proof)?;
        self.pending.drain(..included.min(self.pending.len()));
        info!("block #{} mined with {} transactions", index, included);
        Ok(index)
    }

    /// One complete mining cycle on this ledger.
    pub fn mine(&mut self) -> Result<MineOutcome> {
        let Some(mut candidate) = self.candidate() else {
            return Ok(MineOutcome::NothingPending);
        };
        let proof = pow::mine(&mut candidate.block, self.difficulty);
        self.commit(candidate, &proof).map(MineOutcome::Mined)
    }

    /// Replaces the block sequence wholesale when `chain` is strictly longer and valid.
    /// Returns whether the replacement happened.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> bool {
        if chain.len() <= self.blocks.len() || !check_chain_validity(&chain, self.difficulty) {
            return false;
        }
        info!(
            "replacing chain of {} blocks with chain of {} blocks",
            self.blocks.len(),
            chain.len()
        );
        self.blocks = chain;
        true
    }

    /// Adopts the blocks of `other`, keeping this ledger's pending pool.
    pub fn adopt(&mut self, other: Ledger) {
        self.blocks = other.blocks;
    }
}
