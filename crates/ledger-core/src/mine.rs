use crate::{constants::NONCES_PER_BATCH, digest, pow::meets_difficulty, Block, Hash};
use rayon::prelude::*;
use tracing::info;

/// Mines a block by searching nonces in parallel, batch by batch, until a digest has at
/// least `difficulty` leading zero hex digits.
///
/// Within each batch `find_first` keeps the lowest satisfying nonce, so the result is the
/// same nonce and hash that [`crate::pow::mine`] finds by counting up from zero.
pub fn mine_parallel(block: &mut Block, difficulty: u32) -> Hash {
    // The template is only read by the workers; each attempt clones it and varies the nonce.
    let template = block.clone();

    let mut start = 0u64;
    let found = loop {
        let end = start.saturating_add(NONCES_PER_BATCH);
        let hit = (start..end).into_par_iter().find_first(|nonce| {
            let mut attempt = template.clone();
            attempt.nonce = *nonce;
            meets_difficulty(&digest(&attempt), difficulty)
        });
        if let Some(nonce) = hit {
            break nonce;
        }
        assert!(end < u64::MAX, "nonce space exhausted (practically impossible)");
        start = end;
    };

    block.nonce = found;
    let hash = digest(block);
    info!(
        "Mined block {} with nonce {} and hash {}",
        block.index, found, hash
    );
    hash
}
