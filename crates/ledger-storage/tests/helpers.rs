#![allow(dead_code)]

use std::fs;

use ledger_core::{chain::Ledger, consensus::ChainSnapshot, NewTransaction};
use ledger_storage::sled_store::SledStore;
use tempfile::{tempdir, TempDir};

pub const DIFFICULTY: u32 = 1;

pub fn create_temp_store() -> (TempDir, SledStore) {
    // Create a temporary directory for the sled database
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().to_path_buf();
    (
        temp_dir,
        SledStore::open(db_path.to_str().unwrap()).expect("Failed to open SledStore"),
    )
}

pub fn teardown_store(temp_dir: TempDir, store: SledStore) {
    let db_path = temp_dir.path().to_path_buf();
    store.clear().expect("Failed to clear the store");
    drop(store);
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    assert!(!db_path.exists(), "Database directory should be removed");
}

/// A valid snapshot with `blocks` mined blocks after genesis.
pub fn mined_snapshot(blocks: usize) -> ChainSnapshot {
    let mut ledger = Ledger::new(DIFFICULTY);
    for i in 0..blocks {
        ledger
            .add_transaction(NewTransaction::new(format!("author-{i}"), format!("post {i}")))
            .unwrap();
        ledger.mine().unwrap();
    }
    ChainSnapshot::new(
        ledger.blocks().to_vec(),
        vec!["http://127.0.0.1:8001".to_string()],
    )
}
