mod helpers;

use helpers::{mine_posts, FixedRemote, Network, DIFFICULTY};
use ledger_core::{
    chain::{check_chain_validity, genesis_block, MineOutcome},
    LedgerError, NewTransaction,
};

#[tokio::test]
async fn test_register_with_adopts_remote_chain() -> anyhow::Result<()> {
    let network = Network::new();
    let a = network.spawn("127.0.0.1:8000");
    let b = network.spawn("127.0.0.1:8001");

    mine_posts(&a, "alice", 1).await;
    assert_eq!(a.chain_len().await, 2);
    assert_eq!(b.chain_len().await, 1);

    b.register_with(&network, "127.0.0.1:8000").await?;

    let a_chain = a.chain_snapshot().await;
    let b_chain = b.chain_snapshot().await;
    assert_eq!(b_chain.length, 2);
    assert_eq!(b_chain.chain, a_chain.chain);
    // Both sides now know each other.
    assert!(a.peers().contains("127.0.0.1:8001").await);
    assert!(b.peers().contains("127.0.0.1:8000").await);
    Ok(())
}

#[tokio::test]
async fn test_register_with_merges_peer_list() -> anyhow::Result<()> {
    let network = Network::new();
    let a = network.spawn("node-a:8000");
    let b = network.spawn("node-b:8000");
    let c = network.spawn("node-c:8000");

    b.register_with(&network, "node-a:8000").await?;
    c.register_with(&network, "node-a:8000").await?;

    // c learned about b through a, and never lists itself.
    let peers = c.peers().all().await;
    assert_eq!(peers, vec!["http://node-a:8000", "http://node-b:8000"]);
    assert_eq!(a.peers().len().await, 2);
    Ok(())
}

#[tokio::test]
async fn test_register_with_corrupt_chain_adopts_nothing() -> anyhow::Result<()> {
    let network = Network::new();
    let a = network.spawn("node-a:8000");
    mine_posts(&a, "alice", 3).await;
    let mut snapshot = a.chain_snapshot().await;
    snapshot.chain[2].transactions[0].content = "tampered".to_string();
    snapshot.peers.push("http://node-z:8000".to_string());

    let b = network.spawn("node-b:8000");
    mine_posts(&b, "bob", 1).await;
    b.peers().add("node-q:8000").await;
    let before = b.chain_snapshot().await;

    let err = b
        .register_with(&FixedRemote(snapshot), "node-a:8000")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::CorruptChain { position: 2, .. }));
    assert_eq!(b.chain_snapshot().await, before);
    Ok(())
}

#[tokio::test]
async fn test_register_with_unreachable_remote() {
    let network = Network::new();
    let b = network.spawn("node-b:8000");
    let err = b.register_with(&network, "node-x:8000").await.unwrap_err();
    assert!(matches!(err, LedgerError::PeerUnreachable { .. }));
    assert_eq!(b.chain_len().await, 1);
    assert!(b.peers().is_empty().await);
}

#[tokio::test]
async fn test_mine_and_announce_reaches_peers() -> anyhow::Result<()> {
    let network = Network::new();
    let a = network.spawn("node-a:8000");
    let b = network.spawn("node-b:8000");
    let c = network.spawn("node-c:8000");
    b.register_with(&network, "node-a:8000").await?;
    c.register_with(&network, "node-a:8000").await?;

    a.submit_transaction(NewTransaction::new("alice", "hello")).await?;
    assert_eq!(a.mine_and_announce(&network).await?, MineOutcome::Mined(1));

    let expected = a.chain_snapshot().await.chain;
    assert_eq!(b.chain_snapshot().await.chain, expected);
    assert_eq!(c.chain_snapshot().await.chain, expected);
    Ok(())
}

#[tokio::test]
async fn test_announce_survives_offline_peer() -> anyhow::Result<()> {
    let network = Network::new();
    let a = network.spawn("node-a:8000");
    let b = network.spawn("node-b:8000");
    let c = network.spawn("node-c:8000");
    b.register_with(&network, "node-a:8000").await?;
    c.register_with(&network, "node-a:8000").await?;
    network.set_offline("node-b:8000", true);

    a.submit_transaction(NewTransaction::new("alice", "hello")).await?;
    assert_eq!(a.mine_and_announce(&network).await?, MineOutcome::Mined(1));

    // The local append stands and c still received the block.
    assert_eq!(a.chain_len().await, 2);
    assert_eq!(b.chain_len().await, 1);
    assert_eq!(c.chain_len().await, 2);

    // Once back, b catches up through consensus.
    network.set_offline("node-b:8000", false);
    let resolution = b.resolve_conflicts(&network).await;
    assert!(resolution.replaced);
    assert_eq!(resolution.length, 2);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_forks_resolve_to_longest_chain() -> anyhow::Result<()> {
    let network = Network::new();
    let a = network.spawn("node-a:8000");
    let b = network.spawn("node-b:8000");
    b.register_with(&network, "node-a:8000").await?;

    // Both mine different transactions on the same genesis tip.
    a.submit_transaction(NewTransaction::new("alice", "from a")).await?;
    b.submit_transaction(NewTransaction::new("bob", "from b")).await?;
    let (ra, rb) = tokio::join!(a.trigger_mine(), b.trigger_mine());
    assert_eq!(ra?, MineOutcome::Mined(1));
    assert_eq!(rb?, MineOutcome::Mined(1));
    let b_block = b.block(1).await.unwrap();
    assert_ne!(a.block(1).await.unwrap(), b_block);

    // a broadcasts first; b already has its own block 1 so it rejects without overwriting.
    let a_block = a.block(1).await.unwrap();
    let report = a.announce(&network, &a_block).await;
    assert_eq!(report.failed, vec!["http://node-b:8000"]);
    assert_eq!(b.block(1).await.unwrap(), b_block);

    // Equal lengths: nobody replaces anything.
    assert!(!b.resolve_conflicts(&network).await.replaced);
    assert!(!a.resolve_conflicts(&network).await.replaced);

    // a extends its fork; b discards its block only through resolution.
    mine_posts(&a, "alice", 1).await;
    let resolution = b.resolve_conflicts(&network).await;
    assert!(resolution.replaced);
    assert_eq!(resolution.length, 3);
    assert_eq!(b.chain_snapshot().await.chain, a.chain_snapshot().await.chain);
    Ok(())
}

#[tokio::test]
async fn test_announced_block_accepted_when_tip_matches() -> anyhow::Result<()> {
    let network = Network::new();
    let a = network.spawn("node-a:8000");
    let b = network.spawn("node-b:8000");
    b.register_with(&network, "node-a:8000").await?;

    a.submit_transaction(NewTransaction::new("alice", "first")).await?;
    a.trigger_mine().await?;
    let block = a.block(1).await.unwrap();
    let report = a.announce(&network, &block).await;
    assert_eq!(report.delivered, vec!["http://node-b:8000"]);

    // b mines on top of the accepted block.
    b.submit_transaction(NewTransaction::new("bob", "second")).await?;
    assert_eq!(b.trigger_mine().await?, MineOutcome::Mined(2));
    let chain = b.chain_snapshot().await.chain;
    assert!(check_chain_validity(&chain, DIFFICULTY));
    Ok(())
}

#[tokio::test]
async fn test_resolution_never_shortens() -> anyhow::Result<()> {
    let network = Network::new();
    let a = network.spawn("node-a:8000");
    let b = network.spawn("node-b:8000");
    b.register_with(&network, "node-a:8000").await?;

    mine_posts(&b, "bob", 3).await;
    mine_posts(&a, "alice", 1).await;

    let before = b.chain_len().await;
    let resolution = b.resolve_conflicts(&network).await;
    assert!(!resolution.replaced);
    assert_eq!(resolution.length, before);

    let resolution = a.resolve_conflicts(&network).await;
    assert!(resolution.replaced);
    assert!(resolution.length >= 2);
    assert_eq!(a.chain_snapshot().await.chain, b.chain_snapshot().await.chain);
    Ok(())
}

#[tokio::test]
async fn test_resolution_ignores_tampered_longer_chain() -> anyhow::Result<()> {
    let a = helpers::Network::new().spawn("node-a:8000");
    mine_posts(&a, "alice", 1).await;

    let source = helpers::Network::new().spawn("node-z:8000");
    mine_posts(&source, "zed", 4).await;
    let mut forged = source.chain_snapshot().await;
    forged.chain[3].transactions[0].author = "mallory".to_string();

    a.peers().add("node-z:8000").await;
    let resolution = a.resolve_conflicts(&FixedRemote(forged)).await;
    assert!(!resolution.replaced);
    assert_eq!(resolution.length, 2);
    Ok(())
}

#[tokio::test]
async fn test_pending_survives_chain_replacement() -> anyhow::Result<()> {
    let network = Network::new();
    let a = network.spawn("node-a:8000");
    let b = network.spawn("node-b:8000");
    b.register_with(&network, "node-a:8000").await?;
    mine_posts(&a, "alice", 2).await;

    b.submit_transaction(NewTransaction::new("bob", "waiting")).await?;
    assert!(b.resolve_conflicts(&network).await.replaced);
    assert_eq!(b.pending_transactions().await.len(), 1);

    assert_eq!(b.trigger_mine().await?, MineOutcome::Mined(3));
    assert_eq!(b.chain_snapshot().await.chain[0], genesis_block());
    Ok(())
}
