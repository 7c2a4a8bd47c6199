//! Clone reconciliation across runs, driven from hardhat-style artifacts on
//! disk and persisted state files.

use alloy_primitives::{Address, Bytes};
use demine_core::chain::mock::MockChain;
use demine_core::contracts::diamond;
use demine_core::{
    ensure_cloned, CloneRequest, HardhatDeployments, Network, Reconciliation, Registry,
    StaleReason, StateStore,
};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn write_artifact(root: &Path, name: &str, address: Address) {
    let dir = root.join("bscdev");
    std::fs::create_dir_all(&dir).unwrap();
    let body = json!({ "address": address, "abi": [] });
    std::fs::write(dir.join(format!("{}.json", name)), body.to_string()).unwrap();
}

fn request(registry: &HardhatDeployments, admin: Address) -> CloneRequest {
    CloneRequest {
        key: "nft".to_string(),
        source: registry.address("Diamond").unwrap(),
        fallback: registry.address("ERC1155Facet").unwrap(),
        owner: admin,
        sender: admin,
        facet_cuts: vec![],
        init_data: Bytes::new(),
    }
}

#[tokio::test]
async fn test_facet_redeploy_triggers_one_reclone() {
    let deployments = TempDir::new().unwrap();
    let state_dir = TempDir::new().unwrap();
    let chain = MockChain::with_named_accounts();
    let admin = chain.account(1);

    write_artifact(deployments.path(), "Diamond", Address::repeat_byte(0xd0));
    write_artifact(deployments.path(), "ERC1155Facet", Address::repeat_byte(0xe1));
    let registry = HardhatDeployments::new(deployments.path(), Network::BscDev);
    let store = StateStore::new(state_dir.path(), Network::BscDev);

    chain.push_clone_target(Address::repeat_byte(0xa1));
    let mut state = store.load("btc").await.unwrap();
    let first = ensure_cloned(&chain, &mut state, &request(&registry, admin)).await.unwrap();
    assert_eq!(first, Address::repeat_byte(0xa1));

    // a fresh process sees the persisted record
    let mut state = store.load("btc").await.unwrap();
    let second = ensure_cloned(&chain, &mut state, &request(&registry, admin)).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(chain.sent_count(), 1);

    write_artifact(deployments.path(), "ERC1155Facet", Address::repeat_byte(0xe9));
    let state = store.load("btc").await.unwrap();
    let req = request(&registry, admin);
    assert_eq!(
        Reconciliation::of(&state, "nft", req.source, req.fallback),
        Reconciliation::Stale(StaleReason::FallbackChanged {
            recorded: Address::repeat_byte(0xe1),
            intended: Address::repeat_byte(0xe9),
        })
    );

    chain.push_clone_target(Address::repeat_byte(0xa2));
    let mut state = store.load("btc").await.unwrap();
    let third = ensure_cloned(&chain, &mut state, &req).await.unwrap();
    assert_eq!(third, Address::repeat_byte(0xa2));
    assert_eq!(chain.sent_of::<diamond::cloneCall>().len(), 2);

    let record = store.load("btc").await.unwrap().get("nft").cloned().unwrap();
    assert_eq!(record.fallback, Address::repeat_byte(0xe9));
    assert_eq!(record.target, Some(Address::repeat_byte(0xa2)));
    assert!(record.tx_receipt.is_some());
}

#[tokio::test]
async fn test_state_lives_under_network_directory() {
    let state_dir = TempDir::new().unwrap();
    let chain = MockChain::with_named_accounts();
    let store = StateStore::new(state_dir.path(), Network::Localhost);
    let admin = chain.account(1);

    let mut state = store.load("eth").await.unwrap();
    let req = CloneRequest {
        key: "wrappedETH".to_string(),
        source: Address::repeat_byte(0xd0),
        fallback: Address::repeat_byte(0xe2),
        owner: admin,
        sender: admin,
        facet_cuts: vec![],
        init_data: Bytes::new(),
    };
    ensure_cloned(&chain, &mut state, &req).await.unwrap();

    let path = state_dir.path().join("localhost").join("eth.json");
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert!(saved["wrappedETH"]["target"].is_string());
    assert!(saved["wrappedETH"]["txReceipt"]["transactionHash"].is_string());
}
