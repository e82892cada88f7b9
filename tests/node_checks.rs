//! Integration tests for the HTTP-backed checks
//!
//! Each test starts a handful of fake nodes serving the query API on
//! ephemeral ports and runs the checkers against them.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chaincheck::client::NodeClient;
use chaincheck::config::{Config, DumpSource};
use chaincheck::report::Outcome;
use chaincheck::{prefix, state, throughput, CheckError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
struct FakeNode {
    chain_tx: Vec<Vec<String>>,
    /// Longest chain block hashes, tip first as the node API lists them
    hashes: Vec<String>,
    states: HashMap<u64, Vec<String>>,
}

async fn longest_chain_tx(State(node): State<Arc<FakeNode>>) -> Json<Value> {
    Json(json!(node.chain_tx))
}

async fn longest_chain(State(node): State<Arc<FakeNode>>) -> Json<Value> {
    Json(json!(node.hashes))
}

async fn block_state(
    State(node): State<Arc<FakeNode>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let block = params.get("block").and_then(|b| b.parse::<u64>().ok());
    match block.and_then(|b| node.states.get(&b)) {
        Some(entries) => Json(json!(entries)),
        None => Json(json!({ "success": false, "message": "block count is too large" })),
    }
}

async fn spawn_node(node: FakeNode) -> String {
    let app = Router::new()
        .route("/blockchain/longest-chain-tx", get(longest_chain_tx))
        .route("/blockchain/longest-chain", get(longest_chain))
        .route("/blockchain/state", get(block_state))
        .with_state(Arc::new(node));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake node");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake node crashed");
    });
    format!("http://{}", addr)
}

async fn spawn_nodes(nodes: Vec<FakeNode>) -> Config {
    let mut urls = Vec::new();
    for node in nodes {
        urls.push(spawn_node(node).await);
    }
    Config {
        nodes: urls,
        ..Config::default()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn tx_chain(blocks: usize, per_block: usize) -> Vec<Vec<String>> {
    std::iter::once(Vec::new())
        .chain((1..blocks).map(|b| (0..per_block).map(|t| format!("tx{}_{}", b, t)).collect()))
        .collect()
}

fn state_node(h0: &[&str], h10: &[&str], h20: &[&str]) -> FakeNode {
    FakeNode {
        states: HashMap::from([(0, strings(h0)), (10, strings(h10)), (20, strings(h20))]),
        ..FakeNode::default()
    }
}

#[tokio::test]
async fn test_throughput_against_agreeing_nodes() {
    let node = FakeNode {
        chain_tx: tx_chain(51, 12),
        ..FakeNode::default()
    };
    let config = spawn_nodes(vec![node.clone(), node.clone(), node]).await;

    let report = throughput::run(&config).await.unwrap();

    let total = report.get("total_tx").unwrap();
    assert_eq!(total.outcome, Outcome::Info);
    assert_eq!(total.message, "node1: 600  node2: 600  node3: 600 | target >= 500");
    assert_eq!(
        report.get("avg_tx_per_block").unwrap().message,
        "node1: 12.00  node2: 12.00  node3: 12.00 | target >= 10 <= 500"
    );
    let first = report.get("first_tx_block_1").unwrap();
    assert_eq!(first.outcome, Outcome::Pass);
    assert!(first.message.contains("tx1_0"));
    assert!(report.passed());
}

#[tokio::test]
async fn test_throughput_detects_block_one_mismatch() {
    let agreeing = FakeNode {
        chain_tx: tx_chain(3, 2),
        ..FakeNode::default()
    };
    let forked = FakeNode {
        chain_tx: vec![vec![], strings(&["other", "tx1_1"]), strings(&["tx2_0"])],
        ..FakeNode::default()
    };
    let config = spawn_nodes(vec![agreeing.clone(), forked, agreeing]).await;

    let report = throughput::run(&config).await.unwrap();
    let first = report.get("first_tx_block_1").unwrap();
    assert_eq!(first.outcome, Outcome::Fail);
    assert_eq!(first.details, vec!["nodes 1&2, 2&3 disagree".to_string()]);
}

#[tokio::test]
async fn test_state_checks_pass_on_consistent_network() {
    let node = state_node(
        &["genesis:1000"],
        &["A:5", "B:3", "C:2"],
        &["C:2", "A:4", "B:3", "D:1"],
    );
    let config = spawn_nodes(vec![node.clone(), node.clone(), node]).await;

    let report = state::run(&config).await.unwrap();
    for name in [
        "ico_entries",
        "block0_consistent",
        "block10_consistent",
        "block20_consistent",
        "states_evolve",
        "min_entries",
    ] {
        assert_eq!(report.get(name).unwrap().outcome, Outcome::Pass, "{}", name);
    }
}

#[tokio::test]
async fn test_state_checks_ignore_entry_order() {
    let a = state_node(&["genesis:1000"], &["A:5", "B:3", "C:2"], &["A:4", "B:4", "C:2"]);
    let b = state_node(&["genesis:1000"], &["C:2", "B:3", "A:5"], &["C:2", "B:4", "A:4"]);
    let config = spawn_nodes(vec![a.clone(), b, a]).await;

    let report = state::run(&config).await.unwrap();
    assert!(report.passed());
}

#[tokio::test]
async fn test_state_divergence_reports_diff() {
    let good = state_node(&["genesis:1000"], &["A:5", "B:3", "C:2"], &["A:4", "B:4", "C:2"]);
    let bad = state_node(&["genesis:1000"], &["A:5", "B:3"], &["A:4", "B:4", "C:2"]);
    let config = spawn_nodes(vec![good.clone(), good, bad]).await;

    let report = state::run(&config).await.unwrap();
    assert!(!report.passed());
    let block10 = report.get("block10_consistent").unwrap();
    assert_eq!(block10.outcome, Outcome::Fail);
    assert_eq!(
        block10.details,
        vec![
            "DIF 1&3 = [\"C:2\"]".to_string(),
            "DIF 2&3 = [\"C:2\"]".to_string(),
        ]
    );
    assert_eq!(report.get("block20_consistent").unwrap().outcome, Outcome::Pass);
}

#[tokio::test]
async fn test_state_height_beyond_chain_is_fatal() {
    let node = state_node(&["genesis:1000"], &["A:5", "B:3", "C:2"], &["A:4", "B:4", "C:2"]);
    let mut config = spawn_nodes(vec![node.clone(), node.clone(), node]).await;
    config.state.heights = vec![0, 10, 99];

    let err = state::run(&config).await.unwrap_err();
    match err {
        CheckError::Node { endpoint, message } => {
            assert!(endpoint.ends_with("/blockchain/state?block=99"));
            assert_eq!(message, "block count is too large");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_unreachable_node_is_http_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = NodeClient::new(&format!("http://{}", addr), None).unwrap();
    let err = client.longest_chain_tx().await.unwrap_err();
    assert!(matches!(err, CheckError::Http(_)));
}

#[tokio::test]
async fn test_missing_route_is_node_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, Router::new()).await.unwrap();
    });

    let client = NodeClient::new(&format!("http://{}", addr), None).unwrap();
    let err = client.state_at(0).await.unwrap_err();
    match err {
        CheckError::Node { message, .. } => assert_eq!(message, "HTTP 404 Not Found"),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_prefix_from_node_hashes() {
    let full = FakeNode {
        hashes: strings(&["b2", "b1", "g"]),
        ..FakeNode::default()
    };
    let behind = FakeNode {
        hashes: strings(&["b1", "g"]),
        ..FakeNode::default()
    };
    let mut config = spawn_nodes(vec![full.clone(), behind, full]).await;
    config.dump.source = DumpSource::Nodes;

    let report = prefix::run(&config).await.unwrap();
    let result = report.get("prefix_diff").unwrap();
    assert_eq!(result.outcome, Outcome::Fail);
    assert_eq!(result.message, "1 (0 in shared prefix + 1 length)");
    assert_eq!(report.get("client2_length").unwrap().message, "num_nodes: 2");
}

#[tokio::test]
async fn test_longest_chain_is_returned_genesis_first() {
    let url = spawn_node(FakeNode {
        hashes: strings(&["b2", "b1", "g"]),
        ..FakeNode::default()
    })
    .await;
    let client = NodeClient::new(&url, None).unwrap();
    assert_eq!(client.longest_chain().await.unwrap(), strings(&["g", "b1", "b2"]));
}
