//! Transaction-throughput checker

use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

use crate::client::NodeClient;
use crate::compare::{all_agree, diverging_pairs, pair_label};
use crate::config::{Config, ThroughputConfig};
use crate::error::Result;
use crate::report::{CheckResult, Outcome, Report};

/// A node's longest chain as lists of transaction ids, genesis block first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TransactionChain {
    blocks: Vec<Vec<String>>,
}

impl TransactionChain {
    pub fn new(blocks: Vec<Vec<String>>) -> Self {
        Self { blocks }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn total_tx(&self) -> usize {
        self.blocks.iter().map(Vec::len).sum()
    }

    pub fn unique_tx(&self) -> usize {
        self.blocks
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Average over every block except genesis. `None` for chains that
    /// have nothing past genesis.
    pub fn avg_tx_per_block(&self) -> Option<f64> {
        if self.blocks.len() < 2 {
            return None;
        }
        Some(self.total_tx() as f64 / (self.blocks.len() - 1) as f64)
    }

    /// Distinct transaction ids over total transactions, in `[0, 1]`
    pub fn unique_ratio(&self) -> Option<f64> {
        let total = self.total_tx();
        if total == 0 {
            return None;
        }
        Some(self.unique_tx() as f64 / total as f64)
    }

    pub fn first_tx_of_block(&self, index: usize) -> Option<&str> {
        self.blocks
            .get(index)
            .and_then(|block| block.first())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainMetrics {
    pub node: String,
    pub blocks: usize,
    pub total_tx: usize,
    pub avg_tx_per_block: Option<f64>,
    pub unique_ratio: Option<f64>,
    pub first_tx_block_1: Option<String>,
}

impl ChainMetrics {
    pub fn from_chain(node: impl Into<String>, chain: &TransactionChain) -> Self {
        Self {
            node: node.into(),
            blocks: chain.block_count(),
            total_tx: chain.total_tx(),
            avg_tx_per_block: chain.avg_tx_per_block(),
            unique_ratio: chain.unique_ratio(),
            first_tx_block_1: chain.first_tx_of_block(1).map(str::to_string),
        }
    }
}

fn fmt_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "n/a".to_string(),
    }
}

fn per_node<F: Fn(&ChainMetrics) -> String>(metrics: &[ChainMetrics], f: F) -> String {
    metrics
        .iter()
        .enumerate()
        .map(|(idx, m)| format!("node{}: {}", idx + 1, f(m)))
        .collect::<Vec<_>>()
        .join("  ")
}

fn target_result(
    name: &str,
    enforce: bool,
    met: bool,
    values: String,
    target: String,
) -> CheckResult {
    let outcome = if enforce {
        Outcome::from_bool(met)
    } else {
        Outcome::Info
    };
    CheckResult::new(name, outcome, format!("{} | target {}", values, target))
}

/// Turn per-node metrics into a report. Targets only produce verdicts when
/// `enforce_targets` is set; the block-1 transaction always does.
pub fn evaluate(metrics: &[ChainMetrics], targets: &ThroughputConfig) -> Report {
    let mut report = Report::new("Transaction throughput");
    let enforce = targets.enforce_targets;

    report.push(CheckResult::info(
        "blocks",
        per_node(metrics, |m| m.blocks.to_string()),
    ));

    report.push(target_result(
        "total_tx",
        enforce,
        metrics.iter().all(|m| m.total_tx >= targets.min_total_tx),
        per_node(metrics, |m| m.total_tx.to_string()),
        format!(">= {}", targets.min_total_tx),
    ));

    report.push(target_result(
        "avg_tx_per_block",
        enforce,
        metrics.iter().all(|m| {
            m.avg_tx_per_block.map_or(false, |avg| {
                avg >= targets.min_avg_per_block && avg <= targets.max_avg_per_block
            })
        }),
        per_node(metrics, |m| fmt_ratio(m.avg_tx_per_block)),
        format!(
            ">= {} <= {}",
            targets.min_avg_per_block, targets.max_avg_per_block
        ),
    ));

    report.push(target_result(
        "unique_tx_ratio",
        enforce,
        metrics
            .iter()
            .all(|m| m.unique_ratio.map_or(false, |r| r >= targets.min_unique_ratio)),
        per_node(metrics, |m| fmt_ratio(m.unique_ratio)),
        format!(">= {}", targets.min_unique_ratio),
    ));

    report.push(first_tx_result(metrics));
    report
}

fn first_tx_result(metrics: &[ChainMetrics]) -> CheckResult {
    let values = per_node(metrics, |m| {
        m.first_tx_block_1
            .clone()
            .unwrap_or_else(|| "<none>".to_string())
    });

    let missing: Vec<String> = metrics
        .iter()
        .enumerate()
        .filter(|(_, m)| m.first_tx_block_1.is_none())
        .map(|(idx, _)| format!("node{}", idx + 1))
        .collect();
    if !missing.is_empty() {
        return CheckResult::check("first_tx_block_1", false, format!("NOT EQUAL! {}", values))
            .with_details(vec![format!(
                "block 1 has no transactions on {}",
                missing.join(", ")
            )]);
    }

    let firsts: Vec<&Option<String>> = metrics.iter().map(|m| &m.first_tx_block_1).collect();
    if all_agree(&firsts) {
        return CheckResult::check("first_tx_block_1", true, format!("EQUAL! {}", values));
    }

    let pairs: Vec<String> = diverging_pairs(&firsts)
        .into_iter()
        .map(pair_label)
        .collect();
    CheckResult::check("first_tx_block_1", false, format!("NOT EQUAL! {}", values)).with_details(
        vec![format!("nodes {} disagree", pairs.join(", "))],
    )
}

pub async fn run(config: &Config) -> Result<Report> {
    let mut metrics = Vec::with_capacity(config.nodes.len());
    for client in NodeClient::from_config(config)? {
        let chain = client.longest_chain_tx().await?;
        let m = ChainMetrics::from_chain(client.base_url(), &chain);
        info!(
            node = %m.node,
            blocks = m.blocks,
            total_tx = m.total_tx,
            "fetched longest chain"
        );
        metrics.push(m);
    }
    Ok(evaluate(&metrics, &config.throughput))
}
