//! State-consistency checker
//!
//! Snapshots every node's account state at a handful of heights and checks
//! that the nodes agree at each height, that state actually changes over the
//! chain, and that it grows past the initial distribution.

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::client::NodeClient;
use crate::compare::{all_agree, diverging_pairs, pair_label, symmetric_difference};
use crate::config::{Config, StateConfig};
use crate::error::Result;
use crate::report::{CheckResult, Report};

/// Account entries of one node at one height, kept sorted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StateSnapshot {
    entries: Vec<String>,
}

impl StateSnapshot {
    pub fn new(mut entries: Vec<String>) -> Self {
        entries.sort();
        Self { entries }
    }

    /// Entries are opaque: strings are taken verbatim, anything else in its
    /// compact JSON form.
    pub fn from_values(values: Vec<Value>) -> Self {
        let entries = values
            .into_iter()
            .map(|value| match value {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
        Self::new(entries)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every node's snapshot at one height, in node order
#[derive(Debug, Clone)]
pub struct HeightSnapshots {
    pub height: u64,
    pub snapshots: Vec<StateSnapshot>,
}

impl HeightSnapshots {
    fn reference(&self) -> Option<&StateSnapshot> {
        self.snapshots.first()
    }
}

pub fn evaluate(heights: &[HeightSnapshots], config: &StateConfig) -> Report {
    let mut report = Report::new("State consistency");

    if let Some(ico) = heights.first() {
        report.push(ico_result(ico, config.ico_entries));
    }
    for at_height in heights {
        report.push(cross_node_result(at_height));
    }
    report.push(evolution_result(heights));
    report.push(cardinality_result(heights, config.min_entries));
    report
}

fn ico_result(ico: &HeightSnapshots, expected: usize) -> CheckResult {
    let counts: Vec<String> = ico
        .snapshots
        .iter()
        .enumerate()
        .map(|(idx, s)| format!("node{}: {}", idx + 1, s.len()))
        .collect();
    let passed = ico.snapshots.iter().all(|s| s.len() == expected);
    let message = if passed {
        format!("ICO states only contain {} entry", expected)
    } else {
        format!(
            "ICO states at block {} should contain {} entry ({})",
            ico.height,
            expected,
            counts.join("  ")
        )
    };
    CheckResult::check("ico_entries", passed, message)
}

fn cross_node_result(at_height: &HeightSnapshots) -> CheckResult {
    let name = format!("block{}_consistent", at_height.height);
    let pairs = diverging_pairs(&at_height.snapshots);
    if pairs.is_empty() {
        return CheckResult::check(
            name,
            true,
            format!(
                "states are the same for all {} nodes in block {}",
                at_height.snapshots.len(),
                at_height.height
            ),
        );
    }

    let details = pairs
        .iter()
        .map(|&(i, j)| {
            let diff = symmetric_difference(
                at_height.snapshots[i].entries(),
                at_height.snapshots[j].entries(),
            );
            format!("DIF {} = {:?}", pair_label((i, j)), diff)
        })
        .collect();
    CheckResult::check(
        name,
        false,
        format!("states differ between nodes in block {}", at_height.height),
    )
    .with_details(details)
}

fn evolution_result(heights: &[HeightSnapshots]) -> CheckResult {
    let reference: Vec<&StateSnapshot> = heights.iter().filter_map(|h| h.reference()).collect();
    if reference.len() < 2 {
        return CheckResult::info(
            "states_evolve",
            "needs at least two heights to compare",
        );
    }

    if all_agree(&reference) {
        CheckResult::check(
            "states_evolve",
            false,
            "states should evolve: node1 reports the same state at every height",
        )
    } else {
        CheckResult::check("states_evolve", true, "states evolve across blocks")
    }
}

fn cardinality_result(heights: &[HeightSnapshots], min_entries: usize) -> CheckResult {
    let later: Vec<(u64, usize)> = heights
        .iter()
        .skip(1)
        .filter_map(|h| h.reference().map(|s| (h.height, s.len())))
        .collect();
    if later.is_empty() {
        return CheckResult::info(
            "min_entries",
            "no heights after the ICO height configured",
        );
    }

    let summary = later
        .iter()
        .map(|(height, len)| format!("block{}: {}", height, len))
        .collect::<Vec<_>>()
        .join("  ");
    let passed = later.iter().all(|&(_, len)| len >= min_entries);
    CheckResult::check(
        "min_entries",
        passed,
        format!("node1 {} | target >= {}", summary, min_entries),
    )
}

pub async fn run(config: &Config) -> Result<Report> {
    let clients = NodeClient::from_config(config)?;
    let mut heights = Vec::with_capacity(config.state.heights.len());

    for &height in &config.state.heights {
        let mut snapshots = Vec::with_capacity(clients.len());
        for client in &clients {
            let snapshot = client.state_at(height).await?;
            info!(
                node = client.base_url(),
                height,
                entries = snapshot.len(),
                "fetched state snapshot"
            );
            snapshots.push(snapshot);
        }
        heights.push(HeightSnapshots { height, snapshots });
    }

    Ok(evaluate(&heights, &config.state))
}
