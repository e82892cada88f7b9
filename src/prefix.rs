//! Chain-prefix comparator
//!
//! Measures how far the clients' chains agree: every index of the shared
//! prefix where not all clients hold the same hash counts once, and so does
//! every trailing block only some clients have.

use serde::Serialize;
use tracing::info;

use crate::client::NodeClient;
use crate::compare::{diverging_pairs, pair_label};
use crate::config::{Config, DumpSource};
use crate::dump::{run_dump_command, ChainDump};
use crate::error::Result;
use crate::report::{CheckResult, Report};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefixComparison {
    pub lengths: Vec<usize>,
    pub min_len: usize,
    pub max_len: usize,
    /// Indices in `[0, min_len)` where not all clients agree
    pub prefix_mismatches: usize,
    pub length_diff: usize,
    /// `prefix_mismatches + length_diff`
    pub divergence: usize,
    pub first_mismatch: Option<usize>,
    /// Client pairs that disagree at `first_mismatch`
    pub first_mismatch_pairs: Vec<(usize, usize)>,
}

impl PrefixComparison {
    pub fn compare(dump: &ChainDump) -> Self {
        let clients = dump.clients();
        let lengths: Vec<usize> = clients.iter().map(Vec::len).collect();
        let min_len = lengths.iter().copied().min().unwrap_or(0);
        let max_len = lengths.iter().copied().max().unwrap_or(0);

        let mut prefix_mismatches = 0;
        let mut first_mismatch = None;
        let mut first_mismatch_pairs = Vec::new();

        for i in 0..min_len {
            let column: Vec<&str> = clients.iter().map(|c| c[i].as_str()).collect();
            let pairs = diverging_pairs(&column);
            if pairs.is_empty() {
                continue;
            }
            prefix_mismatches += 1;
            if first_mismatch.is_none() {
                first_mismatch = Some(i);
                first_mismatch_pairs = pairs;
            }
        }

        let length_diff = max_len - min_len;
        Self {
            lengths,
            min_len,
            max_len,
            prefix_mismatches,
            length_diff,
            divergence: prefix_mismatches + length_diff,
            first_mismatch,
            first_mismatch_pairs,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.divergence == 0
    }

    pub fn to_report(&self) -> Report {
        let mut report = Report::new("Chain prefix comparison");

        for (idx, len) in self.lengths.iter().enumerate() {
            report.push(CheckResult::info(
                format!("client{}_length", idx + 1),
                format!("num_nodes: {}", len),
            ));
        }
        report.push(CheckResult::info(
            "length_diff",
            format!("{} (min {}, max {})", self.length_diff, self.min_len, self.max_len),
        ));

        let mut details = Vec::new();
        if let Some(idx) = self.first_mismatch {
            let pairs: Vec<String> = self
                .first_mismatch_pairs
                .iter()
                .copied()
                .map(pair_label)
                .collect();
            details.push(format!(
                "first disagreement at index {} between clients {}",
                idx,
                pairs.join(", ")
            ));
        }
        if self.length_diff > 0 {
            details.push(format!(
                "{} trailing block(s) are not held by every client",
                self.length_diff
            ));
        }

        report.push(
            CheckResult::check(
                "prefix_diff",
                self.is_consistent(),
                format!(
                    "{} ({} in shared prefix + {} length)",
                    self.divergence, self.prefix_mismatches, self.length_diff
                ),
            )
            .with_details(details),
        );
        report
    }
}

/// Build the chain dump from the configured source
pub async fn collect_dump(config: &Config) -> Result<ChainDump> {
    match config.dump.source {
        DumpSource::Command => {
            let text = run_dump_command(&config.dump.program, &config.dump.args).await?;
            ChainDump::parse(&text, config.dump.clients)
        }
        DumpSource::Nodes => {
            let mut chains = Vec::with_capacity(config.nodes.len());
            for client in NodeClient::from_config(config)? {
                chains.push(client.longest_chain().await?);
            }
            ChainDump::from_chains(chains, config.nodes.len())
        }
    }
}

pub async fn run(config: &Config) -> Result<Report> {
    let dump = collect_dump(config).await?;
    let comparison = PrefixComparison::compare(&dump);
    info!(
        divergence = comparison.divergence,
        lengths = ?comparison.lengths,
        "chain prefix comparison finished"
    );
    Ok(comparison.to_report())
}
