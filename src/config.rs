//! Configuration management for chaincheck
//!
//! Every field falls back to the value the devnet scripts used as a literal,
//! so an empty or missing config file checks the usual three local nodes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{CheckError, Result};

/// Config file read from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "chaincheck.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base URLs of the nodes under test, in reporting order. The first one is
    /// the reference node for single-node checks.
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub dump: DumpConfig,
    #[serde(default)]
    pub throughput: ThroughputConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Where the chain-prefix comparator gets its per-client chains from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpSource {
    /// Run an external command that prints one comma-separated line per client
    Command,
    /// Ask every configured node for its longest chain block hashes
    Nodes,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DumpConfig {
    pub source: DumpSource,
    pub program: String,
    pub args: Vec<String>,
    pub clients: usize,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            source: DumpSource::Command,
            program: "bash".to_string(),
            args: vec!["get_chain.sh".to_string()],
            clients: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThroughputConfig {
    pub min_total_tx: usize,
    pub min_avg_per_block: f64,
    pub max_avg_per_block: f64,
    pub min_unique_ratio: f64,
    /// Turn the targets into pass/fail checks instead of informational lines
    pub enforce_targets: bool,
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        Self {
            min_total_tx: 500,
            min_avg_per_block: 10.0,
            max_avg_per_block: 500.0,
            min_unique_ratio: 0.9,
            enforce_targets: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StateConfig {
    /// Heights to snapshot. The first one is treated as the ICO height.
    pub heights: Vec<u64>,
    pub ico_entries: usize,
    pub min_entries: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            heights: vec![0, 10, 20],
            ico_entries: 1,
            min_entries: 3,
        }
    }
}

impl StateConfig {
    pub fn ico_height(&self) -> Option<u64> {
        self.heights.first().copied()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout. Unset means requests wait indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            dump: DumpConfig::default(),
            throughput: ThroughputConfig::default(),
            state: StateConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes.len() < 2 {
            return Err(CheckError::Config(format!(
                "at least two nodes are needed for a comparison, got {}",
                self.nodes.len()
            )));
        }
        if let Some(node) = self.nodes.iter().find(|n| n.trim().is_empty()) {
            return Err(CheckError::Config(format!("invalid node url {:?}", node)));
        }
        if self.dump.clients < 2 {
            return Err(CheckError::Config(
                "dump.clients must be at least 2".to_string(),
            ));
        }
        if self.dump.source == DumpSource::Command && self.dump.program.trim().is_empty() {
            return Err(CheckError::Config(
                "dump.program must be set when dump.source = \"command\"".to_string(),
            ));
        }
        if self.state.heights.is_empty() {
            return Err(CheckError::Config(
                "state.heights must list at least one height".to_string(),
            ));
        }
        if self.throughput.min_avg_per_block > self.throughput.max_avg_per_block {
            return Err(CheckError::Config(format!(
                "throughput.min_avg_per_block ({}) is above max_avg_per_block ({})",
                self.throughput.min_avg_per_block, self.throughput.max_avg_per_block
            )));
        }
        Ok(())
    }
}

/// Load the configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] when it
/// exists, or fall back to the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_str = match path {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            CheckError::Config(format!("cannot read {}: {}", path.display(), e))
        })?,
        None => fs::read_to_string(DEFAULT_CONFIG_FILE).unwrap_or_default(),
    };

    if config_str.trim().is_empty() {
        let config = Config::default();
        config.validate()?;
        return Ok(config);
    }

    Config::from_toml_str(&config_str)
}

fn default_nodes() -> Vec<String> {
    vec![
        "http://127.0.0.1:7000".to_string(),
        "http://127.0.0.1:7001".to_string(),
        "http://127.0.0.1:7002".to_string(),
    ]
}
