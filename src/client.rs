//! HTTP client for the node query API
//!
//! Nodes answer successful queries with a bare JSON array and failed ones with
//! `{"success": false, "message": "..."}`; both shapes are handled here so the
//! checkers only ever see decoded data or a [`CheckError`].

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{CheckError, Result};
use crate::state::StateSnapshot;
use crate::throughput::TransactionChain;

pub const LONGEST_CHAIN_PATH: &str = "/blockchain/longest-chain";
pub const LONGEST_CHAIN_TX_PATH: &str = "/blockchain/longest-chain-tx";
pub const STATE_PATH: &str = "/blockchain/state";

#[derive(Debug, Deserialize)]
struct ApiFailure {
    success: bool,
    message: String,
}

#[derive(Debug, Clone)]
pub struct NodeClient {
    base_url: String,
    http: Client,
}

impl NodeClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: builder.build()?,
        })
    }

    /// One client per configured node, in configuration order
    pub fn from_config(config: &Config) -> Result<Vec<Self>> {
        let timeout = config.http.timeout_secs.map(Duration::from_secs);
        config
            .nodes
            .iter()
            .map(|base| Self::new(base, timeout))
            .collect()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Block hashes of the node's longest chain, genesis first. The node
    /// lists them tip first.
    pub async fn longest_chain(&self) -> Result<Vec<String>> {
        let mut hashes: Vec<String> = self.get_json(LONGEST_CHAIN_PATH).await?;
        hashes.reverse();
        Ok(hashes)
    }

    pub async fn longest_chain_tx(&self) -> Result<TransactionChain> {
        let blocks: Vec<Vec<String>> = self.get_json(LONGEST_CHAIN_TX_PATH).await?;
        Ok(TransactionChain::new(blocks))
    }

    pub async fn state_at(&self, height: u64) -> Result<StateSnapshot> {
        let path = format!("{}?block={}", STATE_PATH, height);
        let entries: Vec<serde_json::Value> = self.get_json(&path).await?;
        Ok(StateSnapshot::from_values(entries))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "querying node");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<T>(&body) {
            Ok(value) if status.is_success() => Ok(value),
            Ok(_) => Err(CheckError::Node {
                endpoint: url,
                message: format!("HTTP {}", status),
            }),
            Err(decode_err) => {
                if let Ok(failure) = serde_json::from_str::<ApiFailure>(&body) {
                    if !failure.success {
                        warn!(%url, message = %failure.message, "node rejected query");
                        return Err(CheckError::Node {
                            endpoint: url,
                            message: failure.message,
                        });
                    }
                }
                if !status.is_success() {
                    return Err(CheckError::Node {
                        endpoint: url,
                        message: format!("HTTP {}", status),
                    });
                }
                Err(CheckError::Decode(format!("{}: {}", url, decode_err)))
            }
        }
    }
}
