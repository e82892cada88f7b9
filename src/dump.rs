//! Chain dumps: one comma-separated block hash listing per client

use std::io::{Read, Seek, SeekFrom};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{CheckError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDump {
    clients: Vec<Vec<String>>,
}

impl ChainDump {
    /// Parse dump output, one line per client. Only the first `expected`
    /// lines are kept; fewer than that is an error.
    pub fn parse(text: &str, expected: usize) -> Result<Self> {
        let chains = text.lines().map(split_line).collect();
        Self::from_chains(chains, expected)
    }

    pub fn from_chains(mut chains: Vec<Vec<String>>, expected: usize) -> Result<Self> {
        if chains.len() < expected {
            return Err(CheckError::TooFewClients {
                expected,
                found: chains.len(),
            });
        }
        chains.truncate(expected);
        Ok(Self { clients: chains })
    }

    pub fn clients(&self) -> &[Vec<String>] {
        &self.clients
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

fn split_line(line: &str) -> Vec<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Vec::new();
    }
    line.split(',').map(str::to_string).collect()
}

/// Run the dump command with stdout redirected to an anonymous temporary file
/// and return what it wrote. The file is removed when this returns.
pub async fn run_dump_command(program: &str, args: &[String]) -> Result<String> {
    let mut sink = tempfile::tempfile()?;
    info!(program, ?args, "running chain dump command");

    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(sink.try_clone()?)
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| CheckError::Command(format!("cannot run {}: {}", program, e)))?;

    if !status.success() {
        return Err(CheckError::Command(format!("{} exited with {}", program, status)));
    }

    sink.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    sink.read_to_end(&mut bytes)?;
    debug!(bytes = bytes.len(), "chain dump captured");

    Ok(String::from_utf8(bytes)?)
}
