//! chaincheck - cross-node consistency checks for a local blockchain devnet
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Checkers
//! - [`prefix`] - Chain-prefix comparison over a chain dump
//! - [`throughput`] - Transaction counts and uniqueness per node
//! - [`state`] - Account-state agreement across nodes and heights
//!
//! ## Inputs
//! - [`client`] - HTTP client for the node query API
//! - [`dump`] - Chain dump parsing and the dump subprocess
//!
//! ## Results
//! - [`compare`] - Pairwise comparison helpers
//! - [`report`] - Check results, text and JSON rendering
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Checkers
// ============================================================================
pub mod prefix;
pub mod state;
pub mod throughput;

// ============================================================================
// Inputs
// ============================================================================
pub mod client;
pub mod dump;

// ============================================================================
// Results
// ============================================================================
pub mod compare;
pub mod report;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;

pub use error::{CheckError, Result};
