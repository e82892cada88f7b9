#![forbid(unsafe_code)]
//! Consistency checks against a running three-node devnet

use chaincheck::config::{load_config, Config};
use chaincheck::report::{exit_code, render_json, Aborted, Report};
use chaincheck::{prefix, state, throughput, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const EXIT_FATAL: i32 = 2;

#[derive(Parser)]
#[command(name = "chaincheck", version, about = "Cross-node consistency checks for a local devnet")]
struct Cli {
    /// Config file (defaults to ./chaincheck.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the reports as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare per-client chain dumps for prefix divergence
    Prefix,
    /// Compare transaction counts on every node's longest chain
    Throughput,
    /// Compare account state snapshots across nodes and heights
    State,
    /// Run every check in turn
    All,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Checker {
    Prefix,
    Throughput,
    State,
}

impl Checker {
    fn name(&self) -> &'static str {
        match self {
            Checker::Prefix => "prefix",
            Checker::Throughput => "throughput",
            Checker::State => "state",
        }
    }

    async fn run(&self, config: &Config) -> Result<Report> {
        match self {
            Checker::Prefix => prefix::run(config).await,
            Checker::Throughput => throughput::run(config).await,
            Checker::State => state::run(config).await,
        }
    }
}

fn selected(command: &Commands) -> Vec<Checker> {
    match command {
        Commands::Prefix => vec![Checker::Prefix],
        Commands::Throughput => vec![Checker::Throughput],
        Commands::State => vec![Checker::State],
        Commands::All => vec![Checker::Prefix, Checker::Throughput, Checker::State],
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format!("❌ {}", e).red().bold());
            std::process::exit(EXIT_FATAL);
        }
    };

    let mut reports = Vec::new();
    let mut aborted = Vec::new();

    for checker in selected(&cli.command) {
        match checker.run(&config).await {
            Ok(report) => {
                if !cli.json {
                    println!("{}", report.render_text());
                }
                reports.push(report);
            }
            Err(e) => {
                debug!(checker = checker.name(), error = %e, "check aborted");
                eprintln!(
                    "{}",
                    format!("❌ {} check aborted: {}", checker.name(), e)
                        .red()
                        .bold()
                );
                aborted.push(Aborted {
                    checker: checker.name().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    let mut fatal = !aborted.is_empty();
    if cli.json {
        match render_json(&reports, &aborted) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("{}", format!("❌ {}", e).red().bold());
                fatal = true;
            }
        }
    }

    let code = if fatal {
        EXIT_FATAL
    } else {
        exit_code(&reports)
    };
    std::process::exit(code);
}
