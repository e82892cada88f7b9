//! End-to-end tests for the `chaincheck` binary using the command dump source

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn config_with_dump(script: &str) -> NamedTempFile {
    config_with_nodes_and_dump(None, script)
}

fn config_with_nodes_and_dump(nodes: Option<&[String]>, script: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    if let Some(nodes) = nodes {
        writeln!(file, "nodes = {:?}", nodes).unwrap();
        writeln!(file, "[state]\nheights = [0]").unwrap();
    }
    writeln!(
        file,
        "[dump]\nsource = \"command\"\nprogram = \"sh\"\nargs = [\"-c\", {:?}]",
        script
    )
    .unwrap();
    file
}

/// Base URLs of ports that nothing listens on
fn closed_ports(count: usize) -> Vec<String> {
    let listeners: Vec<std::net::TcpListener> = (0..count)
        .map(|_| std::net::TcpListener::bind("127.0.0.1:0").unwrap())
        .collect();
    listeners
        .iter()
        .map(|l| format!("http://{}", l.local_addr().unwrap()))
        .collect()
}

fn chaincheck(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chaincheck"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("run chaincheck")
}

#[test]
fn test_prefix_identical_chains_exit_zero() {
    let config = config_with_dump("printf 'a,b,c\\na,b,c\\na,b,c\\n'");
    let out = chaincheck(&["--config", config.path().to_str().unwrap(), "prefix"]);

    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("prefix_diff"));
    assert!(stdout.contains("num_nodes: 3"));
}

#[test]
fn test_prefix_divergence_exit_one_json() {
    let config = config_with_dump("printf 'h1,h2,h3\\nh1,h2\\nh1,h2,h3\\n'");
    let out = chaincheck(&["--config", config.path().to_str().unwrap(), "--json", "prefix"]);

    assert_eq!(out.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json output");
    assert_eq!(json["passed"], false);
    let results = json["reports"][0]["results"].as_array().unwrap();
    let prefix = results
        .iter()
        .find(|r| r["name"] == "prefix_diff")
        .expect("prefix_diff result");
    assert_eq!(prefix["outcome"], "fail");
    assert_eq!(prefix["message"], "1 (0 in shared prefix + 1 length)");
}

#[test]
fn test_short_dump_is_fatal() {
    let config = config_with_dump("printf 'a,b\\na,b\\n'");
    let out = chaincheck(&["--config", config.path().to_str().unwrap(), "prefix"]);

    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Expected 3 clients in chain dump, found 2"));
}

#[test]
fn test_invalid_config_is_fatal() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "nodes = [\"http://127.0.0.1:7000\"]").unwrap();
    let out = chaincheck(&["--config", file.path().to_str().unwrap(), "state"]);

    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Configuration error"));
}

#[test]
fn test_aborted_check_fails_json_output() {
    let config = config_with_dump("printf 'a,b\\n'");
    let out = chaincheck(&["--config", config.path().to_str().unwrap(), "--json", "prefix"]);

    assert_eq!(out.status.code(), Some(2));
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json output");
    assert_eq!(json["passed"], false);
    assert_eq!(json["reports"].as_array().unwrap().len(), 0);
    assert_eq!(json["aborted"][0]["checker"], "prefix");
    assert_eq!(
        json["aborted"][0]["error"],
        "Expected 3 clients in chain dump, found 1"
    );
}

#[test]
fn test_all_keeps_going_after_fatal_errors() {
    let nodes = closed_ports(3);
    let config = config_with_nodes_and_dump(Some(&nodes), "printf 'a,b\\na,b\\na,b\\n'");
    let out = chaincheck(&["--config", config.path().to_str().unwrap(), "all"]);

    assert_eq!(out.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Chain prefix comparison"));
    assert!(stdout.contains("prefix_diff"));

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("throughput check aborted"));
    assert!(stderr.contains("state check aborted"));
    assert!(!stderr.contains("prefix check aborted"));
}
