//! Structured check results and their text / JSON rendering

use chrono::Utc;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    /// Reported value with no pass/fail verdict attached
    Info,
}

impl Outcome {
    pub fn from_bool(passed: bool) -> Self {
        if passed {
            Outcome::Pass
        } else {
            Outcome::Fail
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Pass => "SUCCESS",
            Outcome::Fail => "FAILURE",
            Outcome::Info => "INFO",
        }
    }

    fn color(&self) -> TableColor {
        match self {
            Outcome::Pass => TableColor::Green,
            Outcome::Fail => TableColor::Red,
            Outcome::Info => TableColor::Cyan,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub outcome: Outcome,
    pub message: String,
    /// Diagnostic lines shown under the summary table, e.g. state diffs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, outcome: Outcome, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn check(name: impl Into<String>, passed: bool, message: impl Into<String>) -> Self {
        Self::new(name, Outcome::from_bool(passed), message)
    }

    pub fn info(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, Outcome::Info, message)
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn failed(&self) -> bool {
        self.outcome == Outcome::Fail
    }
}

/// All results of one checker run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub title: String,
    pub results: Vec<CheckResult>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: CheckResult) {
        self.results.push(result);
    }

    pub fn passed(&self) -> bool {
        !self.results.iter().any(CheckResult::failed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| r.failed())
    }

    pub fn get(&self, name: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", self.title.bright_cyan().bold()));

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Check")
                    .fg(TableColor::Cyan)
                    .add_attribute(Attribute::Bold),
                Cell::new("Result")
                    .fg(TableColor::Cyan)
                    .add_attribute(Attribute::Bold),
                Cell::new("Details")
                    .fg(TableColor::Cyan)
                    .add_attribute(Attribute::Bold),
            ]);

        for result in &self.results {
            table.add_row(vec![
                Cell::new(&result.name).fg(TableColor::White),
                Cell::new(result.outcome.label()).fg(result.outcome.color()),
                Cell::new(&result.message).fg(TableColor::White),
            ]);
        }
        out.push_str(&format!("{}\n", table));

        for result in self.results.iter().filter(|r| !r.details.is_empty()) {
            out.push_str(&format!("{}\n", format!("{}:", result.name).yellow()));
            for line in &result.details {
                out.push_str(&format!("  {}\n", line));
            }
        }

        let failed = self.failures().count();
        let verdicts = self
            .results
            .iter()
            .filter(|r| r.outcome != Outcome::Info)
            .count();
        if failed == 0 {
            out.push_str(&format!(
                "{}\n",
                format!("SUCCESS: {} of {} checks passed", verdicts, verdicts)
                    .green()
                    .bold()
            ));
        } else {
            out.push_str(&format!(
                "{}\n",
                format!("FAILURE: {} of {} checks failed", failed, verdicts)
                    .red()
                    .bold()
            ));
        }
        out
    }
}

/// A checker that stopped on a fatal error before producing a report
#[derive(Debug, Clone, Serialize)]
pub struct Aborted {
    pub checker: String,
    pub error: String,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    generated_at: String,
    passed: bool,
    reports: &'a [Report],
    #[serde(skip_serializing_if = "<[Aborted]>::is_empty")]
    aborted: &'a [Aborted],
}

/// Machine-readable rendering of a whole run. Any aborted checker makes the
/// run fail.
pub fn render_json(reports: &[Report], aborted: &[Aborted]) -> Result<String> {
    let output = JsonOutput {
        generated_at: Utc::now().to_rfc3339(),
        passed: aborted.is_empty() && reports.iter().all(Report::passed),
        reports,
        aborted,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Process exit code for a finished run: 0 when everything passed, 1 otherwise
pub fn exit_code(reports: &[Report]) -> i32 {
    if reports.iter().all(Report::passed) {
        0
    } else {
        1
    }
}
