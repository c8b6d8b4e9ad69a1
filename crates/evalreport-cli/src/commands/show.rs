//! The `evalreport show` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use evalreport_core::summary::{EvaluationSummary, TestResult};

pub fn execute(summary_path: PathBuf) -> Result<()> {
    let summary = EvaluationSummary::load_json(&summary_path)?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Type", "Description", "Result", "Detail"]);

    for (i, test) in summary.tests.iter().enumerate() {
        let detail = match test {
            TestResult::PerInstance {
                fail_threshold,
                fail_number,
                ..
            } => format!("{fail_number} failed (<= {fail_threshold} allowed)"),
            TestResult::Aggregate { inputs, .. } => inputs
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(", "),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(test.test_type()),
            Cell::new(test.description()),
            Cell::new(if test.passed() { "PASS" } else { "FAIL" }),
            Cell::new(detail),
        ]);
    }

    let counts = summary.counts();
    println!("{} ({})", summary.title, summary.timestamp);
    println!("{table}");
    println!(
        "{} tests, {} passed, {} failed in {:.2}s",
        counts.total, counts.passed, counts.failed, summary.execution_time_seconds
    );

    Ok(())
}
