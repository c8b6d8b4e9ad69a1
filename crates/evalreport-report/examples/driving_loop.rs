//! Driving loop example: a simulated train/test schedule feeding the engine.
//!
//! Declares one per-instance and one aggregate test, runs two epochs of
//! synthetic batches through the lifecycle hooks, and writes the report.
//!
//! ```bash
//! cargo run -p evalreport-report --example driving_loop
//! ```

use std::sync::Arc;

use evalreport_core::case::TestCase;
use evalreport_core::engine::{EngineConfig, EvaluationEngine, ExecutionMode, RunContext};
use evalreport_core::value::{Data, Value};
use evalreport_report::config::load_config;
use evalreport_report::LatexReportCompiler;

const BATCHES_PER_EPOCH: usize = 4;
const BATCH_SIZE: usize = 8;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cases = vec![
        TestCase::per_instance("confidence is above 0.2", ["confidence"], 3, |inputs| {
            let scores = inputs["confidence"].to_f64_vec().unwrap_or_default();
            Value::from(scores.iter().map(|s| *s > 0.2).collect::<Vec<_>>())
        })?,
        TestCase::aggregate("epoch accuracy is at least 0.8", ["accuracy"], |inputs| {
            Value::from(inputs["accuracy"].as_f64().unwrap_or(0.0) >= 0.8)
        })?,
    ];

    let compiler = Arc::new(LatexReportCompiler::new(load_config()?));
    let config = EngineConfig::new("evalreport-demo/demo.pdf")
        .with_title("Driving loop demo")
        .with_data_id("sample_id");
    let mut engine = EvaluationEngine::new(cases, config, compiler)?;

    let ctx = RunContext::new("Demo Run").with_data_keys(["confidence", "accuracy", "sample_id"]);

    // Each phase calls every hook; only the test phase accumulates anything.
    for mode in [ExecutionMode::Train, ExecutionMode::Test] {
        engine.run_begin(mode, &ctx)?;
        for epoch in 0..2 {
            let mut correct = 0;
            for batch in 0..BATCHES_PER_EPOCH {
                let data = synthetic_batch(epoch, batch);
                correct += count_correct(&data);
                engine.batch_end(mode, &data)?;
            }

            let mut epoch_data = Data::new();
            let total = (BATCHES_PER_EPOCH * BATCH_SIZE) as f64;
            epoch_data.insert("accuracy".into(), Value::from(correct as f64 / total));
            engine.epoch_end(mode, &epoch_data)?;
        }

        if let Some(outcome) = engine.run_end(mode).await? {
            let counts = outcome.summary.counts();
            println!(
                "{} tests, {} passed, {} failed",
                counts.total, counts.passed, counts.failed
            );
            println!("Summary: {}", outcome.summary_path.display());
            println!("Report ({}): {}", outcome.artifact.kind, outcome.artifact.path.display());
        }
    }

    Ok(())
}

/// Deterministic confidences in `[0, 1)` with a few low outliers.
fn synthetic_batch(epoch: usize, batch: usize) -> Data {
    let offset = (epoch * BATCHES_PER_EPOCH + batch) * BATCH_SIZE;
    let confidence: Vec<f64> = (0..BATCH_SIZE)
        .map(|i| ((offset + i) * 37 % 100) as f64 / 100.0)
        .collect();
    let ids: Vec<String> = (0..BATCH_SIZE)
        .map(|i| format!("e{epoch}_s{:03}", offset + i))
        .collect();

    let mut data = Data::new();
    data.insert("confidence".into(), Value::from(confidence));
    data.insert("sample_id".into(), Value::from(ids));
    data
}

fn count_correct(data: &Data) -> usize {
    data.get("confidence")
        .and_then(Value::to_f64_vec)
        .map(|scores| scores.iter().filter(|s| **s >= 0.5).count())
        .unwrap_or(0)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("evalreport=info".parse().unwrap()),
        )
        .init();
}
