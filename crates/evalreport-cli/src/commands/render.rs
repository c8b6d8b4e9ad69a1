//! The `evalreport render` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use evalreport_core::layout::{sanitize_report_name, RESOURCES_DIR};
use evalreport_core::summary::EvaluationSummary;
use evalreport_core::traits::{ReportCompiler, ReportRequest};
use evalreport_report::config::load_config_from;
use evalreport_report::LatexReportCompiler;

pub async fn execute(
    summary_path: PathBuf,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let summary = EvaluationSummary::load_json(&summary_path)?;

    let stem = summary_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| summary.title.clone());
    let report_name = sanitize_report_name(&stem);

    let output_dir = output.unwrap_or_else(|| default_output_dir(&summary_path));

    let with_ids = summary.tracks_fail_ids();
    tracing::debug!(report = %report_name, with_ids, "rendering saved summary");

    let compiler = LatexReportCompiler::new(config);
    let artifact = compiler
        .compile(&ReportRequest {
            summary: &summary,
            output_dir: &output_dir,
            report_name: &report_name,
            with_ids,
        })
        .await
        .with_context(|| format!("failed to render {}", summary_path.display()))?;

    let counts = summary.counts();
    println!(
        "{}: {} tests, {} passed, {} failed",
        summary.title, counts.total, counts.passed, counts.failed
    );
    println!("Report ({}): {}", artifact.kind, artifact.path.display());

    Ok(())
}

/// The report directory a saved summary belongs to: the parent of its
/// `resources/` directory, or the summary's own directory otherwise.
fn default_output_dir(summary_path: &Path) -> PathBuf {
    let dir = summary_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    if dir.file_name().is_some_and(|name| name == RESOURCES_DIR) {
        dir.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf()
    } else {
        dir.to_path_buf()
    }
}
