//! Trait seam between the evaluation engine and report generation.
//!
//! Implemented by the `evalreport-report` crate.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::summary::EvaluationSummary;

/// Renders a finalized summary into a document on disk.
#[async_trait]
pub trait ReportCompiler: Send + Sync {
    /// Write the report for `request` and return the final artifact.
    async fn compile(&self, request: &ReportRequest<'_>) -> anyhow::Result<ReportArtifact>;
}

/// Everything a compiler needs to produce one report.
#[derive(Debug, Clone, Copy)]
pub struct ReportRequest<'a> {
    pub summary: &'a EvaluationSummary,
    /// Directory the document is written into.
    pub output_dir: &'a Path,
    /// Sanitized report name, used as the document file stem.
    pub report_name: &'a str,
    /// Whether per-instance results carry failing instance ids.
    pub with_ids: bool,
}

/// Whether the final artifact is the document source or a compiled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Source,
    Compiled,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Source => write!(f, "source only"),
            ArtifactKind::Compiled => write!(f, "compiled"),
        }
    }
}

/// The document a report run ended with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}
