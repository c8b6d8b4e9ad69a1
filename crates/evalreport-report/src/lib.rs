//! LaTeX report generation for evalreport.
//!
//! [`LatexReportCompiler`] implements the core crate's
//! [`ReportCompiler`] seam: it renders the summary as LaTeX source, writes it
//! next to the report's resources, and compiles it when a compiler is found.

pub mod builder;
pub mod compiler;
pub mod config;
pub mod document;
pub mod error;
pub mod latex;
pub mod preflight;

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

use evalreport_core::summary::EvaluationSummary;
use evalreport_core::traits::{ArtifactKind, ReportArtifact, ReportCompiler, ReportRequest};

use crate::config::ReportConfig;
use crate::latex::LatexRenderer;

/// Writes reports as LaTeX source and compiles them to PDF when possible.
#[derive(Debug, Clone)]
pub struct LatexReportCompiler {
    config: ReportConfig,
    search_path: Option<OsString>,
}

impl LatexReportCompiler {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            search_path: None,
        }
    }

    /// Look for compilers on `path` instead of `PATH`.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// LaTeX source for `summary`.
    pub fn render_source(&self, summary: &EvaluationSummary, with_ids: bool) -> String {
        let document = builder::build_document(summary, with_ids, &self.config);
        LatexRenderer::new(self.config.wrap_threshold).render(&document)
    }

    /// The first configured compiler that can be found, if any.
    pub fn locate_compiler(&self) -> Option<PathBuf> {
        self.config
            .compilers
            .iter()
            .find_map(|name| compiler::find_executable(name, self.search_path.as_deref()))
    }
}

#[async_trait]
impl ReportCompiler for LatexReportCompiler {
    async fn compile(&self, request: &ReportRequest<'_>) -> anyhow::Result<ReportArtifact> {
        tokio::fs::create_dir_all(request.output_dir)
            .await
            .with_context(|| format!("failed to create {}", request.output_dir.display()))?;

        let source = request
            .output_dir
            .join(format!("{}.tex", request.report_name));
        let tex = self.render_source(request.summary, request.with_ids);
        tokio::fs::write(&source, tex)
            .await
            .with_context(|| format!("failed to write {}", source.display()))?;

        let Some(program) = self.locate_compiler() else {
            tracing::warn!(
                compilers = ?self.config.compilers,
                "no LaTeX compiler found, leaving source only: {}",
                source.display()
            );
            return Ok(ReportArtifact {
                path: source,
                kind: ArtifactKind::Source,
            });
        };

        tracing::debug!(compiler = %program.display(), "compiling report");
        let pdf = compiler::compile(&program, &source).await?;
        Ok(ReportArtifact {
            path: pdf,
            kind: ArtifactKind::Compiled,
        })
    }
}
