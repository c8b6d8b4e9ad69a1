//! Output directory layout and report naming.

use std::path::{Component, Path, PathBuf};

use crate::error::EvalError;

/// Suffix appended to every sanitized report name.
const REPORT_SUFFIX: &str = "_test_report";

/// Subdirectory of the report directory holding the JSON summary.
pub const RESOURCES_DIR: &str = "resources";

/// Name used when nothing usable survives sanitization.
const FALLBACK_NAME: &str = "test_report";

/// Turn a run identifier into a filesystem-safe report name.
///
/// The name is lowercased, spaces become `_`, anything that is not
/// alphanumeric, a space or `_` is dropped, trailing `_` are stripped, runs of
/// `_` collapse to one, and `_test_report` is appended. Names that already
/// carry the suffix are left alone, so sanitizing twice changes nothing.
///
/// Lowercasing comes first: some lowercase mappings expand into combining
/// marks (`İ` becomes `i\u{307}`), which the filter must still see.
pub fn sanitize_report_name(name: &str) -> String {
    let kept: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    let lowered = kept.trim_end_matches('_');

    let mut slug = String::with_capacity(lowered.len() + REPORT_SUFFIX.len());
    for c in lowered.chars() {
        if c == '_' && slug.ends_with('_') {
            continue;
        }
        slug.push(c);
    }

    if slug.is_empty() || slug == FALLBACK_NAME {
        FALLBACK_NAME.to_string()
    } else if slug.ends_with(REPORT_SUFFIX) {
        slug
    } else {
        slug + REPORT_SUFFIX
    }
}

/// Where a run writes its artifacts.
///
/// For a save path of `/out/nightly.pdf` everything lands in `/out/nightly/`:
/// the document at its top level and the JSON summary under `resources/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    report_dir: PathBuf,
    resources_dir: PathBuf,
}

impl OutputLayout {
    /// Resolve `save_path` and create the report and resources directories.
    pub fn create(save_path: &Path) -> Result<Self, EvalError> {
        let layout = Self::resolve(save_path)?;
        std::fs::create_dir_all(&layout.resources_dir)?;
        tracing::debug!(dir = %layout.report_dir.display(), "created report directory");
        Ok(layout)
    }

    /// Resolve the directories without touching the filesystem.
    pub fn resolve(save_path: &Path) -> Result<Self, EvalError> {
        let absolute = normalize(&std::path::absolute(save_path)?);
        let root = absolute.parent().unwrap_or(&absolute).to_path_buf();
        let stem = absolute
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.split('.').next())
            .filter(|n| !n.is_empty())
            .unwrap_or("report");

        let report_dir = root.join(stem);
        let resources_dir = report_dir.join(RESOURCES_DIR);
        Ok(Self {
            report_dir,
            resources_dir,
        })
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    pub fn resources_dir(&self) -> &Path {
        &self.resources_dir
    }

    /// `resources/<report_name>.json`
    pub fn summary_path(&self, report_name: &str) -> PathBuf {
        self.resources_dir.join(format!("{report_name}.json"))
    }
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
