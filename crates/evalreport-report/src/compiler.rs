//! Discovery and invocation of the external LaTeX compiler.
//!
//! A compile is always two passes over the same source: the first writes the
//! auxiliary files that cross-references and the table of contents read, the
//! second picks them up so numbering is stable.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::process::Command;

use crate::error::ReportError;

/// Number of compiler invocations per report.
pub const COMPILE_PASSES: u32 = 2;

/// Lines of compiler output kept in a [`ReportError::CompileFailed`].
const LOG_TAIL_LINES: usize = 20;

/// Find `program` on `search_path` (or `PATH` when `None`).
///
/// A program given as a path with a directory component is checked directly.
pub fn find_executable(program: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let paths: OsString = match search_path {
        Some(p) => p.to_os_string(),
        None => std::env::var_os("PATH")?,
    };
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Arguments for compiling `source` with `compiler`.
fn compile_args(compiler: &Path, source: &Path) -> Vec<OsString> {
    let file = source.file_name().unwrap_or(source.as_os_str()).to_os_string();
    let is_latexmk = compiler
        .file_stem()
        .is_some_and(|stem| stem == OsStr::new("latexmk"));
    let mut args: Vec<OsString> = Vec::new();
    if is_latexmk {
        args.push("--pdf".into());
    }
    args.push("--interaction=nonstopmode".into());
    args.push(file);
    args
}

/// Compile `source` twice with `compiler` in the source's directory and
/// return the path of the compiled PDF.
pub async fn compile(compiler: &Path, source: &Path) -> Result<PathBuf> {
    let work_dir = source
        .parent()
        .context("document source has no parent directory")?;
    let args = compile_args(compiler, source);
    let name = compiler.display().to_string();

    for pass in 1..=COMPILE_PASSES {
        let start = Instant::now();
        let output = Command::new(compiler)
            .args(&args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("failed to run {name}"))?;

        tracing::debug!(
            compiler = %name,
            pass,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "compile pass finished"
        );

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReportError::CompileFailed {
                compiler: name,
                pass,
                status: output.status.code(),
                log: log_tail(&format!("{stdout}{stderr}")),
            }
            .into());
        }
    }

    let pdf = source.with_extension("pdf");
    anyhow::ensure!(
        pdf.exists(),
        "{name} succeeded but produced no {}",
        pdf.display()
    );
    Ok(pdf)
}

fn log_tail(log: &str) -> String {
    let lines: Vec<&str> = log.lines().collect();
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    lines[start..].join("\n")
}
