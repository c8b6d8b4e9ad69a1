//! Report error types.

use thiserror::Error;

/// Errors raised while checking for or running the document toolchain.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A tool or system setting the report toolchain needs is unavailable.
    #[error("{capability} is not available: {hint}")]
    DependencyMissing {
        capability: &'static str,
        hint: String,
    },

    /// A located document compiler exited unsuccessfully.
    #[error("{compiler} failed on pass {pass} (exit code {status:?}):\n{log}")]
    CompileFailed {
        compiler: String,
        pass: u32,
        status: Option<i32>,
        log: String,
    },
}
