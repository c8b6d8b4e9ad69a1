//! Evaluation error types.
//!
//! Every variant is fatal for the current run: the engine never retries a
//! criterion or skips a malformed batch.

use thiserror::Error;

/// Errors raised by the evaluation engine and its lifecycle hooks.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The engine or a test case was configured incorrectly.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A criterion returned a value of the wrong type or shape for its kind.
    #[error("test case '{case}': {message}")]
    Type { case: String, message: String },

    /// The data-id array does not line up with the criterion output.
    #[error(
        "test case '{case}': criteria returned {results} results but the id array holds {ids} entries"
    )]
    Value {
        case: String,
        results: usize,
        ids: usize,
    },

    /// A declared input was not present in the data handed to a hook.
    #[error("test case '{case}': input '{name}' is missing from the supplied data")]
    MissingInput { case: String, name: String },

    /// An aggregate case reached run end without ever being evaluated.
    #[error("aggregate test case '{case}' was never evaluated at an epoch end")]
    MissingResult { case: String },

    /// An array's shape does not match the number of elements supplied.
    #[error("array of shape {shape:?} needs {expected} elements, got {actual}")]
    Shape {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    /// A hook was called out of order.
    #[error("lifecycle error: {0}")]
    Lifecycle(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The report compiler failed after the summary was written.
    #[error(transparent)]
    Report(#[from] anyhow::Error),
}

impl EvalError {
    /// Build a [`EvalError::Type`] for the given case.
    pub(crate) fn type_error(case: &str, message: impl Into<String>) -> Self {
        EvalError::Type {
            case: case.to_string(),
            message: message.into(),
        }
    }
}
