//! Evaluation summary types with JSON persistence.
//!
//! The JSON layout is stable: `title`, `timestamp`, `execution_time(s)` and
//! `tests`, where each test carries a `test_type` tag of `per-instance` or
//! `aggregate` plus the fields of that kind.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::EvalError;

/// Immutable outcome of one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test_type")]
pub enum TestResult {
    #[serde(rename = "per-instance")]
    PerInstance {
        description: String,
        passed: bool,
        /// Maximum tolerated number of failing instances.
        fail_threshold: u64,
        /// Number of instances whose criterion evaluated to false.
        fail_number: u64,
        /// Ids of the failing instances, when a data-id key is configured.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fail_id: Option<Vec<Json>>,
    },
    #[serde(rename = "aggregate")]
    Aggregate {
        description: String,
        passed: bool,
        /// Serialized value of every input at the last epoch end.
        inputs: Map<String, Json>,
    },
}

impl TestResult {
    pub fn description(&self) -> &str {
        match self {
            TestResult::PerInstance { description, .. }
            | TestResult::Aggregate { description, .. } => description,
        }
    }

    pub fn passed(&self) -> bool {
        match self {
            TestResult::PerInstance { passed, .. } | TestResult::Aggregate { passed, .. } => {
                *passed
            }
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, TestResult::Aggregate { .. })
    }

    /// The `test_type` tag as written to JSON.
    pub fn test_type(&self) -> &'static str {
        match self {
            TestResult::PerInstance { .. } => "per-instance",
            TestResult::Aggregate { .. } => "aggregate",
        }
    }
}

/// Pass/fail totals over a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

/// Everything a single test run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub title: String,
    /// Local wall-clock time at run begin.
    pub timestamp: String,
    /// Seconds between run begin and run end.
    #[serde(rename = "execution_time(s)")]
    pub execution_time_seconds: f64,
    /// Aggregate results first, then per-instance, each in declaration order.
    pub tests: Vec<TestResult>,
}

impl EvaluationSummary {
    /// Start an empty summary stamped with the current local time.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            timestamp: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S%.6f")
                .to_string(),
            execution_time_seconds: 0.0,
            tests: Vec::new(),
        }
    }

    pub fn counts(&self) -> SummaryCounts {
        let passed = self.tests.iter().filter(|t| t.passed()).count();
        SummaryCounts {
            total: self.tests.len(),
            passed,
            failed: self.tests.len() - passed,
        }
    }

    /// Whether any per-instance result carries failing instance ids.
    pub fn tracks_fail_ids(&self) -> bool {
        self.tests.iter().any(|t| {
            matches!(
                t,
                TestResult::PerInstance {
                    fail_id: Some(_),
                    ..
                }
            )
        })
    }

    /// Save the summary as indented JSON, creating the parent directory.
    ///
    /// Failures keep their kind: [`EvalError::Io`] for filesystem errors,
    /// [`EvalError::Json`] for serialization errors.
    pub fn save_json(&self, path: &Path) -> Result<(), EvalError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), "summary written");
        Ok(())
    }

    /// Load a summary from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read summary from {}", path.display()))?;
        let summary: EvaluationSummary =
            serde_json::from_str(&content).context("failed to parse summary JSON")?;
        Ok(summary)
    }
}
