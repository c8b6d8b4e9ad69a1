//! Evaluation engine driven by run, batch and epoch lifecycle hooks.
//!
//! The driving loop calls [`EvaluationEngine::run_begin`] once, then
//! [`EvaluationEngine::batch_end`] after every batch and
//! [`EvaluationEngine::epoch_end`] after every epoch, and finally
//! [`EvaluationEngine::run_end`], which writes the JSON summary and hands it
//! to the report compiler. Hooks called in any mode other than
//! [`ExecutionMode::Test`] do nothing.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::case::TestCase;
use crate::error::EvalError;
use crate::layout::{sanitize_report_name, OutputLayout};
use crate::summary::EvaluationSummary;
use crate::traits::{ReportArtifact, ReportCompiler, ReportRequest};
use crate::value::{Data, Value};

/// Phase the driving loop is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Train,
    Eval,
    Test,
    Infer,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Train => write!(f, "train"),
            ExecutionMode::Eval => write!(f, "eval"),
            ExecutionMode::Test => write!(f, "test"),
            ExecutionMode::Infer => write!(f, "infer"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "train" => Ok(ExecutionMode::Train),
            "eval" => Ok(ExecutionMode::Eval),
            "test" => Ok(ExecutionMode::Test),
            "infer" => Ok(ExecutionMode::Infer),
            other => Err(format!("unknown execution mode: {other}")),
        }
    }
}

/// Configuration for the evaluation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Report title.
    pub title: String,
    /// Where the report goes; its stem names the report directory.
    pub save_path: PathBuf,
    /// Batch key holding per-instance ids. Enables failing-id tracking.
    pub data_id: Option<String>,
}

impl EngineConfig {
    pub fn new(save_path: impl Into<PathBuf>) -> Self {
        Self {
            title: "Test".to_string(),
            save_path: save_path.into(),
            data_id: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_data_id(mut self, key: impl Into<String>) -> Self {
        self.data_id = Some(key.into());
        self
    }
}

/// What the driving loop knows about the run at its start.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Run or experiment identifier; names the report files.
    pub name: String,
    /// Keys the driver will supply to the hooks, if it knows them up front.
    pub data_keys: Option<BTreeSet<String>>,
}

impl RunContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_keys: None,
        }
    }

    pub fn with_data_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: EvaluationSummary,
    pub summary_path: PathBuf,
    pub artifact: ReportArtifact,
}

struct ActiveRun {
    report_name: String,
    summary: EvaluationSummary,
    started: Instant,
}

/// Accumulates criteria results over a run and reports them at its end.
pub struct EvaluationEngine {
    cases: Vec<TestCase>,
    config: EngineConfig,
    layout: OutputLayout,
    compiler: Arc<dyn ReportCompiler>,
    run: Option<ActiveRun>,
}

impl EvaluationEngine {
    /// Create the engine and its output directories.
    pub fn new(
        cases: Vec<TestCase>,
        config: EngineConfig,
        compiler: Arc<dyn ReportCompiler>,
    ) -> Result<Self, EvalError> {
        if config.data_id.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(EvalError::Configuration(
                "data id key must not be empty".to_string(),
            ));
        }
        let layout = OutputLayout::create(&config.save_path)?;

        Ok(Self {
            cases,
            config,
            layout,
            compiler,
            run: None,
        })
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Every data key some hook will read, including the data id key.
    pub fn required_inputs(&self) -> BTreeSet<String> {
        self.cases
            .iter()
            .flat_map(|case| case.input_names().iter().cloned())
            .chain(self.config.data_id.iter().cloned())
            .collect()
    }

    /// Start a run: name the report, stamp the summary, reset every case.
    pub fn run_begin(&mut self, mode: ExecutionMode, ctx: &RunContext) -> Result<(), EvalError> {
        if mode != ExecutionMode::Test {
            return Ok(());
        }
        if ctx.name.trim().is_empty() {
            return Err(EvalError::Configuration(
                "a run name is required to generate a test report".to_string(),
            ));
        }
        if let Some(keys) = &ctx.data_keys {
            let missing: Vec<String> = self
                .required_inputs()
                .into_iter()
                .filter(|k| !keys.contains(k))
                .collect();
            if !missing.is_empty() {
                return Err(EvalError::Configuration(format!(
                    "required data keys are not supplied by the driver: {}",
                    missing.join(", ")
                )));
            }
        }

        for case in &mut self.cases {
            case.reset();
        }
        let report_name = sanitize_report_name(&ctx.name);
        tracing::debug!(report = %report_name, cases = self.cases.len(), "test run started");

        self.run = Some(ActiveRun {
            report_name,
            summary: EvaluationSummary::new(&self.config.title),
            started: Instant::now(),
        });
        Ok(())
    }

    /// Evaluate every per-instance case against one batch.
    ///
    /// All outputs and id lengths are validated before any case records
    /// anything, so a rejected batch leaves every buffer untouched.
    pub fn batch_end(&mut self, mode: ExecutionMode, data: &Data) -> Result<(), EvalError> {
        if mode != ExecutionMode::Test {
            return Ok(());
        }
        self.require_run()?;

        let ids = match &self.config.data_id {
            Some(key) if self.cases.iter().any(|c| !c.is_aggregate()) => {
                let value = data.get(key).ok_or_else(|| EvalError::MissingInput {
                    case: "data id".to_string(),
                    name: key.clone(),
                })?;
                Some(flatten_ids(value))
            }
            _ => None,
        };

        let mut staged = Vec::new();
        for (index, case) in self.cases.iter().enumerate() {
            if case.is_aggregate() {
                continue;
            }
            let results = case.evaluate_batch(data)?;
            let fail_ids = match &ids {
                Some(ids) => {
                    if ids.len() != results.len() {
                        return Err(EvalError::Value {
                            case: case.description().to_string(),
                            results: results.len(),
                            ids: ids.len(),
                        });
                    }
                    Some(
                        ids.iter()
                            .zip(&results)
                            .filter(|(_, passed)| !**passed)
                            .map(|(id, _)| id.clone())
                            .collect(),
                    )
                }
                None => None,
            };
            staged.push((index, results, fail_ids));
        }

        for (index, results, fail_ids) in staged {
            self.cases[index].record_batch(results, fail_ids);
        }
        Ok(())
    }

    /// Evaluate every aggregate case against one epoch's data.
    pub fn epoch_end(&mut self, mode: ExecutionMode, data: &Data) -> Result<(), EvalError> {
        if mode != ExecutionMode::Test {
            return Ok(());
        }
        self.require_run()?;

        for case in self.cases.iter_mut().filter(|c| c.is_aggregate()) {
            case.evaluate_epoch(data)?;
        }
        Ok(())
    }

    /// Finalize the summary, write it as JSON, and compile the report.
    ///
    /// Returns `None` outside test mode.
    pub async fn run_end(&mut self, mode: ExecutionMode) -> Result<Option<RunOutcome>, EvalError> {
        if mode != ExecutionMode::Test {
            return Ok(None);
        }
        let mut run = self
            .run
            .take()
            .ok_or(EvalError::Lifecycle("run_end called without run_begin"))?;

        let track_ids = self.config.data_id.is_some();
        let aggregate = self.cases.iter().filter(|c| c.is_aggregate());
        let per_instance = self.cases.iter().filter(|c| !c.is_aggregate());
        for case in aggregate.chain(per_instance) {
            run.summary.tests.push(case.finalize(track_ids)?);
        }
        run.summary.execution_time_seconds = run.started.elapsed().as_secs_f64();

        let summary_path = self.layout.summary_path(&run.report_name);
        run.summary.save_json(&summary_path)?;

        let artifact = self
            .compiler
            .compile(&ReportRequest {
                summary: &run.summary,
                output_dir: self.layout.report_dir(),
                report_name: &run.report_name,
                with_ids: track_ids,
            })
            .await?;
        tracing::info!(
            "Report written to {} ({})",
            artifact.path.display(),
            artifact.kind
        );

        Ok(Some(RunOutcome {
            summary: run.summary,
            summary_path,
            artifact,
        }))
    }

    fn require_run(&self) -> Result<(), EvalError> {
        match self.run {
            Some(_) => Ok(()),
            None => Err(EvalError::Lifecycle("hook called before run_begin")),
        }
    }
}

/// Flatten an id value into one JSON scalar per instance.
fn flatten_ids(value: &Value) -> Vec<Json> {
    match value {
        Value::Array(array) => array.flat_serializable(),
        other => vec![other.to_serializable()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::TestResult;
    use crate::traits::ArtifactKind;
    use crate::value::{ArrayData, NdArray};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every request and writes nothing.
    #[derive(Default)]
    struct RecordingCompiler {
        requests: Mutex<Vec<(String, bool, usize)>>,
    }

    #[async_trait]
    impl ReportCompiler for RecordingCompiler {
        async fn compile(&self, request: &ReportRequest<'_>) -> anyhow::Result<ReportArtifact> {
            self.requests.lock().unwrap().push((
                request.report_name.to_string(),
                request.with_ids,
                request.summary.tests.len(),
            ));
            Ok(ReportArtifact {
                path: request.output_dir.join(format!("{}.tex", request.report_name)),
                kind: ArtifactKind::Source,
            })
        }
    }

    fn data(pairs: Vec<(&str, Value)>) -> Data {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn above_half(threshold: u64) -> TestCase {
        TestCase::per_instance("score above 0.5", ["score"], threshold, |inputs| {
            let scores = inputs["score"].to_f64_vec().unwrap_or_default();
            Value::from(scores.iter().map(|s| *s > 0.5).collect::<Vec<_>>())
        })
        .unwrap()
    }

    fn accuracy() -> TestCase {
        TestCase::aggregate("accuracy at least 0.9", ["acc"], |inputs| {
            Value::from(inputs["acc"].as_f64().unwrap_or(0.0) >= 0.9)
        })
        .unwrap()
    }

    fn engine(
        dir: &tempfile::TempDir,
        cases: Vec<TestCase>,
        data_id: Option<&str>,
    ) -> (EvaluationEngine, Arc<RecordingCompiler>) {
        let compiler = Arc::new(RecordingCompiler::default());
        let mut config = EngineConfig::new(dir.path().join("report.pdf")).with_title("Unit");
        if let Some(key) = data_id {
            config = config.with_data_id(key);
        }
        let engine = EvaluationEngine::new(cases, config, compiler.clone()).unwrap();
        (engine, compiler)
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("TEST".parse::<ExecutionMode>().unwrap(), ExecutionMode::Test);
        assert_eq!(ExecutionMode::Train.to_string(), "train");
        assert!("predict".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn run_begin_requires_a_name() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine(&dir, vec![accuracy()], None);
        let err = engine
            .run_begin(ExecutionMode::Test, &RunContext::new("  "))
            .unwrap_err();
        assert!(matches!(err, EvalError::Configuration(_)));
    }

    #[test]
    fn run_begin_checks_declared_keys() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine(&dir, vec![above_half(0), accuracy()], Some("id"));
        assert_eq!(
            engine.required_inputs().into_iter().collect::<Vec<_>>(),
            vec!["acc", "id", "score"]
        );

        let ctx = RunContext::new("exp").with_data_keys(["score", "acc"]);
        match engine.run_begin(ExecutionMode::Test, &ctx).unwrap_err() {
            EvalError::Configuration(msg) => assert!(msg.contains("id")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn hooks_outside_test_mode_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine(&dir, vec![above_half(0)], None);
        engine
            .batch_end(ExecutionMode::Train, &Data::new())
            .unwrap();
        engine
            .run_begin(ExecutionMode::Eval, &RunContext::new(""))
            .unwrap();
    }

    #[test]
    fn hooks_before_run_begin_fail() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine(&dir, vec![above_half(0)], None);
        let err = engine
            .batch_end(
                ExecutionMode::Test,
                &data(vec![("score", Value::from(vec![1.0]))]),
            )
            .unwrap_err();
        assert!(matches!(err, EvalError::Lifecycle(_)));
    }

    #[test]
    fn id_length_mismatch_leaves_buffers_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine(&dir, vec![above_half(100)], Some("id"));
        engine
            .run_begin(ExecutionMode::Test, &RunContext::new("exp"))
            .unwrap();

        let err = engine
            .batch_end(
                ExecutionMode::Test,
                &data(vec![
                    ("score", Value::from(vec![0.0; 10])),
                    ("id", Value::from((0..8).collect::<Vec<i64>>())),
                ]),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            EvalError::Value {
                results: 10,
                ids: 8,
                ..
            }
        ));

        match engine.cases()[0].finalize(true).unwrap() {
            TestResult::PerInstance {
                fail_number,
                fail_id,
                ..
            } => {
                assert_eq!(fail_number, 0);
                assert_eq!(fail_id, Some(vec![]));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn failing_case_rolls_back_the_whole_batch() {
        let dir = tempfile::tempdir().unwrap();
        let bad = TestCase::per_instance("bad output", ["score"], 0, |inputs| {
            inputs["score"].clone()
        })
        .unwrap();
        let (mut engine, _) = engine(&dir, vec![above_half(0), bad], None);
        engine
            .run_begin(ExecutionMode::Test, &RunContext::new("exp"))
            .unwrap();

        let err = engine
            .batch_end(
                ExecutionMode::Test,
                &data(vec![("score", Value::from(vec![0.1, 0.2]))]),
            )
            .unwrap_err();
        assert!(matches!(err, EvalError::Type { .. }));
        assert!(matches!(
            engine.cases()[0].finalize(false).unwrap(),
            TestResult::PerInstance { fail_number: 0, .. }
        ));
    }

    #[tokio::test]
    async fn full_run_accumulates_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, compiler) = engine(
            &dir,
            vec![above_half(2), accuracy(), above_half(0)],
            Some("id"),
        );

        engine
            .run_begin(ExecutionMode::Test, &RunContext::new("My Exp!! 2.0"))
            .unwrap();
        engine
            .batch_end(
                ExecutionMode::Test,
                &data(vec![
                    ("score", Value::from(vec![0.9, 0.1, 0.8])),
                    ("id", Value::from(vec![10_i64, 11, 12])),
                ]),
            )
            .unwrap();
        let ids = NdArray::new(
            vec![2, 1],
            ArrayData::Str(vec!["a".into(), "b".into()]),
        )
        .unwrap();
        engine
            .batch_end(
                ExecutionMode::Test,
                &data(vec![
                    ("score", Value::from(vec![0.2, 0.7])),
                    ("id", Value::from(ids)),
                ]),
            )
            .unwrap();
        engine
            .epoch_end(ExecutionMode::Test, &data(vec![("acc", Value::from(0.87))]))
            .unwrap();

        let outcome = engine.run_end(ExecutionMode::Test).await.unwrap().unwrap();
        let tests = &outcome.summary.tests;

        assert_eq!(tests.len(), 3);
        assert!(tests[0].is_aggregate(), "aggregate results come first");
        match &tests[0] {
            TestResult::Aggregate { passed, inputs, .. } => {
                assert!(!passed);
                assert_eq!(inputs["acc"], json!(0.87));
            }
            other => panic!("unexpected result {other:?}"),
        }
        for (result, expect_pass) in tests[1..].iter().zip([true, false]) {
            match result {
                TestResult::PerInstance {
                    passed,
                    fail_number,
                    fail_id,
                    ..
                } => {
                    assert_eq!(*fail_number, 2);
                    assert_eq!(*passed, expect_pass);
                    assert_eq!(fail_id.as_ref().unwrap(), &vec![json!(11), json!("a")]);
                }
                other => panic!("unexpected result {other:?}"),
            }
        }

        assert_eq!(
            outcome.summary_path,
            dir.path()
                .join("report/resources/my_exp_20_test_report.json")
        );
        let saved = EvaluationSummary::load_json(&outcome.summary_path).unwrap();
        assert_eq!(saved.title, "Unit");
        assert_eq!(saved.tests, outcome.summary.tests);

        let requests = compiler.requests.lock().unwrap();
        assert_eq!(
            requests.as_slice(),
            &[("my_exp_20_test_report".to_string(), true, 3)]
        );
    }

    #[tokio::test]
    async fn aggregate_reports_the_last_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine(&dir, vec![accuracy()], None);
        engine
            .run_begin(ExecutionMode::Test, &RunContext::new("epochs"))
            .unwrap();
        for acc in [0.5, 0.95, 0.93] {
            engine
                .epoch_end(ExecutionMode::Test, &data(vec![("acc", Value::from(acc))]))
                .unwrap();
        }

        let outcome = engine.run_end(ExecutionMode::Test).await.unwrap().unwrap();
        match &outcome.summary.tests[0] {
            TestResult::Aggregate { passed, inputs, .. } => {
                assert!(passed);
                assert_eq!(inputs["acc"], json!(0.93));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_end_without_begin_is_a_lifecycle_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine(&dir, vec![], None);
        assert!(matches!(
            engine.run_end(ExecutionMode::Test).await,
            Err(EvalError::Lifecycle(_))
        ));
        assert!(engine.run_end(ExecutionMode::Infer).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn new_run_resets_previous_results() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine(&dir, vec![above_half(0)], None);
        let batch = data(vec![("score", Value::from(vec![0.0, 0.0]))]);

        engine
            .run_begin(ExecutionMode::Test, &RunContext::new("first"))
            .unwrap();
        engine.batch_end(ExecutionMode::Test, &batch).unwrap();
        engine.run_end(ExecutionMode::Test).await.unwrap();

        engine
            .run_begin(ExecutionMode::Test, &RunContext::new("second"))
            .unwrap();
        engine.batch_end(ExecutionMode::Test, &batch).unwrap();
        let outcome = engine.run_end(ExecutionMode::Test).await.unwrap().unwrap();

        assert!(matches!(
            outcome.summary.tests[0],
            TestResult::PerInstance { fail_number: 2, .. }
        ));
    }
}
