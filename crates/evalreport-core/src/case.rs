//! Test cases and their accumulated result state.
//!
//! A [`TestCase`] is either per-instance (checked at every batch end against
//! per-sample data, accumulated over the run) or aggregate (checked once per
//! epoch against epoch-level data). The kind is fixed at construction and
//! carries only the state that kind needs.

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use serde_json::{Map, Value as Json};

use crate::error::EvalError;
use crate::summary::TestResult;
use crate::value::{ArrayData, Data, Scalar, Value};

/// A pass/fail predicate over the inputs a case declared.
pub type Criteria = Arc<dyn Fn(&Inputs<'_>) -> Value + Send + Sync>;

/// Inputs bound by name for a single criterion call, in declaration order.
pub struct Inputs<'a> {
    bound: Vec<(&'a str, &'a Value)>,
}

impl<'a> Inputs<'a> {
    /// Bind every declared name from `data`, failing on the first missing key.
    pub(crate) fn bind(case: &'a TestCase, data: &'a Data) -> Result<Self, EvalError> {
        let bound = case
            .input_names
            .iter()
            .map(|name| {
                data.get(name)
                    .map(|value| (name.as_str(), value))
                    .ok_or_else(|| EvalError::MissingInput {
                        case: case.description.clone(),
                        name: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { bound })
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.bound
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, value)| *value)
    }

    /// Bound `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + '_ {
        self.bound.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    fn snapshot(&self) -> Map<String, Json> {
        self.bound
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_serializable()))
            .collect()
    }
}

impl Index<&str> for Inputs<'_> {
    type Output = Value;

    /// Panics if `name` was not declared by the case.
    fn index(&self, name: &str) -> &Value {
        match self.get(name) {
            Some(value) => value,
            None => panic!("input '{name}' was not declared by this test case"),
        }
    }
}

/// Accumulation state of a per-instance case.
#[derive(Debug, Clone, Default)]
pub struct PerInstanceState {
    fail_threshold: u64,
    result_buffer: Vec<Vec<bool>>,
    fail_id_buffer: Vec<Vec<Json>>,
}

/// Result state of an aggregate case, overwritten at every epoch end.
#[derive(Debug, Clone, Default)]
pub struct AggregateState {
    result: Option<bool>,
    input_snapshot: Map<String, Json>,
}

/// Which kind of test a case is, with the state only that kind carries.
#[derive(Debug, Clone)]
pub enum CaseKind {
    PerInstance(PerInstanceState),
    Aggregate(AggregateState),
}

/// A single configured criterion.
#[derive(Clone)]
pub struct TestCase {
    description: String,
    input_names: Vec<String>,
    criteria: Criteria,
    kind: CaseKind,
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("description", &self.description)
            .field("input_names", &self.input_names)
            .field("criteria", &"<fn>")
            .field("kind", &self.kind)
            .finish()
    }
}

impl TestCase {
    /// A case evaluated at every batch end. It passes when at most
    /// `fail_threshold` instances failed over the whole run.
    pub fn per_instance<I, S, F>(
        description: impl Into<String>,
        inputs: I,
        fail_threshold: u64,
        criteria: F,
    ) -> Result<Self, EvalError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Inputs<'_>) -> Value + Send + Sync + 'static,
    {
        Self::build(
            description.into(),
            inputs,
            Arc::new(criteria),
            CaseKind::PerInstance(PerInstanceState {
                fail_threshold,
                ..Default::default()
            }),
        )
    }

    /// A case evaluated once per epoch against epoch-level data.
    pub fn aggregate<I, S, F>(
        description: impl Into<String>,
        inputs: I,
        criteria: F,
    ) -> Result<Self, EvalError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Inputs<'_>) -> Value + Send + Sync + 'static,
    {
        Self::build(
            description.into(),
            inputs,
            Arc::new(criteria),
            CaseKind::Aggregate(AggregateState::default()),
        )
    }

    fn build<I, S>(
        description: String,
        inputs: I,
        criteria: Criteria,
        kind: CaseKind,
    ) -> Result<Self, EvalError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut input_names: Vec<String> = Vec::new();
        for name in inputs {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(EvalError::Configuration(format!(
                    "test case '{description}' declares an empty input name"
                )));
            }
            if input_names.contains(&name) {
                return Err(EvalError::Configuration(format!(
                    "test case '{description}' declares input '{name}' more than once"
                )));
            }
            input_names.push(name);
        }

        Ok(Self {
            description,
            input_names,
            criteria,
            kind,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Input names the criteria requires, in declaration order.
    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    pub fn kind(&self) -> &CaseKind {
        &self.kind
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, CaseKind::Aggregate(_))
    }

    /// The tolerated failure count, for per-instance cases.
    pub fn fail_threshold(&self) -> Option<u64> {
        match &self.kind {
            CaseKind::PerInstance(state) => Some(state.fail_threshold),
            CaseKind::Aggregate(_) => None,
        }
    }

    /// Clear accumulated state ahead of a new run.
    pub fn reset(&mut self) {
        match &mut self.kind {
            CaseKind::PerInstance(state) => {
                state.result_buffer.clear();
                state.fail_id_buffer.clear();
            }
            CaseKind::Aggregate(state) => {
                state.result = None;
                state.input_snapshot.clear();
            }
        }
    }

    /// Run the criteria for a batch and check it produced a boolean array.
    /// Nothing is recorded; see [`TestCase::record_batch`].
    pub(crate) fn evaluate_batch(&self, data: &Data) -> Result<Vec<bool>, EvalError> {
        let inputs = Inputs::bind(self, data)?;
        match (self.criteria)(&inputs) {
            Value::Array(array) => match array.data() {
                ArrayData::Bool(flags) => Ok(flags.clone()),
                _ => Err(EvalError::type_error(
                    &self.description,
                    format!(
                        "per-instance criteria must return a bool array, got a {} array",
                        array.dtype()
                    ),
                )),
            },
            other => Err(EvalError::type_error(
                &self.description,
                format!(
                    "per-instance criteria must return a bool array, got {}",
                    other.describe()
                ),
            )),
        }
    }

    /// Append validated batch output. `fail_ids`, when given, is already
    /// filtered down to the failing instances.
    pub(crate) fn record_batch(&mut self, results: Vec<bool>, fail_ids: Option<Vec<Json>>) {
        if let CaseKind::PerInstance(state) = &mut self.kind {
            state.result_buffer.push(results);
            if let Some(ids) = fail_ids {
                state.fail_id_buffer.push(ids);
            }
        }
    }

    /// Run the criteria for an epoch and store its verdict and inputs.
    pub(crate) fn evaluate_epoch(&mut self, data: &Data) -> Result<(), EvalError> {
        let inputs = Inputs::bind(self, data)?;
        let passed = match (self.criteria)(&inputs) {
            Value::Scalar(Scalar::Bool(b)) => b,
            Value::Array(array) if array.shape().is_empty() && array.as_bools().is_some() => {
                array.as_bools().and_then(|b| b.first().copied()).unwrap_or(false)
            }
            other => {
                return Err(EvalError::type_error(
                    &self.description,
                    format!(
                        "aggregate criteria must return a bool, got {}",
                        other.describe()
                    ),
                ))
            }
        };
        let snapshot = inputs.snapshot();

        if let CaseKind::Aggregate(state) = &mut self.kind {
            state.result = Some(passed);
            state.input_snapshot = snapshot;
        }
        Ok(())
    }

    /// Turn the accumulated state into an immutable result.
    pub(crate) fn finalize(&self, track_ids: bool) -> Result<TestResult, EvalError> {
        match &self.kind {
            CaseKind::PerInstance(state) => {
                let fail_number = state
                    .result_buffer
                    .iter()
                    .flatten()
                    .filter(|passed| !**passed)
                    .count() as u64;
                let fail_id =
                    track_ids.then(|| state.fail_id_buffer.iter().flatten().cloned().collect());
                Ok(TestResult::PerInstance {
                    description: self.description.clone(),
                    passed: fail_number <= state.fail_threshold,
                    fail_threshold: state.fail_threshold,
                    fail_number,
                    fail_id,
                })
            }
            CaseKind::Aggregate(state) => {
                let passed = state.result.ok_or_else(|| EvalError::MissingResult {
                    case: self.description.clone(),
                })?;
                Ok(TestResult::Aggregate {
                    description: self.description.clone(),
                    passed,
                    inputs: state.input_snapshot.clone(),
                })
            }
        }
    }
}
