//! Values flowing from the driving loop into test criteria.
//!
//! Batch and epoch data are name → [`Value`] mappings. A value is a numeric
//! or boolean scalar, a typed n-dimensional array, or plain text. Everything
//! that ends up in a summary goes through [`Value::to_serializable`], which
//! turns arrays into nested lists and scalars into native JSON values.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value as Json;

use crate::error::EvalError;

/// Data handed to a lifecycle hook, keyed by variable name.
pub type Data = HashMap<String, Value>;

/// Element type of an [`NdArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Bool,
    Int,
    Float,
    Str,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Bool => write!(f, "bool"),
            DType::Int => write!(f, "int64"),
            DType::Float => write!(f, "float64"),
            DType::Str => write!(f, "str"),
        }
    }
}

/// A single scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Scalar {
    pub fn dtype(&self) -> DType {
        match self {
            Scalar::Bool(_) => DType::Bool,
            Scalar::Int(_) => DType::Int,
            Scalar::Float(_) => DType::Float,
        }
    }

    pub fn to_serializable(&self) -> Json {
        match *self {
            Scalar::Bool(b) => Json::Bool(b),
            Scalar::Int(i) => Json::from(i),
            Scalar::Float(x) => float_json(x),
        }
    }
}

/// JSON has no NaN or infinity; those become the strings `"NaN"`, `"inf"`
/// and `"-inf"` so a snapshot still shows the value that was bound.
fn float_json(x: f64) -> Json {
    if x.is_nan() {
        Json::String("NaN".to_string())
    } else if x.is_infinite() {
        Json::String(if x > 0.0 { "inf" } else { "-inf" }.to_string())
    } else {
        Json::from(x)
    }
}

/// Flat, row-major element storage of an [`NdArray`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    Str(Vec<String>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Bool(v) => v.len(),
            ArrayData::Int(v) => v.len(),
            ArrayData::Float(v) => v.len(),
            ArrayData::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::Bool(_) => DType::Bool,
            ArrayData::Int(_) => DType::Int,
            ArrayData::Float(_) => DType::Float,
            ArrayData::Str(_) => DType::Str,
        }
    }

    fn element(&self, index: usize) -> Json {
        match self {
            ArrayData::Bool(v) => Json::Bool(v[index]),
            ArrayData::Int(v) => Json::from(v[index]),
            ArrayData::Float(v) => float_json(v[index]),
            ArrayData::Str(v) => Json::String(v[index].clone()),
        }
    }
}

/// A typed n-dimensional array. An empty shape is a 0-d array holding one
/// element.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: ArrayData,
}

impl NdArray {
    /// Create an array, checking that `shape` accounts for every element.
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self, EvalError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(EvalError::Shape {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Create a one-dimensional array.
    pub fn from_data(data: ArrayData) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bools(&self) -> Option<&[bool]> {
        match &self.data {
            ArrayData::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match &self.data {
            ArrayData::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match &self.data {
            ArrayData::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric elements widened to `f64`; `None` for bool and str arrays.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match &self.data {
            ArrayData::Int(v) => Some(v.iter().map(|&i| i as f64).collect()),
            ArrayData::Float(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Elements in row-major order, each as a JSON scalar.
    pub fn flat_serializable(&self) -> Vec<Json> {
        (0..self.data.len()).map(|i| self.data.element(i)).collect()
    }

    /// Nested JSON lists following the shape. A 0-d array becomes a scalar.
    pub fn to_serializable(&self) -> Json {
        self.nest(0, 0)
    }

    fn nest(&self, axis: usize, offset: usize) -> Json {
        if axis == self.shape.len() {
            return self.data.element(offset);
        }
        let stride: usize = self.shape[axis + 1..].iter().product();
        Json::Array(
            (0..self.shape[axis])
                .map(|i| self.nest(axis + 1, offset + i * stride))
                .collect(),
        )
    }
}

/// A value bound to a criterion input or returned by a criterion.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Array(NdArray),
    Text(String),
}

impl Value {
    /// Convert to a JSON value: arrays become nested lists, scalars their
    /// native JSON form, text passes through.
    pub fn to_serializable(&self) -> Json {
        match self {
            Value::Scalar(s) => s.to_serializable(),
            Value::Array(a) => a.to_serializable(),
            Value::Text(t) => Json::String(t.clone()),
        }
    }

    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// A numeric scalar (or single-element numeric 0-d array) as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Scalar(Scalar::Int(i)) => Some(*i as f64),
            Value::Scalar(Scalar::Float(x)) => Some(*x),
            Value::Array(a) if a.shape().is_empty() => {
                a.to_f64_vec().and_then(|v| v.first().copied())
            }
            _ => None,
        }
    }

    /// Numeric array elements (or a numeric scalar) widened to `f64`.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            Value::Array(a) => a.to_f64_vec(),
            other => other.as_f64().map(|x| vec![x]),
        }
    }

    /// Short description used in type errors, e.g. `float64 array of shape [4]`.
    pub fn describe(&self) -> String {
        match self {
            Value::Scalar(s) => format!("{} scalar", s.dtype()),
            Value::Array(a) => format!("{} array of shape {:?}", a.dtype(), a.shape()),
            Value::Text(_) => "text".to_string(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Scalar(Scalar::Int(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Scalar(Scalar::Float(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NdArray> for Value {
    fn from(a: NdArray) -> Self {
        Value::Array(a)
    }
}

impl From<Vec<bool>> for Value {
    fn from(v: Vec<bool>) -> Self {
        Value::Array(NdArray::from_data(ArrayData::Bool(v)))
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::Array(NdArray::from_data(ArrayData::Int(v)))
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Array(NdArray::from_data(ArrayData::Float(v)))
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Array(NdArray::from_data(ArrayData::Str(v)))
    }
}
