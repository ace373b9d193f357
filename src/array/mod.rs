//! # Numeric Arrays
//!
//! Every axis, intensity vector and heatmap in a document is held as an [`ArrayData`]:
//! a C-ordered buffer of `f64` values tagged with the on-disk [`DType`] it came from
//! (or should be written as). Keeping the storage type alongside the values lets
//! integer bin axes round-trip as integers and selects the text precision used on export.
//! Integers are exact up to [`MAX_EXACT_INTEGER`] in magnitude; larger `Int64` values
//! are rounded to the nearest representable `f64`.
//!
//! Arrays read from a document are wrapped in a [`LazyArray`], which keeps the on-disk
//! handle until [`LazyArray::materialize`] is called and caches the loaded values from
//! then on. Nothing is ever evicted from that cache.

mod error;
mod lazy;

pub use error::ArrayError;
pub use lazy::LazyArray;

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Largest integer magnitude (2^53) that survives the `f64` value buffer unchanged
pub const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Named arrays, as written to or read from a store group
pub type ArrayMap = BTreeMap<String, ArrayData>;

/// Storage type of an array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer, exact up to [`MAX_EXACT_INTEGER`]
    Int64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
}

impl DType {
    /// Little-endian type code used in `.zarray` metadata
    pub fn code(&self) -> &'static str {
        match self {
            DType::Int32 => "<i4",
            DType::Int64 => "<i8",
            DType::Float32 => "<f4",
            DType::Float64 => "<f8",
        }
    }

    /// Parse a `.zarray` type code
    pub fn from_code(code: &str) -> Result<Self, ArrayError> {
        match code {
            "<i4" | "|i4" => Ok(DType::Int32),
            "<i8" | "|i8" => Ok(DType::Int64),
            "<f4" | "|f4" => Ok(DType::Float32),
            "<f8" | "|f8" => Ok(DType::Float64),
            other => Err(ArrayError::UnsupportedDtype(other.to_string())),
        }
    }

    /// Size of one element in bytes
    pub fn item_size(&self) -> usize {
        match self {
            DType::Int32 | DType::Float32 => 4,
            DType::Int64 | DType::Float64 => 8,
        }
    }

    /// Whether the type is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(self, DType::Int32 | DType::Int64)
    }

    /// Decimal places used when writing values of this type as text.
    ///
    /// `None` means integer formatting.
    pub fn text_precision(&self) -> Option<usize> {
        match self {
            DType::Int32 | DType::Int64 => None,
            DType::Float32 => Some(4),
            DType::Float64 => Some(6),
        }
    }

    /// Format a single value with the precision of this type
    pub fn format_value(&self, value: f64) -> String {
        match self.text_precision() {
            None => format!("{}", value.round() as i64),
            Some(precision) => format!("{:.*}", precision, value),
        }
    }

    /// Type that can hold values of both `self` and `other` when exported together
    pub fn widest(self, other: DType) -> DType {
        match (self.text_precision(), other.text_precision()) {
            (None, None) => self,
            (Some(a), Some(b)) if a >= b => self,
            (Some(_), Some(_)) => other,
            (Some(_), None) => self,
            (None, Some(_)) => other,
        }
    }
}

/// Typed, C-ordered numeric buffer of arbitrary dimensionality
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayData {
    dtype: DType,
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl ArrayData {
    /// Create an array, checking that `values` fills `shape` exactly
    pub fn new(dtype: DType, shape: Vec<usize>, values: Vec<f64>) -> Result<Self, ArrayError> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(ArrayError::ShapeMismatch {
                shape,
                expected,
                actual: values.len(),
            });
        }
        let values = if dtype.is_integer() {
            values.into_iter().map(f64::round).collect()
        } else {
            values
        };
        Ok(Self {
            dtype,
            shape,
            values,
        })
    }

    /// One-dimensional `f64` array
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self {
            dtype: DType::Float64,
            shape: vec![values.len()],
            values,
        }
    }

    /// One-dimensional `i32` array
    pub fn from_i32(values: Vec<i32>) -> Self {
        Self {
            dtype: DType::Int32,
            shape: vec![values.len()],
            values: values.into_iter().map(f64::from).collect(),
        }
    }

    /// One-dimensional `i64` array
    pub fn from_i64(values: Vec<i64>) -> Self {
        Self {
            dtype: DType::Int64,
            shape: vec![values.len()],
            values: values.into_iter().map(|v| v as f64).collect(),
        }
    }

    /// One-dimensional `f32` array
    pub fn from_f32(values: Vec<f32>) -> Self {
        Self {
            dtype: DType::Float32,
            shape: vec![values.len()],
            values: values.into_iter().map(f64::from).collect(),
        }
    }

    /// Array of zeros
    pub fn zeros(dtype: DType, shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            dtype,
            shape,
            values: vec![0.0; len],
        }
    }

    /// `0, 1, ..., len - 1` as an `i32` array
    pub fn arange(len: usize) -> Self {
        Self {
            dtype: DType::Int32,
            shape: vec![len],
            values: (0..len).map(|v| v as f64).collect(),
        }
    }

    /// Storage type
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Shape of the array
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the array holds no elements
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flat, C-ordered values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Consume the array and return its flat values
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Minimum value, ignoring NaN
    pub fn min(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.min(v))))
    }

    /// Maximum value, ignoring NaN
    pub fn max(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
    }

    /// Same values stored as a different type; integer targets are rounded
    pub fn cast(self, dtype: DType) -> Self {
        let values = if dtype.is_integer() && !self.dtype.is_integer() {
            self.values.into_iter().map(f64::round).collect()
        } else {
            self.values
        };
        Self {
            dtype,
            shape: self.shape,
            values,
        }
    }

    /// View as a 1-D array
    pub fn view1(&self) -> Result<ArrayView1<'_, f64>, ArrayError> {
        if self.ndim() != 1 {
            return Err(ArrayError::DimensionMismatch {
                expected: 1,
                actual: self.ndim(),
            });
        }
        Ok(ArrayView1::from(&self.values[..]))
    }

    /// View as a 2-D array
    pub fn view2(&self) -> Result<ArrayView2<'_, f64>, ArrayError> {
        if self.ndim() != 2 {
            return Err(ArrayError::DimensionMismatch {
                expected: 2,
                actual: self.ndim(),
            });
        }
        ArrayView2::from_shape((self.shape[0], self.shape[1]), &self.values).map_err(|_| {
            ArrayError::ShapeMismatch {
                shape: self.shape.clone(),
                expected: self.shape.iter().product(),
                actual: self.values.len(),
            }
        })
    }

    /// Owned copy as a 1-D `ndarray`
    pub fn to_array1(&self) -> Result<Array1<f64>, ArrayError> {
        Ok(self.view1()?.to_owned())
    }

    /// Owned copy as a 2-D `ndarray`
    pub fn to_array2(&self) -> Result<Array2<f64>, ArrayError> {
        Ok(self.view2()?.to_owned())
    }
}

impl From<Vec<f64>> for ArrayData {
    fn from(values: Vec<f64>) -> Self {
        Self::from_vec(values)
    }
}

impl From<Vec<i32>> for ArrayData {
    fn from(values: Vec<i32>) -> Self {
        Self::from_i32(values)
    }
}

impl From<Vec<f32>> for ArrayData {
    fn from(values: Vec<f32>) -> Self {
        Self::from_f32(values)
    }
}

impl From<Vec<i64>> for ArrayData {
    fn from(values: Vec<i64>) -> Self {
        Self::from_i64(values)
    }
}

impl From<Array1<f64>> for ArrayData {
    fn from(array: Array1<f64>) -> Self {
        Self::from_vec(array.to_vec())
    }
}

impl From<Array2<f64>> for ArrayData {
    fn from(array: Array2<f64>) -> Self {
        let (rows, cols) = array.dim();
        let values = array.iter().copied().collect();
        Self {
            dtype: DType::Float64,
            shape: vec![rows, cols],
            values,
        }
    }
}
