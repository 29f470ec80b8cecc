//! Backend value model
//!
//! This module provides the closed value union the core operates on. It
//! stands in for an external array backend: a batched value of rank `r` is a
//! `List` nested `r` deep, and a structured return value is a `Record` whose
//! leaves carry the batch axis.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{DtypeError, GenError, GenResult, ShapeError};

/// A sampled or supplied value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Double-precision float
    F64(f64),
    /// Signed integer
    I64(i64),
    /// Boolean
    Bool(bool),
    /// Array axis: elements indexed along a leading dimension
    List(Vec<Value>),
    /// Fixed-key record; batching applies to its leaves, not the record itself
    Record(BTreeMap<String, Value>),
}

impl Value {
    /// Short type tag, used in dtype error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::F64(_) => "f64",
            Value::I64(_) => "i64",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// Leading-axis rank: the nesting depth of `List` layers.
    ///
    /// Records are transparent; their rank is the minimum rank of their
    /// fields. Scalars have rank 0.
    pub fn rank(&self) -> usize {
        match self {
            Value::List(items) => 1 + items.iter().map(Value::rank).min().unwrap_or(0),
            Value::Record(fields) => fields.values().map(Value::rank).min().unwrap_or(0),
            _ => 0,
        }
    }

    /// Size along the given leading axis, or `None` if the value does not
    /// extend that far.
    pub fn size_along(&self, axis: usize) -> Option<usize> {
        match self {
            Value::List(items) => {
                if axis == 0 {
                    Some(items.len())
                } else {
                    items.first().and_then(|v| v.size_along(axis - 1))
                }
            }
            Value::Record(fields) => {
                let mut size = None;
                for v in fields.values() {
                    let s = v.size_along(axis)?;
                    match size {
                        None => size = Some(s),
                        Some(prev) if prev != s => return None,
                        Some(_) => {}
                    }
                }
                size
            }
            _ => None,
        }
    }

    /// Slice out batch element `i` along `axis`, reducing rank by one.
    ///
    /// Records are sliced field-wise.
    pub fn index_along(&self, axis: usize, i: usize) -> GenResult<Value> {
        match self {
            Value::List(items) => {
                if axis == 0 {
                    items.get(i).cloned().ok_or_else(|| {
                        GenError::Shape(ShapeError::BatchSizeMismatch {
                            argument: 0,
                            expected: i + 1,
                            actual: items.len(),
                        })
                    })
                } else {
                    let sliced = items
                        .iter()
                        .map(|v| v.index_along(axis - 1, i))
                        .collect::<GenResult<Vec<_>>>()?;
                    Ok(Value::List(sliced))
                }
            }
            Value::Record(fields) => {
                let sliced = fields
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.index_along(axis, i)?)))
                    .collect::<GenResult<BTreeMap<_, _>>>()?;
                Ok(Value::Record(sliced))
            }
            other => Err(GenError::Shape(ShapeError::MappedRankTooLow {
                argument: 0,
                axis,
                required: axis + 1,
                actual: other.rank(),
            })),
        }
    }

    /// Combine `N` same-shaped values into one batch-axis-indexed value.
    ///
    /// Records with identical key sets stack field-wise, preserving the
    /// record structure; everything else gains a leading `List` axis.
    pub fn stack(values: Vec<Value>) -> Value {
        let all_records_same_keys = match values.first() {
            Some(Value::Record(first)) => values.iter().all(|v| match v {
                Value::Record(fields) => fields.keys().eq(first.keys()),
                _ => false,
            }),
            _ => false,
        };

        if all_records_same_keys {
            let keys: Vec<String> = match &values[0] {
                Value::Record(fields) => fields.keys().cloned().collect(),
                _ => unreachable!(),
            };
            let mut stacked = BTreeMap::new();
            for key in keys {
                let column = values
                    .iter()
                    .map(|v| match v {
                        Value::Record(fields) => fields[&key].clone(),
                        _ => unreachable!(),
                    })
                    .collect();
                stacked.insert(key, Value::stack(column));
            }
            Value::Record(stacked)
        } else {
            Value::List(values)
        }
    }

    /// Read batch element `i` out of a stacked value.
    pub fn index_leading(&self, i: usize) -> GenResult<Value> {
        self.index_along(0, i)
    }

    /// Replace batch element `i` of a stacked value, returning a new value.
    pub fn set_leading(&self, i: usize, element: Value) -> GenResult<Value> {
        match (self, element) {
            (Value::Record(fields), Value::Record(new_fields)) => {
                let mut out = BTreeMap::new();
                for (k, v) in fields {
                    match new_fields.get(k) {
                        Some(nv) => out.insert(k.clone(), v.set_leading(i, nv.clone())?),
                        None => out.insert(k.clone(), v.clone()),
                    };
                }
                Ok(Value::Record(out))
            }
            (Value::List(items), element) => {
                if i >= items.len() {
                    return Err(GenError::Address(
                        crate::error::AddressError::IndexOutOfRange {
                            index: i,
                            size: items.len(),
                        },
                    ));
                }
                let mut out = items.clone();
                out[i] = element;
                Ok(Value::List(out))
            }
            (other, _) => Err(GenError::Shape(ShapeError::MappedRankTooLow {
                argument: 0,
                axis: 0,
                required: 1,
                actual: other.rank(),
            })),
        }
    }

    /// Extract an `f64`, failing with a dtype error at `address` otherwise.
    pub fn as_f64(&self, address: &Address) -> GenResult<f64> {
        match self {
            Value::F64(v) => Ok(*v),
            Value::I64(v) => Ok(*v as f64),
            other => Err(GenError::Dtype(DtypeError {
                address: address.clone(),
                expected: "f64",
                actual: other.kind(),
            })),
        }
    }

    /// Extract an `i64`, failing with a dtype error at `address` otherwise.
    pub fn as_i64(&self, address: &Address) -> GenResult<i64> {
        match self {
            Value::I64(v) => Ok(*v),
            other => Err(GenError::Dtype(DtypeError {
                address: address.clone(),
                expected: "i64",
                actual: other.kind(),
            })),
        }
    }

    /// Extract a `bool`, failing with a dtype error at `address` otherwise.
    pub fn as_bool(&self, address: &Address) -> GenResult<bool> {
        match self {
            Value::Bool(v) => Ok(*v),
            other => Err(GenError::Dtype(DtypeError {
                address: address.clone(),
                expected: "bool",
                actual: other.kind(),
            })),
        }
    }

    /// Build a rank-1 float array value.
    pub fn floats<I: IntoIterator<Item = f64>>(iter: I) -> Value {
        Value::List(iter.into_iter().map(Value::F64).collect())
    }

    /// Build a rank-1 integer array value.
    pub fn ints<I: IntoIterator<Item = i64>>(iter: I) -> Value {
        Value::List(iter.into_iter().map(Value::I64).collect())
    }

    /// The unit return value: an empty record.
    pub fn unit() -> Value {
        Value::Record(BTreeMap::new())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}
