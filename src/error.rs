//! Error types for gentrace
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

use crate::address::Address;

/// Batch-axis and argument-shape violations.
///
/// These are detected eagerly, before any sampling occurs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShapeError {
    /// A mapped argument does not have enough leading dimensions
    #[error("vmap was requested to map argument {argument} along axis {axis}, which implies that its rank should be at least {required}, but is only {actual}")]
    MappedRankTooLow {
        argument: usize,
        axis: usize,
        required: usize,
        actual: usize,
    },

    /// The in_axes specification does not match the argument structure
    #[error("vmap in_axes specification must be a tree prefix of the corresponding value (argument {argument})")]
    AxesNotPrefix { argument: usize },

    /// Mapped arguments disagree on batch size
    #[error("Batch size mismatch: argument {argument} has size {actual} along its mapped axis, expected {expected}")]
    BatchSizeMismatch {
        argument: usize,
        expected: usize,
        actual: usize,
    },

    /// No mapped argument, so the batch size cannot be determined
    #[error("Cannot determine batch size: in_axes maps no argument")]
    UnknownBatchSize,

    /// Wrong number of arguments for a generative function
    #[error("Arity mismatch for {gen_fn}: expected {expected} arguments, got {actual}")]
    Arity {
        gen_fn: String,
        expected: usize,
        actual: usize,
    },

    /// A choice map does not cover the batch dimension of its trace
    #[error("Batch choice shape mismatch: expected integer keys 0..{expected}, found {actual} sub-maps")]
    BatchChoiceMismatch { expected: usize, actual: usize },
}

/// Address lookup and structure violations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AddressError {
    /// A required address was missing from a choice map
    #[error("Missing address in choices: {0}")]
    Missing(Address),

    /// An address points through a leaf, or uses a key kind the target
    /// cannot resolve (e.g. a symbol key at a batch node)
    #[error("Malformed address: {0}")]
    Malformed(Address),

    /// A program sampled at the same address twice
    #[error("Duplicate address: {0}")]
    Duplicate(Address),

    /// A batch index is out of range
    #[error("Index {index} out of range for batch of size {size}")]
    IndexOutOfRange { index: usize, size: usize },
}

/// A value's type is incompatible with what the model expects at an address.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Type mismatch at {address}: expected {expected}, got {actual}")]
pub struct DtypeError {
    /// Address where the mismatch occurred
    pub address: Address,
    /// Type the model expects
    pub expected: &'static str,
    /// Type that was actually supplied
    pub actual: &'static str,
}

/// Top-level error type for generative-function operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenError {
    /// Shape error
    #[error("Shape error: {0}")]
    Shape(#[from] ShapeError),

    /// Address error
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    /// Dtype error
    #[error("Dtype error: {0}")]
    Dtype(#[from] DtypeError),

    /// An edit request cannot be applied to the target
    #[error("Invalid edit request: {0}")]
    InvalidRequest(String),

    /// A distribution parameter is outside its valid range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for generative-function operations
pub type GenResult<T> = Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr;

    #[test]
    fn test_shape_error_display() {
        let err = ShapeError::MappedRankTooLow {
            argument: 0,
            axis: 0,
            required: 1,
            actual: 0,
        };
        assert_eq!(
            err.to_string(),
            "vmap was requested to map argument 0 along axis 0, which implies that its rank should be at least 1, but is only 0"
        );

        let err = ShapeError::AxesNotPrefix { argument: 1 };
        assert_eq!(
            err.to_string(),
            "vmap in_axes specification must be a tree prefix of the corresponding value (argument 1)"
        );
    }

    #[test]
    fn test_address_error_display() {
        let err = AddressError::Missing(addr!("z"));
        assert_eq!(err.to_string(), "Missing address in choices: z");

        let err = AddressError::Duplicate(addr!("x", 3));
        assert_eq!(err.to_string(), "Duplicate address: x/3");
    }

    #[test]
    fn test_dtype_error_display() {
        let err = DtypeError {
            address: addr!("x"),
            expected: "f64",
            actual: "bool",
        };
        assert_eq!(err.to_string(), "Type mismatch at x: expected f64, got bool");
    }

    #[test]
    fn test_gen_error_from_shape_error() {
        let shape_err = ShapeError::UnknownBatchSize;
        let gen_err: GenError = shape_err.into();
        assert!(matches!(gen_err, GenError::Shape(_)));
    }

    #[test]
    fn test_gen_error_from_address_error() {
        let addr_err = AddressError::Missing(addr!("y"));
        let gen_err: GenError = addr_err.into();
        assert!(matches!(gen_err, GenError::Address(_)));
    }
}
