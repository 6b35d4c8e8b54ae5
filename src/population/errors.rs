//! Errors for matrix population models (matrix parsing and validation,
//! option checks, and descriptor evaluation failures).
//!
//! This module defines the model error type, [`MPMError`], used by the
//! population layer, the linear-algebra helpers and the stochastic estimator.
//! It implements `Display`/`Error` and converts to `PyErr` for PyO3 when the
//! `python-bindings` feature is enabled.
//!
//! ## Conventions
//! - **Indices are 0-based** (match Rust/NumPy); matrix entries are reported
//!   as `(row, col)`.
//! - Construction errors are raised by `MatrixPopulationModel::new` and never
//!   leave a partially valid model behind.
//! - Descriptor errors are raised on the first read of a descriptor and are
//!   never cached; a later read re-runs the computation.
//! - A descriptor that is mathematically *undefined* (e.g. `w` for a model
//!   that is not quasi-primitive) is **not** an error: it is returned as
//!   `Defined::Undefined(caveat)`.
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

/// Crate-wide result alias for operations that may produce [`MPMError`].
pub type MPMResult<T> = Result<T, MPMError>;

/// Unified error type for matrix population models.
///
/// Covers matrix input parsing, structural validation of the decomposition
/// `A = S + F`, option checks, and failures while evaluating descriptors.
/// Implements `Display`/`Error` and converts to a Python `ValueError` at
/// PyO3 boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum MPMError {
    // ---- Matrix input / construction ----
    /// Not enough matrices were supplied to determine A, S and F.
    MissingArguments { reason: &'static str },

    /// A matrix literal, nested sequence or file could not be parsed.
    InvalidLiteral { source: String, reason: String },

    /// Rows of a matrix do not all have the same length.
    RaggedRows { row: usize, expected: usize, actual: usize },

    /// A matrix has no entries.
    EmptyMatrix { name: &'static str },

    /// Reading a matrix file failed.
    Io { path: String, reason: String },

    /// Matrix is not square.
    NotSquare { name: &'static str, rows: usize, cols: usize },

    /// Two matrices (or a matrix and a vector) disagree in dimension.
    DimensionMismatch { name: &'static str, expected: usize, actual: usize },

    /// An entry is NaN/±inf.
    NonFiniteEntry { name: &'static str, row: usize, col: usize, value: f64 },

    /// An entry is negative.
    NegativeEntry { name: &'static str, row: usize, col: usize, value: f64 },

    /// A column of the survival matrix sums to more than one.
    NotSubstochastic { col: usize, sum: f64 },

    /// A fertility index `(row, col)` lies outside the matrix.
    FertilityIndexOutOfRange { row: usize, col: usize, dim: usize },

    // ---- Options / arguments ----
    /// Tolerances must be finite, non-negative and not both zero.
    InvalidTolerance { rel: f64, abs: f64, reason: &'static str },

    /// Search caps must be strictly positive.
    InvalidSearchLimits { reason: &'static str },

    /// A call-time argument is invalid.
    InvalidArgument { name: &'static str, reason: String },

    // ---- Descriptor evaluation ----
    /// The descriptor needs the decomposition A = S + F, which is unknown.
    NotAvailable { descriptor: &'static str, reason: &'static str },

    /// A numerical result contradicts the theory (e.g. complex Perron root).
    UnexpectedMathError { reason: String },

    /// A bounded search or simulation exhausted its caps.
    CannotCompute { reason: String },

    /// The matrix does not satisfy the precondition of the descriptor.
    InadequateMatrix { reason: &'static str },

    /// A Neumann series does not converge (spectral radius ≥ 1 or singular).
    NonConvergentMatrix { name: &'static str },
}

impl std::error::Error for MPMError {}

impl std::fmt::Display for MPMError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Matrix input / construction ----
            MPMError::MissingArguments { reason } => {
                write!(f, "Missing arguments: {reason}")
            }
            MPMError::InvalidLiteral { source, reason } => {
                write!(f, "Cannot parse matrix from {source:?}: {reason}")
            }
            MPMError::RaggedRows { row, expected, actual } => {
                write!(f, "Row {row} has {actual} entries; expected {expected}.")
            }
            MPMError::EmptyMatrix { name } => {
                write!(f, "Matrix {name} is empty.")
            }
            MPMError::Io { path, reason } => {
                write!(f, "Cannot read matrix file {path}: {reason}")
            }
            MPMError::NotSquare { name, rows, cols } => {
                write!(f, "Matrix {name} must be square; got shape ({rows}, {cols}).")
            }
            MPMError::DimensionMismatch { name, expected, actual } => {
                write!(f, "{name} has dimension {actual}; expected {expected}.")
            }
            MPMError::NonFiniteEntry { name, row, col, value } => {
                write!(f, "Entry ({row}, {col}) of {name} is non-finite: {value}")
            }
            MPMError::NegativeEntry { name, row, col, value } => {
                write!(f, "Entry ({row}, {col}) of {name} is negative: {value}")
            }
            MPMError::NotSubstochastic { col, sum } => {
                write!(f, "Column {col} of S sums to {sum} > 1; S must be substochastic.")
            }
            MPMError::FertilityIndexOutOfRange { row, col, dim } => {
                write!(f, "Fertility index ({row}, {col}) is out of range for dimension {dim}.")
            }
            // ---- Options / arguments ----
            MPMError::InvalidTolerance { rel, abs, reason } => {
                write!(f, "Invalid tolerance (rel = {rel}, abs = {abs}): {reason}")
            }
            MPMError::InvalidSearchLimits { reason } => {
                write!(f, "Invalid search limits: {reason}")
            }
            MPMError::InvalidArgument { name, reason } => {
                write!(f, "Invalid argument `{name}`: {reason}")
            }
            // ---- Descriptor evaluation ----
            MPMError::NotAvailable { descriptor, reason } => {
                write!(f, "{descriptor} is not available: {reason}")
            }
            MPMError::UnexpectedMathError { reason } => {
                write!(f, "Unexpected mathematical error: {reason}")
            }
            MPMError::CannotCompute { reason } => {
                write!(f, "Cannot compute: {reason}")
            }
            MPMError::InadequateMatrix { reason } => {
                write!(f, "Inadequate matrix: {reason}")
            }
            MPMError::NonConvergentMatrix { name } => {
                write!(f, "The Neumann series of {name} does not converge.")
            }
        }
    }
}

/// Convert an [`MPMError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<MPMError> for PyErr {
    fn from(err: MPMError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

impl MPMError {
    /// Shorthand for [`MPMError::NotAvailable`] raised when `split == false`.
    pub(crate) fn no_decomposition(descriptor: &'static str) -> Self {
        MPMError::NotAvailable {
            descriptor,
            reason: "the decomposition A = S + F is not known for this model",
        }
    }

    pub(crate) fn unexpected(reason: impl Into<String>) -> Self {
        MPMError::UnexpectedMathError { reason: reason.into() }
    }
}
