//! population — matrix population models and their demographic descriptors.
//!
//! Purpose
//! -------
//! Bundle model inputs, validation, the lazily cached descriptor engine and
//! shared error types under one namespace. This is the main entry point for
//! Rust callers and for the Python bindings.
//!
//! Key behaviors
//! -------------
//! - [`core`] parses and validates `A`, `S`, `F`, carries tolerances and
//!   search limits, and defines the `Defined` / `Caveat` result vocabulary.
//! - [`models`] exposes [`MatrixPopulationModel`] and its descriptor
//!   families.
//! - [`errors`] centralizes [`MPMError`] and the [`MPMResult`] alias.
//!
//! Conventions
//! -----------
//! - Column-to-row convention: `a_ij` is the contribution of class `j` at
//!   time `t` to class `i` at time `t + 1`.
//! - Indexing is 0-based throughout.
//! - Undefined-but-legitimate results are values (`Defined::Undefined`), not
//!   errors; genuine failures are `Err(MPMError)`.
//!
//! Downstream usage
//! ----------------
//! - Build [`ModelInputs`] from `A` or from `(S, F)`, optionally attach
//!   [`ModelOptions`], then call `MatrixPopulationModel::new(inputs)` and
//!   query descriptors by method.

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    Caveat, Decomposition, Defined, LoadOptions, MatrixInput, ModelInputs, ModelOptions,
    SearchLimits, Tolerance,
};

pub use self::errors::{MPMError, MPMResult};

pub use self::models::{
    IrreducibleComponents, MatrixPopulationModel, NewbornClass, NormalForm, R0Elements,
    ReproductionChain,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_matpop::population::prelude::*;
//
// to import the main model surface in a single line.

pub mod prelude {
    pub use super::{
        Caveat, Defined, MPMError, MPMResult, MatrixInput, MatrixPopulationModel, ModelInputs,
        ModelOptions,
    };
}
