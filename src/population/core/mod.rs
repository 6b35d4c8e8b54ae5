//! core — inputs, configuration and cache primitives for population models.
//!
//! Purpose
//! -------
//! Collect the building blocks that every model relies on before any
//! descriptor is evaluated: matrix inputs and their parsing
//! ([`matrix_input`]), resolution and validation of `A = S + F`
//! ([`decomposition`], [`validation`]), tolerances and options
//! ([`tolerance`], [`options`]) and the write-once descriptor slots with the
//! tagged `Defined` result ([`descriptor`]).
//!
//! Invariants & assumptions
//! ------------------------
//! - A [`Decomposition`] that exists is valid: square, finite, non-negative
//!   matrices of one dimension with a substochastic `S`.
//! - Options are validated at construction and immutable afterwards.
//!
//! Conventions
//! -----------
//! - This module performs file I/O only in [`matrix_input::load_file`] and
//!   logs only at `trace`/`debug` level.
pub mod decomposition;
pub mod descriptor;
pub mod matrix_input;
pub mod options;
pub mod tolerance;
pub mod validation;

// ---- Re-exports (primary public surface) ----
pub use self::decomposition::{Decomposition, ModelInputs};
pub use self::descriptor::{Caveat, Defined, Descriptor, DescriptorState};
pub use self::matrix_input::MatrixInput;
pub use self::options::{LoadOptions, ModelOptions, SearchLimits};
pub use self::tolerance::{Tolerance, ABS_TOL, REL_TOL};
