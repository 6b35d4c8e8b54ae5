//! linalg — matrix-side algorithms shared by the population models.
//!
//! Purpose
//! -------
//! Hold the algorithms that work on any non-negative square matrix and know
//! nothing about survival, fertility or caching: the support graph
//! ([`graph`]), the ordered spectrum ([`eigen`]), dense utilities bridging
//! `ndarray` and `nalgebra` ([`dense`]) and scalar helpers ([`numeric`]).
//!
//! Conventions
//! -----------
//! - Inputs are `ndarray` matrices; `nalgebra` is only used internally for
//!   factorisations.
//! - Functions are pure: no caching, no logging beyond `debug` traces on
//!   numerical fallbacks.
pub mod dense;
pub mod eigen;
pub mod graph;
pub mod numeric;

// ---- Re-exports (primary public surface) ----
pub use self::eigen::{eigen_elements, spectral_radius, Complex64, EigenElements};
pub use self::graph::{
    irreducible_components, is_irreducible, is_primitive, normal_form, periods,
    strongly_connected_components,
};
