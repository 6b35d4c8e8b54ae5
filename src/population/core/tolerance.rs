//! Tolerance — the shared closeness predicate for every numerical comparison.
//!
//! Purpose
//! -------
//! Provide one validated `(rel, abs)` pair that classification, spectral
//! descriptors, clamping of fundamental matrices and the excess bisection all
//! use, so that "close to λ", "close to 1" and "numerically zero" mean the same
//! thing throughout a model.
//!
//! Key behaviors
//! -------------
//! - [`Tolerance::is_close`] mirrors the usual `|a − b| ≤ max(rel·max(|a|,|b|), abs)`
//!   rule; infinities are close only to themselves and NaN to nothing.
//! - [`Tolerance::new`] rejects non-finite, negative or all-zero tolerances.
//!
//! Invariants & assumptions
//! ------------------------
//! - `rel ≥ 0`, `abs ≥ 0`, both finite, and `rel + abs > 0`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover validation failures, symmetric closeness, infinity
//!   handling and the absolute floor near zero.
use crate::population::errors::{MPMError, MPMResult};

/// Default relative tolerance.
pub const REL_TOL: f64 = 1e-7;

/// Default absolute tolerance.
pub const ABS_TOL: f64 = 1e-10;

/// Relative/absolute tolerance pair used for all closeness tests.
///
/// Fields
/// ------
/// - `rel`: `f64`
///   Relative tolerance, scaled by the larger magnitude of the operands.
/// - `abs`: `f64`
///   Absolute floor; also the threshold below which matrix entries are
///   clamped to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub rel: f64,
    pub abs: f64,
}

impl Tolerance {
    /// Construct a validated tolerance pair.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::InvalidTolerance`] if either value is non-finite or
    ///   negative, or if both are zero.
    pub fn new(rel: f64, abs: f64) -> MPMResult<Self> {
        if !rel.is_finite() || !abs.is_finite() {
            return Err(MPMError::InvalidTolerance { rel, abs, reason: "must be finite" });
        }
        if rel < 0.0 || abs < 0.0 {
            return Err(MPMError::InvalidTolerance { rel, abs, reason: "must be non-negative" });
        }
        if rel == 0.0 && abs == 0.0 {
            return Err(MPMError::InvalidTolerance {
                rel,
                abs,
                reason: "rel and abs cannot both be zero",
            });
        }
        Ok(Tolerance { rel, abs })
    }

    /// Whether `a` and `b` are equal up to the tolerance.
    #[inline]
    pub fn is_close(&self, a: f64, b: f64) -> bool {
        if a == b {
            return true;
        }
        if !a.is_finite() || !b.is_finite() {
            return false;
        }
        let diff = (a - b).abs();
        diff <= (self.rel * a.abs().max(b.abs())).max(self.abs)
    }

    /// Whether `x` is numerically zero (`|x| ≤ abs`).
    #[inline]
    pub fn is_zero(&self, x: f64) -> bool {
        x.abs() <= self.abs
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance { rel: REL_TOL, abs: ABS_TOL }
    }
}
