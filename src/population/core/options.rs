//! Model-level configuration: tolerances, search caps, warning switch and
//! matrix-file loading options.
//!
//! Purpose
//! -------
//! Group the knobs that influence descriptor evaluation into small validated
//! structs so that a [`MatrixPopulationModel`](crate::population::models::mpm::MatrixPopulationModel)
//! carries a single, immutable configuration for its whole lifetime.
//!
//! Key behaviors
//! -------------
//! - [`SearchLimits`] bounds every open-ended loop in the library (the
//!   commensurability search behind the second-order period, the life-table
//!   entropy series, the QR iteration of the eigen solver).
//! - [`ModelOptions`] bundles the shared [`Tolerance`], the limits, the
//!   eigenvalue rounding threshold and whether caveats are logged.
//! - [`LoadOptions`] describes the text format of matrix files.
//!
//! Conventions
//! -----------
//! - Every struct has a `Default` impl with the library defaults and, where
//!   validation is needed, a `new` constructor returning `MPMResult`.
use crate::population::{
    core::tolerance::Tolerance,
    errors::{MPMError, MPMResult},
};

/// Largest multiplier tried by the commensurability search.
pub const MAX_MULTIPLIER: usize = 120;

/// Largest number of integer tuples enumerated by the commensurability search.
pub const MAX_TUPLES: usize = 1_000_000;

/// Caps on the bounded searches used by descriptors.
///
/// Fields
/// ------
/// - `max_multiplier`: `usize`
///   Largest integer `k` tried for each period in the commensurability
///   search of the second-order period.
/// - `max_tuples`: `usize`
///   Budget of integer tuples enumerated by that search; the per-period range
///   is `max(1, min(floor(max_tuples^(1/q)), max_multiplier))`.
/// - `max_series_terms`: `usize`
///   Maximum number of terms summed by series descriptors such as the
///   life-table entropy.
/// - `max_qr_iterations`: `usize`
///   Iteration cap handed to the real Schur decomposition.
/// - `max_bisection_steps`: `usize`
///   Largest number of halvings (including bracket doublings) performed by
///   the excess solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_multiplier: usize,
    pub max_tuples: usize,
    pub max_series_terms: usize,
    pub max_qr_iterations: usize,
    pub max_bisection_steps: usize,
}

impl SearchLimits {
    /// Construct validated limits.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::InvalidSearchLimits`] if any cap is zero.
    pub fn new(
        max_multiplier: usize, max_tuples: usize, max_series_terms: usize,
        max_qr_iterations: usize, max_bisection_steps: usize,
    ) -> MPMResult<Self> {
        if max_multiplier == 0 || max_tuples == 0 {
            return Err(MPMError::InvalidSearchLimits {
                reason: "commensurability caps must be > 0",
            });
        }
        if max_series_terms == 0 {
            return Err(MPMError::InvalidSearchLimits { reason: "max_series_terms must be > 0" });
        }
        if max_qr_iterations == 0 {
            return Err(MPMError::InvalidSearchLimits { reason: "max_qr_iterations must be > 0" });
        }
        if max_bisection_steps == 0 {
            return Err(MPMError::InvalidSearchLimits { reason: "max_bisection_steps must be > 0" });
        }
        Ok(SearchLimits {
            max_multiplier,
            max_tuples,
            max_series_terms,
            max_qr_iterations,
            max_bisection_steps,
        })
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_multiplier: MAX_MULTIPLIER,
            max_tuples: MAX_TUPLES,
            max_series_terms: 100_000,
            max_qr_iterations: 10_000,
            max_bisection_steps: 2_000,
        }
    }
}

/// ModelOptions — configuration carried by every model.
///
/// Fields
/// ------
/// - `tolerance`: [`Tolerance`]
///   Shared closeness predicate.
/// - `limits`: [`SearchLimits`]
///   Caps on bounded searches.
/// - `eigen_eps`: `f64`
///   Real and imaginary parts of eigen elements below this magnitude are
///   rounded to zero before sorting and normalisation.
/// - `warnings`: `bool`
///   When `true`, reading an undefined descriptor emits a `tracing::warn!`
///   event naming the caveat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelOptions {
    pub tolerance: Tolerance,
    pub limits: SearchLimits,
    pub eigen_eps: f64,
    pub warnings: bool,
}

impl ModelOptions {
    /// Construct validated options.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::InvalidTolerance`] if `eigen_eps` is negative or
    ///   non-finite.
    pub fn new(
        tolerance: Tolerance, limits: SearchLimits, eigen_eps: f64, warnings: bool,
    ) -> MPMResult<Self> {
        if !eigen_eps.is_finite() || eigen_eps < 0.0 {
            return Err(MPMError::InvalidTolerance {
                rel: tolerance.rel,
                abs: eigen_eps,
                reason: "eigen rounding threshold must be finite and >= 0",
            });
        }
        Ok(ModelOptions { tolerance, limits, eigen_eps, warnings })
    }

    /// Same options with caveat logging switched off.
    pub fn silent(self) -> Self {
        ModelOptions { warnings: false, ..self }
    }
}

impl Default for ModelOptions {
    fn default() -> Self {
        ModelOptions {
            tolerance: Tolerance::default(),
            limits: SearchLimits::default(),
            eigen_eps: 1e-12,
            warnings: true,
        }
    }
}

/// Text format of matrix files.
///
/// Fields
/// ------
/// - `delimiter`: `Option<char>`
///   Column separator; `None` splits on whitespace.
/// - `comment_prefixes`: `Vec<String>`
///   Lines whose trimmed text starts with one of these prefixes are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub delimiter: Option<char>,
    pub comment_prefixes: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            delimiter: None,
            comment_prefixes: vec!["#".to_string(), "%".to_string(), "//".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Scope ----
    // These tests cover:
    // - Validation of `SearchLimits::new` and `ModelOptions::new`.
    // - Library defaults.

    #[test]
    // Purpose
    // -------
    // Zero caps are rejected.
    //
    // Given
    // -----
    // - `max_tuples = 0`.
    //
    // Expect
    // ------
    // - `MPMError::InvalidSearchLimits`.
    fn search_limits_reject_zero_caps() {
        // Act
        let err = SearchLimits::new(120, 0, 10, 10, 10).unwrap_err();

        // Assert
        assert!(matches!(err, MPMError::InvalidSearchLimits { .. }));
    }

    #[test]
    // Purpose
    // -------
    // Defaults match the documented constants.
    //
    // Given
    // -----
    // - `ModelOptions::default()`.
    //
    // Expect
    // ------
    // - Multiplier 120, tuple budget 1e6, warnings on, eigen threshold 1e-12.
    fn defaults_match_documented_constants() {
        // Act
        let opts = ModelOptions::default();

        // Assert
        assert_eq!(opts.limits.max_multiplier, 120);
        assert_eq!(opts.limits.max_tuples, 1_000_000);
        assert!(opts.warnings);
        assert_eq!(opts.eigen_eps, 1e-12);
        assert!(!opts.silent().warnings);
    }

    #[test]
    // Purpose
    // -------
    // Negative eigen thresholds are invalid.
    //
    // Given
    // -----
    // - `eigen_eps = -1.0`.
    //
    // Expect
    // ------
    // - `MPMError::InvalidTolerance`.
    fn model_options_reject_negative_eigen_threshold() {
        // Act
        let err = ModelOptions::new(Tolerance::default(), SearchLimits::default(), -1.0, true)
            .unwrap_err();

        // Assert
        assert!(matches!(err, MPMError::InvalidTolerance { .. }));
    }
}
