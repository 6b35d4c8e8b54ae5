//! Validation helpers — reusable checks for projection matrices and
//! population vectors.
//!
//! Purpose
//! -------
//! Centralize the structural checks that the decomposition layer and the
//! vector-taking descriptors (`keyfitz_delta`, `cohen_d1`,
//! `population_momentum`, the estimator's initial distribution) apply to their
//! inputs, so they fail fast with structured errors.
//!
//! Key behaviors
//! -------------
//! - Squareness and dimension agreement.
//! - Finite, non-negative entries (reported at the first offending index).
//! - Column-substochasticity of the survival matrix, up to the absolute
//!   tolerance.
//!
//! Conventions
//! -----------
//! - Validation functions return [`MPMResult`] and never panic on invalid
//!   inputs; they contain no I/O and no logging.
use ndarray::{Array1, Array2, Axis};

use crate::population::{
    core::tolerance::Tolerance,
    errors::{MPMError, MPMResult},
};

/// Ensure `m` is square and return its dimension.
pub fn validate_square(name: &'static str, m: &Array2<f64>) -> MPMResult<usize> {
    let (rows, cols) = m.dim();
    if rows != cols {
        return Err(MPMError::NotSquare { name, rows, cols });
    }
    if rows == 0 {
        return Err(MPMError::EmptyMatrix { name });
    }
    Ok(rows)
}

/// Ensure every entry of `m` is finite and `≥ 0`.
pub fn validate_nonnegative(name: &'static str, m: &Array2<f64>) -> MPMResult<()> {
    for ((row, col), &value) in m.indexed_iter() {
        if !value.is_finite() {
            return Err(MPMError::NonFiniteEntry { name, row, col, value });
        }
        if value < 0.0 {
            return Err(MPMError::NegativeEntry { name, row, col, value });
        }
    }
    Ok(())
}

/// Ensure `m` has dimension `dim`.
pub fn validate_dim(name: &'static str, m: &Array2<f64>, dim: usize) -> MPMResult<()> {
    if m.nrows() != dim {
        return Err(MPMError::DimensionMismatch { name, expected: dim, actual: m.nrows() });
    }
    Ok(())
}

/// Ensure every column of `s` sums to at most one (up to `tol.abs`).
pub fn validate_substochastic(s: &Array2<f64>, tol: &Tolerance) -> MPMResult<()> {
    for (col, sum) in s.sum_axis(Axis(0)).iter().enumerate() {
        if *sum > 1.0 + tol.abs {
            return Err(MPMError::NotSubstochastic { col, sum: *sum });
        }
    }
    Ok(())
}

/// Validate a population vector: right length, finite, non-negative and not
/// identically zero. Returns its total.
pub fn validate_population_vector(
    name: &'static str, x: &Array1<f64>, dim: usize,
) -> MPMResult<f64> {
    if x.len() != dim {
        return Err(MPMError::DimensionMismatch { name, expected: dim, actual: x.len() });
    }
    for (i, &value) in x.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(MPMError::InvalidArgument {
                name,
                reason: format!("entry {i} must be finite and >= 0; got {value}"),
            });
        }
    }
    let total = x.sum();
    if total <= 0.0 {
        return Err(MPMError::InvalidArgument {
            name,
            reason: "must have a positive sum".to_string(),
        });
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // ---- Scope ----
    // These tests cover:
    // - Each helper on one valid and one invalid input.

    #[test]
    // Purpose
    // -------
    // Non-square and negative matrices are rejected with their positions.
    //
    // Given
    // -----
    // - A 2×3 matrix, and a 2×2 matrix with -0.1 at (1, 0).
    //
    // Expect
    // ------
    // - `NotSquare` and `NegativeEntry { row: 1, col: 0 }`.
    fn square_and_sign_checks_report_offenders() {
        // Arrange
        let wide = Array2::<f64>::zeros((2, 3));
        let neg = array![[0.0, 1.0], [-0.1, 0.5]];

        // Act
        let e1 = validate_square("A", &wide).unwrap_err();
        let e2 = validate_nonnegative("S", &neg).unwrap_err();

        // Assert
        assert_eq!(e1, MPMError::NotSquare { name: "A", rows: 2, cols: 3 });
        assert_eq!(e2, MPMError::NegativeEntry { name: "S", row: 1, col: 0, value: -0.1 });
    }

    #[test]
    // Purpose
    // -------
    // Column sums above one fail; sums of exactly one pass.
    //
    // Given
    // -----
    // - `[[0.5, 0.0], [0.5, 0.9]]` and `[[0.6, 0.0], [0.5, 0.9]]`.
    //
    // Expect
    // ------
    // - Ok, then `NotSubstochastic { col: 0 }`.
    fn substochastic_check_uses_column_sums() {
        // Arrange
        let tol = Tolerance::default();

        // Act / Assert
        assert!(validate_substochastic(&array![[0.5, 0.0], [0.5, 0.9]], &tol).is_ok());
        match validate_substochastic(&array![[0.6, 0.0], [0.5, 0.9]], &tol) {
            Err(MPMError::NotSubstochastic { col, .. }) => assert_eq!(col, 0),
            other => panic!("expected NotSubstochastic, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Population vectors must be non-negative with a positive sum.
    //
    // Given
    // -----
    // - A zero vector and a vector of the wrong length.
    //
    // Expect
    // ------
    // - `InvalidArgument` and `DimensionMismatch`.
    fn population_vector_checks() {
        // Act
        let zero = validate_population_vector("n0", &array![0.0, 0.0], 2).unwrap_err();
        let short = validate_population_vector("n0", &array![1.0], 2).unwrap_err();

        // Assert
        assert!(matches!(zero, MPMError::InvalidArgument { .. }));
        assert!(matches!(short, MPMError::DimensionMismatch { .. }));
    }
}
