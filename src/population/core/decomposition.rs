//! Decomposition — resolution and validation of `A = S + F`.
//!
//! Purpose
//! -------
//! Accept the projection matrix `A` and/or its survival (`S`) and fertility
//! (`F`) parts in any supported combination, derive whatever was not
//! supplied, and validate the result once so that every descriptor can rely
//! on a consistent, read-only triple.
//!
//! Key behaviors
//! -------------
//! - `S` and `F` ⇒ `A := S + F` (a supplied `A` is ignored).
//! - `S` and `A` ⇒ `F := A − S`; `F` and `A` ⇒ `S := A − F`.
//! - `A` and fertility indices ⇒ `F` keeps only the listed entries of `A`,
//!   `S := A − F`.
//! - `A` alone ⇒ no decomposition (`split == false`).
//! - Anything else ⇒ [`MPMError::MissingArguments`].
//!
//! Invariants & assumptions
//! ------------------------
//! - After [`Decomposition::resolve`] succeeds: every matrix is square, finite
//!   and non-negative; all share one dimension; columns of `S` sum to ≤ 1.
//! - Derived differences whose negative part is within the absolute
//!   tolerance are clamped to zero before validation.
//!
//! Conventions
//! -----------
//! - Matrices are column-to-row projections: `a_ij` is the contribution of
//!   class `j` at time `t` to class `i` at time `t + 1`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover each resolution branch and each construction failure.
use std::collections::BTreeMap;

use ndarray::Array2;

use crate::population::{
    core::{
        matrix_input::MatrixInput,
        options::{LoadOptions, ModelOptions},
        tolerance::Tolerance,
        validation::{validate_dim, validate_nonnegative, validate_square, validate_substochastic},
    },
    errors::{MPMError, MPMResult},
};

/// Everything needed to build a model.
///
/// Fields
/// ------
/// - `a`, `s`, `f`: `Option<MatrixInput>`
///   Any combination accepted by [`Decomposition::resolve`].
/// - `fertilities`: `Option<Vec<(usize, usize)>>`
///   Entries `(row, col)` of `A` that are fertility transitions; only valid
///   together with `A` alone.
/// - `metadata`: `BTreeMap<String, String>`
///   Free-form annotations with no computational meaning.
/// - `load`: [`LoadOptions`]
///   Format of `MatrixInput::File` inputs.
/// - `options`: [`ModelOptions`]
///   Tolerances, caps and warning switch for the model.
#[derive(Debug, Clone, Default)]
pub struct ModelInputs {
    pub a: Option<MatrixInput>,
    pub s: Option<MatrixInput>,
    pub f: Option<MatrixInput>,
    pub fertilities: Option<Vec<(usize, usize)>>,
    pub metadata: BTreeMap<String, String>,
    pub load: LoadOptions,
    pub options: ModelOptions,
}

impl ModelInputs {
    /// Inputs for a model known only through `A`.
    pub fn from_a(a: impl Into<MatrixInput>) -> Self {
        ModelInputs { a: Some(a.into()), ..ModelInputs::default() }
    }

    /// Inputs for a model given by its survival and fertility parts.
    pub fn from_sf(s: impl Into<MatrixInput>, f: impl Into<MatrixInput>) -> Self {
        ModelInputs { s: Some(s.into()), f: Some(f.into()), ..ModelInputs::default() }
    }

    pub fn with_a(mut self, a: impl Into<MatrixInput>) -> Self {
        self.a = Some(a.into());
        self
    }

    pub fn with_s(mut self, s: impl Into<MatrixInput>) -> Self {
        self.s = Some(s.into());
        self
    }

    pub fn with_f(mut self, f: impl Into<MatrixInput>) -> Self {
        self.f = Some(f.into());
        self
    }

    pub fn with_fertilities(mut self, entries: Vec<(usize, usize)>) -> Self {
        self.fertilities = Some(entries);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_load_options(mut self, load: LoadOptions) -> Self {
        self.load = load;
        self
    }
}

/// Validated `A`, with `S` and `F` when the decomposition is known.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    a: Array2<f64>,
    parts: Option<(Array2<f64>, Array2<f64>)>,
}

impl Decomposition {
    /// Resolve and validate the decomposition.
    ///
    /// Parameters
    /// ----------
    /// - `a`, `s`, `f`: `Option<&MatrixInput>`
    ///   Supplied matrices.
    /// - `fertilities`: `Option<&[(usize, usize)]>`
    ///   Fertility entries of `A` (with `A` alone).
    /// - `load`: `&LoadOptions`
    ///   File format options.
    /// - `tol`: `&Tolerance`
    ///   Absolute tolerance for clamping derived differences and for the
    ///   substochasticity check.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::MissingArguments`] if the matrices cannot be determined.
    /// - [`MPMError::InvalidArgument`] if `fertilities` accompanies `S`/`F`.
    /// - Any parsing or validation error for the supplied or derived matrices.
    pub fn resolve(
        a: Option<&MatrixInput>, s: Option<&MatrixInput>, f: Option<&MatrixInput>,
        fertilities: Option<&[(usize, usize)]>, load: &LoadOptions, tol: &Tolerance,
    ) -> MPMResult<Self> {
        if fertilities.is_some() && (s.is_some() || f.is_some()) {
            return Err(MPMError::InvalidArgument {
                name: "fertilities",
                reason: "fertility entries can only be combined with A alone".to_string(),
            });
        }

        match (a, s, f) {
            (a_in, Some(s_in), Some(f_in)) => {
                if a_in.is_some() {
                    tracing::debug!("A is ignored when both S and F are supplied");
                }
                let s = checked("S", s_in, load)?;
                let f = checked("F", f_in, load)?;
                validate_dim("F", &f, s.nrows())?;
                let a = &s + &f;
                Self::from_parts(a, s, f, tol)
            }
            (Some(a_in), Some(s_in), None) => {
                let a = checked("A", a_in, load)?;
                let s = checked("S", s_in, load)?;
                validate_dim("S", &s, a.nrows())?;
                let f = clamped_difference(&a, &s, tol);
                validate_nonnegative("F", &f)?;
                Self::from_parts(a, s, f, tol)
            }
            (Some(a_in), None, Some(f_in)) => {
                let a = checked("A", a_in, load)?;
                let f = checked("F", f_in, load)?;
                validate_dim("F", &f, a.nrows())?;
                let s = clamped_difference(&a, &f, tol);
                validate_nonnegative("S", &s)?;
                Self::from_parts(a, s, f, tol)
            }
            (None, Some(_), None) => {
                Err(MPMError::MissingArguments { reason: "Specifying S is not sufficient." })
            }
            (None, None, Some(_)) => {
                Err(MPMError::MissingArguments { reason: "Specifying F is not sufficient." })
            }
            (Some(a_in), None, None) => {
                let a = checked("A", a_in, load)?;
                match fertilities {
                    Some(entries) => {
                        let dim = a.nrows();
                        let mut f = Array2::<f64>::zeros((dim, dim));
                        for &(row, col) in entries {
                            if row >= dim || col >= dim {
                                return Err(MPMError::FertilityIndexOutOfRange { row, col, dim });
                            }
                            f[[row, col]] = a[[row, col]];
                        }
                        let s = &a - &f;
                        Self::from_parts(a, s, f, tol)
                    }
                    None => Ok(Decomposition { a, parts: None }),
                }
            }
            (None, None, None) => {
                Err(MPMError::MissingArguments { reason: "No matrix was specified." })
            }
        }
    }

    fn from_parts(
        a: Array2<f64>, s: Array2<f64>, f: Array2<f64>, tol: &Tolerance,
    ) -> MPMResult<Self> {
        validate_nonnegative("A", &a)?;
        validate_substochastic(&s, tol)?;
        Ok(Decomposition { a, parts: Some((s, f)) })
    }

    /// Projection matrix `A`.
    pub fn a(&self) -> &Array2<f64> {
        &self.a
    }

    /// Survival matrix `S`, when known.
    pub fn s(&self) -> Option<&Array2<f64>> {
        self.parts.as_ref().map(|(s, _)| s)
    }

    /// Fertility matrix `F`, when known.
    pub fn f(&self) -> Option<&Array2<f64>> {
        self.parts.as_ref().map(|(_, f)| f)
    }

    /// Whether `S` and `F` are known.
    pub fn split(&self) -> bool {
        self.parts.is_some()
    }

    pub fn dim(&self) -> usize {
        self.a.nrows()
    }
}

fn checked(name: &'static str, input: &MatrixInput, load: &LoadOptions) -> MPMResult<Array2<f64>> {
    let m = input.to_array(name, load)?;
    validate_square(name, &m)?;
    validate_nonnegative(name, &m)?;
    Ok(m)
}

/// `x − y` with negative entries of magnitude ≤ `tol.abs` set to zero.
fn clamped_difference(x: &Array2<f64>, y: &Array2<f64>, tol: &Tolerance) -> Array2<f64> {
    (x - y).mapv(|d| if d < 0.0 && d >= -tol.abs { 0.0 } else { d })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // ---- Scope ----
    // These tests cover:
    // - Every resolution branch of `Decomposition::resolve`.
    // - Missing-argument and validation failures.
    //
    // They intentionally DO NOT cover:
    // - Literal parsing details (see `matrix_input`).

    fn lit(text: &str) -> MatrixInput {
        MatrixInput::from(text)
    }

    fn resolve(
        a: Option<&str>, s: Option<&str>, f: Option<&str>, fert: Option<&[(usize, usize)]>,
    ) -> MPMResult<Decomposition> {
        let (a, s, f) = (a.map(lit), s.map(lit), f.map(lit));
        Decomposition::resolve(
            a.as_ref(),
            s.as_ref(),
            f.as_ref(),
            fert,
            &LoadOptions::default(),
            &Tolerance::default(),
        )
    }

    #[test]
    // Purpose
    // -------
    // `S` and `F` determine `A`.
    //
    // Given
    // -----
    // - S = [[0.1, 0], [0.4, 0.8]], F = [[0, 2], [0, 0]].
    //
    // Expect
    // ------
    // - A = [[0.1, 2], [0.4, 0.8]] and `split == true`.
    fn survival_and_fertility_sum_to_projection() {
        // Act
        let d = resolve(None, Some("0.1 0; 0.4 0.8"), Some("0 2; 0 0"), None).unwrap();

        // Assert
        assert!(d.split());
        assert_eq!(d.a(), &array![[0.1, 2.0], [0.4, 0.8]]);
    }

    #[test]
    // Purpose
    // -------
    // `A` with `S` or with `F` derives the missing part.
    //
    // Given
    // -----
    // - A = [[0.5, 1], [0.3, 0.8]] with S = [[0, 0], [0.3, 0.8]], then with
    //   F = [[0.5, 1], [0, 0]].
    //
    // Expect
    // ------
    // - F resp. S equal to the complement.
    fn projection_with_one_part_derives_the_other() {
        // Act
        let with_s = resolve(Some("0.5 1; 0.3 0.8"), Some("0 0; 0.3 0.8"), None, None).unwrap();
        let with_f = resolve(Some("0.5 1; 0.3 0.8"), None, Some("0.5 1; 0 0"), None).unwrap();

        // Assert
        assert_eq!(with_s.f().unwrap(), &array![[0.5, 1.0], [0.0, 0.0]]);
        assert_eq!(with_f.s().unwrap(), &array![[0.0, 0.0], [0.3, 0.8]]);
    }

    #[test]
    // Purpose
    // -------
    // Fertility indices carve `F` out of `A`.
    //
    // Given
    // -----
    // - A = [[0.1, 2], [0.4, 0.8]] with fertilities [(0, 1)].
    //
    // Expect
    // ------
    // - F = [[0, 2], [0, 0]] and S = [[0.1, 0], [0.4, 0.8]].
    fn fertility_indices_split_projection() {
        // Act
        let d = resolve(Some("0.1 2; 0.4 0.8"), None, None, Some(&[(0, 1)])).unwrap();

        // Assert
        assert_eq!(d.f().unwrap(), &array![[0.0, 2.0], [0.0, 0.0]]);
        assert_eq!(d.s().unwrap(), &array![[0.1, 0.0], [0.4, 0.8]]);
    }

    #[test]
    // Purpose
    // -------
    // `A` alone leaves the decomposition unknown.
    //
    // Given
    // -----
    // - A = [[0.1, 2], [0.4, 0.8]].
    //
    // Expect
    // ------
    // - `split == false`, `s()` and `f()` are `None`.
    fn projection_alone_is_not_split() {
        // Act
        let d = resolve(Some("0.1 2; 0.4 0.8"), None, None, None).unwrap();

        // Assert
        assert!(!d.split());
        assert!(d.s().is_none() && d.f().is_none());
        assert_eq!(d.dim(), 2);
    }

    #[test]
    // Purpose
    // -------
    // Underdetermined inputs fail with `MissingArguments`.
    //
    // Given
    // -----
    // - S alone, F alone, nothing.
    //
    // Expect
    // ------
    // - `MissingArguments` in every case.
    fn underdetermined_inputs_are_missing_arguments() {
        for result in [
            resolve(None, Some("0.5"), None, None),
            resolve(None, None, Some("1.0"), None),
            resolve(None, None, None, None),
        ] {
            match result {
                Err(MPMError::MissingArguments { .. }) => {}
                other => panic!("expected MissingArguments, got {other:?}"),
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Structural violations are construction errors.
    //
    // Given
    // -----
    // - S with a column summing to 1.2; F larger than A; a 1×2 matrix.
    //
    // Expect
    // ------
    // - `NotSubstochastic`, `NegativeEntry` for the derived S, `NotSquare`.
    fn structural_violations_fail_construction() {
        // Act
        let not_sub = resolve(None, Some("0.6 0; 0.6 0.5"), Some("0 1; 0 0"), None).unwrap_err();
        let neg = resolve(Some("0.5 1; 0.3 0.8"), None, Some("0.7 1; 0 0"), None).unwrap_err();
        let wide = resolve(Some("1 2"), None, None, None).unwrap_err();

        // Assert
        assert!(matches!(not_sub, MPMError::NotSubstochastic { col: 0, .. }));
        assert!(matches!(neg, MPMError::NegativeEntry { name: "S", .. }));
        assert!(matches!(wide, MPMError::NotSquare { .. }));
    }

    #[test]
    // Purpose
    // -------
    // Out-of-range fertility entries are rejected.
    //
    // Given
    // -----
    // - A 2×2 matrix with fertility entry (0, 2).
    //
    // Expect
    // ------
    // - `FertilityIndexOutOfRange { row: 0, col: 2, dim: 2 }`.
    fn fertility_index_out_of_range() {
        // Act
        let err = resolve(Some("0.1 2; 0.4 0.8"), None, None, Some(&[(0, 2)])).unwrap_err();

        // Assert
        assert_eq!(err, MPMError::FertilityIndexOutOfRange { row: 0, col: 2, dim: 2 });
    }
}
