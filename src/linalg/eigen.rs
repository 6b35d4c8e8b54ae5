//! Eigen elements of real square matrices, ordered for population models.
//!
//! Purpose
//! -------
//! Compute the spectrum of a projection matrix together with matched right
//! and left eigenvectors, ordered so that the Perron root comes first and the
//! rest follow by decreasing modulus.
//!
//! Key behaviors
//! -------------
//! - Eigenvalues come from the real Schur form (`nalgebra::Schur::try_new`).
//!   If the QR iteration stalls (cyclic permutation matrices are the classic
//!   case), the matrix is conjugated by a fixed Householder reflection, which
//!   preserves the spectrum, and the decomposition is retried.
//! - Real and imaginary parts below `eps` are rounded to zero.
//! - Ordering key: (not the Perron root, −modulus, argument in `[0, 2π)`),
//!   where the Perron root is the eigenvalue with the largest real part.
//! - Eigenvectors are obtained by shifted inverse iteration on `M` (right)
//!   and `Mᵀ` (left) through a complex LU factorisation, so left and right
//!   vectors are matched by construction.
//! - Each vector is multiplied by the sign of its first non-zero real part
//!   and divided by its L1 norm when that norm exceeds `eps`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `values`, `right` and `left` have the same length as the dimension and
//!   are aligned index by index; eigenvalues repeat per algebraic
//!   multiplicity.
//! - For repeated eigenvalues the returned vectors are not guaranteed to be
//!   linearly independent.
//!
//! Testing notes
//! -------------
//! - Unit tests check the growth rate and stable distribution of a 2×2
//!   model against known values, the ordering of a cyclic spectrum, and the
//!   eigen-equation residuals for left and right vectors.
use std::f64::consts::TAU;

use nalgebra::{Complex, DMatrix, DVector, Schur};
use ndarray::{Array1, Array2};

use crate::{
    linalg::dense::{rank, to_dmatrix},
    population::errors::{MPMError, MPMResult},
};

pub type Complex64 = Complex<f64>;

/// Number of inverse-iteration sweeps per eigenvector.
const INVERSE_ITERATIONS: usize = 4;

/// Sorted eigenvalues with matched right and left eigenvectors.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenElements {
    pub values: Vec<Complex64>,
    pub right: Vec<Array1<Complex64>>,
    pub left: Vec<Array1<Complex64>>,
}

fn round_small(z: Complex64, eps: f64) -> Complex64 {
    let re = if z.re.abs() < eps { 0.0 } else { z.re };
    let im = if z.im.abs() < eps { 0.0 } else { z.im };
    Complex::new(re, im)
}

fn argument(z: &Complex64) -> f64 {
    let a = z.im.atan2(z.re);
    if a < 0.0 {
        a + TAU
    } else {
        a
    }
}

fn householder(n: usize) -> DMatrix<f64> {
    let u = DVector::from_fn(n, |i, _| (i + 1) as f64);
    let norm2 = u.dot(&u);
    DMatrix::<f64>::identity(n, n) - (&u * u.transpose()) * (2.0 / norm2)
}

/// Unsorted eigenvalues of `m`.
///
/// Errors
/// ------
/// - [`MPMError::CannotCompute`] if the QR iteration fails to converge within
///   `max_niter` sweeps, even after the Householder conjugation.
pub fn eigenvalues(m: &Array2<f64>, max_niter: usize) -> MPMResult<Vec<Complex64>> {
    let d = to_dmatrix(m);
    if let Some(schur) = Schur::try_new(d.clone(), f64::EPSILON, max_niter) {
        return Ok(schur.complex_eigenvalues().iter().copied().collect());
    }
    tracing::debug!(dim = m.nrows(), "Schur iteration stalled; retrying on a conjugated matrix");
    let h = householder(m.nrows());
    let conjugated = &h * d * &h;
    Schur::try_new(conjugated, f64::EPSILON, max_niter)
        .map(|schur| schur.complex_eigenvalues().iter().copied().collect())
        .ok_or_else(|| MPMError::CannotCompute {
            reason: format!("the QR iteration did not converge in {max_niter} sweeps"),
        })
}

/// Largest modulus among the eigenvalues of `m`.
pub fn spectral_radius(m: &Array2<f64>, max_niter: usize) -> MPMResult<f64> {
    Ok(eigenvalues(m, max_niter)?.iter().map(|z| z.norm()).fold(0.0, f64::max))
}

/// Dimension of the eigenspace of the real eigenvalue `lambda`.
pub fn geometric_multiplicity(m: &Array2<f64>, lambda: f64, eps: f64) -> usize {
    let n = m.nrows();
    let shifted = m - &(Array2::<f64>::eye(n) * lambda);
    n - rank(&shifted, eps)
}

fn inverse_iteration(m: &DMatrix<Complex64>, mu: Complex64) -> MPMResult<DVector<Complex64>> {
    let n = m.nrows();
    let mut offset = mu.norm().max(1.0) * 1e-10;
    for _ in 0..8 {
        let shift = mu + Complex::new(offset, 0.0);
        let shifted = m - DMatrix::<Complex64>::identity(n, n) * shift;
        let lu = shifted.lu();
        let mut x = DVector::from_fn(n, |i, _| Complex::new(1.0 / (1.0 + i as f64), 0.0));
        let mut ok = true;
        for _ in 0..INVERSE_ITERATIONS {
            match lu.solve(&x) {
                Some(y) => {
                    let scale = y.iter().map(|z| z.norm()).fold(0.0, f64::max);
                    if !scale.is_finite() || scale == 0.0 {
                        ok = false;
                        break;
                    }
                    x = y.unscale(scale);
                }
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            return Ok(x);
        }
        offset *= 10.0;
    }
    Err(MPMError::unexpected(format!("inverse iteration failed for eigenvalue {mu}")))
}

fn normalise(x: &DVector<Complex64>, eps: f64) -> Array1<Complex64> {
    let mut v: Array1<Complex64> = x.iter().copied().collect();
    if let Some(first) = v.iter().find(|z| z.re != 0.0) {
        let sign = first.re.signum();
        v.mapv_inplace(|z| z * sign);
    }
    let l1: f64 = v.iter().map(|z| z.norm()).sum();
    if l1 > eps {
        v.mapv_inplace(|z| z.unscale(l1));
    }
    v.mapv(|z| round_small(z, eps))
}

/// Sorted eigenvalues with normalised right and left eigenvectors.
///
/// Parameters
/// ----------
/// - `m`: `&Array2<f64>`
///   Square matrix.
/// - `eps`: `f64`
///   Rounding threshold for real and imaginary parts.
/// - `max_niter`: `usize`
///   Cap on QR sweeps for the Schur decomposition.
///
/// Errors
/// ------
/// - [`MPMError::CannotCompute`] if the Schur decomposition fails.
/// - [`MPMError::UnexpectedMathError`] if inverse iteration breaks down.
pub fn eigen_elements(m: &Array2<f64>, eps: f64, max_niter: usize) -> MPMResult<EigenElements> {
    let mut values: Vec<Complex64> =
        eigenvalues(m, max_niter)?.into_iter().map(|z| round_small(z, eps)).collect();

    let perron = values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, z)| match best {
            Some((_, re)) if re >= z.re => best,
            _ => Some((i, z.re)),
        })
        .map(|(i, _)| i)
        .unwrap_or(0);
    let perron_value = values[perron];
    values.swap(0, perron);
    values[1..].sort_by(|a, b| {
        b.norm().total_cmp(&a.norm()).then_with(|| argument(a).total_cmp(&argument(b)))
    });
    debug_assert_eq!(values[0], perron_value);

    let complex_m = to_dmatrix(m).map(|x| Complex::new(x, 0.0));
    let complex_mt = complex_m.transpose();
    let mut right = Vec::with_capacity(values.len());
    let mut left = Vec::with_capacity(values.len());
    for &mu in &values {
        right.push(normalise(&inverse_iteration(&complex_m, mu)?, eps));
        left.push(normalise(&inverse_iteration(&complex_mt, mu)?, eps));
    }
    Ok(EigenElements { values, right, left })
}

/// Real parts of `v` if every imaginary part is zero.
pub fn real_vector(v: &Array1<Complex64>) -> Option<Array1<f64>> {
    if v.iter().all(|z| z.im == 0.0) {
        Some(v.mapv(|z| z.re))
    } else {
        None
    }
}
