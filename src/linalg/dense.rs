//! Dense helpers — the ndarray ↔ nalgebra bridge and small matrix utilities.
//!
//! Purpose
//! -------
//! Keep the public surface of the crate on `ndarray` while delegating the
//! factorisations (LU, SVD, Schur) to `nalgebra`. Conversions are explicit,
//! element-by-element copies.
//!
//! Conventions
//! -----------
//! - All matrices are square unless a function says otherwise.
//! - `inverse` returns `None` for singular matrices; callers map that onto a
//!   domain error.
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, Axis};

/// Copy an `ndarray` matrix into a pre-allocated `DMatrix` of the same shape.
pub fn fill_dmatrix(src: &Array2<f64>, dst: &mut DMatrix<f64>) {
    for ((i, j), &x) in src.indexed_iter() {
        dst[(i, j)] = x;
    }
}

pub fn to_dmatrix(src: &Array2<f64>) -> DMatrix<f64> {
    let mut dst = DMatrix::<f64>::zeros(src.nrows(), src.ncols());
    fill_dmatrix(src, &mut dst);
    dst
}

pub fn to_array2(src: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((src.nrows(), src.ncols()), |(i, j)| src[(i, j)])
}

/// Inverse through LU; `None` when the matrix is singular.
pub fn inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    to_dmatrix(m).try_inverse().map(|inv| to_array2(&inv))
}

/// `M^k` by binary exponentiation (`M^0 = I`).
pub fn matrix_power(m: &Array2<f64>, mut k: usize) -> Array2<f64> {
    let mut result = Array2::<f64>::eye(m.nrows());
    let mut base = m.clone();
    while k > 0 {
        if k & 1 == 1 {
            result = result.dot(&base);
        }
        k >>= 1;
        if k > 0 {
            base = base.dot(&base);
        }
    }
    result
}

/// Column sums (`e M` with `e` the row vector of ones).
pub fn column_sums(m: &Array2<f64>) -> Array1<f64> {
    m.sum_axis(Axis(0))
}

/// Numerical rank from the singular values (entries above `eps`).
pub fn rank(m: &Array2<f64>, eps: f64) -> usize {
    to_dmatrix(m).rank(eps)
}

/// Outer product `x yᵀ`.
pub fn outer(x: &Array1<f64>, y: &Array1<f64>) -> Array2<f64> {
    Array2::from_shape_fn((x.len(), y.len()), |(i, j)| x[i] * y[j])
}
