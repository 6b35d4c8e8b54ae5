//! Spectral descriptors: growth rate, dominant vectors, sensitivities,
//! damping ratio and second-order period.
//!
//! Purpose
//! -------
//! Derive the asymptotic behavior of a model from the ordered eigen elements
//! of `A`.
//!
//! Key behaviors
//! -------------
//! - `lmbd` is the leading (Perron) eigenvalue; a non-real or negative value
//!   is an [`MPMError::UnexpectedMathError`].
//! - `w` and `v` exist only for quasi-primitive models; otherwise they are
//!   `Undefined(NotQuasiPrimitive)`. `v` is rescaled so that `v·w = 1`.
//! - `sensitivities` exist for quasi-irreducible models; when the model is
//!   not quasi-primitive, the non-negative Perron vectors are used instead of
//!   `w` and `v`.
//! - `damping_ratio` is `+∞` when no eigenvalue is strictly below λ in
//!   modulus, or when the subdominant modulus is zero.
//! - `second_order_period` runs a bounded commensurability search when more
//!   than two subdominant eigenvalues carry oscillations.
//!
//! Conventions
//! -----------
//! - Sensitivities follow `s_ij = ∂λ/∂a_ij = v_i w_j`.
use std::f64::consts::TAU;

use ndarray::{Array1, Array2};

use crate::{
    linalg::{
        dense::outer,
        eigen::{eigen_elements, real_vector, EigenElements},
        numeric::smallest_common_period,
    },
    population::{
        core::descriptor::{Caveat, Defined},
        errors::{MPMError, MPMResult},
        models::mpm::MatrixPopulationModel,
    },
};

fn nonnegative_real(v: &Array1<crate::linalg::Complex64>, what: &str) -> MPMResult<Array1<f64>> {
    let real = real_vector(v)
        .ok_or_else(|| MPMError::unexpected(format!("the dominant {what} is not real")))?;
    if real.iter().any(|&x| x < 0.0) {
        return Err(MPMError::unexpected(format!(
            "the dominant {what} has negative entries; this is caused by numerical errors in \
             the eigen decomposition"
        )));
    }
    Ok(real)
}

impl MatrixPopulationModel {
    /// Ordered eigenvalues of `A` with matched right and left eigenvectors.
    pub fn eigen_elements(&self) -> MPMResult<&EigenElements> {
        self.cache.eigen.get_or_try_init(|| {
            let opts = self.options();
            eigen_elements(self.a(), opts.eigen_eps, opts.limits.max_qr_iterations)
        })
    }

    /// Asymptotic growth rate λ.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::UnexpectedMathError`] if the leading eigenvalue is not a
    ///   non-negative real number.
    pub fn lmbd(&self) -> MPMResult<f64> {
        let l = self.cache.lmbd.get_or_try_init(|| {
            let lead = self.eigen_elements()?.values[0];
            if lead.im != 0.0 || lead.re < 0.0 {
                return Err(MPMError::unexpected(format!(
                    "the dominant eigenvalue {lead} is not a non-negative real number"
                )));
            }
            Ok(lead.re)
        })?;
        Ok(*l)
    }

    pub(crate) fn w_entry(&self) -> MPMResult<&Defined<Array1<f64>>> {
        self.cache.w.get_or_try_init(|| {
            if !self.quasi_primitive()? {
                return Ok(Defined::Undefined(Caveat::NotQuasiPrimitive));
            }
            let w = nonnegative_real(&self.eigen_elements()?.right[0], "right eigenvector")?;
            Ok(Defined::Value(w))
        })
    }

    /// Stable class distribution `w` (unit sum).
    pub fn w(&self) -> MPMResult<Defined<&Array1<f64>>> {
        Ok(self.report("w", self.w_entry()?))
    }

    pub(crate) fn v_entry(&self) -> MPMResult<&Defined<Array1<f64>>> {
        self.cache.v.get_or_try_init(|| {
            self.w_entry()?.as_ref().try_map(|w| {
                let left = nonnegative_real(&self.eigen_elements()?.left[0], "left eigenvector")?;
                let scale = left.dot(w);
                if scale <= 0.0 {
                    return Err(MPMError::unexpected(
                        "the dominant left and right eigenvectors are orthogonal",
                    ));
                }
                Ok(left / scale)
            })
        })
    }

    /// Reproductive values `v`, scaled so that `v·w = 1`.
    pub fn v(&self) -> MPMResult<Defined<&Array1<f64>>> {
        Ok(self.report("v", self.v_entry()?))
    }

    /// Ratio of λ to the largest modulus strictly below it.
    pub fn damping_ratio(&self) -> MPMResult<f64> {
        let d = self.cache.damping_ratio.get_or_try_init(|| {
            let lmbd = self.lmbd()?;
            Ok(match self.subdominant_modulus()? {
                Some(tau) if tau > 0.0 => lmbd / tau,
                _ => f64::INFINITY,
            })
        })?;
        Ok(*d)
    }

    /// Largest eigenvalue modulus not close to λ.
    fn subdominant_modulus(&self) -> MPMResult<Option<f64>> {
        let lmbd = self.lmbd()?;
        let tol = self.options().tolerance;
        Ok(self.eigen_elements()?.values.iter().map(|z| z.norm()).find(|&m| !tol.is_close(m, lmbd)))
    }

    fn second_order_period_entry(&self) -> MPMResult<&Defined<f64>> {
        self.cache.second_order_period.get_or_try_init(|| {
            let tol = self.options().tolerance;
            let Some(tau) = self.subdominant_modulus()? else {
                return Ok(Defined::Undefined(Caveat::NoSecondOrderOscillations));
            };
            let periods: Vec<f64> = self
                .eigen_elements()?
                .values
                .iter()
                .filter(|z| tol.is_close(z.norm(), tau))
                .map(|z| z.arg())
                .filter(|&phase| !tol.is_close(phase, 0.0))
                .map(|phase| (TAU / phase).abs())
                .collect();

            match periods.as_slice() {
                [] => Ok(Defined::Undefined(Caveat::NoSecondOrderOscillations)),
                [p] => {
                    if tol.is_close(*p, 2.0) {
                        Ok(Defined::Value(2.0))
                    } else {
                        Err(MPMError::unexpected(format!(
                            "a single oscillating subdominant eigenvalue must be real and \
                             negative; got period {p}"
                        )))
                    }
                }
                [p, q] => {
                    if tol.is_close(*p, *q) {
                        Ok(Defined::Value(*p))
                    } else {
                        Err(MPMError::unexpected(format!(
                            "subdominant conjugate eigenvalues with distinct periods {p} and {q}"
                        )))
                    }
                }
                _ => {
                    let mut distinct: Vec<f64> = Vec::new();
                    for &p in &periods {
                        if !distinct.iter().any(|&d| tol.is_close(d, p)) {
                            distinct.push(p);
                        }
                    }
                    if let [p] = distinct.as_slice() {
                        return Ok(Defined::Value(*p));
                    }
                    smallest_common_period(&distinct, &tol, &self.options().limits)
                        .map(Defined::Value)
                        .ok_or_else(|| MPMError::CannotCompute {
                            reason: format!(
                                "no common multiple of the periods {distinct:?} within the \
                                 search limits"
                            ),
                        })
                }
            }
        })
    }

    /// Period of the oscillations of the second-order term of the dynamics.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::CannotCompute`] when the periods are not commensurable
    ///   within the configured search limits.
    /// - [`MPMError::UnexpectedMathError`] for inconsistent conjugate pairs.
    pub fn second_order_period(&self) -> MPMResult<Defined<f64>> {
        Ok(self.report("second_order_period", self.second_order_period_entry()?).copied())
    }

    pub(crate) fn sensitivities_entry(&self) -> MPMResult<&Defined<Array2<f64>>> {
        self.cache.sensitivities.get_or_try_init(|| {
            if !self.quasi_irreducible()? {
                return Ok(Defined::Undefined(Caveat::NotQuasiIrreducible));
            }
            if let (Defined::Value(w), Defined::Value(v)) = (self.w_entry()?, self.v_entry()?) {
                return Ok(Defined::Value(outer(v, w)));
            }
            let e = self.eigen_elements()?;
            let rpv = nonnegative_real(&e.right[0], "right eigenvector")?;
            let lpv = nonnegative_real(&e.left[0], "left eigenvector")?;
            let scale = lpv.dot(&rpv);
            if scale <= 0.0 {
                return Err(MPMError::unexpected(
                    "the Perron left and right eigenvectors are orthogonal",
                ));
            }
            Ok(Defined::Value(outer(&(lpv / scale), &rpv)))
        })
    }

    /// Sensitivities `∂λ/∂a_ij`.
    pub fn sensitivities(&self) -> MPMResult<Defined<&Array2<f64>>> {
        Ok(self.report("sensitivities", self.sensitivities_entry()?))
    }

    /// Elasticities `(a_ij / λ) ∂λ/∂a_ij`.
    pub fn elasticities(&self) -> MPMResult<Defined<&Array2<f64>>> {
        let e = self.cache.elasticities.get_or_try_init(|| {
            let lmbd = self.lmbd()?;
            Ok(self.sensitivities_entry()?.as_ref().map(|s| s * self.a() / lmbd))
        })?;
        Ok(self.report("elasticities", e))
    }
}

#[cfg(test)]
mod tests {
    use crate::population::{
        core::{decomposition::ModelInputs, descriptor::Caveat, options::ModelOptions},
        errors::MPMError,
        models::mpm::MatrixPopulationModel,
    };
    use approx::assert_relative_eq;

    // ---- Scope ----
    // These tests cover:
    // - λ, w, v and sensitivities on a primitive model.
    // - Damping ratio on primitive and cyclic models.
    // - Second-order period for a negative subdominant root and a cyclic
    //   3×3 model.
    // - Undefined vectors for a non-quasi-primitive model.
    //
    // They intentionally DO NOT cover:
    // - The eigen solver itself (see `linalg::eigen`).

    fn model(a: &str) -> MatrixPopulationModel {
        MatrixPopulationModel::new(
            ModelInputs::from_a(a).with_options(ModelOptions::default().silent()),
        )
        .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Dominant elements and their duality on a primitive model.
    //
    // Given
    // -----
    // - A = [[0.1, 2], [0.4, 0.8]].
    //
    // Expect
    // ------
    // - λ ≈ 1.41046863561, w ≈ [0.60414407, 0.39585593], v·w = 1,
    //   sensitivities[i][j] = v_i w_j, elasticities summing to 1.
    fn primitive_model_dominant_elements() {
        // Arrange
        let m = model("0.1 2; 0.4 0.8");

        // Act
        let lmbd = m.lmbd().unwrap();
        let w = m.w().unwrap().value().unwrap().clone();
        let v = m.v().unwrap().value().unwrap().clone();
        let sens = m.sensitivities().unwrap().value().unwrap().clone();
        let elas = m.elasticities().unwrap().value().unwrap().clone();

        // Assert
        assert_relative_eq!(lmbd, 1.41046863561, max_relative = 1e-9);
        assert_relative_eq!(w[0], 0.60414407, epsilon = 1e-8);
        assert_relative_eq!(w[1], 0.39585593, epsilon = 1e-8);
        assert!(w.iter().all(|&x| x > 0.0) && v.iter().all(|&x| x > 0.0));
        assert_relative_eq!(v.dot(&w), 1.0, epsilon = 1e-12);
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(sens[[i, j]], v[i] * w[j], epsilon = 1e-12);
            }
        }
        assert_relative_eq!(elas.sum(), 1.0, epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Damping ratio is finite for a primitive model and infinite when every
    // eigenvalue shares λ's modulus.
    //
    // Given
    // -----
    // - The primitive 2×2 model; the 3-cycle permutation.
    //
    // Expect
    // ------
    // - λ / |λ₂| ≈ 1.41046863561 / 0.51046863561; +∞.
    fn damping_ratio_primitive_and_cyclic() {
        // Arrange
        let primitive = model("0.1 2; 0.4 0.8");
        let cyclic = model("0 0 1; 1 0 0; 0 1 0");

        // Act
        let rho = primitive.damping_ratio().unwrap();
        let rho_cyclic = cyclic.damping_ratio().unwrap();

        // Assert
        assert_relative_eq!(rho, 1.41046863561 / 0.51046863561, max_relative = 1e-8);
        assert!(rho_cyclic.is_infinite());
    }

    #[test]
    // Purpose
    // -------
    // A negative real subdominant eigenvalue oscillates with period 2.
    //
    // Given
    // -----
    // - A = [[0.1, 2], [0.4, 0.8]] (eigenvalues ≈ 1.41 and ≈ −0.51).
    //
    // Expect
    // ------
    // - `second_order_period == 2`.
    fn negative_subdominant_root_has_period_two() {
        // Arrange
        let m = model("0.1 2; 0.4 0.8");

        // Act
        let period = m.second_order_period().unwrap();

        // Assert
        assert_eq!(period.value(), Some(2.0));
    }

    #[test]
    // Purpose
    // -------
    // A conjugate subdominant pair yields 2π / |phase|.
    //
    // Given
    // -----
    // - A 3×3 primitive Leslie matrix whose subdominant roots are a complex
    //   pair.
    //
    // Expect
    // ------
    // - A finite period greater than 2.
    fn conjugate_pair_period() {
        // Arrange
        let m = model("0 1 5; 0.3 0 0; 0 0.5 0");

        // Act
        let period = m.second_order_period().unwrap().value().unwrap();

        // Assert
        assert!(period.is_finite() && period > 2.0);
    }

    #[test]
    // Purpose
    // -------
    // Without quasi-primitivity, w and v are undefined but sensitivities
    // still exist under quasi-irreducibility.
    //
    // Given
    // -----
    // - The 2-cycle [[0, 2], [0.5, 0]] (eigenvalues ±1).
    //
    // Expect
    // ------
    // - `w`, `v` undefined with `NotQuasiPrimitive`; sensitivities defined.
    fn periodic_model_has_undefined_stable_distribution() {
        // Arrange
        let m = model("0 2; 0.5 0");

        // Act
        let w = m.w().unwrap();
        let v = m.v().unwrap();
        let sens = m.sensitivities().unwrap();

        // Assert
        assert_eq!(w.caveat(), Some(Caveat::NotQuasiPrimitive));
        assert_eq!(v.caveat(), Some(Caveat::NotQuasiPrimitive));
        assert!(sens.is_defined());
    }

    #[test]
    // Purpose
    // -------
    // Several components tied at λ make sensitivities undefined.
    //
    // Given
    // -----
    // - [[0.5, 0], [0.2, 0.5]].
    //
    // Expect
    // ------
    // - `Undefined(NotQuasiIrreducible)`.
    fn tied_components_have_undefined_sensitivities() {
        // Arrange
        let m = model("0.5 0; 0.2 0.5");

        // Act
        let sens = m.sensitivities().unwrap();

        // Assert
        assert_eq!(sens.caveat(), Some(Caveat::NotQuasiIrreducible));
    }

    #[test]
    // Purpose
    // -------
    // Nothing subdominant means no second-order oscillations.
    //
    // Given
    // -----
    // - The 1×1 model [[1.2]].
    //
    // Expect
    // ------
    // - `Undefined(NoSecondOrderOscillations)` and an infinite damping ratio.
    fn scalar_model_has_no_second_order_terms() {
        // Arrange
        let m = model("1.2");

        // Act
        let period = m.second_order_period().unwrap();

        // Assert
        assert_eq!(period.caveat(), Some(Caveat::NoSecondOrderOscillations));
        assert!(m.damping_ratio().unwrap().is_infinite());
        assert!(!matches!(m.lmbd(), Err(MPMError::UnexpectedMathError { .. })));
    }
}
