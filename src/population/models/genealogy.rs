//! Genealogical descriptors: the backward Markov chain of ancestry.
//!
//! Purpose
//! -------
//! Expose the genealogical matrix `P` (and its survival / fertility parts),
//! its stationary distribution `π = v ⊙ w`, and the entropies derived from
//! them.
//!
//! Key behaviors
//! -------------
//! - `p_ij = m_ij w_j / (λ w_i)` for `M ∈ {A, S, F}`; rows with `w_i = 0` are
//!   set to zero.
//! - Everything here needs `w`, so a non-quasi-primitive model yields
//!   `Undefined(NotQuasiPrimitive)`.
//! - `entropy_rate` and `population_entropy` are only exposed for models with
//!   a known decomposition.
//!
//! Conventions
//! -----------
//! - Entropy rate in bits (`log₂`), with `0 log 0 = 0`.
use ndarray::{Array1, Array2};

use crate::{
    linalg::numeric::xlog2x,
    population::{
        core::descriptor::Defined,
        errors::MPMResult,
        models::mpm::MatrixPopulationModel,
    },
};

fn genealogical(m: &Array2<f64>, w: &Array1<f64>, lmbd: f64) -> Array2<f64> {
    Array2::from_shape_fn(m.dim(), |(i, j)| {
        if w[i] == 0.0 {
            0.0
        } else {
            m[[i, j]] * w[j] / (lmbd * w[i])
        }
    })
}

impl MatrixPopulationModel {
    fn genealogical_from(&self, m: &Array2<f64>) -> MPMResult<Defined<Array2<f64>>> {
        let lmbd = self.lmbd()?;
        Ok(self.w_entry()?.as_ref().map(|w| genealogical(m, w, lmbd)))
    }

    pub(crate) fn p_entry(&self) -> MPMResult<&Defined<Array2<f64>>> {
        self.cache.p.get_or_try_init(|| self.genealogical_from(self.a()))
    }

    pub(crate) fn ps_entry(&self) -> MPMResult<&Defined<Array2<f64>>> {
        let (s, _) = self.parts("Ps")?;
        self.cache.ps.get_or_try_init(|| self.genealogical_from(s))
    }

    pub(crate) fn pf_entry(&self) -> MPMResult<&Defined<Array2<f64>>> {
        let (_, f) = self.parts("Pf")?;
        self.cache.pf.get_or_try_init(|| self.genealogical_from(f))
    }

    /// Genealogical matrix: `p_ij` is the probability that an individual in
    /// class `i` at time `t` descends from (or is) an individual of class `j`
    /// at time `t − 1`.
    pub fn p(&self) -> MPMResult<Defined<&Array2<f64>>> {
        Ok(self.report("P", self.p_entry()?))
    }

    /// Survival part of [`MatrixPopulationModel::p`].
    pub fn ps(&self) -> MPMResult<Defined<&Array2<f64>>> {
        Ok(self.report("Ps", self.ps_entry()?))
    }

    /// Fertility part of [`MatrixPopulationModel::p`].
    pub fn pf(&self) -> MPMResult<Defined<&Array2<f64>>> {
        Ok(self.report("Pf", self.pf_entry()?))
    }

    pub(crate) fn pi_entry(&self) -> MPMResult<&Defined<Array1<f64>>> {
        self.cache.pi.get_or_try_init(|| {
            let w = self.w_entry()?.as_ref();
            let v = self.v_entry()?.as_ref();
            Ok(v.zip(w).map(|(v, w)| v * w))
        })
    }

    /// Class reproductive values `π_i = v_i w_i`; the stationary distribution
    /// of `P`.
    pub fn pi(&self) -> MPMResult<Defined<&Array1<f64>>> {
        Ok(self.report("pi", self.pi_entry()?))
    }

    fn entropy_rate_entry(&self) -> MPMResult<&Defined<f64>> {
        self.parts("entropy_rate")?;
        self.cache.entropy_rate.get_or_try_init(|| {
            let p = self.p_entry()?.as_ref();
            let pi = self.pi_entry()?.as_ref();
            Ok(p.zip(pi).map(|(p, pi)| {
                -p.outer_iter()
                    .zip(pi.iter())
                    .map(|(row, &pi_i)| pi_i * row.iter().map(|&x| xlog2x(x)).sum::<f64>())
                    .sum::<f64>()
            }))
        })
    }

    /// Entropy rate `H = −Σ π_i p_ij log₂ p_ij` of the genealogical chain.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::NotAvailable`](crate::population::errors::MPMError::NotAvailable)
    ///   when the decomposition is unknown.
    pub fn entropy_rate(&self) -> MPMResult<Defined<f64>> {
        Ok(self.report("entropy_rate", self.entropy_rate_entry()?).copied())
    }

    /// Population entropy `S = H T_a`.
    pub fn population_entropy(&self) -> MPMResult<Defined<f64>> {
        let s = self.cache.population_entropy.get_or_try_init(|| {
            let h = *self.entropy_rate_entry()?;
            let t_a = *self.t_a_entry()?;
            Ok(h.zip(t_a).map(|(h, t)| h * t))
        })?;
        Ok(self.report("population_entropy", s).copied())
    }
}

#[cfg(test)]
mod tests {
    use crate::population::{
        core::{decomposition::ModelInputs, descriptor::Caveat, options::ModelOptions},
        errors::MPMError,
        models::mpm::MatrixPopulationModel,
    };
    use approx::assert_abs_diff_eq;

    // ---- Scope ----
    // These tests cover:
    // - Stochasticity of P and the split P = Ps + Pf.
    // - π as the stationary distribution of P.
    // - Entropy rate bounds and its gating on the decomposition.
    // - Undefined genealogy for non-quasi-primitive models.

    fn split_model() -> MatrixPopulationModel {
        MatrixPopulationModel::new(
            ModelInputs::from_sf("0.1 0; 0.4 0.8", "0 2; 0 0")
                .with_options(ModelOptions::default().silent()),
        )
        .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // P is row-stochastic and decomposes into Ps + Pf.
    //
    // Given
    // -----
    // - S = [[0.1, 0], [0.4, 0.8]], F = [[0, 2], [0, 0]].
    //
    // Expect
    // ------
    // - Rows of P sum to 1; P = Ps + Pf entrywise; πP = π and Σπ = 1.
    fn genealogical_matrix_is_stochastic() {
        // Arrange
        let m = split_model();

        // Act
        let p = m.p().unwrap().value().unwrap().clone();
        let ps = m.ps().unwrap().value().unwrap().clone();
        let pf = m.pf().unwrap().value().unwrap().clone();
        let pi = m.pi().unwrap().value().unwrap().clone();

        // Assert
        for row in p.outer_iter() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-10);
        }
        for (x, y) in p.iter().zip((&ps + &pf).iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(pi.sum(), 1.0, epsilon = 1e-10);
        let stationary = pi.dot(&p);
        for (a, b) in stationary.iter().zip(pi.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
        }
    }

    #[test]
    // Purpose
    // -------
    // Entropy rate lies in [0, log₂ n] and the population entropy is H T_a.
    //
    // Given
    // -----
    // - The split 2×2 model.
    //
    // Expect
    // ------
    // - 0 < H ≤ 1 and S = H T_a.
    fn entropy_rate_bounds() {
        // Arrange
        let m = split_model();

        // Act
        let h = m.entropy_rate().unwrap().value().unwrap();
        let s = m.population_entropy().unwrap().value().unwrap();
        let t_a = m.t_a().unwrap().value().unwrap();

        // Assert
        assert!(h > 0.0 && h <= 1.0);
        assert_abs_diff_eq!(s, h * t_a, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The entropy rate needs the decomposition; P does not.
    //
    // Given
    // -----
    // - A = [[0.1, 2], [0.4, 0.8]] without S/F.
    //
    // Expect
    // ------
    // - P defined; entropy rate and Ps fail with `NotAvailable`.
    fn entropy_rate_requires_decomposition() {
        // Arrange
        let m = MatrixPopulationModel::new(ModelInputs::from_a("0.1 2; 0.4 0.8")).unwrap();

        // Act
        let p = m.p().unwrap();
        let h = m.entropy_rate();
        let ps = m.ps();

        // Assert
        assert!(p.is_defined());
        assert!(matches!(h, Err(MPMError::NotAvailable { descriptor: "entropy_rate", .. })));
        assert!(matches!(ps, Err(MPMError::NotAvailable { descriptor: "Ps", .. })));
    }

    #[test]
    // Purpose
    // -------
    // Without a stable distribution the genealogy is undefined.
    //
    // Given
    // -----
    // - The 2-cycle S = [[0, 0], [0.5, 0]], F = [[0, 2], [0, 0]].
    //
    // Expect
    // ------
    // - P and π are `Undefined(NotQuasiPrimitive)`.
    fn periodic_model_has_undefined_genealogy() {
        // Arrange
        let m = MatrixPopulationModel::new(
            ModelInputs::from_sf("0 0; 0.5 0", "0 2; 0 0")
                .with_options(ModelOptions::default().silent()),
        )
        .unwrap();

        // Act
        let p = m.p().unwrap();
        let pi = m.pi().unwrap();

        // Assert
        assert_eq!(p.caveat(), Some(Caveat::NotQuasiPrimitive));
        assert_eq!(pi.caveat(), Some(Caveat::NotQuasiPrimitive));
    }
}
