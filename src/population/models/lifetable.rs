//! Life-table descriptors: survivorship, life expectancy, ages and the
//! reproduction-conditioned chain.
//!
//! Purpose
//! -------
//! Describe individual life histories from the survival matrix `S`, the
//! distribution of newborns `nu` and, for age descriptors, the growth rate.
//!
//! Key behaviors
//! -------------
//! - `class_survivorship(t) = e Sᵗ` and `remaining_life_expectancy = e N`
//!   only need the decomposition; their `nu`-weighted versions inherit the
//!   definedness of `nu`.
//! - Conventions follow the census of the model: an annual with `S = 0` has
//!   a life expectancy of 1, and individuals in newborn classes are aged 1.
//! - The reproduction-conditioned descriptors use an absorbing chain with
//!   `2n` transient states (not yet reproduced / already reproduced) and two
//!   absorbing death states, assuming Poisson fertilities so that the
//!   probability of reproducing in class `j` is `1 − exp(−Σ_i f_ij)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `lifetable_entropy` sums `ℓ(t) ln ℓ(t)` until `ℓ(t) ≤ abs`, capped by
//!   `SearchLimits::max_series_terms` (exceeding it is
//!   [`MPMError::CannotCompute`]).
//! - Per-class values that do not exist (mean age of a class no newborn can
//!   reach, conditional life expectancy of a class that never reproduces)
//!   are `None`.
use ndarray::{Array1, Array2, Axis};

use crate::{
    linalg::dense::{column_sums, inverse, matrix_power},
    population::{
        core::descriptor::{Caveat, Defined},
        errors::{MPMError, MPMResult},
        models::mpm::MatrixPopulationModel,
    },
};

/// Absorbing chain conditioned on future reproduction.
///
/// Fields
/// ------
/// - `proba_repro`: `Array1<f64>`
///   Probability that an individual now in class `i` reproduces before
///   dying.
/// - `remaining_life_expectancy_repro`: `Vec<Option<f64>>`
///   Remaining life expectancy conditional on reproducing; `None` for
///   classes whose individuals never reproduce.
#[derive(Debug, Clone, PartialEq)]
pub struct ReproductionChain {
    pub proba_repro: Array1<f64>,
    pub remaining_life_expectancy_repro: Vec<Option<f64>>,
}

fn reproduction_chain(
    s: &Array2<f64>, f: &Array2<f64>, abs: f64,
) -> MPMResult<ReproductionChain> {
    let n = s.nrows();
    let pr = column_sums(f).mapv(|x| -(-x).exp_m1());

    let mut sb = Array2::<f64>::zeros((2 * n, 2 * n));
    for ((i, j), &x) in s.indexed_iter() {
        sb[[i, j]] = x * (1.0 - pr[i]);
        sb[[n + i, j]] = x * pr[i];
        sb[[n + i, n + j]] = x;
    }
    let death = column_sums(&sb).mapv(|x| 1.0 - x);

    let nb = inverse(&(Array2::<f64>::eye(2 * n) - &sb))
        .ok_or(MPMError::NonConvergentMatrix { name: "S" })?;
    // Probability of absorption in "died after reproducing" from each state.
    let b: Array1<f64> = (0..2 * n).map(|l| (n..2 * n).map(|k| death[k] * nb[[k, l]]).sum()).collect();

    let proba_repro: Array1<f64> =
        (0..n).map(|i| (1.0 - pr[i]) * b[i] + pr[i]).collect();

    let rle: Array1<f64> = (0..2 * n)
        .map(|l| (0..2 * n).map(|k| nb[[k, l]] / b[l] * b[k]).sum())
        .collect();

    let remaining = (0..n)
        .map(|i| {
            let p1 = if proba_repro[i] > 0.0 { pr[i] / proba_repro[i] } else { 0.0 };
            let p0 = 1.0 - p1;
            let mut x = 0.0;
            if p1 > 0.0 {
                x += p1 * rle[n + i];
            }
            if p0 > abs {
                x += p0 * rle[i];
            }
            (proba_repro[i] > 0.0 && x.is_finite()).then_some(x)
        })
        .collect();

    Ok(ReproductionChain { proba_repro, remaining_life_expectancy_repro: remaining })
}

impl MatrixPopulationModel {
    /// `ℓ_i(t)`: probability that an individual now in class `i` survives at
    /// least `t` more steps, `e Sᵗ`.
    pub fn class_survivorship(&self, t: usize) -> MPMResult<Array1<f64>> {
        let (s, _) = self.parts("class_survivorship")?;
        Ok(column_sums(&matrix_power(s, t)))
    }

    /// Probability that a newborn drawn from `nu` reaches age `t`.
    pub fn survivorship(&self, t: usize) -> MPMResult<Defined<f64>> {
        let ell = self.class_survivorship(t)?;
        Ok(self.report("survivorship", self.nu_entry()?).map(|nu| ell.dot(nu)))
    }

    /// Remaining life expectancy per class, `e N`.
    pub fn remaining_life_expectancy(&self) -> MPMResult<&Array1<f64>> {
        self.parts("remaining_life_expectancy")?;
        self.cache
            .remaining_life_expectancy
            .get_or_try_init(|| Ok(column_sums(self.fundamental_matrix()?)))
    }

    fn life_expectancy_entry(&self) -> MPMResult<&Defined<f64>> {
        self.parts("life_expectancy")?;
        self.cache.life_expectancy.get_or_try_init(|| {
            let rle = self.remaining_life_expectancy()?;
            Ok(self.nu_entry()?.as_ref().map(|nu| rle.dot(nu)))
        })
    }

    /// Life expectancy of a newborn at the stable distribution, `e N ν`.
    pub fn life_expectancy(&self) -> MPMResult<Defined<f64>> {
        Ok(self.report("life_expectancy", self.life_expectancy_entry()?).copied())
    }

    fn mean_age_class_entry(&self) -> MPMResult<&Defined<Vec<Option<f64>>>> {
        let (s, _) = self.parts("mean_age_class")?;
        self.cache.mean_age_class.get_or_try_init(|| {
            let lmbd = self.lmbd()?;
            if lmbd <= 0.0 {
                return Err(MPMError::InadequateMatrix {
                    reason: "mean ages need a positive growth rate",
                });
            }
            let tol = self.options().tolerance;
            self.nu_entry()?.as_ref().try_map(|nu| {
                let x = inverse(&(Array2::<f64>::eye(self.dim()) - &(s / lmbd)))
                    .ok_or(MPMError::NonConvergentMatrix { name: "S / lambda" })?;
                let x_nu = x.dot(nu);
                let xx_nu = x.dot(&x_nu);
                Ok(x_nu
                    .iter()
                    .zip(xx_nu.iter())
                    .map(|(&d, &num)| (!tol.is_zero(d)).then(|| num / d))
                    .collect())
            })
        })
    }

    /// Mean age of the individuals of each class at the stable distribution,
    /// `(X² ν) ⊘ (X ν)` with `X = (I − S/λ)⁻¹`.
    pub fn mean_age_class(&self) -> MPMResult<Defined<&Vec<Option<f64>>>> {
        Ok(self.report("mean_age_class", self.mean_age_class_entry()?))
    }

    /// Mean age of the stable population, `Σ y_i w_i`.
    pub fn mean_age_population(&self) -> MPMResult<Defined<f64>> {
        self.parts("mean_age_population")?;
        let m = self.cache.mean_age_population.get_or_try_init(|| {
            let tol = self.options().tolerance;
            let ages = self.mean_age_class_entry()?.as_ref();
            let w = self.w_entry()?.as_ref();
            ages.zip(w).try_map(|(ages, w)| {
                ages.iter().zip(w.iter()).try_fold(0.0, |acc, (age, &wi)| match age {
                    Some(y) => Ok(acc + y * wi),
                    None if tol.is_zero(wi) => Ok(acc),
                    None => Err(MPMError::unexpected(
                        "a class unreachable from newborns has a positive stable share",
                    )),
                })
            })
        })?;
        Ok(self.report("mean_age_population", m).copied())
    }

    /// `Φ(t) = F Sᵗ diag(1/ℓ(t))`: expected offspring at age `t` of an
    /// individual now in class `j`, given survival to `t`.
    ///
    /// Notes
    /// -----
    /// - Columns with `ℓ_j(t) = 0` are NaN.
    pub fn age_specific_fertility(&self, t: usize) -> MPMResult<Array2<f64>> {
        let (s, f) = self.parts("age_specific_fertility")?;
        let st = matrix_power(s, t);
        let ell = column_sums(&st);
        Ok(f.dot(&(st / &ell.insert_axis(Axis(0)))))
    }

    /// Keyfitz's life-table entropy `−(1/L) Σ_{t≥1} ℓ(t) ln ℓ(t)`.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::CannotCompute`] if `ℓ(t)` is still above the absolute
    ///   tolerance after `max_series_terms` terms.
    pub fn lifetable_entropy(&self) -> MPMResult<Defined<f64>> {
        let (s, _) = self.parts("lifetable_entropy")?;
        let h = self.cache.lifetable_entropy.get_or_try_init(|| {
            let opts = self.options();
            let abs = opts.tolerance.abs;
            let max_terms = opts.limits.max_series_terms;
            let life = *self.life_expectancy_entry()?;
            self.nu_entry()?.as_ref().zip(life).try_map(|(nu, life)| {
                let mut row = column_sums(s);
                let mut acc = 0.0;
                for _ in 0..max_terms {
                    let ell = row.dot(nu);
                    if ell > 0.0 {
                        acc += ell * ell.ln();
                    }
                    if ell <= abs {
                        return Ok(-acc / life);
                    }
                    row = row.dot(s);
                }
                Err(MPMError::CannotCompute {
                    reason: format!("survivorship still above {abs} after {max_terms} terms"),
                })
            })
        })?;
        Ok(self.report("lifetable_entropy", h).copied())
    }

    fn reproduction_chain(&self) -> MPMResult<&ReproductionChain> {
        let (s, f) = self.parts("remaining_life_expectancy_repro")?;
        self.cache
            .reproduction_chain
            .get_or_try_init(|| reproduction_chain(s, f, self.options().tolerance.abs))
    }

    /// Probability of reproducing before death, per current class.
    pub fn proba_repro(&self) -> MPMResult<&Array1<f64>> {
        Ok(&self.reproduction_chain()?.proba_repro)
    }

    /// Remaining life expectancy conditional on reproducing, per class.
    pub fn remaining_life_expectancy_repro(&self) -> MPMResult<&[Option<f64>]> {
        Ok(&self.reproduction_chain()?.remaining_life_expectancy_repro)
    }

    /// Life expectancy of a newborn conditional on it reproducing, assuming
    /// Poisson fertilities.
    pub fn life_expectancy_repro(&self) -> MPMResult<Defined<f64>> {
        self.parts("life_expectancy_repro")?;
        let le = self.cache.life_expectancy_repro.get_or_try_init(|| {
            let chain = self.reproduction_chain()?;
            let post = self.postreproductive_classes()?;
            self.nu_entry()?.as_ref().try_and_then(|nu| {
                let weight = nu.dot(&chain.proba_repro);
                if weight <= 0.0 {
                    return Ok(Defined::Undefined(Caveat::NoReproduction));
                }
                let mut acc = 0.0;
                for i in 0..self.dim() {
                    let nu_repro = nu[i] * chain.proba_repro[i] / weight;
                    if post[i] || nu_repro == 0.0 {
                        continue;
                    }
                    let rle = chain.remaining_life_expectancy_repro[i].ok_or_else(|| {
                        MPMError::unexpected(format!(
                            "conditional life expectancy of class {i} is not finite"
                        ))
                    })?;
                    acc += rle * nu_repro;
                }
                Ok(Defined::Value(acc))
            })
        })?;
        Ok(self.report("life_expectancy_repro", le).copied())
    }
}
