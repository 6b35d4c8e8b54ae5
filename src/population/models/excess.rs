//! Excess factors and transient-dynamics indices.
//!
//! Purpose
//! -------
//! Quantify how far a model is from stationarity (fertility and survival
//! excess) and how far an initial population is from the stable one
//! (population momentum, Keyfitz's Δ, Cohen's D1).
//!
//! Key behaviors
//! -------------
//! - The excess `c` solves `ρ(X + Y/c) = 1` by bisection, after checking
//!   `ρ(X) < 1 − abs`. For the fertility excess `X = S`, `Y = F`; for the
//!   survival excess the roles are swapped, and a fertility matrix that
//!   sustains growth on its own makes the survival excess undefined.
//! - The bisection spends at most `SearchLimits::max_bisection_steps`
//!   bracket doublings and halvings.
//! - Initial populations are validated (dimension, finite, non-negative,
//!   positive total) before use.
//!
//! Conventions
//! -----------
//! - `n0` is a vector of abundances per class; only its direction matters for
//!   Δ and the momentum ratio.
use ndarray::{Array1, Array2};

use crate::{
    linalg::{
        dense::{inverse, outer},
        eigen::spectral_radius,
    },
    population::{
        core::{
            descriptor::{Caveat, Defined},
            tolerance::Tolerance,
            validation::validate_population_vector,
        },
        errors::{MPMError, MPMResult},
        models::mpm::MatrixPopulationModel,
    },
};

/// `c > 0` such that `ρ(X + Y/c) = 1`.
///
/// Notes
/// -----
/// - Bisection stops when the bracket is within tolerance or when its
///   midpoint no longer differs from an endpoint in floating point.
///
/// Errors
/// ------
/// - [`MPMError::InadequateMatrix`] if `ρ(X) ≥ 1 − abs`.
/// - [`MPMError::CannotCompute`] if `max_steps` doublings or halvings are
///   spent without convergence.
pub(crate) fn aux_excess(
    x: &Array2<f64>, y: &Array2<f64>, lmbd: f64, tol: &Tolerance, max_niter: usize,
    max_steps: usize,
) -> MPMResult<f64> {
    if spectral_radius(x, max_niter)? >= 1.0 - tol.abs {
        return Err(MPMError::InadequateMatrix { reason: "X should have a spectral radius < 1" });
    }
    if tol.is_close(lmbd, 1.0) {
        return Ok(1.0);
    }
    let rho = |c: f64| spectral_radius(&(x + &(y / c)), max_niter);
    let (mut a, mut b) = if lmbd < 1.0 { (0.0, 1.0) } else { (1.0, 2.0) };
    let mut steps = 0;
    if lmbd > 1.0 {
        while rho((a + b) / 2.0)? > 1.0 {
            if steps == max_steps {
                return Err(excess_budget_exhausted(max_steps));
            }
            b *= 2.0;
            steps += 1;
        }
    }
    let mut c = (a + b) / 2.0;
    while !tol.is_close(a, b) {
        c = (a + b) / 2.0;
        if c == a || c == b {
            break;
        }
        if steps == max_steps {
            return Err(excess_budget_exhausted(max_steps));
        }
        if rho(c)? < 1.0 {
            b = c;
        } else {
            a = c;
        }
        steps += 1;
    }
    tracing::trace!(c, steps, "excess bisection finished");
    Ok(c)
}

fn excess_budget_exhausted(max_steps: usize) -> MPMError {
    MPMError::CannotCompute {
        reason: format!("excess bisection did not converge within {max_steps} steps"),
    }
}

impl MatrixPopulationModel {
    /// Factor by which all fertilities must be divided to make the model
    /// stationary: `c` with `ρ(S + F/c) = 1`.
    pub fn fertility_excess(&self) -> MPMResult<f64> {
        let (s, f) = self.parts("fertility_excess")?;
        let c = self.cache.fertility_excess.get_or_try_init(|| {
            let opts = self.options();
            aux_excess(
                s,
                f,
                self.lmbd()?,
                &opts.tolerance,
                opts.limits.max_qr_iterations,
                opts.limits.max_bisection_steps,
            )
        })?;
        Ok(*c)
    }

    /// Factor by which all survival probabilities must be divided to make the
    /// model stationary: `c` with `ρ(S/c + F) = 1`.
    ///
    /// Returns
    /// -------
    /// `Undefined(SurvivalExcessUndefined)` when `ρ(F) ≥ 1`.
    pub fn survival_excess(&self) -> MPMResult<Defined<f64>> {
        let (s, f) = self.parts("survival_excess")?;
        let c = self.cache.survival_excess.get_or_try_init(|| {
            let opts = self.options();
            let excess = aux_excess(
                f,
                s,
                self.lmbd()?,
                &opts.tolerance,
                opts.limits.max_qr_iterations,
                opts.limits.max_bisection_steps,
            );
            match excess {
                Ok(c) => Ok(Defined::Value(c)),
                Err(MPMError::InadequateMatrix { .. }) => {
                    Ok(Defined::Undefined(Caveat::SurvivalExcessUndefined))
                }
                Err(e) => Err(e),
            }
        })?;
        Ok(self.report("survival_excess", c).copied())
    }

    /// Ratio of the ultimate stationary population to the initial one.
    ///
    /// Parameters
    /// ----------
    /// - `n0`: `&Array1<f64>`
    ///   Initial population.
    /// - `auto`: `bool`
    ///   When λ is not 1, build the stationary model `(S, F / fertility_excess)`
    ///   and use its reproductive values.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::NotAvailable`] when λ ≠ 1 and `auto` is `false`.
    /// - Validation errors for `n0`.
    pub fn population_momentum(&self, n0: &Array1<f64>, auto: bool) -> MPMResult<Defined<f64>> {
        let total = validate_population_vector("n0", n0, self.dim())?;
        if self.options().tolerance.is_close(self.lmbd()?, 1.0) {
            return Ok(self.report("population_momentum", self.v_entry()?).map(|v| v.dot(n0) / total));
        }
        if !auto {
            return Err(MPMError::NotAvailable {
                descriptor: "population_momentum",
                reason: "lambda != 1; pass auto = true to rescale fertilities",
            });
        }
        let (s, f) = self.parts("population_momentum")?;
        let stationary = self.from_parts(s.clone(), f / self.fertility_excess()?)?;
        tracing::debug!(lmbd = stationary.lmbd()?, "built stationary model for momentum");
        let momentum = stationary.v_entry()?.as_ref().map(|v| v.dot(n0) / total);
        Ok(self.report("population_momentum", &momentum).copied())
    }

    /// Keyfitz's Δ: total-variation distance between `n0 / ‖n0‖₁` and `w`.
    pub fn keyfitz_delta(&self, n0: &Array1<f64>) -> MPMResult<Defined<f64>> {
        let total = validate_population_vector("n0", n0, self.dim())?;
        Ok(self.report("keyfitz_delta", self.w_entry()?).map(|w| {
            0.5 * n0.iter().zip(w.iter()).map(|(&x, &wi)| (x / total - wi).abs()).sum::<f64>()
        }))
    }

    /// Cohen's cumulative distance `D1 = ‖(Z − w v) n0‖₁` with
    /// `Z = (I + w v − A/λ)⁻¹`.
    pub fn cohen_d1(&self, n0: &Array1<f64>) -> MPMResult<Defined<f64>> {
        validate_population_vector("n0", n0, self.dim())?;
        let lmbd = self.lmbd()?;
        let w = self.w_entry()?.as_ref();
        let v = self.v_entry()?.as_ref();
        let d1 = w.zip(v).try_map(|(w, v)| {
            let b = outer(w, v);
            let m = Array2::<f64>::eye(self.dim()) + &b - &(self.a() / lmbd);
            let z = inverse(&m)
                .ok_or_else(|| MPMError::unexpected("I + wv - A/lambda is singular"))?;
            Ok((z - &b).dot(n0).mapv(f64::abs).sum())
        })?;
        Ok(self.report("cohen_D1", &d1).copied())
    }
}
