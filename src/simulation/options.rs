//! options — configuration and result types for the lifeline estimator.
//!
//! Purpose
//! -------
//! Describe how many lifelines to simulate, how offspring are drawn, where
//! the focal newborn starts, and when to stop doubling the replicate count.
//!
//! Key behaviors
//! -------------
//! - [`EstimatorOptions::new`] validates every field and returns
//!   `MPMResult`; [`EstimatorOptions::default`] matches the usual
//!   demographic setting (1000 replicates, Poisson offspring, 1% target).
//! - [`Estimate`] bundles the sample mean, the number of recorded lifelines
//!   and the Student-t 97.5% half-width.
//!
//! Invariants & assumptions
//! ------------------------
//! - `replicates >= 2`, so the half-width has at least one degree of freedom.
//! - `replicates <= max_replicates`; the doubling loop never exceeds
//!   `max_replicates`.
//! - `initial`, when given, is only checked for length against the model at
//!   simulation time.
//!
//! Testing notes
//! -------------
//! - Unit tests cover defaults and each rejected field.
use ndarray::Array1;

use crate::population::errors::{MPMError, MPMResult};

/// Offspring distribution of one individual per time step.
///
/// - `Poisson`: the number of offspring is Poisson with mean `Σ_i F_ij`.
/// - `Bernoulli`: at most one offspring, with probability `Σ_i F_ij`; needs
///   every column sum of `F` to be at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reproduction {
    #[default]
    Poisson,
    Bernoulli,
}

/// EstimatorOptions — configuration of a Monte-Carlo lifeline run.
///
/// Fields
/// ------
/// - `replicates`: `usize`
///   Number of lifelines that must reproduce before the first estimate.
/// - `reproduction`: [`Reproduction`]
///   Offspring distribution.
/// - `initial`: `Option<Array1<f64>>`
///   Weights of the birth class of the focal newborn; `None` uses the stable
///   newborn distribution `ν`.
/// - `target_rel_err`: `Option<f64>`
///   When set, the replicate count doubles until
///   `half_width < target_rel_err · mean`.
/// - `seed`: `Option<u64>`
///   RNG seed; `None` draws one from the OS.
/// - `max_replicates`: `usize`
///   Cap on the doubling loop.
/// - `max_age`: `usize`
///   Cap on the length of a single lifeline.
/// - `max_attempts_factor`: `usize`
///   At most `max_attempts_factor · replicates` lifelines are simulated to
///   collect `replicates` reproducing ones.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorOptions {
    pub replicates: usize,
    pub reproduction: Reproduction,
    pub initial: Option<Array1<f64>>,
    pub target_rel_err: Option<f64>,
    pub seed: Option<u64>,
    pub max_replicates: usize,
    pub max_age: usize,
    pub max_attempts_factor: usize,
}

impl EstimatorOptions {
    /// Construct validated options.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::InvalidArgument`] when `replicates < 2`,
    ///   `max_replicates < replicates`, `max_age == 0`,
    ///   `max_attempts_factor == 0`, or `target_rel_err` is not finite and
    ///   strictly positive.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        replicates: usize, reproduction: Reproduction, initial: Option<Array1<f64>>,
        target_rel_err: Option<f64>, seed: Option<u64>, max_replicates: usize, max_age: usize,
        max_attempts_factor: usize,
    ) -> MPMResult<Self> {
        if replicates < 2 {
            return Err(MPMError::InvalidArgument {
                name: "replicates",
                reason: format!("must be >= 2; got {replicates}"),
            });
        }
        if max_replicates < replicates {
            return Err(MPMError::InvalidArgument {
                name: "max_replicates",
                reason: format!("must be >= replicates ({replicates}); got {max_replicates}"),
            });
        }
        if max_age == 0 {
            return Err(MPMError::InvalidArgument {
                name: "max_age",
                reason: "must be > 0".to_string(),
            });
        }
        if max_attempts_factor == 0 {
            return Err(MPMError::InvalidArgument {
                name: "max_attempts_factor",
                reason: "must be > 0".to_string(),
            });
        }
        if let Some(target) = target_rel_err {
            if !target.is_finite() || target <= 0.0 {
                return Err(MPMError::InvalidArgument {
                    name: "target_rel_err",
                    reason: format!("must be finite and > 0; got {target}"),
                });
            }
        }
        Ok(EstimatorOptions {
            replicates,
            reproduction,
            initial,
            target_rel_err,
            seed,
            max_replicates,
            max_age,
            max_attempts_factor,
        })
    }

    /// Same options with a fixed seed.
    pub fn with_seed(self, seed: u64) -> Self {
        EstimatorOptions { seed: Some(seed), ..self }
    }
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        EstimatorOptions {
            replicates: 1000,
            reproduction: Reproduction::Poisson,
            initial: None,
            target_rel_err: Some(1e-2),
            seed: None,
            max_replicates: 1 << 22,
            max_age: 100_000,
            max_attempts_factor: 10_000,
        }
    }
}

/// Estimate — outcome of a lifeline run.
///
/// Fields
/// ------
/// - `mean`: `f64`
///   Sample mean of the recorded statistic.
/// - `replicates`: `usize`
///   Number of recorded (reproducing) lifelines.
/// - `half_width`: `f64`
///   `t_{n−1} σ̂ / √n`, with `t_{n−1}` the 0.975 quantile of Student's `t`
///   with `n − 1` degrees of freedom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub mean: f64,
    pub replicates: usize,
    pub half_width: f64,
}
