//! lifelines — Monte-Carlo estimation from independent individual lifelines.
//!
//! Purpose
//! -------
//! Estimate demographic quantities that have no convenient closed form by
//! following single individuals through the life cycle: the mean age at
//! offspring production, and the life expectancy of individuals that
//! reproduce at least once.
//!
//! Key behaviors
//! -------------
//! - A focal newborn starts in a class drawn from `initial` (default `ν`).
//!   At each step it produces offspring according to the column sums of `F`,
//!   then moves along the corresponding column of `S`, augmented with a
//!   death state carrying the missing mass `1 − Σ_i S_ij`.
//! - Only lineages that reproduce are recorded. Lifelines are simulated until
//!   `replicates` of them have reproduced.
//! - With a relative target, the replicate count doubles (previous samples
//!   are kept) until `half_width < target · mean`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Requires the decomposition `A = S + F`.
//! - `Reproduction::Bernoulli` requires every column sum of `F` to be ≤ 1.
//! - Every loop is bounded: `max_age` per lifeline,
//!   `max_attempts_factor · replicates` lifelines per round and
//!   `max_replicates` overall. Exceeding a cap is `CannotCompute`.
//!
//! Conventions
//! -----------
//! - Ages start at 1: a newborn that dies during its first step has age 1.
//! - The half-width uses the population standard deviation of the samples
//!   and the 0.975 quantile of Student's `t` with `n − 1` degrees of freedom.
//! - Results are never cached on the model; two unseeded runs differ.
//!
//! Downstream usage
//! ----------------
//! - `mean_age_repro(&model, &EstimatorOptions::default())` for a 1% run;
//!   set `seed` for reproducible output.
//!
//! Testing notes
//! -------------
//! - Degenerate annual models give exact answers (zero variance).
//! - Seeded runs are compared with each other and with the closed-form
//!   `life_expectancy_repro` of the model.
use ndarray::{Array1, ArrayView1, Axis};
use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    Rng, SeedableRng,
};
use rand_distr::Poisson;

use crate::{
    linalg::numeric::student_t_975,
    population::{
        core::validation::validate_population_vector,
        errors::{MPMError, MPMResult},
        models::MatrixPopulationModel,
    },
    simulation::options::{Estimate, EstimatorOptions, Reproduction},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statistic {
    /// Offspring-weighted mean age at reproduction.
    MeanAgeRepro,
    /// Age at death.
    AgeAtDeath,
}

impl Statistic {
    fn descriptor(self) -> &'static str {
        match self {
            Statistic::MeanAgeRepro => "mean_age_repro",
            Statistic::AgeAtDeath => "life_expectancy_repro_ibm",
        }
    }
}

#[derive(Debug)]
enum Birth {
    Fixed(usize),
    Random(WeightedIndex<f64>),
}

/// Precomputed samplers for one model and one statistic.
#[derive(Debug)]
struct LifeCycle {
    dim: usize,
    statistic: Statistic,
    reproduction: Reproduction,
    max_age: usize,
    birth: Birth,
    moves: Vec<WeightedIndex<f64>>,
    fertility: Array1<f64>,
    poisson: Vec<Option<Poisson<f64>>>,
}

impl LifeCycle {
    fn new(
        model: &MatrixPopulationModel, opts: &EstimatorOptions, statistic: Statistic,
    ) -> MPMResult<Self> {
        let descriptor = statistic.descriptor();
        let (s, f) = model.parts(descriptor)?;
        let dim = model.dim();

        let fertility = f.sum_axis(Axis(0));
        if opts.reproduction == Reproduction::Bernoulli {
            if let Some((j, x)) = fertility.iter().enumerate().find(|&(_, &x)| x > 1.0) {
                return Err(MPMError::InvalidArgument {
                    name: "reproduction",
                    reason: format!(
                        "Bernoulli reproduction needs column sums of F <= 1; column {j} sums to {x}"
                    ),
                });
            }
        }

        let initial = match &opts.initial {
            Some(x) => x.clone(),
            None => model.nu_entry()?.as_ref().value().cloned().ok_or_else(|| {
                MPMError::InvalidArgument {
                    name: "initial",
                    reason: "the newborn distribution nu is undefined for this model".to_string(),
                }
            })?,
        };
        validate_population_vector("initial", &initial, dim)?;
        let support: Vec<usize> = (0..dim).filter(|&i| initial[i] > 0.0).collect();
        let birth = match support.as_slice() {
            [only] => Birth::Fixed(*only),
            _ => Birth::Random(
                WeightedIndex::new(initial.iter().copied())
                    .map_err(|e| MPMError::unexpected(format!("birth weights: {e}")))?,
            ),
        };

        let mut moves = Vec::with_capacity(dim);
        for (j, column) in s.columns().into_iter().enumerate() {
            let death = (1.0 - column.sum()).max(0.0);
            let weights = column.iter().copied().chain(std::iter::once(death));
            let index = WeightedIndex::new(weights).map_err(|e| {
                MPMError::unexpected(format!("transition weights of class {j}: {e}"))
            })?;
            moves.push(index);
        }

        let mut poisson = Vec::with_capacity(dim);
        for &x in fertility.iter() {
            let sampler = if x > 0.0 {
                Some(Poisson::new(x).map_err(|e| MPMError::unexpected(format!("{e}")))?)
            } else {
                None
            };
            poisson.push(sampler);
        }

        Ok(LifeCycle {
            dim,
            statistic,
            reproduction: opts.reproduction,
            max_age: opts.max_age,
            birth,
            moves,
            fertility,
            poisson,
        })
    }

    fn birth_class<R: Rng>(&self, rng: &mut R) -> usize {
        match &self.birth {
            Birth::Fixed(i) => *i,
            Birth::Random(index) => index.sample(rng),
        }
    }

    fn offspring<R: Rng>(&self, class: usize, rng: &mut R) -> u64 {
        let x = self.fertility[class];
        if x <= 0.0 {
            return 0;
        }
        match (self.reproduction, self.statistic) {
            (Reproduction::Bernoulli, _) => u64::from(rng.gen::<f64>() < x),
            // Only "at least one offspring" matters for the age at death.
            (Reproduction::Poisson, Statistic::AgeAtDeath) => {
                u64::from(rng.gen::<f64>() < -(-x).exp_m1())
            }
            (Reproduction::Poisson, Statistic::MeanAgeRepro) => {
                self.poisson[class].as_ref().map_or(0, |p| p.sample(rng) as u64)
            }
        }
    }

    /// Follow one individual from birth to death. `None` if it never
    /// reproduced.
    fn lifeline<R: Rng>(&self, rng: &mut R) -> MPMResult<Option<f64>> {
        let mut class = self.birth_class(rng);
        let mut age = 1usize;
        let mut offspring = 0u64;
        let mut weighted_ages = 0.0;
        while class < self.dim {
            if age > self.max_age {
                return Err(MPMError::CannotCompute {
                    reason: format!("a lifeline exceeded max_age = {}", self.max_age),
                });
            }
            match self.statistic {
                Statistic::MeanAgeRepro => {
                    let k = self.offspring(class, rng);
                    offspring += k;
                    weighted_ages += k as f64 * age as f64;
                }
                Statistic::AgeAtDeath => {
                    if offspring == 0 {
                        offspring = self.offspring(class, rng);
                    }
                }
            }
            class = self.moves[class].sample(rng);
            age += 1;
        }
        if offspring == 0 {
            return Ok(None);
        }
        Ok(Some(match self.statistic {
            Statistic::MeanAgeRepro => weighted_ages / offspring as f64,
            Statistic::AgeAtDeath => (age - 1) as f64,
        }))
    }

    /// Simulate until `samples` holds `target` values.
    fn collect<R: Rng>(
        &self, rng: &mut R, samples: &mut Vec<f64>, target: usize, attempts_factor: usize,
    ) -> MPMResult<()> {
        let needed = target.saturating_sub(samples.len());
        let budget = attempts_factor.saturating_mul(needed);
        let mut attempts = 0usize;
        while samples.len() < target {
            if attempts == budget {
                return Err(MPMError::CannotCompute {
                    reason: format!(
                        "only {} of {target} lifelines reproduced within {budget} attempts",
                        samples.len()
                    ),
                });
            }
            attempts += 1;
            if let Some(x) = self.lifeline(rng)? {
                samples.push(x);
            }
        }
        Ok(())
    }
}

fn summarize(samples: &[f64]) -> MPMResult<Estimate> {
    let view = ArrayView1::from(samples);
    let n = samples.len();
    let mean = view.mean().ok_or_else(|| MPMError::unexpected("no samples to summarize"))?;
    let half_width = student_t_975(n - 1)? * view.std(0.0) / (n as f64).sqrt();
    Ok(Estimate { mean, replicates: n, half_width })
}

fn estimate(
    model: &MatrixPopulationModel, opts: &EstimatorOptions, statistic: Statistic,
) -> MPMResult<Estimate> {
    let cycle = LifeCycle::new(model, opts, statistic)?;
    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut samples = Vec::with_capacity(opts.replicates);
    let mut target = opts.replicates;
    loop {
        cycle.collect(&mut rng, &mut samples, target, opts.max_attempts_factor)?;
        let current = summarize(&samples)?;
        tracing::debug!(
            statistic = statistic.descriptor(),
            replicates = current.replicates,
            mean = current.mean,
            half_width = current.half_width,
            "lifeline estimate"
        );
        let Some(rel) = opts.target_rel_err else {
            return Ok(current);
        };
        if current.half_width < rel * current.mean {
            return Ok(current);
        }
        if target >= opts.max_replicates {
            return Err(MPMError::CannotCompute {
                reason: format!(
                    "half-width {} is still >= {rel} x mean {} after {target} replicates",
                    current.half_width, current.mean
                ),
            });
        }
        target = target.saturating_mul(2).min(opts.max_replicates);
    }
}

/// Mean age at which a typical individual produces offspring, conditional
/// on reproducing, estimated from simulated lifelines.
///
/// Parameters
/// ----------
/// - `model`: `&MatrixPopulationModel`
///   A model with a known decomposition.
/// - `opts`: `&EstimatorOptions`
///   Replicates, offspring law, birth class, stopping rule and caps.
///
/// Returns
/// -------
/// `MPMResult<Estimate>`
///   Offspring-weighted mean age, number of reproducing lifelines and the
///   95% half-width.
///
/// Errors
/// ------
/// - `NotAvailable` when the decomposition is unknown.
/// - `InvalidArgument` for Bernoulli reproduction with a column sum of `F`
///   above one, an invalid `initial`, or an undefined `ν` without `initial`.
/// - `DimensionMismatch` when `initial` has the wrong length.
/// - `CannotCompute` when a cap is reached.
pub fn mean_age_repro(model: &MatrixPopulationModel, opts: &EstimatorOptions) -> MPMResult<Estimate> {
    estimate(model, opts, Statistic::MeanAgeRepro)
}

/// Life expectancy of individuals that reproduce at least once, estimated
/// from simulated lifelines. See [`mean_age_repro`] for parameters and
/// errors. In the Poisson mode, an individual in class `j` reproduces with
/// probability `1 − exp(−Σ_i F_ij)`.
pub fn life_expectancy_repro_ibm(
    model: &MatrixPopulationModel, opts: &EstimatorOptions,
) -> MPMResult<Estimate> {
    estimate(model, opts, Statistic::AgeAtDeath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::core::{decomposition::ModelInputs, options::ModelOptions};
    use ndarray::array;

    // ---- Scope ----
    // These tests cover:
    // - Exact answers on a degenerate annual model.
    // - Reproducibility under a seed and the fixed-replicate mode.
    // - Agreement with the closed-form life expectancy of reproducers.
    // - Argument checks and caps.
    //
    // They intentionally DO NOT cover:
    // - Statistical calibration of the half-width.

    fn model(s: &str, f: &str) -> MatrixPopulationModel {
        MatrixPopulationModel::new(
            ModelInputs::from_sf(s, f).with_options(ModelOptions::default().silent()),
        )
        .unwrap()
    }

    fn fixed(replicates: usize, seed: u64) -> EstimatorOptions {
        EstimatorOptions { replicates, target_rel_err: None, ..EstimatorOptions::default() }
            .with_seed(seed)
    }

    #[test]
    // Purpose
    // -------
    // Annual organisms that reproduce live exactly one step and reproduce at
    // age 1.
    //
    // Given
    // -----
    // - S = [[0]], F = [[1.2]].
    //
    // Expect
    // ------
    // - Both estimates equal 1 with zero half-width, after the initial
    //   replicate count.
    fn annual_model_is_exact() {
        // Arrange
        let m = model("0", "1.2");
        let opts = EstimatorOptions::default().with_seed(7);

        // Act
        let le = life_expectancy_repro_ibm(&m, &opts).unwrap();
        let age = mean_age_repro(&m, &opts).unwrap();

        // Assert
        assert_eq!(le.mean, 1.0);
        assert_eq!(le.half_width, 0.0);
        assert_eq!(le.replicates, 1000);
        assert_eq!(age.mean, 1.0);
    }

    #[test]
    // Purpose
    // -------
    // A seed makes runs reproducible; without a target exactly `replicates`
    // lifelines are recorded.
    //
    // Given
    // -----
    // - S = [[0.5, 0], [0.5, 0.8]], F = [[0, 1.5], [0, 0]], seed 42, 500
    //   replicates, no target.
    //
    // Expect
    // ------
    // - Identical estimates; 500 replicates; mean age ≥ 2.
    fn seeded_runs_are_reproducible() {
        // Arrange
        let m = model("0.5 0; 0.5 0.8", "0 1.5; 0 0");
        let opts = fixed(500, 42);

        // Act
        let first = mean_age_repro(&m, &opts).unwrap();
        let second = mean_age_repro(&m, &opts).unwrap();

        // Assert
        assert_eq!(first, second);
        assert_eq!(first.replicates, 500);
        assert!(first.mean >= 2.0);
        assert!(first.half_width > 0.0);
    }

    #[test]
    // Purpose
    // -------
    // The simulated life expectancy of reproducers agrees with the
    // closed-form value.
    //
    // Given
    // -----
    // - S = [[0.5]], F = [[1]], seed 3, 20000 replicates.
    //
    // Expect
    // ------
    // - |estimate − exact| within five half-widths.
    fn life_expectancy_matches_closed_form() {
        // Arrange
        let m = model("0.5", "1");
        let opts = fixed(20_000, 3);

        // Act
        let est = life_expectancy_repro_ibm(&m, &opts).unwrap();
        let exact = m.life_expectancy_repro().unwrap().value().unwrap();

        // Assert
        assert!((est.mean - exact).abs() < 5.0 * est.half_width);
    }

    #[test]
    // Purpose
    // -------
    // Invalid configurations are rejected before simulating.
    //
    // Given
    // -----
    // - Bernoulli reproduction with F = [[1.2]]; an `initial` of the wrong
    //   length; a model without decomposition.
    //
    // Expect
    // ------
    // - `InvalidArgument { name: "reproduction" }`, `DimensionMismatch`,
    //   `NotAvailable { descriptor: "mean_age_repro" }`.
    fn invalid_configurations_are_rejected() {
        // Arrange
        let annual = model("0", "1.2");
        let bernoulli = EstimatorOptions {
            reproduction: Reproduction::Bernoulli,
            ..EstimatorOptions::default()
        };
        let wrong_initial =
            EstimatorOptions { initial: Some(array![0.5, 0.5]), ..EstimatorOptions::default() };
        let unsplit = MatrixPopulationModel::new(ModelInputs::from_a("0.1 2; 0.4 0.8")).unwrap();

        // Act
        let r1 = mean_age_repro(&annual, &bernoulli);
        let r2 = mean_age_repro(&annual, &wrong_initial);
        let r3 = mean_age_repro(&unsplit, &EstimatorOptions::default());

        // Assert
        assert!(matches!(r1, Err(MPMError::InvalidArgument { name: "reproduction", .. })));
        assert!(matches!(r2, Err(MPMError::DimensionMismatch { name: "initial", .. })));
        assert!(matches!(r3, Err(MPMError::NotAvailable { descriptor: "mean_age_repro", .. })));
    }

    #[test]
    // Purpose
    // -------
    // Unbounded lifelines and non-reproducing lineages hit their caps.
    //
    // Given
    // -----
    // - An immortal class S = [[1]], F = [[0.5]] with `max_age = 50`.
    // - A model whose newborns never reach the fertile class:
    //   S = [[0, 0], [0, 0.5]], F = [[0, 1], [0, 0]], started in class 0.
    //
    // Expect
    // ------
    // - `CannotCompute` in both cases.
    fn caps_yield_cannot_compute() {
        // Arrange
        let immortal = model("1", "0.5");
        let short = EstimatorOptions { max_age: 50, ..fixed(10, 1) };
        let sterile = model("0 0; 0 0.5", "0 1; 0 0");
        let from_zero = EstimatorOptions {
            initial: Some(array![1.0, 0.0]),
            max_attempts_factor: 5,
            ..fixed(10, 1)
        };

        // Act
        let r1 = life_expectancy_repro_ibm(&immortal, &short);
        let r2 = mean_age_repro(&sterile, &from_zero);

        // Assert
        assert!(matches!(r1, Err(MPMError::CannotCompute { .. })));
        assert!(matches!(r2, Err(MPMError::CannotCompute { .. })));
    }
}
