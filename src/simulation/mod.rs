//! simulation — Monte-Carlo estimators built on individual lifelines.
//!
//! Purpose
//! -------
//! Provide stochastic estimates of quantities that the deterministic
//! descriptor engine does not compute in closed form. Estimates are returned
//! to the caller and never stored in, or read by, the model's cache.
//!
//! Key behaviors
//! -------------
//! - [`options`] holds [`EstimatorOptions`], [`Reproduction`] and the
//!   [`Estimate`] result.
//! - [`lifelines`] simulates individuals through `S` and `F` and exposes
//!   [`mean_age_repro`] and [`life_expectancy_repro_ibm`].
//!
//! Conventions
//! -----------
//! - Randomness comes from a `StdRng` seeded by `EstimatorOptions::seed`, or
//!   from the OS when no seed is given.
//! - Progress of the doubling loop is reported through `tracing::debug!`.

pub mod lifelines;
pub mod options;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::lifelines::{life_expectancy_repro_ibm, mean_age_repro};
pub use self::options::{Estimate, EstimatorOptions, Reproduction};
