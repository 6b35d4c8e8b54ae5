//! models — the cached matrix population model and its descriptor families.
//!
//! Purpose
//! -------
//! Host [`MatrixPopulationModel`], the lazily-evaluated descriptor cache, and
//! split its methods by descriptor family so each file reads as one topic of
//! demography.
//!
//! Key behaviors
//! -------------
//! - [`mpm`] owns construction, the cache slots and the `report` / `parts`
//!   plumbing shared by every family.
//! - [`structure`]: irreducibility, primitivity, periods, normal form,
//!   post-reproductive tails and the Leslie / Usher predicates live with
//!   [`reproduction`].
//! - [`spectrum`]: `λ`, `w`, `v`, damping ratio, second-order period,
//!   sensitivities and elasticities.
//! - [`genealogy`]: `P`, `π`, entropy rate and population entropy.
//! - [`reproduction`]: `N`, `G`, `R0`, newborn classes, `ν`, generation
//!   times.
//! - [`lifetable`]: survivorship, life expectancy, mean ages, lifetable
//!   entropy and the reproduction chain.
//! - [`excess`]: fertility / survival excess, momentum and transient
//!   convergence indices.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every descriptor is computed at most once per model; errors are never
//!   cached, so a failed computation is retried on the next call.
//! - Descriptors that need `S` and `F` fail with `NotAvailable` naming the
//!   requested descriptor when the model was built from `A` alone.
//!
//! Testing notes
//! -------------
//! - Each family carries its own unit tests on small closed-form models;
//!   end-to-end checks live in `tests/integration_mpm_pipeline.rs`.

pub mod excess;
pub mod genealogy;
pub mod lifetable;
pub mod mpm;
pub mod reproduction;
pub mod spectrum;
pub mod structure;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::lifetable::ReproductionChain;
pub use self::mpm::MatrixPopulationModel;
pub use self::reproduction::{NewbornClass, R0Elements};
pub use self::structure::{IrreducibleComponents, NormalForm};
