//! MatrixPopulationModel — validated `A = S + F` plus a lazily filled table
//! of descriptors.
//!
//! Purpose
//! -------
//! Own the projection matrix of a model (and its survival / fertility parts
//! when known) together with one write-once slot per derived descriptor.
//! The descriptor routines themselves live in sibling modules
//! (`structure`, `spectrum`, `genealogy`, `reproduction`, `lifetable`,
//! `excess`), each adding an `impl MatrixPopulationModel` block.
//!
//! Key behaviors
//! -------------
//! - [`MatrixPopulationModel::new`] resolves and validates the inputs; no
//!   partially valid model is ever returned.
//! - Every descriptor is computed on first read, stored, and returned by
//!   reference afterwards. Failures are returned to the caller and leave the
//!   slot empty.
//! - Undefined descriptors are `Defined::Undefined(caveat)`; public
//!   accessors emit a `tracing::warn!` event for them unless
//!   `ModelOptions::warnings` is off.
//!
//! Invariants & assumptions
//! ------------------------
//! - `A`, `S`, `F` are never mutated after construction; only the metadata
//!   map is mutable.
//! - The model is `Send` but not `Sync`; the cache is single-threaded.
//!
//! Downstream usage
//! ----------------
//! - Build with `MatrixPopulationModel::new(ModelInputs::from_a("0.1 2; 0.4 0.8"))`
//!   or `ModelInputs::from_sf(s, f)`, then read descriptors:
//!   `model.lmbd()?`, `model.w()?`, `model.r0()?` and so on.
//! - `S`/`F`-based descriptors return `MPMError::NotAvailable` when the
//!   decomposition is unknown.
use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array1, Array2};

use crate::{
    linalg::EigenElements,
    population::{
        core::{
            decomposition::{Decomposition, ModelInputs},
            descriptor::{Defined, Descriptor},
            options::ModelOptions,
        },
        errors::{MPMError, MPMResult},
        models::{
            lifetable::ReproductionChain,
            reproduction::{NewbornClass, R0Elements},
            structure::{IrreducibleComponents, NormalForm},
        },
    },
};

/// One slot per cached descriptor.
#[derive(Debug)]
pub(crate) struct DescriptorCache {
    // ---- Structure ----
    pub(crate) irreducible: Descriptor<bool>,
    pub(crate) irreducible_components: Descriptor<IrreducibleComponents>,
    pub(crate) normal_form: Descriptor<NormalForm>,
    pub(crate) periods: Descriptor<Vec<Option<usize>>>,
    pub(crate) component_radii: Descriptor<Vec<f64>>,
    pub(crate) index_of_imprimitivity: Descriptor<Defined<usize>>,
    pub(crate) primitive: Descriptor<bool>,
    pub(crate) quasi_irreducible: Descriptor<bool>,
    pub(crate) quasi_primitive: Descriptor<bool>,
    // ---- Spectrum ----
    pub(crate) eigen: Descriptor<EigenElements>,
    pub(crate) lmbd: Descriptor<f64>,
    pub(crate) w: Descriptor<Defined<Array1<f64>>>,
    pub(crate) v: Descriptor<Defined<Array1<f64>>>,
    pub(crate) damping_ratio: Descriptor<f64>,
    pub(crate) second_order_period: Descriptor<Defined<f64>>,
    pub(crate) sensitivities: Descriptor<Defined<Array2<f64>>>,
    pub(crate) elasticities: Descriptor<Defined<Array2<f64>>>,
    // ---- Genealogy ----
    pub(crate) p: Descriptor<Defined<Array2<f64>>>,
    pub(crate) ps: Descriptor<Defined<Array2<f64>>>,
    pub(crate) pf: Descriptor<Defined<Array2<f64>>>,
    pub(crate) pi: Descriptor<Defined<Array1<f64>>>,
    pub(crate) entropy_rate: Descriptor<Defined<f64>>,
    pub(crate) population_entropy: Descriptor<Defined<f64>>,
    // ---- Reproduction ----
    pub(crate) mixed_transitions: Descriptor<bool>,
    pub(crate) fundamental_matrix: Descriptor<Array2<f64>>,
    pub(crate) next_generation_matrix: Descriptor<Array2<f64>>,
    pub(crate) fundamental_matrix_ps: Descriptor<Defined<Array2<f64>>>,
    pub(crate) r0: Descriptor<R0Elements>,
    pub(crate) cohort_r0: Descriptor<Defined<f64>>,
    pub(crate) total_reproductive_output: Descriptor<Defined<Array2<f64>>>,
    pub(crate) newborn_classes: Descriptor<Vec<NewbornClass>>,
    pub(crate) reproductive_classes: Descriptor<Vec<bool>>,
    pub(crate) postreproductive_classes: Descriptor<Vec<bool>>,
    pub(crate) proportion_newborns: Descriptor<Defined<Array1<f64>>>,
    pub(crate) nu: Descriptor<Defined<Array1<f64>>>,
    pub(crate) class_of_birth: Descriptor<Defined<Array2<f64>>>,
    pub(crate) leslie: Descriptor<bool>,
    pub(crate) usher: Descriptor<bool>,
    pub(crate) t_a: Descriptor<Defined<f64>>,
    pub(crate) t_g: Descriptor<f64>,
    pub(crate) t_r0: Descriptor<Defined<f64>>,
    pub(crate) mu1: Descriptor<Defined<f64>>,
    // ---- Life table ----
    pub(crate) remaining_life_expectancy: Descriptor<Array1<f64>>,
    pub(crate) life_expectancy: Descriptor<Defined<f64>>,
    pub(crate) mean_age_class: Descriptor<Defined<Vec<Option<f64>>>>,
    pub(crate) mean_age_population: Descriptor<Defined<f64>>,
    pub(crate) lifetable_entropy: Descriptor<Defined<f64>>,
    pub(crate) reproduction_chain: Descriptor<ReproductionChain>,
    pub(crate) life_expectancy_repro: Descriptor<Defined<f64>>,
    // ---- Excess ----
    pub(crate) fertility_excess: Descriptor<f64>,
    pub(crate) survival_excess: Descriptor<Defined<f64>>,
}

impl DescriptorCache {
    fn new() -> Self {
        DescriptorCache {
            irreducible: Descriptor::new("irreducible"),
            irreducible_components: Descriptor::new("irreducible_components"),
            normal_form: Descriptor::new("normal_form"),
            periods: Descriptor::new("periods"),
            component_radii: Descriptor::new("component_radii"),
            index_of_imprimitivity: Descriptor::new("index_of_imprimitivity"),
            primitive: Descriptor::new("primitive"),
            quasi_irreducible: Descriptor::new("quasi_irreducible"),
            quasi_primitive: Descriptor::new("quasi_primitive"),
            eigen: Descriptor::new("eigen_elements"),
            lmbd: Descriptor::new("lmbd"),
            w: Descriptor::new("w"),
            v: Descriptor::new("v"),
            damping_ratio: Descriptor::new("damping_ratio"),
            second_order_period: Descriptor::new("second_order_period"),
            sensitivities: Descriptor::new("sensitivities"),
            elasticities: Descriptor::new("elasticities"),
            p: Descriptor::new("P"),
            ps: Descriptor::new("Ps"),
            pf: Descriptor::new("Pf"),
            pi: Descriptor::new("pi"),
            entropy_rate: Descriptor::new("entropy_rate"),
            population_entropy: Descriptor::new("population_entropy"),
            mixed_transitions: Descriptor::new("mixed_transitions"),
            fundamental_matrix: Descriptor::new("fundamental_matrix"),
            next_generation_matrix: Descriptor::new("G"),
            fundamental_matrix_ps: Descriptor::new("fundamental_matrix_Ps"),
            r0: Descriptor::new("R0"),
            cohort_r0: Descriptor::new("cohort_R0"),
            total_reproductive_output: Descriptor::new("total_reproductive_output"),
            newborn_classes: Descriptor::new("newborn_classes"),
            reproductive_classes: Descriptor::new("reproductive_classes"),
            postreproductive_classes: Descriptor::new("postreproductive_classes"),
            proportion_newborns: Descriptor::new("proportion_newborns"),
            nu: Descriptor::new("nu"),
            class_of_birth: Descriptor::new("class_of_birth"),
            leslie: Descriptor::new("leslie"),
            usher: Descriptor::new("usher"),
            t_a: Descriptor::new("T_a"),
            t_g: Descriptor::new("T_G"),
            t_r0: Descriptor::new("T_R0"),
            mu1: Descriptor::new("mu1"),
            remaining_life_expectancy: Descriptor::new("remaining_life_expectancy"),
            life_expectancy: Descriptor::new("life_expectancy"),
            mean_age_class: Descriptor::new("mean_age_class"),
            mean_age_population: Descriptor::new("mean_age_population"),
            lifetable_entropy: Descriptor::new("lifetable_entropy"),
            reproduction_chain: Descriptor::new("reproduction_chain"),
            life_expectancy_repro: Descriptor::new("life_expectancy_repro"),
            fertility_excess: Descriptor::new("fertility_excess"),
            survival_excess: Descriptor::new("survival_excess"),
        }
    }
}

/// MatrixPopulationModel — a validated projection matrix and its descriptors.
///
/// Purpose
/// -------
/// Represent one matrix population model: `A` (dim × dim), optionally its
/// decomposition `A = S + F`, free-form metadata, the options that govern
/// numerical comparisons, and the cache of every derived descriptor.
///
/// Fields
/// ------
/// - `decomposition`: [`Decomposition`]
///   Validated matrices; immutable.
/// - `metadata`: `BTreeMap<String, String>`
///   Annotations with no computational meaning.
/// - `options`: [`ModelOptions`]
///   Tolerance, search caps, eigen rounding and warning switch.
/// - `cache`: one [`Descriptor`] per derived quantity.
///
/// Invariants
/// ----------
/// - `A` is square, finite and non-negative; when `split`, `S` and `F` share
///   its dimension, are non-negative, `A = S + F`, and `S` is substochastic.
///
/// Notes
/// -----
/// - Descriptors depend on each other only in one direction (e.g. `T_a`
///   reads `v`, `w`, `lmbd`, `F`), so reading any of them fills exactly the
///   slots it needs.
#[derive(Debug)]
pub struct MatrixPopulationModel {
    decomposition: Decomposition,
    metadata: BTreeMap<String, String>,
    options: ModelOptions,
    pub(crate) cache: DescriptorCache,
}

impl MatrixPopulationModel {
    /// Construct a model from any accepted combination of inputs.
    ///
    /// Parameters
    /// ----------
    /// - `inputs`: [`ModelInputs`]
    ///   Matrices (`a`, `s`, `f`), optional fertility entries, metadata, file
    ///   options and model options.
    ///
    /// Returns
    /// -------
    /// `MPMResult<MatrixPopulationModel>`
    ///   A model with an empty descriptor cache.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::MissingArguments`] when the matrices are under-specified.
    /// - Parsing errors (`InvalidLiteral`, `RaggedRows`, `EmptyMatrix`, `Io`).
    /// - Structural errors (`NotSquare`, `DimensionMismatch`,
    ///   `NonFiniteEntry`, `NegativeEntry`, `NotSubstochastic`,
    ///   `FertilityIndexOutOfRange`).
    pub fn new(inputs: ModelInputs) -> MPMResult<Self> {
        let decomposition = Decomposition::resolve(
            inputs.a.as_ref(),
            inputs.s.as_ref(),
            inputs.f.as_ref(),
            inputs.fertilities.as_deref(),
            &inputs.load,
            &inputs.options.tolerance,
        )?;
        tracing::debug!(
            dim = decomposition.dim(),
            split = decomposition.split(),
            "constructed matrix population model"
        );
        Ok(MatrixPopulationModel {
            decomposition,
            metadata: inputs.metadata,
            options: inputs.options,
            cache: DescriptorCache::new(),
        })
    }

    /// Model given by its survival and fertility matrices, with the same
    /// options as `self`. Used for derived models such as the one whose
    /// fertility is rescaled by the fertility excess.
    pub(crate) fn from_parts(
        &self, s: Array2<f64>, f: Array2<f64>,
    ) -> MPMResult<MatrixPopulationModel> {
        MatrixPopulationModel::new(ModelInputs::from_sf(s, f).with_options(self.options))
    }

    // ---- Matrices ----

    /// Projection matrix `A`.
    pub fn a(&self) -> &Array2<f64> {
        self.decomposition.a()
    }

    /// Survival matrix `S`.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::NotAvailable`] when the decomposition is unknown.
    pub fn s(&self) -> MPMResult<&Array2<f64>> {
        self.decomposition.s().ok_or_else(|| MPMError::no_decomposition("S"))
    }

    /// Fertility matrix `F`.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::NotAvailable`] when the decomposition is unknown.
    pub fn f(&self) -> MPMResult<&Array2<f64>> {
        self.decomposition.f().ok_or_else(|| MPMError::no_decomposition("F"))
    }

    pub fn dim(&self) -> usize {
        self.decomposition.dim()
    }

    /// Whether `S` and `F` are known.
    pub fn split(&self) -> bool {
        self.decomposition.split()
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.metadata
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// `S` and `F`, or `NotAvailable` naming `descriptor`.
    pub(crate) fn parts(&self, descriptor: &'static str) -> MPMResult<(&Array2<f64>, &Array2<f64>)> {
        match (self.decomposition.s(), self.decomposition.f()) {
            (Some(s), Some(f)) => Ok((s, f)),
            _ => Err(MPMError::no_decomposition(descriptor)),
        }
    }

    /// Hand out a cached `Defined` value, logging its caveat if undefined.
    pub(crate) fn report<'a, T>(
        &self, descriptor: &'static str, value: &'a Defined<T>,
    ) -> Defined<&'a T> {
        if let Defined::Undefined(caveat) = value {
            if self.options.warnings {
                tracing::warn!(descriptor, %caveat, "descriptor is undefined for this model");
            }
        }
        value.as_ref()
    }
}

impl fmt::Display for MatrixPopulationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MatrixPopulationModel(dim = {}, split = {})", self.dim(), self.split())?;
        for row in self.a().rows() {
            let cells: Vec<String> = row.iter().map(|x| format!("{x:>10.6}")).collect();
            writeln!(f, "  [{}]", cells.join(" "))?;
        }
        Ok(())
    }
}
