//! rust_matpop — descriptors of matrix population models with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! the descriptor engine to Python via the `_rust_matpop` extension module.
//! When the `python-bindings` feature is enabled, this module defines the
//! Python-facing `MPM` class used by the `rust_matpop` package.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`linalg`, `population`, `simulation`)
//!   as the public crate surface.
//! - Define a `#[pyclass]` wrapper and the `#[pymodule]` initializer for the
//!   `_rust_matpop` Python extension.
//! - Register the `population` submodule in `sys.modules` so that
//!   dot-notation imports work as expected.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work is implemented in the inner Rust modules; this file
//!   performs only FFI glue, input conversion, and error mapping.
//! - Undefined descriptors (`Defined::Undefined`) are returned to Python as
//!   `None`; genuine failures raise `ValueError`.
//!
//! Conventions
//! -----------
//! - Python attribute names follow the usual demographic notation (`A`, `S`,
//!   `F`, `R0`, `T_a`, ...). Vectors and matrices are returned as fresh NumPy
//!   arrays.
//! - Indexing is 0-based, as in the Rust modules.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend directly on [`population`] and
//!   [`simulation`] and can ignore the PyO3 items guarded by the
//!   `python-bindings` feature.
//!
//! Testing notes
//! -------------
//! - Numerical behavior is covered by unit tests in the inner modules and by
//!   `tests/integration_mpm_pipeline.rs`.

pub mod linalg;
pub mod population;
pub mod simulation;
pub mod utils;

#[cfg(feature = "python-bindings")]
use std::collections::BTreeMap;

#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2};

#[cfg(feature = "python-bindings")]
use numpy::{PyArray1, PyArray2, ToPyArray};

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    population::{core::descriptor::Defined, models::MatrixPopulationModel},
    simulation::{life_expectancy_repro_ibm, mean_age_repro, Estimate},
    utils::{build_model_inputs, extract_estimator_options, extract_vector},
};

#[cfg(feature = "python-bindings")]
fn vector<'py>(py: Python<'py>, d: Defined<&Array1<f64>>) -> Option<Bound<'py, PyArray1<f64>>> {
    d.value().map(|x| x.to_pyarray(py))
}

#[cfg(feature = "python-bindings")]
fn matrix<'py>(py: Python<'py>, d: Defined<&Array2<f64>>) -> Option<Bound<'py, PyArray2<f64>>> {
    d.value().map(|x| x.to_pyarray(py))
}

#[cfg(feature = "python-bindings")]
fn estimate_tuple(e: Estimate) -> (f64, usize, f64) {
    (e.mean, e.replicates, e.half_width)
}

/// MPM — Python-facing wrapper for [`MatrixPopulationModel`].
///
/// Purpose
/// -------
/// Expose the lazily cached descriptors of a matrix population model to
/// Python callers while preserving the Rust error handling.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `MPM(A=None, S=None, F=None, fertilities=None, metadata=None,
/// rel_tol=None, abs_tol=None, warnings=True)`:
/// - `A`, `S`, `F`: matrix literal, 2-D array, nested sequence, float or
///   `pathlib.Path`. Either `A`, or `S` and `F`, or `A` with one of them, or
///   `A` with `fertilities` must be supplied.
/// - `fertilities`: list of `(row, col)` entries of `A` that are fertilities.
/// - `metadata`: free-form `dict[str, str]`.
/// - `rel_tol`, `abs_tol`: closeness tolerances.
/// - `warnings`: whether undefined descriptors are logged.
///
/// Fields
/// ------
/// - `inner`: [`MatrixPopulationModel`]
///   Validated model owning the descriptor cache.
///
/// Notes
/// -----
/// - Descriptors are computed on first access and cached on `inner`; the
///   Monte-Carlo estimators are recomputed on every call.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_matpop.population", unsendable)]
pub struct MPM {
    /// Underlying Rust model.
    pub inner: MatrixPopulationModel,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl MPM {
    #[new]
    #[pyo3(
        signature = (
            A = None,
            S = None,
            F = None,
            fertilities = None,
            metadata = None,
            rel_tol = None,
            abs_tol = None,
            warnings = None,
        ),
        text_signature = "(A=None, S=None, F=None, fertilities=None, metadata=None, \
                          rel_tol=None, abs_tol=None, warnings=None)"
    )]
    #[allow(non_snake_case, clippy::too_many_arguments)]
    pub fn new(
        A: Option<&Bound<'_, PyAny>>, S: Option<&Bound<'_, PyAny>>, F: Option<&Bound<'_, PyAny>>,
        fertilities: Option<Vec<(usize, usize)>>, metadata: Option<BTreeMap<String, String>>,
        rel_tol: Option<f64>, abs_tol: Option<f64>, warnings: Option<bool>,
    ) -> PyResult<Self> {
        let inputs =
            build_model_inputs(A, S, F, fertilities, metadata, rel_tol, abs_tol, warnings)?;
        Ok(MPM { inner: MatrixPopulationModel::new(inputs)? })
    }

    // ---- Matrices ----

    #[getter(A)]
    pub fn a<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner.a().to_pyarray(py)
    }

    #[getter(S)]
    pub fn s<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f64>>> {
        Ok(self.inner.s()?.to_pyarray(py))
    }

    #[getter(F)]
    pub fn f<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f64>>> {
        Ok(self.inner.f()?.to_pyarray(py))
    }

    #[getter]
    pub fn dim(&self) -> usize {
        self.inner.dim()
    }

    #[getter]
    pub fn split(&self) -> bool {
        self.inner.split()
    }

    #[getter]
    pub fn metadata(&self) -> BTreeMap<String, String> {
        self.inner.metadata().clone()
    }

    // ---- Structure ----

    #[getter]
    pub fn irreducible(&self) -> bool {
        self.inner.irreducible()
    }

    #[getter]
    pub fn primitive(&self) -> bool {
        self.inner.primitive()
    }

    #[getter]
    pub fn quasi_irreducible(&self) -> PyResult<bool> {
        Ok(self.inner.quasi_irreducible()?)
    }

    #[getter]
    pub fn quasi_primitive(&self) -> PyResult<bool> {
        Ok(self.inner.quasi_primitive()?)
    }

    #[getter]
    pub fn index_of_imprimitivity(&self) -> PyResult<Option<usize>> {
        Ok(self.inner.index_of_imprimitivity()?.value())
    }

    #[getter]
    pub fn leslie(&self) -> PyResult<bool> {
        Ok(self.inner.leslie()?)
    }

    #[getter]
    pub fn usher(&self) -> PyResult<bool> {
        Ok(self.inner.usher()?)
    }

    #[getter]
    pub fn postreproductive_classes(&self) -> PyResult<Vec<bool>> {
        Ok(self.inner.postreproductive_classes()?.to_vec())
    }

    // ---- Spectrum ----

    #[getter]
    pub fn lmbd(&self) -> PyResult<f64> {
        Ok(self.inner.lmbd()?)
    }

    #[getter]
    pub fn w<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyArray1<f64>>>> {
        Ok(vector(py, self.inner.w()?))
    }

    #[getter]
    pub fn v<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyArray1<f64>>>> {
        Ok(vector(py, self.inner.v()?))
    }

    #[getter]
    pub fn damping_ratio(&self) -> PyResult<f64> {
        Ok(self.inner.damping_ratio()?)
    }

    #[getter]
    pub fn second_order_period(&self) -> PyResult<Option<f64>> {
        Ok(self.inner.second_order_period()?.value())
    }

    #[getter]
    pub fn sensitivities<'py>(
        &self, py: Python<'py>,
    ) -> PyResult<Option<Bound<'py, PyArray2<f64>>>> {
        Ok(matrix(py, self.inner.sensitivities()?))
    }

    #[getter]
    pub fn elasticities<'py>(
        &self, py: Python<'py>,
    ) -> PyResult<Option<Bound<'py, PyArray2<f64>>>> {
        Ok(matrix(py, self.inner.elasticities()?))
    }

    // ---- Genealogy ----

    #[getter(P)]
    pub fn p<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyArray2<f64>>>> {
        Ok(matrix(py, self.inner.p()?))
    }

    #[getter]
    pub fn pi<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyArray1<f64>>>> {
        Ok(vector(py, self.inner.pi()?))
    }

    #[getter]
    pub fn entropy_rate(&self) -> PyResult<Option<f64>> {
        Ok(self.inner.entropy_rate()?.value())
    }

    #[getter]
    pub fn population_entropy(&self) -> PyResult<Option<f64>> {
        Ok(self.inner.population_entropy()?.value())
    }

    // ---- Reproduction ----

    #[getter]
    pub fn fundamental_matrix<'py>(
        &self, py: Python<'py>,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        Ok(self.inner.fundamental_matrix()?.to_pyarray(py))
    }

    #[getter]
    pub fn next_generation_matrix<'py>(
        &self, py: Python<'py>,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        Ok(self.inner.next_generation_matrix()?.to_pyarray(py))
    }

    #[getter(R0)]
    pub fn r0(&self) -> PyResult<f64> {
        Ok(self.inner.r0()?)
    }

    #[getter]
    pub fn nu<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyArray1<f64>>>> {
        Ok(vector(py, self.inner.nu()?))
    }

    #[getter(T_a)]
    pub fn t_a(&self) -> PyResult<Option<f64>> {
        Ok(self.inner.t_a()?.value())
    }

    #[getter(T_G)]
    pub fn t_g(&self) -> PyResult<f64> {
        Ok(self.inner.t_g()?)
    }

    #[getter(T_R0)]
    pub fn t_r0(&self) -> PyResult<Option<f64>> {
        Ok(self.inner.t_r0()?.value())
    }

    #[getter]
    pub fn mu1(&self) -> PyResult<Option<f64>> {
        Ok(self.inner.mu1()?.value())
    }

    // ---- Life table ----

    pub fn survivorship(&self, t: usize) -> PyResult<Option<f64>> {
        Ok(self.inner.survivorship(t)?.value())
    }

    #[getter]
    pub fn life_expectancy(&self) -> PyResult<Option<f64>> {
        Ok(self.inner.life_expectancy()?.value())
    }

    #[getter]
    pub fn life_expectancy_repro(&self) -> PyResult<Option<f64>> {
        Ok(self.inner.life_expectancy_repro()?.value())
    }

    #[getter]
    pub fn mean_age_population(&self) -> PyResult<Option<f64>> {
        Ok(self.inner.mean_age_population()?.value())
    }

    #[getter]
    pub fn lifetable_entropy(&self) -> PyResult<Option<f64>> {
        Ok(self.inner.lifetable_entropy()?.value())
    }

    // ---- Excess / transients ----

    #[getter]
    pub fn fertility_excess(&self) -> PyResult<f64> {
        Ok(self.inner.fertility_excess()?)
    }

    #[getter]
    pub fn survival_excess(&self) -> PyResult<Option<f64>> {
        Ok(self.inner.survival_excess()?.value())
    }

    #[pyo3(signature = (n0, auto = false))]
    pub fn population_momentum<'py>(
        &self, py: Python<'py>, n0: &Bound<'py, PyAny>, auto: bool,
    ) -> PyResult<Option<f64>> {
        let n0 = extract_vector(py, n0)?;
        Ok(self.inner.population_momentum(&n0, auto)?.value())
    }

    pub fn keyfitz_delta<'py>(
        &self, py: Python<'py>, n0: &Bound<'py, PyAny>,
    ) -> PyResult<Option<f64>> {
        let n0 = extract_vector(py, n0)?;
        Ok(self.inner.keyfitz_delta(&n0)?.value())
    }

    pub fn cohen_d1<'py>(&self, py: Python<'py>, n0: &Bound<'py, PyAny>) -> PyResult<Option<f64>> {
        let n0 = extract_vector(py, n0)?;
        Ok(self.inner.cohen_d1(&n0)?.value())
    }

    // ---- Monte-Carlo estimators ----

    /// Returns `(mean, replicates, half_width)`.
    #[pyo3(signature = (n = 1000, reproduction = None, ini = None, target_err = Some(0.01), seed = None))]
    pub fn mean_age_repro<'py>(
        &self, py: Python<'py>, n: usize, reproduction: Option<&str>,
        ini: Option<&Bound<'py, PyAny>>, target_err: Option<f64>, seed: Option<u64>,
    ) -> PyResult<(f64, usize, f64)> {
        let opts = extract_estimator_options(py, n, reproduction, ini, target_err, seed)?;
        Ok(estimate_tuple(mean_age_repro(&self.inner, &opts)?))
    }

    /// Returns `(mean, replicates, half_width)`.
    #[pyo3(signature = (n = 1000, reproduction = None, ini = None, target_err = Some(0.01), seed = None))]
    pub fn life_expectancy_repro_ibm<'py>(
        &self, py: Python<'py>, n: usize, reproduction: Option<&str>,
        ini: Option<&Bound<'py, PyAny>>, target_err: Option<f64>, seed: Option<u64>,
    ) -> PyResult<(f64, usize, f64)> {
        let opts = extract_estimator_options(py, n, reproduction, ini, target_err, seed)?;
        Ok(estimate_tuple(life_expectancy_repro_ibm(&self.inner, &opts)?))
    }
}

/// _rust_matpop — PyO3 module initializer for the Python extension.
///
/// Purpose
/// -------
/// Define the `_rust_matpop` Python module and register the `population`
/// submodule used by the public `rust_matpop` package.
///
/// Errors
/// ------
/// - `PyErr`
///   If creating the submodule or manipulating `sys.modules` fails.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_matpop<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let population_mod = PyModule::new(_py, "population")?;
    population(_py, m, &population_mod)?;

    // Manually add the submodule into sys.modules to allow for dot notation.
    _py.import("sys")?.getattr("modules")?.set_item("rust_matpop.population", population_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn population<'py>(
    _py: Python, rust_matpop: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<MPM>()?;
    rust_matpop.add_submodule(m)?;
    Ok(())
}
