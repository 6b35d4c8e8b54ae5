//! Python-side argument conversion for the `MPM` binding.
//!
//! Matrices arrive as text literals, nested lists, scalars, 2-D NumPy arrays
//! or `pathlib.Path` objects and are turned into [`MatrixInput`]; population
//! vectors arrive as 1-D arrays or sequences. Model and estimator options are
//! assembled here so that `lib.rs` only dispatches.
#[cfg(feature = "python-bindings")]
use std::{collections::BTreeMap, path::PathBuf};

#[cfg(feature = "python-bindings")]
use ndarray::Array1;

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::{PyTypeError, PyValueError},
    prelude::*,
    types::{PyAny, PyString},
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
    PyReadonlyArray2,
};

#[cfg(feature = "python-bindings")]
use crate::{
    population::core::{
        decomposition::ModelInputs,
        matrix_input::MatrixInput,
        options::{ModelOptions, SearchLimits},
        tolerance::Tolerance,
    },
    simulation::options::{EstimatorOptions, Reproduction},
};

#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        PyTypeError::new_err("expected a 1-D numpy.ndarray or sequence of float64")
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Owned copy of a 1-D population vector.
#[cfg(feature = "python-bindings")]
pub fn extract_vector<'py>(py: Python<'py>, raw: &Bound<'py, PyAny>) -> PyResult<Array1<f64>> {
    let arr = extract_f64_array(py, raw)?;
    let slice = arr
        .as_slice()
        .map_err(|_| PyValueError::new_err("expected a contiguous 1-D float64 array"))?;
    Ok(Array1::from(slice.to_vec()))
}

/// Interpret a Python object as a matrix.
///
/// `str` is parsed as a literal (`"0.1 2; 0.4 0.8"`), `pathlib.Path` is read
/// as a file, a float is a 1×1 matrix and nested sequences are rows.
#[cfg(feature = "python-bindings")]
pub fn extract_matrix(raw: &Bound<'_, PyAny>) -> PyResult<MatrixInput> {
    if raw.is_instance_of::<PyString>() {
        return Ok(MatrixInput::Literal(raw.extract::<String>()?));
    }
    if let Ok(arr) = raw.extract::<PyReadonlyArray2<f64>>() {
        return Ok(MatrixInput::Array(arr.as_array().to_owned()));
    }
    if let Ok(path) = raw.extract::<PathBuf>() {
        return Ok(MatrixInput::File(path));
    }
    if let Ok(value) = raw.extract::<f64>() {
        return Ok(MatrixInput::from(value));
    }
    let rows: Vec<Vec<f64>> = raw.extract().map_err(|_| {
        PyTypeError::new_err(
            "expected a matrix literal, a 2-D numpy.ndarray, a nested sequence of float64 or a path",
        )
    })?;
    Ok(MatrixInput::Rows(rows))
}

#[cfg(feature = "python-bindings")]
#[allow(clippy::too_many_arguments)]
pub fn build_model_inputs(
    a: Option<&Bound<'_, PyAny>>, s: Option<&Bound<'_, PyAny>>, f: Option<&Bound<'_, PyAny>>,
    fertilities: Option<Vec<(usize, usize)>>, metadata: Option<BTreeMap<String, String>>,
    rel_tol: Option<f64>, abs_tol: Option<f64>, warnings: Option<bool>,
) -> PyResult<ModelInputs> {
    let mut inputs = ModelInputs::default();
    inputs.a = a.map(extract_matrix).transpose()?;
    inputs.s = s.map(extract_matrix).transpose()?;
    inputs.f = f.map(extract_matrix).transpose()?;
    inputs.fertilities = fertilities;
    inputs.metadata = metadata.unwrap_or_default();

    let defaults = ModelOptions::default();
    let tolerance = Tolerance::new(
        rel_tol.unwrap_or(defaults.tolerance.rel),
        abs_tol.unwrap_or(defaults.tolerance.abs),
    )?;
    inputs.options = ModelOptions::new(
        tolerance,
        SearchLimits::default(),
        defaults.eigen_eps,
        warnings.unwrap_or(defaults.warnings),
    )?;
    Ok(inputs)
}

#[cfg(feature = "python-bindings")]
pub fn extract_estimator_options<'py>(
    py: Python<'py>, n: usize, reproduction: Option<&str>, ini: Option<&Bound<'py, PyAny>>,
    target_err: Option<f64>, seed: Option<u64>,
) -> PyResult<EstimatorOptions> {
    let reproduction = match reproduction.unwrap_or("poisson").to_lowercase().as_str() {
        "poisson" => Reproduction::Poisson,
        "bernoulli" => Reproduction::Bernoulli,
        other => {
            return Err(PyValueError::new_err(format!(
                "invalid reproduction {:?} (expected 'poisson' or 'bernoulli')",
                other
            )));
        }
    };
    let initial = ini.map(|raw| extract_vector(py, raw)).transpose()?;
    let defaults = EstimatorOptions::default();
    let opts = EstimatorOptions::new(
        n,
        reproduction,
        initial,
        target_err,
        seed,
        defaults.max_replicates.max(n),
        defaults.max_age,
        defaults.max_attempts_factor,
    )?;
    Ok(opts)
}
