//! Integration tests for matrix population models.
//!
//! Purpose
//! -------
//! - Validate the end-to-end pipeline: matrix inputs, validated model
//!   construction, structural classification, spectral descriptors and the
//!   derived demographic descriptors, through the public crate surface only.
//! - Exercise published reference values rather than internal helpers.
//!
//! Coverage
//! --------
//! - `population::core`:
//!   - `ModelInputs` from literals, nested rows and arrays.
//! - `population::models::MatrixPopulationModel`:
//!   - Classification, `λ`, `w`, `v`, sensitivities and the damping ratio.
//!   - `R0`, the generation-time family and the Leslie predicate.
//!   - Gating of every decomposition-dependent descriptor on `S`/`F`.
//!   - Compute-once caching.
//! - `simulation`:
//!   - The lifeline estimator on a degenerate annual model.
//!
//! Exclusions
//! ----------
//! - Low-level linear-algebra and graph routines; these are covered by unit
//!   tests in `linalg`.
//! - Python bindings; those are exercised from Python.
use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::{array, Array2};
use rust_matpop::{
    population::{Caveat, MPMError, MatrixPopulationModel, ModelInputs, ModelOptions},
    simulation::{life_expectancy_repro_ibm, EstimatorOptions},
};

/// Purpose
/// -------
/// Build a model from `S` and `F` literals with caveat logging switched off.
///
/// Invariants
/// ----------
/// - Panics if construction fails; this is a test configuration error.
fn split_model(s: &str, f: &str) -> MatrixPopulationModel {
    MatrixPopulationModel::new(
        ModelInputs::from_sf(s, f).with_options(ModelOptions::default().silent()),
    )
    .expect("S and F should describe a valid model")
}

/// Purpose
/// -------
/// Build a model known only through `A`.
fn unsplit_model(a: &str) -> MatrixPopulationModel {
    MatrixPopulationModel::new(
        ModelInputs::from_a(a).with_options(ModelOptions::default().silent()),
    )
    .expect("A should describe a valid model")
}

#[test]
// Purpose
// -------
// Reference spectral values of the classic 2×2 model.
//
// Given
// -----
// - A = [[0.1, 2], [0.4, 0.8]] as nested rows.
//
// Expect
// ------
// - Irreducible and primitive; λ ≈ 1.41046863561;
//   w ≈ [0.60414407, 0.39585593]; v·w = 1; sensitivities = v wᵀ.
fn reference_spectrum_of_two_by_two_model() {
    // Arrange
    let rows = vec![vec![0.1, 2.0], vec![0.4, 0.8]];
    let m = MatrixPopulationModel::new(ModelInputs::from_a(rows)).unwrap();

    // Act
    let lmbd = m.lmbd().unwrap();
    let w = m.w().unwrap().value().unwrap().clone();
    let v = m.v().unwrap().value().unwrap().clone();
    let sens = m.sensitivities().unwrap().value().unwrap().clone();

    // Assert
    assert!(m.irreducible());
    assert!(m.primitive());
    assert_relative_eq!(lmbd, 1.41046863561, epsilon = 1e-10);
    assert_abs_diff_eq!(w[0], 0.60414407, epsilon = 1e-8);
    assert_abs_diff_eq!(w[1], 0.39585593, epsilon = 1e-8);
    assert_abs_diff_eq!(v.dot(&w), 1.0, epsilon = 1e-10);
    for ((i, j), &x) in sens.indexed_iter() {
        assert_abs_diff_eq!(x, v[i] * w[j], epsilon = 1e-10);
    }
}

#[test]
// Purpose
// -------
// R0 needs the decomposition; the same A without it fails.
//
// Given
// -----
// - S = [[0.1, 0], [0.4, 0.8]], F = [[0, 2], [0, 0]].
// - A = [[0.1, 2], [0.4, 0.8]] alone.
//
// Expect
// ------
// - split = true and R0 ≈ 4.44444444444 for the first model.
// - `NotAvailable { descriptor: "R0" }` for the second.
fn r0_requires_decomposition() {
    // Arrange
    let split = split_model("0.1 0; 0.4 0.8", "0 2; 0 0");
    let unsplit = unsplit_model("0.1 2; 0.4 0.8");

    // Act
    let r0 = split.r0().unwrap();
    let err = unsplit.r0();

    // Assert
    assert!(split.split());
    assert_relative_eq!(r0, 40.0 / 9.0, epsilon = 1e-10);
    assert!(matches!(err, Err(MPMError::NotAvailable { descriptor: "R0", .. })));
}

#[test]
// Purpose
// -------
// Without S/F, every decomposition-dependent descriptor fails with
// `NotAvailable` and nothing else.
//
// Given
// -----
// - A = [[0.1, 2], [0.4, 0.8]] alone.
//
// Expect
// ------
// - S, F, R0, T_a, T_G, T_R0, mu1 and entropy_rate are `NotAvailable`.
// - λ is still available.
fn unsplit_model_gates_decomposition_descriptors() {
    // Arrange
    let m = unsplit_model("0.1 2; 0.4 0.8");

    // Act
    let failures: Vec<Option<MPMError>> = vec![
        m.s().err(),
        m.f().err(),
        m.r0().err(),
        m.t_a().err(),
        m.t_g().err(),
        m.t_r0().err(),
        m.mu1().err(),
        m.entropy_rate().err(),
    ];

    // Assert
    for err in failures {
        assert!(matches!(err, Some(MPMError::NotAvailable { .. })), "got {err:?}");
    }
    assert!(m.lmbd().is_ok());
}

#[test]
// Purpose
// -------
// Cyclic models have no subdominant eigenvalue and no stable distribution.
//
// Given
// -----
// - The 3-cycle A = [[0, 0, 1], [1, 0, 0], [0, 1, 0]].
//
// Expect
// ------
// - damping ratio = +∞; irreducible but not primitive; w undefined with
//   `NotQuasiPrimitive`.
fn cyclic_model_has_infinite_damping_ratio() {
    // Arrange
    let m = unsplit_model("0 0 1; 1 0 0; 0 1 0");

    // Act
    let rho = m.damping_ratio().unwrap();
    let w = m.w().unwrap();

    // Assert
    assert!(rho.is_infinite() && rho > 0.0);
    assert!(m.irreducible());
    assert!(!m.primitive());
    assert_eq!(w.caveat(), Some(Caveat::NotQuasiPrimitive));
}

#[test]
// Purpose
// -------
// The Leslie predicate depends on the class order, not only on the graph.
//
// Given
// -----
// - A 3-class Leslie model and the same model with classes 0 and 2
//   swapped.
//
// Expect
// ------
// - `leslie` is true then false; λ and R0 agree between the two.
fn reordering_classes_breaks_leslie_form() {
    // Arrange
    let leslie = split_model("0 0 0; 0.5 0 0; 0 0.3 0", "0 1 2; 0 0 0; 0 0 0");
    let reordered = split_model("0 0.3 0; 0 0 0.5; 0 0 0", "0 0 0; 0 0 0; 2 1 0");

    // Act / Assert
    assert!(leslie.leslie().unwrap());
    assert!(!reordered.leslie().unwrap());
    assert_relative_eq!(leslie.lmbd().unwrap(), reordered.lmbd().unwrap(), epsilon = 1e-10);
    assert_relative_eq!(leslie.r0().unwrap(), reordered.r0().unwrap(), epsilon = 1e-10);
    assert_relative_eq!(leslie.r0().unwrap(), 0.5 + 0.5 * 0.3 * 2.0, epsilon = 1e-10);
}

#[test]
// Purpose
// -------
// Annual organisms live exactly one step, deterministically and in
// simulation.
//
// Given
// -----
// - S = [[0]], F = [[1.2]].
//
// Expect
// ------
// - life expectancy = 1, λ = R0 = 1.2, T_a = 1, and a simulated life
//   expectancy of reproducers of exactly 1.
fn annual_model_lives_one_step() {
    // Arrange
    let m = split_model("0", "1.2");
    let opts = EstimatorOptions::default().with_seed(11);

    // Act
    let le = m.life_expectancy().unwrap().value().unwrap();
    let t_a = m.t_a().unwrap().value().unwrap();
    let sim = life_expectancy_repro_ibm(&m, &opts).unwrap();

    // Assert
    assert_abs_diff_eq!(le, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(t_a, 1.0, epsilon = 1e-12);
    assert_relative_eq!(m.lmbd().unwrap(), 1.2, epsilon = 1e-12);
    assert_relative_eq!(m.r0().unwrap(), 1.2, epsilon = 1e-12);
    assert_eq!(sim.mean, 1.0);
}

#[test]
// Purpose
// -------
// Descriptors are computed once; later reads return the stored value.
//
// Given
// -----
// - The split 2×2 model built from arrays.
//
// Expect
// ------
// - Repeated reads of w, the fundamental matrix and the genealogical
//   matrix return the same reference; scalars are bit-identical.
fn descriptors_are_computed_once() {
    // Arrange
    let s: Array2<f64> = array![[0.1, 0.0], [0.4, 0.8]];
    let f: Array2<f64> = array![[0.0, 2.0], [0.0, 0.0]];
    let m = MatrixPopulationModel::new(ModelInputs::from_sf(s, f)).unwrap();

    // Act
    let w1 = m.w().unwrap().value().unwrap();
    let w2 = m.w().unwrap().value().unwrap();
    let n1 = m.fundamental_matrix().unwrap();
    let n2 = m.fundamental_matrix().unwrap();
    let p1 = m.p().unwrap().value().unwrap();
    let p2 = m.p().unwrap().value().unwrap();

    // Assert
    assert!(std::ptr::eq(w1, w2));
    assert!(std::ptr::eq(n1, n2));
    assert!(std::ptr::eq(p1, p2));
    assert_eq!(m.r0().unwrap().to_bits(), m.r0().unwrap().to_bits());
    assert_eq!(
        m.entropy_rate().unwrap().value().unwrap().to_bits(),
        m.entropy_rate().unwrap().value().unwrap().to_bits()
    );
}
