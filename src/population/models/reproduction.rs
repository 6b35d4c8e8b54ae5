//! Reproduction descriptors built on the decomposition `A = S + F`.
//!
//! Purpose
//! -------
//! Compute the quantities that need to tell survival from reproduction:
//! fundamental matrices, the next-generation matrix and `R0`, newborn and
//! reproductive class structure, generation times, and the Leslie / Usher
//! shape checks.
//!
//! Key behaviors
//! -------------
//! - Every accessor fails with [`MPMError::NotAvailable`] when the model was
//!   built from `A` alone.
//! - `N = (I − S)⁻¹` requires `ρ(S) < 1 − abs` and an invertible `I − S`,
//!   otherwise [`MPMError::NonConvergentMatrix`]. Entries of inverted
//!   matrices below the absolute tolerance are clamped to zero; a negative
//!   entry after clamping is an [`MPMError::UnexpectedMathError`].
//! - Descriptors that need `w` or `v` propagate their
//!   `Undefined(NotQuasiPrimitive)` caveat.
//!
//! Invariants & assumptions
//! ------------------------
//! - `G = F N` and `R0 = ρ(G)` with `w_G` of unit sum and `v_G · w_G = 1`
//!   (unless that product is numerically zero, in which case `v_G` keeps the
//!   normalisation of the eigen solver).
//! - When every offspring is born in one class `k`, `nu` is the indicator of
//!   `k` and `class_of_birth` has that indicator in every column, whether or
//!   not `w` exists.
//!
//! Testing notes
//! -------------
//! - Unit tests use the 2×2 models whose `R0` values are known in closed
//!   form (4.444…, 2 and 3) and a survival matrix with an immortal cycle.
use ndarray::{Array1, Array2, Axis};

use crate::{
    linalg::{
        dense::{column_sums, inverse},
        eigen::{eigen_elements, real_vector, spectral_radius},
        graph::{bool_power, support},
    },
    population::{
        core::descriptor::{Caveat, Defined},
        errors::{MPMError, MPMResult},
        models::mpm::MatrixPopulationModel,
    },
};

/// Whether the individuals of a class are newborns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NewbornClass {
    /// No fertility entry leads to the class.
    NotNewborn,
    /// Only fertility entries lead to the class.
    Newborn,
    /// Both survival and fertility lead to the class.
    Mixed,
}

/// Dominant eigen elements of the next-generation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct R0Elements {
    pub r0: f64,
    /// Right eigenvector, unit sum.
    pub w_g: Array1<f64>,
    /// Left eigenvector, `v_g · w_g = 1`.
    pub v_g: Array1<f64>,
}

/// Clamp `|x| < abs` to zero and reject remaining negative entries.
pub(crate) fn clamp_nonnegative(
    mut m: Array2<f64>, abs: f64, what: &str,
) -> MPMResult<Array2<f64>> {
    m.mapv_inplace(|x| if x.abs() < abs { 0.0 } else { x });
    if m.iter().any(|&x| x < 0.0) {
        return Err(MPMError::unexpected(format!(
            "{what} contains negative entries; this is caused by numerical errors in the \
             inversion"
        )));
    }
    Ok(m)
}

fn identity_minus(m: &Array2<f64>) -> Array2<f64> {
    Array2::<f64>::eye(m.nrows()) - m
}

fn fertile_rows(f: &Array2<f64>) -> Vec<bool> {
    f.sum_axis(Axis(1)).iter().map(|&x| x > 0.0).collect()
}

/// Indicator of the only class with incoming fertility, if there is one.
fn unique_birth_class(f: &Array2<f64>) -> Option<Array1<f64>> {
    let rows = fertile_rows(f);
    (rows.iter().filter(|&&r| r).count() == 1)
        .then(|| rows.iter().map(|&r| if r { 1.0 } else { 0.0 }).collect())
}

impl MatrixPopulationModel {
    /// Whether some transition is both a survival and a fertility entry.
    pub fn mixed_transitions(&self) -> MPMResult<bool> {
        let (s, f) = self.parts("mixed_transitions")?;
        Ok(*self
            .cache
            .mixed_transitions
            .get_or_init(|| s.iter().zip(f.iter()).any(|(&x, &y)| x * y > 0.0)))
    }

    /// Fundamental matrix `N = (I − S)⁻¹`.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::NonConvergentMatrix`] if `ρ(S) ≥ 1 − abs` or `I − S` is
    ///   singular.
    /// - [`MPMError::UnexpectedMathError`] if a negative entry survives the
    ///   clamping.
    pub fn fundamental_matrix(&self) -> MPMResult<&Array2<f64>> {
        let (s, _) = self.parts("fundamental_matrix")?;
        self.cache.fundamental_matrix.get_or_try_init(|| {
            let tol = self.options().tolerance;
            let rho = spectral_radius(s, self.options().limits.max_qr_iterations)?;
            if rho >= 1.0 - tol.abs {
                return Err(MPMError::NonConvergentMatrix { name: "S" });
            }
            let n = inverse(&identity_minus(s)).ok_or(MPMError::NonConvergentMatrix { name: "S" })?;
            clamp_nonnegative(n, tol.abs, "the fundamental matrix")
        })
    }

    /// Next-generation matrix `G = F N`.
    pub fn next_generation_matrix(&self) -> MPMResult<&Array2<f64>> {
        let (_, f) = self.parts("G")?;
        self.cache.next_generation_matrix.get_or_try_init(|| Ok(f.dot(self.fundamental_matrix()?)))
    }

    pub(crate) fn fundamental_matrix_ps_entry(&self) -> MPMResult<&Defined<Array2<f64>>> {
        self.parts("fundamental_matrix_Ps")?;
        self.cache.fundamental_matrix_ps.get_or_try_init(|| {
            let abs = self.options().tolerance.abs;
            self.ps_entry()?.as_ref().try_map(|ps| {
                let n = inverse(&identity_minus(ps))
                    .ok_or(MPMError::NonConvergentMatrix { name: "Ps" })?;
                clamp_nonnegative(n, abs, "the fundamental matrix of Ps")
            })
        })
    }

    /// Fundamental matrix of the survival part of the genealogy,
    /// `(I − Ps)⁻¹`.
    pub fn fundamental_matrix_ps(&self) -> MPMResult<Defined<&Array2<f64>>> {
        Ok(self.report("fundamental_matrix_Ps", self.fundamental_matrix_ps_entry()?))
    }

    fn r0_elements(&self) -> MPMResult<&R0Elements> {
        self.parts("R0")?;
        let g = self.next_generation_matrix()?;
        self.cache.r0.get_or_try_init(|| {
            let opts = self.options();
            let e = eigen_elements(g, opts.eigen_eps, opts.limits.max_qr_iterations)?;
            let lead = e.values[0];
            let (w_g, lv) = match (real_vector(&e.right[0]), real_vector(&e.left[0])) {
                (Some(r), Some(l)) if lead.im == 0.0 && r.iter().chain(l.iter()).all(|&x| x >= 0.0) => {
                    (r, l)
                }
                _ => {
                    return Err(MPMError::unexpected(
                        "the dominant eigen elements of G are not real and non-negative",
                    ))
                }
            };
            let x = w_g.dot(&lv);
            let v_g = if x.abs() < opts.tolerance.abs { lv } else { lv / x };
            Ok(R0Elements { r0: lead.re, w_g, v_g })
        })
    }

    /// Net reproductive rate `R0 = ρ(G)`.
    pub fn r0(&self) -> MPMResult<f64> {
        Ok(self.r0_elements()?.r0)
    }

    /// Dominant right eigenvector of `G`.
    pub fn w_g(&self) -> MPMResult<&Array1<f64>> {
        Ok(&self.r0_elements()?.w_g)
    }

    /// Dominant left eigenvector of `G`, scaled so that `v_G · w_G = 1`.
    pub fn v_g(&self) -> MPMResult<&Array1<f64>> {
        Ok(&self.r0_elements()?.v_g)
    }

    /// Mean lifetime offspring of a newborn drawn from `nu`: `‖G ν‖₁`.
    pub fn cohort_r0(&self) -> MPMResult<Defined<f64>> {
        let g = self.next_generation_matrix()?;
        let r = self
            .cache
            .cohort_r0
            .get_or_try_init(|| Ok(self.nu_entry()?.as_ref().map(|nu| g.dot(nu).sum())))?;
        Ok(self.report("cohort_R0", r).copied())
    }

    /// Expected offspring, past and future, of an individual currently in
    /// each class: `F (I − Psᵀ)⁻¹ Psᵀ + G`.
    pub fn total_reproductive_output(&self) -> MPMResult<Defined<&Array2<f64>>> {
        let (_, f) = self.parts("total_reproductive_output")?;
        let r = self.cache.total_reproductive_output.get_or_try_init(|| {
            let g = self.next_generation_matrix()?;
            let nps = self.fundamental_matrix_ps_entry()?.as_ref();
            let ps = self.ps_entry()?.as_ref();
            Ok(nps.zip(ps).map(|(nps, ps)| f.dot(&nps.t()).dot(&ps.t()) + g))
        })?;
        Ok(self.report("total_reproductive_output", r))
    }

    /// Per class: newborn, not newborn, or mixed.
    pub fn newborn_classes(&self) -> MPMResult<&[NewbornClass]> {
        let (s, f) = self.parts("newborn_classes")?;
        let classes = self.cache.newborn_classes.get_or_init(|| {
            let surviving = s.sum_axis(Axis(1));
            fertile_rows(f)
                .into_iter()
                .zip(surviving.iter())
                .map(|(fertile, &s_in)| match (fertile, s_in > 0.0) {
                    (false, _) => NewbornClass::NotNewborn,
                    (true, false) => NewbornClass::Newborn,
                    (true, true) => NewbornClass::Mixed,
                })
                .collect()
        });
        Ok(classes)
    }

    /// Whether all offspring are born in one class made only of newborns.
    pub fn unique_newborn_class(&self) -> MPMResult<bool> {
        let classes = self.newborn_classes()?;
        Ok(!classes.contains(&NewbornClass::Mixed)
            && classes.iter().filter(|&&c| c == NewbornClass::Newborn).count() == 1)
    }

    /// Classes with a positive fertility column.
    pub fn reproductive_classes(&self) -> MPMResult<&[bool]> {
        let (_, f) = self.parts("reproductive_classes")?;
        Ok(self
            .cache
            .reproductive_classes
            .get_or_init(|| column_sums(f).iter().map(|&x| x > 0.0).collect()))
    }

    /// Classes from which no reproductive class is reachable through
    /// survival.
    pub fn postreproductive_classes(&self) -> MPMResult<&[bool]> {
        let (s, _) = self.parts("postreproductive_classes")?;
        let repro = self.reproductive_classes()?;
        Ok(self.cache.postreproductive_classes.get_or_init(|| {
            let n = self.dim();
            let reach = bool_power(&support(&(Array2::<f64>::eye(n) + s)), n - 1);
            (0..n).map(|j| !(0..n).any(|i| repro[i] && reach[[i, j]])).collect()
        }))
    }

    /// Share of newborns in each class at the stable distribution,
    /// `(F w) / (λ w)`.
    ///
    /// Notes
    /// -----
    /// - Classes with `w_i = 0` get 1 when they are pure newborn classes and 0
    ///   when nobody is born in them; mixed classes stay NaN.
    pub fn proportion_newborns(&self) -> MPMResult<Defined<&Array1<f64>>> {
        let (_, f) = self.parts("proportion_newborns")?;
        let p = self.cache.proportion_newborns.get_or_try_init(|| {
            let lmbd = self.lmbd()?;
            let classes = self.newborn_classes()?;
            Ok(self.w_entry()?.as_ref().map(|w| {
                let fw = f.dot(w);
                Array1::from_shape_fn(w.len(), |i| {
                    let x = fw[i] / (lmbd * w[i]);
                    if !x.is_nan() {
                        return x;
                    }
                    match classes[i] {
                        NewbornClass::NotNewborn => 0.0,
                        NewbornClass::Newborn => 1.0,
                        NewbornClass::Mixed => f64::NAN,
                    }
                })
            }))
        })?;
        Ok(self.report("proportion_newborns", p))
    }

    pub(crate) fn nu_entry(&self) -> MPMResult<&Defined<Array1<f64>>> {
        let (_, f) = self.parts("nu")?;
        self.cache.nu.get_or_try_init(|| {
            if let Some(indicator) = unique_birth_class(f) {
                return Ok(Defined::Value(indicator));
            }
            Ok(self.w_entry()?.as_ref().and_then(|w| {
                let fw = f.dot(w);
                let total = fw.sum();
                if total > 0.0 {
                    Defined::Value(fw / total)
                } else {
                    Defined::Undefined(Caveat::NoReproduction)
                }
            }))
        })
    }

    /// Distribution of the classes of birth of the offspring produced at the
    /// stable distribution, `F w / ‖F w‖₁`.
    pub fn nu(&self) -> MPMResult<Defined<&Array1<f64>>> {
        Ok(self.report("nu", self.nu_entry()?))
    }

    /// `b_ij`: probability that an individual now in class `j` was born in
    /// class `i`, `(I − Psᵀ)⁻¹ ⊙ (Pf E)`.
    pub fn class_of_birth(&self) -> MPMResult<Defined<&Array2<f64>>> {
        let (_, f) = self.parts("class_of_birth")?;
        let b = self.cache.class_of_birth.get_or_try_init(|| {
            let n = self.dim();
            if let Some(indicator) = unique_birth_class(f) {
                return Ok(Defined::Value(Array2::from_shape_fn((n, n), |(i, _)| indicator[i])));
            }
            let abs = self.options().tolerance.abs;
            let ps = self.ps_entry()?.as_ref();
            let pf = self.pf_entry()?.as_ref();
            ps.zip(pf).try_map(|(ps, pf)| {
                let fund = inverse(&identity_minus(&ps.t().to_owned())).ok_or_else(|| {
                    MPMError::unexpected("(I - Ps^T) is singular to working precision")
                })?;
                let fund = clamp_nonnegative(fund, abs, "(I - Ps^T)^-1")?;
                let born = pf.sum_axis(Axis(1));
                Ok(Array2::from_shape_fn((n, n), |(i, j)| fund[[i, j]] * born[i]))
            })
        })?;
        Ok(self.report("class_of_birth", b))
    }

    /// Whether `S` and `F` have the exact Leslie shape (fertility on the first
    /// row, survival on the sub-diagonal and in the last diagonal entry).
    pub fn leslie(&self) -> MPMResult<bool> {
        let (s, f) = self.parts("leslie")?;
        let n = self.dim();
        Ok(*self.cache.leslie.get_or_init(|| {
            fertility_on_first_row(f)
                && s.indexed_iter()
                    .all(|((i, j), &x)| x == 0.0 || i == j + 1 || (i == n - 1 && j == n - 1))
        }))
    }

    /// Whether `S` and `F` have the Usher shape: a Leslie shape that also
    /// allows stasis on the diagonal.
    pub fn usher(&self) -> MPMResult<bool> {
        let (s, f) = self.parts("usher")?;
        Ok(*self.cache.usher.get_or_init(|| {
            fertility_on_first_row(f)
                && s.indexed_iter().all(|((i, j), &x)| x == 0.0 || i == j || i == j + 1)
        }))
    }

    pub(crate) fn t_a_entry(&self) -> MPMResult<&Defined<f64>> {
        let (_, f) = self.parts("T_a")?;
        self.cache.t_a.get_or_try_init(|| {
            let lmbd = self.lmbd()?;
            let w = self.w_entry()?.as_ref();
            let v = self.v_entry()?.as_ref();
            Ok(v.zip(w).map(|(v, w)| lmbd / v.dot(&f.dot(w))))
        })
    }

    /// Generation time as the mean age of mothers at the stable
    /// distribution, weighted by reproductive values: `λ / (v F w)`.
    pub fn t_a(&self) -> MPMResult<Defined<f64>> {
        Ok(self.report("T_a", self.t_a_entry()?).copied())
    }

    /// Cohort generation time weighted by the reproductive values of `G`:
    /// `v_G N w_G`.
    pub fn t_g(&self) -> MPMResult<f64> {
        self.parts("T_G")?;
        let t = self.cache.t_g.get_or_try_init(|| {
            let e = self.r0_elements()?;
            Ok(e.v_g.dot(&self.fundamental_matrix()?.dot(&e.w_g)))
        })?;
        Ok(*t)
    }

    /// Time for the population to grow by a factor `R0`: `ln R0 / ln λ`,
    /// extended by `T_a` at `λ = 1`.
    pub fn t_r0(&self) -> MPMResult<Defined<f64>> {
        self.parts("T_R0")?;
        let t = self.cache.t_r0.get_or_try_init(|| {
            let lmbd = self.lmbd()?;
            if self.options().tolerance.is_close(lmbd, 1.0) {
                return Ok(*self.t_a_entry()?);
            }
            Ok(Defined::Value(self.r0()?.ln() / lmbd.ln()))
        })?;
        Ok(self.report("T_R0", t).copied())
    }

    /// Mean age of mothers over all offspring of a cohort:
    /// `Σ G N F w / Σ G F w`.
    pub fn mu1(&self) -> MPMResult<Defined<f64>> {
        let (_, f) = self.parts("mu1")?;
        let mu = self.cache.mu1.get_or_try_init(|| {
            let g = self.next_generation_matrix()?;
            let n = self.fundamental_matrix()?;
            Ok(self.w_entry()?.as_ref().map(|w| {
                let fw = f.dot(w);
                g.dot(&n.dot(&fw)).sum() / g.dot(&fw).sum()
            }))
        })?;
        Ok(self.report("mu1", mu).copied())
    }
}

fn fertility_on_first_row(f: &Array2<f64>) -> bool {
    f.indexed_iter().all(|((i, _), &x)| i == 0 || x == 0.0)
}
