//! Structural classification of the projection matrix.
//!
//! Purpose
//! -------
//! Cache the combinatorial and tolerance-aware classification of `A`:
//! irreducibility, irreducible components, normal form, periods, index of
//! imprimitivity, primitivity and the "quasi" variants that only look at the
//! dominant part of the spectrum.
//!
//! Key behaviors
//! -------------
//! - Purely combinatorial descriptors delegate to [`crate::linalg::graph`].
//! - A component is *dominant* when its spectral radius is close to λ under
//!   the model's tolerance. Zero dominant components contradicts the
//!   Perron–Frobenius theory and is reported as
//!   [`MPMError::UnexpectedMathError`], never as `false`.
//! - The index of imprimitivity is the common period when every class on a
//!   cycle shares one; otherwise the lcm of the periods of the dominant
//!   components.
//!
//! Testing notes
//! -------------
//! - Unit tests cover a reducible model with a dominant 2-cycle, a
//!   quasi-primitive reducible model, and a matrix without cycles.
use std::collections::BTreeSet;

use ndarray::Array2;

use crate::{
    linalg::{eigen::spectral_radius, graph, numeric::lcm},
    population::{
        core::descriptor::{Caveat, Defined},
        errors::{MPMError, MPMResult},
        models::mpm::MatrixPopulationModel,
    },
};

/// Irreducible components of `A` in topological order.
#[derive(Debug, Clone, PartialEq)]
pub struct IrreducibleComponents {
    /// Principal submatrix of each component.
    pub submatrices: Vec<Array2<f64>>,
    /// Classes of each component, sorted.
    pub classes: Vec<Vec<usize>>,
}

/// Block lower-triangular reordering of `A`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalForm {
    pub matrix: Array2<f64>,
    /// `matrix[i, j] = A[permutation[i], permutation[j]]`.
    pub permutation: Vec<usize>,
}

impl MatrixPopulationModel {
    /// Whether the life-cycle graph of `A` is strongly connected.
    pub fn irreducible(&self) -> bool {
        *self.cache.irreducible.get_or_init(|| graph::is_irreducible(self.a()))
    }

    /// Irreducible components (single classes without a self-loop are
    /// dropped).
    pub fn irreducible_components(&self) -> &IrreducibleComponents {
        self.cache.irreducible_components.get_or_init(|| {
            let (submatrices, classes) = graph::irreducible_components(self.a());
            IrreducibleComponents { submatrices, classes }
        })
    }

    /// Normal form of `A` and its permutation.
    pub fn normal_form(&self) -> &NormalForm {
        self.cache.normal_form.get_or_init(|| {
            let (matrix, permutation) = graph::normal_form(self.a());
            NormalForm { matrix, permutation }
        })
    }

    /// Period of each class; `None` for classes on no cycle.
    pub fn periods(&self) -> &[Option<usize>] {
        self.cache.periods.get_or_init(|| graph::periods(self.a()))
    }

    /// Whether `A` is primitive (irreducible and aperiodic).
    pub fn primitive(&self) -> bool {
        *self.cache.primitive.get_or_init(|| graph::is_primitive(self.a()))
    }

    fn component_radii(&self) -> MPMResult<&[f64]> {
        let radii = self.cache.component_radii.get_or_try_init(|| {
            let max_niter = self.options().limits.max_qr_iterations;
            self.irreducible_components()
                .submatrices
                .iter()
                .map(|block| spectral_radius(block, max_niter))
                .collect()
        })?;
        Ok(radii)
    }

    /// Indices (into `irreducible_components`) of the dominant components.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::UnexpectedMathError`] if no component reaches λ.
    pub fn dominant_components(&self) -> MPMResult<Vec<usize>> {
        let lmbd = self.lmbd()?;
        let tol = self.options().tolerance;
        let dominant: Vec<usize> = self
            .component_radii()?
            .iter()
            .enumerate()
            .filter(|(_, r)| tol.is_close(**r, lmbd))
            .map(|(i, _)| i)
            .collect();
        if dominant.is_empty() {
            return Err(MPMError::unexpected(
                "no dominant component found; the spectral radius of A matches none of its \
                 irreducible components",
            ));
        }
        Ok(dominant)
    }

    fn index_of_imprimitivity_entry(&self) -> MPMResult<&Defined<usize>> {
        self.cache.index_of_imprimitivity.get_or_try_init(|| {
            let distinct: BTreeSet<usize> = self.periods().iter().flatten().copied().collect();
            if distinct.is_empty() {
                return Ok(Defined::Undefined(Caveat::NoCycles));
            }
            let dominant = self.dominant_components()?;
            if let (1, Some(&period)) = (distinct.len(), distinct.first()) {
                return Ok(Defined::Value(period));
            }
            let components = self.irreducible_components();
            let periods = self.periods();
            let index = dominant
                .into_iter()
                .filter_map(|c| periods[components.classes[c][0]])
                .fold(1, lcm);
            Ok(Defined::Value(index))
        })
    }

    /// Index of imprimitivity (the period of `A`).
    ///
    /// Returns
    /// -------
    /// `Defined::Undefined(Caveat::NoCycles)` when the life-cycle graph has
    /// no cycle.
    pub fn index_of_imprimitivity(&self) -> MPMResult<Defined<usize>> {
        let entry = self.index_of_imprimitivity_entry()?;
        Ok(self.report("index_of_imprimitivity", entry).copied())
    }

    /// Whether the index of imprimitivity is 1.
    pub fn aperiodic(&self) -> MPMResult<bool> {
        Ok(matches!(self.index_of_imprimitivity_entry()?, Defined::Value(1)))
    }

    /// Whether exactly one irreducible component is dominant.
    pub fn quasi_irreducible(&self) -> MPMResult<bool> {
        let q = self
            .cache
            .quasi_irreducible
            .get_or_try_init(|| Ok(self.dominant_components()?.len() == 1))?;
        Ok(*q)
    }

    /// Whether λ is strictly larger in modulus than every other eigenvalue.
    pub fn quasi_primitive(&self) -> MPMResult<bool> {
        let q = self.cache.quasi_primitive.get_or_try_init(|| {
            if self.dim() == 1 {
                return Ok(self.a()[[0, 0]] != 0.0);
            }
            let values = &self.eigen_elements()?.values;
            Ok(!self.options().tolerance.is_close(values[0].norm(), values[1].norm()))
        })?;
        Ok(*q)
    }
}
