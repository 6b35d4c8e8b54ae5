//! Descriptor cache primitives: write-once cells and tagged "undefined"
//! results.
//!
//! Purpose
//! -------
//! Give every derived quantity of a model a named, lazily evaluated,
//! write-once slot, and give quantities that can be mathematically undefined a
//! typed representation instead of NaN-filled arrays.
//!
//! Key behaviors
//! -------------
//! - [`Descriptor<T>`] evaluates its routine on first read and returns the
//!   same reference on every later read. A routine that fails leaves the slot
//!   uninitialized and hands the error to the caller; a later read retries.
//! - [`Defined<T>`] is `Value(T)` or `Undefined(Caveat)`; the [`Caveat`] says
//!   why the descriptor does not exist for this model.
//!
//! Invariants & assumptions
//! ------------------------
//! - A descriptor moves from `Uninitialized` to `Value` at most once and never
//!   changes afterwards.
//! - Slots are backed by `std::cell::OnceCell`, so a model is `!Sync`: the
//!   cache is single-threaded and callers sharing a model across threads must
//!   synchronise externally.
//! - Routines must not read their own slot (a dependency cycle would panic in
//!   `OnceCell`); descriptor dependencies form a DAG.
//!
//! Testing notes
//! -------------
//! - Unit tests check single evaluation, pointer identity across reads, and
//!   that failures are not cached.
use std::cell::OnceCell;
use std::fmt;

use crate::population::errors::MPMResult;

/// Observable state of a [`Descriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorState {
    Uninitialized,
    Value,
}

/// Named write-once slot for a derived quantity.
pub struct Descriptor<T> {
    name: &'static str,
    cell: OnceCell<T>,
}

impl<T> Descriptor<T> {
    pub const fn new(name: &'static str) -> Self {
        Descriptor { name, cell: OnceCell::new() }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> DescriptorState {
        match self.cell.get() {
            Some(_) => DescriptorState::Value,
            None => DescriptorState::Uninitialized,
        }
    }

    /// Read the slot, evaluating an infallible routine on first access.
    pub fn get_or_init(&self, compute: impl FnOnce() -> T) -> &T {
        self.cell.get_or_init(|| {
            tracing::trace!(descriptor = self.name, "computing descriptor");
            compute()
        })
    }

    /// Read the slot, evaluating a fallible routine on first access.
    ///
    /// Errors
    /// ------
    /// - Whatever `compute` returns; the slot stays uninitialized.
    pub fn get_or_try_init(&self, compute: impl FnOnce() -> MPMResult<T>) -> MPMResult<&T> {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        tracing::trace!(descriptor = self.name, "computing descriptor");
        match compute() {
            Ok(value) => Ok(self.cell.get_or_init(|| value)),
            Err(err) => {
                tracing::debug!(descriptor = self.name, error = %err, "descriptor failed");
                Err(err)
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Descriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor").field("name", &self.name).field("value", &self.cell.get()).finish()
    }
}

/// Why a descriptor is undefined for a given model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Caveat {
    /// `A` is not quasi-primitive; the stable distribution and reproductive
    /// values are ill-defined.
    NotQuasiPrimitive,
    /// `A` is not quasi-irreducible; sensitivities are ill-defined.
    NotQuasiIrreducible,
    /// The support graph of `A` has no cycle.
    NoCycles,
    /// No subdominant eigenvalue with a non-zero phase.
    NoSecondOrderOscillations,
    /// Survival alone can sustain growth, so no survival excess exists.
    SurvivalExcessUndefined,
    /// Total fertility is zero, so quantities normalised by it do not exist.
    NoReproduction,
}

impl fmt::Display for Caveat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caveat::NotQuasiPrimitive => {
                write!(f, "A is not quasi-primitive. Most descriptors are ill-defined.")
            }
            Caveat::NotQuasiIrreducible => write!(f, "A is not quasi-irreducible."),
            Caveat::NoCycles => write!(f, "Matrix has no cycles."),
            Caveat::NoSecondOrderOscillations => {
                write!(f, "No second-order oscillations.")
            }
            Caveat::SurvivalExcessUndefined => {
                write!(f, "The survival excess is not defined for this model.")
            }
            Caveat::NoReproduction => write!(f, "The model has no reproduction."),
        }
    }
}

/// A value that may be mathematically undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Defined<T> {
    Value(T),
    Undefined(Caveat),
}

impl<T> Defined<T> {
    pub fn as_ref(&self) -> Defined<&T> {
        match self {
            Defined::Value(v) => Defined::Value(v),
            Defined::Undefined(c) => Defined::Undefined(*c),
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Defined::Value(_))
    }

    /// The value, discarding the caveat.
    pub fn value(self) -> Option<T> {
        match self {
            Defined::Value(v) => Some(v),
            Defined::Undefined(_) => None,
        }
    }

    pub fn caveat(&self) -> Option<Caveat> {
        match self {
            Defined::Value(_) => None,
            Defined::Undefined(c) => Some(*c),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Defined<U> {
        match self {
            Defined::Value(v) => Defined::Value(f(v)),
            Defined::Undefined(c) => Defined::Undefined(c),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Defined<U>) -> Defined<U> {
        match self {
            Defined::Value(v) => f(v),
            Defined::Undefined(c) => Defined::Undefined(c),
        }
    }

    /// Fallible map; the error short-circuits, the caveat passes through.
    pub fn try_map<U>(self, f: impl FnOnce(T) -> MPMResult<U>) -> MPMResult<Defined<U>> {
        match self {
            Defined::Value(v) => Ok(Defined::Value(f(v)?)),
            Defined::Undefined(c) => Ok(Defined::Undefined(c)),
        }
    }

    /// Fallible `and_then`.
    pub fn try_and_then<U>(
        self, f: impl FnOnce(T) -> MPMResult<Defined<U>>,
    ) -> MPMResult<Defined<U>> {
        match self {
            Defined::Value(v) => f(v),
            Defined::Undefined(c) => Ok(Defined::Undefined(c)),
        }
    }

    /// Pair two values; the first caveat wins.
    pub fn zip<U>(self, other: Defined<U>) -> Defined<(T, U)> {
        match (self, other) {
            (Defined::Value(a), Defined::Value(b)) => Defined::Value((a, b)),
            (Defined::Undefined(c), _) | (_, Defined::Undefined(c)) => Defined::Undefined(c),
        }
    }
}

impl<T: Clone> Defined<&T> {
    pub fn cloned(self) -> Defined<T> {
        self.map(T::clone)
    }
}

impl<T: Copy> Defined<&T> {
    pub fn copied(self) -> Defined<T> {
        self.map(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::errors::MPMError;
    use std::cell::Cell;

    // ---- Scope ----
    // These tests cover:
    // - Single evaluation and reference identity of `Descriptor`.
    // - Failures leaving the slot uninitialized.
    // - `Defined` combinators.

    #[test]
    // Purpose
    // -------
    // The routine runs once and later reads hand back the same storage.
    //
    // Given
    // -----
    // - A descriptor read twice with a counting routine.
    //
    // Expect
    // ------
    // - One evaluation, pointer-equal references, state `Value`.
    fn descriptor_evaluates_once_and_returns_same_reference() {
        // Arrange
        let calls = Cell::new(0);
        let d: Descriptor<Vec<f64>> = Descriptor::new("w");

        // Act
        let first = d
            .get_or_try_init(|| {
                calls.set(calls.get() + 1);
                Ok(vec![0.6, 0.4])
            })
            .unwrap();
        let second = d
            .get_or_try_init(|| {
                calls.set(calls.get() + 1);
                Ok(vec![0.0])
            })
            .unwrap();

        // Assert
        assert_eq!(calls.get(), 1);
        assert!(std::ptr::eq(first, second));
        assert_eq!(d.state(), DescriptorState::Value);
        assert_eq!(d.name(), "w");
    }

    #[test]
    // Purpose
    // -------
    // Errors are reported but not cached.
    //
    // Given
    // -----
    // - A first read that fails, then a read that succeeds.
    //
    // Expect
    // ------
    // - The error, state still `Uninitialized`, then the value.
    fn descriptor_failure_is_not_cached() {
        // Arrange
        let d: Descriptor<f64> = Descriptor::new("R0");

        // Act
        let err = d
            .get_or_try_init(|| Err(MPMError::CannotCompute { reason: "test".into() }))
            .unwrap_err();
        let state_after_failure = d.state();
        let value = *d.get_or_try_init(|| Ok(2.0)).unwrap();

        // Assert
        assert!(matches!(err, MPMError::CannotCompute { .. }));
        assert_eq!(state_after_failure, DescriptorState::Uninitialized);
        assert_eq!(value, 2.0);
    }

    #[test]
    // Purpose
    // -------
    // `Defined` propagates the first caveat.
    //
    // Given
    // -----
    // - A value zipped with an undefined result.
    //
    // Expect
    // ------
    // - The undefined caveat survives `zip` and `map`.
    fn defined_combinators_propagate_caveats() {
        // Arrange
        let a: Defined<f64> = Defined::Value(1.0);
        let b: Defined<f64> = Defined::Undefined(Caveat::NotQuasiPrimitive);

        // Act
        let zipped = a.zip(b).map(|(x, y)| x + y);

        // Assert
        assert_eq!(zipped, Defined::Undefined(Caveat::NotQuasiPrimitive));
        assert_eq!(a.map(|x| x * 2.0).value(), Some(2.0));
        assert!(!zipped.is_defined());
    }
}
