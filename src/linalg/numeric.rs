//! Scalar numeric helpers: integer gcd/lcm, entropy terms, Student-t quantile
//! and the bounded commensurability search.
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::population::{
    core::{options::SearchLimits, tolerance::Tolerance},
    errors::{MPMError, MPMResult},
};

pub fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

pub fn lcm(a: usize, b: usize) -> usize {
    if a == 0 || b == 0 {
        return 0;
    }
    a / gcd(a, b) * b
}

/// `p log₂ p` with the convention `0 log 0 = 0`.
#[inline]
pub fn xlog2x(p: f64) -> f64 {
    if p > 0.0 {
        p * p.log2()
    } else {
        0.0
    }
}

/// Two-sided 95% Student-t critical value `t_{0.975, dof}`.
///
/// Errors
/// ------
/// - [`MPMError::InvalidArgument`] if `dof == 0`.
pub fn student_t_975(dof: usize) -> MPMResult<f64> {
    let dist = StudentsT::new(0.0, 1.0, dof as f64).map_err(|e| MPMError::InvalidArgument {
        name: "dof",
        reason: e.to_string(),
    })?;
    Ok(dist.inverse_cdf(0.975))
}

/// Smallest value `T` such that `T ≈ k_i P_i` for every period `P_i`, with
/// integers `1 ≤ k_i ≤ k_max`.
///
/// Parameters
/// ----------
/// - `periods`: `&[f64]`
///   Distinct positive periods.
/// - `tol`: `&Tolerance`
///   Closeness used to compare each `k_i P_i` to the mean of the tuple.
/// - `limits`: `&SearchLimits`
///   `k_max = max(1, min(floor(max_tuples^(1/q)), max_multiplier))` with
///   `q = periods.len()`.
///
/// Returns
/// -------
/// `Option<f64>`
///   `None` when no tuple within the caps is commensurable.
///
/// Notes
/// -----
/// - Rather than enumerating the full product `[1, k_max]^q`, the first
///   multiplier is enumerated and every other `k_i` is taken as the nearest
///   integer to `T / P_i`; a tuple is accepted only if all `k_i P_i` are
///   close to their mean, so the accepted set is the same.
pub fn smallest_common_period(
    periods: &[f64], tol: &Tolerance, limits: &SearchLimits,
) -> Option<f64> {
    let q = periods.len();
    if q == 0 {
        return None;
    }
    let by_budget = (limits.max_tuples as f64).powf(1.0 / q as f64).floor() as usize;
    let k_max = by_budget.min(limits.max_multiplier).max(1);

    let mut best: Option<f64> = None;
    for k0 in 1..=k_max {
        let target = k0 as f64 * periods[0];
        let mut values = Vec::with_capacity(q);
        values.push(target);
        let mut feasible = true;
        for &p in &periods[1..] {
            let k = (target / p).round();
            if k < 1.0 || k > k_max as f64 {
                feasible = false;
                break;
            }
            values.push(k * p);
        }
        if !feasible {
            continue;
        }
        let mean = values.iter().sum::<f64>() / q as f64;
        if values.iter().all(|&x| tol.is_close(x, mean)) {
            best = Some(best.map_or(mean, |b: f64| b.min(mean)));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ---- Scope ----
    // These tests cover:
    // - gcd/lcm, the entropy convention, the t quantile and the
    //   commensurability search on commensurable and incommensurable inputs.

    #[test]
    // Purpose
    // -------
    // Integer helpers on small inputs.
    //
    // Given
    // -----
    // - gcd(12, 18), lcm(4, 6), lcm(0, 3).
    //
    // Expect
    // ------
    // - 6, 12, 0.
    fn gcd_and_lcm() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(lcm(4, 6), 12);
        assert_eq!(lcm(0, 3), 0);
    }

    #[test]
    // Purpose
    // -------
    // `0 log 0` contributes nothing; `½ log₂ ½ = −½`.
    //
    // Given
    // -----
    // - p = 0 and p = 0.5.
    //
    // Expect
    // ------
    // - 0 and −0.5.
    fn entropy_term_convention() {
        assert_eq!(xlog2x(0.0), 0.0);
        assert_relative_eq!(xlog2x(0.5), -0.5, epsilon = 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // Critical values match tables.
    //
    // Given
    // -----
    // - dof = 1 and dof = 10.
    //
    // Expect
    // ------
    // - 12.706 and 2.228 (three decimals).
    fn student_t_matches_table() {
        assert_relative_eq!(student_t_975(1).unwrap(), 12.706, epsilon = 1e-3);
        assert_relative_eq!(student_t_975(10).unwrap(), 2.228, epsilon = 1e-3);
        assert!(student_t_975(0).is_err());
    }

    #[test]
    // Purpose
    // -------
    // Commensurable periods have a smallest common multiple.
    //
    // Given
    // -----
    // - Periods 3, 4 and 6.
    //
    // Expect
    // ------
    // - 12.
    fn commensurable_periods() {
        // Act
        let t = smallest_common_period(
            &[3.0, 4.0, 6.0],
            &Tolerance::default(),
            &SearchLimits::default(),
        );

        // Assert
        assert_relative_eq!(t.unwrap(), 12.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Incommensurable periods exhaust the bounded search.
    //
    // Given
    // -----
    // - Periods 1 and √2 with tight caps.
    //
    // Expect
    // ------
    // - `None`.
    fn incommensurable_periods() {
        // Arrange
        let limits = SearchLimits { max_multiplier: 50, ..SearchLimits::default() };

        // Act
        let t = smallest_common_period(&[1.0, 2f64.sqrt()], &Tolerance::default(), &limits);

        // Assert
        assert!(t.is_none());
    }
}
