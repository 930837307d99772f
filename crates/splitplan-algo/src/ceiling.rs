//! Ceiling linearization.
//!
//! An integer activation `a ∈ [0, 1]` is tied to a nonnegative linear
//! quantity `q` (already divided by its normalizer) with
//!
//! ```text
//! a − q ≥ 0
//! a − q ≤ 1 − ε
//! ```
//!
//! For `q = 0` only `a = 0` fits; for `ε ≤ q ≤ 1` only `a = 1` fits. `ε` must
//! not exceed the smallest positive value `q` can take, otherwise a small
//! positive `q` admits no integer `a` at all.

use splitplan_solver_common::good_lp::{Expression, Variable};
use splitplan_solver_common::{LinearConstraint, MilpProblem};

const LAW_TOLERANCE: f64 = 1e-9;

/// Add both ceiling constraints for `activation` and record the link.
pub fn add_ceiling(
    problem: &mut MilpProblem,
    label: &str,
    activation: Variable,
    quantity: Expression,
    epsilon: f64,
) {
    let gap = Expression::from(activation) - quantity.clone();
    problem.add_constraint(LinearConstraint::ge(
        format!("low_ceil_{}", label),
        gap.clone(),
        0.0,
    ));
    problem.add_constraint(LinearConstraint::le(
        format!("high_ceil_{}", label),
        gap,
        1.0 - epsilon,
    ));
    problem.annotate_ceiling(activation, quantity);
}

/// Tolerance for a count normalized by `m`: `1/m`.
pub fn count_epsilon(m: usize) -> f64 {
    1.0 / m.max(1) as f64
}

/// Tolerance for a load fraction: `min(1/m, smallest positive load term / capacity)`.
///
/// Stricter than [`count_epsilon`] because a load fraction is not a multiple
/// of `1/m`, and a positive load below `1/m` must still force the unit on.
pub fn load_epsilon(m: usize, min_positive_term: Option<f64>, capacity: f64) -> f64 {
    let base = count_epsilon(m);
    match min_positive_term {
        Some(term) if capacity > 0.0 => base.min(term / capacity),
        _ => base,
    }
}

/// Integer values of `a` in `[0, upper]` admitted for quantity `q`.
pub fn feasible_activations(q: f64, epsilon: f64, upper: i32) -> Vec<i32> {
    (0..=upper)
        .filter(|&a| {
            let gap = a as f64 - q;
            gap >= -LAW_TOLERANCE && gap <= 1.0 - epsilon + LAW_TOLERANCE
        })
        .collect()
}

/// Value the ceiling law forces for `q` (`None` when nothing fits).
pub fn forced_activation(q: f64, epsilon: f64, upper: i32) -> Option<i32> {
    match feasible_activations(q, epsilon, upper).as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}
