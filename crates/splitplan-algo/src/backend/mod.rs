//! Solver backends for the placement model.
//!
//! Each backend consumes a [`MilpProblem`] by reference and reports a
//! [`SolveOutcome`]. The problem is never modified, so one artifact can be
//! handed to several backends.

mod clarabel;
mod exhaustive;

#[cfg(feature = "solver-highs")]
mod highs;

pub use clarabel::ClarabelRelaxation;
pub use exhaustive::ExhaustiveBackend;

#[cfg(feature = "solver-highs")]
pub use highs::HighsBackend;

use splitplan_solver_common::good_lp::variable::UnsolvedProblem;
use splitplan_solver_common::good_lp::{Solution, Variable};
use splitplan_solver_common::{MilpProblem, Sense, SolveLimits, SolveOutcome, SolverError, SolverResult};
use std::collections::HashMap;

/// A solving engine that can answer a placement problem.
pub trait PlacementBackend: Send + Sync {
    /// Unique identifier ("highs", "exhaustive", "clarabel")
    fn id(&self) -> &str;

    /// Check if this backend was compiled in and can run
    fn is_available(&self) -> bool;

    /// Solve the problem under the given limits
    fn solve(&self, problem: &MilpProblem, limits: &SolveLimits) -> SolverResult<SolveOutcome>;
}

/// Look a backend up by its identifier.
pub fn backend_by_id(id: &str, max_combinations: u64) -> SolverResult<Box<dyn PlacementBackend>> {
    match id {
        "exhaustive" => Ok(Box::new(ExhaustiveBackend::new(max_combinations))),
        "clarabel" => Ok(Box::new(ClarabelRelaxation)),
        #[cfg(feature = "solver-highs")]
        "highs" => Ok(Box::new(HighsBackend)),
        #[cfg(not(feature = "solver-highs"))]
        "highs" => Err(SolverError::Unavailable(
            "highs (build with the solver-highs feature)".to_string(),
        )),
        other => Err(SolverError::Unavailable(other.to_string())),
    }
}

/// `good_lp` problem carrying the declared variables and objective.
pub(crate) fn unsolved(problem: &MilpProblem, relax: bool) -> SolverResult<UnsolvedProblem> {
    let vars = problem.variable_registry(relax)?;
    let objective = problem.objective().clone();
    Ok(match problem.sense() {
        Sense::Maximize => vars.maximise(objective),
        Sense::Minimize => vars.minimise(objective),
    })
}

/// Values of every declared variable in `solution`.
pub(crate) fn read_values(problem: &MilpProblem, solution: &impl Solution) -> HashMap<Variable, f64> {
    problem
        .variables()
        .iter()
        .map(|info| (info.var, solution.value(info.var)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_is_object_safe() {
        fn _accepts_backend(_b: &dyn PlacementBackend) {}
    }

    #[test]
    fn test_backend_is_send_sync() {
        fn _assert_send<T: Send>() {}
        fn _assert_sync<T: Sync>() {}
        _assert_send::<Box<dyn PlacementBackend>>();
        _assert_sync::<Box<dyn PlacementBackend>>();
    }

    #[test]
    fn test_lookup_by_id() {
        assert_eq!(backend_by_id("exhaustive", 10).unwrap().id(), "exhaustive");
        assert_eq!(backend_by_id("clarabel", 10).unwrap().id(), "clarabel");
        assert!(matches!(
            backend_by_id("cplex", 10),
            Err(SolverError::Unavailable(_))
        ));
    }

    #[cfg(not(feature = "solver-highs"))]
    #[test]
    fn test_highs_needs_feature() {
        assert!(matches!(
            backend_by_id("highs", 10),
            Err(SolverError::Unavailable(_))
        ));
    }
}
