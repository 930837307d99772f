//! LP relaxation through Clarabel.
//!
//! Clarabel has no integer support, so every binary and integer variable is
//! relaxed to its bounds. When the relaxed optimum happens to be integral it
//! is also optimal for the placement problem; otherwise the backend fails and
//! [`ClarabelRelaxation::bound`] still gives the relaxation objective.

use super::{read_values, unsolved, PlacementBackend};
use splitplan_solver_common::good_lp::solvers::clarabel::clarabel;
use splitplan_solver_common::good_lp::{Solution, SolverModel, Variable};
use splitplan_solver_common::{
    MilpProblem, SolveLimits, SolveOutcome, SolveStatus, SolverError, SolverResult, VariableKind,
};
use std::collections::HashMap;
use std::time::Instant;

const INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// Clarabel interior-point backend over the continuous relaxation.
pub struct ClarabelRelaxation;

impl ClarabelRelaxation {
    fn solve_relaxed(&self, problem: &MilpProblem) -> SolverResult<(f64, HashMap<Variable, f64>)> {
        let mut model = unsolved(problem, true)?.using(clarabel);
        for c in problem.constraints() {
            model = model.with(c.to_constraint());
        }
        let solution = model.solve()?;
        let objective = solution.eval(problem.objective().clone());
        Ok((objective, read_values(problem, &solution)))
    }

    /// Objective of the relaxation: an upper bound when maximizing, a lower
    /// bound when minimizing.
    pub fn bound(&self, problem: &MilpProblem) -> SolverResult<f64> {
        self.solve_relaxed(problem).map(|(objective, _)| objective)
    }
}

impl PlacementBackend for ClarabelRelaxation {
    fn id(&self) -> &str {
        "clarabel"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn solve(&self, problem: &MilpProblem, _limits: &SolveLimits) -> SolverResult<SolveOutcome> {
        let start = Instant::now();
        let (objective, values) = match self.solve_relaxed(problem) {
            Ok(relaxed) => relaxed,
            Err(SolverError::Infeasible(_)) => return Ok(SolveOutcome::infeasible(start.elapsed())),
            Err(e) => return Err(e),
        };

        let rounded: HashMap<Variable, f64> = values
            .iter()
            .map(|(var, v)| {
                let integral = problem
                    .variable_info(*var)
                    .map_or(false, |info| info.kind != VariableKind::Continuous);
                (*var, if integral { v.round() } else { *v })
            })
            .collect();
        let fractional = values
            .iter()
            .any(|(var, v)| (v - rounded[var]).abs() > INTEGRALITY_TOLERANCE);
        if fractional {
            return Err(SolverError::Failed(format!(
                "relaxation is fractional (bound {:.6})",
                objective
            )));
        }
        if let Some(violation) = problem.first_violation(&rounded, INTEGRALITY_TOLERANCE) {
            return Err(SolverError::Failed(format!(
                "rounded relaxation infeasible: {}",
                violation
            )));
        }

        Ok(SolveOutcome {
            status: SolveStatus::Optimal,
            objective: problem.evaluate(&rounded),
            mip_gap: Some(0.0),
            solve_time: start.elapsed(),
            values: rounded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitplan_solver_common::good_lp::Expression;
    use splitplan_solver_common::{LinearConstraint, Sense};

    #[test]
    fn test_integral_relaxation_is_accepted() {
        let mut p = MilpProblem::new();
        let a = p.add_binary("a");
        let b = p.add_binary("b");
        p.add_choice_group("pick", vec![a, b]);
        p.set_objective(Expression::from(a) * 2.0 + b, Sense::Maximize);

        let outcome = ClarabelRelaxation.solve(&p, &SolveLimits::default()).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert_eq!(outcome.value(a), 1.0);
        assert_eq!(outcome.value(b), 0.0);
        assert!((outcome.objective - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_bound_of_fractional_problem() {
        let mut p = MilpProblem::new();
        let a = p.add_binary("a");
        let b = p.add_binary("b");
        p.add_constraint(LinearConstraint::le("half", Expression::from(a) * 2.0 + b * 2.0, 1.0));
        p.set_objective(Expression::from(a) + b, Sense::Maximize);

        let bound = ClarabelRelaxation.bound(&p).unwrap();
        assert!((bound - 0.5).abs() < 1e-6);
        assert!(ClarabelRelaxation.solve(&p, &SolveLimits::default()).is_err());
    }
}
