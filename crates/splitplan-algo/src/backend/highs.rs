//! HiGHS branch-and-bound backend.
//!
//! The model is built through `good_lp` and then solved on the underlying
//! `highs::Model`, so the outcome status comes from HiGHS' own model status
//! rather than from the clock. The reported gap is certified against the
//! Clarabel relaxation bound.

use super::{unsolved, ClarabelRelaxation, PlacementBackend};
use highs::HighsModelStatus;
use splitplan_solver_common::good_lp::solvers::highs::highs;
use splitplan_solver_common::good_lp::{SolverModel, Variable};
use splitplan_solver_common::{
    MilpProblem, SolveLimits, SolveOutcome, SolveStatus, SolverError, SolverResult,
};
use std::collections::HashMap;
use std::time::Instant;

const CHECK_TOLERANCE: f64 = 1e-6;
const GAP_FLOOR: f64 = 1e-9;

/// HiGHS MILP backend (requires the `solver-highs` feature).
pub struct HighsBackend;

impl PlacementBackend for HighsBackend {
    fn id(&self) -> &str {
        "highs"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn solve(&self, problem: &MilpProblem, limits: &SolveLimits) -> SolverResult<SolveOutcome> {
        let start = Instant::now();
        let mut model = unsolved(problem, false)?.using(highs);
        for c in problem.constraints() {
            model = model.with(c.to_constraint());
        }

        let mut inner = model.into_inner();
        inner.set_option("output_flag", false);
        inner.set_option("time_limit", limits.time_limit_seconds);
        inner.set_option("mip_rel_gap", limits.mip_gap);
        let solved = inner.solve();
        let model_status = solved.status();

        let solution = solved.get_solution();
        let columns = solution.columns();
        let values: HashMap<Variable, f64> = if columns.len() == problem.variables().len() {
            problem
                .variables()
                .iter()
                .zip(columns)
                .map(|(info, &v)| (info.var, v))
                .collect()
        } else {
            HashMap::new()
        };
        let violation = if values.is_empty() {
            Some("no primal solution".to_string())
        } else {
            problem.first_violation(&values, CHECK_TOLERANCE)
        };

        let status = outcome_status(model_status, violation.is_none()).map_err(SolverError::Failed)?;
        tracing::debug!(?model_status, %status, "HiGHS finished");
        match status {
            SolveStatus::Infeasible => return Ok(SolveOutcome::infeasible(start.elapsed())),
            SolveStatus::Timeout => {
                tracing::warn!(?model_status, "HiGHS stopped at a limit without an incumbent");
                return Ok(SolveOutcome::timeout(start.elapsed()));
            }
            SolveStatus::Optimal | SolveStatus::Feasible => {}
        }
        if let Some(violation) = violation {
            return Err(SolverError::Failed(format!(
                "HiGHS returned an infeasible point: {}",
                violation
            )));
        }

        let objective = problem.evaluate(&values);
        let relaxed_gap = match ClarabelRelaxation.bound(problem) {
            Ok(bound) => Some(relative_gap(objective, bound)),
            Err(e) => {
                tracing::debug!(error = %e, "relaxation bound unavailable");
                None
            }
        };
        let mip_gap = match status {
            SolveStatus::Optimal => Some(relaxed_gap.map_or(limits.mip_gap, |g| g.min(limits.mip_gap))),
            _ => relaxed_gap,
        };

        Ok(SolveOutcome {
            status,
            objective,
            mip_gap,
            solve_time: start.elapsed(),
            values,
        })
    }
}

/// Outcome status for a HiGHS model status. `has_incumbent` tells whether
/// the returned point satisfies every constraint.
fn outcome_status(status: HighsModelStatus, has_incumbent: bool) -> Result<SolveStatus, String> {
    match status {
        HighsModelStatus::Optimal => Ok(SolveStatus::Optimal),
        HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
            Ok(if has_incumbent {
                SolveStatus::Feasible
            } else {
                SolveStatus::Timeout
            })
        }
        HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => {
            Ok(SolveStatus::Infeasible)
        }
        other => Err(format!("HiGHS stopped with model status {:?}", other)),
    }
}

/// Relative distance between an incumbent objective and a relaxation bound.
fn relative_gap(objective: f64, bound: f64) -> f64 {
    (objective - bound).abs() / objective.abs().max(GAP_FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitplan_solver_common::good_lp::Expression;
    use splitplan_solver_common::{LinearConstraint, Sense};

    #[test]
    fn test_highs_backend_id() {
        assert_eq!(HighsBackend.id(), "highs");
        assert!(HighsBackend.is_available());
    }

    #[test]
    fn test_small_choice() {
        let mut p = MilpProblem::new();
        let a = p.add_binary("a");
        let b = p.add_binary("b");
        p.add_choice_group("pick", vec![a, b]);
        p.set_objective(Expression::from(a) + b * 4.0, Sense::Maximize);

        let outcome = HighsBackend.solve(&p, &SolveLimits::default()).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert!((outcome.value(b) - 1.0).abs() < 1e-6);
        assert!((outcome.objective - 4.0).abs() < 1e-6);
        let gap = outcome.mip_gap.unwrap();
        assert!(gap <= 1e-5, "integral relaxation should close the gap, got {}", gap);
    }

    /// Test that HiGHS model statuses map onto outcome statuses by what the
    /// engine reports, not by elapsed time.
    #[test]
    fn test_model_status_mapping() {
        assert_eq!(outcome_status(HighsModelStatus::Optimal, true), Ok(SolveStatus::Optimal));
        assert_eq!(
            outcome_status(HighsModelStatus::ReachedTimeLimit, true),
            Ok(SolveStatus::Feasible),
            "a limit with an incumbent is a feasible outcome"
        );
        assert_eq!(
            outcome_status(HighsModelStatus::ReachedTimeLimit, false),
            Ok(SolveStatus::Timeout),
            "a limit without an incumbent is a timeout"
        );
        assert_eq!(
            outcome_status(HighsModelStatus::ReachedIterationLimit, true),
            Ok(SolveStatus::Feasible)
        );
        assert_eq!(
            outcome_status(HighsModelStatus::ReachedIterationLimit, false),
            Ok(SolveStatus::Timeout)
        );
        assert_eq!(outcome_status(HighsModelStatus::Infeasible, false), Ok(SolveStatus::Infeasible));
        assert_eq!(
            outcome_status(HighsModelStatus::UnboundedOrInfeasible, false),
            Ok(SolveStatus::Infeasible)
        );
        assert!(
            outcome_status(HighsModelStatus::Unbounded, false).is_err(),
            "unbounded placement models are an engine failure"
        );
    }

    /// Test that the reported gap comes from the relaxation bound, not from
    /// the configured tolerance.
    #[test]
    fn test_gap_is_not_the_configured_tolerance() {
        let mut p = MilpProblem::new();
        let a = p.add_binary("a");
        let b = p.add_binary("b");
        p.add_constraint(LinearConstraint::le("half", Expression::from(a) * 2.0 + b * 2.0, 3.0));
        p.set_objective(Expression::from(a) + b, Sense::Maximize);

        let limits = SolveLimits {
            time_limit_seconds: 60.0,
            mip_gap: 0.9,
        };
        let outcome = HighsBackend.solve(&p, &limits).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert!((outcome.objective - 1.0).abs() < 1e-6);
        let gap = outcome.mip_gap.unwrap();
        assert!(
            (gap - 0.5).abs() < 1e-4,
            "relaxation bound 1.5 against incumbent 1.0 gives 0.5 rather than the 0.9 tolerance, got {}",
            gap
        );

        let tight = SolveLimits {
            time_limit_seconds: 60.0,
            mip_gap: 1e-4,
        };
        let outcome = HighsBackend.solve(&p, &tight).unwrap();
        let gap = outcome.mip_gap.unwrap();
        assert!(gap <= 1e-4, "proven optimum keeps the gap within tolerance, got {}", gap);
    }

    /// Test that an infeasible model is reported as an infeasible outcome.
    #[test]
    fn test_infeasible_model_status() {
        let mut p = MilpProblem::new();
        let a = p.add_binary("a");
        p.add_constraint(LinearConstraint::ge("too_much", Expression::from(a), 2.0));
        p.set_objective(Expression::from(a), Sense::Maximize);

        let outcome = HighsBackend.solve(&p, &SolveLimits::default()).unwrap();
        assert_eq!(outcome.status, SolveStatus::Infeasible, "status was {}", outcome.status);
    }

    #[test]
    fn test_relative_gap() {
        assert_eq!(relative_gap(2.0, 2.0), 0.0);
        assert!((relative_gap(4.0, 5.0) - 0.25).abs() < 1e-12);
        assert!((relative_gap(-4.0, -5.0) - 0.25).abs() < 1e-12);
    }
}
