//! Exhaustive reference search for small instances.
//!
//! Walks every combination of one member per choice group. Activations tied
//! to a quantity by a ceiling annotation are set to the ceiling of that
//! quantity; every other variable not in a choice group reads zero. Each
//! assignment is then checked against the full constraint list.

use super::PlacementBackend;
use splitplan_solver_common::good_lp::Variable;
use splitplan_solver_common::{
    MilpProblem, Sense, SolveLimits, SolveOutcome, SolveStatus, SolverError, SolverResult,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const CHECK_TOLERANCE: f64 = 1e-7;

/// Brute-force backend. Ties keep the first assignment found.
#[derive(Debug, Clone, Copy)]
pub struct ExhaustiveBackend {
    max_combinations: u64,
}

impl ExhaustiveBackend {
    pub fn new(max_combinations: u64) -> Self {
        Self { max_combinations }
    }

    pub fn max_combinations(&self) -> u64 {
        self.max_combinations
    }

    fn combinations(&self, problem: &MilpProblem) -> SolverResult<u64> {
        let mut total: u64 = 1;
        for group in problem.choice_groups() {
            total = total
                .checked_mul(group.members.len() as u64)
                .filter(|&n| n <= self.max_combinations)
                .ok_or_else(|| SolverError::ProblemTooLarge {
                    backend: self.id().to_string(),
                    message: format!(
                        "more than {} combinations over {} choice groups",
                        self.max_combinations,
                        problem.choice_groups().len()
                    ),
                })?;
        }
        Ok(total)
    }
}

impl Default for ExhaustiveBackend {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

impl PlacementBackend for ExhaustiveBackend {
    fn id(&self) -> &str {
        "exhaustive"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn solve(&self, problem: &MilpProblem, limits: &SolveLimits) -> SolverResult<SolveOutcome> {
        let start = Instant::now();
        let total = self.combinations(problem)?;
        let groups = problem.choice_groups();
        let deadline =
            Duration::try_from_secs_f64(limits.time_limit_seconds.max(0.0)).unwrap_or(Duration::MAX);

        if groups.iter().any(|g| g.members.is_empty()) {
            return Ok(SolveOutcome::infeasible(start.elapsed()));
        }

        let mut odometer = vec![0usize; groups.len()];
        let mut best: Option<(f64, HashMap<Variable, f64>)> = None;
        let mut visited: u64 = 0;

        loop {
            if start.elapsed() > deadline {
                tracing::warn!(visited, total, "exhaustive search hit the time limit");
                return Ok(match best {
                    Some((objective, values)) => SolveOutcome {
                        status: SolveStatus::Feasible,
                        objective,
                        mip_gap: None,
                        solve_time: start.elapsed(),
                        values,
                    },
                    None => SolveOutcome::timeout(start.elapsed()),
                });
            }

            let mut values: HashMap<Variable, f64> = HashMap::new();
            for (group, &pick) in groups.iter().zip(&odometer) {
                values.insert(group.members[pick], 1.0);
            }
            let mut values = problem.complete(&values);
            for link in problem.ceilings() {
                let q = link.quantity.eval_with(&values);
                values.insert(link.activation, (q - CHECK_TOLERANCE).ceil().max(0.0));
            }
            visited += 1;

            if problem.is_feasible(&values, CHECK_TOLERANCE) {
                let objective = problem.evaluate(&values);
                let improves = match (&best, problem.sense()) {
                    (None, _) => true,
                    (Some((current, _)), Sense::Maximize) => objective > *current + CHECK_TOLERANCE,
                    (Some((current, _)), Sense::Minimize) => objective < *current - CHECK_TOLERANCE,
                };
                if improves {
                    best = Some((objective, values));
                }
            }

            if !advance(&mut odometer, groups.iter().map(|g| g.members.len())) {
                break;
            }
        }

        tracing::debug!(visited, total, "exhaustive search complete");
        Ok(match best {
            Some((objective, values)) => SolveOutcome {
                status: SolveStatus::Optimal,
                objective,
                mip_gap: Some(0.0),
                solve_time: start.elapsed(),
                values,
            },
            None => SolveOutcome::infeasible(start.elapsed()),
        })
    }
}

/// Step the odometer; `false` once every position wrapped around.
fn advance(odometer: &mut [usize], radices: impl Iterator<Item = usize>) -> bool {
    for (digit, radix) in odometer.iter_mut().zip(radices) {
        *digit += 1;
        if *digit < radix {
            return true;
        }
        *digit = 0;
    }
    false
}
