//! Solve limits and outcomes returned across the solver boundary.

use crate::error::SolverError;
use good_lp::Variable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Limits passed to the solving engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveLimits {
    /// Wall-clock limit (seconds)
    pub time_limit_seconds: f64,
    /// Relative MIP gap at which the engine may stop
    pub mip_gap: f64,
}

impl Default for SolveLimits {
    fn default() -> Self {
        Self {
            time_limit_seconds: 1800.0,
            mip_gap: 1e-5,
        }
    }
}

/// Status reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Proven optimal within the gap tolerance.
    Optimal,
    /// Incumbent found; optimality not proven.
    Feasible,
    /// No assignment satisfies the constraints.
    Infeasible,
    /// Time limit hit before any incumbent.
    Timeout,
}

impl SolveStatus {
    /// Whether the outcome carries usable variable values.
    pub fn has_solution(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::Feasible => write!(f, "feasible"),
            SolveStatus::Infeasible => write!(f, "infeasible"),
            SolveStatus::Timeout => write!(f, "timeout"),
        }
    }
}

/// Raw result of one solve.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub objective: f64,
    /// Upper bound on the relative gap, when the engine can certify one
    pub mip_gap: Option<f64>,
    pub solve_time: Duration,
    pub values: HashMap<Variable, f64>,
}

impl SolveOutcome {
    pub fn infeasible(solve_time: Duration) -> Self {
        Self {
            status: SolveStatus::Infeasible,
            objective: f64::NAN,
            mip_gap: None,
            solve_time,
            values: HashMap::new(),
        }
    }

    pub fn timeout(solve_time: Duration) -> Self {
        Self {
            status: SolveStatus::Timeout,
            objective: f64::NAN,
            mip_gap: None,
            solve_time,
            values: HashMap::new(),
        }
    }

    /// Value of `var`; variables the engine did not report read as zero.
    pub fn value(&self, var: Variable) -> f64 {
        self.values.get(&var).copied().unwrap_or(0.0)
    }

    /// Keep outcomes that carry a solution, turn the rest into errors.
    pub fn into_accepted(self) -> Result<Self, SolverError> {
        match self.status {
            SolveStatus::Optimal | SolveStatus::Feasible => Ok(self),
            SolveStatus::Infeasible => Err(SolverError::Infeasible(format!(
                "no feasible placement after {:.3}s",
                self.solve_time.as_secs_f64()
            ))),
            SolveStatus::Timeout => Err(SolverError::Timeout {
                seconds: self.solve_time.as_secs_f64(),
            }),
        }
    }
}
