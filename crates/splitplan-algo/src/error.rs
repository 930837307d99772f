//! Errors raised while building or solving a placement round.

use crate::feasibility::Rejection;
use splitplan_core::{BaseStationKey, CoreError, FunctionId};
use splitplan_solver_common::SolverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlacementError {
    /// Some base station has no (route, split) pair passing feasibility.
    #[error("No feasible assignment for {base_station}: {}", summarize(.rejections))]
    InfeasibleTopology {
        base_station: BaseStationKey,
        rejections: Vec<Rejection>,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    /// A virtualized function has no entry in a cost table.
    #[error("Missing {table} entry for {function}")]
    MissingCostData {
        table: &'static str,
        function: FunctionId,
    },

    #[error(transparent)]
    Solver(#[from] SolverError),

    /// The solver answer does not select exactly one candidate per base station.
    #[error("Inconsistent solution: {0}")]
    InconsistentSolution(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn summarize(rejections: &[Rejection]) -> String {
    if rejections.is_empty() {
        return "no route targets it".to_string();
    }
    rejections
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type PlacementResult<T> = Result<T, PlacementError>;
