//! Error types for the solver boundary.

use thiserror::Error;

/// Errors that can occur while handing a model to a solving engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    /// The engine proved that no assignment satisfies the constraints.
    #[error("Problem infeasible: {0}")]
    Infeasible(String),

    /// The objective can grow without bound.
    #[error("Problem unbounded: {0}")]
    Unbounded(String),

    /// Time limit reached before any incumbent was found.
    #[error("Solver timed out after {seconds} seconds without a feasible solution")]
    Timeout { seconds: f64 },

    /// Engine-level failure (numerical trouble, internal error).
    #[error("Solver failed: {0}")]
    Failed(String),

    /// The problem exceeds what the chosen backend is willing to search.
    #[error("Problem too large for backend {backend}: {message}")]
    ProblemTooLarge { backend: String, message: String },

    /// The requested backend was not compiled in.
    #[error("Solver backend unavailable: {0}")]
    Unavailable(String),
}

impl From<good_lp::ResolutionError> for SolverError {
    fn from(err: good_lp::ResolutionError) -> Self {
        match err {
            good_lp::ResolutionError::Infeasible => {
                SolverError::Infeasible("reported by solver".to_string())
            }
            good_lp::ResolutionError::Unbounded => {
                SolverError::Unbounded("reported by solver".to_string())
            }
            other => SolverError::Failed(other.to_string()),
        }
    }
}

/// Result type alias for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;
