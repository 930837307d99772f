//! Solver boundary for the splitplan placement model.
//!
//! The model builder produces a [`MilpProblem`]: declared variables (binary,
//! integer or continuous), named linear constraints and an objective with a
//! [`Sense`]. A backend consumes it under [`SolveLimits`] and answers with a
//! [`SolveOutcome`] or a [`SolverError`].
//!
//! ```text
//! splitplan-algo (assembler) ──MilpProblem──> backend (HiGHS, exhaustive)
//!                            <─SolveOutcome──
//! ```
//!
//! Nothing here knows about RAN splits or topologies.

pub mod error;
pub mod problem;
pub mod solution;

pub use error::{SolverError, SolverResult};
pub use problem::{
    CeilingLink, ChoiceGroup, Comparison, LinearConstraint, MilpProblem, Sense, VariableInfo,
    VariableKind,
};
pub use solution::{SolveLimits, SolveOutcome, SolveStatus};

/// Re-exported so backends and model code share one `good_lp` version.
pub use good_lp;
