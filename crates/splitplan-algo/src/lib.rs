//! # splitplan-algo: placement model construction for RAN functional splits
//!
//! Builds the mixed-integer model that decides, per base station and per
//! load snapshot, which functional split to run and over which route, so
//! that compute, network and migration power stay low while virtualized
//! functions are shared across base stations.
//!
//! ## Pipeline
//!
//! | Step | Type | Output |
//! |------|------|--------|
//! | Feasibility | [`FeasibleAssignmentEnumerator`] | (route, split, base station) candidates within delay budgets |
//! | Demand | [`ComputeDemandModel`], [`DemandCache`] | GOPS per VNF per base station |
//! | Cost | [`CostModelBuilder`] | RAN, network and migration power expressions |
//! | Capacity | [`CapacityConstraintBuilder`] | processing and link limits |
//! | Centralization | [`CentralizationScorer`] | shared-instance score and floor |
//! | Assembly | [`ModelAssembler`] | [`ModelArtifact`] ready for a [`PlacementBackend`] |
//! | Round | [`RoundPlanner`], [`RoundSequence`] | chosen placements and the next [`DeploymentLedger`] |
//!
//! Counts and loads become on/off signals through the ceiling linearization
//! in [`ceiling`].
//!
//! ## Backends
//!
//! - [`ExhaustiveBackend`]: brute force over one candidate per base station
//! - [`ClarabelRelaxation`]: continuous relaxation, exact when integral
//! - `HighsBackend`: branch and bound (feature `solver-highs`)
//!
//! ## Example
//!
//! ```ignore
//! use splitplan_algo::{PlannerConfig, RoundPlanner, RoundSequence, CostTables};
//! use splitplan_core::FunctionChain;
//!
//! let config = PlannerConfig::from_path("planner.toml".as_ref())?;
//! let catalog = config.catalog();
//! let chain = FunctionChain::standard();
//! let tables = CostTables::default();
//! let backend = config.backend()?;
//!
//! let planner = RoundPlanner::new(&topology, &catalog, &chain, &tables, backend.as_ref(), config.solve_limits());
//! let mut rounds = RoundSequence::new(planner, config.assembly(None));
//! for (t, result) in rounds.run(config.round.timestamps.clone()) {
//!     let outcome = result?;
//!     println!("t={t}: {:.1} J, {} migrations", outcome.power.total_energy_j, outcome.migrations);
//! }
//! ```

pub mod assembler;
pub mod backend;
pub mod capacity;
pub mod ceiling;
pub mod centralization;
pub mod config;
pub mod cost_model;
pub mod demand;
pub mod error;
pub mod feasibility;
pub mod ledger;
pub mod round;
pub mod test_utils;

pub use assembler::{
    AssemblyConfig, ModelArtifact, ModelAssembler, ModelExpressions, ModelIndex, ObjectiveMode,
    ENERGY_SCALE,
};
pub use backend::{backend_by_id, ClarabelRelaxation, ExhaustiveBackend, PlacementBackend};
#[cfg(feature = "solver-highs")]
pub use backend::HighsBackend;
pub use capacity::{CapacityConstraintBuilder, CapacityLimits};
pub use centralization::{CentralizationModel, CentralizationScorer};
pub use config::{CatalogChoice, LoggingConfig, PlannerConfig, RoundConfig, SolverConfig};
pub use cost_model::{CostExpressions, CostModelBuilder, LoadAccumulator};
pub use demand::{ComputeDemandModel, CostTables, DemandCache, DemandMode, DemandTable};
pub use error::{PlacementError, PlacementResult};
pub use feasibility::{
    AssignmentCandidate, CandidateSet, FeasibleAssignmentEnumerator, FunctionPlacement,
    RejectReason, Rejection, TierAssignment,
};
pub use ledger::{DeploymentLedger, LedgerBuilder};
pub use round::{HardwareReport, LinkReport, PowerSummary, RoundOutcome, RoundPlanner, RoundSequence};
