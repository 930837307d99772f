//! Model assembly.
//!
//! Wires the enumerator, demand cache, cost model, capacity limits and
//! centralization score into one [`MilpProblem`]. The variables it declares:
//!
//! | Variable | Domain | Meaning |
//! |---|---|---|
//! | `x_{route}_{split}_{bs}` | binary | candidate selected |
//! | `z_{node}_{f}` | integer 0..1 | VNF `f` active on `node` |
//! | `y_{node}_hw{k}` | integer 0..1 | hardware unit switched on |
//!
//! The assembled artifact keeps handles to every variable and named
//! expression so a round can read the answer back.

use crate::backend::PlacementBackend;
use crate::capacity::{CapacityConstraintBuilder, CapacityLimits};
use crate::ceiling::count_epsilon;
use crate::centralization::CentralizationScorer;
use crate::cost_model::CostModelBuilder;
use crate::demand::{ComputeDemandModel, CostTables, DemandCache, DemandMode};
use crate::error::{PlacementError, PlacementResult};
use crate::feasibility::{AssignmentCandidate, FeasibleAssignmentEnumerator};
use crate::ledger::DeploymentLedger;
use serde::{Deserialize, Serialize};
use splitplan_core::{
    BaseStationKey, FunctionChain, FunctionId, HardwareKey, LinkId, NodeId, ServiceClass,
    SplitCatalog, TopologyView,
};
use splitplan_solver_common::good_lp::{Expression, Variable};
use splitplan_solver_common::{MilpProblem, Sense, SolveLimits, SolveOutcome, SolverResult};
use std::collections::BTreeMap;
use std::time::Instant;

/// Seconds per hour: converts the power terms (W) to energy over one hour (J)
/// so they share a unit with migration energy.
pub const ENERGY_SCALE: f64 = 3600.0;

/// What the solver optimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveMode {
    /// Maximize the centralization score
    #[default]
    MaximizeCentralization,
    /// Minimize `ENERGY_SCALE · (RAN + network) + migration`
    MinimizePower,
}

impl std::str::FromStr for ObjectiveMode {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "maximize_centralization" | "centralization" => Ok(ObjectiveMode::MaximizeCentralization),
            "minimize_power" | "power" => Ok(ObjectiveMode::MinimizePower),
            other => Err(PlacementError::Config(format!(
                "unknown objective '{}'",
                other
            ))),
        }
    }
}

/// Per-round assembly settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyConfig {
    pub service: ServiceClass,
    pub demand_mode: DemandMode,
    /// Lower bound on the centralization score
    pub centralization_floor: f64,
    pub objective: ObjectiveMode,
    /// Load row to use; `None` means one user per base station
    pub timestamp: Option<usize>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            service: ServiceClass::Urllc,
            demand_mode: DemandMode::Calc,
            centralization_floor: 0.0,
            objective: ObjectiveMode::MaximizeCentralization,
            timestamp: None,
        }
    }
}

/// Named expressions over the model variables.
///
/// Power expressions evaluate to W and are not multiplied by
/// [`ENERGY_SCALE`]; only the `MinimizePower` objective and
/// [`PowerSummary`](crate::round::PowerSummary) apply it.
#[derive(Debug, Clone)]
pub struct ModelExpressions {
    /// W, unscaled
    pub ran_power: Expression,
    /// W, unscaled
    pub network_power: Expression,
    /// J
    pub migration_power: Expression,
    pub centralization: Expression,
    /// GOPS per hardware unit
    pub hardware_load: BTreeMap<HardwareKey, Expression>,
    /// Gbps per link
    pub link_usage: BTreeMap<LinkId, Expression>,
    /// W per link
    pub link_power: BTreeMap<LinkId, Expression>,
}

/// Handles into an assembled problem.
#[derive(Debug, Clone)]
pub struct ModelIndex {
    pub candidates: Vec<AssignmentCandidate>,
    /// Indicator of `candidates[i]` at position `i`
    pub indicators: Vec<Variable>,
    /// Candidate positions per base station
    pub groups: BTreeMap<BaseStationKey, Vec<usize>>,
    pub function_activation: BTreeMap<(NodeId, FunctionId), Variable>,
    pub hardware_activation: BTreeMap<HardwareKey, Variable>,
    pub expressions: ModelExpressions,
    pub capacities: CapacityLimits,
    pub demand: DemandCache,
    /// `M = |VNF| × |BS|`
    pub normalizer: usize,
    /// Centralization ceiling tolerance `1/M`
    pub epsilon: f64,
    pub rejected: usize,
}

/// An assembled problem plus its index.
#[derive(Debug)]
pub struct ModelArtifact {
    pub problem: MilpProblem,
    pub index: ModelIndex,
}

impl ModelArtifact {
    /// Hand the problem to `backend` and return its outcome as is.
    pub fn solve(
        &self,
        backend: &dyn PlacementBackend,
        limits: &SolveLimits,
    ) -> SolverResult<SolveOutcome> {
        tracing::info!(
            backend = backend.id(),
            variables = self.problem.num_variables(),
            constraints = self.problem.num_constraints(),
            time_limit = limits.time_limit_seconds,
            "solving placement model"
        );
        let outcome = backend.solve(&self.problem, limits)?;
        tracing::info!(
            status = %outcome.status,
            objective = outcome.objective,
            seconds = outcome.solve_time.as_secs_f64(),
            "solver finished"
        );
        Ok(outcome)
    }
}

/// Builds one round's model.
pub struct ModelAssembler<'a> {
    topology: &'a dyn TopologyView,
    catalog: &'a SplitCatalog,
    chain: &'a FunctionChain,
    tables: &'a CostTables,
    ledger: &'a DeploymentLedger,
    config: AssemblyConfig,
}

impl<'a> ModelAssembler<'a> {
    pub fn new(
        topology: &'a dyn TopologyView,
        catalog: &'a SplitCatalog,
        chain: &'a FunctionChain,
        tables: &'a CostTables,
        ledger: &'a DeploymentLedger,
        config: AssemblyConfig,
    ) -> Self {
        Self {
            topology,
            catalog,
            chain,
            tables,
            ledger,
            config,
        }
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    pub fn build(&self) -> PlacementResult<ModelArtifact> {
        let start = Instant::now();
        self.tables.validate(self.chain)?;

        let load = self.topology.load_at(self.config.timestamp)?;
        let set = FeasibleAssignmentEnumerator::new(
            self.topology,
            self.catalog,
            self.chain,
            &load,
            self.config.service.throughput_bps(),
        )
        .enumerate()?;
        let rejected = set.num_rejections();
        let groups = set.by_base_station();
        let candidates = set.into_candidates();

        let base_stations = self.topology.base_station_keys();
        let normalizer = (self.chain.virtualized().len() * base_stations.len()).max(1);

        let model = ComputeDemandModel::new(
            self.topology.reference_base_station()?,
            self.config.demand_mode,
        );
        let demand = DemandCache::build(&model, self.tables, self.chain, &load, &base_stations)?;

        let mut problem = MilpProblem::new();
        let indicators: Vec<Variable> = candidates
            .iter()
            .map(|c| problem.add_binary(c.name()))
            .collect();

        for (bs, members) in &groups {
            problem.add_choice_group(
                format!("single_assignment_{}", bs),
                members.iter().map(|&i| indicators[i]).collect(),
            );
        }

        let mut costs = CostModelBuilder::new(self.topology, self.chain, self.tables, self.ledger);
        for (candidate, &x) in candidates.iter().zip(&indicators) {
            costs.add_candidate(candidate, x, demand.get(candidate.base_station)?)?;
        }
        let costs = costs.finish(&mut problem, normalizer)?;
        let capacities = CapacityConstraintBuilder::new(self.topology).build(&mut problem, &costs)?;

        let centralization = CentralizationScorer::new(self.chain, normalizer).build(
            &mut problem,
            &candidates,
            &indicators,
            self.config.centralization_floor,
        );

        match self.config.objective {
            ObjectiveMode::MaximizeCentralization => {
                problem.set_objective(centralization.score.clone(), Sense::Maximize)
            }
            ObjectiveMode::MinimizePower => problem.set_objective(
                (costs.ran_power.clone() + costs.network_power.clone()) * ENERGY_SCALE
                    + costs.migration_power.clone(),
                Sense::Minimize,
            ),
        }

        tracing::info!(
            base_stations = base_stations.len(),
            candidates = candidates.len(),
            rejected,
            variables = problem.num_variables(),
            integer_variables = problem.num_integer_variables(),
            constraints = problem.num_constraints(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "placement model assembled"
        );

        let hardware_load = costs
            .hardware
            .iter()
            .filter(|(key, _)| costs.hardware_activation.contains_key(*key))
            .map(|(key, acc)| (*key, acc.load.clone()))
            .collect();

        Ok(ModelArtifact {
            problem,
            index: ModelIndex {
                candidates,
                indicators,
                groups,
                function_activation: centralization.activations,
                hardware_activation: costs.hardware_activation,
                expressions: ModelExpressions {
                    ran_power: costs.ran_power,
                    network_power: costs.network_power,
                    migration_power: costs.migration_power,
                    centralization: centralization.score,
                    hardware_load,
                    link_usage: costs.link_usage,
                    link_power: costs.link_power,
                },
                capacities,
                demand,
                normalizer,
                epsilon: count_epsilon(normalizer),
                rejected,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{line_topology, LineOptions};
    use splitplan_solver_common::Comparison;

    fn assemble(opts: &LineOptions, config: AssemblyConfig) -> PlacementResult<ModelArtifact> {
        let topo = line_topology(opts).unwrap();
        let catalog = SplitCatalog::urllc();
        let chain = FunctionChain::standard();
        let tables = CostTables::default();
        let ledger = DeploymentLedger::empty();
        ModelAssembler::new(&topo, &catalog, &chain, &tables, &ledger, config).build()
    }

    #[test]
    fn test_one_choice_group_per_base_station() {
        let artifact = assemble(
            &LineOptions {
                base_stations: 2,
                ..LineOptions::default()
            },
            AssemblyConfig::default(),
        )
        .unwrap();
        assert_eq!(artifact.problem.choice_groups().len(), 2);
        for group in artifact.problem.choice_groups() {
            let c = artifact.problem.constraint(&group.name).unwrap();
            assert_eq!(c.cmp, Comparison::Eq);
            assert_eq!(c.rhs, 1.0);
        }
        assert_eq!(artifact.index.normalizer, 14);
        assert_eq!(artifact.index.epsilon, 1.0 / 14.0);
    }

    #[test]
    fn test_indicators_are_binary_and_named() {
        let artifact = assemble(&LineOptions::default(), AssemblyConfig::default()).unwrap();
        let index = &artifact.index;
        assert_eq!(index.candidates.len(), index.indicators.len());
        for (c, &x) in index.candidates.iter().zip(&index.indicators) {
            let info = artifact.problem.variable_info(x).unwrap();
            assert_eq!(info.name, c.name());
            assert_eq!(info.kind, splitplan_solver_common::VariableKind::Binary);
        }
    }

    #[test]
    fn test_objective_follows_mode() {
        let max = assemble(&LineOptions::default(), AssemblyConfig::default()).unwrap();
        assert_eq!(max.problem.sense(), Sense::Maximize);

        let min = assemble(
            &LineOptions::default(),
            AssemblyConfig {
                objective: ObjectiveMode::MinimizePower,
                ..AssemblyConfig::default()
            },
        )
        .unwrap();
        assert_eq!(min.problem.sense(), Sense::Minimize);
    }

    #[test]
    fn test_unknown_timestamp() {
        let err = assemble(
            &LineOptions::default(),
            AssemblyConfig {
                timestamp: Some(5),
                ..AssemblyConfig::default()
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PlacementError::Core(splitplan_core::CoreError::UnknownKey { .. })
        ));
    }

    #[test]
    fn test_parse_objective() {
        assert_eq!(
            "power".parse::<ObjectiveMode>().unwrap(),
            ObjectiveMode::MinimizePower
        );
        assert!("fastest".parse::<ObjectiveMode>().is_err());
    }
}
