//! One placement round per load snapshot.
//!
//! A round assembles the model against the current ledger, solves it, reads
//! the chosen candidates back and derives the next ledger. [`RoundSequence`]
//! chains rounds over timestamps and swaps its ledger only after a round
//! completes; a failed round leaves it untouched.

use crate::assembler::{AssemblyConfig, ModelArtifact, ModelAssembler, ModelIndex, ENERGY_SCALE};
use crate::backend::PlacementBackend;
use crate::demand::CostTables;
use crate::error::{PlacementError, PlacementResult};
use crate::feasibility::AssignmentCandidate;
use crate::ledger::DeploymentLedger;
use serde::{Deserialize, Serialize};
use splitplan_core::{FunctionChain, HardwareKey, LinkId, SplitCatalog, SplitId, TopologyView};
use splitplan_solver_common::good_lp::Variable;
use splitplan_solver_common::{SolveLimits, SolveStatus};
use std::collections::{BTreeMap, HashMap};

/// Indicator values above this count as selected.
const SELECTION_THRESHOLD: f64 = 0.5;

/// Power terms of a solved round.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerSummary {
    pub ran_w: f64,
    pub network_w: f64,
    pub migration_j: f64,
    /// `ran_w × ENERGY_SCALE`
    pub ran_energy_j: f64,
    /// `network_w × ENERGY_SCALE`
    pub network_energy_j: f64,
    pub total_energy_j: f64,
}

impl PowerSummary {
    pub fn new(ran_w: f64, network_w: f64, migration_j: f64) -> Self {
        let ran_energy_j = ran_w * ENERGY_SCALE;
        let network_energy_j = network_w * ENERGY_SCALE;
        Self {
            ran_w,
            network_w,
            migration_j,
            ran_energy_j,
            network_energy_j,
            total_energy_j: ran_energy_j + network_energy_j + migration_j,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareReport {
    pub key: HardwareKey,
    pub active: bool,
    pub usage_gops: f64,
    pub capacity_gops: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkReport {
    pub usage_gbps: f64,
    pub power_w: f64,
    pub capacity_gbps: f64,
}

/// Everything a solved round reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub timestamp: Option<usize>,
    pub status: SolveStatus,
    pub objective: f64,
    pub mip_gap: Option<f64>,
    pub solve_time_seconds: f64,
    /// One chosen candidate per base station, in base-station order
    pub selections: Vec<AssignmentCandidate>,
    pub hardware: Vec<HardwareReport>,
    pub links: BTreeMap<LinkId, LinkReport>,
    pub power: PowerSummary,
    pub centralization: f64,
    /// VNF placements that moved relative to the previous ledger
    pub migrations: usize,
    pub active_hardware: usize,
    /// Base stations served per split
    pub split_tally: BTreeMap<SplitId, usize>,
    pub next_ledger: DeploymentLedger,
}

/// Inputs shared by every round.
pub struct RoundPlanner<'a> {
    topology: &'a dyn TopologyView,
    catalog: &'a SplitCatalog,
    chain: &'a FunctionChain,
    tables: &'a CostTables,
    backend: &'a dyn PlacementBackend,
    limits: SolveLimits,
}

impl<'a> RoundPlanner<'a> {
    pub fn new(
        topology: &'a dyn TopologyView,
        catalog: &'a SplitCatalog,
        chain: &'a FunctionChain,
        tables: &'a CostTables,
        backend: &'a dyn PlacementBackend,
        limits: SolveLimits,
    ) -> Self {
        Self {
            topology,
            catalog,
            chain,
            tables,
            backend,
            limits,
        }
    }

    /// Assemble the model for `config` against `ledger` without solving it.
    pub fn assemble(
        &self,
        ledger: &DeploymentLedger,
        config: AssemblyConfig,
    ) -> PlacementResult<ModelArtifact> {
        ModelAssembler::new(
            self.topology,
            self.catalog,
            self.chain,
            self.tables,
            ledger,
            config,
        )
        .build()
    }

    /// Assemble, solve and read back one round.
    pub fn solve_round(
        &self,
        ledger: &DeploymentLedger,
        config: AssemblyConfig,
    ) -> PlacementResult<RoundOutcome> {
        let timestamp = config.timestamp;
        let artifact = self.assemble(ledger, config)?;
        let outcome = artifact.solve(self.backend, &self.limits)?.into_accepted()?;
        let values = artifact.problem.complete(&outcome.values);
        let index = &artifact.index;

        let selections = read_selections(index, &values)?;

        let eval = |expr: &splitplan_solver_common::good_lp::Expression| expr.eval_with(&values);

        let mut hardware = Vec::new();
        for (key, load) in &index.expressions.hardware_load {
            let active = match index.hardware_activation.get(key) {
                Some(var) => read_value(&values, var)? > SELECTION_THRESHOLD,
                None => false,
            };
            hardware.push(HardwareReport {
                key: *key,
                active,
                usage_gops: eval(load),
                capacity_gops: index.capacities.hardware_gops.get(key).copied().unwrap_or(0.0),
            });
        }
        let active_hardware = hardware.iter().filter(|h| h.active).count();

        let mut links = BTreeMap::new();
        for (id, usage) in &index.expressions.link_usage {
            let power_w = index
                .expressions
                .link_power
                .get(id)
                .map_or(0.0, |p| eval(p));
            links.insert(
                *id,
                LinkReport {
                    usage_gbps: eval(usage),
                    power_w,
                    capacity_gbps: index.capacities.link_gbps.get(id).copied().unwrap_or(0.0),
                },
            );
        }

        let power = PowerSummary::new(
            eval(&index.expressions.ran_power),
            eval(&index.expressions.network_power),
            eval(&index.expressions.migration_power),
        );

        let migrations: usize = selections
            .iter()
            .map(|c| ledger.migrations_for(c, self.chain))
            .sum();
        let mut split_tally: BTreeMap<SplitId, usize> = BTreeMap::new();
        for c in &selections {
            *split_tally.entry(c.split).or_default() += 1;
        }

        let next_ledger =
            DeploymentLedger::from_selection(self.topology, self.catalog, self.chain, &selections)?;

        let centralization = eval(&index.expressions.centralization);
        tracing::info!(
            timestamp = ?timestamp,
            status = %outcome.status,
            centralization,
            migrations,
            active_hardware,
            total_energy_j = power.total_energy_j,
            "round solved"
        );

        Ok(RoundOutcome {
            timestamp,
            status: outcome.status,
            objective: outcome.objective,
            mip_gap: outcome.mip_gap,
            solve_time_seconds: outcome.solve_time.as_secs_f64(),
            selections,
            hardware,
            links,
            power,
            centralization,
            migrations,
            active_hardware,
            split_tally,
            next_ledger,
        })
    }
}

fn read_value(values: &HashMap<Variable, f64>, var: &Variable) -> PlacementResult<f64> {
    values.get(var).copied().ok_or_else(|| {
        PlacementError::InconsistentSolution(format!("no value reported for {:?}", var))
    })
}

/// Candidates whose indicator is above the selection threshold, exactly one
/// per base station.
fn read_selections(
    index: &ModelIndex,
    values: &HashMap<Variable, f64>,
) -> PlacementResult<Vec<AssignmentCandidate>> {
    let mut selections = Vec::with_capacity(index.groups.len());
    for (bs, members) in &index.groups {
        let mut chosen = Vec::new();
        for &i in members {
            if read_value(values, &index.indicators[i])? > SELECTION_THRESHOLD {
                chosen.push(i);
            }
        }
        match chosen.as_slice() {
            [i] => selections.push(index.candidates[*i].clone()),
            other => {
                return Err(PlacementError::InconsistentSolution(format!(
                    "{} candidates selected for {}",
                    other.len(),
                    bs
                )))
            }
        }
    }
    Ok(selections)
}

/// Sequential rounds sharing one ledger.
pub struct RoundSequence<'a> {
    planner: RoundPlanner<'a>,
    config: AssemblyConfig,
    ledger: DeploymentLedger,
}

impl<'a> RoundSequence<'a> {
    /// Start from an empty ledger.
    pub fn new(planner: RoundPlanner<'a>, config: AssemblyConfig) -> Self {
        Self {
            planner,
            config,
            ledger: DeploymentLedger::empty(),
        }
    }

    pub fn with_ledger(mut self, ledger: DeploymentLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn ledger(&self) -> &DeploymentLedger {
        &self.ledger
    }

    /// Solve one timestamp; the ledger is replaced only on success.
    pub fn step(&mut self, timestamp: Option<usize>) -> PlacementResult<RoundOutcome> {
        let config = AssemblyConfig {
            timestamp,
            ..self.config.clone()
        };
        let outcome = self.planner.solve_round(&self.ledger, config)?;
        self.ledger = outcome.next_ledger.clone();
        tracing::debug!(entries = self.ledger.len(), "ledger replaced");
        Ok(outcome)
    }

    /// Solve every timestamp in order. Failed rounds are reported and skipped.
    pub fn run<I>(&mut self, timestamps: I) -> Vec<(usize, PlacementResult<RoundOutcome>)>
    where
        I: IntoIterator<Item = usize>,
    {
        timestamps
            .into_iter()
            .map(|t| {
                let result = self.step(Some(t));
                if let Err(e) = &result {
                    tracing::warn!(timestamp = t, error = %e, "round failed, keeping previous ledger");
                }
                (t, result)
            })
            .collect()
    }
}
