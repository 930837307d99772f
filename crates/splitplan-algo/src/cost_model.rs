//! Linear power expressions over the candidate indicators.
//!
//! Candidates are folded in one at a time with [`CostModelBuilder::add_candidate`];
//! [`CostModelBuilder::finish`] then declares the hardware activations and
//! closes the expressions. Units are watts for RAN and network power and
//! joules for migration.

use crate::ceiling::{add_ceiling, load_epsilon};
use crate::demand::{CostTables, DemandTable};
use crate::error::PlacementResult;
use crate::feasibility::AssignmentCandidate;
use crate::ledger::DeploymentLedger;
use splitplan_core::{CoreError, FunctionChain, HardwareKey, HardwareUnit, LinkId, TopologyView};
use splitplan_solver_common::good_lp::{Expression, Variable};
use splitplan_solver_common::MilpProblem;
use std::collections::BTreeMap;

/// Processing load routed to one hardware unit.
#[derive(Debug, Clone)]
pub struct LoadAccumulator {
    pub unit: HardwareUnit,
    /// Σ x · gops (GOPS)
    pub load: Expression,
    /// Smallest positive coefficient in `load`
    pub min_positive_term: Option<f64>,
}

impl LoadAccumulator {
    fn new(unit: HardwareUnit) -> Self {
        Self {
            unit,
            load: Expression::from(0.0),
            min_positive_term: None,
        }
    }

    fn push(&mut self, x: Variable, gops: f64) {
        if gops <= 0.0 {
            return;
        }
        self.load += gops * x;
        self.min_positive_term = Some(match self.min_positive_term {
            Some(current) => current.min(gops),
            None => gops,
        });
    }
}

/// Closed expressions handed to the assembler.
///
/// Power terms are instantaneous watts and migration is joules, none of them
/// scaled. Multiply the power terms by [`ENERGY_SCALE`](crate::assembler::ENERGY_SCALE)
/// to compare them with migration energy.
#[derive(Debug, Clone)]
pub struct CostExpressions {
    /// Dynamic plus gated static RAN power (W, unscaled)
    pub ran_power: Expression,
    /// Sum of link power (W, unscaled)
    pub network_power: Expression,
    /// Migration energy (J)
    pub migration_power: Expression,
    pub hardware: BTreeMap<HardwareKey, LoadAccumulator>,
    pub hardware_activation: BTreeMap<HardwareKey, Variable>,
    /// Gbps per link
    pub link_usage: BTreeMap<LinkId, Expression>,
    /// W per link, unscaled
    pub link_power: BTreeMap<LinkId, Expression>,
}

pub struct CostModelBuilder<'a> {
    topology: &'a dyn TopologyView,
    chain: &'a FunctionChain,
    tables: &'a CostTables,
    ledger: &'a DeploymentLedger,
    ran_dynamic: Expression,
    migration: Expression,
    hardware: BTreeMap<HardwareKey, LoadAccumulator>,
    links: BTreeMap<LinkId, Expression>,
}

impl<'a> CostModelBuilder<'a> {
    pub fn new(
        topology: &'a dyn TopologyView,
        chain: &'a FunctionChain,
        tables: &'a CostTables,
        ledger: &'a DeploymentLedger,
    ) -> Self {
        Self {
            topology,
            chain,
            tables,
            ledger,
            ran_dynamic: Expression::from(0.0),
            migration: Expression::from(0.0),
            hardware: BTreeMap::new(),
            links: BTreeMap::new(),
        }
    }

    /// Fold one candidate with indicator `x` into every accumulator.
    pub fn add_candidate(
        &mut self,
        candidate: &AssignmentCandidate,
        x: Variable,
        demand: &DemandTable,
    ) -> PlacementResult<()> {
        for placement in candidate.vnf_placements(self.chain) {
            let gops = demand.gops(placement.function)?;
            let acc = self.accumulator(placement.hardware)?;
            acc.push(x, gops);
            let ratio = acc.unit.dynamic_power_w() / acc.unit.gops_capacity();
            self.ran_dynamic += (gops * ratio) * x;

            if !self.ledger.is_deployed_in(
                candidate.base_station,
                placement.function,
                placement.hardware,
            ) {
                self.migration += self.tables.migration_cost(placement.function)? * x;
            }
        }

        for tier in &candidate.tiers {
            if tier.bandwidth_gbps <= 0.0 {
                continue;
            }
            for link in &tier.links {
                *self
                    .links
                    .entry(*link)
                    .or_insert_with(|| Expression::from(0.0)) += tier.bandwidth_gbps * x;
            }
        }
        Ok(())
    }

    fn accumulator(&mut self, key: HardwareKey) -> PlacementResult<&mut LoadAccumulator> {
        if !self.hardware.contains_key(&key) {
            let unit = self.topology.hardware_by_key(key)?;
            if unit.gops_capacity() <= 0.0 {
                return Err(CoreError::Validation(format!(
                    "hardware {} has no processing capacity",
                    key
                ))
                .into());
            }
            self.hardware.insert(key, LoadAccumulator::new(unit));
        }
        self.hardware.get_mut(&key).ok_or_else(|| {
            CoreError::unknown(splitplan_core::KeyKind::Hardware, key).into()
        })
    }

    /// Declare hardware activations and close the power expressions.
    ///
    /// `normalizer` is the same `M` the centralization terms use; it bounds
    /// the tolerance of the static-power ceiling from above.
    pub fn finish(
        self,
        problem: &mut MilpProblem,
        normalizer: usize,
    ) -> PlacementResult<CostExpressions> {
        let mut ran_power = self.ran_dynamic;
        let mut hardware_activation = BTreeMap::new();
        for (key, acc) in &self.hardware {
            if acc.min_positive_term.is_none() {
                continue;
            }
            let capacity = acc.unit.gops_capacity();
            let eps = load_epsilon(normalizer, acc.min_positive_term, capacity);
            let y = problem.add_integer(format!("y_{}", key), 0, 1);
            add_ceiling(
                problem,
                &key.to_string(),
                y,
                acc.load.clone() * (1.0 / capacity),
                eps,
            );
            ran_power += acc.unit.static_power_w() * y;
            hardware_activation.insert(*key, y);
        }

        let mut network_power = Expression::from(0.0);
        let mut link_power = BTreeMap::new();
        for (id, usage) in &self.links {
            let link = self.topology.link(*id)?;
            let power = usage.clone() * (link.port_power_w() / link.port_capacity_gbps());
            network_power += power.clone();
            link_power.insert(*id, power);
        }

        tracing::debug!(
            hardware = hardware_activation.len(),
            links = link_power.len(),
            "cost expressions closed"
        );

        Ok(CostExpressions {
            ran_power,
            network_power,
            migration_power: self.migration,
            hardware: self.hardware,
            hardware_activation,
            link_usage: self.links,
            link_power,
        })
    }
}
