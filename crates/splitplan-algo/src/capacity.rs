//! Processing and link capacity limits.

use crate::cost_model::CostExpressions;
use crate::error::PlacementResult;
use serde::{Deserialize, Serialize};
use splitplan_core::{HardwareKey, LinkId, TopologyView};
use splitplan_solver_common::{LinearConstraint, MilpProblem};
use std::collections::BTreeMap;

/// Limits that were turned into constraints, for post-solve reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityLimits {
    /// GOPS per loaded hardware unit
    pub hardware_gops: BTreeMap<HardwareKey, f64>,
    /// Gbps per used link (port capacity × ports)
    pub link_gbps: BTreeMap<LinkId, f64>,
}

pub struct CapacityConstraintBuilder<'a> {
    topology: &'a dyn TopologyView,
}

impl<'a> CapacityConstraintBuilder<'a> {
    pub fn new(topology: &'a dyn TopologyView) -> Self {
        Self { topology }
    }

    /// One constraint per loaded hardware unit and one per used link.
    pub fn build(
        &self,
        problem: &mut MilpProblem,
        costs: &CostExpressions,
    ) -> PlacementResult<CapacityLimits> {
        let mut limits = CapacityLimits::default();

        for (key, acc) in &costs.hardware {
            if acc.min_positive_term.is_none() {
                continue;
            }
            let capacity = acc.unit.gops_capacity();
            problem.add_constraint(LinearConstraint::le(
                format!("hw_capacity_{}", key),
                acc.load.clone(),
                capacity,
            ));
            limits.hardware_gops.insert(*key, capacity);
        }

        for (id, usage) in &costs.link_usage {
            let capacity = self.topology.link(*id)?.max_capacity_gbps();
            problem.add_constraint(LinearConstraint::le(
                format!("link_capacity_{}", id),
                usage.clone(),
                capacity,
            ));
            limits.link_gbps.insert(*id, capacity);
        }

        tracing::debug!(
            hardware = limits.hardware_gops.len(),
            links = limits.link_gbps.len(),
            "capacity constraints added"
        );
        Ok(limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_model::CostModelBuilder;
    use crate::demand::{ComputeDemandModel, CostTables, DemandMode};
    use crate::ledger::DeploymentLedger;
    use crate::test_utils::{line_topology, LineOptions};
    use splitplan_core::{FunctionChain, NodeId};
    use splitplan_solver_common::good_lp::Variable;
    use std::collections::HashMap;

    #[test]
    fn test_overloaded_unit_is_rejected() {
        let topo = line_topology(&LineOptions {
            gops_capacity: 1.0,
            ..LineOptions::default()
        })
        .unwrap();
        let chain = FunctionChain::standard();
        let tables = CostTables::default();
        let ledger = DeploymentLedger::empty();
        let model = ComputeDemandModel::new(topo.reference_base_station().unwrap(), DemandMode::Calc);
        let demand = model.table(1, &tables, &chain).unwrap();

        let catalog = splitplan_core::SplitCatalog::dran();
        let load = topo.load_at(None).unwrap();
        let candidates = crate::feasibility::FeasibleAssignmentEnumerator::new(
            &topo, &catalog, &chain, &load, 1.024e6,
        )
        .enumerate()
        .unwrap()
        .into_candidates();

        let mut problem = MilpProblem::new();
        let mut costs = CostModelBuilder::new(&topo, &chain, &tables, &ledger);
        let xs: Vec<Variable> = candidates
            .iter()
            .map(|c| problem.add_binary(c.name()))
            .collect();
        for (c, &x) in candidates.iter().zip(&xs) {
            costs.add_candidate(c, x, &demand).unwrap();
        }
        let costs = costs.finish(&mut problem, 7).unwrap();
        let limits = CapacityConstraintBuilder::new(&topo)
            .build(&mut problem, &costs)
            .unwrap();

        let ru = splitplan_core::HardwareKey::new(NodeId::new(2), 1);
        assert_eq!(limits.hardware_gops[&ru], 1.0);
        assert_eq!(limits.link_gbps.len(), 2);

        let mut values = HashMap::new();
        values.insert(xs[0], 1.0);
        values.insert(costs.hardware_activation[&ru], 1.0);
        let values = problem.complete(&values);
        let limit = problem.constraint("hw_capacity_node2_hw1").unwrap();
        assert!(!limit.is_satisfied_by(&values, 1e-9));
        assert!(problem
            .constraint("link_capacity_link1")
            .unwrap()
            .is_satisfied_by(&values, 1e-9));
    }
}
