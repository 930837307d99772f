//! Centralization score.
//!
//! For every (node, VNF) pair reachable by some candidate the count of base
//! stations placing that VNF on that node is tied to an integer activation
//! through the ceiling law. The score sums `count − activation`: each extra
//! base station sharing an already active (node, VNF) instance earns one
//! point.

use crate::ceiling::{add_ceiling, count_epsilon};
use crate::feasibility::AssignmentCandidate;
use splitplan_core::{FunctionChain, FunctionId, NodeId};
use splitplan_solver_common::good_lp::{Expression, Variable};
use splitplan_solver_common::{LinearConstraint, MilpProblem};
use std::collections::BTreeMap;

/// Name of the floor constraint on the score.
pub const FLOOR_CONSTRAINT: &str = "centralization_floor";

/// Variables and expressions produced by [`CentralizationScorer::build`].
#[derive(Debug, Clone)]
pub struct CentralizationModel {
    pub counts: BTreeMap<(NodeId, FunctionId), Expression>,
    pub activations: BTreeMap<(NodeId, FunctionId), Variable>,
    pub score: Expression,
    pub normalizer: usize,
}

pub struct CentralizationScorer<'a> {
    chain: &'a FunctionChain,
    normalizer: usize,
}

impl<'a> CentralizationScorer<'a> {
    /// `normalizer` is `M = |VNF| × |BS|`.
    pub fn new(chain: &'a FunctionChain, normalizer: usize) -> Self {
        Self { chain, normalizer }
    }

    pub fn build(
        &self,
        problem: &mut MilpProblem,
        candidates: &[AssignmentCandidate],
        indicators: &[Variable],
        floor: f64,
    ) -> CentralizationModel {
        let mut counts: BTreeMap<(NodeId, FunctionId), Expression> = BTreeMap::new();
        for (candidate, &x) in candidates.iter().zip(indicators) {
            for placement in candidate.vnf_placements(self.chain) {
                *counts
                    .entry((placement.node, placement.function))
                    .or_insert_with(|| Expression::from(0.0)) += x;
            }
        }

        let m = self.normalizer.max(1);
        let eps = count_epsilon(m);
        let mut activations = BTreeMap::new();
        let mut score = Expression::from(0.0);
        for (&(node, function), count) in &counts {
            let label = format!("{}_{}", node, function);
            let z = problem.add_integer(format!("z_{}", label), 0, 1);
            add_ceiling(problem, &label, z, count.clone() * (1.0 / m as f64), eps);
            score += count.clone() - z;
            activations.insert((node, function), z);
        }

        problem.add_constraint(LinearConstraint::ge(FLOOR_CONSTRAINT, score.clone(), floor));

        tracing::debug!(
            pairs = activations.len(),
            normalizer = m,
            floor,
            "centralization terms built"
        );

        CentralizationModel {
            counts,
            activations,
            score,
            normalizer: m,
        }
    }
}
