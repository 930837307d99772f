//! Feasible assignment enumeration.
//!
//! For every route and every split the route's target base station is
//! tried. A triple survives when the route spans exactly as many nodes as the
//! split needs and every present tier meets the split's delay budget:
//!
//! ```text
//! delay(tier) = propagation + Σ_links ( switching + packet/cap + depth · packet/cap )
//! ```
//!
//! with capacities in Gbps and delays in ms. This is the only place delay is
//! checked; the model never sees an infeasible triple.

use crate::error::{PlacementError, PlacementResult};
use serde::{Deserialize, Serialize};
use splitplan_core::{
    BaseStationKey, FunctionChain, FunctionId, HardwareKey, LinkId, LoadSnapshot, NodeId, Route,
    RouteId, RouteTier, SplitCatalog, SplitConfiguration, SplitId, Tier, TopologyView,
};
use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Fronthaul packet size (bits).
pub const PACKET_SIZE_BITS: f64 = 12_368.0;

/// Electrical processing delay per switched link (ms).
pub const SWITCHING_DELAY_MS: f64 = 0.005;

/// Where one function of a candidate runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPlacement {
    pub function: FunctionId,
    pub tier: Tier,
    pub node: NodeId,
    pub hardware: HardwareKey,
}

/// One present tier of a candidate with its computed delay and traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAssignment {
    pub tier: Tier,
    pub node: NodeId,
    pub hardware: HardwareKey,
    pub links: Vec<LinkId>,
    pub delay_ms: f64,
    pub bandwidth_gbps: f64,
}

/// A (route, split, base station) triple that passed feasibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentCandidate {
    pub route: RouteId,
    pub split: SplitId,
    pub base_station: BaseStationKey,
    pub tiers: Vec<TierAssignment>,
    pub placements: Vec<FunctionPlacement>,
}

impl AssignmentCandidate {
    /// Variable name of the candidate's indicator.
    pub fn name(&self) -> String {
        format!("x_{}_{}_{}", self.route, self.split, self.base_station)
    }

    pub fn tier(&self, tier: Tier) -> Option<&TierAssignment> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    pub fn placement(&self, function: FunctionId) -> Option<&FunctionPlacement> {
        self.placements.iter().find(|p| p.function == function)
    }

    /// Placements of virtualized functions only.
    pub fn vnf_placements<'a>(
        &'a self,
        chain: &'a FunctionChain,
    ) -> impl Iterator<Item = &'a FunctionPlacement> + 'a {
        self.placements
            .iter()
            .filter(move |p| chain.is_virtualized(p.function))
    }
}

/// Why a (route, split) pair was dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    NodeCountMismatch { route_nodes: usize, required: usize },
    DelayBudget { tier: Tier, delay_ms: f64, budget_ms: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub route: RouteId,
    pub split: SplitId,
    pub reason: RejectReason,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            RejectReason::NodeCountMismatch {
                route_nodes,
                required,
            } => write!(
                f,
                "{}/{} spans {} nodes, split needs {}",
                self.route, self.split, route_nodes, required
            ),
            RejectReason::DelayBudget {
                tier,
                delay_ms,
                budget_ms,
            } => write!(
                f,
                "{}/{} {} delay {:.4}ms exceeds {:.4}ms",
                self.route,
                self.split,
                tier.segment(),
                delay_ms,
                budget_ms
            ),
        }
    }
}

/// Surviving candidates plus the rejections per base station.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    candidates: Vec<AssignmentCandidate>,
    rejections: BTreeMap<BaseStationKey, Vec<Rejection>>,
}

impl CandidateSet {
    pub fn candidates(&self) -> &[AssignmentCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn rejections(&self, bs: BaseStationKey) -> &[Rejection] {
        self.rejections.get(&bs).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn num_rejections(&self) -> usize {
        self.rejections.values().map(Vec::len).sum()
    }

    /// Candidate indices grouped by base station.
    pub fn by_base_station(&self) -> BTreeMap<BaseStationKey, Vec<usize>> {
        let mut groups: BTreeMap<BaseStationKey, Vec<usize>> = BTreeMap::new();
        for (i, c) in self.candidates.iter().enumerate() {
            groups.entry(c.base_station).or_default().push(i);
        }
        groups
    }

    pub fn into_candidates(self) -> Vec<AssignmentCandidate> {
        self.candidates
    }
}

/// Delay of one route tier under a buffer depth (ms).
pub fn tier_delay_ms(
    topology: &dyn TopologyView,
    tier: &RouteTier,
    buffer_depth: u32,
) -> PlacementResult<f64> {
    let mut delay = tier.propagation_delay_ms;
    for link_id in &tier.links {
        let link = topology.link(*link_id)?;
        let transmission = PACKET_SIZE_BITS / (link.port_capacity_gbps() * 1e9) * 1e3;
        delay += SWITCHING_DELAY_MS + transmission + buffer_depth as f64 * transmission;
    }
    Ok(delay)
}

/// Function-to-tier mapping for a split on a route.
///
/// A function goes to the CU host when the route has a backhaul tier and the
/// split puts it on the CU, else to the DU host under the same rule, else to
/// the RU host.
pub fn place_functions(
    route: &Route,
    split: &SplitConfiguration,
    chain: &FunctionChain,
) -> Vec<FunctionPlacement> {
    chain
        .functions()
        .iter()
        .filter_map(|&function| {
            let tier = [Tier::Cu, Tier::Du, Tier::Ru].into_iter().find(|&t| {
                route.has_tier(t) && split.functions.get(t).contains(&function)
            })?;
            let host = route.tier(tier)?;
            Some(FunctionPlacement {
                function,
                tier,
                node: host.node,
                hardware: host.hardware,
            })
        })
        .collect()
}

type RouteResult = PlacementResult<(Vec<AssignmentCandidate>, Vec<Rejection>)>;

/// Enumerates feasible (route, split, base station) triples.
pub struct FeasibleAssignmentEnumerator<'a> {
    topology: &'a dyn TopologyView,
    catalog: &'a SplitCatalog,
    chain: &'a FunctionChain,
    load: &'a LoadSnapshot,
    throughput_bps: f64,
}

impl<'a> FeasibleAssignmentEnumerator<'a> {
    pub fn new(
        topology: &'a dyn TopologyView,
        catalog: &'a SplitCatalog,
        chain: &'a FunctionChain,
        load: &'a LoadSnapshot,
        throughput_bps: f64,
    ) -> Self {
        Self {
            topology,
            catalog,
            chain,
            load,
            throughput_bps,
        }
    }

    /// Enumerate candidates; fails when any base station ends up with none.
    pub fn enumerate(&self) -> PlacementResult<CandidateSet> {
        let set = self.enumerate_all()?;
        let groups = set.by_base_station();
        for bs in self.topology.base_station_keys() {
            if !groups.contains_key(&bs) {
                return Err(PlacementError::InfeasibleTopology {
                    base_station: bs,
                    rejections: set.rejections(bs).to_vec(),
                });
            }
        }
        Ok(set)
    }

    /// Enumerate candidates without checking coverage.
    pub fn enumerate_all(&self) -> PlacementResult<CandidateSet> {
        let routes = self.topology.routes();

        #[cfg(feature = "parallel")]
        let per_route: Vec<RouteResult> = routes.par_iter().map(|r| self.evaluate_route(r)).collect();
        #[cfg(not(feature = "parallel"))]
        let per_route: Vec<RouteResult> = routes.iter().map(|r| self.evaluate_route(r)).collect();

        let mut set = CandidateSet::default();
        for (route, result) in routes.iter().zip(per_route) {
            let (candidates, rejections) = result?;
            set.candidates.extend(candidates);
            if !rejections.is_empty() {
                set.rejections
                    .entry(route.target)
                    .or_default()
                    .extend(rejections);
            }
        }

        tracing::debug!(
            routes = routes.len(),
            candidates = set.len(),
            rejected = set.num_rejections(),
            "enumerated assignment candidates"
        );
        Ok(set)
    }

    fn evaluate_route(&self, route: &Route) -> RouteResult {
        let bs = route.target;
        self.topology.base_station(bs)?;
        let users = self.load.users(bs)? as f64;

        let mut candidates = Vec::new();
        let mut rejections = Vec::new();

        for split in self.catalog.iter() {
            let required = split.required_nodes();
            if route.qty_nodes() != required {
                rejections.push(Rejection {
                    route: route.id,
                    split: split.id,
                    reason: RejectReason::NodeCountMismatch {
                        route_nodes: route.qty_nodes(),
                        required,
                    },
                });
                continue;
            }

            let mut tiers = Vec::new();
            let mut violations = Vec::new();
            for (tier, hop) in route.present_tiers() {
                let delay_ms = tier_delay_ms(self.topology, hop, split.buffer_depth())?;
                let budget_ms = *split.delay_budget_ms.get(tier);
                if delay_ms > budget_ms {
                    violations.push(Rejection {
                        route: route.id,
                        split: split.id,
                        reason: RejectReason::DelayBudget {
                            tier,
                            delay_ms,
                            budget_ms,
                        },
                    });
                    continue;
                }
                tiers.push(TierAssignment {
                    tier,
                    node: hop.node,
                    hardware: hop.hardware,
                    links: hop.links.clone(),
                    delay_ms,
                    bandwidth_gbps: split.bandwidth_overhead.get(tier) * self.throughput_bps * users * 1e-9,
                });
            }

            if !violations.is_empty() {
                rejections.extend(violations);
                continue;
            }

            candidates.push(AssignmentCandidate {
                route: route.id,
                split: split.id,
                base_station: bs,
                tiers,
                placements: place_functions(route, split, self.chain),
            });
        }

        Ok((candidates, rejections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{line_topology, LineOptions};
    use splitplan_core::{ServiceClass, SplitFamily};

    #[test]
    fn test_zero_link_tier_is_propagation_only() {
        let topo = line_topology(&LineOptions::default()).unwrap();
        let route = &topo.routes()[2];
        let cu = route.tier(Tier::Cu).unwrap();
        assert!(cu.links.is_empty());
        let delay = tier_delay_ms(&topo, cu, 2).unwrap();
        assert_eq!(delay, cu.propagation_delay_ms);
    }

    #[test]
    fn test_link_delay_terms() {
        let topo = line_topology(&LineOptions::default()).unwrap();
        let tier = RouteTier::new(
            HardwareKey::new(NodeId::new(0), 1),
            0.1,
            vec![LinkId::new(0)],
        );
        // 10 Gbps port: transmission = 12368 / 1e10 * 1e3 ms
        let transmission = 12_368.0 / 1e10 * 1e3;
        let expected = 0.1 + 0.005 + 3.0 * transmission;
        let delay = tier_delay_ms(&topo, &tier, 2).unwrap();
        assert!((delay - expected).abs() < 1e-12);
    }

    #[test]
    fn test_placement_rule_prefers_cu() {
        let topo = line_topology(&LineOptions::default()).unwrap();
        let chain = FunctionChain::standard();
        let catalog = SplitCatalog::urllc();
        let split = catalog.get(SplitId::new(6)).unwrap();
        let route = topo
            .routes()
            .iter()
            .find(|r| r.qty_nodes() == 3)
            .unwrap();
        let placements = place_functions(route, split, &chain);
        assert_eq!(placements.len(), 9);
        for p in &placements {
            assert_eq!(Some(p.tier), split.tier_of(p.function));
        }
        let f8 = placements
            .iter()
            .find(|p| p.function == FunctionId::new(8))
            .unwrap();
        assert_eq!(f8.node, route.tier(Tier::Cu).unwrap().node);
    }

    #[test]
    fn test_node_count_filter() {
        let topo = line_topology(&LineOptions::default()).unwrap();
        let chain = FunctionChain::standard();
        let catalog = SplitCatalog::urllc();
        let load = topo.load_at(None).unwrap();
        let set = FeasibleAssignmentEnumerator::new(
            &topo,
            &catalog,
            &chain,
            &load,
            ServiceClass::Urllc.throughput_bps(),
        )
        .enumerate()
        .unwrap();

        for c in set.candidates() {
            let route = topo.route(c.route).unwrap();
            let split = catalog.get(c.split).unwrap();
            assert_eq!(route.qty_nodes(), split.required_nodes());
        }
        assert!(set
            .rejections(topo.base_station_keys()[0])
            .iter()
            .any(|r| matches!(r.reason, RejectReason::NodeCountMismatch { .. })));
    }

    #[test]
    fn test_tight_budget_leaves_base_station_uncovered() {
        let topo = line_topology(&LineOptions {
            propagation_ms: 5.0,
            ..LineOptions::default()
        })
        .unwrap();
        let chain = FunctionChain::standard();
        // Only a three-node split with a sub-millisecond midhaul budget.
        let split = SplitConfiguration::new(
            SplitId::new(6),
            SplitFamily::Option7_2,
            splitplan_core::PerTier::new(
                (3..=8).map(FunctionId::new).collect(),
                vec![FunctionId::new(2)],
                vec![FunctionId::new(0), FunctionId::new(1)],
            ),
            &chain,
        )
        .unwrap()
        .with_delay_budget_ms(10.0, 0.5, 0.25);
        let catalog = SplitCatalog::new(vec![split]).unwrap();
        let load = topo.load_at(None).unwrap();

        let err = FeasibleAssignmentEnumerator::new(&topo, &catalog, &chain, &load, 1.0e6)
            .enumerate()
            .unwrap_err();
        match err {
            PlacementError::InfeasibleTopology { rejections, .. } => {
                assert!(rejections
                    .iter()
                    .any(|r| matches!(r.reason, RejectReason::DelayBudget { tier: Tier::Du, .. })));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bandwidth_scales_with_users() {
        let topo = line_topology(&LineOptions {
            users: 3,
            ..LineOptions::default()
        })
        .unwrap();
        let chain = FunctionChain::standard();
        let catalog = SplitCatalog::dran();
        let load = topo.load_at(Some(0)).unwrap();
        let set = FeasibleAssignmentEnumerator::new(&topo, &catalog, &chain, &load, 1.024e6)
            .enumerate()
            .unwrap();
        let c = &set.candidates()[0];
        let fh = c.tier(Tier::Ru).unwrap();
        let overhead = catalog.get(SplitId::new(0)).unwrap().bandwidth_overhead.ru;
        assert!((fh.bandwidth_gbps - overhead * 1.024e6 * 3.0 * 1e-9).abs() < 1e-15);
    }
}
