//! Integration tests for placement rounds on small fixture topologies.
//!
//! Every round here is solved with the exhaustive backend so the expected
//! answer does not depend on an external MILP engine.

use splitplan_algo::ceiling::{count_epsilon, feasible_activations};
use splitplan_algo::test_utils::{line_topology, server, LineOptions};
use splitplan_algo::{
    AssemblyConfig, CostTables, DeploymentLedger, ExhaustiveBackend, FeasibleAssignmentEnumerator,
    LoggingConfig, ModelAssembler, ObjectiveMode, PlacementError, RejectReason, RoundPlanner,
    RoundSequence, ENERGY_SCALE,
};
use splitplan_core::{
    BaseStationKey, BaseStationProfile, CoreError, CoreResult, FunctionChain, FunctionId,
    HardwareKey, HardwareUnit, KeyKind, Link, LinkId, LoadSnapshot, Node, NodeId, NodeSpec,
    PerTier, Route, RouteId, RouteTier, ServiceClass, SplitCatalog, SplitId, Tier, Topology,
    TopologyView,
};
use splitplan_solver_common::{SolveLimits, SolveStatus};
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_new(LoggingConfig::default().directive())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// One site hosting both the hardware and the base station, reached by a
/// single fronthaul tier without links.
fn single_site() -> Topology {
    let bs = BaseStationKey::new(NodeId::new(0), 1);
    let hw = HardwareKey::new(NodeId::new(0), 1);
    Topology::builder()
        .hardware_type(1, server(180.0))
        .base_station_type(1, BaseStationProfile::default())
        .node(
            NodeId::new(0),
            NodeSpec {
                hardware_types: vec![1],
                static_fraction: 0.5,
                base_station_types: vec![1],
            },
        )
        .route(Route::local(RouteId::new(0), bs, RouteTier::new(hw, 0.1, vec![])))
        .load_row(BTreeMap::from([(bs, 1)]))
        .build()
        .unwrap()
}

/// Topology wrapper that pretends one hardware unit does not exist.
struct MissingHardware {
    inner: Topology,
    hidden: HardwareKey,
}

impl TopologyView for MissingHardware {
    fn base_station_keys(&self) -> Vec<BaseStationKey> {
        self.inner.base_station_keys()
    }

    fn node_keys(&self) -> Vec<NodeId> {
        self.inner.node_keys()
    }

    fn hardware_keys(&self) -> Vec<HardwareKey> {
        self.inner
            .hardware_keys()
            .into_iter()
            .filter(|k| *k != self.hidden)
            .collect()
    }

    fn hardware_by_key(&self, key: HardwareKey) -> CoreResult<HardwareUnit> {
        if key == self.hidden {
            return Err(CoreError::unknown(KeyKind::Hardware, key));
        }
        self.inner.hardware_by_key(key)
    }

    fn node(&self, id: NodeId) -> CoreResult<&Node> {
        self.inner.node(id)
    }

    fn link(&self, id: LinkId) -> CoreResult<&Link> {
        self.inner.link(id)
    }

    fn base_station(&self, key: BaseStationKey) -> CoreResult<BaseStationProfile> {
        self.inner.base_station(key)
    }

    fn reference_base_station(&self) -> CoreResult<BaseStationProfile> {
        self.inner.reference_base_station()
    }

    fn routes(&self) -> &[Route] {
        self.inner.routes()
    }

    fn route(&self, id: RouteId) -> CoreResult<&Route> {
        self.inner.route(id)
    }

    fn load_at(&self, timestamp: Option<usize>) -> CoreResult<LoadSnapshot> {
        self.inner.load_at(timestamp)
    }
}

/// Copy of `catalog` with the delay budgets of `tiers` multiplied by `factor`.
fn scale_budgets(catalog: &SplitCatalog, tiers: &[Tier], factor: f64) -> SplitCatalog {
    let scale = |tier: Tier, budget: f64| {
        if tiers.contains(&tier) {
            budget * factor
        } else {
            budget
        }
    };
    let splits = catalog
        .iter()
        .map(|s| {
            let mut s = s.clone();
            let b = s.delay_budget_ms;
            s.delay_budget_ms = PerTier::new(
                scale(Tier::Cu, b.cu),
                scale(Tier::Du, b.du),
                scale(Tier::Ru, b.ru),
            );
            s
        })
        .collect();
    SplitCatalog::new(splits).unwrap()
}

fn power_config() -> AssemblyConfig {
    AssemblyConfig {
        objective: ObjectiveMode::MinimizePower,
        ..AssemblyConfig::default()
    }
}

/// Test that a one-tier route only admits the fully local split and that
/// the round selects it.
#[test]
fn test_one_tier_route_accepts_only_local_split() {
    init_tracing();
    let topo = single_site();
    let chain = FunctionChain::standard();
    let mut splits = SplitCatalog::dran().splits().to_vec();
    splits.extend(
        SplitCatalog::urllc()
            .iter()
            .filter(|s| s.id == SplitId::new(6))
            .cloned(),
    );
    let catalog = SplitCatalog::new(splits).unwrap();

    let load = topo.load_at(None).unwrap();
    let set = FeasibleAssignmentEnumerator::new(
        &topo,
        &catalog,
        &chain,
        &load,
        ServiceClass::default().throughput_bps(),
    )
    .enumerate()
    .unwrap();

    assert_eq!(set.len(), 1, "only the local split fits one node");
    let only = &set.candidates()[0];
    assert_eq!(only.split, SplitId::new(0));
    // no links on the tier: delay is propagation only
    assert_eq!(only.tiers[0].delay_ms, 0.1);

    let bs = BaseStationKey::new(NodeId::new(0), 1);
    let rejections = set.rejections(bs);
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].split, SplitId::new(6));
    assert_eq!(
        rejections[0].reason,
        RejectReason::NodeCountMismatch {
            route_nodes: 1,
            required: 3
        }
    );

    let tables = CostTables::default();
    let backend = ExhaustiveBackend::default();
    let planner = RoundPlanner::new(
        &topo,
        &catalog,
        &chain,
        &tables,
        &backend,
        SolveLimits::default(),
    );
    let outcome = planner
        .solve_round(&Default::default(), AssemblyConfig::default())
        .unwrap();
    assert_eq!(outcome.status, SolveStatus::Optimal);
    assert_eq!(outcome.selections.len(), 1);
    assert_eq!(outcome.selections[0].split, SplitId::new(0));
    assert!(outcome.links.is_empty());
    assert_eq!(outcome.power.network_w, 0.0);
    assert_eq!(outcome.split_tally.get(&SplitId::new(0)), Some(&1));
}

/// Test that tightening every delay budget never adds candidates.
#[test]
fn test_tighter_budgets_never_add_candidates() {
    let topo = line_topology(&LineOptions {
        base_stations: 2,
        ..LineOptions::default()
    })
    .unwrap();
    let chain = FunctionChain::standard();
    let load = topo.load_at(None).unwrap();
    let throughput = ServiceClass::default().throughput_bps();

    let mut previous = usize::MAX;
    for factor in [2.0, 1.0, 0.5, 0.1, 0.01, 0.0] {
        let catalog = scale_budgets(&SplitCatalog::urllc(), &[Tier::Cu, Tier::Du, Tier::Ru], factor);
        let count = FeasibleAssignmentEnumerator::new(&topo, &catalog, &chain, &load, throughput)
            .enumerate_all()
            .unwrap()
            .len();
        assert!(
            count <= previous,
            "factor {} produced {} candidates after {}",
            factor,
            count,
            previous
        );
        previous = count;
    }
    assert_eq!(previous, 0, "a zero budget admits nothing");
}

/// Test that tightening one tier budget at a time never adds candidates
/// for any route of a fixed base station.
#[test]
fn test_single_tier_tightening_is_monotone() {
    let topo = line_topology(&LineOptions {
        base_stations: 2,
        ..LineOptions::default()
    })
    .unwrap();
    let chain = FunctionChain::standard();
    let load = topo.load_at(None).unwrap();
    let throughput = ServiceClass::default().throughput_bps();
    let bs = BaseStationKey::new(NodeId::new(2), 2);
    // second base station: local, DU/RU and CU/DU/RU routes
    let routes = [RouteId::new(3), RouteId::new(4), RouteId::new(5)];

    let counts = |catalog: &SplitCatalog| -> Vec<usize> {
        let set = FeasibleAssignmentEnumerator::new(&topo, catalog, &chain, &load, throughput)
            .enumerate_all()
            .unwrap();
        routes
            .iter()
            .map(|r| {
                set.candidates()
                    .iter()
                    .filter(|c| c.base_station == bs && c.route == *r)
                    .count()
            })
            .collect()
    };
    let baseline = counts(&SplitCatalog::urllc());
    assert!(baseline.iter().all(|&n| n > 0), "every route starts with candidates: {:?}", baseline);

    for tier in [Tier::Cu, Tier::Du, Tier::Ru] {
        let mut previous = baseline.clone();
        for factor in [1.0, 0.5, 0.1, 0.01, 0.0] {
            let current = counts(&scale_budgets(&SplitCatalog::urllc(), &[tier], factor));
            for (i, route) in routes.iter().enumerate() {
                assert!(
                    current[i] <= previous[i],
                    "{:?} factor {} grew {} from {} to {}",
                    tier,
                    factor,
                    route,
                    previous[i],
                    current[i]
                );
            }
            previous = current;
        }

        match tier {
            // the backhaul tier has no links or propagation on this fixture
            Tier::Cu => assert_eq!(previous, baseline, "a zero backhaul budget still fits"),
            // the local route has no midhaul tier
            Tier::Du => assert_eq!(previous, vec![baseline[0], 0, 0], "midhaul routes must drop"),
            Tier::Ru => assert_eq!(previous, vec![0, 0, 0], "every route has a fronthaul tier"),
        }
    }
}

/// Test that an assembler run on budgets nothing can meet fails with the
/// base station and the segments whose budgets were broken.
#[test]
fn test_assembler_reports_broken_budgets() {
    let topo = line_topology(&LineOptions::default()).unwrap();
    let catalog = scale_budgets(&SplitCatalog::urllc(), &[Tier::Cu, Tier::Du, Tier::Ru], 0.01);
    let chain = FunctionChain::standard();
    let tables = CostTables::default();
    let ledger = DeploymentLedger::empty();

    let err = ModelAssembler::new(&topo, &catalog, &chain, &tables, &ledger, AssemblyConfig::default())
        .build()
        .unwrap_err();
    let message = err.to_string();
    match &err {
        PlacementError::InfeasibleTopology {
            base_station,
            rejections,
        } => {
            assert_eq!(*base_station, BaseStationKey::new(NodeId::new(2), 1));
            assert!(
                rejections.iter().any(|r| matches!(
                    r.reason,
                    RejectReason::DelayBudget { tier: Tier::Du, .. }
                )),
                "no midhaul rejection in {:?}",
                rejections
            );
        }
        other => panic!("expected InfeasibleTopology, got {}", other),
    }
    assert!(message.contains("node2_bs1"), "base station missing from: {}", message);
    assert!(message.contains("fronthaul delay"), "fronthaul missing from: {}", message);
    assert!(message.contains("midhaul delay"), "midhaul missing from: {}", message);
    assert!(message.contains("exceeds 0.0025ms"), "broken budget missing from: {}", message);
    assert!(!message.contains("backhaul"), "backhaul met its budget: {}", message);
}

/// Test that a unit loaded below `1/M` of its capacity is still switched on
/// and pays its static power.
#[test]
fn test_light_load_switches_static_power_on() {
    init_tracing();
    let topo = line_topology(&LineOptions {
        gops_capacity: 10_000.0,
        ..LineOptions::default()
    })
    .unwrap();
    let catalog = SplitCatalog::dran();
    let chain = FunctionChain::standard();
    let tables = CostTables::default();
    let backend = ExhaustiveBackend::default();
    let limits = SolveLimits::default();
    let planner = RoundPlanner::new(&topo, &catalog, &chain, &tables, &backend, limits);
    let key = HardwareKey::new(NodeId::new(2), 1);

    let artifact = planner.assemble(&DeploymentLedger::empty(), power_config()).unwrap();
    let outcome = artifact.solve(&backend, &limits).unwrap();
    assert_eq!(outcome.status, SolveStatus::Optimal);

    let y = artifact.index.hardware_activation[&key];
    assert_eq!(outcome.value(y), 1.0, "loaded unit must be active");

    let load = artifact.index.expressions.hardware_load[&key].eval_with(
        &artifact.problem.complete(&outcome.values),
    );
    let fraction = load / 10_000.0;
    let m = artifact.index.normalizer;
    assert!(fraction > 0.0);
    assert!(fraction < count_epsilon(m), "load {} is not below 1/{}", fraction, m);
    assert!(
        feasible_activations(fraction, count_epsilon(m), 1).is_empty(),
        "the count tolerance would leave no valid activation"
    );

    let mut off = artifact.problem.complete(&outcome.values);
    off.insert(y, 0.0);
    let low = artifact.problem.constraint(&format!("low_ceil_{}", key)).unwrap();
    assert!(low.violation(&off) > 0.0, "switching a loaded unit off must break the ceiling");
    let high = artifact.problem.constraint(&format!("high_ceil_{}", key)).unwrap();
    assert!(
        high.is_satisfied_by(&artifact.problem.complete(&outcome.values), 1e-9),
        "an active light unit must satisfy the upper ceiling"
    );

    let round = planner.solve_round(&DeploymentLedger::empty(), power_config()).unwrap();
    let report = round.hardware.iter().find(|h| h.key == key).unwrap();
    assert!(report.active);
    let static_w = topo.hardware_by_key(key).unwrap().static_power_w();
    assert!(static_w > 0.0);
    assert!(
        round.power.ran_w > static_w,
        "RAN power {} W must include {} W static power",
        round.power.ran_w,
        static_w
    );
}

/// Test that video traffic sizes each tier with the selected split's own
/// bandwidth overhead.
#[test]
fn test_video_bandwidth_uses_split_overhead() {
    let users = 3;
    let topo = line_topology(&LineOptions {
        users,
        gops_capacity: 10_000.0,
        ..LineOptions::default()
    })
    .unwrap();
    let service = ServiceClass::Video1080p;
    let catalog = SplitCatalog::for_service(service);
    let chain = FunctionChain::standard();
    let split = catalog.get(SplitId::new(9)).unwrap();
    let throughput = service.throughput_bps();
    assert_ne!(
        split.bandwidth_overhead.ru,
        SplitCatalog::urllc().get(SplitId::new(9)).unwrap().bandwidth_overhead.ru,
        "video split 9 carries its own fronthaul overhead"
    );

    let load = topo.load_at(Some(0)).unwrap();
    let set = FeasibleAssignmentEnumerator::new(&topo, &catalog, &chain, &load, throughput)
        .enumerate()
        .unwrap();
    assert_eq!(set.len(), 1, "split 9 only fits the DU/RU route");
    let candidate = &set.candidates()[0];
    let expected = |tier: Tier| split.bandwidth_overhead.get(tier) * throughput * users as f64 * 1e-9;
    for tier in [Tier::Du, Tier::Ru] {
        let got = candidate.tier(tier).unwrap().bandwidth_gbps;
        assert!(
            (got - expected(tier)).abs() < 1e-12,
            "{:?} carries {} Gbps, expected {}",
            tier,
            got,
            expected(tier)
        );
    }

    let tables = CostTables::default();
    let backend = ExhaustiveBackend::default();
    let config = AssemblyConfig {
        service,
        timestamp: Some(0),
        ..AssemblyConfig::default()
    };
    let outcome = RoundPlanner::new(
        &topo,
        &catalog,
        &chain,
        &tables,
        &backend,
        SolveLimits::default(),
    )
    .solve_round(&DeploymentLedger::empty(), config)
    .unwrap();
    let midhaul = outcome.links[&LinkId::new(0)].usage_gbps;
    let fronthaul = outcome.links[&LinkId::new(1)].usage_gbps;
    assert!((midhaul - expected(Tier::Du)).abs() < 1e-9, "link0 carries {}", midhaul);
    assert!((fronthaul - expected(Tier::Ru)).abs() < 1e-9, "link1 carries {}", fronthaul);
}

/// Test that the power objective scales watts to joules while the reported
/// expressions stay in watts.
#[test]
fn test_power_objective_scales_watts_to_joules() {
    let topo = line_topology(&LineOptions::default()).unwrap();
    let catalog = SplitCatalog::urllc();
    let chain = FunctionChain::standard();
    let tables = CostTables::default();
    let backend = ExhaustiveBackend::default();
    let outcome = RoundPlanner::new(
        &topo,
        &catalog,
        &chain,
        &tables,
        &backend,
        SolveLimits::default(),
    )
    .solve_round(&DeploymentLedger::empty(), power_config())
    .unwrap();

    let p = outcome.power;
    assert!(p.ran_w > 0.0 && p.ran_w < 1_000.0, "RAN power {} is not in watts", p.ran_w);
    assert_eq!(p.ran_energy_j, p.ran_w * ENERGY_SCALE);
    assert_eq!(p.network_energy_j, p.network_w * ENERGY_SCALE);
    let expected = (p.ran_w + p.network_w) * ENERGY_SCALE + p.migration_j;
    assert!(
        (outcome.objective - expected).abs() <= 1e-9 * expected.abs().max(1.0),
        "objective {} differs from scaled energy {}",
        outcome.objective,
        expected
    );
}

/// Test that repeating a round on an unchanged load keeps every placement
/// and prices no migration.
#[test]
fn test_unchanged_placement_has_zero_migration() {
    init_tracing();
    let topo = line_topology(&LineOptions {
        base_stations: 2,
        ..LineOptions::default()
    })
    .unwrap();
    let catalog = SplitCatalog::urllc();
    let chain = FunctionChain::standard();
    let tables = CostTables::default();
    let backend = ExhaustiveBackend::default();
    let planner = RoundPlanner::new(
        &topo,
        &catalog,
        &chain,
        &tables,
        &backend,
        SolveLimits::default(),
    );
    let mut rounds = RoundSequence::new(planner, power_config());

    let first = rounds.step(Some(0)).unwrap();
    assert!(first.migrations > 0, "first round deploys from scratch");
    assert!(first.power.migration_j > 0.0);

    let second = rounds.step(Some(0)).unwrap();
    let picks = |o: &splitplan_algo::RoundOutcome| {
        o.selections
            .iter()
            .map(|c| (c.base_station, c.route, c.split))
            .collect::<Vec<_>>()
    };
    assert_eq!(picks(&first), picks(&second));
    assert_eq!(second.migrations, 0);
    assert_eq!(second.power.migration_j, 0.0);
    assert_eq!(rounds.ledger(), &second.next_ledger);
}

/// Test that a solved round activates exactly one candidate per base
/// station and reaches the full sharing score.
#[test]
fn test_single_assignment_per_base_station() {
    let topo = line_topology(&LineOptions {
        base_stations: 2,
        ..LineOptions::default()
    })
    .unwrap();
    let catalog = SplitCatalog::urllc();
    let chain = FunctionChain::standard();
    let tables = CostTables::default();
    let backend = ExhaustiveBackend::default();
    let limits = SolveLimits::default();
    let planner = RoundPlanner::new(&topo, &catalog, &chain, &tables, &backend, limits);

    let ledger = Default::default();
    let artifact = planner.assemble(&ledger, AssemblyConfig::default()).unwrap();
    let outcome = artifact.solve(&backend, &limits).unwrap();
    assert_eq!(outcome.status, SolveStatus::Optimal);

    for (bs, members) in &artifact.index.groups {
        let selected: f64 = members
            .iter()
            .map(|&i| outcome.value(artifact.index.indicators[i]))
            .sum();
        assert_eq!(selected, 1.0, "{} must pick one candidate", bs);
    }
    // two base stations sharing all seven VNF instances
    assert_eq!(outcome.objective, 7.0);
}

/// Test that the chosen placement never loads hardware or links past
/// their capacity.
#[test]
fn test_solved_round_respects_capacity() {
    let chain = FunctionChain::standard();
    let tables = CostTables::default();
    let backend = ExhaustiveBackend::default();

    // total demand of one base station with every VNF on its radio site
    let single = line_topology(&LineOptions::default()).unwrap();
    let dran = SplitCatalog::dran();
    let per_bs = RoundPlanner::new(
        &single,
        &dran,
        &chain,
        &tables,
        &backend,
        SolveLimits::default(),
    )
    .solve_round(&Default::default(), AssemblyConfig::default())
    .unwrap()
    .hardware
    .iter()
    .map(|h| h.usage_gops)
    .sum::<f64>();
    assert!(per_bs > 0.0);

    // one full chain fits a server, two do not
    let topo = line_topology(&LineOptions {
        base_stations: 2,
        gops_capacity: 1.5 * per_bs,
        ..LineOptions::default()
    })
    .unwrap();
    let catalog = SplitCatalog::urllc();
    let outcome = RoundPlanner::new(
        &topo,
        &catalog,
        &chain,
        &tables,
        &backend,
        SolveLimits::default(),
    )
    .solve_round(&Default::default(), AssemblyConfig::default())
    .unwrap();

    for hw in &outcome.hardware {
        assert!(
            hw.usage_gops <= hw.capacity_gops + 1e-6,
            "{} carries {} of {} GOPS",
            hw.key,
            hw.usage_gops,
            hw.capacity_gops
        );
        assert_eq!(hw.active, hw.usage_gops > 0.0);
    }
    for (id, link) in &outcome.links {
        assert!(link.usage_gbps <= link.capacity_gbps + 1e-6, "{} overloaded", id);
    }
}

/// Test that a base station without any route is reported by key.
#[test]
fn test_uncovered_base_station_is_infeasible() {
    let opts = LineOptions::default();
    let bs1 = BaseStationKey::new(NodeId::new(2), 1);
    let bs2 = BaseStationKey::new(NodeId::new(2), 2);
    let topo = Topology::builder()
        .hardware_type(1, server(180.0))
        .base_station_type(1, BaseStationProfile::default())
        .node(
            NodeId::new(2),
            NodeSpec {
                hardware_types: vec![1],
                static_fraction: 0.5,
                base_station_types: vec![1, 1],
            },
        )
        .route(Route::local(
            RouteId::new(0),
            bs1,
            RouteTier::new(HardwareKey::new(NodeId::new(2), 1), opts.propagation_ms, vec![]),
        ))
        .build()
        .unwrap();

    let catalog = SplitCatalog::urllc();
    let chain = FunctionChain::standard();
    let tables = CostTables::default();
    let backend = ExhaustiveBackend::default();
    let planner = RoundPlanner::new(
        &topo,
        &catalog,
        &chain,
        &tables,
        &backend,
        SolveLimits::default(),
    );

    match planner.solve_round(&Default::default(), AssemblyConfig::default()) {
        Err(PlacementError::InfeasibleTopology {
            base_station,
            rejections,
        }) => {
            assert_eq!(base_station, bs2);
            assert!(rejections.is_empty());
        }
        other => panic!("expected InfeasibleTopology, got {:?}", other.map(|o| o.status)),
    }
}

/// Test that a hardware key missing from the topology surfaces as an
/// unknown-key error instead of being skipped.
#[test]
fn test_unknown_hardware_is_reported() {
    let topo = MissingHardware {
        inner: line_topology(&LineOptions::default()).unwrap(),
        hidden: HardwareKey::new(NodeId::new(2), 1),
    };
    let catalog = SplitCatalog::dran();
    let chain = FunctionChain::standard();
    let tables = CostTables::default();
    let backend = ExhaustiveBackend::default();
    let planner = RoundPlanner::new(
        &topo,
        &catalog,
        &chain,
        &tables,
        &backend,
        SolveLimits::default(),
    );

    let err = planner
        .assemble(&Default::default(), AssemblyConfig::default())
        .unwrap_err();
    assert!(
        matches!(
            err,
            PlacementError::Core(CoreError::UnknownKey {
                kind: KeyKind::Hardware,
                ..
            })
        ),
        "unexpected error: {}",
        err
    );
}

/// Test that a VNF without a GOPS share aborts model construction.
#[test]
fn test_missing_share_is_fatal() {
    let topo = line_topology(&LineOptions::default()).unwrap();
    let catalog = SplitCatalog::urllc();
    let chain = FunctionChain::standard();
    let mut tables = CostTables::default();
    tables.shares.remove(&FunctionId::new(5));
    let backend = ExhaustiveBackend::default();
    let planner = RoundPlanner::new(
        &topo,
        &catalog,
        &chain,
        &tables,
        &backend,
        SolveLimits::default(),
    );

    let err = planner
        .solve_round(&Default::default(), AssemblyConfig::default())
        .unwrap_err();
    match err {
        PlacementError::MissingCostData { function, .. } => {
            assert_eq!(function, FunctionId::new(5))
        }
        other => panic!("expected MissingCostData, got {}", other),
    }
}

/// Test the activation law for M = 100: any positive count forces the
/// activation on, a zero count forces it off.
#[test]
fn test_ceiling_law_for_hundred_pairs() {
    let eps = count_epsilon(100);
    assert_eq!(eps, 0.01);
    assert_eq!(feasible_activations(0.0, eps, 1), vec![0]);
    for count in 1..=100 {
        let q = count as f64 * eps;
        assert_eq!(
            feasible_activations(q, eps, 1),
            vec![1],
            "count {} must switch the instance on",
            count
        );
    }
}

/// Test that a round outcome serializes for downstream reporting.
#[test]
fn test_outcome_serializes() {
    let topo = line_topology(&LineOptions::default()).unwrap();
    let catalog = SplitCatalog::urllc();
    let chain = FunctionChain::standard();
    let tables = CostTables::default();
    let backend = ExhaustiveBackend::default();
    let outcome = RoundPlanner::new(
        &topo,
        &catalog,
        &chain,
        &tables,
        &backend,
        SolveLimits::default(),
    )
    .solve_round(&Default::default(), power_config())
    .unwrap();

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["selections"].as_array().map(|s| s.len()), Some(1));
    assert!(json["power"]["total_energy_j"].as_f64().unwrap() > 0.0);
    assert!(json["next_ledger"]["entries"].is_array());
}
