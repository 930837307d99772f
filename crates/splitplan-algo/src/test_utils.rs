//! Small fixture topologies shared by unit and integration tests.
//!
//! The line fixture is three sites in a row:
//!
//! ```text
//!   node0 (core, CU) ── link0 ── node1 (DU) ── link1 ── node2 (RU, base stations)
//! ```
//!
//! Every base station gets three routes, in id order: a local route (all on
//! node2), a DU/RU route and a CU/DU/RU route.

use splitplan_core::{
    BaseStationKey, BaseStationProfile, CoreResult, HardwareKey, HardwareSpec, LinkId, LinkSpec, NodeId,
    NodeSpec, Route, RouteId, RouteTier, Topology,
};
use std::collections::BTreeMap;

/// Knobs for [`line_topology`].
#[derive(Debug, Clone)]
pub struct LineOptions {
    pub base_stations: usize,
    /// Users per base station in load row 0
    pub users: u32,
    /// Propagation delay on every linked tier (ms)
    pub propagation_ms: f64,
    pub port_capacity_gbps: f64,
    pub max_ports: u32,
    pub gops_capacity: f64,
    pub static_fraction: f64,
    pub hardware_per_node: usize,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            base_stations: 1,
            users: 1,
            propagation_ms: 0.05,
            port_capacity_gbps: 10.0,
            max_ports: 4,
            gops_capacity: 180.0,
            static_fraction: 0.5,
            hardware_per_node: 1,
        }
    }
}

pub fn server(gops_capacity: f64) -> HardwareSpec {
    HardwareSpec {
        cpu_cores: 1,
        power_w: 94.8,
        gops_capacity,
    }
}

pub fn fibre(from: usize, to: usize, opts: &LineOptions) -> LinkSpec {
    LinkSpec {
        from: NodeId::new(from),
        to: NodeId::new(to),
        port_capacity_gbps: opts.port_capacity_gbps,
        max_ports: opts.max_ports,
        transceiver_power_w: 1.5,
        switch_port_power_w: 3.0,
        from_is_switch: true,
        to_is_switch: true,
    }
}

/// Routes of one base station on the line fixture, ids starting at `first_id`.
pub fn line_routes(bs: BaseStationKey, first_id: usize, opts: &LineOptions) -> Vec<Route> {
    let hw = |node: usize| HardwareKey::new(NodeId::new(node), 1);
    let p = opts.propagation_ms;

    let local = Route::local(
        RouteId::new(first_id),
        bs,
        RouteTier::new(hw(2), 2.0 * p, vec![LinkId::new(0), LinkId::new(1)]),
    );
    let two_tier = Route {
        id: RouteId::new(first_id + 1),
        target: bs,
        tiers: splitplan_core::PerTier::new(
            None,
            Some(RouteTier::new(hw(1), p, vec![LinkId::new(0)])),
            Some(RouteTier::new(hw(2), p, vec![LinkId::new(1)])),
        ),
    };
    let three_tier = Route {
        id: RouteId::new(first_id + 2),
        target: bs,
        tiers: splitplan_core::PerTier::new(
            Some(RouteTier::new(hw(0), 0.0, vec![])),
            Some(RouteTier::new(hw(1), p, vec![LinkId::new(0)])),
            Some(RouteTier::new(hw(2), p, vec![LinkId::new(1)])),
        ),
    };
    vec![local, two_tier, three_tier]
}

/// Build the three-site line fixture.
pub fn line_topology(opts: &LineOptions) -> CoreResult<Topology> {
    let hardware = vec![1; opts.hardware_per_node];
    let bs_keys: Vec<BaseStationKey> = (1..=opts.base_stations)
        .map(|slot| BaseStationKey::new(NodeId::new(2), slot))
        .collect();

    let mut builder = Topology::builder()
        .hardware_type(1, server(opts.gops_capacity))
        .base_station_type(1, BaseStationProfile::default());
    for node in 0..3 {
        builder = builder.node(
            NodeId::new(node),
            NodeSpec {
                hardware_types: hardware.clone(),
                static_fraction: opts.static_fraction,
                base_station_types: if node == 2 {
                    vec![1; opts.base_stations]
                } else {
                    vec![]
                },
            },
        );
    }
    builder = builder
        .link(LinkId::new(0), fibre(0, 1, opts))
        .link(LinkId::new(1), fibre(1, 2, opts));

    for (i, bs) in bs_keys.iter().enumerate() {
        builder = builder.routes(line_routes(*bs, 3 * i, opts));
    }

    let row: BTreeMap<BaseStationKey, u32> = bs_keys.iter().map(|k| (*k, opts.users)).collect();
    builder.load_row(row).build()
}
