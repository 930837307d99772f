//! Read-only topology view consumed by the model builder.
//!
//! The [`TopologyView`] trait is the contract the placement model depends on.
//! [`Topology`] implements it over an in-memory undirected graph (petgraph)
//! whose nodes are sites and whose edges are transport links. Routes are
//! supplied pre-computed; this crate never searches for paths.

use crate::error::{CoreError, CoreResult, KeyKind};
use crate::split::{PerTier, Tier};
use crate::{BaseStationKey, HardwareKey, LinkId, NodeId, RouteId};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Compute hardware archetype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardwareSpec {
    pub cpu_cores: u32,
    /// Peak power draw (W)
    pub power_w: f64,
    /// Processing capacity (GOPS)
    pub gops_capacity: f64,
}

/// Radio parameters of a base-station archetype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseStationProfile {
    pub num_antennas: u32,
    pub num_subcarriers: u32,
    pub num_used_subcarriers: u32,
    pub sampling_frequency_hz: f64,
    pub ofdm_symbol_duration_s: f64,
    /// Coherence block length (samples)
    pub tau_c: u32,
    /// Pilot length (samples)
    pub tau_p: u32,
    pub bit_quantization: u32,
    pub spectral_efficiency: f64,
}

impl BaseStationProfile {
    /// Data samples per coherence block.
    pub fn tau_d(&self) -> u32 {
        self.tau_c.saturating_sub(self.tau_p)
    }
}

impl Default for BaseStationProfile {
    /// 4-antenna, 20 MHz LTE-numerology cell.
    fn default() -> Self {
        Self {
            num_antennas: 4,
            num_subcarriers: 2048,
            num_used_subcarriers: 1200,
            sampling_frequency_hz: 30.72e6,
            ofdm_symbol_duration_s: 71.4e-6,
            tau_c: 192,
            tau_p: 8,
            bit_quantization: 12,
            spectral_efficiency: 1.0,
        }
    }
}

/// Node description passed to [`TopologyBuilder::node`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Hardware type ids, one entry per installed unit
    pub hardware_types: Vec<u32>,
    /// Share of hardware power drawn regardless of load
    pub static_fraction: f64,
    /// Base-station type ids, one entry per attached base station
    pub base_station_types: Vec<u32>,
}

/// A site in the transport network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub hardware_types: Vec<u32>,
    pub static_fraction: f64,
    pub base_station_types: Vec<u32>,
}

impl Node {
    pub fn has_hardware(&self) -> bool {
        !self.hardware_types.is_empty()
    }

    pub fn has_base_station(&self) -> bool {
        !self.base_station_types.is_empty()
    }

    pub fn hardware_keys(&self) -> impl Iterator<Item = HardwareKey> + '_ {
        (1..=self.hardware_types.len()).map(move |slot| HardwareKey::new(self.id, slot))
    }

    pub fn base_station_keys(&self) -> impl Iterator<Item = BaseStationKey> + '_ {
        (1..=self.base_station_types.len()).map(move |slot| BaseStationKey::new(self.id, slot))
    }
}

/// A hardware unit resolved against its node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HardwareUnit {
    pub key: HardwareKey,
    pub spec: HardwareSpec,
    pub static_fraction: f64,
}

impl HardwareUnit {
    pub fn gops_capacity(&self) -> f64 {
        self.spec.gops_capacity
    }

    /// Power drawn whenever the unit is switched on (W).
    pub fn static_power_w(&self) -> f64 {
        self.spec.power_w * self.static_fraction
    }

    /// Power drawn at full utilization on top of the static share (W).
    pub fn dynamic_power_w(&self) -> f64 {
        self.spec.power_w * (1.0 - self.static_fraction)
    }
}

/// Link description passed to [`TopologyBuilder::link`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub from: NodeId,
    pub to: NodeId,
    /// Capacity of one port (Gbps)
    pub port_capacity_gbps: f64,
    pub max_ports: u32,
    /// Pluggable transceiver power, per end (W)
    pub transceiver_power_w: f64,
    /// Switch port power, per switched end (W)
    pub switch_port_power_w: f64,
    pub from_is_switch: bool,
    pub to_is_switch: bool,
}

/// A transport link between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    #[serde(flatten)]
    pub spec: LinkSpec,
}

impl Link {
    pub fn port_capacity_gbps(&self) -> f64 {
        self.spec.port_capacity_gbps
    }

    /// Total usable capacity across all ports (Gbps).
    pub fn max_capacity_gbps(&self) -> f64 {
        self.spec.port_capacity_gbps * self.spec.max_ports as f64
    }

    pub fn switch_endpoints(&self) -> u32 {
        u32::from(self.spec.from_is_switch) + u32::from(self.spec.to_is_switch)
    }

    /// Power of one active port: a transceiver at each end plus switch ports.
    pub fn port_power_w(&self) -> f64 {
        2.0 * self.spec.transceiver_power_w
            + self.spec.switch_port_power_w * self.switch_endpoints() as f64
    }
}

/// One tier of a route: the hosting node and the links that reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTier {
    pub node: NodeId,
    pub hardware: HardwareKey,
    /// Fibre propagation delay over the segment (ms)
    pub propagation_delay_ms: f64,
    pub links: Vec<LinkId>,
}

impl RouteTier {
    pub fn new(hardware: HardwareKey, propagation_delay_ms: f64, links: Vec<LinkId>) -> Self {
        Self {
            node: hardware.node,
            hardware,
            propagation_delay_ms,
            links,
        }
    }
}

/// A pre-computed path from the core towards one base station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub target: BaseStationKey,
    pub tiers: PerTier<Option<RouteTier>>,
}

impl Route {
    /// Create a route. The RU tier is mandatory and a CU tier needs a DU tier.
    pub fn new(
        id: RouteId,
        target: BaseStationKey,
        ru: RouteTier,
        du: Option<RouteTier>,
        cu: Option<RouteTier>,
    ) -> CoreResult<Self> {
        if cu.is_some() && du.is_none() {
            return Err(CoreError::Validation(format!(
                "route {} has a backhaul tier without a midhaul tier",
                id.value()
            )));
        }
        Ok(Self {
            id,
            target,
            tiers: PerTier::new(cu, du, Some(ru)),
        })
    }

    /// Single-node route: everything on the radio-unit host.
    pub fn local(id: RouteId, target: BaseStationKey, ru: RouteTier) -> Self {
        Self {
            id,
            target,
            tiers: PerTier::new(None, None, Some(ru)),
        }
    }

    pub fn is_destination(&self, bs: BaseStationKey) -> bool {
        self.target == bs
    }

    pub fn tier(&self, tier: Tier) -> Option<&RouteTier> {
        self.tiers.get(tier).as_ref()
    }

    pub fn has_tier(&self, tier: Tier) -> bool {
        self.tiers.get(tier).is_some()
    }

    /// Present tiers in CU, DU, RU order.
    pub fn present_tiers(&self) -> impl Iterator<Item = (Tier, &RouteTier)> {
        Tier::ALL
            .into_iter()
            .filter_map(move |t| self.tier(t).map(|rt| (t, rt)))
    }

    /// Number of physical nodes spanned.
    pub fn qty_nodes(&self) -> usize {
        self.present_tiers().count()
    }

    /// Hosting nodes ordered from the core towards the antenna.
    pub fn sequence(&self) -> Vec<NodeId> {
        self.present_tiers().map(|(_, t)| t.node).collect()
    }

    pub fn hardware_keys(&self) -> Vec<HardwareKey> {
        self.present_tiers().map(|(_, t)| t.hardware).collect()
    }
}

/// Active users per base station for one traffic snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadSnapshot {
    users: BTreeMap<BaseStationKey, u32>,
}

impl LoadSnapshot {
    pub fn new(users: BTreeMap<BaseStationKey, u32>) -> Self {
        Self { users }
    }

    /// One user at every base station.
    pub fn uniform<I: IntoIterator<Item = BaseStationKey>>(keys: I, users: u32) -> Self {
        Self {
            users: keys.into_iter().map(|k| (k, users)).collect(),
        }
    }

    pub fn users(&self, bs: BaseStationKey) -> CoreResult<u32> {
        self.users
            .get(&bs)
            .copied()
            .ok_or_else(|| CoreError::unknown(KeyKind::Load, bs))
    }

    pub fn iter(&self) -> impl Iterator<Item = (BaseStationKey, u32)> + '_ {
        self.users.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Read-only queries the model builder needs from a topology.
pub trait TopologyView: Sync {
    fn base_station_keys(&self) -> Vec<BaseStationKey>;

    fn node_keys(&self) -> Vec<NodeId>;

    fn hardware_keys(&self) -> Vec<HardwareKey>;

    fn hardware_by_key(&self, key: HardwareKey) -> CoreResult<HardwareUnit>;

    fn node(&self, id: NodeId) -> CoreResult<&Node>;

    fn link(&self, id: LinkId) -> CoreResult<&Link>;

    fn base_station(&self, key: BaseStationKey) -> CoreResult<BaseStationProfile>;

    /// Profile used to price per-function compute demand for every base station.
    fn reference_base_station(&self) -> CoreResult<BaseStationProfile>;

    fn routes(&self) -> &[Route];

    fn route(&self, id: RouteId) -> CoreResult<&Route>;

    /// Users per base station at `timestamp`; `None` means one user everywhere.
    fn load_at(&self, timestamp: Option<usize>) -> CoreResult<LoadSnapshot>;
}

/// Summary counts for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologyStats {
    pub num_nodes: usize,
    pub num_links: usize,
    pub num_hardware: usize,
    pub num_base_stations: usize,
    pub num_routes: usize,
    pub num_timestamps: usize,
}

impl std::fmt::Display for TopologyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} nodes, {} links, {} hardware units, {} base stations, {} routes, {} load snapshots",
            self.num_nodes,
            self.num_links,
            self.num_hardware,
            self.num_base_stations,
            self.num_routes,
            self.num_timestamps
        )
    }
}

/// In-memory topology backed by an undirected petgraph graph.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: UnGraph<NodeId, LinkId>,
    node_index: HashMap<NodeId, NodeIndex>,
    nodes: BTreeMap<NodeId, Node>,
    hardware_types: BTreeMap<u32, HardwareSpec>,
    base_station_types: BTreeMap<u32, BaseStationProfile>,
    reference_type: Option<u32>,
    links: BTreeMap<LinkId, Link>,
    routes: Vec<Route>,
    route_index: HashMap<RouteId, usize>,
    load: Vec<BTreeMap<BaseStationKey, u32>>,
}

impl Topology {
    pub fn builder() -> TopologyBuilder {
        TopologyBuilder::new()
    }

    /// Links incident to a node.
    pub fn links_at(&self, node: NodeId) -> CoreResult<Vec<LinkId>> {
        let idx = self
            .node_index
            .get(&node)
            .ok_or_else(|| CoreError::unknown(KeyKind::Node, node))?;
        let mut links: Vec<LinkId> = self.graph.edges(*idx).map(|e| *e.weight()).collect();
        links.sort();
        Ok(links)
    }

    /// Whether every node can reach every other node.
    pub fn is_connected(&self) -> bool {
        petgraph::algo::connected_components(&self.graph) <= 1
    }

    pub fn num_timestamps(&self) -> usize {
        self.load.len()
    }

    pub fn stats(&self) -> TopologyStats {
        TopologyStats {
            num_nodes: self.nodes.len(),
            num_links: self.links.len(),
            num_hardware: self.nodes.values().map(|n| n.hardware_types.len()).sum(),
            num_base_stations: self
                .nodes
                .values()
                .map(|n| n.base_station_types.len())
                .sum(),
            num_routes: self.routes.len(),
            num_timestamps: self.load.len(),
        }
    }
}

impl TopologyView for Topology {
    fn base_station_keys(&self) -> Vec<BaseStationKey> {
        self.nodes
            .values()
            .flat_map(|n| n.base_station_keys())
            .collect()
    }

    fn node_keys(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn hardware_keys(&self) -> Vec<HardwareKey> {
        self.nodes.values().flat_map(|n| n.hardware_keys()).collect()
    }

    fn hardware_by_key(&self, key: HardwareKey) -> CoreResult<HardwareUnit> {
        let node = self
            .nodes
            .get(&key.node)
            .ok_or_else(|| CoreError::unknown(KeyKind::Hardware, key))?;
        let type_id = key
            .slot
            .checked_sub(1)
            .and_then(|i| node.hardware_types.get(i))
            .ok_or_else(|| CoreError::unknown(KeyKind::Hardware, key))?;
        let spec = self
            .hardware_types
            .get(type_id)
            .ok_or_else(|| CoreError::unknown(KeyKind::HardwareType, type_id))?;
        Ok(HardwareUnit {
            key,
            spec: *spec,
            static_fraction: node.static_fraction,
        })
    }

    fn node(&self, id: NodeId) -> CoreResult<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| CoreError::unknown(KeyKind::Node, id))
    }

    fn link(&self, id: LinkId) -> CoreResult<&Link> {
        self.links
            .get(&id)
            .ok_or_else(|| CoreError::unknown(KeyKind::Link, id))
    }

    fn base_station(&self, key: BaseStationKey) -> CoreResult<BaseStationProfile> {
        let node = self
            .nodes
            .get(&key.node)
            .ok_or_else(|| CoreError::unknown(KeyKind::BaseStation, key))?;
        let type_id = key
            .slot
            .checked_sub(1)
            .and_then(|i| node.base_station_types.get(i))
            .ok_or_else(|| CoreError::unknown(KeyKind::BaseStation, key))?;
        self.base_station_types
            .get(type_id)
            .copied()
            .ok_or_else(|| CoreError::unknown(KeyKind::BaseStationType, type_id))
    }

    fn reference_base_station(&self) -> CoreResult<BaseStationProfile> {
        let type_id = self
            .reference_type
            .or_else(|| self.base_station_types.keys().next().copied())
            .ok_or_else(|| CoreError::unknown(KeyKind::BaseStationType, "reference"))?;
        self.base_station_types
            .get(&type_id)
            .copied()
            .ok_or_else(|| CoreError::unknown(KeyKind::BaseStationType, type_id))
    }

    fn routes(&self) -> &[Route] {
        &self.routes
    }

    fn route(&self, id: RouteId) -> CoreResult<&Route> {
        self.route_index
            .get(&id)
            .map(|&i| &self.routes[i])
            .ok_or_else(|| CoreError::unknown(KeyKind::Route, id))
    }

    fn load_at(&self, timestamp: Option<usize>) -> CoreResult<LoadSnapshot> {
        match timestamp {
            None => Ok(LoadSnapshot::uniform(self.base_station_keys(), 1)),
            Some(t) => self
                .load
                .get(t)
                .cloned()
                .map(LoadSnapshot::new)
                .ok_or_else(|| CoreError::unknown(KeyKind::Timestamp, t)),
        }
    }
}

/// Builder that validates every cross-reference before producing a [`Topology`].
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    hardware_types: BTreeMap<u32, HardwareSpec>,
    base_station_types: BTreeMap<u32, BaseStationProfile>,
    reference_type: Option<u32>,
    nodes: Vec<(NodeId, NodeSpec)>,
    links: Vec<(LinkId, LinkSpec)>,
    routes: Vec<Route>,
    load: Vec<BTreeMap<BaseStationKey, u32>>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hardware_type(mut self, id: u32, spec: HardwareSpec) -> Self {
        self.hardware_types.insert(id, spec);
        self
    }

    pub fn base_station_type(mut self, id: u32, profile: BaseStationProfile) -> Self {
        self.base_station_types.insert(id, profile);
        self
    }

    /// Base-station type used as the compute-demand reference (defaults to the lowest id).
    pub fn reference_base_station_type(mut self, id: u32) -> Self {
        self.reference_type = Some(id);
        self
    }

    pub fn node(mut self, id: NodeId, spec: NodeSpec) -> Self {
        self.nodes.push((id, spec));
        self
    }

    pub fn link(mut self, id: LinkId, spec: LinkSpec) -> Self {
        self.links.push((id, spec));
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn routes<I: IntoIterator<Item = Route>>(mut self, routes: I) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Append the load row for the next timestamp.
    pub fn load_row(mut self, users: BTreeMap<BaseStationKey, u32>) -> Self {
        self.load.push(users);
        self
    }

    pub fn build(self) -> CoreResult<Topology> {
        let mut graph = UnGraph::new_undirected();
        let mut node_index = HashMap::new();
        let mut nodes = BTreeMap::new();

        for (id, spec) in self.nodes {
            if nodes.contains_key(&id) {
                return Err(CoreError::Validation(format!("duplicate node {}", id)));
            }
            for type_id in &spec.hardware_types {
                if !self.hardware_types.contains_key(type_id) {
                    return Err(CoreError::unknown(KeyKind::HardwareType, type_id));
                }
            }
            for type_id in &spec.base_station_types {
                if !self.base_station_types.contains_key(type_id) {
                    return Err(CoreError::unknown(KeyKind::BaseStationType, type_id));
                }
            }
            if !(0.0..=1.0).contains(&spec.static_fraction) {
                return Err(CoreError::Validation(format!(
                    "{} static fraction {} outside [0, 1]",
                    id, spec.static_fraction
                )));
            }
            node_index.insert(id, graph.add_node(id));
            nodes.insert(
                id,
                Node {
                    id,
                    hardware_types: spec.hardware_types,
                    static_fraction: spec.static_fraction,
                    base_station_types: spec.base_station_types,
                },
            );
        }

        if let Some(reference) = self.reference_type {
            if !self.base_station_types.contains_key(&reference) {
                return Err(CoreError::unknown(KeyKind::BaseStationType, reference));
            }
        }

        let mut links = BTreeMap::new();
        for (id, spec) in self.links {
            let a = node_index
                .get(&spec.from)
                .ok_or_else(|| CoreError::unknown(KeyKind::Node, spec.from))?;
            let b = node_index
                .get(&spec.to)
                .ok_or_else(|| CoreError::unknown(KeyKind::Node, spec.to))?;
            if spec.port_capacity_gbps <= 0.0 {
                return Err(CoreError::Validation(format!(
                    "{} has non-positive port capacity",
                    id
                )));
            }
            if links.insert(id, Link { id, spec }).is_some() {
                return Err(CoreError::Validation(format!("duplicate link {}", id)));
            }
            graph.add_edge(*a, *b, id);
        }

        let mut route_index = HashMap::new();
        for (i, route) in self.routes.iter().enumerate() {
            let target_node = nodes
                .get(&route.target.node)
                .ok_or_else(|| CoreError::unknown(KeyKind::BaseStation, route.target))?;
            if route.target.slot == 0 || route.target.slot > target_node.base_station_types.len()
            {
                return Err(CoreError::unknown(KeyKind::BaseStation, route.target));
            }
            if route.tier(Tier::Ru).is_none() {
                return Err(CoreError::Validation(format!(
                    "route {} has no fronthaul tier",
                    route.id.value()
                )));
            }
            for (_, tier) in route.present_tiers() {
                let node = nodes
                    .get(&tier.node)
                    .ok_or_else(|| CoreError::unknown(KeyKind::Node, tier.node))?;
                if tier.hardware.node != tier.node
                    || tier.hardware.slot == 0
                    || tier.hardware.slot > node.hardware_types.len()
                {
                    return Err(CoreError::unknown(KeyKind::Hardware, tier.hardware));
                }
                if let Some(missing) = tier.links.iter().find(|l| !links.contains_key(*l)) {
                    return Err(CoreError::unknown(KeyKind::Link, missing));
                }
            }
            if route_index.insert(route.id, i).is_some() {
                return Err(CoreError::Validation(format!(
                    "duplicate route {}",
                    route.id.value()
                )));
            }
        }

        Ok(Topology {
            graph,
            node_index,
            nodes,
            hardware_types: self.hardware_types,
            base_station_types: self.base_station_types,
            reference_type: self.reference_type,
            links,
            routes: self.routes,
            route_index,
            load: self.load,
        })
    }
}
