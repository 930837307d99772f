//! # splitplan-core: RAN functional-split data model
//!
//! Data structures consumed by the placement model builder:
//!
//! - [`FunctionId`] and [`FunctionChain`]: the fixed ordered chain of RAN
//!   functions `f0..f8`, of which `f2..f8` are virtualized.
//! - [`SplitConfiguration`] and [`SplitCatalog`]: which functions run on the
//!   CU, DU and RU tiers, with per-tier delay budgets and bandwidth overheads.
//! - [`TopologyView`]: read-only queries over nodes, hardware, base
//!   stations, links, routes and per-timestamp load. [`Topology`] is the
//!   in-memory implementation.
//!
//! ## Tier naming
//!
//! ```text
//!   core ── backhaul ── CU ── midhaul ── DU ── fronthaul ── RU ── antenna
//! ```
//!
//! A route spans one to three tiers. The fronthaul tier (RU host) is always
//! present; a two-tier route adds midhaul (DU host); a three-tier route adds
//! backhaul (CU host).

pub mod error;
pub mod function;
pub mod split;
pub mod topology;

pub use error::{CoreError, CoreResult, KeyKind};
pub use function::{FunctionChain, FunctionId};
pub use split::{PerTier, ServiceClass, SplitCatalog, SplitConfiguration, SplitFamily, Tier};
pub use topology::{
    BaseStationProfile, HardwareSpec, HardwareUnit, Link, LinkSpec, LoadSnapshot, Node,
    NodeSpec, Route, RouteTier, Topology, TopologyBuilder, TopologyView,
};

use serde::{Deserialize, Serialize};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SplitId(u32);

impl NodeId {
    #[inline]
    pub fn new(value: usize) -> Self {
        NodeId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl LinkId {
    #[inline]
    pub fn new(value: usize) -> Self {
        LinkId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl RouteId {
    #[inline]
    pub fn new(value: usize) -> Self {
        RouteId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl SplitId {
    #[inline]
    pub fn new(value: u32) -> Self {
        SplitId(value)
    }
    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node{}", self.0)
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "link{}", self.0)
    }
}

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "path{}", self.0)
    }
}

impl std::fmt::Display for SplitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "drc{}", self.0)
    }
}

/// A hardware unit installed at a node, numbered from 1 within the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HardwareKey {
    pub node: NodeId,
    pub slot: usize,
}

impl HardwareKey {
    pub fn new(node: NodeId, slot: usize) -> Self {
        Self { node, slot }
    }
}

impl std::fmt::Display for HardwareKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_hw{}", self.node, self.slot)
    }
}

/// A base station attached to a node, numbered from 1 within the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BaseStationKey {
    pub node: NodeId,
    pub slot: usize,
}

impl BaseStationKey {
    pub fn new(node: NodeId, slot: usize) -> Self {
        Self { node, slot }
    }
}

impl std::fmt::Display for BaseStationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_bs{}", self.node, self.slot)
    }
}
