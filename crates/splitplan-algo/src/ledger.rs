//! Deployment ledger: where each base station's functions ran last round.
//!
//! A [`DeploymentLedger`] is an immutable snapshot. The next round's ledger
//! is produced with a [`LedgerBuilder`] and swapped in only once that round
//! has fully solved.

use crate::error::PlacementResult;
use crate::feasibility::{place_functions, AssignmentCandidate};
use serde::{Deserialize, Serialize};
use splitplan_core::{
    BaseStationKey, FunctionChain, FunctionId, HardwareKey, RouteId, SplitCatalog, SplitId,
    TopologyView,
};
use std::collections::BTreeMap;

/// Map (base station, function) → hardware that hosted it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "LedgerRecord", from = "LedgerRecord")]
pub struct DeploymentLedger {
    entries: BTreeMap<(BaseStationKey, FunctionId), HardwareKey>,
    /// Split and route chosen per base station
    selections: BTreeMap<BaseStationKey, (SplitId, RouteId)>,
}

impl DeploymentLedger {
    /// Ledger of a first round: nothing deployed anywhere.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_deployed_in(&self, bs: BaseStationKey, function: FunctionId, hw: HardwareKey) -> bool {
        self.entries.get(&(bs, function)) == Some(&hw)
    }

    pub fn hardware_of(&self, bs: BaseStationKey, function: FunctionId) -> Option<HardwareKey> {
        self.entries.get(&(bs, function)).copied()
    }

    pub fn selection(&self, bs: BaseStationKey) -> Option<(SplitId, RouteId)> {
        self.selections.get(&bs).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BaseStationKey, FunctionId, HardwareKey)> + '_ {
        self.entries.iter().map(|((bs, f), hw)| (*bs, *f, *hw))
    }

    /// Ledger recording the given candidates.
    pub fn from_selection<'a, I>(
        topology: &dyn TopologyView,
        catalog: &SplitCatalog,
        chain: &FunctionChain,
        selected: I,
    ) -> PlacementResult<Self>
    where
        I: IntoIterator<Item = &'a AssignmentCandidate>,
    {
        let mut builder = LedgerBuilder::new(topology, catalog, chain);
        for candidate in selected {
            builder.set_deploy(candidate.base_station, candidate.split, candidate.route)?;
        }
        Ok(builder.build())
    }

    /// Number of VNFs of `candidate` that would run on hardware other than recorded.
    pub fn migrations_for(&self, candidate: &AssignmentCandidate, chain: &FunctionChain) -> usize {
        candidate
            .vnf_placements(chain)
            .filter(|p| !self.is_deployed_in(candidate.base_station, p.function, p.hardware))
            .count()
    }
}

/// Flat form used on the wire; JSON maps cannot take composite keys.
#[derive(Serialize, Deserialize)]
struct LedgerRecord {
    entries: Vec<(BaseStationKey, FunctionId, HardwareKey)>,
    selections: Vec<(BaseStationKey, SplitId, RouteId)>,
}

impl From<DeploymentLedger> for LedgerRecord {
    fn from(ledger: DeploymentLedger) -> Self {
        Self {
            entries: ledger.iter().collect(),
            selections: ledger
                .selections
                .iter()
                .map(|(bs, (split, route))| (*bs, *split, *route))
                .collect(),
        }
    }
}

impl From<LedgerRecord> for DeploymentLedger {
    fn from(record: LedgerRecord) -> Self {
        Self {
            entries: record
                .entries
                .into_iter()
                .map(|(bs, f, hw)| ((bs, f), hw))
                .collect(),
            selections: record
                .selections
                .into_iter()
                .map(|(bs, split, route)| (bs, (split, route)))
                .collect(),
        }
    }
}

/// Builds the next ledger snapshot.
pub struct LedgerBuilder<'a> {
    topology: &'a dyn TopologyView,
    catalog: &'a SplitCatalog,
    chain: &'a FunctionChain,
    ledger: DeploymentLedger,
}

impl<'a> LedgerBuilder<'a> {
    pub fn new(
        topology: &'a dyn TopologyView,
        catalog: &'a SplitCatalog,
        chain: &'a FunctionChain,
    ) -> Self {
        Self {
            topology,
            catalog,
            chain,
            ledger: DeploymentLedger::default(),
        }
    }

    /// Start from an existing snapshot.
    pub fn from_ledger(
        topology: &'a dyn TopologyView,
        catalog: &'a SplitCatalog,
        chain: &'a FunctionChain,
        ledger: DeploymentLedger,
    ) -> Self {
        Self {
            topology,
            catalog,
            chain,
            ledger,
        }
    }

    /// Record `split` over `route` for `bs`, replacing whatever `bs` had.
    pub fn set_deploy(
        &mut self,
        bs: BaseStationKey,
        split: SplitId,
        route: RouteId,
    ) -> PlacementResult<&mut Self> {
        let split_cfg = self.catalog.get(split)?;
        let route_cfg = self.topology.route(route)?;

        self.ledger.entries.retain(|(key, _), _| *key != bs);
        for placement in place_functions(route_cfg, split_cfg, self.chain) {
            self.ledger
                .entries
                .insert((bs, placement.function), placement.hardware);
        }
        self.ledger.selections.insert(bs, (split, route));
        Ok(self)
    }

    pub fn build(self) -> DeploymentLedger {
        self.ledger
    }
}
