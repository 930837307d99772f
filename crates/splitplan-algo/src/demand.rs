//! Per-function compute demand (GOPS) and the cost tables behind it.
//!
//! Demand is derived from a base-station radio profile and the number of
//! active users:
//!
//! ```text
//! K          = used_subcarriers / (T_sym · τ_c · 1e9)
//! precoding  = K·(8Aτ_p² + 8A²(τ_p+U)) + K·τ_d·8AU + K·8AU
//!            + K·((4A²+4A)τ_p + 8A²U + 8(A³−A)/3)
//! modulation = 1.3·(q/16)^1.2·A
//! mapping    = 1.3·(q/16)^1.2·(SE/6)^1.5·U
//! coding     = 1.3·(q/16)^1.2·(SE/6)·U
//! control    = 2.7·(q/16)^0.2·√A
//! network    = 8·(SE/6)·U
//!
//! high-PHY   = precoding + modulation + mapping
//! high-layer = coding + control + network
//! ```
//!
//! Function demand is a fixed share of one of the two layers.

use crate::error::{PlacementError, PlacementResult};
use serde::{Deserialize, Serialize};
use splitplan_core::{BaseStationKey, BaseStationProfile, FunctionChain, FunctionId, LoadSnapshot};
use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// High-PHY share of total demand used by [`DemandMode::HighPhy`].
pub const HIGH_PHY_RATIO: f64 = 0.327;
/// High-layer share of total demand used by [`DemandMode::HighLayer`].
pub const HIGH_LAYER_RATIO: f64 = 0.673;

/// How the two layer totals are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandMode {
    /// Both layers from their component formulas.
    #[default]
    Calc,
    /// High-layer re-derived from high-PHY: `hl = hp / 0.327 − hp`.
    HighPhy,
    /// High-PHY re-derived from high-layer: `hp = hl / 0.673 − hl`.
    HighLayer,
}

impl std::str::FromStr for DemandMode {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "calc" => Ok(DemandMode::Calc),
            "high_phy" | "hp" => Ok(DemandMode::HighPhy),
            "high_layer" | "hl" => Ok(DemandMode::HighLayer),
            other => Err(PlacementError::Config(format!(
                "unknown demand mode '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    HighPhy,
    HighLayer,
}

/// Fraction of one layer's demand attributed to a function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GopsShare {
    pub layer: Layer,
    pub fraction: f64,
}

/// Per-VNF share and memory tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostTables {
    pub shares: BTreeMap<FunctionId, GopsShare>,
    /// Memory footprint per VNF (MB)
    pub memory_mb: BTreeMap<FunctionId, f64>,
}

impl Default for CostTables {
    fn default() -> Self {
        let hp = |fraction| GopsShare {
            layer: Layer::HighPhy,
            fraction,
        };
        let hl = |fraction| GopsShare {
            layer: Layer::HighLayer,
            fraction,
        };
        let shares = [
            (2, hp(1.0)),
            (3, hl(0.2)),
            (4, hl(0.2)),
            (5, hl(0.014)),
            (6, hl(0.014)),
            (7, hl(0.286)),
            (8, hl(0.286)),
        ]
        .into_iter()
        .map(|(f, s)| (FunctionId::new(f), s))
        .collect();
        let memory_mb = [
            (2, 1795.00),
            (3, 121.04),
            (4, 121.04),
            (5, 86.46),
            (6, 86.46),
            (7, 410.00),
            (8, 410.00),
        ]
        .into_iter()
        .map(|(f, m)| (FunctionId::new(f), m))
        .collect();
        Self { shares, memory_mb }
    }
}

impl CostTables {
    pub fn share(&self, function: FunctionId) -> PlacementResult<GopsShare> {
        self.shares
            .get(&function)
            .copied()
            .ok_or(PlacementError::MissingCostData {
                table: "GOPS share",
                function,
            })
    }

    /// Power cost of moving one VNF instance: `0.512 · 3 · mem + 20.165`.
    pub fn migration_cost(&self, function: FunctionId) -> PlacementResult<f64> {
        self.memory_mb
            .get(&function)
            .map(|mem| 0.512 * 3.0 * mem + 20.165)
            .ok_or(PlacementError::MissingCostData {
                table: "memory footprint",
                function,
            })
    }

    /// Fail early when any virtualized function lacks an entry.
    pub fn validate(&self, chain: &FunctionChain) -> PlacementResult<()> {
        for &f in chain.virtualized() {
            self.share(f)?;
            self.migration_cost(f)?;
        }
        Ok(())
    }
}

/// Component breakdown of one base station's demand (GOPS).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DemandComponents {
    pub precoding: f64,
    pub modulation: f64,
    pub mapping: f64,
    pub channel_coding: f64,
    pub control: f64,
    pub network: f64,
    pub high_phy: f64,
    pub high_layer: f64,
}

impl DemandComponents {
    pub fn total(&self) -> f64 {
        self.high_phy + self.high_layer
    }
}

/// Per-function demand of one base station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandTable {
    pub users: u32,
    pub components: DemandComponents,
    pub gops: BTreeMap<FunctionId, f64>,
}

impl DemandTable {
    pub fn gops(&self, function: FunctionId) -> PlacementResult<f64> {
        self.gops
            .get(&function)
            .copied()
            .ok_or(PlacementError::MissingCostData {
                table: "GOPS share",
                function,
            })
    }
}

/// Demand calculator bound to a reference profile.
#[derive(Debug, Clone)]
pub struct ComputeDemandModel {
    profile: BaseStationProfile,
    mode: DemandMode,
}

impl ComputeDemandModel {
    pub fn new(profile: BaseStationProfile, mode: DemandMode) -> Self {
        Self { profile, mode }
    }

    pub fn profile(&self) -> &BaseStationProfile {
        &self.profile
    }

    pub fn mode(&self) -> DemandMode {
        self.mode
    }

    /// Layer components for `users` active users.
    pub fn components(&self, users: u32) -> DemandComponents {
        let bs = &self.profile;
        let a = bs.num_antennas as f64;
        let u = users as f64;
        let tau_p = bs.tau_p as f64;
        let tau_d = bs.tau_d() as f64;
        let q = bs.bit_quantization as f64 / 16.0;
        let se = bs.spectral_efficiency / 6.0;

        let k = bs.num_used_subcarriers as f64
            / (bs.ofdm_symbol_duration_s * bs.tau_c as f64 * 1e9);

        let precoding = k * (8.0 * a * tau_p.powi(2) + 8.0 * a.powi(2) * (tau_p + u))
            + k * tau_d * (8.0 * a * u)
            + k * (8.0 * a * u)
            + k * ((4.0 * a.powi(2) + 4.0 * a) * tau_p
                + 8.0 * a.powi(2) * u
                + 8.0 * (a.powi(3) - a) / 3.0);
        let modulation = 1.3 * q.powf(1.2) * a;
        let mapping = 1.3 * q.powf(1.2) * se.powf(1.5) * u;
        let channel_coding = 1.3 * q.powf(1.2) * se * u;
        let control = 2.7 * q.powf(0.2) * a.sqrt();
        let network = 8.0 * se * u;

        let mut high_phy = precoding + modulation + mapping;
        let mut high_layer = channel_coding + control + network;
        match self.mode {
            DemandMode::Calc => {}
            DemandMode::HighPhy => high_layer = high_phy / HIGH_PHY_RATIO - high_phy,
            DemandMode::HighLayer => high_phy = high_layer / HIGH_LAYER_RATIO - high_layer,
        }

        DemandComponents {
            precoding,
            modulation,
            mapping,
            channel_coding,
            control,
            network,
            high_phy,
            high_layer,
        }
    }

    /// Per-VNF demand for `users` active users.
    pub fn table(
        &self,
        users: u32,
        tables: &CostTables,
        chain: &FunctionChain,
    ) -> PlacementResult<DemandTable> {
        let components = self.components(users);
        let mut gops = BTreeMap::new();
        for &f in chain.virtualized() {
            let share = tables.share(f)?;
            let layer_total = match share.layer {
                Layer::HighPhy => components.high_phy,
                Layer::HighLayer => components.high_layer,
            };
            gops.insert(f, share.fraction * layer_total);
        }
        Ok(DemandTable {
            users,
            components,
            gops,
        })
    }
}

/// Demand tables computed once per base station for a round.
#[derive(Debug, Clone, Default)]
pub struct DemandCache {
    tables: BTreeMap<BaseStationKey, DemandTable>,
}

impl DemandCache {
    pub fn build(
        model: &ComputeDemandModel,
        tables: &CostTables,
        chain: &FunctionChain,
        load: &LoadSnapshot,
        base_stations: &[BaseStationKey],
    ) -> PlacementResult<Self> {
        let compute = |bs: &BaseStationKey| -> PlacementResult<(BaseStationKey, DemandTable)> {
            let users = load.users(*bs)?;
            Ok((*bs, model.table(users, tables, chain)?))
        };

        #[cfg(feature = "parallel")]
        let entries: Vec<_> = base_stations.par_iter().map(compute).collect();
        #[cfg(not(feature = "parallel"))]
        let entries: Vec<_> = base_stations.iter().map(compute).collect();

        let tables = entries.into_iter().collect::<PlacementResult<BTreeMap<_, _>>>()?;
        Ok(Self { tables })
    }

    pub fn get(&self, bs: BaseStationKey) -> PlacementResult<&DemandTable> {
        self.tables.get(&bs).ok_or_else(|| {
            splitplan_core::CoreError::unknown(splitplan_core::KeyKind::Load, bs).into()
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BaseStationKey, &DemandTable)> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
