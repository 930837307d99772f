//! Functional-split configurations and the catalogs that group them.
//!
//! A split assigns every function of the chain to exactly one of the CU, DU
//! or RU tiers. The number of physical nodes a split needs follows from
//! which tier sets are empty: an empty DU set means everything runs on the
//! radio unit (1 node), an empty CU set means a DU/RU pair (2 nodes),
//! otherwise all three tiers are used.

use crate::error::{CoreError, CoreResult, KeyKind};
use crate::function::{FunctionChain, FunctionId};
use crate::SplitId;
use serde::{Deserialize, Serialize};

/// Compute tier of a functional split.
///
/// Each tier is reached over one network segment: the CU over backhaul,
/// the DU over midhaul, the RU over fronthaul.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Cu,
    Du,
    Ru,
}

impl Tier {
    /// Lookup order used when resolving which tier hosts a function.
    pub const ALL: [Tier; 3] = [Tier::Cu, Tier::Du, Tier::Ru];

    /// Name of the network segment that serves this tier.
    pub fn segment(&self) -> &'static str {
        match self {
            Tier::Cu => "backhaul",
            Tier::Du => "midhaul",
            Tier::Ru => "fronthaul",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Cu => write!(f, "CU"),
            Tier::Du => write!(f, "DU"),
            Tier::Ru => write!(f, "RU"),
        }
    }
}

/// One value per tier.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerTier<T> {
    pub cu: T,
    pub du: T,
    pub ru: T,
}

impl<T> PerTier<T> {
    pub fn new(cu: T, du: T, ru: T) -> Self {
        Self { cu, du, ru }
    }

    pub fn get(&self, tier: Tier) -> &T {
        match tier {
            Tier::Cu => &self.cu,
            Tier::Du => &self.du,
            Tier::Ru => &self.ru,
        }
    }

    pub fn get_mut(&mut self, tier: Tier) -> &mut T {
        match tier {
            Tier::Cu => &mut self.cu,
            Tier::Du => &mut self.du,
            Tier::Ru => &mut self.ru,
        }
    }
}

/// Split family, which fixes the queueing depth on transport links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitFamily {
    /// Fully distributed: every function on the radio unit.
    Local,
    /// 3GPP option 6 (MAC/PHY).
    Option6,
    /// O-RAN option 7.2 (intra-PHY).
    Option7_2,
    /// Option 8 (PHY/RF), no intermediate queueing.
    Option8,
}

impl SplitFamily {
    /// Packets buffered per switch hop.
    pub fn buffer_depth(&self) -> u32 {
        match self {
            SplitFamily::Option6 | SplitFamily::Option7_2 => 2,
            SplitFamily::Local | SplitFamily::Option8 => 0,
        }
    }
}

/// An immutable functional-split configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfiguration {
    pub id: SplitId,
    pub family: SplitFamily,
    /// Compute-usage coefficients per tier
    pub cpu_usage: PerTier<f64>,
    /// Functions hosted by each tier
    pub functions: PerTier<Vec<FunctionId>>,
    /// Delay budget per tier segment (ms)
    pub delay_budget_ms: PerTier<f64>,
    /// Bandwidth overhead multiplier per tier segment
    pub bandwidth_overhead: PerTier<f64>,
    /// Fraction of base-station processing relieved by this split
    pub bs_relief: f64,
}

impl SplitConfiguration {
    /// Create a split, checking that the tier sets partition `chain`.
    pub fn new(
        id: SplitId,
        family: SplitFamily,
        functions: PerTier<Vec<FunctionId>>,
        chain: &FunctionChain,
    ) -> CoreResult<Self> {
        let mut seen: Vec<FunctionId> = Vec::new();
        for tier in Tier::ALL {
            for &function in functions.get(tier) {
                if !chain.contains(function) {
                    return Err(CoreError::Validation(format!(
                        "split {} places {} which is not in the function chain",
                        id.value(),
                        function
                    )));
                }
                if seen.contains(&function) {
                    return Err(CoreError::Validation(format!(
                        "split {} assigns {} to more than one tier",
                        id.value(),
                        function
                    )));
                }
                seen.push(function);
            }
        }
        if let Some(missing) = chain.functions().iter().find(|f| !seen.contains(f)) {
            return Err(CoreError::Validation(format!(
                "split {} leaves {} unassigned",
                id.value(),
                missing
            )));
        }

        Ok(Self {
            id,
            family,
            cpu_usage: PerTier::default(),
            functions,
            delay_budget_ms: PerTier::default(),
            bandwidth_overhead: PerTier::default(),
            bs_relief: 0.0,
        })
    }

    pub fn with_cpu_usage(mut self, cu: f64, du: f64, ru: f64) -> Self {
        self.cpu_usage = PerTier::new(cu, du, ru);
        self
    }

    /// Delay budgets in segment order: backhaul, midhaul, fronthaul (ms)
    pub fn with_delay_budget_ms(mut self, backhaul: f64, midhaul: f64, fronthaul: f64) -> Self {
        self.delay_budget_ms = PerTier::new(backhaul, midhaul, fronthaul);
        self
    }

    /// Bandwidth multipliers in segment order: backhaul, midhaul, fronthaul
    pub fn with_bandwidth_overhead(mut self, backhaul: f64, midhaul: f64, fronthaul: f64) -> Self {
        self.bandwidth_overhead = PerTier::new(backhaul, midhaul, fronthaul);
        self
    }

    pub fn with_bs_relief(mut self, relief: f64) -> Self {
        self.bs_relief = relief;
        self
    }

    /// Number of physical nodes a route must span to host this split.
    pub fn required_nodes(&self) -> usize {
        if self.functions.du.is_empty() {
            1
        } else if self.functions.cu.is_empty() {
            2
        } else {
            3
        }
    }

    /// Tier hosting `function`, checked in CU, DU, RU order.
    pub fn tier_of(&self, function: FunctionId) -> Option<Tier> {
        Tier::ALL
            .into_iter()
            .find(|tier| self.functions.get(*tier).contains(&function))
    }

    pub fn buffer_depth(&self) -> u32 {
        self.family.buffer_depth()
    }
}

/// Service class of the traffic being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceClass {
    #[serde(rename = "urllc")]
    Urllc,
    #[serde(rename = "1080p")]
    Video1080p,
    #[serde(rename = "1440p")]
    Video1440p,
    #[serde(rename = "2160p")]
    Video2160p,
}

impl ServiceClass {
    /// Per-user throughput in bits per second.
    pub fn throughput_bps(&self) -> f64 {
        match self {
            ServiceClass::Urllc => 1_024_000.0,
            ServiceClass::Video1080p => 12_000_000.0,
            ServiceClass::Video1440p => 24_000_000.0,
            ServiceClass::Video2160p => 53_000_000.0,
        }
    }

    pub fn is_video(&self) -> bool {
        !matches!(self, ServiceClass::Urllc)
    }
}

impl Default for ServiceClass {
    fn default() -> Self {
        ServiceClass::Urllc
    }
}

impl std::fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceClass::Urllc => write!(f, "urllc"),
            ServiceClass::Video1080p => write!(f, "1080p"),
            ServiceClass::Video1440p => write!(f, "1440p"),
            ServiceClass::Video2160p => write!(f, "2160p"),
        }
    }
}

impl std::str::FromStr for ServiceClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim_end_matches('p') {
            "urllc" => Ok(ServiceClass::Urllc),
            "1080" => Ok(ServiceClass::Video1080p),
            "1440" => Ok(ServiceClass::Video1440p),
            "2160" => Ok(ServiceClass::Video2160p),
            _ => Err(CoreError::Validation(format!("unknown service class '{}'", s))),
        }
    }
}

/// Ordered, immutable list of split configurations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitCatalog {
    splits: Vec<SplitConfiguration>,
}

impl SplitCatalog {
    /// Build a catalog, rejecting duplicate split ids.
    pub fn new(splits: Vec<SplitConfiguration>) -> CoreResult<Self> {
        for (i, split) in splits.iter().enumerate() {
            if splits[..i].iter().any(|other| other.id == split.id) {
                return Err(CoreError::Validation(format!(
                    "duplicate split id {} in catalog",
                    split.id.value()
                )));
            }
        }
        Ok(Self { splits })
    }

    /// Catalog used for a given service class.
    pub fn for_service(service: ServiceClass) -> Self {
        if service.is_video() {
            Self::embb()
        } else {
            Self::urllc()
        }
    }

    /// Low-latency catalog: splits 6, 62, 9 and the fully local split 0.
    pub fn urllc() -> Self {
        Self::from_static(vec![
            split(6, SplitFamily::Option7_2, &[8, 7, 6, 5, 4, 3], &[2], &[1, 0])
                .with_cpu_usage(0.98, 1.568, 2.352)
                .with_bs_relief(0.078)
                .with_delay_budget_ms(10.0, 0.25, 0.25)
                .with_bandwidth_overhead(1.0, 1.070, 7.634),
            split(62, SplitFamily::Option6, &[], &[8, 7, 6, 5, 4, 3], &[2, 1, 0])
                .with_cpu_usage(0.98, 1.568, 2.352)
                .with_bs_relief(0.078)
                .with_delay_budget_ms(10.0, 10.0, 0.25)
                .with_bandwidth_overhead(1.0, 1.0, 1.070),
            split(9, SplitFamily::Option7_2, &[], &[8, 7, 6, 5, 4, 3, 2], &[1, 0])
                .with_cpu_usage(0.0, 2.54, 2.354)
                .with_bs_relief(0.078)
                .with_delay_budget_ms(0.0, 10.0, 0.25)
                .with_bandwidth_overhead(0.0, 1.0, 7.634),
            local_split(1.0),
        ])
    }

    /// Video catalog: the centralized option 7.2 split only.
    pub fn embb() -> Self {
        Self::from_static(vec![split(
            9,
            SplitFamily::Option7_2,
            &[],
            &[8, 7, 6, 5, 4, 3, 2],
            &[1, 0],
        )
        .with_cpu_usage(0.0, 2.54, 2.354)
        .with_bs_relief(0.078)
        .with_delay_budget_ms(0.0, 10.0, 0.25)
        .with_bandwidth_overhead(0.0, 1.0, 7.175)])
    }

    /// Distributed RAN baseline: everything on the radio unit.
    pub fn dran() -> Self {
        Self::from_static(vec![local_split(1.0)])
    }

    /// Centralized RAN baseline: option 7.2 with all higher layers on the DU.
    pub fn cran() -> Self {
        Self::from_static(vec![split(
            9,
            SplitFamily::Option7_2,
            &[],
            &[8, 7, 6, 5, 4, 3, 2],
            &[1, 0],
        )
        .with_cpu_usage(0.0, 2.54, 2.354)
        .with_bs_relief(0.078)
        .with_delay_budget_ms(0.0, 10.0, 0.25)
        .with_bandwidth_overhead(0.0, 1.0, 7.634)])
    }

    /// Full reference set with absolute bandwidth figures (Gbps per user).
    pub fn reference() -> Self {
        fn three_tier(
            id: u32,
            family: SplitFamily,
            cu: &[u8],
            du: &[u8],
            cpu_cu: f64,
            cpu_du: f64,
        ) -> SplitConfiguration {
            split(id, family, cu, du, &[1, 0])
                .with_cpu_usage(cpu_cu, cpu_du, 2.352)
                .with_bs_relief(0.078)
                .with_delay_budget_ms(10.0, 10.0, 0.25)
                .with_bandwidth_overhead(9.9, 13.2, 42.6)
        }
        Self::from_static(vec![
            three_tier(1, SplitFamily::Option7_2, &[8], &[7, 6, 5, 4, 3, 2], 0.49, 2.058),
            three_tier(2, SplitFamily::Option7_2, &[8, 7], &[6, 5, 4, 3, 2], 0.98, 1.568),
            three_tier(4, SplitFamily::Option7_2, &[8, 7, 6, 5], &[4, 3, 2], 0.98, 1.568),
            three_tier(6, SplitFamily::Option7_2, &[8, 7], &[6, 5, 4, 3, 2], 0.98, 1.568),
            three_tier(8, SplitFamily::Option8, &[8, 7], &[6, 5, 4, 3, 2], 0.98, 1.568),
            split(9, SplitFamily::Option7_2, &[], &[8, 7, 6, 5, 4, 3, 2], &[1, 0])
                .with_cpu_usage(0.0, 2.54, 2.354)
                .with_bs_relief(0.078)
                .with_delay_budget_ms(0.0, 10.0, 0.25)
                .with_bandwidth_overhead(0.0, 9.9, 42.6),
            local_split(9.9),
        ])
    }

    fn from_static(splits: Vec<SplitConfiguration>) -> Self {
        Self { splits }
    }

    pub fn get(&self, id: SplitId) -> CoreResult<&SplitConfiguration> {
        self.splits
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::unknown(KeyKind::Split, id.value()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SplitConfiguration> {
        self.splits.iter()
    }

    pub fn splits(&self) -> &[SplitConfiguration] {
        &self.splits
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }
}

fn ids(raw: &[u8]) -> Vec<FunctionId> {
    raw.iter().copied().map(FunctionId::new).collect()
}

// Built-in tables are known to partition the standard chain.
fn split(id: u32, family: SplitFamily, cu: &[u8], du: &[u8], ru: &[u8]) -> SplitConfiguration {
    SplitConfiguration {
        id: SplitId::new(id),
        family,
        cpu_usage: PerTier::default(),
        functions: PerTier::new(ids(cu), ids(du), ids(ru)),
        delay_budget_ms: PerTier::default(),
        bandwidth_overhead: PerTier::default(),
        bs_relief: 0.0,
    }
}

fn local_split(fronthaul_overhead: f64) -> SplitConfiguration {
    split(0, SplitFamily::Local, &[], &[], &[8, 7, 6, 5, 4, 3, 2, 1, 0])
        .with_cpu_usage(0.0, 0.0, 4.9)
        .with_delay_budget_ms(0.0, 0.0, 10.0)
        .with_bandwidth_overhead(0.0, 0.0, fronthaul_overhead)
}
