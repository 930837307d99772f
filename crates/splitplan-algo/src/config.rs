//! Planner configuration loaded from TOML.
//!
//! ```toml
//! [round]
//! service = "1080p"
//! demand_mode = "calc"
//! centralization_floor = 0.0
//! objective = "maximize_centralization"
//! catalog = "service"
//! timestamps = [9, 10, 11, 12, 13]
//!
//! [solver]
//! backend = "highs"
//! time_limit_seconds = 1800.0
//! mip_gap = 1e-5
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every key is optional.

use crate::assembler::{AssemblyConfig, ObjectiveMode};
use crate::backend::{backend_by_id, PlacementBackend};
use crate::demand::DemandMode;
use crate::error::{PlacementError, PlacementResult};
use serde::{Deserialize, Serialize};
use splitplan_core::{ServiceClass, SplitCatalog};
use splitplan_solver_common::SolveLimits;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlannerConfig {
    #[serde(default)]
    pub round: RoundConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which split catalog a round draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogChoice {
    /// Catalog implied by the service class
    #[default]
    Service,
    Urllc,
    Embb,
    Dran,
    Cran,
    Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundConfig {
    #[serde(default)]
    pub service: ServiceClass,
    #[serde(default)]
    pub demand_mode: DemandMode,
    #[serde(default)]
    pub centralization_floor: f64,
    #[serde(default)]
    pub objective: ObjectiveMode,
    #[serde(default)]
    pub catalog: CatalogChoice,
    /// Load rows to solve in order; empty means a single round at one user per base station
    #[serde(default)]
    pub timestamps: Vec<usize>,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            service: ServiceClass::default(),
            demand_mode: DemandMode::default(),
            centralization_floor: 0.0,
            objective: ObjectiveMode::default(),
            catalog: CatalogChoice::default(),
            timestamps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// "highs", "exhaustive" or "clarabel"
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_time_limit")]
    pub time_limit_seconds: f64,
    #[serde(default = "default_mip_gap")]
    pub mip_gap: f64,
    /// Search cap for the exhaustive backend
    #[serde(default = "default_max_combinations")]
    pub max_combinations: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            time_limit_seconds: default_time_limit(),
            mip_gap: default_mip_gap(),
            max_combinations: default_max_combinations(),
        }
    }
}

#[cfg(feature = "solver-highs")]
fn default_backend() -> String {
    "highs".to_string()
}

#[cfg(not(feature = "solver-highs"))]
fn default_backend() -> String {
    "exhaustive".to_string()
}

fn default_time_limit() -> f64 {
    1800.0
}

fn default_mip_gap() -> f64 {
    1e-5
}

fn default_max_combinations() -> u64 {
    1_000_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive scoping the level to the splitplan crates.
    pub fn directive(&self) -> String {
        format!(
            "splitplan_algo={level},splitplan_core={level},splitplan_solver_common={level}",
            level = self.level
        )
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl PlannerConfig {
    pub fn from_toml_str(contents: &str) -> PlacementResult<Self> {
        let config: PlannerConfig =
            toml::from_str(contents).map_err(|e| PlacementError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> PlacementResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PlacementError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> PlacementResult<String> {
        toml::to_string_pretty(self).map_err(|e| PlacementError::Config(e.to_string()))
    }

    pub fn validate(&self) -> PlacementResult<()> {
        let floor = self.round.centralization_floor;
        if floor.is_nan() || floor < 0.0 {
            return Err(PlacementError::Config(format!(
                "centralization_floor must be nonnegative, got {}",
                self.round.centralization_floor
            )));
        }
        let limit = self.solver.time_limit_seconds;
        if limit.is_nan() || limit <= 0.0 {
            return Err(PlacementError::Config(format!(
                "time_limit_seconds must be positive, got {}",
                self.solver.time_limit_seconds
            )));
        }
        if !(0.0..1.0).contains(&self.solver.mip_gap) {
            return Err(PlacementError::Config(format!(
                "mip_gap must lie in [0, 1), got {}",
                self.solver.mip_gap
            )));
        }
        Ok(())
    }

    /// Assembly settings for one round at `timestamp`.
    pub fn assembly(&self, timestamp: Option<usize>) -> AssemblyConfig {
        AssemblyConfig {
            service: self.round.service,
            demand_mode: self.round.demand_mode,
            centralization_floor: self.round.centralization_floor,
            objective: self.round.objective,
            timestamp,
        }
    }

    pub fn solve_limits(&self) -> SolveLimits {
        SolveLimits {
            time_limit_seconds: self.solver.time_limit_seconds,
            mip_gap: self.solver.mip_gap,
        }
    }

    pub fn catalog(&self) -> SplitCatalog {
        match self.round.catalog {
            CatalogChoice::Service => SplitCatalog::for_service(self.round.service),
            CatalogChoice::Urllc => SplitCatalog::urllc(),
            CatalogChoice::Embb => SplitCatalog::embb(),
            CatalogChoice::Dran => SplitCatalog::dran(),
            CatalogChoice::Cran => SplitCatalog::cran(),
            CatalogChoice::Reference => SplitCatalog::reference(),
        }
    }

    pub fn backend(&self) -> PlacementResult<Box<dyn PlacementBackend>> {
        Ok(backend_by_id(
            &self.solver.backend,
            self.solver.max_combinations,
        )?)
    }
}
