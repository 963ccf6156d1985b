//! Configuration System
//!
//! Loads simulation parameters from a TOML file. Every section and field has
//! a default, so an empty file (or no file at all) yields a runnable
//! configuration. The validated configuration is wrapped in [`SimParams`]
//! and shared read-only with every system.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use bycatch_events::DAYS_PER_YEAR;

pub use crate::error::ConfigError;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "bycatch.toml";

/// Number of gear mesh types.
pub const GEAR_TYPES: usize = 3;

/// Minimum length of the distance to interaction-probability table.
pub const INTERACTION_TABLE_LEN: usize = 51;

/// Top-level configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub simulation: SimulationConfig,
    pub landscape: LandscapeConfig,
    pub population: PopulationConfig,
    pub movement: MovementConfig,
    pub energy: EnergyConfig,
    pub dispersal: DispersalConfig,
    pub reproduction: ReproductionConfig,
    pub gear: GearConfig,
    pub output: OutputConfig,
}

/// Run length, calendar start, randomness and threading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of half-hour steps to simulate
    pub steps: u64,
    /// Day of year (1-365) of the first step
    pub start_day: u16,
    /// Master seed; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Worker threads for the agent phase; 0 uses the global rayon pool
    pub threads: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: 17_520,
            start_day: 1,
            seed: None,
            threads: 0,
        }
    }
}

/// Traversability and food dynamics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandscapeConfig {
    /// Cells with bathymetry above this value are too shallow to enter
    pub min_traversable_depth: f32,
    /// Scales the food capacity read from the landscape
    pub max_food: f32,
    /// Logistic growth rate of food patches
    pub food_growth_rate: f32,
    /// Food never drops below this level in a patch with capacity
    pub min_food: f32,
}

impl Default for LandscapeConfig {
    fn default() -> Self {
        Self {
            min_traversable_depth: -1.0,
            max_food: 1.0,
            food_growth_rate: 0.1,
            min_food: 0.01,
        }
    }
}

/// Initial population and ageing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// One value spreads the population over all traversable cells;
    /// several values give per-region counts
    pub initial: Vec<u32>,
    /// Relative weight of each whole-year age class at start
    pub age_distribution: Vec<u32>,
    pub max_age: f32,
    pub age_of_maturity: f32,
    pub initial_energy_mean: f32,
    pub initial_energy_sd: f32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial: vec![1000],
            age_distribution: vec![
                10, 9, 9, 8, 8, 7, 7, 6, 6, 5, 5, 4, 4, 3, 3, 2, 2, 1, 1, 1, 1,
            ],
            max_age: 30.0,
            age_of_maturity: 3.44,
            initial_energy_mean: 10.0,
            initial_energy_sd: 1.0,
        }
    }
}

/// Correlated random walk and spatial memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Number of remembered positions
    pub memory_max: usize,
    /// Per-slot decay of the reference (food location) memory
    pub reference_memory_decay: f32,
    /// Per-slot decay of the working (satiation) memory
    pub working_memory_decay: f32,
    /// Baseline weight of the random walk against memory attraction
    pub inertia_const: f32,
    /// Correlation between successive turning angles
    pub corr_angle: f32,
    /// Autocorrelation of log10 move length
    pub corr_logmove: f32,
    /// Upper bound of log10 move length
    pub max_logmove: f32,
    /// Move length (100 m units) below which turns shrink with distance moved
    pub turn_move_threshold: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            memory_max: 120,
            reference_memory_decay: 0.1,
            working_memory_decay: 0.2,
            inertia_const: 0.001,
            corr_angle: 0.26,
            corr_logmove: 0.35,
            max_logmove: 1.18,
            turn_move_threshold: 5.5,
        }
    }
}

/// Energy budget and survival
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Energy-use multiplier per calendar month (January first)
    pub monthly_multiplier: Vec<f32>,
    pub nursing_multiplier: f32,
    /// Baseline energy use per step
    pub step_multiplier: f32,
    /// Energy use per unit distance moved
    pub distance_multiplier: f32,
    /// Yearly mortality scale
    pub mortality_const: f32,
    /// Steepness of survival in energy
    pub survival_const: f32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            monthly_multiplier: vec![
                1.0, 1.0, 1.0, 1.0, 1.3, 1.3, 1.3, 1.3, 1.3, 1.0, 1.0, 1.0,
            ],
            nursing_multiplier: 1.4,
            step_multiplier: 4.5,
            distance_multiplier: 0.1,
            mortality_const: 1.0,
            survival_const: 0.4,
        }
    }
}

/// Long-range dispersal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispersalConfig {
    /// Consecutive days of falling energy that trigger dispersal
    pub inertia: usize,
    /// Distance covered per dispersal step, in cells
    pub mean_distance: f32,
    /// Target blocks must be farther than this
    pub min_distance: f32,
    /// Target blocks must be closer than this
    pub max_distance: f32,
    /// Number of best-ranked blocks a target is drawn from
    pub candidate_pool: usize,
    /// Dispersal ends within this distance of the target
    pub arrival_radius: f32,
    /// Coastal dispersal keeps the coast distance within this band
    pub coast_band_min: f32,
    pub coast_band_max: f32,
}

impl Default for DispersalConfig {
    fn default() -> Self {
        Self {
            inertia: 3,
            mean_distance: 1.6,
            min_distance: 60.0,
            max_distance: 300.0,
            candidate_pool: 12,
            arrival_radius: 50.0,
            coast_band_min: 2.5,
            coast_band_max: 10.0,
        }
    }
}

/// Mating, birth and weaning calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReproductionConfig {
    pub pregnancy_prob: f32,
    pub mating_day_mean: f32,
    pub mating_day_sd: f32,
    /// Birth falls this many days before the mating day, one year on
    pub gestation_offset_days: i32,
    pub nursing_days: i32,
    /// Probability that a weaned calf joins the modelled population
    pub calf_retention: f32,
    pub calf_age: f32,
    pub birthday_mean: f32,
    pub birthday_sd: f32,
    pub weaning_day_mean: f32,
    pub weaning_day_sd: f32,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            pregnancy_prob: 0.68,
            mating_day_mean: 225.0,
            mating_day_sd: 20.0,
            gestation_offset_days: 65,
            nursing_days: 240,
            calf_retention: 0.5,
            calf_age: 0.677_777_8,
            birthday_mean: 160.0,
            birthday_sd: 20.0,
            weaning_day_mean: 100.0,
            weaning_day_sd: 20.0,
        }
    }
}

/// Gillnet deployment and interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearConfig {
    /// Catchability of small, medium and large mesh
    pub catchability: Vec<f32>,
    /// Catchability multiplier for gear carrying pingers
    pub pinger_effect: f32,
    /// Interaction probability by distance index (0.5 m/index at 400 m cells)
    pub interaction_probability: Vec<f32>,
    /// Squared map distance beyond which no interaction occurs
    pub interaction_cutoff_sq: f32,
    pub placement_attempts: u32,
    /// Fishable cells lie farther than this from the coast
    pub min_coast_distance: f32,
    /// Fishable cells are no deeper than this
    pub max_depth: f32,
    /// Historical years in the haul table
    pub sample_years: usize,
}

impl Default for GearConfig {
    fn default() -> Self {
        Self {
            catchability: vec![1.0; GEAR_TYPES],
            pinger_effect: 0.5,
            interaction_probability: default_interaction_table(),
            interaction_cutoff_sq: 0.015_625,
            placement_attempts: 10,
            min_coast_distance: 2.5,
            max_depth: -400.0,
            sample_years: 10,
        }
    }
}

/// Record output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Agent ids to track each step; `[0]` tracks everyone
    pub follow: Vec<u64>,
    pub tick_summaries: bool,
    pub gear_records: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            follow: Vec::new(),
            tick_summaries: true,
            gear_records: true,
        }
    }
}

impl OutputConfig {
    pub fn is_followed(&self, id: u64) -> bool {
        matches!(self.follow.as_slice(), [0]) || self.follow.contains(&id)
    }
}

/// Gaussian fall-off with a 7.5 m standard deviation, normalised to 1 at contact.
pub fn default_interaction_table() -> Vec<f32> {
    (0..INTERACTION_TABLE_LEN)
        .map(|m| {
            let m = m as f32;
            (-(m * m) / (2.0 * 7.5 * 7.5)).exp()
        })
        .collect()
}

/// Geometric decay table of `len` slots.
pub fn memory_decay_table(len: usize, decay: f32) -> Vec<f32> {
    (0..len).map(|i| (1.0 - decay).powi(i as i32)).collect()
}

impl SimConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load configuration from default path, or use defaults if not found
    pub fn load_or_default() -> Self {
        Self::load(DEFAULT_CONFIG_PATH).unwrap_or_else(|e| {
            tracing::warn!("could not load {}: {}; using defaults", DEFAULT_CONFIG_PATH, e);
            Self::default()
        })
    }

    /// Check every range constraint the simulation relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if sim.steps == 0 {
            return Err(ConfigError::invalid("simulation.steps", "must be positive"));
        }
        if !(1..=DAYS_PER_YEAR).contains(&sim.start_day) {
            return Err(ConfigError::invalid(
                "simulation.start_day",
                format!("{} is not a day of the year", sim.start_day),
            ));
        }

        let land = &self.landscape;
        if land.max_food < 0.0 {
            return Err(ConfigError::invalid("landscape.max_food", "must not be negative"));
        }
        if !(0.0..=1.0).contains(&land.food_growth_rate) {
            return Err(ConfigError::invalid(
                "landscape.food_growth_rate",
                "must lie in [0, 1]",
            ));
        }
        if land.min_food < 0.0 {
            return Err(ConfigError::invalid("landscape.min_food", "must not be negative"));
        }

        let pop = &self.population;
        if !pop.age_distribution.iter().any(|&w| w > 0) {
            return Err(ConfigError::invalid(
                "population.age_distribution",
                "needs at least one non-zero weight",
            ));
        }
        if pop.max_age <= 0.0 {
            return Err(ConfigError::invalid("population.max_age", "must be positive"));
        }
        if pop.initial_energy_sd < 0.0 {
            return Err(ConfigError::invalid(
                "population.initial_energy_sd",
                "must not be negative",
            ));
        }

        let mov = &self.movement;
        if mov.memory_max == 0 {
            return Err(ConfigError::invalid("movement.memory_max", "must be positive"));
        }
        for (field, decay) in [
            ("movement.reference_memory_decay", mov.reference_memory_decay),
            ("movement.working_memory_decay", mov.working_memory_decay),
        ] {
            if !(0.0..1.0).contains(&decay) {
                return Err(ConfigError::invalid(field, "must lie in [0, 1)"));
            }
        }
        if mov.turn_move_threshold <= 0.0 {
            return Err(ConfigError::invalid(
                "movement.turn_move_threshold",
                "must be positive",
            ));
        }

        let energy = &self.energy;
        if energy.monthly_multiplier.len() != 12 {
            return Err(ConfigError::invalid(
                "energy.monthly_multiplier",
                format!("needs 12 values, got {}", energy.monthly_multiplier.len()),
            ));
        }
        if energy.monthly_multiplier.iter().any(|&m| m <= 0.0) {
            return Err(ConfigError::invalid(
                "energy.monthly_multiplier",
                "values must be positive",
            ));
        }

        let disp = &self.dispersal;
        if !(2..=10).contains(&disp.inertia) {
            return Err(ConfigError::invalid("dispersal.inertia", "must lie in 2..=10"));
        }
        if disp.min_distance < 0.0 || disp.min_distance >= disp.max_distance {
            return Err(ConfigError::invalid(
                "dispersal.min_distance",
                "must be non-negative and below dispersal.max_distance",
            ));
        }
        if disp.candidate_pool == 0 {
            return Err(ConfigError::invalid("dispersal.candidate_pool", "must be positive"));
        }
        if disp.coast_band_min > disp.coast_band_max {
            return Err(ConfigError::invalid(
                "dispersal.coast_band_min",
                "must not exceed dispersal.coast_band_max",
            ));
        }

        let repro = &self.reproduction;
        for (field, p) in [
            ("reproduction.pregnancy_prob", repro.pregnancy_prob),
            ("reproduction.calf_retention", repro.calf_retention),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::invalid(field, "must lie in [0, 1]"));
            }
        }

        let gear = &self.gear;
        if gear.catchability.len() != GEAR_TYPES {
            return Err(ConfigError::invalid(
                "gear.catchability",
                format!("needs {} values, got {}", GEAR_TYPES, gear.catchability.len()),
            ));
        }
        if gear.catchability.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::invalid("gear.catchability", "values must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&gear.pinger_effect) {
            return Err(ConfigError::invalid("gear.pinger_effect", "must lie in [0, 1]"));
        }
        let table = &gear.interaction_probability;
        if table.len() < INTERACTION_TABLE_LEN {
            return Err(ConfigError::invalid(
                "gear.interaction_probability",
                format!("needs at least {} values, got {}", INTERACTION_TABLE_LEN, table.len()),
            ));
        }
        if table.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(ConfigError::invalid(
                "gear.interaction_probability",
                "values must lie in [0, 1]",
            ));
        }
        if table.windows(2).any(|w| w[1] > w[0]) {
            return Err(ConfigError::invalid(
                "gear.interaction_probability",
                "must not increase with distance",
            ));
        }
        if gear.placement_attempts == 0 {
            return Err(ConfigError::invalid("gear.placement_attempts", "must be positive"));
        }
        if gear.sample_years == 0 {
            return Err(ConfigError::invalid("gear.sample_years", "must be positive"));
        }

        Ok(())
    }
}

/// Validated, read-only parameters shared by every system.
#[derive(Resource, Debug, Clone)]
pub struct SimParams {
    pub config: SimConfig,
    /// Weight of each memory slot when computing food attraction
    pub reference_memory: Vec<f32>,
    /// Weight of each memory slot when computing expected energy
    pub working_memory: Vec<f32>,
}

impl SimParams {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mov = &config.movement;
        let reference_memory = memory_decay_table(mov.memory_max, mov.reference_memory_decay);
        let working_memory = memory_decay_table(mov.memory_max, mov.working_memory_decay);
        Ok(Self {
            config,
            reference_memory,
            working_memory,
        })
    }
}
