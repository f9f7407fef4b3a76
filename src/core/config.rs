//! Simulation configuration
//!
//! The engine consumes an already-parsed [`SimulationConfig`]. Per-type
//! parameters live in parallel arrays (one entry per agent type), the same
//! shape the subsystems are configured with; [`SimulationConfig::validate`]
//! is what guarantees those arrays line up before a `Simulation` exists.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::agent::AgentParams;
use crate::core::error::{Result, SimError};
use crate::disease::DiseaseParams;
use crate::genetics::GeneticParams;
use crate::production::ProductionParams;
use crate::temperature::{TemperatureParams, TEMPERATURE_BANDS};

/// Largest sensor word the lookup table may be indexed with.
///
/// 2^24 entries of `u32` is 64 MiB per agent, well past anything useful.
pub const MAX_INPUT_BITS: u32 = 24;

/// Root of the configuration tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the single random stream every subsystem draws from
    pub seed: u64,
    pub environment: EnvironmentConfig,
    pub agents: Vec<AgentParams>,
    pub genetics: Vec<GeneticParams>,
    pub disease: Vec<DiseaseParams>,
    pub production: Vec<ProductionParams>,
    pub temperature: Vec<TemperatureParams>,
}

/// Grid dimensions and exogenous dynamics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub width: u32,
    pub height: u32,
    pub wrap_x: bool,
    pub wrap_y: bool,
    /// Stones scattered at setup
    pub initial_stones: usize,
    /// How many cells ahead an agent can see
    pub look_distance: u32,
    /// One entry per food type; food type `i` is the preferred food of agent type `i`
    pub food: Vec<FoodParams>,
    /// Temperature of each horizontal band, top band first
    pub temperature_bands: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodParams {
    /// Food cells placed at setup
    pub initial: usize,
    /// Chance per tick that one unit of this food appears on an empty cell
    pub drop_rate: f32,
}

impl Default for FoodParams {
    fn default() -> Self {
        Self {
            initial: 20,
            drop_rate: 0.5,
        }
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            wrap_x: false,
            wrap_y: false,
            initial_stones: 0,
            look_distance: 4,
            food: vec![FoodParams::default()],
            temperature_bands: vec![0.0; TEMPERATURE_BANDS],
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::with_agent_types(1)
    }
}

impl SimulationConfig {
    /// Config with `types` agent types, every per-type array filled with defaults
    pub fn with_agent_types(types: usize) -> Self {
        Self {
            seed: 42,
            environment: EnvironmentConfig {
                food: vec![FoodParams::default(); types],
                ..EnvironmentConfig::default()
            },
            agents: vec![AgentParams::default(); types],
            genetics: vec![GeneticParams::default(); types],
            disease: vec![DiseaseParams::for_type_count(types); types],
            production: vec![ProductionParams::default(); types],
            temperature: vec![TemperatureParams::default(); types],
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn agent_type_count(&self) -> usize {
        self.agents.len()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let types = self.agent_type_count();
        if types == 0 {
            return Err(SimError::Configuration("at least one agent type is required".into()));
        }

        let arrays = [
            ("genetics", self.genetics.len()),
            ("disease", self.disease.len()),
            ("production", self.production.len()),
            ("temperature", self.temperature.len()),
            ("environment.food", self.environment.food.len()),
        ];
        for (name, len) in arrays {
            if len != types {
                return Err(SimError::Configuration(format!(
                    "{} has {} entries but there are {} agent types",
                    name, len, types
                )));
            }
        }

        for (agent_type, disease) in self.disease.iter().enumerate() {
            if disease.transmit_to.len() != types {
                return Err(SimError::Configuration(format!(
                    "disease[{}].transmit_to has {} entries but there are {} agent types",
                    agent_type,
                    disease.transmit_to.len(),
                    types
                )));
            }
        }

        let env = &self.environment;
        if env.width == 0 || env.height == 0 {
            return Err(SimError::Configuration(format!(
                "grid must be non-empty, got {}x{}",
                env.width, env.height
            )));
        }
        if env.width > i32::MAX as u32 || env.height > i32::MAX as u32 {
            return Err(SimError::Configuration("grid dimensions overflow i32".into()));
        }
        if env.look_distance == 0 {
            return Err(SimError::Configuration("look_distance must be at least 1".into()));
        }

        for (agent_type, genetics) in self.genetics.iter().enumerate() {
            if genetics.input_bits() > MAX_INPUT_BITS {
                return Err(SimError::Configuration(format!(
                    "genetics[{}] needs {} input bits, limit is {}",
                    agent_type,
                    genetics.input_bits(),
                    MAX_INPUT_BITS
                )));
            }
            if genetics.energy_threshold <= 0 {
                return Err(SimError::Configuration(format!(
                    "genetics[{}].energy_threshold must be positive",
                    agent_type
                )));
            }
        }

        for (agent_type, agent) in self.agents.iter().enumerate() {
            if agent.initial_energy <= 0 {
                return Err(SimError::Configuration(format!(
                    "agents[{}].initial_energy must be positive",
                    agent_type
                )));
            }
        }

        // Thresholds should be ordered
        for (agent_type, prod) in self.production.iter().enumerate() {
            if !(prod.low_demand_threshold < prod.sweet_demand_threshold
                && prod.sweet_demand_threshold < prod.high_demand_cutoff)
            {
                return Err(SimError::Configuration(format!(
                    "production[{}] thresholds must satisfy low ({}) < sweet ({}) < high ({})",
                    agent_type,
                    prod.low_demand_threshold,
                    prod.sweet_demand_threshold,
                    prod.high_demand_cutoff
                )));
            }
        }

        if env.temperature_bands.len() != TEMPERATURE_BANDS {
            return Err(SimError::Configuration(format!(
                "environment.temperature_bands needs {} entries, got {}",
                TEMPERATURE_BANDS,
                env.temperature_bands.len()
            )));
        }
        for (agent_type, temp) in self.temperature.iter().enumerate() {
            if temp.difference_factor < 0.0 || temp.preferred_range < 0.0 {
                return Err(SimError::Configuration(format!(
                    "temperature[{}] difference_factor and preferred_range must not be negative",
                    agent_type
                )));
            }
        }

        Ok(())
    }
}
