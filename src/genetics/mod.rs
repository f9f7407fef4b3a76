//! Evolvable behavior: lookup-table controllers and their genetic operators

pub mod behavior;
pub mod bitfield;
pub mod controller;

pub use behavior::{BehaviorArray, OutputLayout, Outputs};
pub use controller::{Action, Decision, GeneticController, Sensors, FIXED_INPUT_BITS};

use serde::{Deserialize, Serialize};

/// Per-type controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticParams {
    /// Width of the agent's memory buffer
    pub memory_bits: u32,
    /// Width of the inbound/outbound communication buffers
    pub comm_bits: u32,
    /// Chance per table entry of being re-rolled in offspring
    pub mutation_rate: f32,
    /// Minimum genetic similarity for two agents to breed on contact
    pub similarity_threshold: f64,
    /// Energy at which the energy sensor saturates
    pub energy_threshold: i32,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            memory_bits: 2,
            comm_bits: 2,
            mutation_rate: 0.05,
            similarity_threshold: 0.5,
            energy_threshold: 160,
        }
    }
}

impl GeneticParams {
    /// Sensor word width; the table has `2^input_bits` entries
    pub fn input_bits(&self) -> u32 {
        FIXED_INPUT_BITS + self.memory_bits + self.comm_bits
    }
}
