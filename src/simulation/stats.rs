//! Reporting snapshot

use serde::{Deserialize, Serialize};

use crate::core::types::Tick;
use crate::disease::DiseaseMutator;
use crate::production::ProductionMapper;
use crate::simulation::Simulation;

/// Population counts at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub tick: Tick,
    /// Live agents per agent type
    pub agents: Vec<usize>,
    pub food_cells: usize,
    pub stones: usize,
    pub products: usize,
    /// Sick agents per agent type
    pub sick: Vec<usize>,
    pub average_energy: f64,
}

impl SimulationStats {
    pub fn total_agents(&self) -> usize {
        self.agents.iter().sum()
    }

    pub fn total_sick(&self) -> usize {
        self.sick.iter().sum()
    }
}

impl Simulation {
    pub fn stats(&self) -> SimulationStats {
        let types = self.config.agent_type_count();
        let mut agents = vec![0; types];
        let mut energy = 0i64;
        let mut live = 0usize;
        for agent in self.agents.iter().filter(|a| a.is_alive()) {
            if let Some(count) = agents.get_mut(agent.agent_type) {
                *count += 1;
            }
            energy += agent.energy as i64;
            live += 1;
        }

        let sick = self
            .registry
            .get::<DiseaseMutator>()
            .map(|d| d.sick_counts().to_vec())
            .unwrap_or_else(|| vec![0; types]);
        let products = self
            .registry
            .get::<ProductionMapper>()
            .map(|p| p.product_count())
            .unwrap_or(0);

        SimulationStats {
            tick: self.tick,
            agents,
            food_cells: self.environment.food_count(),
            stones: self.environment.stone_count(),
            products,
            sick,
            average_energy: if live == 0 { 0.0 } else { energy as f64 / live as f64 },
        }
    }
}
