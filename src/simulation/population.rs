//! Population import/export
//!
//! An [`AgentSnapshot`] carries everything needed to rebuild an agent: its
//! core record plus whatever each registered mutator exports for it, keyed by
//! the mutator's name. Snapshots round-trip through JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::agent::{Agent, AgentParams, ParentSet};
use crate::core::error::{Result, SimError};
use crate::core::types::{AgentId, AgentType, Tick};
use crate::genetics::GeneticController;
use crate::mutator::MutatorContext;
use crate::simulation::Simulation;
use crate::spatial::environment::Placement;
use crate::spatial::location::{Direction, Location};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub agent_type: AgentType,
    pub position: Location,
    pub facing: Direction,
    pub energy: i32,
    pub memory: u32,
    pub comm_in: u32,
    pub comm_out: u32,
    pub birth_tick: Tick,
    pub params: AgentParams,
    pub controller: GeneticController,
    /// Per-mutator state, keyed by mutator name
    #[serde(default)]
    pub state: BTreeMap<String, serde_json::Value>,
}

/// On-disk population format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationFile {
    pub tick: Tick,
    pub agents: Vec<AgentSnapshot>,
}

impl PopulationFile {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl Simulation {
    /// Snapshot every live agent in list order
    pub fn export_population(&self) -> Result<Vec<AgentSnapshot>> {
        let mut snapshots = Vec::with_capacity(self.agents.len());
        for agent in self.agents.iter().filter(|a| a.is_alive()) {
            let mut state = BTreeMap::new();
            for mutator in self.registry.iter() {
                if let Some(value) = mutator.export_state(agent.id)? {
                    state.insert(mutator.name().to_string(), value);
                }
            }
            snapshots.push(AgentSnapshot {
                id: agent.id,
                agent_type: agent.agent_type,
                position: agent.position,
                facing: agent.facing,
                energy: agent.energy,
                memory: agent.memory,
                comm_in: agent.comm_in,
                comm_out: agent.comm_out,
                birth_tick: agent.birth_tick,
                params: agent.params.clone(),
                controller: agent.controller.clone(),
                state,
            });
        }
        Ok(snapshots)
    }

    pub fn export_population_file(&self) -> Result<PopulationFile> {
        Ok(PopulationFile {
            tick: self.tick,
            agents: self.export_population()?,
        })
    }

    /// Rebuild agents from snapshots, appending them to the list.
    ///
    /// Mutators with saved state get it back through `import_state`; a
    /// spawn-capable mutator with nothing saved for the agent treats it as a
    /// parentless spawn. Cells are claimed strictly, so importing onto an
    /// occupied cell fails.
    pub fn import_population(&mut self, snapshots: Vec<AgentSnapshot>) -> Result<Vec<AgentId>> {
        let mut imported = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            if snapshot.agent_type >= self.config.agent_type_count() {
                return Err(SimError::Configuration(format!(
                    "snapshot {} has unknown agent type {}",
                    snapshot.id, snapshot.agent_type
                )));
            }
            if self.agents.contains(snapshot.id) {
                return Err(SimError::IllegalState(format!("{} already exists", snapshot.id)));
            }

            self.environment
                .place_agent(snapshot.position, snapshot.id, Placement::Strict)?;
            self.ids.reserve_past(snapshot.id.0);

            let mut agent = Agent::new(
                snapshot.id,
                snapshot.agent_type,
                snapshot.position,
                snapshot.facing,
                snapshot.params,
                snapshot.controller,
                snapshot.birth_tick,
            );
            agent.energy = snapshot.energy;
            agent.memory = snapshot.memory;
            agent.comm_in = snapshot.comm_in;
            agent.comm_out = snapshot.comm_out;

            let mut state = snapshot.state;
            let mut ctx = MutatorContext {
                tick: self.tick,
                rng: &mut self.rng,
                environment: &mut self.environment,
                ids: &mut self.ids,
            };
            for mutator in self.registry.iter_mut() {
                match state.remove(mutator.name()) {
                    Some(value) => mutator.import_state(agent.id, agent.agent_type, value)?,
                    None if mutator.capabilities().spawn => {
                        mutator.on_spawn(&mut ctx, &mut agent, ParentSet::None)?
                    }
                    None => {}
                }
            }
            for name in state.keys() {
                warn!(agent = %agent.id, mutator = %name, "no mutator for saved state, dropped");
            }

            imported.push(agent.id);
            self.agents.push(agent);
        }
        info!(count = imported.len(), "population imported");
        Ok(imported)
    }

    pub fn import_population_file(&mut self, file: PopulationFile) -> Result<Vec<AgentId>> {
        self.import_population(file.agents)
    }
}
