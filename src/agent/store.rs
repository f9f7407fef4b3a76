//! Insertion-ordered agent storage with id lookup

use ahash::AHashMap;

use crate::core::error::{Result, SimError};
use crate::core::types::AgentId;
use crate::agent::Agent;

/// Agents in insertion order; tick processing walks this order
#[derive(Debug, Default)]
pub struct AgentStore {
    agents: Vec<Agent>,
    index: AHashMap<AgentId, usize>,
}

impl AgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn push(&mut self, agent: Agent) {
        self.index.insert(agent.id, self.agents.len());
        self.agents.push(agent);
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.index.get(&id).map(|&i| &self.agents[i])
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.index.get(&id).map(|&i| &mut self.agents[i])
    }

    pub fn require(&self, id: AgentId) -> Result<&Agent> {
        self.get(id).ok_or(SimError::UnknownAgent(id))
    }

    pub fn require_mut(&mut self, id: AgentId) -> Result<&mut Agent> {
        self.get_mut(id).ok_or(SimError::UnknownAgent(id))
    }

    /// Agent at a position in insertion order
    pub fn at(&self, slot: usize) -> Option<&Agent> {
        self.agents.get(slot)
    }

    pub fn at_mut(&mut self, slot: usize) -> Option<&mut Agent> {
        self.agents.get_mut(slot)
    }

    /// Two distinct agents borrowed mutably at once
    pub fn pair_mut(&mut self, a: AgentId, b: AgentId) -> Result<(&mut Agent, &mut Agent)> {
        let ia = *self.index.get(&a).ok_or(SimError::UnknownAgent(a))?;
        let ib = *self.index.get(&b).ok_or(SimError::UnknownAgent(b))?;
        if ia == ib {
            return Err(SimError::IllegalState(format!("{} cannot contact itself", a)));
        }
        if ia < ib {
            let (left, right) = self.agents.split_at_mut(ib);
            Ok((&mut left[ia], &mut right[0]))
        } else {
            let (left, right) = self.agents.split_at_mut(ia);
            Ok((&mut right[0], &mut left[ib]))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.iter_mut()
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(|a| a.id).collect()
    }

    /// Remove every dead agent, preserving the order of the survivors
    pub fn take_dead(&mut self) -> Vec<Agent> {
        if self.agents.iter().all(|a| a.alive) {
            return Vec::new();
        }
        let (alive, dead): (Vec<Agent>, Vec<Agent>) =
            std::mem::take(&mut self.agents).into_iter().partition(|a| a.alive);
        self.agents = alive;
        self.reindex();
        dead
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, agent) in self.agents.iter().enumerate() {
            self.index.insert(agent.id, i);
        }
    }
}
