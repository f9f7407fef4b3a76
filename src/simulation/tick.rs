//! Tick system - advances the simulation one discrete step
//!
//! Order within a tick:
//! 1. environment update (food regrowth)
//! 2. every agent present at the start of the tick, in list order: think,
//!    act, then check whether it still has energy
//! 3. reap dead agents and fire their death notifications
//! 4. periodic mutator update
//! 5. advance the tick counter
//!
//! Every effect of one agent's turn is applied before the next agent moves.
//! Agents born during a tick are appended to the list and first act on the
//! following tick.

use tracing::{debug, trace};

use crate::agent::ParentSet;
use crate::core::error::Result;
use crate::core::types::{AgentId, AgentType, Tick};
use crate::genetics::Action;
use crate::mutator::MutatorContext;
use crate::simulation::Simulation;
use crate::spatial::location::Location;

/// Events generated during a tick, returned by [`Simulation::tick`]
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEvent {
    Born {
        agent: AgentId,
        agent_type: AgentType,
        parents: ParentSet<AgentId>,
    },
    Died {
        agent: AgentId,
        agent_type: AgentType,
        /// Ticks between birth and reaping
        age: Tick,
    },
    /// `initiator` walked into `other`
    Contact { initiator: AgentId, other: AgentId },
    Ate { agent: AgentId, food_type: usize },
}

impl Simulation {
    /// Run one complete tick. A failing hook aborts the tick where it stands;
    /// effects already applied are kept.
    pub fn tick(&mut self) -> Result<Vec<SimulationEvent>> {
        let mut events = Vec::new();

        self.environment
            .update(self.tick, &mut self.rng, &self.config.environment)?;

        let acting = self.agents.len();
        for slot in 0..acting {
            self.agent_turn(slot, &mut events)?;
        }

        self.reap(&mut events)?;

        let mut ctx = MutatorContext {
            tick: self.tick,
            rng: &mut self.rng,
            environment: &mut self.environment,
            ids: &mut self.ids,
        };
        self.registry.dispatch_update(&mut ctx)?;

        self.tick += 1;
        debug!(
            tick = self.tick,
            agents = self.agents.len(),
            events = events.len(),
            "tick complete"
        );
        Ok(events)
    }

    /// Run `ticks` ticks back to back
    pub fn run(&mut self, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(())
    }

    fn agent_turn(&mut self, slot: usize, events: &mut Vec<SimulationEvent>) -> Result<()> {
        let (id, action) = match self.agents.at_mut(slot) {
            Some(agent) if agent.is_alive() => (agent.id, agent.think(&self.environment)),
            _ => return Ok(()),
        };
        trace!(agent = %id, ?action, "decided");

        match action {
            Action::TurnLeft => self.agents.require_mut(id)?.turn_left(),
            Action::TurnRight => self.agents.require_mut(id)?.turn_right(),
            Action::Step => self.step_agent(id, events)?,
        }
        if !self.retire_if_dead(id)? {
            return Ok(());
        }

        self.deliver_comm(id)?;
        self.try_asexual_breeding(id, events)?;
        self.retire_if_dead(id)?;
        Ok(())
    }

    fn step_agent(&mut self, id: AgentId, events: &mut Vec<SimulationEvent>) -> Result<()> {
        let (from, facing) = {
            let agent = self.agents.require(id)?;
            (agent.position, agent.facing)
        };

        // Edge of a non-wrapping grid bumps like a stone
        let to = match self
            .environment
            .adjacent(from, facing)
            .filter(|&to| !self.environment.has_stone(to))
        {
            Some(to) => to,
            None => {
                let agent = self.agents.require_mut(id)?;
                agent.energy -= agent.params.stone_bump_energy;
                return Ok(());
            }
        };

        if let Some(other) = self.environment.agent_at(to) {
            let agent = self.agents.require_mut(id)?;
            agent.energy -= agent.params.agent_bump_energy;
            return self.contact(id, other, events);
        }

        self.environment.move_agent(from, to)?;
        let food = self.environment.remove_food(to)?;

        let agent = self.agents.require_mut(id)?;
        agent.position = to;
        agent.energy -= agent.params.step_energy;
        if let Some(food_type) = food {
            agent.energy += agent.food_value(food_type);
            events.push(SimulationEvent::Ate { agent: id, food_type });
        }
        // Out of energy: the turn ends here and step hooks never see the agent
        if agent.energy <= 0 {
            return Ok(());
        }

        let mut ctx = MutatorContext {
            tick: self.tick,
            rng: &mut self.rng,
            environment: &mut self.environment,
            ids: &mut self.ids,
        };
        self.registry.dispatch_step(&mut ctx, agent, from, to)
    }

    /// Both directions of a contact, initiator first, then sexual breeding
    fn contact(
        &mut self,
        initiator: AgentId,
        other: AgentId,
        events: &mut Vec<SimulationEvent>,
    ) -> Result<()> {
        events.push(SimulationEvent::Contact { initiator, other });
        {
            let (a, b) = self.agents.pair_mut(initiator, other)?;
            let mut ctx = MutatorContext {
                tick: self.tick,
                rng: &mut self.rng,
                environment: &mut self.environment,
                ids: &mut self.ids,
            };
            self.registry.dispatch_contact(&mut ctx, a, b)?;
            self.registry.dispatch_contact(&mut ctx, b, a)?;
        }
        self.try_sexual_breeding(initiator, other, events)
    }

    fn try_sexual_breeding(
        &mut self,
        a: AgentId,
        b: AgentId,
        events: &mut Vec<SimulationEvent>,
    ) -> Result<()> {
        let first = self.agents.require(a)?;
        let second = self.agents.require(b)?;
        if first.agent_type != second.agent_type
            || !first.params.sexual_breeding
            || !first.can_breed()
            || !second.can_breed()
        {
            return Ok(());
        }
        let agent_type = first.agent_type;
        let threshold = self.config.genetics[agent_type].similarity_threshold;
        if first.controller.similarity(&second.controller) < threshold {
            return Ok(());
        }

        if let Some(spot) = self.free_neighbour(first.position) {
            self.breed(agent_type, spot, ParentSet::Two(a, b), events)?;
            self.retire_if_dead(b)?;
        }
        Ok(())
    }

    fn try_asexual_breeding(
        &mut self,
        id: AgentId,
        events: &mut Vec<SimulationEvent>,
    ) -> Result<()> {
        let agent = self.agents.require(id)?;
        if !agent.asexual_flag || !agent.params.asexual_breeding || !agent.can_breed() {
            return Ok(());
        }
        let agent_type = agent.agent_type;
        if let Some(spot) = self.free_neighbour(agent.position) {
            self.breed(agent_type, spot, ParentSet::One(id), events)?;
        }
        Ok(())
    }

    /// Spawn a child at `spot`; each parent pays its breeding energy
    fn breed(
        &mut self,
        agent_type: AgentType,
        spot: Location,
        parents: ParentSet<AgentId>,
        events: &mut Vec<SimulationEvent>,
    ) -> Result<()> {
        let child = self.spawn(agent_type, spot, parents)?;
        for parent in parents.iter() {
            let parent = self.agents.require_mut(parent)?;
            parent.energy -= parent.params.breed_energy;
        }
        events.push(SimulationEvent::Born {
            agent: child,
            agent_type,
            parents,
        });
        Ok(())
    }

    /// Hand a non-zero outbound message to whoever stands directly ahead
    fn deliver_comm(&mut self, id: AgentId) -> Result<()> {
        let agent = self.agents.require(id)?;
        if agent.comm_out == 0 {
            return Ok(());
        }
        let message = agent.comm_out;
        let receiver = self
            .environment
            .adjacent(agent.position, agent.facing)
            .and_then(|ahead| self.environment.agent_at(ahead));
        if let Some(receiver) = receiver {
            self.agents.require_mut(receiver)?.comm_in = message;
            trace!(from = %id, to = %receiver, message, "comm delivered");
        }
        Ok(())
    }

    /// Flip the alive flag once energy runs out and free the cell at once.
    /// Returns whether the agent is still alive.
    fn retire_if_dead(&mut self, id: AgentId) -> Result<bool> {
        let agent = self.agents.require_mut(id)?;
        if !agent.is_alive() {
            return Ok(false);
        }
        if agent.check_alive() {
            return Ok(true);
        }
        let position = agent.position;
        self.environment.remove_agent(position)?;
        debug!(agent = %id, loc = %position, "agent ran out of energy");
        Ok(false)
    }

    /// Remove dead agents from the list, notifying every mutator once each
    fn reap(&mut self, events: &mut Vec<SimulationEvent>) -> Result<()> {
        for agent in self.agents.take_dead() {
            // Hooks may have killed an agent without freeing its cell
            if self.environment.agent_at(agent.position) == Some(agent.id) {
                self.environment.remove_agent(agent.position)?;
            }
            self.registry.dispatch_death(&agent);
            events.push(SimulationEvent::Died {
                agent: agent.id,
                agent_type: agent.agent_type,
                age: self.tick.saturating_sub(agent.birth_tick),
            });
            debug!(agent = %agent.id, tick = self.tick, "agent reaped");
        }
        Ok(())
    }
}
