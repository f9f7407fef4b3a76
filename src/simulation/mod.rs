//! Simulation - owns the grid, the agents, the mutators and the random stream
//!
//! Everything a tick touches is owned here and lent out for the duration of
//! one hook call through [`MutatorContext`]. Nothing is shared across threads;
//! [`runner::SimulationRunner`] moves the whole `Simulation` onto its worker.

pub mod population;
pub mod runner;
pub mod stats;
pub mod tick;

pub use population::AgentSnapshot;
pub use runner::{RunnerCommand, SimulationRunner};
pub use stats::SimulationStats;
pub use tick::SimulationEvent;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentStore, ParentSet};
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{AgentId, AgentType, IdAllocator, Tick};
use crate::disease::DiseaseMutator;
use crate::genetics::GeneticController;
use crate::mutator::{Mutator, MutatorContext, MutatorHandle, MutatorRegistry};
use crate::production::ProductionMapper;
use crate::spatial::environment::{Environment, Placement};
use crate::spatial::location::{Direction, Location};
use crate::temperature::TemperatureMutator;

/// What a renderer needs to draw one agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentView {
    pub id: AgentId,
    pub agent_type: AgentType,
    pub position: Location,
    pub facing: Direction,
    pub energy: i32,
    pub sick: bool,
}

pub struct Simulation {
    config: SimulationConfig,
    environment: Environment,
    agents: AgentStore,
    registry: MutatorRegistry,
    rng: ChaCha8Rng,
    ids: IdAllocator,
    tick: Tick,
}

impl Simulation {
    /// Validate `config`, register the built-in mutators and populate the grid
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let mut sim = Self::empty(config)?;
        sim.populate()?;
        info!(
            width = sim.environment.width(),
            height = sim.environment.height(),
            types = sim.config.agent_type_count(),
            agents = sim.agents.len(),
            seed = sim.config.seed,
            "simulation ready"
        );
        Ok(sim)
    }

    /// Validated simulation with mutators registered and nothing on the grid
    pub fn empty(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let environment = Environment::from_config(&config.environment);
        let mut registry = MutatorRegistry::new();
        registry.register(Box::new(DiseaseMutator::new(config.disease.clone())));
        registry.register(Box::new(ProductionMapper::new(
            config.production.clone(),
            environment.topology,
        )));
        registry.register(Box::new(TemperatureMutator::new(
            config.environment.temperature_bands.clone(),
            config.temperature.clone(),
            environment.topology.height,
        )));

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            environment,
            agents: AgentStore::new(),
            registry,
            ids: IdAllocator::new(),
            tick: 0,
        })
    }

    fn populate(&mut self) -> Result<()> {
        for _ in 0..self.config.environment.initial_stones {
            match self.environment.random_empty_location(&mut self.rng) {
                Some(loc) => {
                    self.environment.place_stone(loc, Placement::Strict)?;
                }
                None => break,
            }
        }

        for food_type in 0..self.config.environment.food.len() {
            for _ in 0..self.config.environment.food[food_type].initial {
                match self.environment.random_empty_location(&mut self.rng) {
                    Some(loc) => {
                        self.environment.place_food(loc, food_type, Placement::Strict)?;
                    }
                    None => break,
                }
            }
        }

        for agent_type in 0..self.config.agent_type_count() {
            for _ in 0..self.config.agents[agent_type].initial_count {
                if self.spawn_random(agent_type)?.is_none() {
                    warn!(agent_type, "grid full, initial population truncated");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Register an additional mutator after the built-in ones
    pub fn register_mutator(&mut self, mutator: Box<dyn Mutator>) -> MutatorHandle {
        self.registry.register(mutator)
    }

    /// Spawn a parentless agent of `agent_type` on a random empty cell
    pub fn spawn_random(&mut self, agent_type: AgentType) -> Result<Option<AgentId>> {
        match self.environment.random_empty_location(&mut self.rng) {
            Some(loc) => self.spawn(agent_type, loc, ParentSet::None).map(Some),
            None => Ok(None),
        }
    }

    /// Create an agent at `at` and notify every spawn-capable mutator.
    ///
    /// The controller is random for `None`, a mutated copy for `One`, and a
    /// splice of both parents for `Two`. The new agent is appended to the end
    /// of the agent list.
    pub fn spawn(
        &mut self,
        agent_type: AgentType,
        at: Location,
        parents: ParentSet<AgentId>,
    ) -> Result<AgentId> {
        let genetics = self.config.genetics.get(agent_type).ok_or_else(|| {
            SimError::Configuration(format!("agent type {} is not configured", agent_type))
        })?;
        let params = self.config.agents[agent_type].clone();

        let parent_refs = match parents {
            ParentSet::None => ParentSet::None,
            ParentSet::One(p) => ParentSet::One(self.agents.require(p)?),
            ParentSet::Two(p1, p2) => {
                ParentSet::Two(self.agents.require(p1)?, self.agents.require(p2)?)
            }
        };

        let controller = match parent_refs {
            ParentSet::None => GeneticController::new_random(genetics, &mut self.rng),
            ParentSet::One(p) => {
                GeneticController::from_parent(&p.controller, genetics.mutation_rate, &mut self.rng)
            }
            ParentSet::Two(p1, p2) => GeneticController::from_parents(
                &p1.controller,
                &p2.controller,
                genetics.mutation_rate,
                &mut self.rng,
            )?,
        };
        let facing = Direction::CARDINALS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or_default();

        let id = self.ids.next_agent();
        self.environment.place_agent(at, id, Placement::Strict)?;
        let mut agent = Agent::new(id, agent_type, at, facing, params, controller, self.tick);

        let mut ctx = MutatorContext {
            tick: self.tick,
            rng: &mut self.rng,
            environment: &mut self.environment,
            ids: &mut self.ids,
        };
        self.registry.dispatch_spawn(&mut ctx, &mut agent, parent_refs)?;

        debug!(agent = %id, agent_type, loc = %at, ?parents, "agent spawned");
        self.agents.push(agent);
        Ok(id)
    }

    /// First free cell around `loc`, cardinals before diagonals
    pub(crate) fn free_neighbour(&self, loc: Location) -> Option<Location> {
        const AROUND: [Direction; 8] = [
            Direction::NORTH,
            Direction::EAST,
            Direction::SOUTH,
            Direction::WEST,
            Direction::NORTHEAST,
            Direction::SOUTHEAST,
            Direction::SOUTHWEST,
            Direction::NORTHWEST,
        ];
        AROUND
            .iter()
            .filter_map(|&dir| self.environment.adjacent(loc, dir))
            .find(|&cell| !self.environment.has_stone(cell) && !self.environment.has_agent(cell))
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Grid access for editing tools; placement there should use `Placement::Forgiving`
    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    pub fn agents(&self) -> &AgentStore {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Result<&Agent> {
        self.agents.require(id)
    }

    /// Direct access to an agent's record, for editing tools
    pub fn agent_mut(&mut self, id: AgentId) -> Result<&mut Agent> {
        self.agents.require_mut(id)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn registry(&self) -> &MutatorRegistry {
        &self.registry
    }

    pub fn mutator<T: Mutator>(&self) -> Option<&T> {
        self.registry.get::<T>()
    }

    pub fn mutator_mut<T: Mutator>(&mut self) -> Option<&mut T> {
        self.registry.get_mut::<T>()
    }

    fn disease(&self) -> Result<&DiseaseMutator> {
        self.registry
            .get::<DiseaseMutator>()
            .ok_or_else(|| SimError::IllegalState("disease mutator is not registered".into()))
    }

    pub fn is_sick(&self, id: AgentId) -> Result<bool> {
        self.disease()?.is_sick(id)
    }

    /// Read-only snapshot of every live agent, in list order
    pub fn agent_views(&self) -> Vec<AgentView> {
        let disease = self.registry.get::<DiseaseMutator>();
        self.agents
            .iter()
            .filter(|a| a.is_alive())
            .map(|a| AgentView {
                id: a.id,
                agent_type: a.agent_type,
                position: a.position,
                facing: a.facing,
                energy: a.energy,
                sick: disease.map(|d| d.is_sick(a.id).unwrap_or(false)).unwrap_or(false),
            })
            .collect()
    }

    /// Kill every agent; each one's death notification fires
    pub fn clear_agents(&mut self) -> Result<usize> {
        for agent in self.agents.iter_mut() {
            agent.alive = false;
        }
        let dead = self.agents.take_dead();
        for agent in &dead {
            self.environment.remove_agent(agent.position)?;
            self.registry.dispatch_death(agent);
        }
        info!(count = dead.len(), "agents cleared");
        Ok(dead.len())
    }

    pub fn clear_food(&mut self) {
        self.environment.clear_food();
    }

    pub fn clear_stones(&mut self) {
        self.environment.clear_stones();
    }

    /// Remove every product through the mapper so the field stays consistent
    pub fn clear_drops(&mut self) -> Result<usize> {
        let Self {
            registry, environment, ..
        } = self;
        let mapper = registry
            .get_mut::<ProductionMapper>()
            .ok_or_else(|| SimError::IllegalState("production mapper is not registered".into()))?;
        mapper.clear_products(environment)
    }
}
