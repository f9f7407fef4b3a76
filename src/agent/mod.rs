//! Agents - the mobile actors on the grid
//!
//! An agent's core record lives here; everything subsystems track about an
//! agent (disease, production settings) lives in their own side-tables keyed
//! by [`AgentId`].

pub mod store;

pub use store::AgentStore;

use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, AgentType, Tick};
use crate::genetics::{Action, GeneticController, Sensors};
use crate::spatial::environment::Environment;
use crate::spatial::location::{Direction, Location};

/// Per-type agent parameters; each agent carries its own copy so mutators can
/// alter one agent without touching the rest of its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentParams {
    /// Agents of this type placed at setup
    pub initial_count: usize,
    pub initial_energy: i32,
    pub step_energy: i32,
    pub turn_energy: i32,
    /// Cost of walking into a stone or the grid edge
    pub stone_bump_energy: i32,
    /// Cost of walking into another agent
    pub agent_bump_energy: i32,
    /// Energy from food of the agent's own type
    pub food_energy: i32,
    /// Energy from any other food type
    pub other_food_energy: i32,
    /// Energy each parent pays to produce a child
    pub breed_energy: i32,
    pub asexual_breeding: bool,
    pub sexual_breeding: bool,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            initial_count: 10,
            initial_energy: 100,
            step_energy: 1,
            turn_energy: 1,
            stone_bump_energy: 2,
            agent_bump_energy: 2,
            food_energy: 100,
            other_food_energy: 25,
            breed_energy: 60,
            asexual_breeding: true,
            sexual_breeding: true,
        }
    }
}

/// Parameters a mutator may scale on an individual agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentParam {
    StepEnergy,
    TurnEnergy,
    StoneBumpEnergy,
    AgentBumpEnergy,
    FoodEnergy,
    OtherFoodEnergy,
    BreedEnergy,
}

impl AgentParams {
    fn field_mut(&mut self, param: AgentParam) -> &mut i32 {
        match param {
            AgentParam::StepEnergy => &mut self.step_energy,
            AgentParam::TurnEnergy => &mut self.turn_energy,
            AgentParam::StoneBumpEnergy => &mut self.stone_bump_energy,
            AgentParam::AgentBumpEnergy => &mut self.agent_bump_energy,
            AgentParam::FoodEnergy => &mut self.food_energy,
            AgentParam::OtherFoodEnergy => &mut self.other_food_energy,
            AgentParam::BreedEnergy => &mut self.breed_energy,
        }
    }

    pub fn get(&self, param: AgentParam) -> i32 {
        match param {
            AgentParam::StepEnergy => self.step_energy,
            AgentParam::TurnEnergy => self.turn_energy,
            AgentParam::StoneBumpEnergy => self.stone_bump_energy,
            AgentParam::AgentBumpEnergy => self.agent_bump_energy,
            AgentParam::FoodEnergy => self.food_energy,
            AgentParam::OtherFoodEnergy => self.other_food_energy,
            AgentParam::BreedEnergy => self.breed_energy,
        }
    }

    /// Scale one parameter, rounding to the nearest integer
    pub fn multiply(&mut self, param: AgentParam, factor: f32) {
        let field = self.field_mut(param);
        *field = (*field as f32 * factor).round() as i32;
    }
}

/// The parents of a newly spawned agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentSet<T> {
    None,
    One(T),
    Two(T, T),
}

impl<T: Copy> ParentSet<T> {
    pub fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> ParentSet<U> {
        match self {
            ParentSet::None => ParentSet::None,
            ParentSet::One(p) => ParentSet::One(f(p)),
            ParentSet::Two(p1, p2) => {
                let a = f(p1);
                ParentSet::Two(a, f(p2))
            }
        }
    }

    pub fn first(&self) -> Option<T> {
        match *self {
            ParentSet::None => None,
            ParentSet::One(p) | ParentSet::Two(p, _) => Some(p),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = T> {
        let list: Vec<T> = match *self {
            ParentSet::None => vec![],
            ParentSet::One(p) => vec![p],
            ParentSet::Two(p1, p2) => vec![p1, p2],
        };
        list.into_iter()
    }
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub agent_type: AgentType,
    pub energy: i32,
    pub position: Location,
    pub facing: Direction,
    pub memory: u32,
    pub comm_in: u32,
    pub comm_out: u32,
    /// Set by the controller; asks for an asexual birth this turn
    pub asexual_flag: bool,
    pub alive: bool,
    pub birth_tick: Tick,
    pub params: AgentParams,
    pub controller: GeneticController,
}

impl Agent {
    pub fn new(
        id: AgentId,
        agent_type: AgentType,
        position: Location,
        facing: Direction,
        params: AgentParams,
        controller: GeneticController,
        birth_tick: Tick,
    ) -> Self {
        Self {
            id,
            agent_type,
            energy: params.initial_energy,
            position,
            facing,
            memory: 0,
            comm_in: 0,
            comm_out: 0,
            asexual_flag: false,
            alive: true,
            birth_tick,
            params,
            controller,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Read the surroundings into a sensor word
    pub fn sense(&self, env: &Environment) -> Sensors {
        let (seen, distance) = env.look(self.position, self.facing);
        Sensors {
            energy: self.energy,
            facing_code: self.facing.facing_code().unwrap_or(0),
            seen,
            distance,
            memory: self.memory,
            comm_in: self.comm_in,
        }
    }

    /// Run the controller: update memory and outbox, consume the inbox,
    /// and return the chosen action.
    pub fn think(&mut self, env: &Environment) -> Action {
        let sensors = self.sense(env);
        let decision = self.controller.decide(&sensors);
        self.memory = decision.memory;
        self.comm_out = decision.comm_out;
        self.asexual_flag = decision.asexual;
        self.comm_in = 0;
        decision.action
    }

    pub fn turn_left(&mut self) {
        self.facing = self.facing.turn_left();
        self.energy -= self.params.turn_energy;
    }

    pub fn turn_right(&mut self) {
        self.facing = self.facing.turn_right();
        self.energy -= self.params.turn_energy;
    }

    /// Energy gained from eating food of `food_type`
    pub fn food_value(&self, food_type: usize) -> i32 {
        if food_type == self.agent_type {
            self.params.food_energy
        } else {
            self.params.other_food_energy
        }
    }

    pub fn can_breed(&self) -> bool {
        self.alive && self.energy >= self.params.breed_energy
    }

    /// Mark dead if out of energy; returns whether the agent is still alive
    pub fn check_alive(&mut self) -> bool {
        if self.alive && self.energy <= 0 {
            self.alive = false;
        }
        self.alive
    }
}
