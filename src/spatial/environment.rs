//! Environment - the shared grid every agent lives on
//!
//! Each cell holds at most one of {stone, food, drop}; agent presence is a
//! separate index since agents may stand on food or drops but never on stone.
//!
//! Placement takes an explicit [`Placement`] policy. Editing paths pass
//! `Forgiving` and get `Ok(false)` back when the slot is taken; engine paths
//! pass `Strict` and get `SimError::OccupancyConflict` instead.

use ahash::AHashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::config::EnvironmentConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{AgentId, ProductId, Tick};
use crate::spatial::grid::Grid;
use crate::spatial::location::{Direction, Location};
use crate::spatial::topology::Topology;

pub const FLAG_STONE: u8 = 1;
pub const FLAG_FOOD: u8 = 1 << 1;
pub const FLAG_DROP: u8 = 1 << 2;

/// Exclusive content of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellContent {
    #[default]
    Empty,
    Stone,
    Food(usize),
    Drop(ProductId),
}

impl CellContent {
    /// Bitfield view used by renderers
    pub fn flags(&self) -> u8 {
        match self {
            CellContent::Empty => 0,
            CellContent::Stone => FLAG_STONE,
            CellContent::Food(_) => FLAG_FOOD,
            CellContent::Drop(_) => FLAG_DROP,
        }
    }
}

/// Whatever blocked a placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Stone,
    Food(usize),
    Drop(ProductId),
    Agent(AgentId),
}

/// How placement reacts to an occupied slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Occupied slot is a silent no-op (interactive editing)
    Forgiving,
    /// Occupied slot is an `OccupancyConflict` error (engine and import paths)
    Strict,
}

/// What an agent sees when looking ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seen {
    Nothing = 0,
    Stone = 1,
    Food = 2,
    Agent = 3,
}

pub struct Environment {
    pub topology: Topology,
    cells: Grid<CellContent>,
    agents: AHashMap<Location, AgentId>,
    look_distance: u32,
}

impl Environment {
    pub fn new(topology: Topology, look_distance: u32) -> Self {
        Self {
            cells: Grid::new(topology.width, topology.height),
            agents: AHashMap::new(),
            topology,
            look_distance,
        }
    }

    pub fn from_config(config: &EnvironmentConfig) -> Self {
        let topology = Topology::new(
            config.width as i32,
            config.height as i32,
            config.wrap_x,
            config.wrap_y,
        );
        Self::new(topology, config.look_distance)
    }

    pub fn width(&self) -> i32 {
        self.topology.width
    }

    pub fn height(&self) -> i32 {
        self.topology.height
    }

    pub fn look_distance(&self) -> u32 {
        self.look_distance
    }

    fn check(&self, loc: Location) -> Result<()> {
        if self.topology.is_valid(loc) {
            Ok(())
        } else {
            Err(SimError::InvalidLocation { x: loc.x, y: loc.y })
        }
    }

    /// Content of a cell, for read-only polling
    pub fn cell(&self, loc: Location) -> Result<CellContent> {
        self.cells
            .get(loc)
            .copied()
            .ok_or(SimError::InvalidLocation { x: loc.x, y: loc.y })
    }

    pub fn cells(&self) -> &Grid<CellContent> {
        &self.cells
    }

    fn content(&self, loc: Location) -> CellContent {
        self.cells.get(loc).copied().unwrap_or_default()
    }

    pub fn has_stone(&self, loc: Location) -> bool {
        self.content(loc) == CellContent::Stone
    }

    pub fn has_food(&self, loc: Location) -> bool {
        matches!(self.content(loc), CellContent::Food(_))
    }

    pub fn food_type(&self, loc: Location) -> Option<usize> {
        match self.content(loc) {
            CellContent::Food(food_type) => Some(food_type),
            _ => None,
        }
    }

    pub fn has_drop(&self, loc: Location) -> bool {
        matches!(self.content(loc), CellContent::Drop(_))
    }

    pub fn drop_at(&self, loc: Location) -> Option<ProductId> {
        match self.content(loc) {
            CellContent::Drop(id) => Some(id),
            _ => None,
        }
    }

    pub fn agent_at(&self, loc: Location) -> Option<AgentId> {
        self.agents.get(&loc).copied()
    }

    pub fn has_agent(&self, loc: Location) -> bool {
        self.agents.contains_key(&loc)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Nothing on the cell and nobody standing on it
    pub fn is_empty(&self, loc: Location) -> bool {
        self.topology.is_valid(loc)
            && self.content(loc) == CellContent::Empty
            && !self.has_agent(loc)
    }

    /// Shared tail of every exclusive placement: either report the conflict
    /// according to `policy` or write `content`.
    fn place_content(
        &mut self,
        loc: Location,
        content: CellContent,
        blocker: Option<Occupant>,
        policy: Placement,
    ) -> Result<bool> {
        if let Some(occupant) = blocker {
            return match policy {
                Placement::Forgiving => {
                    debug!(%loc, ?occupant, "placement skipped, cell occupied");
                    Ok(false)
                }
                Placement::Strict => Err(SimError::OccupancyConflict { location: loc, occupant }),
            };
        }
        self.cells.set(loc, content);
        Ok(true)
    }

    fn exclusive_occupant(&self, loc: Location) -> Option<Occupant> {
        match self.content(loc) {
            CellContent::Empty => None,
            CellContent::Stone => Some(Occupant::Stone),
            CellContent::Food(t) => Some(Occupant::Food(t)),
            CellContent::Drop(id) => Some(Occupant::Drop(id)),
        }
    }

    pub fn place_stone(&mut self, loc: Location, policy: Placement) -> Result<bool> {
        self.check(loc)?;
        let blocker = self
            .exclusive_occupant(loc)
            .or_else(|| self.agent_at(loc).map(Occupant::Agent));
        self.place_content(loc, CellContent::Stone, blocker, policy)
    }

    pub fn remove_stone(&mut self, loc: Location) -> Result<bool> {
        self.check(loc)?;
        if self.has_stone(loc) {
            self.cells.set(loc, CellContent::Empty);
            return Ok(true);
        }
        Ok(false)
    }

    pub fn place_food(
        &mut self,
        loc: Location,
        food_type: usize,
        policy: Placement,
    ) -> Result<bool> {
        self.check(loc)?;
        let blocker = self.exclusive_occupant(loc);
        self.place_content(loc, CellContent::Food(food_type), blocker, policy)
    }

    /// Remove food, returning its type if there was any
    pub fn remove_food(&mut self, loc: Location) -> Result<Option<usize>> {
        self.check(loc)?;
        let food = self.food_type(loc);
        if food.is_some() {
            self.cells.set(loc, CellContent::Empty);
        }
        Ok(food)
    }

    /// Put a product on the grid. Food on the cell is cleared first.
    pub fn place_drop(
        &mut self,
        loc: Location,
        product: ProductId,
        policy: Placement,
    ) -> Result<bool> {
        self.check(loc)?;
        if self.has_food(loc) {
            self.cells.set(loc, CellContent::Empty);
        }
        let blocker = self.exclusive_occupant(loc);
        self.place_content(loc, CellContent::Drop(product), blocker, policy)
    }

    pub fn remove_drop(&mut self, loc: Location) -> Result<Option<ProductId>> {
        self.check(loc)?;
        let drop = self.drop_at(loc);
        if drop.is_some() {
            self.cells.set(loc, CellContent::Empty);
        }
        Ok(drop)
    }

    pub fn place_agent(
        &mut self,
        loc: Location,
        agent: AgentId,
        policy: Placement,
    ) -> Result<bool> {
        self.check(loc)?;
        let blocker = if self.has_stone(loc) {
            Some(Occupant::Stone)
        } else {
            self.agent_at(loc).map(Occupant::Agent)
        };
        if let Some(occupant) = blocker {
            return match policy {
                Placement::Forgiving => Ok(false),
                Placement::Strict => Err(SimError::OccupancyConflict { location: loc, occupant }),
            };
        }
        self.agents.insert(loc, agent);
        Ok(true)
    }

    pub fn remove_agent(&mut self, loc: Location) -> Result<Option<AgentId>> {
        self.check(loc)?;
        Ok(self.agents.remove(&loc))
    }

    /// Move the agent standing on `from` to the free cell `to`
    pub fn move_agent(&mut self, from: Location, to: Location) -> Result<()> {
        self.check(to)?;
        let agent = self
            .agents
            .get(&from)
            .copied()
            .ok_or_else(|| SimError::IllegalState(format!("no agent to move at {}", from)))?;
        self.place_agent(to, agent, Placement::Strict)?;
        self.agents.remove(&from);
        Ok(())
    }

    pub fn adjacent(&self, loc: Location, direction: Direction) -> Option<Location> {
        self.topology.adjacent(loc, direction)
    }

    pub fn distance_squared(&self, from: Location, to: Location) -> f64 {
        self.topology.distance_squared(from, to)
    }

    pub fn distance(&self, from: Location, to: Location) -> f64 {
        self.topology.distance(from, to)
    }

    /// Scan ahead up to `look_distance` cells for the first visible thing.
    ///
    /// The grid edge looks like stone; food and drops look alike.
    pub fn look(&self, from: Location, facing: Direction) -> (Seen, u32) {
        let mut current = from;
        for dist in 1..=self.look_distance {
            let next = match self.adjacent(current, facing) {
                Some(next) => next,
                None => return (Seen::Stone, dist),
            };
            if self.has_agent(next) {
                return (Seen::Agent, dist);
            }
            match self.content(next) {
                CellContent::Stone => return (Seen::Stone, dist),
                CellContent::Food(_) | CellContent::Drop(_) => return (Seen::Food, dist),
                CellContent::Empty => {}
            }
            current = next;
        }
        (Seen::Nothing, self.look_distance)
    }

    /// Random cell with no content and no agent
    pub fn random_empty_location<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Location> {
        let attempts = self.topology.cell_count() * 4;
        let found = self.topology.random_location(rng, attempts, |loc| self.is_empty(loc));
        if found.is_none() {
            warn!("no empty cell found after {} attempts", attempts);
        }
        found
    }

    /// Exogenous dynamics: every food type rolls its drop rate once per tick
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        tick: Tick,
        rng: &mut R,
        config: &EnvironmentConfig,
    ) -> Result<()> {
        for (food_type, food) in config.food.iter().enumerate() {
            if food.drop_rate > 0.0 && rng.gen::<f32>() < food.drop_rate {
                if let Some(loc) = self.random_empty_location(rng) {
                    self.place_food(loc, food_type, Placement::Strict)?;
                    debug!(tick, food_type, %loc, "food grew");
                }
            }
        }
        Ok(())
    }

    pub fn food_count(&self) -> usize {
        self.cells
            .values()
            .iter()
            .filter(|c| matches!(c, CellContent::Food(_)))
            .count()
    }

    pub fn stone_count(&self) -> usize {
        self.cells
            .values()
            .iter()
            .filter(|c| **c == CellContent::Stone)
            .count()
    }

    pub fn clear_food(&mut self) {
        for (_, cell) in self.cells.iter_mut() {
            if matches!(cell, CellContent::Food(_)) {
                *cell = CellContent::Empty;
            }
        }
    }

    pub fn clear_stones(&mut self) {
        for (_, cell) in self.cells.iter_mut() {
            if *cell == CellContent::Stone {
                *cell = CellContent::Empty;
            }
        }
    }

    /// Locations of every drop, row-major
    pub fn drop_locations(&self) -> Vec<Location> {
        self.cells
            .iter()
            .filter(|(_, c)| matches!(c, CellContent::Drop(_)))
            .map(|(loc, _)| loc)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn env() -> Environment {
        Environment::new(Topology::new(10, 10, false, false), 4)
    }

    #[test]
    fn test_exclusive_flags() {
        let mut env = env();
        let loc = Location::new(2, 2);
        assert!(env.place_stone(loc, Placement::Strict).unwrap());
        assert!(!env.place_food(loc, 0, Placement::Forgiving).unwrap());
        assert!(env.has_stone(loc));
        assert!(!env.has_food(loc));
    }

    #[test]
    fn test_strict_placement_raises_conflict() {
        let mut env = env();
        let loc = Location::new(2, 2);
        env.place_stone(loc, Placement::Strict).unwrap();
        let err = env.place_food(loc, 1, Placement::Strict).unwrap_err();
        assert!(matches!(
            err,
            SimError::OccupancyConflict { occupant: Occupant::Stone, .. }
        ));
    }

    #[test]
    fn test_out_of_bounds_is_error_not_clamped() {
        let mut env = env();
        assert!(matches!(
            env.place_food(Location::new(10, 0), 0, Placement::Forgiving),
            Err(SimError::InvalidLocation { x: 10, y: 0 })
        ));
        assert!(env.cell(Location::new(-1, 0)).is_err());
    }

    #[test]
    fn test_drop_clears_food() {
        let mut env = env();
        let loc = Location::new(1, 1);
        env.place_food(loc, 0, Placement::Strict).unwrap();
        assert!(env.place_drop(loc, ProductId(9), Placement::Strict).unwrap());
        assert!(!env.has_food(loc));
        assert_eq!(env.drop_at(loc), Some(ProductId(9)));
        assert_eq!(env.cell(loc).unwrap().flags(), FLAG_DROP);
    }

    #[test]
    fn test_agents_cannot_stand_on_stone_or_each_other() {
        let mut env = env();
        let stone = Location::new(0, 0);
        env.place_stone(stone, Placement::Strict).unwrap();
        assert!(env.place_agent(stone, AgentId(1), Placement::Strict).is_err());

        let loc = Location::new(4, 4);
        env.place_agent(loc, AgentId(1), Placement::Strict).unwrap();
        assert!(!env.place_agent(loc, AgentId(2), Placement::Forgiving).unwrap());
        assert_eq!(env.agent_at(loc), Some(AgentId(1)));

        // Agents may share a cell with food
        env.place_food(loc, 0, Placement::Strict).unwrap();
        assert!(env.has_food(loc));
    }

    #[test]
    fn test_move_agent() {
        let mut env = env();
        let from = Location::new(4, 4);
        let to = Location::new(5, 4);
        env.place_agent(from, AgentId(3), Placement::Strict).unwrap();
        env.move_agent(from, to).unwrap();
        assert_eq!(env.agent_at(to), Some(AgentId(3)));
        assert!(!env.has_agent(from));
    }

    #[test]
    fn test_look_sees_first_object() {
        let mut env = env();
        let me = Location::new(5, 5);
        env.place_food(Location::new(5, 3), 0, Placement::Strict).unwrap();
        env.place_stone(Location::new(5, 2), Placement::Strict).unwrap();
        assert_eq!(env.look(me, Direction::NORTH), (Seen::Food, 2));

        env.place_agent(Location::new(6, 5), AgentId(7), Placement::Strict).unwrap();
        assert_eq!(env.look(me, Direction::EAST), (Seen::Agent, 1));

        // Nothing within range to the south (rows 6..=9)
        assert_eq!(env.look(me, Direction::SOUTH), (Seen::Nothing, 4));
    }

    #[test]
    fn test_look_treats_edge_as_stone() {
        let env = env();
        assert_eq!(env.look(Location::new(8, 0), Direction::EAST), (Seen::Stone, 2));
    }

    #[test]
    fn test_food_regrowth() {
        let mut env = env();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut config = EnvironmentConfig::default();
        config.food = vec![crate::core::config::FoodParams { initial: 0, drop_rate: 1.0 }];
        for tick in 0..5 {
            env.update(tick, &mut rng, &config).unwrap();
        }
        assert_eq!(env.food_count(), 5);
    }

    #[test]
    fn test_random_empty_location_on_full_grid() {
        let mut env = Environment::new(Topology::new(2, 1, false, false), 1);
        env.place_stone(Location::new(0, 0), Placement::Strict).unwrap();
        env.place_stone(Location::new(1, 0), Placement::Strict).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(env.random_empty_location(&mut rng).is_none());
    }
}
