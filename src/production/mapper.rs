//! ProductionMapper - owns the products and the value field they induce

use ahash::AHashMap;
use rand::Rng;
use std::any::Any;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::agent::{Agent, ParentSet};
use crate::core::error::{Result, SimError};
use crate::core::types::{AgentId, AgentType, ProductId, Tick};
use crate::mutator::{Capabilities, Mutator, MutatorContext};
use crate::production::{Product, ProductionParams};
use crate::spatial::environment::{Environment, Placement};
use crate::spatial::grid::Grid;
use crate::spatial::location::Location;
use crate::spatial::topology::Topology;

const SUBSYSTEM: &str = "production";

/// Chance of producing at field value `v`, before the enable flag and the
/// initial roll are applied
pub fn production_chance(params: &ProductionParams, v: f32) -> f32 {
    let low = params.low_demand_threshold;
    let sweet = params.sweet_demand_threshold;
    let high = params.high_demand_cutoff;

    if v > high {
        0.0
    } else if v <= low {
        params.low_demand_chance
    } else if v <= sweet {
        let peak = (low + sweet) * 0.5;
        let half_width = (sweet - low) * 0.5;
        let x = (v - peak) / half_width;
        1.0 - x * x * (1.0 - params.sweet_demand_start_chance)
    } else {
        // Line through (sweet, high_demand_chance) and (high, 0)
        let m = params.high_demand_chance / (sweet - high);
        let b = -m * high;
        m * v + b
    }
}

pub struct ProductionMapper {
    initial_params: Vec<ProductionParams>,
    agent_data: AHashMap<AgentId, ProductionParams>,
    products: BTreeMap<ProductId, Product>,
    values: Grid<f32>,
    max_value: f32,
    topology: Topology,
}

impl ProductionMapper {
    pub fn new(initial_params: Vec<ProductionParams>, topology: Topology) -> Self {
        Self {
            initial_params,
            agent_data: AHashMap::new(),
            products: BTreeMap::new(),
            values: Grid::new(topology.width, topology.height),
            max_value: 1.0,
            topology,
        }
    }

    pub fn params(&self, agent: AgentId) -> Result<&ProductionParams> {
        self.agent_data
            .get(&agent)
            .ok_or(SimError::UnregisteredAgent { subsystem: SUBSYSTEM, agent })
    }

    pub fn params_mut(&mut self, agent: AgentId) -> Result<&mut ProductionParams> {
        self.agent_data
            .get_mut(&agent)
            .ok_or(SimError::UnregisteredAgent { subsystem: SUBSYSTEM, agent })
    }

    pub fn is_tracked(&self, agent: AgentId) -> bool {
        self.agent_data.contains_key(&agent)
    }

    pub fn tracked_count(&self) -> usize {
        self.agent_data.len()
    }

    pub fn value_at(&self, loc: Location) -> Result<f32> {
        self.values
            .get(loc)
            .copied()
            .ok_or(SimError::InvalidLocation { x: loc.x, y: loc.y })
    }

    pub fn values(&self) -> &Grid<f32> {
        &self.values
    }

    /// Largest field value, never below 1
    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    /// Live products in creation order
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    fn contribution(&self, product: &Product, loc: Location) -> f32 {
        let d2 = self.topology.distance_squared(product.location, loc) as f32;
        product.value / d2.max(1.0)
    }

    /// Apply one product's contribution to every cell.
    ///
    /// Removal recomputes the same formula rather than caching the delta; any
    /// negative residue from float drift is clamped to zero.
    fn update_values(&mut self, product: &Product, add: bool) {
        let mut new_max = 0.0f32;
        let width = self.values.width;
        let height = self.values.height;
        for y in 0..height {
            for x in 0..width {
                let loc = Location::new(x, y);
                let delta = self.contribution(product, loc);
                if let Some(cell) = self.values.get_mut(loc) {
                    if add {
                        *cell += delta;
                    } else {
                        *cell -= delta;
                    }
                    if *cell < 0.0 {
                        *cell = 0.0;
                    }
                    new_max = new_max.max(*cell);
                }
            }
        }
        self.max_value = new_max.max(1.0);
    }

    /// Drop a product worth `value` where `owner` stands
    pub fn add_product(
        &mut self,
        env: &mut Environment,
        id: ProductId,
        value: f32,
        owner: &Agent,
        tick: Tick,
    ) -> Result<ProductId> {
        let product = Product {
            id,
            value,
            owner: owner.id,
            location: owner.position,
            created: tick,
        };
        env.place_drop(product.location, id, Placement::Strict)?;
        self.update_values(&product, true);
        debug!(
            product = id.0,
            owner = %owner.id,
            value,
            loc = %product.location,
            "product dropped"
        );
        self.products.insert(id, product);
        Ok(id)
    }

    pub fn remove_product(&mut self, env: &mut Environment, id: ProductId) -> Result<Product> {
        let product = self
            .products
            .remove(&id)
            .ok_or_else(|| SimError::IllegalState(format!("product {} is not on the grid", id.0)))?;
        env.remove_drop(product.location)?;
        self.update_values(&product, false);
        Ok(product)
    }

    /// Remove every product from the grid and the field
    pub fn clear_products(&mut self, env: &mut Environment) -> Result<usize> {
        let ids: Vec<ProductId> = self.products.keys().copied().collect();
        for id in &ids {
            self.remove_product(env, *id)?;
        }
        Ok(ids.len())
    }

    fn roll<R: Rng + ?Sized>(rng: &mut R, chance: f32) -> bool {
        chance > rng.gen::<f32>()
    }

    pub fn should_produce(&self, ctx: &mut MutatorContext<'_>, agent: &Agent) -> Result<bool> {
        let params = self.params(agent.id)?;
        if agent.energy <= 0 || !agent.is_alive() {
            return Ok(false);
        }
        if !params.production_mode || !Self::roll(&mut *ctx.rng, params.initial_production_chance) {
            return Ok(false);
        }
        if ctx.environment.has_drop(agent.position) {
            return Ok(false);
        }

        let value = self.value_at(agent.position)?;
        if value > params.high_demand_cutoff {
            return Ok(false);
        }
        Ok(Self::roll(&mut *ctx.rng, production_chance(params, value)))
    }

    /// Produce where the agent stands if the field and the dice allow it.
    ///
    /// A product is worth the producer's energy relative to its initial energy.
    pub fn try_production(
        &mut self,
        ctx: &mut MutatorContext<'_>,
        agent: &Agent,
    ) -> Result<Option<ProductId>> {
        if !self.should_produce(ctx, agent)? {
            return Ok(None);
        }
        let value = agent.energy as f32 / agent.params.initial_energy as f32;
        let id = ctx.ids.next_product();
        self.add_product(&mut *ctx.environment, id, value, agent, ctx.tick).map(Some)
    }

    /// Field value ahead relative to here, in [0, 1]
    pub fn product_hunt(&self, env: &Environment, agent: &Agent) -> f32 {
        let ahead = match env.adjacent(agent.position, agent.facing) {
            Some(ahead) => ahead,
            None => return 0.0,
        };
        let here = self.value_at(agent.position).unwrap_or(0.0);
        let there = self.value_at(ahead).unwrap_or(0.0);
        let max = here.max(there);
        if max == 0.0 {
            0.0
        } else {
            there / max
        }
    }
}

impl Mutator for ProductionMapper {
    fn name(&self) -> &'static str {
        SUBSYSTEM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_spawn().with_step()
    }

    fn on_spawn(
        &mut self,
        _ctx: &mut MutatorContext<'_>,
        agent: &mut Agent,
        parents: ParentSet<&Agent>,
    ) -> Result<()> {
        let params = match parents.first() {
            None => self
                .initial_params
                .get(agent.agent_type)
                .cloned()
                .ok_or_else(|| {
                    SimError::Configuration(format!(
                        "no production parameters for agent type {}",
                        agent.agent_type
                    ))
                })?,
            // First parent wins for two-parent spawns
            Some(parent) => self.params(parent.id)?.clone(),
        };
        self.agent_data.insert(agent.id, params);
        Ok(())
    }

    /// Walking onto someone else's product consumes it; then try to produce
    fn on_step(
        &mut self,
        ctx: &mut MutatorContext<'_>,
        agent: &mut Agent,
        _from: Location,
        to: Location,
    ) -> Result<()> {
        if let Some(id) = ctx.environment.drop_at(to) {
            let foreign = self.products.get(&id).map(|p| p.owner != agent.id).unwrap_or(false);
            if foreign {
                self.remove_product(ctx.environment, id)?;
                trace!(agent = %agent.id, product = id.0, "product consumed");
            }
        }
        self.try_production(ctx, agent)?;
        Ok(())
    }

    fn on_death(&mut self, agent: &Agent) {
        self.agent_data.remove(&agent.id);
    }

    fn export_state(&self, agent: AgentId) -> Result<Option<serde_json::Value>> {
        let params = self.params(agent)?;
        Ok(Some(serde_json::to_value(params)?))
    }

    fn import_state(
        &mut self,
        agent: AgentId,
        _agent_type: AgentType,
        state: serde_json::Value,
    ) -> Result<()> {
        let params: ProductionParams = serde_json::from_value(state)?;
        self.agent_data.insert(agent, params);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
