//! Integration tests for the production field
//!
//! - add/remove of a product restores the field (property based)
//! - the demand curve at the documented thresholds
//! - producers leave drops that other agents consume

use gridlife::agent::{Agent, AgentParams, ParentSet};
use gridlife::core::config::FoodParams;
use gridlife::core::types::{AgentId, ProductId};
use gridlife::genetics::{BehaviorArray, GeneticController, GeneticParams, OutputLayout, Outputs};
use gridlife::production::{production_chance, ProductionMapper, ProductionParams};
use gridlife::spatial::environment::Environment;
use gridlife::spatial::location::{Direction, Location};
use gridlife::spatial::topology::Topology;
use gridlife::{Simulation, SimulationConfig};
use proptest::prelude::*;

fn owner(id: u64, at: Location) -> Agent {
    let params = GeneticParams { memory_bits: 0, comm_bits: 0, ..GeneticParams::default() };
    let table = BehaviorArray::new(params.input_bits(), OutputLayout::new(0, 0));
    Agent::new(
        AgentId(id),
        0,
        at,
        Direction::NORTH,
        AgentParams::default(),
        GeneticController::with_table(&params, table),
        0,
    )
}

proptest! {
    #[test]
    fn prop_add_then_remove_restores_field(
        width in 3i32..16,
        height in 3i32..16,
        wrap_x in any::<bool>(),
        wrap_y in any::<bool>(),
        existing in proptest::collection::vec((0i32..16, 0i32..16, 0.1f32..5.0), 0..4),
        x in 0i32..16,
        y in 0i32..16,
        value in 0.01f32..10.0,
    ) {
        let topology = Topology::new(width, height, wrap_x, wrap_y);
        let mut env = Environment::new(topology, 4);
        let mut mapper = ProductionMapper::new(vec![ProductionParams::default()], topology);

        let mut next = 0u64;
        for (ex, ey, v) in existing {
            let loc = Location::new(ex % width, ey % height);
            if env.has_drop(loc) {
                continue;
            }
            mapper.add_product(&mut env, ProductId(next), v, &owner(next, loc), 0).unwrap();
            next += 1;
        }
        let loc = Location::new(x % width, y % height);
        prop_assume!(!env.has_drop(loc));

        let before: Vec<f32> = mapper.values().values().to_vec();
        mapper.add_product(&mut env, ProductId(1000), value, &owner(1000, loc), 0).unwrap();
        prop_assert!(mapper.value_at(loc).unwrap() >= value - 1e-4);
        mapper.remove_product(&mut env, ProductId(1000)).unwrap();

        for (after, before) in mapper.values().values().iter().zip(&before) {
            prop_assert!((after - before).abs() < 1e-3, "{} vs {}", after, before);
        }
        prop_assert!(!env.has_drop(loc));
    }

    #[test]
    fn prop_chance_zero_above_high_and_non_increasing(v in 6.0f32..40.0, dv in 0.0f32..5.0) {
        let params = ProductionParams::default();
        prop_assert!(production_chance(&params, v) >= production_chance(&params, v + dv) - 1e-7);
        if v > params.high_demand_cutoff {
            prop_assert_eq!(production_chance(&params, v), 0.0);
        }
    }
}

#[test]
fn test_documented_chance_examples() {
    let params = ProductionParams {
        low_demand_threshold: 5.0,
        sweet_demand_threshold: 6.0,
        high_demand_cutoff: 20.0,
        high_demand_chance: 0.001,
        ..ProductionParams::default()
    };
    assert!(production_chance(&params, 20.0).abs() < 1e-6);
    assert!((production_chance(&params, 6.0) - 0.001).abs() < 1e-6);
    assert_eq!(production_chance(&params, 25.0), 0.0);
}

#[test]
fn test_max_value_tracks_field() {
    let topology = Topology::new(8, 8, false, false);
    let mut env = Environment::new(topology, 4);
    let mut mapper = ProductionMapper::new(vec![ProductionParams::default()], topology);
    assert_eq!(mapper.max_value(), 1.0);
    mapper
        .add_product(&mut env, ProductId(1), 3.0, &owner(1, Location::new(2, 2)), 0)
        .unwrap();
    mapper
        .add_product(&mut env, ProductId(2), 3.0, &owner(2, Location::new(3, 2)), 0)
        .unwrap();
    // Each product counts fully on its own cell and on its neighbour's
    assert!((mapper.max_value() - 6.0).abs() < 1e-5);
    mapper.remove_product(&mut env, ProductId(1)).unwrap();
    assert!((mapper.max_value() - 3.0).abs() < 1e-5);
}

fn producer_config() -> SimulationConfig {
    let mut config = SimulationConfig::with_agent_types(1);
    config.environment.width = 12;
    config.environment.height = 12;
    config.environment.wrap_x = true;
    config.environment.wrap_y = true;
    config.environment.food = vec![FoodParams { initial: 0, drop_rate: 0.0 }];
    config.agents[0].initial_count = 0;
    config.agents[0].asexual_breeding = false;
    config.agents[0].sexual_breeding = false;
    config.production[0] = ProductionParams {
        production_mode: true,
        initial_production_chance: 1.0,
        low_demand_chance: 1.0,
        ..ProductionParams::default()
    };
    config
}

fn walker(params: &GeneticParams) -> GeneticController {
    let layout = OutputLayout::new(params.memory_bits, params.comm_bits);
    let mut table = BehaviorArray::new(params.input_bits(), layout);
    for input in 0..table.len() as u32 {
        table.set_raw(input, Outputs { action_code: 2, memory: 0, comm: 0, asexual: false });
    }
    GeneticController::with_table(params, table)
}

#[test]
fn test_walking_producer_leaves_valued_drops() {
    let config = producer_config();
    let genetics = config.genetics[0].clone();
    let mut sim = Simulation::new(config).unwrap();
    let id = sim.spawn(0, Location::new(0, 5), ParentSet::None).unwrap();
    {
        let agent = sim.agent_mut(id).unwrap();
        agent.facing = Direction::EAST;
        agent.controller = walker(&genetics);
    }

    sim.tick().unwrap();
    let mapper = sim.mutator::<ProductionMapper>().unwrap();
    let products: Vec<_> = mapper.products().cloned().collect();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].owner, id);
    assert_eq!(products[0].location, Location::new(1, 5));
    // Energy 99 after one step, relative to 100 initial
    assert!((products[0].value - 0.99).abs() < 1e-6);
    assert!(sim.environment().has_drop(Location::new(1, 5)));
}

#[test]
fn test_producer_dying_on_its_step_leaves_no_product() {
    let mut config = producer_config();
    config.agents[0].step_energy = 5;
    let genetics = config.genetics[0].clone();
    let mut sim = Simulation::new(config).unwrap();
    let id = sim.spawn(0, Location::new(0, 5), ParentSet::None).unwrap();
    {
        let agent = sim.agent_mut(id).unwrap();
        agent.facing = Direction::EAST;
        agent.controller = walker(&genetics);
        agent.energy = 1;
    }

    sim.tick().unwrap();
    assert!(sim.agent(id).is_err());
    let mapper = sim.mutator::<ProductionMapper>().unwrap();
    assert_eq!(mapper.product_count(), 0);
    assert!(!sim.environment().has_drop(Location::new(1, 5)));

    // Nothing was ever added, so nothing is left behind after a clear
    assert_eq!(sim.clear_drops().unwrap(), 0);
    let mapper = sim.mutator::<ProductionMapper>().unwrap();
    let sum: f32 = mapper.values().values().iter().sum();
    assert!(sum < 1e-3, "field sum {}", sum);
    assert_eq!(mapper.max_value(), 1.0);
}

#[test]
fn test_other_agent_consumes_drop() {
    let config = producer_config();
    let genetics = config.genetics[0].clone();
    let mut sim = Simulation::new(config).unwrap();

    let seller = sim.spawn(0, Location::new(0, 5), ParentSet::None).unwrap();
    {
        let agent = sim.agent_mut(seller).unwrap();
        agent.facing = Direction::EAST;
        agent.controller = walker(&genetics);
    }
    sim.tick().unwrap();
    let drop = Location::new(1, 5);
    assert!(sim.environment().has_drop(drop));

    // Stop producing so only consumption is observed
    sim.mutator_mut::<ProductionMapper>()
        .unwrap()
        .params_mut(seller)
        .unwrap()
        .production_mode = false;

    let buyer = sim.spawn(0, Location::new(1, 4), ParentSet::None).unwrap();
    {
        let agent = sim.agent_mut(buyer).unwrap();
        agent.facing = Direction::SOUTH;
        agent.controller = walker(&genetics);
    }
    sim.mutator_mut::<ProductionMapper>()
        .unwrap()
        .params_mut(buyer)
        .unwrap()
        .production_mode = false;

    sim.tick().unwrap();
    assert!(!sim.environment().has_drop(drop));
    assert_eq!(sim.mutator::<ProductionMapper>().unwrap().product_count(), 0);
}
