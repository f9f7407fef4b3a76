//! Gridlife - discrete-tick grid agent simulation
//!
//! Agents driven by evolvable lookup-table controllers live on a shared grid.
//! Pluggable mutators (disease, production, temperature) react to their
//! spawns, contacts, steps and deaths.

pub mod agent;
pub mod core;
pub mod disease;
pub mod genetics;
pub mod mutator;
pub mod production;
pub mod simulation;
pub mod spatial;
pub mod temperature;

pub use crate::core::config::SimulationConfig;
pub use crate::core::error::{Result, SimError};
pub use crate::simulation::Simulation;
