use thiserror::Error;

use crate::core::types::AgentId;
use crate::spatial::environment::Occupant;
use crate::spatial::location::Location;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Location ({x}, {y}) is outside the grid")]
    InvalidLocation { x: i32, y: i32 },

    #[error("Cell {location} is already occupied by {occupant:?}")]
    OccupancyConflict { location: Location, occupant: Occupant },

    #[error("{subsystem} has no state for {agent}")]
    UnregisteredAgent { subsystem: &'static str, agent: AgentId },

    #[error("Agent not found: {0}")]
    UnknownAgent(AgentId),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
