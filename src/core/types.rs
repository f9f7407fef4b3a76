//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable agent identity.
///
/// Assigned once at creation from a monotonically increasing counter and
/// never reused, so side-tables keyed by it can never alias a newer agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Identity of a product lying on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub u64);

/// Index into the per-type parameter arrays
pub type AgentType = usize;

/// Simulation tick counter (simulation time unit)
pub type Tick = u64;

/// Hands out ids in strictly increasing order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_agent(&mut self) -> AgentId {
        let id = AgentId(self.next);
        self.next += 1;
        id
    }

    pub fn next_product(&mut self) -> ProductId {
        let id = ProductId(self.next);
        self.next += 1;
        id
    }

    /// Make sure ids handed out later are above `seen`.
    ///
    /// Used when agents are re-injected with ids from an earlier run.
    pub fn reserve_past(&mut self, seen: u64) {
        self.next = self.next.max(seen + 1);
    }
}
