use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, ProductId, Tick};
use crate::spatial::location::Location;

/// An item lying on the grid as a drop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub value: f32,
    pub owner: AgentId,
    pub location: Location,
    pub created: Tick,
}
