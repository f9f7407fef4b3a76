//! Production - a spatial economic field built from products on the grid
//!
//! Every live product adds `value / max(1, d²)` to each cell, where `d` is the
//! cell's (wrap-aware) distance from the product. Agents decide whether to
//! produce based on the field value where they stand:
//!
//! - above `high_demand_cutoff`: never
//! - at or below `low_demand_threshold`: `low_demand_chance`
//! - in the sweet spot: an inverted parabola peaking at 1.0 in the middle
//!   and falling to `sweet_demand_start_chance` at both ends
//! - between sweet and high: a line from `high_demand_chance` down to 0

pub mod mapper;
pub mod product;

pub use mapper::{production_chance, ProductionMapper};
pub use product::Product;

use serde::{Deserialize, Serialize};

/// Per-agent production behaviour; seeded from the type defaults and
/// inherited from the first parent on reproduction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionParams {
    pub production_mode: bool,
    /// Flat roll taken before the field is considered at all
    pub initial_production_chance: f32,
    pub low_demand_threshold: f32,
    pub low_demand_chance: f32,
    pub sweet_demand_threshold: f32,
    pub sweet_demand_start_chance: f32,
    pub high_demand_cutoff: f32,
    pub high_demand_chance: f32,
}

impl Default for ProductionParams {
    fn default() -> Self {
        Self {
            production_mode: false,
            initial_production_chance: 0.8,
            low_demand_threshold: 5.0,
            low_demand_chance: 0.001,
            sweet_demand_threshold: 6.0,
            sweet_demand_start_chance: 0.001,
            high_demand_cutoff: 20.0,
            high_demand_chance: 0.001,
        }
    }
}
