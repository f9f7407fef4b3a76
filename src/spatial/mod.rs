pub mod environment;
pub mod grid;
pub mod location;
pub mod topology;

pub use environment::{CellContent, Environment, Occupant, Placement, Seen};
pub use grid::Grid;
pub use location::{Direction, Location};
pub use topology::Topology;
