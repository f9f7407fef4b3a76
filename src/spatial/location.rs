//! Location and Direction primitives

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Raw neighbour, ignoring grid bounds and wrapping
    pub fn offset(&self, direction: Direction) -> Self {
        Self::new(self.x + direction.x, self.y + direction.y)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Unit step on the grid; each component is -1, 0 or 1.
///
/// y grows southwards, so north is `(0, -1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Direction {
    pub x: i32,
    pub y: i32,
}

impl Direction {
    pub const NORTH: Direction = Direction { x: 0, y: -1 };
    pub const SOUTH: Direction = Direction { x: 0, y: 1 };
    pub const WEST: Direction = Direction { x: -1, y: 0 };
    pub const EAST: Direction = Direction { x: 1, y: 0 };
    pub const NORTHEAST: Direction = Direction { x: 1, y: -1 };
    pub const SOUTHEAST: Direction = Direction { x: 1, y: 1 };
    pub const NORTHWEST: Direction = Direction { x: -1, y: -1 };
    pub const SOUTHWEST: Direction = Direction { x: -1, y: 1 };
    pub const NONE: Direction = Direction { x: 0, y: 0 };

    /// The four headings an agent can face, in facing-code order
    pub const CARDINALS: [Direction; 4] = [
        Direction::NORTH,
        Direction::EAST,
        Direction::SOUTH,
        Direction::WEST,
    ];

    /// Build a direction from arbitrary deltas; only their signs are kept
    pub fn new(dx: i32, dy: i32) -> Self {
        Self {
            x: dx.signum(),
            y: dy.signum(),
        }
    }

    pub fn turn_right(&self) -> Self {
        Self::new(-self.y, self.x)
    }

    pub fn turn_left(&self) -> Self {
        Self::new(self.y, -self.x)
    }

    pub fn reverse(&self) -> Self {
        Self::new(-self.x, -self.y)
    }

    /// 2-bit facing code: N=0, E=1, S=2, W=3.
    ///
    /// Diagonals and `NONE` have no code.
    pub fn facing_code(&self) -> Option<u32> {
        Self::CARDINALS
            .iter()
            .position(|d| d == self)
            .map(|i| i as u32)
    }

    /// Angle in radians between -pi and pi, in standard position
    pub fn heading(&self) -> f64 {
        (self.y as f64).atan2(self.x as f64)
    }
}

impl Default for Direction {
    fn default() -> Self {
        Direction::NORTH
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}
