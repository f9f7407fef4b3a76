//! Grid topology: bounds, per-axis wraparound, adjacency and distance

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::spatial::location::{Direction, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub width: i32,
    pub height: i32,
    pub wrap_x: bool,
    pub wrap_y: bool,
}

impl Topology {
    pub fn new(width: i32, height: i32, wrap_x: bool, wrap_y: bool) -> Self {
        Self {
            width,
            height,
            wrap_x,
            wrap_y,
        }
    }

    pub fn cell_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    #[inline]
    pub fn is_valid(&self, loc: Location) -> bool {
        loc.x >= 0 && loc.x < self.width && loc.y >= 0 && loc.y < self.height
    }

    /// Caller-supplied coordinates; out-of-bounds is an error, never clamped
    pub fn checked(&self, x: i32, y: i32) -> Result<Location> {
        let loc = Location::new(x, y);
        if self.is_valid(loc) {
            Ok(loc)
        } else {
            Err(SimError::InvalidLocation { x, y })
        }
    }

    /// Neighbour of `loc` one step along `direction`.
    ///
    /// Wrapping axes fold around; crossing a non-wrapping edge yields `None`.
    pub fn adjacent(&self, loc: Location, direction: Direction) -> Option<Location> {
        let x = Self::fold(loc.x + direction.x, self.width, self.wrap_x)?;
        let y = Self::fold(loc.y + direction.y, self.height, self.wrap_y)?;
        Some(Location::new(x, y))
    }

    fn fold(value: i32, size: i32, wrap: bool) -> Option<i32> {
        if (0..size).contains(&value) {
            Some(value)
        } else if wrap {
            Some(value.rem_euclid(size))
        } else {
            None
        }
    }

    /// Squared distance; toroidal along wrapping axes
    pub fn distance_squared(&self, from: Location, to: Location) -> f64 {
        let dx = Self::axis_delta(from.x, to.x, self.width, self.wrap_x) as f64;
        let dy = Self::axis_delta(from.y, to.y, self.height, self.wrap_y) as f64;
        dx * dx + dy * dy
    }

    pub fn distance(&self, from: Location, to: Location) -> f64 {
        self.distance_squared(from, to).sqrt()
    }

    fn axis_delta(a: i32, b: i32, size: i32, wrap: bool) -> i32 {
        let d = (a - b).abs();
        if wrap {
            d.min(size - d)
        } else {
            d
        }
    }

    /// Rejection-sample a location satisfying `accept`.
    ///
    /// Gives up after `max_attempts` draws so a saturated grid cannot hang a tick.
    pub fn random_location<R, F>(
        &self,
        rng: &mut R,
        max_attempts: usize,
        mut accept: F,
    ) -> Option<Location>
    where
        R: Rng + ?Sized,
        F: FnMut(Location) -> bool,
    {
        for _ in 0..max_attempts {
            let loc = Location::new(rng.gen_range(0..self.width), rng.gen_range(0..self.height));
            if self.is_valid(loc) && accept(loc) {
                return Some(loc);
            }
        }
        None
    }

    /// Row-major iteration over every cell
    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Location::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_east_from_rightmost_column_wraps() {
        let topo = Topology::new(10, 10, true, false);
        let adj = topo.adjacent(Location::new(9, 4), Direction::EAST);
        assert_eq!(adj, Some(Location::new(0, 4)));
    }

    #[test]
    fn test_east_from_rightmost_column_without_wrap_is_invalid() {
        let topo = Topology::new(10, 10, false, false);
        assert_eq!(topo.adjacent(Location::new(9, 4), Direction::EAST), None);
    }

    #[test]
    fn test_wrap_is_per_axis() {
        let topo = Topology::new(10, 10, true, false);
        assert_eq!(topo.adjacent(Location::new(5, 0), Direction::NORTH), None);
        assert_eq!(topo.adjacent(Location::new(0, 0), Direction::WEST), Some(Location::new(9, 0)));

        let topo = Topology::new(10, 10, false, true);
        assert_eq!(topo.adjacent(Location::new(5, 0), Direction::NORTH), Some(Location::new(5, 9)));
    }

    #[test]
    fn test_toroidal_distance() {
        let flat = Topology::new(10, 10, false, false);
        let torus = Topology::new(10, 10, true, true);
        let a = Location::new(0, 0);
        let b = Location::new(9, 9);

        assert_eq!(flat.distance_squared(a, b), 162.0);
        assert_eq!(torus.distance_squared(a, b), 2.0);
        assert!((torus.distance(a, b) - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_checked_rejects_out_of_bounds() {
        let topo = Topology::new(4, 4, false, false);
        assert!(topo.checked(3, 3).is_ok());
        assert!(matches!(topo.checked(4, 0), Err(SimError::InvalidLocation { x: 4, y: 0 })));
        assert!(matches!(topo.checked(-1, 2), Err(SimError::InvalidLocation { .. })));
    }

    #[test]
    fn test_random_location_respects_predicate() {
        let topo = Topology::new(8, 8, false, false);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..50 {
            let loc = topo.random_location(&mut rng, 1000, |l| l.x == 3).unwrap();
            assert_eq!(loc.x, 3);
        }
        assert!(topo.random_location(&mut rng, 100, |_| false).is_none());
    }

    #[test]
    fn test_locations_cover_grid() {
        let topo = Topology::new(3, 2, false, false);
        let all: Vec<_> = topo.locations().collect();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0], Location::new(0, 0));
        assert_eq!(all[5], Location::new(2, 1));
    }
}
