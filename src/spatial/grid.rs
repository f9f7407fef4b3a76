//! Generic grid for per-cell data

use crate::spatial::location::Location;

/// Dense row-major 2D grid addressed by [`Location`]
#[derive(Debug, Clone)]
pub struct Grid<T: Clone + Default> {
    pub width: i32,
    pub height: i32,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); (width.max(0) as usize) * (height.max(0) as usize)],
        }
    }

    #[inline]
    fn index(&self, loc: Location) -> Option<usize> {
        if loc.x >= 0 && loc.x < self.width && loc.y >= 0 && loc.y < self.height {
            Some(loc.y as usize * self.width as usize + loc.x as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn get(&self, loc: Location) -> Option<&T> {
        self.index(loc).map(|i| &self.data[i])
    }

    #[inline]
    pub fn get_mut(&mut self, loc: Location) -> Option<&mut T> {
        self.index(loc).map(move |i| &mut self.data[i])
    }

    #[inline]
    pub fn set(&mut self, loc: Location, value: T) {
        if let Some(i) = self.index(loc) {
            self.data[i] = value;
        }
    }

    /// Reset every cell to `T::default()`
    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|cell| *cell = T::default());
    }

    /// Row-major iteration with coordinates
    pub fn iter(&self) -> impl Iterator<Item = (Location, &T)> + '_ {
        let width = self.width.max(1);
        self.data
            .iter()
            .enumerate()
            .map(move |(i, v)| (Location::new(i as i32 % width, i as i32 / width), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Location, &mut T)> + '_ {
        let width = self.width.max(1);
        self.data
            .iter_mut()
            .enumerate()
            .map(move |(i, v)| (Location::new(i as i32 % width, i as i32 / width), v))
    }

    pub fn values(&self) -> &[T] {
        &self.data
    }
}
