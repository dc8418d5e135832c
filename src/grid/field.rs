// grid/field.rs
// Row-major 2D field over the whole domain. Blocks index into the shared
// storage, so cross-block neighbor reads need no halo exchange.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScalarField2<T> {
    nx: usize,
    ny: usize,
    data: Vec<T>,
}

impl<T: Copy> ScalarField2<T> {
    pub fn new(nx: usize, ny: usize, init: T) -> Self {
        assert!(nx > 0 && ny > 0, "field must be non-empty");
        Self { nx, ny, data: vec![init; nx * ny] }
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    #[inline]
    fn idx(&self, x: i32, y: i32) -> usize {
        debug_assert!(
            x >= 0 && (x as usize) < self.nx && y >= 0 && (y as usize) < self.ny,
            "cell ({}, {}) outside {}x{} field",
            x,
            y,
            self.nx,
            self.ny
        );
        y as usize * self.nx + x as usize
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> T {
        self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, value: T) {
        let i = self.idx(x, y);
        self.data[i] = value;
    }

    #[inline]
    pub fn get_mut(&mut self, x: i32, y: i32) -> &mut T {
        let i = self.idx(x, y);
        &mut self.data[i]
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Raw row-major storage, one row per nx() entries.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_is_row_major() {
        let mut f = ScalarField2::new(4, 3, 0i32);
        f.set(2, 1, 7);
        assert_eq!(f.data()[1 * 4 + 2], 7, "index is y * nx + x");
        assert_eq!(f.get(2, 1), 7);
        *f.get_mut(2, 1) += 1;
        assert_eq!(f.get(2, 1), 8);
    }

    #[test]
    fn fill_overwrites_every_cell() {
        let mut f = ScalarField2::new(3, 3, 1.0f64);
        f.fill(-1.0);
        assert!(f.data().iter().all(|&v| v == -1.0));
    }
}
