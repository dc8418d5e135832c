// lattice.rs
// D2Q9 lattice constants and the per-cell population storage.

use serde::{Deserialize, Serialize};
use ultraviolet::DVec2;

/// Number of discrete velocities.
pub const Q: usize = 9;

/// Discrete velocity set. Index 0 is the rest population, 1-4 the axis
/// directions, 5-8 the diagonals.
pub const C: [[i32; 2]; Q] = [
    [0, 0],
    [1, 0],
    [0, 1],
    [-1, 0],
    [0, -1],
    [1, 1],
    [-1, 1],
    [-1, -1],
    [1, -1],
];

/// Lattice weights matching `C`.
pub const W: [f64; Q] = [
    4.0 / 9.0,
    1.0 / 9.0,
    1.0 / 9.0,
    1.0 / 9.0,
    1.0 / 9.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
];

/// OPP[i] is the index of the velocity opposite to C[i].
pub const OPP: [usize; Q] = [0, 3, 4, 1, 2, 7, 8, 5, 6];

#[inline]
pub fn c_vec(i: usize) -> DVec2 {
    DVec2::new(C[i][0] as f64, C[i][1] as f64)
}

/// Second-order equilibrium population for direction `i`.
#[inline]
pub fn equilibrium(i: usize, rho: f64, u: DVec2) -> f64 {
    let cu = C[i][0] as f64 * u.x + C[i][1] as f64 * u.y;
    W[i] * rho * (1.0 + 3.0 * cu + 4.5 * cu * cu - 1.5 * u.mag_sq())
}

/// The nine populations of one lattice cell.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Cell(pub [f64; Q]);

impl Cell {
    /// Cell initialized at equilibrium for the given density and velocity.
    pub fn at_equilibrium(rho: f64, u: DVec2) -> Self {
        let mut f = [0.0; Q];
        for (i, fi) in f.iter_mut().enumerate() {
            *fi = equilibrium(i, rho, u);
        }
        Self(f)
    }

    pub fn density(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn momentum(&self) -> DVec2 {
        let mut j = DVec2::zero();
        for i in 1..Q {
            j += c_vec(i) * self.0[i];
        }
        j
    }

    /// Density and momentum in one sweep.
    pub fn moments(&self) -> (f64, DVec2) {
        (self.density(), self.momentum())
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::at_equilibrium(1.0, DVec2::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_directions_cancel() {
        for i in 0..Q {
            assert_eq!(C[i][0], -C[OPP[i]][0], "x component of direction {} mirrors", i);
            assert_eq!(C[i][1], -C[OPP[i]][1], "y component of direction {} mirrors", i);
            assert_eq!(OPP[OPP[i]], i, "opposite is an involution");
        }
    }

    #[test]
    fn weights_sum_to_one() {
        let sum: f64 = W.iter().sum();
        assert!((sum - 1.0).abs() < 1e-15);
    }

    #[test]
    fn equilibrium_recovers_its_moments() {
        let rho = 0.85;
        let u = DVec2::new(0.03, -0.01);
        let cell = Cell::at_equilibrium(rho, u);
        let (r, j) = cell.moments();
        assert!((r - rho).abs() < 1e-12, "equilibrium density matches input");
        assert!((j - u * rho).mag() < 1e-12, "equilibrium momentum matches rho * u");
    }

    #[test]
    fn resting_equilibrium_is_isotropic() {
        let cell = Cell::at_equilibrium(1.0, DVec2::zero());
        for i in 1..Q {
            assert!(
                (cell.0[i] - W[i]).abs() < 1e-15,
                "at rest each population equals its weight"
            );
        }
    }
}
