// dynamics.rs
// Collision models. The free-surface passes only see the `Dynamics` trait,
// so the collision operator can be swapped without touching them.

use ultraviolet::DVec2;

use crate::lattice::{c_vec, equilibrium, Cell, Q, W};

/// A local collision operator.
pub trait Dynamics: Send + Sync {
    /// Relax the populations of one cell toward equilibrium at the given
    /// macroscopic density and velocity.
    fn collide(&self, cell: &mut Cell, rho: f64, u: DVec2);
}

/// Single-relaxation-time BGK collision with a constant body force.
pub struct Bgk {
    pub omega: f64,
    pub force: DVec2,
}

impl Bgk {
    pub fn new(omega: f64, force: DVec2) -> Self {
        assert!(omega > 0.0 && omega < 2.0, "BGK is unstable outside 0 < omega < 2");
        Self { omega, force }
    }
}

impl Dynamics for Bgk {
    fn collide(&self, cell: &mut Cell, rho: f64, u: DVec2) {
        for i in 0..Q {
            let feq = equilibrium(i, rho, u);
            cell.0[i] += self.omega * (feq - cell.0[i]);
            // First-order forcing term.
            let cf = c_vec(i).dot(self.force);
            cell.0[i] += 3.0 * W[i] * rho * cf;
        }
    }
}
