// free_surface/pipeline.rs
// Owns the simulation fields and runs the free-surface passes of one
// iteration in their required order.

use rayon::prelude::*;
use ultraviolet::DVec2;

use crate::dynamics::Dynamics;
use crate::grid::{BlockLayout, ScalarField2};
use crate::lattice::{Cell, C, OPP, Q};
use crate::profile_scope;

use super::flag::Flag;
use super::mass;
use super::stats::{self, SurfaceStats};
use super::topology::{self, InterfaceLists};

/// All per-cell fields of the free-surface model plus the scratch lists the
/// state-machine passes hand to each other within one iteration.
///
/// Invariant: the outermost cell ring is `Wall`, so neighbor reads from wet
/// and gas cells never leave the domain.
pub struct FreeSurfaceFields {
    pub layout: BlockLayout,
    pub lattice: ScalarField2<Cell>,
    lattice_back: ScalarField2<Cell>,
    pub flag: ScalarField2<Flag>,
    pub mass: ScalarField2<f64>,
    pub volume_fraction: ScalarField2<f64>,
    /// Density cache from the previous macroscopic pass.
    pub rho: ScalarField2<f64>,
    /// Momentum cache from the previous macroscopic pass.
    pub j: ScalarField2<DVec2>,
    /// Gas density seen by interface cells, written by the bubble ledger.
    pub outside_density: ScalarField2<f64>,
    pub rho_default: f64,
    pub(super) lists: InterfaceLists,
    /// Mass dropped by cells that emptied with no interface neighbor left.
    pub lost_mass: f64,
    pub stats: SurfaceStats,
}

impl FreeSurfaceFields {
    /// Fields for the given layout, walls everywhere. A scenario then paints
    /// the interior with fluid, interface and gas cells.
    pub fn new(layout: BlockLayout, rho_default: f64) -> Self {
        let (nx, ny) = (layout.nx(), layout.ny());
        let cell = Cell::at_equilibrium(rho_default, DVec2::zero());
        Self {
            lattice: ScalarField2::new(nx, ny, cell),
            lattice_back: ScalarField2::new(nx, ny, cell),
            flag: ScalarField2::new(nx, ny, Flag::Wall),
            mass: ScalarField2::new(nx, ny, 0.0),
            volume_fraction: ScalarField2::new(nx, ny, 0.0),
            rho: ScalarField2::new(nx, ny, rho_default),
            j: ScalarField2::new(nx, ny, DVec2::zero()),
            outside_density: ScalarField2::new(nx, ny, rho_default),
            rho_default,
            lists: InterfaceLists::default(),
            lost_mass: 0.0,
            stats: SurfaceStats::default(),
            layout,
        }
    }

    /// Rebuild from checkpointed fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        layout: BlockLayout,
        lattice: ScalarField2<Cell>,
        flag: ScalarField2<Flag>,
        mass: ScalarField2<f64>,
        volume_fraction: ScalarField2<f64>,
        rho: ScalarField2<f64>,
        j: ScalarField2<DVec2>,
        outside_density: ScalarField2<f64>,
        rho_default: f64,
        lost_mass: f64,
    ) -> Self {
        let lattice_back = lattice.clone();
        Self {
            layout,
            lattice,
            lattice_back,
            flag,
            mass,
            volume_fraction,
            rho,
            j,
            outside_density,
            rho_default,
            lists: InterfaceLists::default(),
            lost_mass,
            stats: SurfaceStats::default(),
        }
    }

    /// One full free-surface iteration.
    ///
    /// Pass order matters: mass exchange and completion read the post-stream
    /// populations together with the previous iteration's macroscopic caches,
    /// and the state flips only run once the new volume fractions are in.
    pub fn step(&mut self, dynamics: &dyn Dynamics) {
        self.collide_and_stream(dynamics);
        mass::mass_change(self);
        mass::completion(self);
        mass::macroscopic(self);
        topology::compute_interface_lists(self);
        topology::interface_to_any(self);
        topology::empty_to_interface(self);
        topology::remove_false_interface(self);
        topology::redistribute_excess(self);
        self.stats = stats::compute(self);
    }

    /// BGK collision on wet cells followed by a pull stream into the back
    /// buffer. Walls reflect (half-way bounce-back); populations pointing in
    /// from gas neighbors keep their stale value and are rebuilt by the
    /// completion pass.
    fn collide_and_stream(&mut self, dynamics: &dyn Dynamics) {
        profile_scope!("collide_stream");
        let nx = self.layout.nx();
        {
            let (flag, rho, j) = (&self.flag, &self.rho, &self.j);
            self.lattice
                .data_mut()
                .par_chunks_mut(nx)
                .enumerate()
                .for_each(|(y, row)| {
                    let yi = y as i32;
                    for (x, cell) in row.iter_mut().enumerate() {
                        let xi = x as i32;
                        if !flag.get(xi, yi).is_wet() {
                            continue;
                        }
                        let r = rho.get(xi, yi);
                        let u = if r > 0.0 { j.get(xi, yi) / r } else { DVec2::zero() };
                        dynamics.collide(cell, r, u);
                    }
                });
        }
        {
            let (src, flag) = (&self.lattice, &self.flag);
            self.lattice_back
                .data_mut()
                .par_chunks_mut(nx)
                .enumerate()
                .for_each(|(y, row)| {
                    let yi = y as i32;
                    for (x, out) in row.iter_mut().enumerate() {
                        let xi = x as i32;
                        let here = src.get(xi, yi);
                        if !flag.get(xi, yi).is_wet() {
                            *out = here;
                            continue;
                        }
                        let mut cell = here;
                        for i in 1..Q {
                            let (sx, sy) = (xi - C[i][0], yi - C[i][1]);
                            match flag.get(sx, sy) {
                                Flag::Fluid | Flag::Interface => cell.0[i] = src.get(sx, sy).0[i],
                                Flag::Wall => cell.0[i] = here.0[OPP[i]],
                                Flag::Empty => {}
                            }
                        }
                        *out = cell;
                    }
                });
        }
        std::mem::swap(&mut self.lattice, &mut self.lattice_back);
    }

    /// Count of cells per flag value, mainly for scenario sanity checks.
    pub fn count_flags(&self) -> [usize; 4] {
        let mut counts = [0usize; 4];
        for &f in self.flag.data() {
            counts[f as usize] += 1;
        }
        counts
    }
}
