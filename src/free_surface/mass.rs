// free_surface/mass.rs
// Mass exchange between wet cells, reconstruction of populations facing gas
// and the macroscopic update. All three run on the post-stream lattice.

use rayon::prelude::*;
use ultraviolet::DVec2;

use crate::lattice::{equilibrium, C, OPP, Q};
use crate::profile_scope;

use super::flag::Flag;
use super::pipeline::FreeSurfaceFields;

/// Accumulate the streamed mass flux into each wet cell.
///
/// Post-stream, `cell[opp(i)]` is what arrived from the neighbor at +c_i and
/// `neighbor[i]` is what left toward it, so their difference is the net gain
/// through that link. Interface-interface links are weighted by the mean
/// volume fraction of the pair; the symmetry keeps the exchange pairwise
/// antisymmetric and total mass exact.
pub(super) fn mass_change(fields: &mut FreeSurfaceFields) {
    profile_scope!("mass_change");
    let nx = fields.layout.nx();
    let (lattice, flag, vf) = (&fields.lattice, &fields.flag, &fields.volume_fraction);
    fields
        .mass
        .data_mut()
        .par_chunks_mut(nx)
        .enumerate()
        .for_each(|(y, mass_row)| {
            let yi = y as i32;
            for (x, m) in mass_row.iter_mut().enumerate() {
                let xi = x as i32;
                let here = flag.get(xi, yi);
                if !here.is_wet() {
                    continue;
                }
                let cell = lattice.get(xi, yi);
                let mut dm = 0.0;
                for i in 1..Q {
                    let (nx_, ny_) = (xi + C[i][0], yi + C[i][1]);
                    let near = flag.get(nx_, ny_);
                    let flux = cell.0[OPP[i]] - lattice.get(nx_, ny_).0[i];
                    match (here, near) {
                        (Flag::Fluid, n) if n.is_wet() => dm += flux,
                        (Flag::Interface, Flag::Fluid) => dm += flux,
                        (Flag::Interface, Flag::Interface) => {
                            dm += flux * 0.5 * (vf.get(nx_, ny_) + vf.get(xi, yi));
                        }
                        _ => {}
                    }
                }
                *m += dm;
            }
        });
}

/// Rebuild the populations of interface cells that point in from gas.
///
/// The missing incoming population opposite a gas neighbor is replaced by
/// `eq_i + eq_opp(i) - f_i`, evaluated at the bubble gas density and the
/// cell's cached velocity. All replacements read a snapshot of the cell so
/// that opposite gas links do not feed on each other.
pub(super) fn completion(fields: &mut FreeSurfaceFields) {
    profile_scope!("completion");
    let nx = fields.layout.nx();
    let (flag, rho, j, outside) = (&fields.flag, &fields.rho, &fields.j, &fields.outside_density);
    fields
        .lattice
        .data_mut()
        .par_chunks_mut(nx)
        .enumerate()
        .for_each(|(y, row)| {
            let yi = y as i32;
            for (x, cell) in row.iter_mut().enumerate() {
                let xi = x as i32;
                if flag.get(xi, yi) != Flag::Interface {
                    continue;
                }
                let r = rho.get(xi, yi);
                let u = if r > 0.0 { j.get(xi, yi) / r } else { DVec2::zero() };
                let rho_gas = outside.get(xi, yi);
                let snap = *cell;
                for i in 1..Q {
                    if flag.get(xi + C[i][0], yi + C[i][1]) == Flag::Empty {
                        let o = OPP[i];
                        cell.0[o] =
                            equilibrium(i, rho_gas, u) + equilibrium(o, rho_gas, u) - snap.0[i];
                    }
                }
            }
        });
}

/// Refresh the macroscopic caches and volume fractions from the completed
/// populations. Fluid cells are pinned at volume fraction 1 with mass equal
/// to their density; gas and wall cells are reset to the reference state.
pub(super) fn macroscopic(fields: &mut FreeSurfaceFields) {
    profile_scope!("macroscopic");
    let nx = fields.layout.nx();
    let rho_default = fields.rho_default;
    let (lattice, flag) = (&fields.lattice, &fields.flag);
    fields
        .rho
        .data_mut()
        .par_chunks_mut(nx)
        .zip(fields.j.data_mut().par_chunks_mut(nx))
        .zip(fields.volume_fraction.data_mut().par_chunks_mut(nx))
        .zip(fields.mass.data_mut().par_chunks_mut(nx))
        .enumerate()
        .for_each(|(y, (((rho_row, j_row), vf_row), mass_row))| {
            let yi = y as i32;
            for x in 0..nx {
                let xi = x as i32;
                match flag.get(xi, yi) {
                    Flag::Fluid => {
                        let (r, m) = lattice.get(xi, yi).moments();
                        rho_row[x] = r;
                        j_row[x] = m;
                        vf_row[x] = 1.0;
                        mass_row[x] = r;
                    }
                    Flag::Interface => {
                        let (r, m) = lattice.get(xi, yi).moments();
                        rho_row[x] = r;
                        j_row[x] = m;
                        vf_row[x] = if r > 0.0 { mass_row[x] / r } else { 0.0 };
                    }
                    Flag::Empty | Flag::Wall => {
                        rho_row[x] = rho_default;
                        j_row[x] = DVec2::zero();
                        vf_row[x] = 0.0;
                        mass_row[x] = 0.0;
                    }
                }
            }
        });
}
