// free_surface/stats.rs
// Per-iteration reductions over the whole domain.

use serde::{Deserialize, Serialize};

use crate::grid::reduce::all_reduce;
use crate::profile_scope;

use super::flag::Flag;
use super::pipeline::FreeSurfaceFields;

/// Global free-surface statistics of one iteration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SurfaceStats {
    /// Sum of the mass field. Together with `lost_mass` this is conserved.
    pub total_mass: f64,
    /// Cumulative mass dropped by emptied cells with no receiver.
    pub lost_mass: f64,
    pub interface_cells: usize,
}

pub(super) fn compute(fields: &FreeSurfaceFields) -> SurfaceStats {
    profile_scope!("surface_stats");
    let (mass, flag) = (&fields.mass, &fields.flag);
    let (total_mass, interface_cells) = all_reduce(
        &fields.layout,
        || (0.0f64, 0usize),
        |_, b| {
            let mut m = 0.0;
            let mut n = 0usize;
            for (x, y) in b.cells() {
                m += mass.get(x, y);
                if flag.get(x, y) == Flag::Interface {
                    n += 1;
                }
            }
            (m, n)
        },
        |a, b| (a.0 + b.0, a.1 + b.1),
    );
    SurfaceStats { total_mass, lost_mass: fields.lost_mass, interface_cells }
}
