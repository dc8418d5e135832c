// free_surface/topology.rs
// The interface state machine: detects threshold crossings with hysteresis,
// flips cell states while keeping the interface layer closed, and
// redistributes the mass that each flip strands.

use std::collections::BTreeSet;

use ultraviolet::DVec2;

use crate::config;
use crate::grid::reduce::all_reduce;
use crate::lattice::{Cell, C, Q};
use crate::profile_scope;

use super::flag::Flag;
use super::pipeline::FreeSurfaceFields;

/// Scratch lists handed from the detection pass to the flip passes. Typed
/// so each pass states what it consumes.
#[derive(Default)]
pub(super) struct InterfaceLists {
    /// Interface cells overfilled past 1 + kappa.
    pub to_fluid: Vec<(i32, i32)>,
    /// Interface cells drained below -kappa.
    pub to_empty: Vec<(i32, i32)>,
    /// Gas cells that must join the interface so the layer stays closed.
    pub to_interface: Vec<(i32, i32)>,
    /// Mass stranded by state flips, waiting for redistribution.
    pub mass_excess: Vec<((i32, i32), f64)>,
}

impl InterfaceLists {
    fn clear(&mut self) {
        self.to_fluid.clear();
        self.to_empty.clear();
        self.to_interface.clear();
        self.mass_excess.clear();
    }
}

/// Detect interface cells that crossed a fill threshold this iteration.
/// Runs per block; the block partials are concatenated in block order.
pub(super) fn compute_interface_lists(fields: &mut FreeSurfaceFields) {
    profile_scope!("interface_lists");
    fields.lists.clear();
    let (flag, vf) = (&fields.flag, &fields.volume_fraction);
    let (to_fluid, to_empty) = all_reduce(
        &fields.layout,
        || (Vec::new(), Vec::new()),
        |_, b| {
            let mut filling = Vec::new();
            let mut draining = Vec::new();
            for (x, y) in b.cells() {
                if flag.get(x, y) != Flag::Interface {
                    continue;
                }
                let v = vf.get(x, y);
                if v > 1.0 + config::KAPPA {
                    filling.push((x, y));
                } else if v < -config::KAPPA {
                    draining.push((x, y));
                }
            }
            (filling, draining)
        },
        |mut a, b| {
            a.0.extend(b.0);
            a.1.extend(b.1);
            a
        },
    );
    // Gas neighbors of filling cells must become interface. Dedup: one gas
    // cell can border several filling cells.
    let mut seen = BTreeSet::new();
    for &(x, y) in &to_fluid {
        for i in 1..Q {
            let (ax, ay) = (x + C[i][0], y + C[i][1]);
            if flag.get(ax, ay) == Flag::Empty && seen.insert((ax, ay)) {
                fields.lists.to_interface.push((ax, ay));
            }
        }
    }
    fields.lists.to_fluid = to_fluid;
    fields.lists.to_empty = to_empty;
}

/// Apply the interface-to-fluid and interface-to-empty flips.
///
/// Filling cells flip first. A drained cell then converts its fluid
/// neighbors back to interface, which also repairs the case of a fresh
/// fluid cell next to a fresh gas cell.
pub(super) fn interface_to_any(fields: &mut FreeSurfaceFields) {
    profile_scope!("interface_flips");
    let mut to_fluid = std::mem::take(&mut fields.lists.to_fluid);
    for &(x, y) in &to_fluid {
        let r = fields.rho.get(x, y);
        let excess = fields.mass.get(x, y) - r;
        fields.flag.set(x, y, Flag::Fluid);
        fields.mass.set(x, y, r);
        fields.volume_fraction.set(x, y, 1.0);
        fields.lists.mass_excess.push(((x, y), excess));
    }
    let mut to_empty = std::mem::take(&mut fields.lists.to_empty);
    for &(x, y) in &to_empty {
        let excess = fields.mass.get(x, y);
        fields.flag.set(x, y, Flag::Empty);
        fields.mass.set(x, y, 0.0);
        fields.volume_fraction.set(x, y, 0.0);
        fields.rho.set(x, y, fields.rho_default);
        fields.j.set(x, y, DVec2::zero());
        fields.lists.mass_excess.push(((x, y), excess));
        for i in 1..Q {
            let (ax, ay) = (x + C[i][0], y + C[i][1]);
            if fields.flag.get(ax, ay) == Flag::Fluid {
                fields.flag.set(ax, ay, Flag::Interface);
            }
        }
    }
    to_fluid.clear();
    to_empty.clear();
    fields.lists.to_fluid = to_fluid;
    fields.lists.to_empty = to_empty;
}

/// Convert the queued gas cells to interface, seeded from the average state
/// of their wet neighbors. Averages are measured before any conversion so
/// the result does not depend on list order.
pub(super) fn empty_to_interface(fields: &mut FreeSurfaceFields) {
    profile_scope!("gas_to_interface");
    let mut to_interface = std::mem::take(&mut fields.lists.to_interface);
    let mut seeds = Vec::with_capacity(to_interface.len());
    for &(x, y) in &to_interface {
        let mut rho_sum = 0.0;
        let mut j_sum = DVec2::zero();
        let mut wet = 0usize;
        for i in 1..Q {
            let (ax, ay) = (x + C[i][0], y + C[i][1]);
            if fields.flag.get(ax, ay).is_wet() {
                rho_sum += fields.rho.get(ax, ay);
                j_sum += fields.j.get(ax, ay);
                wet += 1;
            }
        }
        let (r, u) = if wet > 0 && rho_sum > 0.0 {
            (rho_sum / wet as f64, j_sum / rho_sum)
        } else {
            (fields.rho_default, DVec2::zero())
        };
        seeds.push((x, y, r, u));
    }
    for (x, y, r, u) in seeds {
        fields.flag.set(x, y, Flag::Interface);
        fields.lattice.set(x, y, Cell::at_equilibrium(r, u));
        fields.mass.set(x, y, 0.0);
        fields.volume_fraction.set(x, y, 0.0);
        fields.rho.set(x, y, r);
        fields.j.set(x, y, u * r);
    }
    to_interface.clear();
    fields.lists.to_interface = to_interface;
}

/// Dissolve interface cells that no longer separate fluid from gas: with no
/// gas neighbor they become fluid, with no fluid neighbor they become gas.
/// The scan mutates in place and re-reads flags, so two adjacent false
/// interface cells cannot flip into a fluid-gas contact.
pub(super) fn remove_false_interface(fields: &mut FreeSurfaceFields) {
    profile_scope!("false_interface");
    let domain = fields.layout.domain();
    for (x, y) in domain.cells() {
        if fields.flag.get(x, y) != Flag::Interface {
            continue;
        }
        let mut has_empty = false;
        let mut has_fluid = false;
        for i in 1..Q {
            match fields.flag.get(x + C[i][0], y + C[i][1]) {
                Flag::Empty => has_empty = true,
                Flag::Fluid => has_fluid = true,
                _ => {}
            }
        }
        if !has_empty {
            let r = fields.rho.get(x, y);
            let excess = fields.mass.get(x, y) - r;
            fields.flag.set(x, y, Flag::Fluid);
            fields.mass.set(x, y, r);
            fields.volume_fraction.set(x, y, 1.0);
            fields.lists.mass_excess.push(((x, y), excess));
        } else if !has_fluid {
            let excess = fields.mass.get(x, y);
            fields.flag.set(x, y, Flag::Empty);
            fields.mass.set(x, y, 0.0);
            fields.volume_fraction.set(x, y, 0.0);
            fields.rho.set(x, y, fields.rho_default);
            fields.j.set(x, y, DVec2::zero());
            fields.lists.mass_excess.push(((x, y), excess));
        }
    }
}

/// Split each stranded excess equally over the interface neighbors of its
/// source cell. With no interface neighbor left the excess goes to the
/// lost-mass account instead of silently vanishing.
pub(super) fn redistribute_excess(fields: &mut FreeSurfaceFields) {
    profile_scope!("excess_mass");
    let mut excess_list = std::mem::take(&mut fields.lists.mass_excess);
    for &((x, y), excess) in &excess_list {
        let mut receivers = 0usize;
        for i in 1..Q {
            if fields.flag.get(x + C[i][0], y + C[i][1]) == Flag::Interface {
                receivers += 1;
            }
        }
        if receivers == 0 {
            fields.lost_mass += excess;
            continue;
        }
        let share = excess / receivers as f64;
        for i in 1..Q {
            let (ax, ay) = (x + C[i][0], y + C[i][1]);
            if fields.flag.get(ax, ay) == Flag::Interface {
                *fields.mass.get_mut(ax, ay) += share;
                let r = fields.rho.get(ax, ay);
                let v = if r > 0.0 { fields.mass.get(ax, ay) / r } else { 0.0 };
                fields.volume_fraction.set(ax, ay, v);
            }
        }
    }
    excess_list.clear();
    fields.lists.mass_excess = excess_list;
}
