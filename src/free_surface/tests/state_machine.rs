// free_surface/tests/state_machine.rs
// Threshold crossings, layer repair and mass accounting of the interface
// state machine, driven on small hand-built scenes.

use ultraviolet::DVec2;

use crate::config::KAPPA;
use crate::dynamics::Bgk;
use crate::free_surface::{Flag, FreeSurfaceFields};
use crate::grid::BlockLayout;
use crate::lattice::Cell;

use super::topology;

/// Walled domain with a fluid pool below `surface_y`, a half-filled
/// interface row at `surface_y` and gas above it.
fn pool_scene(nx: usize, ny: usize, surface_y: i32) -> FreeSurfaceFields {
    let mut fields = FreeSurfaceFields::new(BlockLayout::new(nx, ny, 2, 1), 1.0);
    for y in 1..ny as i32 - 1 {
        for x in 1..nx as i32 - 1 {
            if y < surface_y {
                set_fluid(&mut fields, x, y);
            } else if y == surface_y {
                set_interface(&mut fields, x, y, 0.5);
            } else {
                set_empty(&mut fields, x, y);
            }
        }
    }
    fields
}

fn set_fluid(fields: &mut FreeSurfaceFields, x: i32, y: i32) {
    fields.flag.set(x, y, Flag::Fluid);
    fields.lattice.set(x, y, Cell::at_equilibrium(1.0, DVec2::zero()));
    fields.mass.set(x, y, 1.0);
    fields.volume_fraction.set(x, y, 1.0);
    fields.rho.set(x, y, 1.0);
    fields.j.set(x, y, DVec2::zero());
}

fn set_interface(fields: &mut FreeSurfaceFields, x: i32, y: i32, fill: f64) {
    fields.flag.set(x, y, Flag::Interface);
    fields.lattice.set(x, y, Cell::at_equilibrium(1.0, DVec2::zero()));
    fields.mass.set(x, y, fill);
    fields.volume_fraction.set(x, y, fill);
    fields.rho.set(x, y, 1.0);
    fields.j.set(x, y, DVec2::zero());
}

fn set_empty(fields: &mut FreeSurfaceFields, x: i32, y: i32) {
    fields.flag.set(x, y, Flag::Empty);
    fields.mass.set(x, y, 0.0);
    fields.volume_fraction.set(x, y, 0.0);
    fields.rho.set(x, y, 1.0);
    fields.j.set(x, y, DVec2::zero());
}

fn run_state_machine(fields: &mut FreeSurfaceFields) {
    topology::compute_interface_lists(fields);
    topology::interface_to_any(fields);
    topology::empty_to_interface(fields);
    topology::remove_false_interface(fields);
    topology::redistribute_excess(fields);
}

fn total_mass(fields: &FreeSurfaceFields) -> f64 {
    fields.mass.data().iter().sum::<f64>() + fields.lost_mass
}

fn assert_no_fluid_gas_contact(fields: &FreeSurfaceFields) {
    let d = fields.layout.domain();
    for (x, y) in d.cells() {
        if fields.flag.get(x, y) != Flag::Fluid {
            continue;
        }
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (-1, 1), (-1, -1), (1, -1)] {
            assert_ne!(
                fields.flag.get(x + dx, y + dy),
                Flag::Empty,
                "fluid at ({}, {}) touches gas",
                x,
                y
            );
        }
    }
}

#[test]
fn hysteresis_holds_a_cell_inside_the_band() {
    let mut fields = pool_scene(8, 8, 4);
    fields.volume_fraction.set(3, 4, 1.0 + KAPPA / 2.0);
    fields.mass.set(3, 4, 1.0 + KAPPA / 2.0);

    run_state_machine(&mut fields);
    assert_eq!(
        fields.flag.get(3, 4),
        Flag::Interface,
        "a fill level inside the hysteresis band must not flip the cell"
    );

    fields.volume_fraction.set(3, 4, 1.0 + 2.0 * KAPPA);
    fields.mass.set(3, 4, 1.0 + 2.0 * KAPPA);
    run_state_machine(&mut fields);
    assert_eq!(fields.flag.get(3, 4), Flag::Fluid, "past the band the cell fills up");
}

#[test]
fn filling_cell_converts_its_gas_neighbors() {
    let mut fields = pool_scene(8, 8, 4);
    fields.volume_fraction.set(3, 4, 1.0 + 2.0 * KAPPA);
    fields.mass.set(3, 4, 1.0 + 2.0 * KAPPA);

    let before = total_mass(&fields);
    run_state_machine(&mut fields);

    assert_eq!(fields.flag.get(3, 4), Flag::Fluid);
    for x in 2..=4 {
        assert_eq!(
            fields.flag.get(x, 5),
            Flag::Interface,
            "gas cell ({}, 5) above the filled cell joins the interface",
            x
        );
    }
    assert!(fields.mass.get(3, 5) < 0.01, "a fresh interface cell starts near empty");
    assert!(
        fields.lattice.get(3, 5).density() > 0.9,
        "fresh interface populations are seeded near the neighbor density"
    );
    assert!((total_mass(&fields) - before).abs() < 1e-12, "state flips conserve mass");
    assert_no_fluid_gas_contact(&fields);
}

#[test]
fn drained_cell_empties_and_keeps_the_layer_closed() {
    let mut fields = pool_scene(8, 8, 4);
    fields.volume_fraction.set(3, 4, -2.0 * KAPPA);
    fields.mass.set(3, 4, -2.0 * KAPPA);

    let before = total_mass(&fields);
    run_state_machine(&mut fields);

    assert_eq!(fields.flag.get(3, 4), Flag::Empty, "a drained cell leaves the interface");
    for x in 2..=4 {
        assert_eq!(
            fields.flag.get(x, 3),
            Flag::Interface,
            "fluid cell ({}, 3) under the drained cell joins the interface",
            x
        );
    }
    assert!(
        (total_mass(&fields) - before).abs() < 1e-12,
        "the negative excess is taken back from the interface neighbors"
    );
    assert_no_fluid_gas_contact(&fields);
}

#[test]
fn false_interface_without_gas_contact_dissolves() {
    let mut fields = pool_scene(8, 8, 5);
    set_interface(&mut fields, 3, 2, 0.7);

    run_state_machine(&mut fields);
    assert_eq!(
        fields.flag.get(3, 2),
        Flag::Fluid,
        "an interface cell surrounded by fluid becomes fluid"
    );
    assert_eq!(fields.mass.get(3, 2), 1.0, "its mass snaps to the cell density");
    assert!(
        (fields.lost_mass - (0.7 - 1.0)).abs() < 1e-15,
        "the deficit had no interface receiver and is booked as lost mass"
    );
}

#[test]
fn stranded_excess_goes_to_the_lost_mass_account() {
    let mut fields = FreeSurfaceFields::new(BlockLayout::single(6, 6), 1.0);
    // A single interface cell alone in a gas pocket, drained past the band.
    for y in 1..5 {
        for x in 1..5 {
            set_empty(&mut fields, x, y);
        }
    }
    set_interface(&mut fields, 3, 3, -2.0 * KAPPA);

    run_state_machine(&mut fields);
    assert_eq!(fields.flag.get(3, 3), Flag::Empty);
    assert!(
        (fields.lost_mass - (-2.0 * KAPPA)).abs() < 1e-15,
        "with no interface neighbor the excess is booked as lost mass"
    );
}

#[test]
fn quiescent_pool_steps_without_state_changes() {
    let mut fields = pool_scene(10, 8, 5);
    let flags_before: Vec<Flag> = fields.flag.data().to_vec();
    let mass_before = total_mass(&fields);

    let bgk = Bgk::new(1.0, DVec2::zero());
    for _ in 0..5 {
        fields.step(&bgk);
    }

    assert_eq!(
        fields.flag.data(),
        flags_before.as_slice(),
        "a resting pool must not flip any cell"
    );
    assert!(
        (total_mass(&fields) - mass_before).abs() < 1e-9,
        "mass is conserved over full iterations"
    );
    assert_eq!(fields.stats.interface_cells, 8, "stats count the interface row");
}

#[test]
fn gravity_run_conserves_mass() {
    let mut fields = pool_scene(12, 10, 6);
    let before = total_mass(&fields);
    let bgk = Bgk::new(1.0, DVec2::new(0.0, -1e-4));
    for _ in 0..20 {
        fields.step(&bgk);
    }
    let after = fields.stats.total_mass + fields.stats.lost_mass;
    assert!(
        (after - before).abs() < 1e-8,
        "mass plus lost mass stays constant under gravity, drifted by {}",
        after - before
    );
    assert_no_fluid_gas_contact(&fields);
    assert!(total_mass(&fields) > 0.0);
}
