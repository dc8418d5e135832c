// scenario.rs
// Builds the initial simulation from a scene description: wall frame, liquid
// pool, carved gas bubbles, interface classification and the first tagging.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use ultraviolet::DVec2;

use crate::config::{self, SimConfig};
use crate::dynamics::Bgk;
use crate::free_surface::{Flag, FreeSurfaceFields};
use crate::grid::BlockLayout;
use crate::init_config::{BubbleConfig, InitConfig};
use crate::simulation::Simulation;

/// Load init_config.toml and build the simulation, falling back to the
/// built-in scene when the file is missing or broken.
pub fn load_and_build(cfg: &SimConfig) -> Simulation {
    let init = match InitConfig::load_default() {
        Ok(init) => {
            println!("Loaded initial scene from init_config.toml");
            init
        }
        Err(e) => {
            eprintln!("Failed to load init_config.toml: {}", e);
            eprintln!("Using the built-in scene");
            InitConfig::built_in()
        }
    };
    build(&init, cfg)
}

/// Build the simulation for a scene description.
///
/// The domain keeps a one-cell wall frame. Liquid fills the interior up to
/// `fill_height`; every bubble circle is carved out of it; fluid cells left
/// touching gas become interface cells. The bubble ledger is primed with one
/// tagging pass so iteration 0 already has live bubbles and gas densities.
pub fn build(init: &InitConfig, cfg: &SimConfig) -> Simulation {
    let (nx, ny) = init
        .domain
        .as_ref()
        .map(|d| d.size())
        .unwrap_or((config::DEFAULT_NX, config::DEFAULT_NY));
    let (blocks_x, blocks_y) = init
        .domain
        .as_ref()
        .map(|d| d.blocks())
        .unwrap_or((config::DEFAULT_BLOCKS_X, config::DEFAULT_BLOCKS_Y));
    assert!(nx >= 6 && ny >= 6, "domain too small for a wall frame and a pool");

    let layout = BlockLayout::new(nx, ny, blocks_x, blocks_y);
    let mut fields = FreeSurfaceFields::new(layout, config::RHO_DEFAULT);

    // Liquid pool over the bottom wall, atmosphere above it.
    let interior_h = ny - 2;
    let fill = init.scene.fill_height.unwrap_or(interior_h * 3 / 5).min(interior_h);
    for y in 1..(ny as i32 - 1) {
        for x in 1..(nx as i32 - 1) {
            let flag = if y <= fill as i32 { Flag::Fluid } else { Flag::Empty };
            fields.flag.set(x, y, flag);
        }
    }

    // Carve the configured bubbles out of the pool.
    let circles = collect_circles(init, nx, fill);
    for y in 1..(ny as i32 - 1) {
        for x in 1..(nx as i32 - 1) {
            if circles.iter().any(|c| c.contains(x, y)) {
                fields.flag.set(x, y, Flag::Empty);
            }
        }
    }

    classify_interfaces(&mut fields);
    assign_cell_masses(&mut fields);

    let counts = fields.count_flags();
    println!(
        "Built {}x{} scene: {} fluid, {} interface, {} gas cells ({} bubbles configured)",
        nx,
        ny,
        counts[Flag::Fluid as usize],
        counts[Flag::Interface as usize],
        counts[Flag::Empty as usize],
        circles.len()
    );

    let dynamics = Bgk::new(cfg.omega, DVec2::new(0.0, cfg.gravity));
    let mut sim = Simulation::new(fields, Box::new(dynamics));
    sim.bubble_steps = cfg.bubble_steps.max(1);
    sim.volume_correction = cfg.volume_correction;
    sim.match_empty = cfg.match_empty;

    // Prime tags, ledger and gas densities before the first iteration.
    sim.update_bubbles();
    println!("Initial tagging found {} bubble(s)", sim.history.bubbles().len());
    sim
}

/// Explicit bubbles plus the sampled positions of every random-bubbles
/// request. Sampling is seeded, so a scene reproduces exactly.
fn collect_circles(init: &InitConfig, nx: usize, fill: usize) -> Vec<BubbleConfig> {
    let mut circles: Vec<BubbleConfig> = init
        .scene
        .bubbles
        .iter()
        .map(|b| BubbleConfig { x: b.x, y: b.y, radius: b.radius })
        .collect();
    for request in &init.scene.random_bubbles {
        let mut rng = StdRng::seed_from_u64(request.seed.unwrap_or(0));
        let normal = match request.radius_sigma {
            Some(s) if s > 0.0 => {
                Some(Normal::new(request.radius, s).expect("radius_sigma must be finite"))
            }
            _ => None,
        };
        let x_hi = nx as f64 - 3.0;
        let y_hi = (fill as f64).max(4.0);
        for _ in 0..request.count {
            let radius = match &normal {
                Some(n) => n.sample(&mut rng).max(1.0),
                None => request.radius,
            };
            circles.push(BubbleConfig {
                x: rng.random_range(2.0..x_hi),
                y: rng.random_range(2.0..y_hi),
                radius,
            });
        }
    }
    circles
}

/// Turn every fluid cell that touches gas along any lattice direction into
/// an interface cell. Afterwards no fluid cell has a gas neighbor, which the
/// streaming and mass-exchange passes rely on.
fn classify_interfaces(fields: &mut FreeSurfaceFields) {
    let (nx, ny) = (fields.layout.nx() as i32, fields.layout.ny() as i32);
    let mut interfaces = Vec::new();
    for y in 1..ny - 1 {
        for x in 1..nx - 1 {
            if fields.flag.get(x, y) != Flag::Fluid {
                continue;
            }
            let touches_gas = (-1..=1).any(|dy| {
                (-1..=1).any(|dx| {
                    (dx != 0 || dy != 0) && fields.flag.get(x + dx, y + dy) == Flag::Empty
                })
            });
            if touches_gas {
                interfaces.push((x, y));
            }
        }
    }
    for (x, y) in interfaces {
        fields.flag.set(x, y, Flag::Interface);
    }
}

/// Mass and volume fraction per flag: full for fluid, half-filled for fresh
/// interface cells, empty for gas.
fn assign_cell_masses(fields: &mut FreeSurfaceFields) {
    let rho = fields.rho_default;
    let (nx, ny) = (fields.layout.nx() as i32, fields.layout.ny() as i32);
    for y in 0..ny {
        for x in 0..nx {
            let (mass, vf) = match fields.flag.get(x, y) {
                Flag::Fluid => (rho, 1.0),
                Flag::Interface => (0.5 * rho, 0.5),
                Flag::Empty | Flag::Wall => (0.0, 0.0),
            };
            fields.mass.set(x, y, mass);
            fields.volume_fraction.set(x, y, vf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::C;

    fn assert_no_fluid_gas_contact(fields: &FreeSurfaceFields) {
        let d = fields.layout.domain();
        for (x, y) in d.cells() {
            if fields.flag.get(x, y) != Flag::Fluid {
                continue;
            }
            for c in C.iter().skip(1) {
                let (ax, ay) = (x + c[0], y + c[1]);
                if d.contains(ax, ay) {
                    assert_ne!(
                        fields.flag.get(ax, ay),
                        Flag::Empty,
                        "fluid cell ({}, {}) touches gas at ({}, {})",
                        x,
                        y,
                        ax,
                        ay
                    );
                }
            }
        }
    }

    #[test]
    fn pool_with_one_bubble_builds_a_valid_scene() {
        let init: InitConfig = toml::from_str(
            r#"
            [domain]
            nx = 24
            ny = 20
            blocks_x = 2
            blocks_y = 2

            [scene]
            fill_height = 12

            [[scene.bubbles]]
            x = 12.0
            y = 6.0
            radius = 3.0
            "#,
        )
        .unwrap();
        let sim = build(&init, &SimConfig::default());

        let counts = sim.fields.count_flags();
        assert_eq!(counts[Flag::Wall as usize], 2 * 24 + 2 * 18, "one-cell wall frame");
        assert_no_fluid_gas_contact(&sim.fields);

        // The carved pocket and the atmosphere above the pool tag separately.
        assert_eq!(sim.history.bubbles().len(), 2);
        let pocket = sim.history.tags().get(12, 6);
        let air = sim.history.tags().get(12, 18);
        assert!(pocket >= 0 && air >= 0);
        assert_ne!(pocket, air);
        assert_eq!(sim.history.tags().get(2, 2), -1, "pool cells stay untagged");
    }

    #[test]
    fn seeded_random_bubbles_reproduce_the_same_scene() {
        let toml_text = r#"
            [domain]
            nx = 32
            ny = 28
            blocks_x = 2
            blocks_y = 2

            [scene]
            fill_height = 18

            [[scene.random_bubbles]]
            count = 3
            radius = 2.5
            radius_sigma = 0.5
            seed = 7
        "#;
        let a = build(&toml::from_str(toml_text).unwrap(), &SimConfig::default());
        let b = build(&toml::from_str(toml_text).unwrap(), &SimConfig::default());

        assert_eq!(a.fields.flag.data(), b.fields.flag.data(), "same seed, same scene");
        assert_no_fluid_gas_contact(&a.fields);
        assert!(!a.history.bubbles().is_empty(), "the gas regions were tagged");
    }

    #[test]
    fn built_in_scene_is_consistent() {
        let sim = build(&InitConfig::built_in(), &SimConfig::default());
        assert_no_fluid_gas_contact(&sim.fields);
        assert!(sim.history.bubbles().len() >= 2);
        assert!(sim.fields.outside_density.data().iter().all(|&d| d > 0.0));
    }
}
