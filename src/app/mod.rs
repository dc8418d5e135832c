use crate::config::{self, SimConfig};
use crate::dynamics::Bgk;
use crate::free_surface::FreeSurfaceFields;
use crate::io;
use crate::scenario;
use crate::simulation::Simulation;
use crate::units;
use ultraviolet::DVec2;

pub mod simulation_loop;

pub fn run() {
    // Creates a global thread pool (using rayon) with threads = total cores - 2, at least 2
    let threads = std::thread::available_parallelism()
        .unwrap()
        .get()
        .saturating_sub(config::THREADS_LEAVE_FREE)
        .max(config::MIN_THREADS);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .unwrap();

    let cfg = SimConfig::load_or_default("sim_config.toml");
    println!(
        "omega {} (kinematic viscosity {:.4}), gravity {:.3e}, {} iterations on {} threads",
        cfg.omega,
        units::kinematic_viscosity(cfg.omega),
        cfg.gravity,
        cfg.iterations,
        threads
    );

    // An optional argument resumes from a checkpoint instead of building the
    // scene from init_config.toml.
    let simulation = match std::env::args().nth(1) {
        Some(path) => match io::load_state(&path) {
            Ok(state) => {
                println!("Resuming from checkpoint {}", path);
                let fields = FreeSurfaceFields::new(state.layout.clone(), state.rho_default);
                let dynamics = Bgk::new(cfg.omega, DVec2::new(0.0, cfg.gravity));
                let mut sim = Simulation::new(fields, Box::new(dynamics));
                state.apply_to(&mut sim);
                sim
            }
            Err(e) => {
                eprintln!("Failed to load checkpoint {}: {}", path, e);
                scenario::load_and_build(&cfg)
            }
        },
        None => scenario::load_and_build(&cfg),
    };

    simulation_loop::run_simulation_loop(simulation, cfg);
}
