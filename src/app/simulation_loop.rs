use std::path::Path;

use crate::config::SimConfig;
use crate::io::{self, SimulationState};
use crate::profile_scope;
use crate::simulation::Simulation;

pub fn run_simulation_loop(mut simulation: Simulation, cfg: SimConfig) {
    let started = std::time::Instant::now();

    while simulation.iteration < cfg.iterations {
        {
            profile_scope!("simulation_loop");
            simulation.step();
        }

        if cfg.status_interval > 0 && simulation.iteration % cfg.status_interval == 0 {
            print_status(&simulation);

            #[cfg(feature = "profiling")]
            crate::PROFILER.lock().print_and_clear();
        }

        if cfg.checkpoint_interval > 0 && simulation.iteration % cfg.checkpoint_interval == 0 {
            save_checkpoint(&simulation, &cfg);
        }
    }

    print_status(&simulation);
    write_bubble_logs(&simulation, &cfg);
    if cfg.checkpoint_interval > 0 {
        save_checkpoint(&simulation, &cfg);
    }
    println!(
        "Finished {} iterations in {:.1} s",
        simulation.iteration,
        started.elapsed().as_secs_f64()
    );
}

fn print_status(sim: &Simulation) {
    let stats = &sim.fields.stats;
    println!(
        "iter {:>8}  mass {:.6}  lost {:.3e}  interface cells {}  bubbles {}  gas volume {:.3}",
        sim.iteration,
        stats.total_mass,
        stats.lost_mass,
        stats.interface_cells,
        sim.history.bubbles().len(),
        sim.history.total_bubble_volume()
    );
}

fn save_checkpoint(sim: &Simulation, cfg: &SimConfig) {
    let state = SimulationState::from_simulation(sim, cfg);
    match io::save_state(&cfg.checkpoint_path, &state) {
        Ok(()) => println!("Saved checkpoint to {}", cfg.checkpoint_path),
        Err(e) => eprintln!("Failed to save checkpoint {}: {}", cfg.checkpoint_path, e),
    }
}

fn write_bubble_logs(sim: &Simulation, cfg: &SimConfig) {
    for path in [&cfg.time_history_path, &cfg.full_log_path] {
        if let Some(dir) = Path::new(path).parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).ok();
            }
        }
    }
    if let Err(e) = sim.history.write_time_history_log(&cfg.time_history_path) {
        eprintln!("Failed to write {}: {}", cfg.time_history_path, e);
    } else {
        println!("Wrote bubble event log to {}", cfg.time_history_path);
    }
    if let Err(e) = sim.history.write_full_bubble_log(&cfg.full_log_path) {
        eprintln!("Failed to write {}: {}", cfg.full_log_path, e);
    } else {
        println!("Wrote bubble lifetime log to {}", cfg.full_log_path);
    }
}
