mod app;
mod bubbles;
mod config;
mod dynamics;
mod free_surface;
mod grid;
mod init_config;
mod io;
mod lattice;
mod profiler;
mod scenario;
mod simulation;
mod units;

#[cfg(feature = "profiling")]
use once_cell::sync::Lazy;
#[cfg(feature = "profiling")]
use parking_lot::Mutex;

#[cfg(feature = "profiling")]
pub static PROFILER: Lazy<Mutex<profiler::Profiler>> =
    Lazy::new(|| Mutex::new(profiler::Profiler::new()));

fn main() {
    app::run();
}
