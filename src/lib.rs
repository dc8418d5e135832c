pub mod bubbles;
pub mod config;
pub mod dynamics;
pub mod free_surface;
pub mod grid;
pub mod init_config;
pub mod io;
pub mod lattice;
pub mod profiler;
pub mod scenario;
pub mod simulation;
pub mod units;

pub mod app;

#[cfg(feature = "profiling")]
use once_cell::sync::Lazy;
#[cfg(feature = "profiling")]
use parking_lot::Mutex;

#[cfg(feature = "profiling")]
pub static PROFILER: Lazy<Mutex<profiler::Profiler>> =
    Lazy::new(|| Mutex::new(profiler::Profiler::new()));
