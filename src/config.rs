// Centralized configuration for simulation parameters

use serde::{Deserialize, Serialize};

// ====================
// Domain Defaults
// ====================
pub const DEFAULT_NX: usize = 128; // Domain width in lattice cells (wall frame included)
pub const DEFAULT_NY: usize = 96; // Domain height in lattice cells (wall frame included)
pub const DEFAULT_BLOCKS_X: usize = 4; // Partition columns
pub const DEFAULT_BLOCKS_Y: usize = 3; // Partition rows

// ====================
// Lattice / Fluid Defaults
// ====================
pub const RHO_DEFAULT: f64 = 1.0; // Reference density, also assigned to gas and wall cells
pub const DEFAULT_OMEGA: f64 = 1.0; // BGK relaxation frequency
pub const DEFAULT_GRAVITY: f64 = -1.0e-5; // Body force along y, lattice units

// ====================
// Free-Surface Thresholds
// ====================
/// Hysteresis band around the full/empty thresholds. A cell must overfill past
/// 1 + KAPPA (or drain below -KAPPA) before its state flips, which keeps cells
/// from oscillating between interface and bulk states on successive iterations.
pub const KAPPA: f64 = 1.0e-3;

// ====================
// Bubble Tracking
// ====================
pub const DEFAULT_BUBBLE_STEPS: u64 = 1; // Iterations between bubble-tracking updates
pub const DEFAULT_VOLUME_CORRECTION: f64 = 1.0; // Scale applied to the measured volume of newborn bubbles
pub const MAX_BUBBLE_DENSITY_RATIO: f64 = 1.2; // Cap on compression feedback, in units of the reference density

// ====================
// Threading Configuration
// ====================
pub const THREADS_LEAVE_FREE: usize = 2; // Leave this many cores for the OS
pub const MIN_THREADS: usize = 2; // Never go below this many compute threads

/// Runtime-tunable simulation parameters, loadable from `sim_config.toml`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// BGK relaxation frequency (1/tau).
    #[serde(default = "default_omega")]
    pub omega: f64,
    /// Body force along y in lattice units (negative pulls the liquid down).
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    /// Iterations between bubble-tracking updates.
    #[serde(default = "default_bubble_steps")]
    pub bubble_steps: u64,
    /// Scale factor applied to the measured volume of a bubble at creation.
    #[serde(default = "default_volume_correction")]
    pub volume_correction: f64,
    /// Track gas regions when true, liquid regions when false.
    #[serde(default = "default_match_empty")]
    pub match_empty: bool,
    /// Total number of lattice iterations to run.
    #[serde(default = "default_iterations")]
    pub iterations: u64,
    /// Print a status line every this many iterations (0 disables).
    #[serde(default = "default_status_interval")]
    pub status_interval: u64,
    /// Save a checkpoint every this many iterations (0 disables).
    #[serde(default)]
    pub checkpoint_interval: u64,
    /// Checkpoint file path.
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: String,
    /// Path of the per-iteration bubble creation/removal log.
    #[serde(default = "default_time_history_path")]
    pub time_history_path: String,
    /// Path of the one-line-per-bubble lifetime log.
    #[serde(default = "default_full_log_path")]
    pub full_log_path: String,
}

fn default_omega() -> f64 {
    DEFAULT_OMEGA
}
fn default_gravity() -> f64 {
    DEFAULT_GRAVITY
}
fn default_bubble_steps() -> u64 {
    DEFAULT_BUBBLE_STEPS
}
fn default_volume_correction() -> f64 {
    DEFAULT_VOLUME_CORRECTION
}
fn default_match_empty() -> bool {
    true
}
fn default_iterations() -> u64 {
    1000
}
fn default_status_interval() -> u64 {
    100
}
fn default_checkpoint_path() -> String {
    "out/checkpoint.bin.gz".to_string()
}
fn default_time_history_path() -> String {
    "out/time_history.log".to_string()
}
fn default_full_log_path() -> String {
    "out/full_bubble_record.log".to_string()
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            omega: default_omega(),
            gravity: default_gravity(),
            bubble_steps: default_bubble_steps(),
            volume_correction: default_volume_correction(),
            match_empty: default_match_empty(),
            iterations: default_iterations(),
            status_interval: default_status_interval(),
            checkpoint_interval: 0,
            checkpoint_path: default_checkpoint_path(),
            time_history_path: default_time_history_path(),
            full_log_path: default_full_log_path(),
        }
    }
}

impl SimConfig {
    /// Load from a TOML file, falling back to defaults if the file is absent.
    pub fn load_or_default(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match toml::from_str(&text) {
                Ok(cfg) => {
                    println!("Loaded simulation config from {}", path);
                    cfg
                }
                Err(e) => {
                    eprintln!("Failed to parse {}: {} - using defaults", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                println!("No {} found, using default simulation config", path);
                Self::default()
            }
        }
    }
}
