use crate::profile_scope;
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::Path;

use crate::bubbles::BubbleHistory;
use crate::config::{self, SimConfig};
use crate::free_surface::{Flag, FreeSurfaceFields};
use crate::grid::{BlockLayout, ScalarField2};
use crate::lattice::Cell;
use crate::simulation::Simulation;
use ultraviolet::DVec2;

/// Everything needed to resume a run: the per-cell fields, the bubble
/// history and the tracking parameters. Collision parameters live in the
/// config and are rebuilt by the caller, not stored here.
#[derive(Clone, Serialize, Deserialize)]
pub struct SimulationState {
    pub layout: BlockLayout,
    pub lattice: ScalarField2<Cell>,
    pub flag: ScalarField2<Flag>,
    pub mass: ScalarField2<f64>,
    pub volume_fraction: ScalarField2<f64>,
    pub rho: ScalarField2<f64>,
    pub j: ScalarField2<DVec2>,
    pub outside_density: ScalarField2<f64>,
    pub rho_default: f64,
    #[serde(default)]
    pub lost_mass: f64,
    pub history: BubbleHistory,
    pub config: SimConfig,
    #[serde(default)]
    pub iteration: u64,
    #[serde(default = "default_bubble_steps")]
    pub bubble_steps: u64,
    #[serde(default = "default_volume_correction")]
    pub volume_correction: f64,
    #[serde(default = "default_match_empty")]
    pub match_empty: bool,
}

fn default_bubble_steps() -> u64 {
    config::DEFAULT_BUBBLE_STEPS
}

fn default_volume_correction() -> f64 {
    config::DEFAULT_VOLUME_CORRECTION
}

fn default_match_empty() -> bool {
    true
}

impl SimulationState {
    pub fn from_simulation(sim: &Simulation, config: &SimConfig) -> Self {
        Self {
            layout: sim.fields.layout.clone(),
            lattice: sim.fields.lattice.clone(),
            flag: sim.fields.flag.clone(),
            mass: sim.fields.mass.clone(),
            volume_fraction: sim.fields.volume_fraction.clone(),
            rho: sim.fields.rho.clone(),
            j: sim.fields.j.clone(),
            outside_density: sim.fields.outside_density.clone(),
            rho_default: sim.fields.rho_default,
            lost_mass: sim.fields.lost_mass,
            history: sim.history.clone(),
            config: config.clone(),
            iteration: sim.iteration,
            bubble_steps: sim.bubble_steps,
            volume_correction: sim.volume_correction,
            match_empty: sim.match_empty,
        }
    }

    pub fn apply_to(self, sim: &mut Simulation) {
        sim.fields = FreeSurfaceFields::from_parts(
            self.layout,
            self.lattice,
            self.flag,
            self.mass,
            self.volume_fraction,
            self.rho,
            self.j,
            self.outside_density,
            self.rho_default,
            self.lost_mass,
        );
        sim.history = self.history;
        sim.iteration = self.iteration;
        sim.bubble_steps = self.bubble_steps;
        sim.volume_correction = self.volume_correction;
        sim.match_empty = self.match_empty;
    }
}

pub fn save_state<P: AsRef<Path>>(path: P, state: &SimulationState) -> std::io::Result<()> {
    profile_scope!("save_state");
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let use_gzip = name.ends_with(".gz");
    let use_json = name.contains(".json");
    // Write to a temporary file first to avoid truncation on crash/interruption
    let tmp_path = path.with_extension({
        let mut os = path.extension().map(|e| e.to_os_string()).unwrap_or_default();
        os.push(".tmp");
        os
    });
    {
        let file = std::fs::File::create(&tmp_path)?;
        let writer = BufWriter::new(file);
        match (use_json, use_gzip) {
            (true, false) => {
                serde_json::to_writer(writer, state)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            }
            (true, true) => {
                let mut encoder = GzEncoder::new(writer, Compression::fast());
                serde_json::to_writer(&mut encoder, state)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
                let mut writer = encoder.finish()?;
                writer.flush()?;
            }
            (false, false) => {
                // Binary bincode (little-endian, varint) default config
                bincode::serialize_into(writer, state)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            }
            (false, true) => {
                let mut encoder = GzEncoder::new(writer, Compression::fast());
                bincode::serialize_into(&mut encoder, state)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
                let mut writer = encoder.finish()?;
                writer.flush()?;
            }
        }
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn load_state<P: AsRef<Path>>(path: P) -> std::io::Result<SimulationState> {
    profile_scope!("load_state");
    let data = std::fs::read(path.as_ref())?;
    if let Some(decoded) = maybe_decompress_gzip(&data)? {
        parse_state_bytes(&decoded)
    } else {
        parse_state_bytes(&data)
    }
}

fn parse_state_bytes(bytes: &[u8]) -> std::io::Result<SimulationState> {
    // Try JSON first, then binary (bincode).
    if let Ok(state) = serde_json::from_slice::<SimulationState>(bytes) {
        return Ok(state);
    }
    if let Ok(state) = bincode::deserialize::<SimulationState>(bytes) {
        return Ok(state);
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::Other,
        "failed to parse simulation state: not valid JSON or binary format",
    ))
}

fn maybe_decompress_gzip(data: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
    if data.len() < 2 || data[0] != 0x1f || data[1] != 0x8b {
        return Ok(None);
    }

    let mut decoder = GzDecoder::new(Cursor::new(data));
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded)?;
    Ok(Some(decoded))
}
