// init_config.rs
// Handles loading and parsing the initial scene from init_config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize)]
pub struct InitConfig {
    pub domain: Option<DomainConfig>,
    pub scene: SceneConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DomainConfig {
    /// Optional domain width in cells. Falls back to the default when omitted.
    pub nx: Option<usize>,
    /// Optional domain height in cells. Falls back to the default when omitted.
    pub ny: Option<usize>,
    pub blocks_x: Option<usize>,
    pub blocks_y: Option<usize>,
}

impl DomainConfig {
    /// Return the domain size in cells, using the global defaults when
    /// values are not provided.
    pub fn size(&self) -> (usize, usize) {
        (
            self.nx.unwrap_or(crate::config::DEFAULT_NX),
            self.ny.unwrap_or(crate::config::DEFAULT_NY),
        )
    }

    /// Return the block grid, using the global defaults when values are not
    /// provided.
    pub fn blocks(&self) -> (usize, usize) {
        (
            self.blocks_x.unwrap_or(crate::config::DEFAULT_BLOCKS_X),
            self.blocks_y.unwrap_or(crate::config::DEFAULT_BLOCKS_Y),
        )
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SceneConfig {
    /// Liquid fill height in cells above the bottom wall. Defaults to 60% of
    /// the interior height when omitted.
    pub fill_height: Option<usize>,
    #[serde(default)]
    pub bubbles: Vec<BubbleConfig>,
    #[serde(default)]
    pub random_bubbles: Vec<RandomBubblesConfig>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BubbleConfig {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RandomBubblesConfig {
    pub count: usize,
    pub radius: f64,
    /// Optional standard deviation applied to each bubble's radius.
    pub radius_sigma: Option<f64>,
    /// Optional RNG seed; a fixed seed reproduces the same scene.
    pub seed: Option<u64>,
}

impl InitConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: InitConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn load_default() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from_file("init_config.toml")
    }

    /// Scene used when no init_config.toml is present: a 60% pool with one
    /// bubble rising through it.
    pub fn built_in() -> Self {
        Self {
            domain: None,
            scene: SceneConfig {
                fill_height: None,
                bubbles: vec![BubbleConfig {
                    x: crate::config::DEFAULT_NX as f64 / 2.0,
                    y: crate::config::DEFAULT_NY as f64 / 4.0,
                    radius: 8.0,
                }],
                random_bubbles: Vec::new(),
            },
        }
    }
}

impl BubbleConfig {
    /// Circle membership test for the center of cell (x, y).
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let dx = x as f64 - self.x;
        let dy = y as f64 - self.y;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}
