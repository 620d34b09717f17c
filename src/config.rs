// Config Module - command-line arguments and the static tuning surface.
// Loaded once before the frame loop starts; immutable thereafter.
use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

use crate::strip::SectionSpec;
use crate::types::Rgb;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Simulated pond driving an RGB matrix and an addressable LED strip",
    long_about = "Runs the watershed pond installation: a simulated pond whose creatures\n\
                  raise or lower a health metric, with particles settling into a sediment\n\
                  bed. Without real hardware attached, the matrix is previewed in the\n\
                  terminal and switches are mapped to number keys."
)]
pub struct Args {
    /// Config file path (TOML). Defaults are used when omitted.
    #[arg(long)]
    pub cfg: Option<PathBuf>,

    /// Target framerate override
    #[arg(long)]
    pub fps: Option<f64>,

    /// Directory containing sprite assets; built-in sprites are generated when unset
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// Strip device node (e.g. /dev/spidev0.0); strip frames are discarded when unset
    #[arg(long)]
    pub strip_dev: Option<PathBuf>,

    /// Seed for the simulation's random draws; entropy-seeded when unset
    #[arg(long)]
    pub seed: Option<u64>,

    /// Quiet mode
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    pub width: usize,
    pub height: usize,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        MatrixConfig {
            width: 64,
            height: 32,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PondConfig {
    /// Number of net sediment movements that swing health across its full range
    pub healthsteps: f64,
    pub initial_level: f64,
    pub level_min: f64,
    pub level_max: f64,
    /// Seconds the level takes to rise from empty to the initial level
    pub fill_duration: f64,
    /// Seconds per unit of level when draining
    pub drain_duration: f64,
    /// Seconds without operator input before an automatic reset (None disables)
    pub auto_reset: Option<f64>,
    pub water_color: Rgb,
    pub sky_color: Rgb,
    pub active_spawners: Vec<String>,
}

impl Default for PondConfig {
    fn default() -> Self {
        PondConfig {
            healthsteps: 120.0,
            initial_level: 0.7,
            level_min: 0.0,
            level_max: 1.0,
            fill_duration: 20.0,
            drain_duration: 30.0,
            auto_reset: Some(300.0),
            water_color: Rgb::new(0, 0, 0xaa),
            sky_color: Rgb::new(0, 0, 0x33),
            active_spawners: vec!["fish".into(), "rain".into(), "bubbles".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MudConfig {
    /// Seconds between settling steps
    pub update_rate: f64,
    /// Per-cell clear probability per step (None disables decay)
    pub decay: Option<f64>,
}

impl Default for MudConfig {
    fn default() -> Self {
        MudConfig {
            update_rate: 0.5,
            decay: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SwitchesConfig {
    /// Minimum seconds between accepted presses on the same pin
    pub throttle: f64,
    pub pins: usize,
}

impl Default for SwitchesConfig {
    fn default() -> Self {
        SwitchesConfig {
            throttle: 0.5,
            pins: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    pub sections: Vec<SectionSpec>,
}

impl Default for StripConfig {
    fn default() -> Self {
        // full deployment layout
        StripConfig {
            sections: vec![
                SectionSpec {
                    name: "wave".into(),
                    length: 150,
                    direction: -1,
                    vmul: 1,
                    voffset: 0,
                },
                SectionSpec {
                    name: "rain".into(),
                    length: 121,
                    direction: -1,
                    vmul: -1,
                    voffset: -1,
                },
                SectionSpec {
                    name: "gooddroplet".into(),
                    length: 65,
                    direction: 1,
                    vmul: -1,
                    voffset: -1,
                },
                SectionSpec {
                    name: "baddroplet".into(),
                    length: 66,
                    direction: -1,
                    vmul: -1,
                    voffset: -1,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FishConfig {
    pub spawn_threshold: f64,
    /// Sprite file pairs (left, right) under the assets root
    pub sprites: Vec<(String, String)>,
}

impl Default for FishConfig {
    fn default() -> Self {
        FishConfig {
            spawn_threshold: 0.0005,
            sprites: vec![
                (
                    "sprites/Fish1/Fish1-left.png".into(),
                    "sprites/Fish1/Fish1-right.png".into(),
                ),
                (
                    "sprites/Fish2/Fish2-left.png".into(),
                    "sprites/Fish2/Fish2-right.png".into(),
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RainConfig {
    pub length: i32,
    pub color: Rgb,
    pub start_x: i32,
    pub airspeed: (f64, f64),
    pub waterspeed: (f64, f64),
    pub fade_time: f64,
    pub trail_fade_time: f64,
    /// Seconds between raindrops
    pub interval: f64,
}

impl Default for RainConfig {
    fn default() -> Self {
        RainConfig {
            length: 7,
            color: Rgb::new(0, 0, 0xff),
            start_x: 0,
            airspeed: (1.5, 8.0),
            waterspeed: (1.5, 8.0),
            fade_time: 3.5,
            trail_fade_time: 0.8,
            interval: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DropletConfig {
    pub length: i32,
    pub color: Rgb,
    pub start_x: i32,
    pub airspeed: (f64, f64),
    pub waterspeed: (f64, f64),
    pub trail_fade_time: f64,
}

impl Default for DropletConfig {
    fn default() -> Self {
        DropletConfig {
            length: 7,
            color: Rgb::new(0, 0, 0xcc),
            start_x: 20,
            airspeed: (1.5, 16.0),
            waterspeed: (1.5, 12.0),
            trail_fade_time: 2.0,
        }
    }
}

fn default_bad_droplet() -> DropletConfig {
    DropletConfig {
        length: 7,
        color: Rgb::new(0x66, 0, 0),
        start_x: 48,
        airspeed: (-1.5, 16.0),
        waterspeed: (-1.5, 12.0),
        trail_fade_time: 2.0,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DropletOverrides {
    length: Option<i32>,
    color: Option<Rgb>,
    start_x: Option<i32>,
    airspeed: Option<(f64, f64)>,
    waterspeed: Option<(f64, f64)>,
    trail_fade_time: Option<f64>,
}

// A partial [baddroplet] table must fall back to the bad-droplet constants;
// DropletConfig's own defaults are the good droplet's tuning.
fn merge_bad_droplet<'de, D>(deserializer: D) -> Result<DropletConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let o = DropletOverrides::deserialize(deserializer)?;
    let d = default_bad_droplet();
    Ok(DropletConfig {
        length: o.length.unwrap_or(d.length),
        color: o.color.unwrap_or(d.color),
        start_x: o.start_x.unwrap_or(d.start_x),
        airspeed: o.airspeed.unwrap_or(d.airspeed),
        waterspeed: o.waterspeed.unwrap_or(d.waterspeed),
        trail_fade_time: o.trail_fade_time.unwrap_or(d.trail_fade_time),
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BubblesConfig {
    pub spawn_threshold: f64,
}

impl Default for BubblesConfig {
    fn default() -> Self {
        BubblesConfig {
            spawn_threshold: 0.005,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fps: f64,
    pub matrix: MatrixConfig,
    pub pond: PondConfig,
    pub mud: MudConfig,
    pub switches: SwitchesConfig,
    pub strip: StripConfig,
    pub fish: FishConfig,
    pub rain: RainConfig,
    pub gooddroplet: DropletConfig,
    #[serde(default = "default_bad_droplet", deserialize_with = "merge_bad_droplet")]
    pub baddroplet: DropletConfig,
    pub bubbles: BubblesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fps: 50.0,
            matrix: MatrixConfig::default(),
            pond: PondConfig::default(),
            mud: MudConfig::default(),
            switches: SwitchesConfig::default(),
            strip: StripConfig::default(),
            fish: FishConfig::default(),
            rain: RainConfig::default(),
            gooddroplet: DropletConfig::default(),
            baddroplet: default_bad_droplet(),
            bubbles: BubblesConfig::default(),
        }
    }
}

impl Config {
    pub fn strip_section_length(&self, name: &str) -> usize {
        self.strip
            .sections
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.length)
            .unwrap_or(0)
    }

    pub fn load(path: Option<&PathBuf>) -> Result<Config> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        if self.fps <= 0.0 {
            anyhow::bail!("fps must be positive");
        }
        if self.matrix.width == 0 || self.matrix.height == 0 {
            anyhow::bail!("matrix dimensions must be non-zero");
        }
        if !(0.0..=1.0).contains(&self.pond.initial_level) {
            anyhow::bail!("pond.initial_level must be in [0, 1]");
        }
        if self.pond.level_min > self.pond.level_max {
            anyhow::bail!("pond.level_min must not exceed pond.level_max");
        }
        if self.mud.update_rate <= 0.0 {
            anyhow::bail!("mud.update_rate must be positive");
        }
        if let Some(decay) = self.mud.decay {
            if !(0.0..=1.0).contains(&decay) {
                anyhow::bail!("mud.decay must be in [0, 1]");
            }
        }
        Ok(())
    }
}
