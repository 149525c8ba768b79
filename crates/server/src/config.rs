//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Default location of the configuration file.
pub const CONFIG_PATH: &str = "config.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub food: FoodConfig,
}

/// A configuration value outside its valid range.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("world.map_size must be a positive finite number, got {0}")]
    MapSize(f64),

    #[error("server.tick_rate must be at least 1")]
    TickRate,

    #[error("player.min_eat_ratio must be a finite number >= 1.0, got {0}")]
    EatRatio(f64),

    #[error("{field} must be a positive finite number, got {value}")]
    Radius { field: &'static str, value: f64 },
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new(CONFIG_PATH))
    }

    /// Load configuration from `path`, writing a default file there if none exists.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable by the simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let map_size = self.world.map_size;
        if !(map_size.is_finite() && map_size > 0.0) {
            return Err(ConfigError::MapSize(map_size));
        }
        if self.server.tick_rate == 0 {
            return Err(ConfigError::TickRate);
        }
        let ratio = self.player.min_eat_ratio;
        if !(ratio.is_finite() && ratio >= 1.0) {
            return Err(ConfigError::EatRatio(ratio));
        }
        for (field, value) in [
            ("player.base_radius", self.player.base_radius),
            ("food.radius", self.food.radius),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Radius { field, value });
            }
        }
        Ok(())
    }
}

/// Server networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Simulation/broadcast ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Directory served over HTTP by the `arena` binary.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl ServerConfig {
    /// Time between two ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            tick_rate: default_tick_rate(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_port() -> u16 {
    3000
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_tick_rate() -> u32 {
    30
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

/// World configuration. The map spans `[0, map_size]` on both axes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    #[serde(default = "default_map_size")]
    pub map_size: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            map_size: default_map_size(),
        }
    }
}

fn default_map_size() -> f64 {
    1000.0
}

/// Player configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// Radius of a freshly spawned player.
    #[serde(default = "default_base_radius")]
    pub base_radius: f64,
    /// How many times larger a player must be to absorb another.
    #[serde(default = "default_min_eat_ratio")]
    pub min_eat_ratio: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            base_radius: default_base_radius(),
            min_eat_ratio: default_min_eat_ratio(),
        }
    }
}

fn default_base_radius() -> f64 {
    50.0
}
fn default_min_eat_ratio() -> f64 {
    1.2
}

/// Food configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    /// Target number of live food pellets.
    #[serde(default = "default_food_count")]
    pub count: usize,
    #[serde(default = "default_food_radius")]
    pub radius: f64,
    /// Radius gained per pellet eaten.
    #[serde(default = "default_food_growth")]
    pub growth: f64,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            count: default_food_count(),
            radius: default_food_radius(),
            growth: default_food_growth(),
        }
    }
}

fn default_food_count() -> usize {
    50
}
fn default_food_radius() -> f64 {
    5.0
}
fn default_food_growth() -> f64 {
    1.0
}
