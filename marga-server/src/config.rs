//! Configuration loading for the Marga server
//!
//! Loads a JSON file in which every field is optional. A missing file is
//! created with the defaults so operators have something to edit.

use crate::engine::GridEngineConfig;
use crate::error::{Error, Result};
use marga_path::transform::{PathFlags, PipelineConfig, SteeringConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for `smoothing.chaikin_iterations`
pub const MAX_CHAIKIN_ITERATIONS: u32 = 16;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub maps: MapsConfig,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Interface to bind (default: 0.0.0.0)
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// TCP port (default: 47110)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Idle read timeout before a client is dropped (default: 30)
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Write timeout for responses (default: 5)
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,
}

/// Map data and query limits
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MapsConfig {
    /// Directory holding map data files (default: mmaps)
    #[serde(default = "default_data_folder")]
    pub data_folder: PathBuf,

    /// Map ids loaded at startup
    #[serde(default)]
    pub preload: Vec<i32>,

    /// Corridor length limit per path query (default: 512)
    #[serde(default = "default_max_poly_path")]
    pub max_poly_path: usize,

    /// Point count limit for returned paths (default: 256)
    #[serde(default = "default_max_point_path")]
    pub max_point_path: usize,

    /// Search node limit per path query (default: 65535)
    #[serde(default = "default_max_search_nodes")]
    pub max_search_nodes: usize,
}

/// Path post-processing
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SmoothingConfig {
    /// Chaikin passes when a client asks for corner cutting (default: 1)
    #[serde(default = "default_chaikin_iterations")]
    pub chaikin_iterations: u32,

    /// Catmull-Rom samples per span (default: 4)
    #[serde(default = "default_catmull_rom_points")]
    pub catmull_rom_points: u32,

    /// Prune near-collinear nodes on every path
    #[serde(default)]
    pub node_reduction: bool,

    /// Bearing change a node must exceed to be kept (radians, default: 0.2)
    #[serde(default = "default_node_reduction_min_angle")]
    pub node_reduction_min_angle: f32,

    /// Apply steering displacement on every path
    #[serde(default)]
    pub steering: bool,

    #[serde(default = "default_steering_distance_threshold")]
    pub steering_distance_threshold: f32,

    #[serde(default = "default_steering_max_velocity")]
    pub steering_max_velocity: f32,

    #[serde(default = "default_steering_jitter")]
    pub steering_jitter: f32,

    /// Seed for per-connection RNGs (0 = entropy)
    #[serde(default)]
    pub steering_seed: u64,
}

/// Logging configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error); `RUST_LOG` wins
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also append log lines to `file_path`
    #[serde(default)]
    pub log_to_file: bool,

    #[serde(default = "default_log_file_path")]
    pub file_path: PathBuf,

    /// Truncate the log file at startup
    #[serde(default)]
    pub remove_old_log: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            read_timeout_secs: default_read_timeout_secs(),
            write_timeout_secs: default_write_timeout_secs(),
        }
    }
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            data_folder: default_data_folder(),
            preload: Vec::new(),
            max_poly_path: default_max_poly_path(),
            max_point_path: default_max_point_path(),
            max_search_nodes: default_max_search_nodes(),
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            chaikin_iterations: default_chaikin_iterations(),
            catmull_rom_points: default_catmull_rom_points(),
            node_reduction: false,
            node_reduction_min_angle: default_node_reduction_min_angle(),
            steering: false,
            steering_distance_threshold: default_steering_distance_threshold(),
            steering_max_velocity: default_steering_max_velocity(),
            steering_jitter: default_steering_jitter(),
            steering_seed: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_to_file: false,
            file_path: default_log_file_path(),
            remove_old_log: false,
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    47110
}
fn default_read_timeout_secs() -> u64 {
    30
}
fn default_write_timeout_secs() -> u64 {
    5
}
fn default_data_folder() -> PathBuf {
    PathBuf::from("mmaps")
}
fn default_max_poly_path() -> usize {
    512
}
fn default_max_point_path() -> usize {
    256
}
fn default_max_search_nodes() -> usize {
    65535
}
fn default_chaikin_iterations() -> u32 {
    1
}
fn default_catmull_rom_points() -> u32 {
    4
}
fn default_node_reduction_min_angle() -> f32 {
    0.2
}
fn default_steering_distance_threshold() -> f32 {
    12.0
}
fn default_steering_max_velocity() -> f32 {
    2.0
}
fn default_steering_jitter() -> f32 {
    3.0
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_file_path() -> PathBuf {
    PathBuf::from("logs/marga.log")
}

impl ServerConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: ServerConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load `path`, writing the defaults there first if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| {
            Error::Config(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    /// Reject settings the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        if !self.maps.data_folder.is_dir() {
            return Err(Error::Config(format!(
                "Map folder {} does not exist",
                self.maps.data_folder.display()
            )));
        }
        if self.network.port == 0 {
            return Err(Error::Config("Port must be in 1..=65535".to_string()));
        }
        if self.maps.max_poly_path == 0 {
            return Err(Error::Config("max_poly_path must be positive".to_string()));
        }
        if self.maps.max_point_path == 0 {
            return Err(Error::Config("max_point_path must be positive".to_string()));
        }
        if self.smoothing.chaikin_iterations > MAX_CHAIKIN_ITERATIONS {
            return Err(Error::Config(format!(
                "chaikin_iterations must be at most {}",
                MAX_CHAIKIN_ITERATIONS
            )));
        }
        if self.maps.max_search_nodes == 0 || self.maps.max_search_nodes > 65535 {
            return Err(Error::Config(
                "max_search_nodes must be in 1..=65535".to_string(),
            ));
        }
        Ok(())
    }

    /// Listener address string
    pub fn address(&self) -> String {
        format!("{}:{}", self.network.bind_address, self.network.port)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        timeout(self.network.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        timeout(self.network.write_timeout_secs)
    }

    /// Transform settings
    pub fn pipeline_config(&self) -> PipelineConfig {
        let s = &self.smoothing;
        PipelineConfig {
            chaikin_iterations: s.chaikin_iterations,
            catmull_rom_points: s.catmull_rom_points,
            node_reduction_min_angle: s.node_reduction_min_angle,
            steering: SteeringConfig {
                distance_threshold: s.steering_distance_threshold,
                max_velocity: s.steering_max_velocity,
                jitter: s.steering_jitter,
                ..SteeringConfig::default()
            },
            max_points: self.maps.max_point_path,
        }
    }

    /// Stages enabled for every path regardless of the client's flags
    pub fn server_flags(&self) -> PathFlags {
        let mut flags = PathFlags::NONE;
        if self.smoothing.node_reduction {
            flags.insert(PathFlags::NODE_REDUCTION);
        }
        if self.smoothing.steering {
            flags.insert(PathFlags::STEERING);
        }
        flags
    }

    /// Grid engine settings
    pub fn engine_config(&self) -> GridEngineConfig {
        GridEngineConfig {
            data_folder: self.maps.data_folder.clone(),
            max_poly_path: self.maps.max_poly_path,
            max_point_path: self.maps.max_point_path,
            max_search_nodes: self.maps.max_search_nodes,
            seed: self.smoothing.steering_seed,
        }
    }
}

/// Zero disables the timeout.
fn timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
