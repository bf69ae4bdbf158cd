use crate::topology::{NeighborOptions, SpatialBackendKind, TopologySettings};
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

const DEFAULT_NEIGHBOR_BUFFER: f64 = 50.0;
const DEFAULT_MAX_NEIGHBORS: usize = 5;
const DEFAULT_MAX_LINES: usize = 5000;

/// Runtime configuration for the topology service.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Spatial backend bound for the lifetime of the process.
    pub spatial_backend: SpatialBackendKind,
    /// Buffer around a tag's bounds used for candidate queries, and the farthest a neighbor may
    /// be, in drawing coordinate units.
    pub neighbor_buffer: f64,
    /// Neighbors kept per tag.
    pub max_neighbors: usize,
    /// Optional cutoff on true neighbor distance, tighter than `neighbor_buffer`.
    pub max_neighbor_distance: Option<f64>,
    /// Ceiling on lines considered per chunk.
    pub max_lines: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spatial_backend: SpatialBackendKind::RTree,
            neighbor_buffer: DEFAULT_NEIGHBOR_BUFFER,
            max_neighbors: DEFAULT_MAX_NEIGHBORS,
            max_neighbor_distance: None,
            max_lines: DEFAULT_MAX_LINES,
            server_port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let spatial_backend = match optional("TOPOLOGY_SPATIAL_BACKEND") {
            Some(value) => value
                .parse::<SpatialBackendKind>()
                .map_err(|()| ConfigError::InvalidValue("TOPOLOGY_SPATIAL_BACKEND".into()))?,
            None => defaults.spatial_backend,
        };
        let neighbor_buffer = parse_optional::<f64>(
            optional("TOPOLOGY_NEIGHBOR_BUFFER"),
            "TOPOLOGY_NEIGHBOR_BUFFER",
        )?
        .unwrap_or(defaults.neighbor_buffer);
        if !neighbor_buffer.is_finite() || neighbor_buffer < 0.0 {
            return Err(ConfigError::InvalidValue("TOPOLOGY_NEIGHBOR_BUFFER".into()));
        }
        let max_neighbors = parse_optional::<usize>(
            optional("TOPOLOGY_MAX_NEIGHBORS"),
            "TOPOLOGY_MAX_NEIGHBORS",
        )?
        .unwrap_or(defaults.max_neighbors);
        if max_neighbors == 0 {
            return Err(ConfigError::InvalidValue("TOPOLOGY_MAX_NEIGHBORS".into()));
        }
        let max_neighbor_distance = parse_optional::<f64>(
            optional("TOPOLOGY_MAX_NEIGHBOR_DISTANCE"),
            "TOPOLOGY_MAX_NEIGHBOR_DISTANCE",
        )?;
        if max_neighbor_distance.is_some_and(|limit| !limit.is_finite() || limit < 0.0) {
            return Err(ConfigError::InvalidValue(
                "TOPOLOGY_MAX_NEIGHBOR_DISTANCE".into(),
            ));
        }
        let max_lines =
            parse_optional::<usize>(optional("TOPOLOGY_MAX_LINES"), "TOPOLOGY_MAX_LINES")?
                .unwrap_or(defaults.max_lines);
        if max_lines == 0 {
            return Err(ConfigError::InvalidValue("TOPOLOGY_MAX_LINES".into()));
        }

        Ok(Self {
            spatial_backend,
            neighbor_buffer,
            max_neighbors,
            max_neighbor_distance,
            max_lines,
            server_port: parse_optional::<u16>(optional("SERVER_PORT"), "SERVER_PORT")?,
        })
    }

    /// Analyzer settings derived from this configuration.
    pub fn topology_settings(&self) -> TopologySettings {
        TopologySettings {
            neighbors: NeighborOptions {
                buffer: self.neighbor_buffer,
                max_neighbors: self.max_neighbors,
                max_distance: self.max_neighbor_distance,
            },
            max_lines: self.max_lines,
        }
    }
}

fn parse_optional<T: FromStr>(
    value: Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        spatial_backend = ?config.spatial_backend,
        neighbor_buffer = config.neighbor_buffer,
        max_neighbors = config.max_neighbors,
        max_lines = config.max_lines,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
