//! Configuration system for chunkmesh.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $CHUNKMESH_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/chunkmesh/config.toml
//!   3. ~/.config/chunkmesh/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chunk::DEFAULT_CHUNK_SIZE;
use crate::router::Metric;
use crate::topology::Topology;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkmeshConfig {
    pub chunking: ChunkingConfig,
    pub transfer: TransferConfig,
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Chunk granularity in bytes. Must be > 0.
    pub chunk_size_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Worker fan-out. 0 is treated as 1.
    pub parallelism: usize,
    /// Seed for loss-retry draws.
    pub seed: u64,
    pub pacing: PacingMode,
    /// Wall-clock seconds slept per simulated second when pacing is realtime.
    pub time_scale: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingMode {
    /// Estimate only, never sleep.
    #[default]
    Instant,
    /// Sleep each chunk's estimated duration.
    Realtime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub metric: Metric,
    /// Treat connections as one-way (source → target).
    pub directed: bool,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            parallelism: 1,
            seed: 0,
            pacing: PacingMode::Instant,
            time_scale: 1.0,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            metric: Metric::LatencyBandwidth,
            directed: false,
        }
    }
}

impl RoutingConfig {
    /// An empty topology whose link direction follows this config.
    pub fn empty_topology(&self) -> Topology {
        if self.directed {
            Topology::directed()
        } else {
            Topology::new()
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("chunkmesh")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl ChunkmeshConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::read_file(&path)?
        } else {
            ChunkmeshConfig::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file, without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("CHUNKMESH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&ChunkmeshConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Effective worker count: `parallelism` clamped to at least 1.
    pub fn parallelism(&self) -> usize {
        self.transfer.parallelism.max(1)
    }

    /// Check boundary constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.chunk_size_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "chunking.chunk_size_bytes",
                reason: "must be greater than zero".into(),
            });
        }
        let scale = self.transfer.time_scale;
        if !(scale.is_finite() && scale >= 0.0) {
            return Err(ConfigError::Invalid {
                key: "transfer.time_scale",
                reason: format!("must be a finite value >= 0, got {scale}"),
            });
        }
        Ok(())
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Apply CHUNKMESH_* overrides. `lookup` is `std::env::var` in
    /// production; unparseable values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("CHUNKMESH_CHUNKING__CHUNK_SIZE_BYTES") {
            match v.parse() {
                Ok(n) => self.chunking.chunk_size_bytes = n,
                Err(_) => tracing::warn!(value = %v, "ignoring chunk size override"),
            }
        }
        if let Some(v) = lookup("CHUNKMESH_TRANSFER__PARALLELISM") {
            match v.parse() {
                Ok(n) => self.transfer.parallelism = n,
                Err(_) => tracing::warn!(value = %v, "ignoring parallelism override"),
            }
        }
        if let Some(v) = lookup("CHUNKMESH_TRANSFER__SEED") {
            match v.parse() {
                Ok(n) => self.transfer.seed = n,
                Err(_) => tracing::warn!(value = %v, "ignoring seed override"),
            }
        }
        if let Some(v) = lookup("CHUNKMESH_TRANSFER__PACING") {
            match v.as_str() {
                "instant" => self.transfer.pacing = PacingMode::Instant,
                "realtime" => self.transfer.pacing = PacingMode::Realtime,
                _ => tracing::warn!(value = %v, "ignoring pacing override"),
            }
        }
        if let Some(v) = lookup("CHUNKMESH_ROUTING__METRIC") {
            match v.parse() {
                Ok(m) => self.routing.metric = m,
                Err(_) => tracing::warn!(value = %v, "ignoring metric override"),
            }
        }
        if let Some(v) = lookup("CHUNKMESH_ROUTING__DIRECTED") {
            match v.as_str() {
                "true" | "1" => self.routing.directed = true,
                "false" | "0" => self.routing.directed = false,
                _ => tracing::warn!(value = %v, "ignoring directed override"),
            }
        }
    }
}
