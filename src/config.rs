//! Tracer configuration
//!
//! Configuration is installed once per process, before any thread starts
//! tracing, and is read-only afterwards.
//!
//! # Example imtrace.toml
//!
//! ```toml
//! output_dir = "/var/tmp/imtrace"
//! capacity = 4096
//! ```
//!
//! Environment overrides (highest precedence first):
//!
//! - `IMTRACE_OUTPUT_DIR` - directory for dump files
//! - `IMTRACE_CAPACITY` - registry slots per thread
//! - `IMTRACE_CONFIG` - path to a TOML file

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::TraceError;
use crate::registry::NEVENTS;

pub const ENV_CONFIG: &str = "IMTRACE_CONFIG";
pub const ENV_OUTPUT_DIR: &str = "IMTRACE_OUTPUT_DIR";
pub const ENV_CAPACITY: &str = "IMTRACE_CAPACITY";

static GLOBAL: OnceLock<TraceConfig> = OnceLock::new();

/// Per-process tracer settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TraceConfig {
    /// Directory receiving summary and latency files
    pub output_dir: PathBuf,
    /// Registry slots per thread
    pub capacity: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            output_dir: PathBuf::from("/tmp"),
            capacity: NEVENTS,
        }
    }
}

impl TraceConfig {
    pub fn new(output_dir: impl Into<PathBuf>, capacity: usize) -> Self {
        TraceConfig {
            output_dir: output_dir.into(),
            capacity,
        }
    }

    /// Load from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TraceConfig = toml::from_str(content).context("Invalid TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then `IMTRACE_CONFIG`, then the individual env overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(ENV_CONFIG) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => TraceConfig::default(),
        };

        if let Some(dir) = std::env::var_os(ENV_OUTPUT_DIR) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var(ENV_CAPACITY) {
            config.capacity = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be an integer, got {:?}", ENV_CAPACITY, raw))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), TraceError> {
        if self.capacity == 0 {
            return Err(TraceError::InvalidCapacity(self.capacity));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(TraceError::Config("output_dir must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Install the process-wide configuration
///
/// Must run before the first traced event; fails if a configuration (explicit
/// or loaded from the environment) is already in place.
pub fn configure(config: TraceConfig) -> std::result::Result<(), TraceError> {
    config.validate()?;
    GLOBAL
        .set(config)
        .map_err(|_| TraceError::AlreadyConfigured)
}

/// The process-wide configuration, loading it from the environment on first use
pub fn global() -> &'static TraceConfig {
    GLOBAL.get_or_init(|| {
        TraceConfig::from_env().unwrap_or_else(|e| {
            tracing::warn!("invalid tracer configuration, using defaults: {:#}", e);
            TraceConfig::default()
        })
    })
}
