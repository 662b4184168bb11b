//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! across the fifodev workspace.
//!
//! # Usage
//!
//! ```rust,no_run
//! use fifodev_common::config::{ConfigLoader, DeviceConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = DeviceConfig::load(Path::new("device.toml"))?;
//!     config.validate()?;
//!     println!("slots: {}", config.slots);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::consts::{
    DEFAULT_ELEM_SIZE, DEFAULT_QUANTUM, DEFAULT_SLOT_COUNT, MAX_ELEM_SIZE, MAX_SLOT_COUNT,
};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

/// Device construction parameters, fixed after construction.
///
/// # TOML Example
///
/// ```toml
/// slots = 16
/// max_element_size = 256
/// quantum = 4000
/// log_level = "debug"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Number of slots in the ring buffer (N).
    #[serde(default = "default_slots")]
    pub slots: usize,

    /// Maximum element payload size in bytes.
    #[serde(default = "default_elem_size")]
    pub max_element_size: usize,

    /// Initial value of the quantum control register.
    #[serde(default = "default_quantum")]
    pub quantum: i64,

    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_slots() -> usize {
    DEFAULT_SLOT_COUNT
}

fn default_elem_size() -> usize {
    DEFAULT_ELEM_SIZE
}

fn default_quantum() -> i64 {
    DEFAULT_QUANTUM
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            slots: DEFAULT_SLOT_COUNT,
            max_element_size: DEFAULT_ELEM_SIZE,
            quantum: DEFAULT_QUANTUM,
            log_level: LogLevel::default(),
        }
    }
}

impl DeviceConfig {
    /// Create a config with explicit sizing and defaults elsewhere.
    pub fn with_sizing(slots: usize, max_element_size: usize) -> Self {
        Self {
            slots,
            max_element_size,
            ..Self::default()
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `slots` is zero or exceeds `MAX_SLOT_COUNT`
    /// - `max_element_size` is zero or exceeds `MAX_ELEM_SIZE`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slots == 0 {
            return Err(ConfigError::ValidationError(
                "slots must be at least 1".to_string(),
            ));
        }
        if self.slots > MAX_SLOT_COUNT {
            return Err(ConfigError::ValidationError(format!(
                "slots {} exceeds maximum {}",
                self.slots, MAX_SLOT_COUNT
            )));
        }
        if self.max_element_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_element_size must be at least 1".to_string(),
            ));
        }
        if self.max_element_size > MAX_ELEM_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "max_element_size {} exceeds maximum {}",
                self.max_element_size, MAX_ELEM_SIZE
            )));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
/// - Returns `ConfigError::ValidationError` if semantic validation fails
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
