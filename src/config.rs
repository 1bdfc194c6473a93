//! Configuration management for rrsim.
//!
//! Configuration is loaded from multiple sources in priority order:
//! 1. Environment variables (`RRSIM_QUANTUM`, `RRSIM_CPUS`, `RRSIM_MAX_TICKS`)
//! 2. Project-local config file (`./rrsim.toml`)
//! 3. User config file (`~/.config/rrsim/config.toml`)
//! 4. Built-in defaults
//!
//! # Config File Format
//!
//! ```toml
//! # rrsim.toml
//!
//! # Ticks a process may hold a CPU while others are ready (0 disables)
//! quantum = 5
//!
//! # Number of CPUs
//! cpus = 2
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

/// Default scheduling quantum in ticks.
pub const DEFAULT_QUANTUM: u32 = 5;

/// Default number of CPUs.
pub const DEFAULT_CPUS: usize = 1;

/// Default tick limit for a command-line run.
pub const DEFAULT_MAX_TICKS: u64 = 1000;

/// Global cached configuration.
static CONFIG: OnceLock<Config> = OnceLock::new();

/// rrsim configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Scheduling quantum in ticks. 0 disables preemption.
    pub quantum: Option<u32>,

    /// Number of CPUs.
    pub cpus: Option<usize>,

    /// Tick limit for a command-line run.
    pub max_ticks: Option<u64>,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Project-local `rrsim.toml`
    /// 3. User config `~/.config/rrsim/config.toml`
    /// 4. Defaults
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        if let Some(local_config) = Self::load_local_config() {
            config.merge(local_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Get the cached global configuration.
    ///
    /// Loads configuration on first call and caches it.
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(|| {
            let config = Self::load();
            log::debug!("Loaded configuration: {:?}", config);
            config
        })
    }

    /// Scheduling quantum, with fallback to [`DEFAULT_QUANTUM`].
    pub fn quantum(&self) -> u32 {
        self.quantum.unwrap_or(DEFAULT_QUANTUM)
    }

    /// CPU count, with fallback to [`DEFAULT_CPUS`].
    pub fn cpus(&self) -> usize {
        self.cpus.unwrap_or(DEFAULT_CPUS)
    }

    /// Tick limit, with fallback to [`DEFAULT_MAX_TICKS`].
    pub fn max_ticks(&self) -> u64 {
        self.max_ticks.unwrap_or(DEFAULT_MAX_TICKS)
    }

    /// Load user configuration from ~/.config/rrsim/config.toml
    fn load_user_config() -> Option<Self> {
        let config_path = Self::user_config_path()?;
        Self::load_from_file(&config_path)
    }

    /// Load project-local configuration from ./rrsim.toml
    fn load_local_config() -> Option<Self> {
        Self::load_from_file(Path::new("rrsim.toml"))
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge another config into this one.
    /// Only overrides fields that are Some in the other config.
    fn merge(&mut self, other: Self) {
        if other.quantum.is_some() {
            self.quantum = other.quantum;
        }
        if other.cpus.is_some() {
            self.cpus = other.cpus;
        }
        if other.max_ticks.is_some() {
            self.max_ticks = other.max_ticks;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup. Unparsable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(quantum) = parse_var(&lookup, "RRSIM_QUANTUM") {
            self.quantum = Some(quantum);
        }
        if let Some(cpus) = parse_var(&lookup, "RRSIM_CPUS") {
            self.cpus = Some(cpus);
        }
        if let Some(max_ticks) = parse_var(&lookup, "RRSIM_MAX_TICKS") {
            self.max_ticks = Some(max_ticks);
        }
    }

    /// Get the path to the user config file (for display/creation).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("rrsim").join("config.toml"))
    }

    /// Generate a sample config file content.
    pub fn sample_config() -> String {
        format!(
            r#"# rrsim configuration
# Place this file at ~/.config/rrsim/config.toml or ./rrsim.toml

# Ticks a process may hold a CPU while others are ready (0 disables preemption)
quantum = {}

# Number of CPUs
cpus = {}

# Tick limit for a command-line run
max_ticks = {}
"#,
            DEFAULT_QUANTUM, DEFAULT_CPUS, DEFAULT_MAX_TICKS
        )
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let value = lookup(name)?;
    match value.trim().parse() {
        Ok(parsed) => {
            log::info!("Using {} from environment: {}", name, value);
            Some(parsed)
        }
        Err(_) => {
            log::warn!("Ignoring {}: '{}' is not a valid number", name, value);
            None
        }
    }
}
