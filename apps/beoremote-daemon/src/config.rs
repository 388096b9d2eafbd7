//! Daemon configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Daemon configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// DNS-SD service type to browse.
    pub service_type: String,

    /// Seconds per resolve attempt (0 = until stopped).
    /// Override: `BEOREMOTE_RESOLVE_TIMEOUT`
    pub resolve_timeout_secs: u64,

    /// Seconds between watchdog re-resolve passes.
    /// Override: `BEOREMOTE_WATCHDOG_INTERVAL`
    pub watchdog_interval_secs: u64,

    /// Record each manually connected device as the new default.
    pub remember_last_connected: bool,

    /// Seconds between reachability probes of the active device.
    pub probe_interval_secs: u64,

    /// Device to connect automatically once it resolves.
    /// Seeds the preference store when it has no default yet.
    /// `--default-device` / `BEOREMOTE_DEFAULT_DEVICE` replace the stored default instead.
    pub default_device: Option<String>,

    /// Directory for the persisted preferences.
    /// Override: `BEOREMOTE_DATA_DIR`
    pub data_dir: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let core = beoremote_core::Config::default();
        Self {
            service_type: core.service_type,
            resolve_timeout_secs: core.resolve_timeout_secs,
            watchdog_interval_secs: core.watchdog_interval_secs,
            remember_last_connected: core.remember_last_connected,
            probe_interval_secs: core.probe_interval_secs,
            default_device: None,
            data_dir: None,
        }
    }
}

impl DaemonConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("BEOREMOTE_RESOLVE_TIMEOUT") {
            if let Ok(secs) = val.parse() {
                self.resolve_timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("BEOREMOTE_WATCHDOG_INTERVAL") {
            if let Ok(secs) = val.parse() {
                self.watchdog_interval_secs = secs;
            }
        }

        // BEOREMOTE_DEFAULT_DEVICE and BEOREMOTE_DATA_DIR are handled by clap
        // via #[arg(env = ...)] in main.rs
    }

    /// Converts to beoremote-core's Config type.
    pub fn to_core_config(&self) -> beoremote_core::Config {
        beoremote_core::Config {
            service_type: self.service_type.clone(),
            resolve_timeout_secs: self.resolve_timeout_secs,
            watchdog_interval_secs: self.watchdog_interval_secs,
            remember_last_connected: self.remember_last_connected,
            probe_interval_secs: self.probe_interval_secs,
            ..Default::default()
        }
    }
}
