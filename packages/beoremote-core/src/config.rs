//! Core configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    BEOREMOTE_SERVICE_TYPE, DEFAULT_PROBE_INTERVAL_SECS, DEFAULT_PROBE_TIMEOUT_MS,
    DEFAULT_RESOLVE_TIMEOUT_SECS, DEFAULT_WATCHDOG_INTERVAL_SECS, EVENT_CHANNEL_CAPACITY,
};

/// Configuration for the discovery and connection core.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    // Discovery
    /// DNS-SD service type to browse.
    pub service_type: String,

    /// Duration of a single resolve attempt in seconds (0 = until stopped).
    pub resolve_timeout_secs: u64,

    /// Interval between watchdog re-resolve passes (seconds).
    pub watchdog_interval_secs: u64,

    // Connection
    /// Record each manually connected device as the new default.
    pub remember_last_connected: bool,

    /// Interval between reachability probes of the active device (seconds).
    pub probe_interval_secs: u64,

    /// Timeout for a single probe connect (milliseconds).
    pub probe_timeout_ms: u64,

    // Events
    /// Capacity of the surface and notification broadcast channels.
    pub event_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_type: BEOREMOTE_SERVICE_TYPE.to_string(),
            resolve_timeout_secs: DEFAULT_RESOLVE_TIMEOUT_SECS,
            watchdog_interval_secs: DEFAULT_WATCHDOG_INTERVAL_SECS,
            remember_last_connected: true,
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !self.service_type.ends_with(".local.") {
            return Err(format!(
                "service_type must end with \".local.\" (got {:?})",
                self.service_type
            ));
        }
        if self.watchdog_interval_secs == 0 {
            return Err("watchdog_interval_secs must be >= 1".to_string());
        }
        if self.probe_interval_secs == 0 {
            return Err("probe_interval_secs must be >= 1".to_string());
        }
        if self.probe_timeout_ms == 0 {
            return Err("probe_timeout_ms must be >= 1".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        Ok(())
    }

    /// Resolve attempt duration; `None` means indefinite.
    pub fn resolve_timeout(&self) -> Option<Duration> {
        match self.resolve_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.service_type, "_beoremote._tcp.local.");
        assert_eq!(config.watchdog_interval(), Duration::from_secs(2));
        assert!(config.remember_last_connected);
    }

    #[test]
    fn zero_resolve_timeout_means_indefinite() {
        let config = Config {
            resolve_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.resolve_timeout(), None);
        assert_eq!(
            Config::default().resolve_timeout(),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn rejects_invalid_values() {
        let bad_type = Config {
            service_type: "_beoremote._tcp".to_string(),
            ..Default::default()
        };
        assert!(bad_type.validate().is_err());

        let zero_watchdog = Config {
            watchdog_interval_secs: 0,
            ..Default::default()
        };
        assert!(zero_watchdog.validate().is_err());

        let zero_capacity = Config {
            event_channel_capacity: 0,
            ..Default::default()
        };
        assert!(zero_capacity.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"resolve_timeout_secs": 0}"#).unwrap();
        assert_eq!(config.resolve_timeout_secs, 0);
        assert_eq!(config.watchdog_interval_secs, 2);
    }
}
