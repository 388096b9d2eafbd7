//! Fixed protocol values and defaults.
//!
//! The service type is defined by the devices themselves; the remaining values
//! are defaults that [`Config`](crate::Config) can override.

// ─────────────────────────────────────────────────────────────────────────────
// DNS-SD
// ─────────────────────────────────────────────────────────────────────────────

/// DNS-SD service type advertised by BeoRemote-capable devices.
///
/// The trailing dot is required by mdns-sd.
pub const BEOREMOTE_SERVICE_TYPE: &str = "_beoremote._tcp.local.";

/// Default duration of a single resolve attempt (seconds, 0 = indefinite).
pub const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Recovery
// ─────────────────────────────────────────────────────────────────────────────

/// Interval between watchdog re-resolve passes (seconds).
///
/// Resolvers have been observed to silently drop attempts; two seconds keeps
/// the device list responsive without flooding the network.
pub const DEFAULT_WATCHDOG_INTERVAL_SECS: u64 = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Reachability probe
// ─────────────────────────────────────────────────────────────────────────────

/// Interval between reachability probes of the active device (seconds).
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 10;

/// Timeout for a single TCP connect during a probe (milliseconds).
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2000;

// ─────────────────────────────────────────────────────────────────────────────
// Channels & persistence
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity of the surface and notification broadcast channels.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// File name of the persisted preferences inside the data directory.
pub const PREFERENCES_FILE: &str = "preferences.json";
