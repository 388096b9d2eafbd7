//! Centralized error types for the BeoRemote core library.
//!
//! Component errors (`DiscoveryError`, `PreferenceError`, `ConnectError`) are
//! defined next to the code that raises them; [`RemoteError`] is the
//! crate-wide type returned by the composition root and the coordinator
//! handle. Every error exposes a stable machine-readable code via
//! [`ErrorCode`].

use thiserror::Error;

use crate::discovery::DiscoveryError;
use crate::preferences::PreferenceError;
use crate::services::ConnectError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    fn code(&self) -> &'static str;
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::MdnsDaemon(_) => "mdns_daemon_failed",
            Self::Browse { .. } => "mdns_browse_failed",
        }
    }
}

impl ErrorCode for PreferenceError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "preferences_io_failed",
            Self::Encode(_) => "preferences_encode_failed",
        }
    }
}

impl ErrorCode for ConnectError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "device_not_found",
            Self::NotResolved(_) => "device_not_resolved",
        }
    }
}

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// mDNS daemon or browse failure.
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// Preference store could not be written.
    #[error("Preferences error: {0}")]
    Preferences(String),

    /// A connect request was rejected.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The coordinator loop is no longer running.
    #[error("Coordinator has stopped")]
    CoordinatorStopped,
}

impl ErrorCode for RemoteError {
    fn code(&self) -> &'static str {
        match self {
            Self::Discovery(_) => "discovery_failed",
            Self::Preferences(_) => "preferences_error",
            Self::Connect(e) => e.code(),
            Self::Configuration(_) => "configuration_error",
            Self::CoordinatorStopped => "coordinator_stopped",
        }
    }
}

impl From<DiscoveryError> for RemoteError {
    fn from(err: DiscoveryError) -> Self {
        Self::Discovery(err.to_string())
    }
}

impl From<PreferenceError> for RemoteError {
    fn from(err: PreferenceError) -> Self {
        Self::Preferences(err.to_string())
    }
}

// Re-export Result type aliases from their defining modules
pub use crate::discovery::DiscoveryResult;
pub use crate::preferences::PreferenceResult;

/// Convenient Result alias for application-wide operations.
pub type RemoteResult<T> = Result<T, RemoteError>;
