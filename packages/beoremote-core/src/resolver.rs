//! Resolver contract.
//!
//! A resolver turns a [`DeviceIdentity`] into a connectable [`Endpoint`].
//! Resolution is asynchronous and may report the same identity zero, one or
//! many times; results re-enter the coordinator as [`ResolveEvent`]s through a
//! [`CoordinatorHandle`](crate::services::CoordinatorHandle).

use std::time::Duration;

use crate::device::{DeviceIdentity, Endpoint};

/// Starts and stops resolution processes.
///
/// Both methods must return promptly: the coordinator calls them from its
/// serialized context and never waits on I/O.
pub trait Resolver: Send + Sync {
    /// Starts a resolution attempt.
    ///
    /// `timeout = None` runs until [`stop`](Self::stop) is called. A finite
    /// timeout that elapses without being superseded reports
    /// [`ResolveEvent::Ended`].
    fn resolve(&self, identity: &DeviceIdentity, timeout: Option<Duration>);

    /// Stops any attempt in progress for `identity`. No-op if none is running.
    fn stop(&self, identity: &DeviceIdentity);
}

/// Outcome reported by a resolution process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveEvent {
    /// An endpoint was found. May repeat for the same identity.
    Resolved {
        identity: DeviceIdentity,
        endpoint: Endpoint,
    },
    /// The attempt timed out without being stopped.
    Ended { identity: DeviceIdentity },
}

impl ResolveEvent {
    pub fn identity(&self) -> &DeviceIdentity {
        match self {
            Self::Resolved { identity, .. } | Self::Ended { identity } => identity,
        }
    }
}
