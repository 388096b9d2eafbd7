//! BeoRemote Core - device discovery and connection coordination.
//!
//! This crate discovers BeoRemote-capable devices on the local network via
//! DNS-SD, resolves them to connectable endpoints, and keeps at most one of
//! them connected at a time. It is UI-agnostic: state is pushed to a
//! [`PresentationSurface`](events::PresentationSurface) as read-only
//! projections.
//!
//! # Architecture
//!
//! - [`device`]: device records and the registry that owns them
//! - [`discovery`]: burst batching and the mDNS browse/resolve transport
//! - [`services`]: the coordinator state machine, its serialized context and
//!   the re-resolve watchdog
//! - [`control`]: control-client contract and a reachability probe
//! - [`notifications`]: control-client notifications and their bus
//! - [`events`]: presentation surface trait and broadcast bridge
//! - [`preferences`]: default-device persistence
//! - [`bootstrap`]: composition root
//!
//! # Abstraction Traits
//!
//! - [`Resolver`](resolver::Resolver): identity → endpoint resolution
//! - [`DeviceControlClient`](control::DeviceControlClient): active session
//! - [`PreferenceStore`](preferences::PreferenceStore): default device name
//! - [`PresentationSurface`](events::PresentationSurface): rendering target
//! - [`TaskSpawner`](runtime::TaskSpawner): spawning background tasks

#![warn(clippy::all)]

pub mod bootstrap;
pub mod config;
pub mod control;
pub mod device;
pub mod discovery;
pub mod error;
pub mod events;
pub mod notifications;
pub mod preferences;
pub mod protocol_constants;
pub mod resolver;
pub mod runtime;
pub mod services;

#[cfg(test)]
mod test_fixtures;

// Re-export commonly used types at the crate root
pub use bootstrap::{bootstrap_services, BootstrappedServices};
pub use config::Config;
pub use control::{DeviceControlClient, ProbeControlClient, ProbeSettings};
pub use device::{Connection, Device, DeviceIdentity, DeviceRegistry, Endpoint, Resolution};
pub use error::{DiscoveryResult, ErrorCode, PreferenceResult, RemoteError, RemoteResult};
pub use events::{
    ActiveDeviceChange, BroadcastSurfaceBridge, DeviceView, LoggingSurface, NoopSurface,
    PresentationSurface, SurfaceEvent,
};
pub use notifications::{
    DeviceNotification, LinkState, NotificationBus, PlaybackEvent, PlaybackState, SessionId,
};
pub use preferences::{FilePreferenceStore, MemoryPreferenceStore, PreferenceError, PreferenceStore};
pub use resolver::{ResolveEvent, Resolver};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use services::{ConnectError, CoordinatorHandle};
