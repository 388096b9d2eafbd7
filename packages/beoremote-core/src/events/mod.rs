//! Presentation surface events.
//!
//! This module provides:
//! - [`PresentationSurface`] trait the coordinator pushes its projection into
//! - [`BroadcastSurfaceBridge`] for fan-out to any number of subscribers
//! - [`SurfaceEvent`] and its payload types
//!
//! The core never reaches into a widget tree; it only pushes read-only copies
//! of its state through these types.

mod bridge;
mod emitter;

pub use bridge::BroadcastSurfaceBridge;
pub use emitter::{LoggingSurface, NoopSurface, PresentationSurface};

use serde::Serialize;

use crate::device::{Connection, Device, DeviceIdentity};
use crate::notifications::PlaybackEvent;

/// One row of the rendered device list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub identity: DeviceIdentity,
    pub display_name: String,
    pub resolved: bool,
    pub connection_state: Connection,
}

impl From<&Device> for DeviceView {
    fn from(device: &Device) -> Self {
        Self {
            identity: device.identity.clone(),
            display_name: device.display_name.clone(),
            resolved: device.is_resolved(),
            connection_state: device.connection,
        }
    }
}

/// The connection indicator: which device is active and how far along it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDeviceChange {
    /// `None` when nothing is active.
    pub identity: Option<DeviceIdentity>,
    pub state: Connection,
    /// Last message reported by the control client (e.g. why it is offline).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActiveDeviceChange {
    pub fn idle() -> Self {
        Self {
            identity: None,
            state: Connection::Idle,
            message: None,
        }
    }
}

/// Events broadcast to presentation subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum SurfaceEvent {
    /// The ordered device list changed.
    DeviceListChanged(Vec<DeviceView>),
    /// The active device or its connection state changed.
    ActiveDeviceChanged(ActiveDeviceChange),
    /// The active device reported a playback change.
    PlaybackChanged(PlaybackEvent),
}
