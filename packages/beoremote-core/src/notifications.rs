//! Notification bus adapter.
//!
//! The device control client produces connection-state and playback
//! notifications on its own tasks. [`NotificationBus`] is the single point
//! where those notifications enter the core: each one is fanned out to any
//! observers and then re-dispatched into the coordinator's serialized context.

use std::fmt;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::device::Endpoint;
use crate::services::CoordinatorHandle;

/// Connection state reported by the control client's event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkState {
    Connecting,
    Online,
    Offline,
}

/// Transport state of the device's current source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    Play,
    Pause,
    Stop,
}

/// Playback-related notifications forwarded to the presentation surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// Volume level (0-100) and mute state changed.
    Volume { level: u8, muted: bool },
    /// The active source changed.
    #[serde(rename_all = "camelCase")]
    Source { id: String, source_type: String },
    /// Play/pause/stop state changed.
    Progress { state: PlaybackState },
    /// A radio station started playing.
    #[serde(rename_all = "camelCase")]
    NowPlayingRadio { station_id: String, name: String },
}

/// Identifies one run of a control client's event stream.
///
/// Every call to `start_event_stream` yields a fresh id, so a reconnect to the
/// same endpoint never shares an id with the session it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A notification from the control client, tagged with the session and
/// endpoint that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DeviceNotification {
    ConnectionState {
        session: SessionId,
        endpoint: Endpoint,
        state: LinkState,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Playback {
        session: SessionId,
        endpoint: Endpoint,
        event: PlaybackEvent,
    },
}

impl DeviceNotification {
    pub fn connection_state(
        session: SessionId,
        endpoint: Endpoint,
        state: LinkState,
        message: Option<String>,
    ) -> Self {
        Self::ConnectionState {
            session,
            endpoint,
            state,
            message,
        }
    }

    /// Session that produced the notification.
    pub fn session(&self) -> SessionId {
        match self {
            Self::ConnectionState { session, .. } | Self::Playback { session, .. } => *session,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        match self {
            Self::ConnectionState { endpoint, .. } | Self::Playback { endpoint, .. } => endpoint,
        }
    }
}

/// Entry point for externally produced device notifications.
#[derive(Clone)]
pub struct NotificationBus {
    handle: CoordinatorHandle,
    observers: broadcast::Sender<DeviceNotification>,
}

impl NotificationBus {
    pub fn new(handle: CoordinatorHandle, capacity: usize) -> Self {
        let (observers, _) = broadcast::channel(capacity);
        Self { handle, observers }
    }

    /// Publishes a notification to observers and to the coordinator.
    pub fn publish(&self, notification: DeviceNotification) {
        log::trace!("[NotificationBus] {:?}", notification);

        if self.observers.send(notification.clone()).is_err() {
            log::trace!("[NotificationBus] No observers subscribed");
        }
        if let Err(e) = self.handle.notify(notification) {
            log::debug!("[NotificationBus] Dropping notification: {}", e);
        }
    }

    /// Subscribes to every notification passing through the bus.
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceNotification> {
        self.observers.subscribe()
    }
}
