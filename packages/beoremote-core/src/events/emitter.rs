//! Presentation surface abstraction.
//!
//! The coordinator depends on the [`PresentationSurface`] trait rather than on
//! a concrete UI, so the same core drives a menu bar, a terminal or a test
//! recorder.

use super::{ActiveDeviceChange, DeviceView};
use crate::notifications::PlaybackEvent;

/// Consumer of the coordinator's read-only projection.
///
/// Implementations must return quickly; they are invoked from the
/// coordinator's serialized context.
pub trait PresentationSurface: Send + Sync {
    /// The ordered device list changed.
    fn device_list_changed(&self, devices: Vec<DeviceView>);

    /// The active device or its connection state changed.
    fn active_device_changed(&self, change: ActiveDeviceChange);

    /// The active device reported volume, source or progress changes.
    fn playback_changed(&self, event: PlaybackEvent);
}

/// No-op surface for headless runs and tests.
pub struct NoopSurface;

impl PresentationSurface for NoopSurface {
    fn device_list_changed(&self, _devices: Vec<DeviceView>) {}

    fn active_device_changed(&self, _change: ActiveDeviceChange) {}

    fn playback_changed(&self, _event: PlaybackEvent) {}
}

/// Logs every surface update.
pub struct LoggingSurface;

impl PresentationSurface for LoggingSurface {
    fn device_list_changed(&self, devices: Vec<DeviceView>) {
        let names: Vec<&str> = devices.iter().map(|d| d.display_name.as_str()).collect();
        tracing::info!(count = devices.len(), ?names, "device_list_changed");
    }

    fn active_device_changed(&self, change: ActiveDeviceChange) {
        tracing::info!(
            identity = ?change.identity,
            state = ?change.state,
            message = ?change.message,
            "active_device_changed"
        );
    }

    fn playback_changed(&self, event: PlaybackEvent) {
        tracing::debug!(?event, "playback_changed");
    }
}
