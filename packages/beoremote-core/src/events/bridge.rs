//! Bridge from the presentation surface trait to a broadcast channel.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::emitter::PresentationSurface;
use super::{ActiveDeviceChange, DeviceView, SurfaceEvent};
use crate::notifications::PlaybackEvent;

/// Publishes surface updates as [`SurfaceEvent`]s.
///
/// Any number of renderers subscribe to the channel. An optional external
/// surface receives the same updates directly, and may be installed after the
/// bridge has been handed to the coordinator.
#[derive(Clone)]
pub struct BroadcastSurfaceBridge {
    tx: broadcast::Sender<SurfaceEvent>,
    external_surface: Arc<RwLock<Option<Arc<dyn PresentationSurface>>>>,
}

impl BroadcastSurfaceBridge {
    /// Creates a new bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            external_surface: Arc::new(RwLock::new(None)),
        }
    }

    /// Installs a surface that receives every update in addition to subscribers.
    pub fn set_external_surface(&self, surface: Arc<dyn PresentationSurface>) {
        *self.external_surface.write() = Some(surface);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SurfaceEvent> {
        self.tx.subscribe()
    }

    fn send(&self, event: SurfaceEvent) {
        if let Err(e) = self.tx.send(event) {
            log::trace!("[SurfaceBridge] No subscribers: {}", e);
        }
    }
}

impl PresentationSurface for BroadcastSurfaceBridge {
    fn device_list_changed(&self, devices: Vec<DeviceView>) {
        if let Some(ref surface) = *self.external_surface.read() {
            surface.device_list_changed(devices.clone());
        }
        self.send(SurfaceEvent::DeviceListChanged(devices));
    }

    fn active_device_changed(&self, change: ActiveDeviceChange) {
        if let Some(ref surface) = *self.external_surface.read() {
            surface.active_device_changed(change.clone());
        }
        self.send(SurfaceEvent::ActiveDeviceChanged(change));
    }

    fn playback_changed(&self, event: PlaybackEvent) {
        if let Some(ref surface) = *self.external_surface.read() {
            surface.playback_changed(event.clone());
        }
        self.send(SurfaceEvent::PlaybackChanged(event));
    }
}
