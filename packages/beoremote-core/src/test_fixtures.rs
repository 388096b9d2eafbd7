//! Recording fakes for the coordinator's external collaborators.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::control::DeviceControlClient;
use crate::device::{DeviceIdentity, Endpoint};
use crate::events::{ActiveDeviceChange, DeviceView, PresentationSurface};
use crate::notifications::{PlaybackEvent, SessionId};
use crate::resolver::Resolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverCall {
    Resolve(DeviceIdentity, Option<Duration>),
    Stop(DeviceIdentity),
}

#[derive(Default)]
pub struct RecordingResolver {
    calls: Mutex<Vec<ResolverCall>>,
}

impl RecordingResolver {
    pub fn calls(&self) -> Vec<ResolverCall> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl Resolver for RecordingResolver {
    fn resolve(&self, identity: &DeviceIdentity, timeout: Option<Duration>) {
        self.calls
            .lock()
            .push(ResolverCall::Resolve(identity.clone(), timeout));
    }

    fn stop(&self, identity: &DeviceIdentity) {
        self.calls.lock().push(ResolverCall::Stop(identity.clone()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCall {
    SetEndpoint(Option<Endpoint>),
    StartEventStream,
    StopEventStream,
}

#[derive(Default)]
pub struct RecordingControlClient {
    calls: Mutex<Vec<ControlCall>>,
    sessions: AtomicU64,
}

impl RecordingControlClient {
    pub fn calls(&self) -> Vec<ControlCall> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Id handed out by the most recent `start_event_stream`.
    pub fn last_session(&self) -> Option<SessionId> {
        match self.sessions.load(Ordering::SeqCst) {
            0 => None,
            n => Some(SessionId(n)),
        }
    }
}

impl DeviceControlClient for RecordingControlClient {
    fn set_endpoint(&self, endpoint: Option<Endpoint>) {
        self.calls.lock().push(ControlCall::SetEndpoint(endpoint));
    }

    fn start_event_stream(&self) -> Option<SessionId> {
        self.calls.lock().push(ControlCall::StartEventStream);
        Some(SessionId(self.sessions.fetch_add(1, Ordering::SeqCst) + 1))
    }

    fn stop_event_stream(&self) {
        self.calls.lock().push(ControlCall::StopEventStream);
    }
}

#[derive(Default)]
pub struct RecordingSurface {
    lists: Mutex<Vec<Vec<DeviceView>>>,
    active: Mutex<Vec<ActiveDeviceChange>>,
    playback: Mutex<Vec<PlaybackEvent>>,
}

impl RecordingSurface {
    pub fn list_changes(&self) -> Vec<Vec<DeviceView>> {
        self.lists.lock().clone()
    }

    pub fn active_changes(&self) -> Vec<ActiveDeviceChange> {
        self.active.lock().clone()
    }

    pub fn playback_events(&self) -> Vec<PlaybackEvent> {
        self.playback.lock().clone()
    }
}

impl PresentationSurface for RecordingSurface {
    fn device_list_changed(&self, devices: Vec<DeviceView>) {
        self.lists.lock().push(devices);
    }

    fn active_device_changed(&self, change: ActiveDeviceChange) {
        self.active.lock().push(change);
    }

    fn playback_changed(&self, event: PlaybackEvent) {
        self.playback.lock().push(event);
    }
}
