//! Connection coordinator.
//!
//! [`Coordinator`] owns the device registry and the single active control
//! session. It is a plain synchronous state machine: every input is handled
//! to completion by [`Coordinator::handle`], and the caller guarantees that
//! inputs are applied one at a time (see
//! [`run_coordinator`](super::coordinator_service::run_coordinator)).
//!
//! At most one device is ever `Connecting` or `Connected`; [`connect`] tears
//! down the previous session before starting a new one.
//!
//! [`connect`]: Coordinator::connect

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::coordinator_service::{Command, CoordinatorInput};
use crate::config::Config;
use crate::control::DeviceControlClient;
use crate::device::{
    Connection, Device, DeviceIdentity, DeviceRegistry, PendingUpdate, Resolution, ResolveOutcome,
};
use crate::discovery::{DiscoveryBatcher, RawDiscoveryEvent};
use crate::events::{ActiveDeviceChange, DeviceView, PresentationSurface};
use crate::notifications::{DeviceNotification, LinkState, SessionId};
use crate::preferences::PreferenceStore;
use crate::resolver::{ResolveEvent, Resolver};

/// Reasons a connect request is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("no device named {0}")]
    NotFound(DeviceIdentity),

    #[error("device {0} has not been resolved yet")]
    NotResolved(DeviceIdentity),
}

/// External collaborators driven by the coordinator.
#[derive(Clone)]
pub struct CoordinatorDeps {
    pub resolver: Arc<dyn Resolver>,
    pub control: Arc<dyn DeviceControlClient>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub surface: Arc<dyn PresentationSurface>,
}

/// Coordinator policy knobs, derived from [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Duration passed to every resolve attempt (`None` = indefinite).
    pub resolve_timeout: Option<Duration>,
    /// Record every manual connection as the new default device.
    pub remember_last_connected: bool,
}

impl From<&Config> for CoordinatorSettings {
    fn from(config: &Config) -> Self {
        Self {
            resolve_timeout: config.resolve_timeout(),
            remember_last_connected: config.remember_last_connected,
        }
    }
}

/// Registry owner and single-active-device state machine.
pub struct Coordinator {
    registry: DeviceRegistry,
    batcher: DiscoveryBatcher,
    active: Option<DeviceIdentity>,
    active_session: Option<SessionId>,
    active_message: Option<String>,
    deps: CoordinatorDeps,
    settings: CoordinatorSettings,
}

impl Coordinator {
    pub fn new(deps: CoordinatorDeps, settings: CoordinatorSettings) -> Self {
        Self {
            registry: DeviceRegistry::new(),
            batcher: DiscoveryBatcher::new(),
            active: None,
            active_session: None,
            active_message: None,
            deps,
            settings,
        }
    }

    /// Applies one input to completion.
    pub fn handle(&mut self, input: CoordinatorInput) {
        match input {
            CoordinatorInput::Discovery(event) => self.on_discovery_event(event),
            CoordinatorInput::Resolve(event) => self.on_resolve_event(event),
            CoordinatorInput::Notification(notification) => self.on_notification(notification),
            CoordinatorInput::Command(command) => self.on_command(command),
            CoordinatorInput::WatchdogTick => self.on_watchdog_tick(),
            CoordinatorInput::Snapshot(reply) => {
                let _ = reply.send(self.devices());
            }
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect { identity, reply } => {
                let result = self.connect(&identity);
                if let Err(ref e) = result {
                    log::warn!("[Coordinator] Connect rejected: {}", e);
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            Command::Disconnect => self.disconnect(),
            Command::Skip(n) => self.skip(n),
            Command::ConnectDefault => self.connect_default_device(),
            Command::SetDefault(name) => {
                if let Err(e) = self.deps.preferences.set_default_device_name(&name) {
                    log::warn!("[Coordinator] Failed to store default device: {}", e);
                }
                self.connect_default_device();
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Discovery
    // ─────────────────────────────────────────────────────────────────────

    /// Queues a raw discovery event and applies the batch once it is complete.
    pub fn on_discovery_event(&mut self, event: RawDiscoveryEvent) {
        if let Some(batch) = self.batcher.push(event) {
            self.apply_batch(batch);
        }
    }

    /// Applies a complete batch in listed order, then renders once.
    pub fn apply_batch(&mut self, batch: Vec<PendingUpdate>) {
        let mut changed = false;
        let mut active_changed = false;
        let mut removed_any = false;

        for update in batch {
            match update {
                PendingUpdate::Add {
                    identity,
                    display_name,
                } => {
                    if !self.registry.insert(identity.clone(), display_name) {
                        log::debug!("[Registry] Ignoring duplicate add of {}", identity);
                        continue;
                    }
                    log::info!("[Registry] Discovered {}", identity);
                    changed = true;
                    self.request_resolution(&identity);
                }
                PendingUpdate::Remove { identity } => {
                    if !self.registry.contains(&identity) {
                        log::debug!("[Registry] Ignoring removal of unknown {}", identity);
                        continue;
                    }
                    if self.active.as_ref() == Some(&identity) && self.release_active() {
                        active_changed = true;
                    }
                    self.deps.resolver.stop(&identity);
                    self.registry.remove(&identity);
                    log::info!("[Registry] Removed {}", identity);
                    changed = true;
                    removed_any = true;
                }
            }
        }

        if changed {
            self.publish_device_list();
        }
        if active_changed {
            self.publish_active();
        }
        if removed_any {
            self.connect_default_device();
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────

    /// Restarts resolution for a device: stop any attempt, then resolve.
    fn request_resolution(&mut self, identity: &DeviceIdentity) {
        self.registry.set_resolution(identity, Resolution::Resolving);
        self.deps.resolver.stop(identity);
        self.deps
            .resolver
            .resolve(identity, self.settings.resolve_timeout);
    }

    pub fn on_resolve_event(&mut self, event: ResolveEvent) {
        log::trace!("[Coordinator] Resolve event for {}", event.identity());
        match event {
            ResolveEvent::Resolved { identity, endpoint } => {
                match self.registry.mark_resolved(&identity, endpoint.clone()) {
                    ResolveOutcome::Transitioned => {
                        log::info!("[Coordinator] Resolved {} at {}", identity, endpoint);
                        self.publish_device_list();
                        self.connect_default_device();
                    }
                    ResolveOutcome::AlreadyResolved => {
                        log::debug!(
                            "[Coordinator] Ignoring repeat resolution of {} ({})",
                            identity,
                            endpoint
                        );
                    }
                    ResolveOutcome::Unknown => {
                        log::debug!("[Coordinator] Ignoring resolution of unknown {}", identity);
                    }
                }
            }
            ResolveEvent::Ended { identity } => {
                let resolving = self
                    .registry
                    .find(&identity)
                    .is_some_and(|d| d.resolution == Resolution::Resolving);
                if resolving {
                    log::warn!(
                        "[Coordinator] Resolve of {} ended without a result; watchdog will retry",
                        identity
                    );
                    self.registry.set_resolution(&identity, Resolution::Unresolved);
                }
            }
        }
    }

    /// Re-kicks resolution for every device that has not resolved yet.
    pub fn on_watchdog_tick(&mut self) {
        let stalled = self.registry.unresolved_identities();
        if stalled.is_empty() {
            return;
        }
        log::debug!(
            "[Watchdog] Re-resolving {} unresolved device(s)",
            stalled.len()
        );
        for identity in stalled {
            self.request_resolution(&identity);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Connection
    // ─────────────────────────────────────────────────────────────────────

    /// Makes `identity` the active device.
    ///
    /// Connecting the already-active device is a no-op. `Connected` is only
    /// reached once the control client reports `Online`.
    pub fn connect(&mut self, identity: &DeviceIdentity) -> Result<(), ConnectError> {
        let device = self
            .registry
            .find(identity)
            .ok_or_else(|| ConnectError::NotFound(identity.clone()))?;
        let endpoint = match (&device.endpoint, device.is_resolved()) {
            (Some(endpoint), true) => endpoint.clone(),
            _ => return Err(ConnectError::NotResolved(identity.clone())),
        };
        let display_name = device.display_name.clone();

        if self.active.as_ref() == Some(identity) {
            log::debug!("[Coordinator] {} is already active", identity);
            return Ok(());
        }

        self.release_active();

        log::info!("[Coordinator] Connecting to {} at {}", identity, endpoint);
        self.registry.set_connection(identity, Connection::Connecting);
        self.active = Some(identity.clone());
        self.active_message = None;
        self.deps.control.set_endpoint(Some(endpoint));
        self.active_session = self.deps.control.start_event_stream();
        if self.active_session.is_none() {
            log::warn!("[Coordinator] Control client did not start a session for {}", identity);
        }

        if self.settings.remember_last_connected {
            self.remember_default(&display_name);
        }

        self.publish_device_list();
        self.publish_active();
        Ok(())
    }

    /// Tears down the active session. No-op if nothing is active.
    pub fn disconnect(&mut self) {
        if self.release_active() {
            self.publish_device_list();
            self.publish_active();
        }
    }

    /// Stops the control session without rendering. Returns whether anything
    /// was active.
    fn release_active(&mut self) -> bool {
        let Some(identity) = self.active.take() else {
            return false;
        };
        log::info!("[Coordinator] Disconnecting from {}", identity);
        self.deps.control.stop_event_stream();
        self.deps.control.set_endpoint(None);
        self.registry.set_connection(&identity, Connection::Idle);
        self.active_session = None;
        self.active_message = None;
        true
    }

    /// Connects the preferred device when nothing is active and exactly one
    /// resolved device carries the preferred name.
    pub fn connect_default_device(&mut self) {
        if self.active.is_some() {
            return;
        }
        let Some(name) = self.deps.preferences.default_device_name() else {
            return;
        };

        let candidates = self.registry.resolved_by_name(&name);
        match candidates.as_slice() {
            [device] => {
                let identity = device.identity.clone();
                log::info!("[Coordinator] Connecting default device {:?}", name);
                if let Err(e) = self.connect(&identity) {
                    log::warn!("[Coordinator] Default connect failed: {}", e);
                }
            }
            [] => log::debug!("[Coordinator] Default device {:?} not resolved yet", name),
            _ => log::warn!(
                "[Coordinator] {} resolved devices are named {:?}; not auto-connecting",
                candidates.len(),
                name
            ),
        }
    }

    /// Moves the active selection `n` places through the resolved devices.
    pub fn skip(&mut self, n: i64) {
        let resolved = self.registry.resolved();
        if resolved.len() < 2 {
            log::debug!("[Coordinator] Skip needs at least two resolved devices");
            return;
        }

        let current = self
            .active
            .as_ref()
            .and_then(|active| resolved.iter().position(|d| &d.identity == active))
            .unwrap_or(0);
        let target = skip_target(current, n, resolved.len());
        let identity = resolved[target].identity.clone();

        if let Err(e) = self.connect(&identity) {
            log::warn!("[Coordinator] Skip failed: {}", e);
        }
    }

    fn remember_default(&self, display_name: &str) {
        let preferences = &self.deps.preferences;
        if preferences.default_device_name().as_deref() == Some(display_name) {
            return;
        }
        if let Err(e) = preferences.set_default_device_name(display_name) {
            log::warn!("[Coordinator] Failed to remember {:?}: {}", display_name, e);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Control-client notifications
    // ─────────────────────────────────────────────────────────────────────

    /// Reconciles a control-client notification with the active device.
    ///
    /// Only notifications carrying the active session's id are applied. Any
    /// other id belongs to a session that has already been torn down, even
    /// when it came from the same endpoint.
    pub fn on_notification(&mut self, notification: DeviceNotification) {
        let Some(active) = self.active.clone() else {
            log::debug!("[Coordinator] Dropping notification with no active device");
            return;
        };
        if self.active_session != Some(notification.session()) {
            log::debug!(
                "[Coordinator] Dropping stale notification from session {} ({})",
                notification.session(),
                notification.endpoint()
            );
            return;
        }
        let Some(device) = self.registry.find(&active) else {
            return;
        };
        let current = device.connection;

        match notification {
            DeviceNotification::ConnectionState { state, message, .. } => {
                let connection = match state {
                    LinkState::Online => Connection::Connected,
                    LinkState::Connecting | LinkState::Offline => Connection::Connecting,
                };
                if state == LinkState::Offline {
                    log::warn!(
                        "[Coordinator] {} is offline: {}",
                        active,
                        message.as_deref().unwrap_or("no reason given")
                    );
                }
                if connection == current && message == self.active_message {
                    return;
                }

                self.registry.set_connection(&active, connection);
                self.active_message = message;
                if connection != current {
                    self.publish_device_list();
                }
                self.publish_active();
            }
            DeviceNotification::Playback { event, .. } => {
                self.deps.surface.playback_changed(event);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries & rendering
    // ─────────────────────────────────────────────────────────────────────

    /// Snapshot of every device in display order.
    pub fn devices(&self) -> Vec<Device> {
        self.registry.list()
    }

    pub fn active(&self) -> Option<&DeviceIdentity> {
        self.active.as_ref()
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active_session
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Tears down the active session before the coordinator is dropped.
    pub fn shutdown(&mut self) {
        self.disconnect();
    }

    fn publish_device_list(&self) {
        let views = self.registry.list().iter().map(DeviceView::from).collect();
        self.deps.surface.device_list_changed(views);
    }

    fn publish_active(&self) {
        let change = match &self.active {
            Some(identity) => ActiveDeviceChange {
                identity: Some(identity.clone()),
                state: self
                    .registry
                    .find(identity)
                    .map_or(Connection::Idle, |d| d.connection),
                message: self.active_message.clone(),
            },
            None => ActiveDeviceChange::idle(),
        };
        self.deps.surface.active_device_changed(change);
    }
}

/// Index reached by moving `n` places from `current` in a ring of `count`.
pub(crate) fn skip_target(current: usize, n: i64, count: usize) -> usize {
    (current as i128 + n as i128).rem_euclid(count as i128) as usize
}
