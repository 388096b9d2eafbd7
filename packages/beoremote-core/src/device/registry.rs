//! Canonical set of known devices.
//!
//! The registry owns every [`Device`] record. Callers only ever receive
//! clones through [`DeviceRegistry::list`] and friends, so the ordering seen by
//! the presentation surface and by skip-navigation is always derived from the
//! backing map at call time.

use std::collections::HashMap;

use super::types::{Connection, Device, DeviceIdentity, Endpoint, Resolution};

/// Result of feeding a resolution record into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// First resolution: the device moved to `Resolved`.
    Transitioned,
    /// The device was already resolved; nothing changed.
    AlreadyResolved,
    /// No device with that identity is known.
    Unknown,
}

/// Deduplicated device set keyed by [`DeviceIdentity`].
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<DeviceIdentity, Device>,
    next_seq: u64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new device in the `Unresolved` state.
    ///
    /// Returns `false` (and changes nothing) if the identity is already known.
    pub fn insert(&mut self, identity: DeviceIdentity, display_name: impl Into<String>) -> bool {
        if self.devices.contains_key(&identity) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.devices
            .insert(identity.clone(), Device::new(identity, display_name.into(), seq));
        true
    }

    /// Removes a device, returning its final record.
    pub fn remove(&mut self, identity: &DeviceIdentity) -> Option<Device> {
        self.devices.remove(identity)
    }

    pub fn find(&self, identity: &DeviceIdentity) -> Option<&Device> {
        self.devices.get(identity)
    }

    pub fn contains(&self, identity: &DeviceIdentity) -> bool {
        self.devices.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// All devices ordered by display name (case-sensitive), ties by insertion order.
    pub fn list(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.values().cloned().collect();
        devices.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.seq.cmp(&b.seq))
        });
        devices
    }

    /// Resolved devices in [`list`](Self::list) order.
    pub fn resolved(&self) -> Vec<Device> {
        self.list().into_iter().filter(Device::is_resolved).collect()
    }

    /// Identities of every device that has not reached `Resolved`.
    pub fn unresolved_identities(&self) -> Vec<DeviceIdentity> {
        self.list()
            .into_iter()
            .filter(|d| !d.is_resolved())
            .map(|d| d.identity)
            .collect()
    }

    /// Resolved devices whose display name equals `name`.
    pub fn resolved_by_name(&self, name: &str) -> Vec<Device> {
        self.resolved()
            .into_iter()
            .filter(|d| d.display_name == name)
            .collect()
    }

    /// Number of devices currently `Connecting` or `Connected`.
    pub fn active_count(&self) -> usize {
        self.devices.values().filter(|d| d.is_active()).count()
    }

    pub(crate) fn set_resolution(&mut self, identity: &DeviceIdentity, resolution: Resolution) {
        if let Some(device) = self.devices.get_mut(identity) {
            device.resolution = resolution;
        }
    }

    pub(crate) fn set_connection(&mut self, identity: &DeviceIdentity, connection: Connection) {
        if let Some(device) = self.devices.get_mut(identity) {
            device.connection = connection;
        }
    }

    /// Records the first resolved endpoint for a device.
    ///
    /// The first resolution is authoritative: repeat records for an already
    /// resolved device are ignored even when the endpoint differs.
    pub(crate) fn mark_resolved(
        &mut self,
        identity: &DeviceIdentity,
        endpoint: Endpoint,
    ) -> ResolveOutcome {
        let Some(device) = self.devices.get_mut(identity) else {
            return ResolveOutcome::Unknown;
        };
        if device.is_resolved() {
            return ResolveOutcome::AlreadyResolved;
        }
        device.endpoint = Some(endpoint);
        device.resolution = Resolution::Resolved;
        ResolveOutcome::Transitioned
    }
}
