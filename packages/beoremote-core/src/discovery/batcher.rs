//! Batching of raw discovery events.
//!
//! DNS-SD browsers report a single network change as a burst of found/removed
//! callbacks, flagging every callback but the last with `more_coming`. The
//! batcher holds those events back until the burst ends so the registry (and
//! the surface rendering it) never observes a half-applied change.

use crate::device::{DeviceIdentity, PendingUpdate};

/// A found/removed callback as reported by the discovery transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDiscoveryEvent {
    Found {
        identity: DeviceIdentity,
        display_name: String,
        more_coming: bool,
    },
    Removed {
        identity: DeviceIdentity,
        more_coming: bool,
    },
}

impl RawDiscoveryEvent {
    pub fn more_coming(&self) -> bool {
        match self {
            Self::Found { more_coming, .. } | Self::Removed { more_coming, .. } => *more_coming,
        }
    }
}

/// Accumulates pending updates until the transport signals the end of a burst.
#[derive(Debug, Default)]
pub struct DiscoveryBatcher {
    pending: Vec<PendingUpdate>,
}

impl DiscoveryBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an event; returns the complete batch once `more_coming` is false.
    pub fn push(&mut self, event: RawDiscoveryEvent) -> Option<Vec<PendingUpdate>> {
        let more_coming = event.more_coming();
        let update = match event {
            RawDiscoveryEvent::Found {
                identity,
                display_name,
                ..
            } => PendingUpdate::Add {
                identity,
                display_name,
            },
            RawDiscoveryEvent::Removed { identity, .. } => PendingUpdate::Remove { identity },
        };
        self.pending.push(update);

        if more_coming {
            return None;
        }

        log::debug!("[Batcher] Flushing {} pending update(s)", self.pending.len());
        Some(std::mem::take(&mut self.pending))
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
