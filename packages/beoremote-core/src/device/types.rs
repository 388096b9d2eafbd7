//! Device record types shared by the registry, coordinator and surfaces.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable key for a discovered device.
///
/// Derived from the advertised DNS-SD instance name. Two discovery events with
/// the same identity always refer to the same registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    /// Creates an identity from an advertised instance name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceIdentity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for DeviceIdentity {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A resolved network endpoint (host name or IP literal, plus port).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host name or IP address.
    pub host: String,
    /// TCP port advertised in the SRV record.
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            // Bare IPv6 literal
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Address resolution progress for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    #[default]
    Unresolved,
    Resolving,
    Resolved,
}

/// Control-connection state for a device.
///
/// At most one device in the registry is ever in a state other than `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Connection {
    #[default]
    Idle,
    Connecting,
    Connected,
}

impl Connection {
    /// Returns true for `Connecting` and `Connected`.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// A known device and its resolution/connection state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub identity: DeviceIdentity,
    pub display_name: String,
    /// Present only once resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
    pub resolution: Resolution,
    pub connection: Connection,
    /// Insertion sequence number, used to break display-name ties.
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl Device {
    pub(crate) fn new(identity: DeviceIdentity, display_name: String, seq: u64) -> Self {
        Self {
            identity,
            display_name,
            endpoint: None,
            resolution: Resolution::Unresolved,
            connection: Connection::Idle,
            seq,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution == Resolution::Resolved
    }

    pub fn is_active(&self) -> bool {
        self.connection.is_active()
    }
}

/// Kind of change carried by a [`PendingUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    Add,
    Remove,
}

/// A single discovery change, queued until its batch is flushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingUpdate {
    /// A device appeared on the network.
    Add {
        identity: DeviceIdentity,
        display_name: String,
    },
    /// A device left the network.
    Remove { identity: DeviceIdentity },
}

impl PendingUpdate {
    pub fn action(&self) -> UpdateAction {
        match self {
            Self::Add { .. } => UpdateAction::Add,
            Self::Remove { .. } => UpdateAction::Remove,
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        match self {
            Self::Add { identity, .. } | Self::Remove { identity } => identity,
        }
    }
}
