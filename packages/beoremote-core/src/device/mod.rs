//! Device model and registry.

mod registry;
mod types;

pub use registry::{DeviceRegistry, ResolveOutcome};
pub use types::{
    Connection, Device, DeviceIdentity, Endpoint, PendingUpdate, Resolution, UpdateAction,
};
