//! Device discovery.
//!
//! - [`batcher`]: groups bursts of found/removed events into atomic batches
//! - [`mdns`]: DNS-SD browse transport and resolver on top of `mdns-sd`

pub mod batcher;
pub mod mdns;

use thiserror::Error;

pub use batcher::{DiscoveryBatcher, RawDiscoveryEvent};
pub use mdns::{create_daemon, MdnsDiscovery, MdnsResolver};

/// Errors raised by the mDNS transport.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("mDNS daemon error: {0}")]
    MdnsDaemon(String),

    #[error("failed to browse {service_type}: {reason}")]
    Browse {
        service_type: String,
        reason: String,
    },
}

/// Convenient Result alias for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
