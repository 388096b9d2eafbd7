//! mDNS/DNS-SD transport for BeoRemote devices.
//!
//! [`MdnsDiscovery`] keeps a long-running browse of the configured service
//! type and turns `mdns-sd` events into coordinator inputs.
//! [`MdnsResolver`] implements [`Resolver`] on top of the records that the
//! same browse produces.
//!
//! # Key Design Points
//!
//! - `mdns-sd` has no "more coming" flag. The browse task drains every event
//!   already queued on the channel and flags all discovery events of that
//!   burst except the last one, so the batcher sees one batch per burst.
//! - `mdns-sd` resolves on its own as part of browsing. The resolver therefore
//!   caches every resolved record and only decides which of them are reported,
//!   based on which identities currently have an attempt running.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use mdns_sd::{ResolvedService, ScopedIp, ServiceDaemon, ServiceEvent};
use tokio_util::sync::CancellationToken;

use super::{DiscoveryError, DiscoveryResult};
use crate::device::{DeviceIdentity, Endpoint};
use crate::error::RemoteResult;
use crate::resolver::Resolver;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::CoordinatorHandle;

/// Creates a new mDNS service daemon.
///
/// The daemon spawns a background thread for mDNS operations and should be
/// shared for the lifetime of the process.
pub fn create_daemon() -> DiscoveryResult<ServiceDaemon> {
    ServiceDaemon::new().map_err(|e| DiscoveryError::MdnsDaemon(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Browse transport
// ─────────────────────────────────────────────────────────────────────────────

/// Long-running browse that feeds found/removed events to the coordinator.
pub struct MdnsDiscovery {
    daemon: Arc<ServiceDaemon>,
    service_type: String,
    handle: CoordinatorHandle,
    resolver: Arc<MdnsResolver>,
}

impl MdnsDiscovery {
    pub fn new(
        daemon: Arc<ServiceDaemon>,
        service_type: impl Into<String>,
        handle: CoordinatorHandle,
        resolver: Arc<MdnsResolver>,
    ) -> Self {
        Self {
            daemon,
            service_type: service_type.into(),
            handle,
            resolver,
        }
    }

    /// Starts browsing and spawns the event loop.
    pub fn start(&self, spawner: &TokioSpawner, cancel: CancellationToken) -> DiscoveryResult<()> {
        let receiver = self
            .daemon
            .browse(&self.service_type)
            .map_err(|e| DiscoveryError::Browse {
                service_type: self.service_type.clone(),
                reason: e.to_string(),
            })?;
        log::info!("[mDNS] Browsing for {}", self.service_type);

        let service_type = self.service_type.clone();
        let handle = self.handle.clone();
        let resolver = Arc::clone(&self.resolver);

        spawner.spawn(async move {
            loop {
                let first = tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = receiver.recv_async() => match event {
                        Ok(event) => event,
                        Err(e) => {
                            log::debug!("[mDNS] Browse channel closed: {:?}", e);
                            break;
                        }
                    },
                };

                let mut burst = vec![first];
                while let Ok(event) = receiver.try_recv() {
                    burst.push(event);
                }

                if dispatch_burst(burst, &service_type, &handle, &resolver).is_err() {
                    log::debug!("[mDNS] Coordinator stopped, ending browse loop");
                    break;
                }
            }
            log::debug!("[mDNS] Browse loop exited");
        });

        Ok(())
    }

    /// Stops browsing and shuts the daemon down.
    pub fn shutdown(&self) {
        if let Err(e) = self.daemon.stop_browse(&self.service_type) {
            log::warn!("[mDNS] Failed to stop browse: {:?}", e);
        }
        if let Err(e) = self.daemon.shutdown() {
            log::warn!("[mDNS] Failed to shut down daemon: {:?}", e);
        }
    }
}

/// Forwards one drained burst of browse events.
///
/// Every found/removed event except the last one in the burst carries
/// `more_coming = true`.
fn dispatch_burst(
    burst: Vec<ServiceEvent>,
    service_type: &str,
    handle: &CoordinatorHandle,
    resolver: &MdnsResolver,
) -> RemoteResult<()> {
    let last_discovery = burst.iter().rposition(|event| {
        matches!(
            event,
            ServiceEvent::ServiceFound(..) | ServiceEvent::ServiceRemoved(..)
        )
    });

    for (index, event) in burst.into_iter().enumerate() {
        let more_coming = last_discovery.is_some_and(|last| index < last);
        match event {
            ServiceEvent::ServiceFound(_, fullname) => {
                let name = instance_name(&fullname, service_type);
                log::debug!("[mDNS] Found {:?} (more coming: {})", name, more_coming);
                handle.found(DeviceIdentity::new(name.clone()), name, more_coming)?;
            }
            ServiceEvent::ServiceRemoved(_, fullname) => {
                let identity = DeviceIdentity::new(instance_name(&fullname, service_type));
                log::debug!("[mDNS] Removed {} (more coming: {})", identity, more_coming);
                resolver.forget(&identity);
                handle.removed(identity, more_coming)?;
            }
            ServiceEvent::ServiceResolved(info) => {
                let identity = DeviceIdentity::new(instance_name(&info.fullname, service_type));
                match endpoint_from(&info) {
                    Some(endpoint) => resolver.record_resolved(identity, endpoint)?,
                    None => log::debug!("[mDNS] {} resolved without a usable address", identity),
                }
            }
            other => log::trace!("[mDNS] {:?}", other),
        }
    }
    Ok(())
}

/// Instance name of a DNS-SD full name (`Kitchen._beoremote._tcp.local.` →
/// `Kitchen`). Names that do not carry the suffix are returned unchanged.
fn instance_name(fullname: &str, service_type: &str) -> String {
    fullname
        .strip_suffix(service_type)
        .map(|rest| rest.trim_end_matches('.'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(fullname)
        .to_string()
}

/// Connectable endpoint of a resolved record, preferring IPv4.
fn endpoint_from(info: &ResolvedService) -> Option<Endpoint> {
    let ipv4 = info.addresses.iter().find_map(|addr| match addr {
        ScopedIp::V4(v4) => Some(v4.addr().to_string()),
        _ => None,
    });
    let host = ipv4.or_else(|| endpoint_host(&info.host))?;
    Some(Endpoint::new(host, info.port))
}

fn endpoint_host(host: &str) -> Option<String> {
    let host = host.trim_end_matches('.');
    (!host.is_empty()).then(|| host.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

/// [`Resolver`] backed by the records of the running browse.
///
/// `resolve` marks an identity as wanted and immediately replays a cached
/// record if one exists; records arriving later are reported while the
/// identity is still wanted. A finite timeout withdraws the want and reports
/// `ResolveEnded`, unless `stop` or a newer `resolve` got there first.
pub struct MdnsResolver {
    handle: CoordinatorHandle,
    spawner: TokioSpawner,
    records: DashMap<DeviceIdentity, Endpoint>,
    /// Wanted identities, mapped to the id of their current attempt.
    attempts: Arc<DashMap<DeviceIdentity, u64>>,
    next_attempt: AtomicU64,
}

impl MdnsResolver {
    pub fn new(handle: CoordinatorHandle, spawner: TokioSpawner) -> Self {
        Self {
            handle,
            spawner,
            records: DashMap::new(),
            attempts: Arc::new(DashMap::new()),
            next_attempt: AtomicU64::new(0),
        }
    }

    /// Caches a resolved record and reports it if an attempt is running.
    pub fn record_resolved(
        &self,
        identity: DeviceIdentity,
        endpoint: Endpoint,
    ) -> RemoteResult<()> {
        log::trace!("[mDNS] Record for {} at {}", identity, endpoint);
        self.records.insert(identity.clone(), endpoint.clone());
        if self.attempts.contains_key(&identity) {
            self.handle.resolved(identity, endpoint)?;
        }
        Ok(())
    }

    /// Drops the cached record of a device that left the network.
    pub fn forget(&self, identity: &DeviceIdentity) {
        self.records.remove(identity);
    }

    pub fn is_resolving(&self, identity: &DeviceIdentity) -> bool {
        self.attempts.contains_key(identity)
    }
}

impl Resolver for MdnsResolver {
    fn resolve(&self, identity: &DeviceIdentity, timeout: Option<Duration>) {
        let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
        self.attempts.insert(identity.clone(), attempt);

        let cached = self.records.get(identity).map(|entry| entry.value().clone());
        if let Some(endpoint) = cached {
            if self.handle.resolved(identity.clone(), endpoint).is_err() {
                return;
            }
        }

        let Some(timeout) = timeout else {
            return;
        };
        let attempts = Arc::clone(&self.attempts);
        let handle = self.handle.clone();
        let identity = identity.clone();
        self.spawner.spawn(async move {
            tokio::time::sleep(timeout).await;
            if attempts
                .remove_if(&identity, |_, current| *current == attempt)
                .is_some()
            {
                log::debug!("[mDNS] Resolve attempt for {} timed out", identity);
                let _ = handle.resolve_ended(identity);
            }
        });
    }

    fn stop(&self, identity: &DeviceIdentity) {
        self.attempts.remove(identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolveEvent;
    use crate::services::CoordinatorInput;
    use tokio::sync::mpsc;

    const SERVICE: &str = "_beoremote._tcp.local.";

    fn found(name: &str) -> ServiceEvent {
        ServiceEvent::ServiceFound(SERVICE.to_string(), format!("{}.{}", name, SERVICE))
    }

    fn removed(name: &str) -> ServiceEvent {
        ServiceEvent::ServiceRemoved(SERVICE.to_string(), format!("{}.{}", name, SERVICE))
    }

    fn discovery_flags(rx: &mut mpsc::UnboundedReceiver<CoordinatorInput>) -> Vec<(String, bool)> {
        let mut flags = Vec::new();
        while let Ok(input) = rx.try_recv() {
            if let CoordinatorInput::Discovery(event) = input {
                let name = match &event {
                    crate::discovery::RawDiscoveryEvent::Found { identity, .. }
                    | crate::discovery::RawDiscoveryEvent::Removed { identity, .. } => {
                        identity.to_string()
                    }
                };
                flags.push((name, event.more_coming()));
            }
        }
        flags
    }

    fn resolve_events(rx: &mut mpsc::UnboundedReceiver<CoordinatorInput>) -> Vec<ResolveEvent> {
        let mut events = Vec::new();
        while let Ok(input) = rx.try_recv() {
            if let CoordinatorInput::Resolve(event) = input {
                events.push(event);
            }
        }
        events
    }

    #[test]
    fn instance_name_strips_service_suffix() {
        assert_eq!(
            instance_name("Living Room._beoremote._tcp.local.", SERVICE),
            "Living Room"
        );
        assert_eq!(instance_name("Kitchen", SERVICE), "Kitchen");
        assert_eq!(instance_name(SERVICE, SERVICE), SERVICE);
    }

    #[test]
    fn endpoint_host_trims_trailing_dot() {
        assert_eq!(
            endpoint_host("beosound.local."),
            Some("beosound.local".to_string())
        );
        assert_eq!(endpoint_host(""), None);
        assert_eq!(endpoint_host("."), None);
    }

    #[tokio::test]
    async fn burst_flags_all_but_last_discovery_event() {
        let (handle, mut rx) = CoordinatorHandle::channel();
        let resolver = MdnsResolver::new(handle.clone(), TokioSpawner::current());

        dispatch_burst(
            vec![
                found("A"),
                ServiceEvent::SearchStarted(SERVICE.to_string()),
                removed("B"),
                found("C"),
                ServiceEvent::SearchStarted(SERVICE.to_string()),
            ],
            SERVICE,
            &handle,
            &resolver,
        )
        .unwrap();

        assert_eq!(
            discovery_flags(&mut rx),
            vec![
                ("A".to_string(), true),
                ("B".to_string(), true),
                ("C".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn single_event_burst_is_complete() {
        let (handle, mut rx) = CoordinatorHandle::channel();
        let resolver = MdnsResolver::new(handle.clone(), TokioSpawner::current());

        dispatch_burst(vec![found("Den")], SERVICE, &handle, &resolver).unwrap();
        assert_eq!(discovery_flags(&mut rx), vec![("Den".to_string(), false)]);
    }

    #[tokio::test]
    async fn records_are_reported_only_while_wanted() {
        let (handle, mut rx) = CoordinatorHandle::channel();
        let resolver = MdnsResolver::new(handle, TokioSpawner::current());
        let den = DeviceIdentity::new("Den");
        let endpoint = Endpoint::new("10.0.0.5", 8080);

        resolver
            .record_resolved(den.clone(), endpoint.clone())
            .unwrap();
        assert!(resolve_events(&mut rx).is_empty());

        resolver.resolve(&den, None);
        assert_eq!(
            resolve_events(&mut rx),
            vec![ResolveEvent::Resolved {
                identity: den.clone(),
                endpoint: endpoint.clone(),
            }]
        );

        resolver
            .record_resolved(den.clone(), endpoint.clone())
            .unwrap();
        assert_eq!(resolve_events(&mut rx).len(), 1);

        resolver.stop(&den);
        resolver.record_resolved(den.clone(), endpoint).unwrap();
        assert!(resolve_events(&mut rx).is_empty());
        assert!(!resolver.is_resolving(&den));
    }

    #[tokio::test]
    async fn forgotten_records_are_not_replayed() {
        let (handle, mut rx) = CoordinatorHandle::channel();
        let resolver = MdnsResolver::new(handle, TokioSpawner::current());
        let den = DeviceIdentity::new("Den");

        resolver
            .record_resolved(den.clone(), Endpoint::new("10.0.0.5", 8080))
            .unwrap();
        resolver.forget(&den);
        resolver.resolve(&den, None);

        assert!(resolve_events(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn finite_attempt_reports_ended_on_timeout() {
        let (handle, mut rx) = CoordinatorHandle::channel();
        let resolver = MdnsResolver::new(handle, TokioSpawner::current());
        let den = DeviceIdentity::new("Den");

        resolver.resolve(&den, Some(Duration::from_secs(5)));
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(
            resolve_events(&mut rx),
            vec![ResolveEvent::Ended {
                identity: den.clone()
            }]
        );
        assert!(!resolver.is_resolving(&den));
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_or_stopped_attempts_do_not_end() {
        let (handle, mut rx) = CoordinatorHandle::channel();
        let resolver = MdnsResolver::new(handle, TokioSpawner::current());
        let den = DeviceIdentity::new("Den");
        let attic = DeviceIdentity::new("Attic");

        resolver.resolve(&den, Some(Duration::from_secs(5)));
        tokio::time::sleep(Duration::from_secs(3)).await;
        resolver.stop(&den);
        resolver.resolve(&den, Some(Duration::from_secs(5)));

        resolver.resolve(&attic, Some(Duration::from_secs(5)));
        resolver.stop(&attic);

        // First attempt's timer fires at t=5 and must not end the second one.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(resolve_events(&mut rx).is_empty());
        assert!(resolver.is_resolving(&den));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(
            resolve_events(&mut rx),
            vec![ResolveEvent::Ended { identity: den }]
        );
    }
}
