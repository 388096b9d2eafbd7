//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root: the single place where the
//! mDNS transport, resolver, control client, coordinator and surface bridge
//! are instantiated and wired together. Nothing runs until
//! [`BootstrappedServices::start_background_tasks`] is called.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::control::{ProbeControlClient, ProbeSettings};
use crate::discovery::{create_daemon, MdnsDiscovery, MdnsResolver};
use crate::error::{RemoteError, RemoteResult};
use crate::events::BroadcastSurfaceBridge;
use crate::notifications::NotificationBus;
use crate::preferences::PreferenceStore;
use crate::runtime::TokioSpawner;
use crate::services::{
    Coordinator, CoordinatorDeps, CoordinatorHandle, CoordinatorService, CoordinatorSettings,
    Watchdog,
};

/// Container for all bootstrapped services.
pub struct BootstrappedServices {
    /// Sender into the coordinator's serialized context.
    pub handle: CoordinatorHandle,
    /// Entry point for control-client notifications; observers may subscribe.
    pub notification_bus: NotificationBus,
    /// Presentation surface fan-out.
    pub surface_bridge: Arc<BroadcastSurfaceBridge>,
    /// Default-device preference store shared with the coordinator.
    pub preferences: Arc<dyn PreferenceStore>,
    discovery: Arc<MdnsDiscovery>,
    coordinator: Arc<CoordinatorService>,
    watchdog_interval: Duration,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Starts the coordinator loop, the watchdog and the mDNS browse.
    ///
    /// The coordinator starts first so that no discovery event is lost.
    pub fn start_background_tasks(&self) -> RemoteResult<()> {
        self.coordinator
            .start(&self.spawner, self.cancel_token.child_token());

        Watchdog::new(self.watchdog_interval, self.handle.clone())
            .start(&self.spawner, self.cancel_token.child_token());

        self.discovery
            .start(&self.spawner, self.cancel_token.child_token())?;

        log::info!("[Bootstrap] Background tasks started");
        Ok(())
    }

    /// Initiates graceful shutdown of all services.
    ///
    /// The active control session is torn down before this returns.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        self.cancel_token.cancel();
        self.coordinator.wait_stopped().await;
        self.discovery.shutdown();

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps all services with their dependencies.
///
/// Wiring order:
///
/// 1. Coordinator input queue and cancellation token
/// 2. Surface bridge and notification bus
/// 3. mDNS daemon and resolver
/// 4. Reachability control client (publishes on the bus)
/// 5. Coordinator (owns resolver, control client, preferences, surface)
/// 6. Browse transport (feeds the coordinator and the resolver)
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the mDNS daemon cannot
/// be created.
pub fn bootstrap_services(
    config: &Config,
    preferences: Arc<dyn PreferenceStore>,
    spawner: TokioSpawner,
) -> RemoteResult<BootstrappedServices> {
    config.validate().map_err(RemoteError::Configuration)?;

    let cancel_token = CancellationToken::new();
    let (handle, inputs) = CoordinatorHandle::channel();

    let surface_bridge = Arc::new(BroadcastSurfaceBridge::new(config.event_channel_capacity));
    let notification_bus = NotificationBus::new(handle.clone(), config.event_channel_capacity);

    let daemon = Arc::new(create_daemon()?);
    let resolver = Arc::new(MdnsResolver::new(handle.clone(), spawner.clone()));

    let control = Arc::new(ProbeControlClient::new(
        notification_bus.clone(),
        spawner.clone(),
        ProbeSettings {
            interval: config.probe_interval(),
            connect_timeout: config.probe_timeout(),
        },
    ));

    let coordinator = Coordinator::new(
        CoordinatorDeps {
            resolver: resolver.clone(),
            control,
            preferences: Arc::clone(&preferences),
            surface: surface_bridge.clone(),
        },
        CoordinatorSettings::from(config),
    );
    let coordinator = Arc::new(CoordinatorService::new(coordinator, handle.clone(), inputs));

    let discovery = Arc::new(MdnsDiscovery::new(
        daemon,
        config.service_type.clone(),
        handle.clone(),
        resolver,
    ));

    log::info!(
        "[Bootstrap] Services wired (service type {}, resolve timeout {:?})",
        config.service_type,
        config.resolve_timeout()
    );

    Ok(BootstrappedServices {
        handle,
        notification_bus,
        surface_bridge,
        preferences,
        discovery,
        coordinator,
        watchdog_interval: config.watchdog_interval(),
        spawner,
        cancel_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::preferences::MemoryPreferenceStore;

    #[tokio::test]
    async fn invalid_config_is_rejected_before_wiring() {
        let config = Config {
            watchdog_interval_secs: 0,
            ..Default::default()
        };
        let result = bootstrap_services(
            &config,
            Arc::new(MemoryPreferenceStore::new(None)),
            TokioSpawner::current(),
        );

        match result {
            Err(e) => assert_eq!(e.code(), "configuration_error"),
            Ok(_) => panic!("expected configuration error"),
        }
    }
}
