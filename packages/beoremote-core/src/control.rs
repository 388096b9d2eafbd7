//! Device control client contract and a reachability-probe implementation.
//!
//! The coordinator owns the single control session exclusively: only it calls
//! [`DeviceControlClient`] methods. Results come back asynchronously as
//! [`DeviceNotification`]s published on the [`NotificationBus`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::device::Endpoint;
use crate::notifications::{DeviceNotification, LinkState, NotificationBus, SessionId};
use crate::runtime::{TaskSpawner, TokioSpawner};

/// Session control for the active device.
///
/// Methods must not block; any I/O they start runs on background tasks.
pub trait DeviceControlClient: Send + Sync {
    /// Binds the client to an endpoint, or clears it with `None`.
    fn set_endpoint(&self, endpoint: Option<Endpoint>);

    /// Starts the event stream for the bound endpoint.
    ///
    /// Returns the id every notification of the new session will carry, or
    /// `None` when no endpoint is bound.
    fn start_event_stream(&self) -> Option<SessionId>;

    /// Stops the event stream. No-op if none is running.
    fn stop_event_stream(&self);
}

/// Timing for [`ProbeControlClient`].
#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings {
    pub interval: Duration,
    pub connect_timeout: Duration,
}

/// Control client that reports reachability of the bound endpoint.
///
/// While the event stream runs, the endpoint is probed with a TCP connect
/// every `interval`. `Connecting` is published once when the stream starts,
/// then `Online` or `Offline` whenever the probe result changes.
pub struct ProbeControlClient {
    bus: NotificationBus,
    spawner: TokioSpawner,
    settings: ProbeSettings,
    endpoint: Mutex<Option<Endpoint>>,
    session: Mutex<Option<CancellationToken>>,
    next_session: AtomicU64,
}

impl ProbeControlClient {
    pub fn new(bus: NotificationBus, spawner: TokioSpawner, settings: ProbeSettings) -> Self {
        Self {
            bus,
            spawner,
            settings,
            endpoint: Mutex::new(None),
            session: Mutex::new(None),
            next_session: AtomicU64::new(1),
        }
    }

    /// Returns true while a probe session is running.
    pub fn is_streaming(&self) -> bool {
        self.session.lock().is_some()
    }
}

impl DeviceControlClient for ProbeControlClient {
    fn set_endpoint(&self, endpoint: Option<Endpoint>) {
        *self.endpoint.lock() = endpoint;
    }

    fn start_event_stream(&self) -> Option<SessionId> {
        let Some(endpoint) = self.endpoint.lock().clone() else {
            log::warn!("[Probe] Event stream requested without an endpoint");
            return None;
        };
        let session = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));

        let token = CancellationToken::new();
        if let Some(previous) = self.session.lock().replace(token.clone()) {
            previous.cancel();
        }

        log::debug!("[Probe] Starting event stream {} for {}", session, endpoint);
        self.spawner.spawn(probe_loop(
            session,
            endpoint,
            self.bus.clone(),
            self.settings,
            token,
        ));
        Some(session)
    }

    fn stop_event_stream(&self) {
        if let Some(token) = self.session.lock().take() {
            token.cancel();
        }
    }
}

async fn probe_loop(
    session: SessionId,
    endpoint: Endpoint,
    bus: NotificationBus,
    settings: ProbeSettings,
    cancel: CancellationToken,
) {
    bus.publish(DeviceNotification::connection_state(
        session,
        endpoint.clone(),
        LinkState::Connecting,
        None,
    ));
    let mut last_state = LinkState::Connecting;

    loop {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = probe(&endpoint, settings.connect_timeout) => outcome,
        };

        let (state, message) = match outcome {
            Ok(()) => (LinkState::Online, None),
            Err(reason) => (LinkState::Offline, Some(reason)),
        };

        if state != last_state && !cancel.is_cancelled() {
            log::debug!("[Probe] {} is now {:?}", endpoint, state);
            bus.publish(DeviceNotification::connection_state(
                session,
                endpoint.clone(),
                state,
                message,
            ));
            last_state = state;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(settings.interval) => {}
        }
    }

    log::debug!("[Probe] Event stream for {} stopped", endpoint);
}

async fn probe(endpoint: &Endpoint, connect_timeout: Duration) -> Result<(), String> {
    let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
    match tokio::time::timeout(connect_timeout, connect).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!(
            "no response within {}ms",
            connect_timeout.as_millis()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::CoordinatorHandle;
    use tokio::net::TcpListener;
    use tokio::sync::broadcast;

    fn settings() -> ProbeSettings {
        ProbeSettings {
            interval: Duration::from_millis(50),
            connect_timeout: Duration::from_millis(500),
        }
    }

    async fn next_notification(
        rx: &mut broadcast::Receiver<DeviceNotification>,
    ) -> DeviceNotification {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for notification")
            .unwrap()
    }

    async fn next_state(
        rx: &mut broadcast::Receiver<DeviceNotification>,
    ) -> (LinkState, Option<String>) {
        match next_notification(rx).await {
            DeviceNotification::ConnectionState { state, message, .. } => (state, message),
            other => panic!("unexpected notification: {:?}", other),
        }
    }

    #[tokio::test]
    async fn reports_connecting_then_online_for_listening_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (handle, _inputs) = CoordinatorHandle::channel();
        let bus = NotificationBus::new(handle, 16);
        let mut rx = bus.subscribe();
        let client = ProbeControlClient::new(bus, TokioSpawner::current(), settings());

        client.set_endpoint(Some(Endpoint::new("127.0.0.1", port)));
        assert!(client.start_event_stream().is_some());
        assert!(client.is_streaming());

        assert_eq!(next_state(&mut rx).await.0, LinkState::Connecting);
        assert_eq!(next_state(&mut rx).await.0, LinkState::Online);

        client.stop_event_stream();
        assert!(!client.is_streaming());
    }

    #[tokio::test]
    async fn reports_offline_with_message_for_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (handle, _inputs) = CoordinatorHandle::channel();
        let bus = NotificationBus::new(handle, 16);
        let mut rx = bus.subscribe();
        let client = ProbeControlClient::new(bus, TokioSpawner::current(), settings());

        client.set_endpoint(Some(Endpoint::new("127.0.0.1", port)));
        client.start_event_stream();

        assert_eq!(next_state(&mut rx).await.0, LinkState::Connecting);
        let (state, message) = next_state(&mut rx).await;
        assert_eq!(state, LinkState::Offline);
        assert!(message.is_some());

        client.stop_event_stream();
    }

    #[test]
    fn start_without_endpoint_is_ignored() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (handle, _inputs) = CoordinatorHandle::channel();
        let bus = NotificationBus::new(handle, 4);
        let client = ProbeControlClient::new(
            bus,
            TokioSpawner::new(runtime.handle().clone()),
            settings(),
        );

        assert_eq!(client.start_event_stream(), None);
        assert!(!client.is_streaming());
    }

    #[tokio::test]
    async fn restarting_the_stream_issues_a_new_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (handle, _inputs) = CoordinatorHandle::channel();
        let bus = NotificationBus::new(handle, 16);
        let mut rx = bus.subscribe();
        let client = ProbeControlClient::new(bus, TokioSpawner::current(), settings());
        client.set_endpoint(Some(Endpoint::new("127.0.0.1", port)));

        let first = client.start_event_stream().unwrap();
        assert_eq!(next_notification(&mut rx).await.session(), first);
        client.stop_event_stream();

        let second = client.start_event_stream().unwrap();
        assert_ne!(first, second);
        loop {
            let notification = next_notification(&mut rx).await;
            if notification.session() == second {
                assert!(matches!(
                    notification,
                    DeviceNotification::ConnectionState {
                        state: LinkState::Connecting,
                        ..
                    }
                ));
                break;
            }
        }

        client.stop_event_stream();
    }
}
