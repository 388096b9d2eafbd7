//! Serialized execution context for the coordinator.
//!
//! Every producer (mDNS browse task, resolver, control client, watchdog and
//! user commands) talks to the coordinator through a cloneable
//! [`CoordinatorHandle`]. Inputs are queued on one channel and applied one at
//! a time by [`run_coordinator`], so no two mutations ever interleave.

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::coordinator::{ConnectError, Coordinator};
use crate::device::{Device, DeviceIdentity, Endpoint};
use crate::discovery::RawDiscoveryEvent;
use crate::error::{RemoteError, RemoteResult};
use crate::notifications::DeviceNotification;
use crate::resolver::ResolveEvent;
use crate::runtime::{TaskSpawner, TokioSpawner};

/// User-initiated requests.
#[derive(Debug)]
pub enum Command {
    /// Connect a device. The outcome is sent on `reply` when present.
    Connect {
        identity: DeviceIdentity,
        reply: Option<oneshot::Sender<Result<(), ConnectError>>>,
    },
    Disconnect,
    Skip(i64),
    ConnectDefault,
    /// Stores a new default device name and tries to connect it.
    SetDefault(String),
}

/// Everything that can enter the serialized context.
#[derive(Debug)]
pub enum CoordinatorInput {
    Discovery(RawDiscoveryEvent),
    Resolve(ResolveEvent),
    Notification(DeviceNotification),
    Command(Command),
    WatchdogTick,
    Snapshot(oneshot::Sender<Vec<Device>>),
}

/// Cloneable sender into the coordinator's input queue.
///
/// The queue is unbounded: producers include callbacks that fire from inside
/// the coordinator's own collaborators, and a bounded queue could deadlock on
/// itself. Every send fails with [`RemoteError::CoordinatorStopped`] once the
/// loop has exited.
#[derive(Clone, Debug)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<CoordinatorInput>,
}

impl CoordinatorHandle {
    /// Creates a handle and the receiving end of its queue.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CoordinatorInput>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, input: CoordinatorInput) -> RemoteResult<()> {
        self.tx
            .send(input)
            .map_err(|_| RemoteError::CoordinatorStopped)
    }

    pub fn found(
        &self,
        identity: DeviceIdentity,
        display_name: impl Into<String>,
        more_coming: bool,
    ) -> RemoteResult<()> {
        self.send(CoordinatorInput::Discovery(RawDiscoveryEvent::Found {
            identity,
            display_name: display_name.into(),
            more_coming,
        }))
    }

    pub fn removed(&self, identity: DeviceIdentity, more_coming: bool) -> RemoteResult<()> {
        self.send(CoordinatorInput::Discovery(RawDiscoveryEvent::Removed {
            identity,
            more_coming,
        }))
    }

    pub fn resolved(&self, identity: DeviceIdentity, endpoint: Endpoint) -> RemoteResult<()> {
        self.send(CoordinatorInput::Resolve(ResolveEvent::Resolved {
            identity,
            endpoint,
        }))
    }

    pub fn resolve_ended(&self, identity: DeviceIdentity) -> RemoteResult<()> {
        self.send(CoordinatorInput::Resolve(ResolveEvent::Ended { identity }))
    }

    pub fn notify(&self, notification: DeviceNotification) -> RemoteResult<()> {
        self.send(CoordinatorInput::Notification(notification))
    }

    pub fn watchdog_tick(&self) -> RemoteResult<()> {
        self.send(CoordinatorInput::WatchdogTick)
    }

    /// Connects a device and waits for the coordinator's verdict.
    pub async fn connect(&self, identity: DeviceIdentity) -> RemoteResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(CoordinatorInput::Command(Command::Connect {
            identity,
            reply: Some(reply),
        }))?;
        rx.await.map_err(|_| RemoteError::CoordinatorStopped)??;
        Ok(())
    }

    pub fn disconnect(&self) -> RemoteResult<()> {
        self.send(CoordinatorInput::Command(Command::Disconnect))
    }

    pub fn skip(&self, n: i64) -> RemoteResult<()> {
        self.send(CoordinatorInput::Command(Command::Skip(n)))
    }

    pub fn connect_default(&self) -> RemoteResult<()> {
        self.send(CoordinatorInput::Command(Command::ConnectDefault))
    }

    pub fn set_default_device(&self, name: impl Into<String>) -> RemoteResult<()> {
        self.send(CoordinatorInput::Command(Command::SetDefault(name.into())))
    }

    /// Snapshot of the registry in display order.
    pub async fn devices(&self) -> RemoteResult<Vec<Device>> {
        let (reply, rx) = oneshot::channel();
        self.send(CoordinatorInput::Snapshot(reply))?;
        rx.await.map_err(|_| RemoteError::CoordinatorStopped)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Owns the coordinator until its loop is started.
pub struct CoordinatorService {
    handle: CoordinatorHandle,
    pending: Mutex<Option<(Coordinator, mpsc::UnboundedReceiver<CoordinatorInput>)>>,
    stopped: Mutex<Option<oneshot::Receiver<()>>>,
}

impl CoordinatorService {
    pub fn new(
        coordinator: Coordinator,
        handle: CoordinatorHandle,
        inputs: mpsc::UnboundedReceiver<CoordinatorInput>,
    ) -> Self {
        Self {
            handle,
            pending: Mutex::new(Some((coordinator, inputs))),
            stopped: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> CoordinatorHandle {
        self.handle.clone()
    }

    /// Spawns the coordinator loop. Only the first call has an effect.
    pub fn start(&self, spawner: &TokioSpawner, cancel: CancellationToken) {
        let Some((coordinator, inputs)) = self.pending.lock().take() else {
            log::warn!("[Coordinator] Loop already started");
            return;
        };

        let (done_tx, done_rx) = oneshot::channel();
        *self.stopped.lock() = Some(done_rx);

        spawner.spawn(async move {
            run_coordinator(coordinator, inputs, cancel).await;
            let _ = done_tx.send(());
        });
        log::info!("[Coordinator] Started");
    }

    /// Waits until the loop has torn down the active session and exited.
    pub async fn wait_stopped(&self) {
        let stopped = self.stopped.lock().take();
        if let Some(stopped) = stopped {
            let _ = stopped.await;
        }
    }
}

/// Applies inputs one at a time until cancelled or every handle is dropped.
///
/// The active session is disconnected before the loop returns.
pub async fn run_coordinator(
    mut coordinator: Coordinator,
    mut inputs: mpsc::UnboundedReceiver<CoordinatorInput>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                log::debug!("[Coordinator] Shutting down");
                break;
            }
            input = inputs.recv() => {
                match input {
                    Some(input) => coordinator.handle(input),
                    None => {
                        log::debug!("[Coordinator] All handles dropped");
                        break;
                    }
                }
            }
        }
    }

    coordinator.shutdown();
    log::info!("[Coordinator] Stopped");
}
