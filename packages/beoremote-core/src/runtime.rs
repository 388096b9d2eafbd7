//! Task spawning abstraction.
//!
//! Background work (the coordinator loop, the watchdog, mDNS browsing,
//! resolve timeouts and reachability probes) is spawned through
//! [`TaskSpawner`] so that an embedding application can hand the core a
//! runtime handle of its choosing instead of relying on an ambient runtime.

use std::future::Future;

/// Spawns detached background tasks.
pub trait TaskSpawner: Send + Sync {
    /// Spawns `future`. The task is neither joined nor cancelled by the spawner;
    /// long-running tasks watch a cancellation token instead.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// [`TaskSpawner`] backed by a Tokio runtime handle.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Uses the handle of the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}
