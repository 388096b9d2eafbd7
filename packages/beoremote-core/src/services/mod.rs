//! Coordinator state machine, its serialized execution context and the
//! watchdog that feeds it.

mod coordinator;
mod coordinator_service;
mod watchdog;

pub use coordinator::{ConnectError, Coordinator, CoordinatorDeps, CoordinatorSettings};
pub use coordinator_service::{
    run_coordinator, Command, CoordinatorHandle, CoordinatorInput, CoordinatorService,
};
pub use watchdog::Watchdog;
