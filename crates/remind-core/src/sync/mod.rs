//! Offline-tolerant reminder synchronization

mod alerts;
mod coordinator;
mod store;

#[cfg(test)]
mod tests;

pub use alerts::{AlertScheduler, TracingAlertScheduler};
pub use coordinator::{
    FlushReport, InboundOutcome, SnapshotReport, SyncCoordinator, SyncCoordinatorBuilder,
};
pub use store::{PendingLog, ReminderStore};
