//! Sync coordinator.
//!
//! Two tiers keep peers consistent:
//!
//! 1. Best effort per operation: every local mutation is appended to the
//!    pending log and a background flush sends it once, then removes it
//!    whatever the per-peer outcome.
//! 2. Authoritative reconciliation: on the primary every flush ends with a
//!    full snapshot, and snapshots are also pushed when a peer connects or
//!    asks for one, on foreground and on a timer. Snapshots are idempotent and
//!    carry the complete state, so they repair whatever tier 1 lost.
//!
//! Snapshots only flow primary to secondary. A secondary's flush sends its
//! per-entry messages and nothing else, and the primary ignores inbound full
//! lists, so a stale secondary can never overwrite the authoritative store.
//!
//! Flushes and snapshots run on one worker task so the log is drained in
//! FIFO order even when mutations arrive concurrently.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use super::{AlertScheduler, PendingLog, ReminderStore, TracingAlertScheduler};
use crate::codec::{MessageCodec, SyncMessage};
use crate::config::{DeviceRole, SyncSettings};
use crate::models::{OperationKind, PendingOperation, Reminder, ReminderId};
use crate::transport::{NodeInbox, PeerDelivery, Transport};
use crate::util::unix_millis_now;
use crate::{Error, Result};

/// What one snapshot push did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    pub reminders: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// What one flush did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// No transport had a reachable peer; the log was left untouched
    pub skipped_offline: bool,
    /// Entries sent and removed
    pub attempted: usize,
    /// Entries whose payload could not be decoded; removed without sending
    pub dropped: usize,
    /// Per-peer delivery failures across all entries
    pub failed_deliveries: usize,
    pub snapshot: Option<SnapshotReport>,
}

/// Result of applying one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    Upserted(ReminderId),
    Replaced { count: usize },
    Deleted { id: ReminderId, existed: bool },
    SnapshotRequested,
    /// Full list received by the primary; the local store was left as is
    SnapshotIgnored { count: usize },
}

enum SyncTask {
    Flush,
    Snapshot,
    Barrier(oneshot::Sender<()>),
    Shutdown,
}

struct SyncEngine {
    store: Arc<dyn ReminderStore>,
    log: Arc<dyn PendingLog>,
    transports: Vec<Arc<dyn Transport>>,
    codec: MessageCodec,
    role: DeviceRole,
    flush_lock: Mutex<()>,
}

impl SyncEngine {
    async fn any_peer_reachable(&self) -> bool {
        for transport in &self.transports {
            if transport.is_any_peer_reachable().await {
                return true;
            }
        }
        false
    }

    async fn send_all(&self, message: &SyncMessage) -> Vec<PeerDelivery> {
        let mut deliveries = Vec::new();
        for transport in &self.transports {
            for delivery in transport.send_to_all(message).await {
                if let Err(error) = &delivery.result {
                    tracing::warn!(
                        transport = transport.name(),
                        peer = %delivery.peer,
                        path = message.message_type().path(),
                        %error,
                        "Delivery failed"
                    );
                }
                deliveries.push(delivery);
            }
        }
        deliveries
    }

    fn message_for(&self, operation: &PendingOperation) -> Result<SyncMessage> {
        if operation.kind == OperationKind::Delete {
            return Ok(SyncMessage::Delete(operation.reminder_id));
        }
        let payload = operation.payload.as_deref().ok_or_else(|| {
            Error::InvalidInput(format!(
                "{} entry {} has no payload",
                operation.kind, operation.id
            ))
        })?;
        Ok(SyncMessage::Upsert(
            self.codec.decode_reminder(payload.as_bytes())?,
        ))
    }

    async fn flush_pending(&self) -> FlushReport {
        let _guard = self.flush_lock.lock().await;
        let mut report = FlushReport::default();

        if !self.any_peer_reachable().await {
            tracing::debug!("No reachable peers; pending operations stay queued");
            report.skipped_offline = true;
            return report;
        }

        let operations = match self.log.pending().await {
            Ok(operations) => operations,
            Err(error) => {
                tracing::error!(%error, "Failed to read pending operations");
                return report;
            }
        };

        for operation in operations {
            match self.message_for(&operation) {
                Ok(message) => {
                    let deliveries = self.send_all(&message).await;
                    report.failed_deliveries += deliveries.iter().filter(|d| !d.is_ok()).count();
                    report.attempted += 1;
                    tracing::debug!(
                        reminder_id = %operation.reminder_id,
                        kind = %operation.kind,
                        peers = deliveries.len(),
                        "Sent pending operation"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        operation_id = operation.id,
                        reminder_id = %operation.reminder_id,
                        %error,
                        "Dropping unreadable pending operation"
                    );
                    report.dropped += 1;
                }
            }

            if let Err(error) = self.log.remove(operation.id).await {
                tracing::error!(operation_id = operation.id, %error, "Failed to remove pending operation");
            }
        }

        report.snapshot = self.push_full_snapshot().await;
        tracing::info!(
            attempted = report.attempted,
            dropped = report.dropped,
            failed_deliveries = report.failed_deliveries,
            "Flushed pending operations"
        );
        report
    }

    async fn push_full_snapshot(&self) -> Option<SnapshotReport> {
        if !self.role.is_primary() {
            tracing::trace!(role = self.role.as_str(), "Only the primary pushes snapshots");
            return None;
        }
        let reminders = match self.store.get_all().await {
            Ok(reminders) => reminders,
            Err(error) => {
                tracing::error!(%error, "Failed to read reminders for snapshot");
                return Some(SnapshotReport::default());
            }
        };

        let count = reminders.len();
        let deliveries = self.send_all(&SyncMessage::ReplaceAll(reminders)).await;
        let delivered = deliveries.iter().filter(|d| d.is_ok()).count();
        let report = SnapshotReport {
            reminders: count,
            delivered,
            failed: deliveries.len() - delivered,
        };

        if delivered > 0 {
            if let Err(error) = self.store.record_snapshot_sent(unix_millis_now()).await {
                tracing::warn!(%error, "Failed to record snapshot push");
            }
        }
        tracing::debug!(
            reminders = report.reminders,
            delivered = report.delivered,
            failed = report.failed,
            "Pushed full snapshot"
        );
        Some(report)
    }

    async fn run(self: Arc<Self>, mut tasks: mpsc::UnboundedReceiver<SyncTask>) {
        while let Some(task) = tasks.recv().await {
            match task {
                SyncTask::Flush => {
                    self.flush_pending().await;
                }
                SyncTask::Snapshot => {
                    self.push_full_snapshot().await;
                }
                SyncTask::Barrier(done) => {
                    let _ = done.send(());
                }
                SyncTask::Shutdown => break,
            }
        }
        tracing::debug!("Sync worker stopped");
    }
}

/// Assembles a [`SyncCoordinator`]
pub struct SyncCoordinatorBuilder {
    store: Arc<dyn ReminderStore>,
    log: Arc<dyn PendingLog>,
    transports: Vec<Arc<dyn Transport>>,
    alerts: Arc<dyn AlertScheduler>,
    codec: MessageCodec,
    role: DeviceRole,
    settle_delay: Duration,
}

impl SyncCoordinatorBuilder {
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    #[must_use]
    pub fn alerts(mut self, alerts: Arc<dyn AlertScheduler>) -> Self {
        self.alerts = alerts;
        self
    }

    #[must_use]
    pub const fn codec(mut self, codec: MessageCodec) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub const fn role(mut self, role: DeviceRole) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub const fn settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Take role, wire version and settle delay from `settings`.
    #[must_use]
    pub fn settings(self, settings: &SyncSettings) -> Self {
        self.role(settings.role)
            .codec(MessageCodec::new(settings.wire_version))
            .settle_delay(settings.settle_delay())
    }

    /// Spawn the worker; must be called inside a Tokio runtime.
    pub fn start(self) -> SyncCoordinator {
        let engine = Arc::new(SyncEngine {
            store: self.store,
            log: self.log,
            transports: self.transports,
            codec: self.codec,
            role: self.role,
            flush_lock: Mutex::new(()),
        });
        let (tasks, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(Arc::clone(&engine).run(receiver));

        SyncCoordinator {
            engine,
            alerts: self.alerts,
            role: self.role,
            settle_delay: self.settle_delay,
            tasks,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }
}

/// Owns the pending log drain, snapshot pushes and inbound reconciliation
#[derive(Clone)]
pub struct SyncCoordinator {
    engine: Arc<SyncEngine>,
    alerts: Arc<dyn AlertScheduler>,
    role: DeviceRole,
    settle_delay: Duration,
    tasks: mpsc::UnboundedSender<SyncTask>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SyncCoordinator {
    pub fn builder(
        store: Arc<dyn ReminderStore>,
        log: Arc<dyn PendingLog>,
    ) -> SyncCoordinatorBuilder {
        SyncCoordinatorBuilder {
            store,
            log,
            transports: Vec::new(),
            alerts: Arc::new(TracingAlertScheduler),
            codec: MessageCodec::default(),
            role: DeviceRole::default(),
            settle_delay: Duration::ZERO,
        }
    }

    pub const fn role(&self) -> DeviceRole {
        self.role
    }

    fn submit(&self, task: SyncTask) {
        if self.tasks.send(task).is_err() {
            tracing::warn!("Sync worker is not running; task dropped");
        }
    }

    /// Record a local mutation and kick a background flush.
    ///
    /// Only persisting the log entry can fail; delivery problems never reach
    /// the caller.
    pub async fn schedule_mutation(
        &self,
        reminder: &Reminder,
        kind: OperationKind,
    ) -> Result<PendingOperation> {
        match kind {
            OperationKind::Delete => self.alerts.cancel(reminder.id),
            OperationKind::Create | OperationKind::Update => self.alerts.refresh(reminder),
        }
        self.enqueue(reminder.id, kind, Some(reminder)).await
    }

    async fn enqueue(
        &self,
        reminder_id: ReminderId,
        kind: OperationKind,
        reminder: Option<&Reminder>,
    ) -> Result<PendingOperation> {
        let payload = match reminder {
            Some(reminder) if kind.carries_payload() => {
                Some(self.engine.codec.encode_reminder(reminder)?)
            }
            _ => None,
        };

        let operation = self
            .engine
            .log
            .append(reminder_id, kind, payload.as_deref())
            .await?;
        tracing::debug!(reminder_id = %reminder_id, %kind, "Queued pending operation");
        self.submit(SyncTask::Flush);
        Ok(operation)
    }

    /// Drain the pending log now; on the primary, then push a full snapshot.
    pub async fn flush_pending(&self) -> FlushReport {
        self.engine.flush_pending().await
    }

    /// Send the complete local reminder list to every reachable peer.
    ///
    /// `None` on a secondary, which never pushes snapshots.
    pub async fn push_full_snapshot(&self) -> Option<SnapshotReport> {
        self.engine.push_full_snapshot().await
    }

    /// Queue a snapshot push on the worker.
    pub fn request_snapshot(&self) {
        self.submit(SyncTask::Snapshot);
    }

    /// Apply an inbound frame; decode and store failures are logged and dropped.
    pub async fn on_peer_message(&self, path: &str, body: &[u8]) {
        match self.handle_inbound(path, body).await {
            Ok(outcome) => tracing::debug!(%path, ?outcome, "Applied peer message"),
            Err(error) => tracing::warn!(%path, %error, "Dropped peer message"),
        }
    }

    /// Decode and apply an inbound frame, reporting failures to the caller.
    pub async fn handle_inbound(&self, path: &str, body: &[u8]) -> Result<InboundOutcome> {
        let message = self.engine.codec.decode(path, body)?;
        self.apply(message).await
    }

    /// Apply an already decoded message.
    pub async fn apply(&self, message: SyncMessage) -> Result<InboundOutcome> {
        match message {
            SyncMessage::Upsert(reminder) => {
                self.engine.store.insert_or_replace(&reminder).await?;
                self.alerts.refresh(&reminder);
                if self.role.is_primary() {
                    self.relay(reminder.id, OperationKind::Update, Some(&reminder))
                        .await;
                }
                Ok(InboundOutcome::Upserted(reminder.id))
            }
            SyncMessage::ReplaceAll(reminders) if self.role.is_primary() => {
                tracing::warn!(count = reminders.len(), "Ignoring full snapshot sent to the primary");
                Ok(InboundOutcome::SnapshotIgnored {
                    count: reminders.len(),
                })
            }
            SyncMessage::ReplaceAll(reminders) => self.replace_all(reminders).await,
            SyncMessage::Delete(id) => {
                let existed = self.engine.store.delete_by_id(id).await?;
                self.alerts.cancel(id);
                if self.role.is_primary() {
                    self.relay(id, OperationKind::Delete, None).await;
                }
                Ok(InboundOutcome::Deleted { id, existed })
            }
            SyncMessage::PeerConnected | SyncMessage::RequestFullSync => {
                self.request_snapshot();
                Ok(InboundOutcome::SnapshotRequested)
            }
        }
    }

    async fn replace_all(&self, reminders: Vec<Reminder>) -> Result<InboundOutcome> {
        let previous = self.engine.store.get_all().await?;
        self.engine.store.replace_all(&reminders).await?;

        let kept: HashSet<ReminderId> = reminders.iter().map(|reminder| reminder.id).collect();
        for gone in previous.iter().filter(|reminder| !kept.contains(&reminder.id)) {
            self.alerts.cancel(gone.id);
        }
        for reminder in &reminders {
            self.alerts.refresh(reminder);
        }

        if let Err(error) = self
            .engine
            .store
            .record_snapshot_received(unix_millis_now())
            .await
        {
            tracing::warn!(%error, "Failed to record snapshot receipt");
        }
        tracing::info!(count = reminders.len(), "Applied full snapshot");
        Ok(InboundOutcome::Replaced {
            count: reminders.len(),
        })
    }

    async fn relay(&self, reminder_id: ReminderId, kind: OperationKind, reminder: Option<&Reminder>) {
        if let Err(error) = self.enqueue(reminder_id, kind, reminder).await {
            tracing::warn!(reminder_id = %reminder_id, %kind, %error, "Failed to queue relay");
        }
    }

    /// Announce this device to its peers and ask for their state.
    pub async fn announce(&self) -> Vec<PeerDelivery> {
        let mut deliveries = self.engine.send_all(&SyncMessage::PeerConnected).await;
        deliveries.extend(self.engine.send_all(&SyncMessage::RequestFullSync).await);
        deliveries
    }

    /// Heal drift after the app returns to the foreground.
    ///
    /// Waits the settle delay so transports can reconnect, then flushes
    /// (which ends with a snapshot on the primary).
    pub fn on_foreground(&self) -> JoinHandle<()> {
        let tasks = self.tasks.clone();
        let delay = self.settle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tasks.send(SyncTask::Flush).is_err() {
                tracing::debug!("Sync worker gone before foreground flush");
            }
        })
    }

    /// Flush on a fixed interval until the coordinator shuts down.
    pub fn spawn_periodic_reconcile(&self, every: Duration) -> JoinHandle<()> {
        let tasks = self.tasks.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tasks.send(SyncTask::Flush).is_err() {
                    break;
                }
            }
        })
    }

    /// Feed a bus inbox into [`Self::on_peer_message`] until it closes.
    pub fn spawn_inbound_listener(&self, mut inbox: NodeInbox) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            while let Some(message) = inbox.recv().await {
                tracing::trace!(from = %message.from, path = %message.path, "Inbound frame");
                coordinator.on_peer_message(&message.path, &message.body).await;
            }
        })
    }

    /// Wait until every task queued so far has run.
    pub async fn drain(&self) {
        let (done, wait) = oneshot::channel();
        if self.tasks.send(SyncTask::Barrier(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Finish queued work and stop the worker.
    pub async fn shutdown(&self) {
        self.submit(SyncTask::Shutdown);
        if let Some(worker) = self.worker.lock().await.take() {
            if let Err(error) = worker.await {
                tracing::error!(%error, "Sync worker panicked");
            }
        }
    }
}
