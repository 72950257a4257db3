use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use super::*;
use crate::codec::{MessageCodec, SyncMessage};
use crate::config::DeviceRole;
use crate::models::{NewReminder, OperationKind, Reminder, ReminderId};
use crate::services::DatabaseService;
use crate::transport::{
    InboundMessage, LocalMessageBus, NodeInbox, PeerDelivery, Transport, TransportError,
};
use crate::Error;

struct Device {
    db: DatabaseService,
    coordinator: SyncCoordinator,
    inbox: NodeInbox,
}

async fn device(bus: &LocalMessageBus, name: &str, role: DeviceRole) -> Device {
    let db = DatabaseService::open_in_memory().await.unwrap();
    let (endpoint, inbox) = bus.register(name, MessageCodec::default()).await;
    let coordinator = SyncCoordinator::builder(Arc::new(db.clone()), Arc::new(db.clone()))
        .transport(Arc::new(endpoint))
        .role(role)
        .start();
    Device {
        db,
        coordinator,
        inbox,
    }
}

/// Run queued work and deliver bus frames until nothing moves.
async fn settle(devices: &mut [&mut Device]) {
    for _ in 0..10 {
        for device in devices.iter() {
            device.coordinator.drain().await;
        }
        let mut delivered = 0;
        for device in devices.iter_mut() {
            while let Ok(message) = device.inbox.try_recv() {
                device
                    .coordinator
                    .on_peer_message(&message.path, &message.body)
                    .await;
                delivered += 1;
            }
        }
        if delivered == 0 {
            return;
        }
    }
}

fn take_inbox(inbox: &mut NodeInbox) -> Vec<InboundMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = inbox.try_recv() {
        messages.push(message);
    }
    messages
}

async fn create(device: &Device, title: &str) -> Reminder {
    let reminder = device
        .db
        .create_reminder(&NewReminder::new(title).unwrap())
        .await
        .unwrap();
    device
        .coordinator
        .schedule_mutation(&reminder, OperationKind::Create)
        .await
        .unwrap();
    reminder
}

fn reminder(id: i64, title: &str) -> Reminder {
    Reminder {
        id: ReminderId::new(id),
        title: title.to_string(),
        description: None,
        trigger_at: None,
        due_at: None,
        created_at: 1_700_000_000_000 + id,
        completed: false,
    }
}

#[derive(Default)]
struct RecordingTransport {
    offline: AtomicBool,
    failing: bool,
    sent: StdMutex<Vec<SyncMessage>>,
}

impl RecordingTransport {
    fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<SyncMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn send_to_all(&self, message: &SyncMessage) -> Vec<PeerDelivery> {
        if self.offline.load(Ordering::SeqCst) {
            return Vec::new();
        }
        self.sent.lock().unwrap().push(message.clone());
        if self.failing {
            vec![PeerDelivery::failed(
                "recorder",
                TransportError::NotConnected("recorder".to_string()),
            )]
        } else {
            vec![PeerDelivery::ok("recorder")]
        }
    }

    async fn is_any_peer_reachable(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct RecordingAlerts {
    events: StdMutex<Vec<String>>,
}

impl AlertScheduler for RecordingAlerts {
    fn schedule(&self, reminder: &Reminder) {
        self.events
            .lock()
            .unwrap()
            .push(format!("schedule {}", reminder.id));
    }

    fn cancel(&self, id: ReminderId) {
        self.events.lock().unwrap().push(format!("cancel {id}"));
    }
}

async fn recorded(role: DeviceRole) -> (DatabaseService, SyncCoordinator, Arc<RecordingTransport>) {
    let db = DatabaseService::open_in_memory().await.unwrap();
    let transport = Arc::new(RecordingTransport::default());
    let coordinator = SyncCoordinator::builder(Arc::new(db.clone()), Arc::new(db.clone()))
        .transport(transport.clone())
        .role(role)
        .start();
    (db, coordinator, transport)
}

#[tokio::test(flavor = "multi_thread")]
async fn create_while_offline_then_reconnect() {
    let bus = LocalMessageBus::new();
    let mut phone = device(&bus, "phone", DeviceRole::Phone).await;
    let mut watch = device(&bus, "watch", DeviceRole::Watch).await;
    bus.set_connected("watch", false).await;

    let created = create(&phone, "Buy milk").await;
    phone.coordinator.drain().await;

    let pending = phone.db.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, OperationKind::Create);
    assert_eq!(pending[0].reminder_id, created.id);
    assert_eq!(created.id, ReminderId::new(1));

    bus.set_connected("watch", true).await;
    let report = phone.coordinator.flush_pending().await;
    assert!(!report.skipped_offline);
    assert_eq!(report.attempted, 1);
    assert_eq!(report.snapshot.as_ref().map(|s| s.delivered), Some(1));
    settle(&mut [&mut phone, &mut watch]).await;

    let on_watch = watch.db.get_reminder(ReminderId::new(1)).await.unwrap().unwrap();
    assert_eq!(on_watch.title, "Buy milk");
    assert_eq!(phone.db.count_pending().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_flush_leaves_log_untouched() {
    let (db, coordinator, transport) = recorded(DeviceRole::Phone).await;
    transport.offline.store(true, Ordering::SeqCst);

    let stored = reminder(1, "Offline");
    db.upsert_reminder(&stored).await.unwrap();
    coordinator
        .schedule_mutation(&stored, OperationKind::Create)
        .await
        .unwrap();
    let report = coordinator.flush_pending().await;

    assert!(report.skipped_offline);
    assert_eq!(report.snapshot, None);
    assert_eq!(db.count_pending().await.unwrap(), 1);
    assert!(transport.sent().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_then_snapshot_does_not_resurrect() {
    let bus = LocalMessageBus::new();
    let mut phone = device(&bus, "phone", DeviceRole::Phone).await;
    let mut watch = device(&bus, "watch", DeviceRole::Watch).await;
    let shared = vec![reminder(4, "Keep"), reminder(5, "Drop")];
    phone.db.replace_all_reminders(&shared).await.unwrap();
    watch.db.replace_all_reminders(&shared).await.unwrap();

    let doomed = phone.db.get_reminder(ReminderId::new(5)).await.unwrap().unwrap();
    phone.db.delete_reminder(doomed.id).await.unwrap();
    phone
        .coordinator
        .schedule_mutation(&doomed, OperationKind::Delete)
        .await
        .unwrap();
    phone.coordinator.drain().await;

    let frames = take_inbox(&mut watch.inbox);
    assert_eq!(frames[0].path, "delete_reminder");
    assert_eq!(frames[0].body, b"5");
    assert_eq!(frames[1].path, "sync_reminders_list");
    for frame in &frames {
        watch.coordinator.on_peer_message(&frame.path, &frame.body).await;
    }
    settle(&mut [&mut phone, &mut watch]).await;

    assert_eq!(
        watch.db.list_reminders().await.unwrap(),
        vec![reminder(4, "Keep")]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn out_of_order_delete_is_noop() {
    let (db, coordinator, _) = recorded(DeviceRole::Watch).await;
    db.replace_all_reminders(&[reminder(1, "Other")]).await.unwrap();

    let outcome = coordinator
        .handle_inbound("delete_reminder", b"7")
        .await
        .unwrap();

    assert_eq!(
        outcome,
        InboundOutcome::Deleted {
            id: ReminderId::new(7),
            existed: false
        }
    );
    assert_eq!(db.list_reminders().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_payload_is_dropped() {
    let (db, coordinator, _) = recorded(DeviceRole::Watch).await;
    db.replace_all_reminders(&[reminder(1, "Stays")]).await.unwrap();

    coordinator.on_peer_message("sync_reminder", b"{oops").await;
    coordinator
        .on_peer_message("sync_reminders_list", b"[{\"id\":2}]")
        .await;
    let error = coordinator
        .handle_inbound("sync_reminder", b"not json")
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Codec(_)));
    assert_eq!(
        db.list_reminders().await.unwrap(),
        vec![reminder(1, "Stays")]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_path_is_dropped() {
    let (_, coordinator, _) = recorded(DeviceRole::Watch).await;
    let error = coordinator.handle_inbound("/ping", b"").await.unwrap_err();
    assert!(matches!(error, Error::Codec(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn upsert_is_idempotent() {
    let (db, coordinator, _) = recorded(DeviceRole::Watch).await;
    let body = MessageCodec::default()
        .encode_reminder(&reminder(3, "Twice"))
        .unwrap();

    coordinator
        .handle_inbound("sync_reminder", body.as_bytes())
        .await
        .unwrap();
    let once = db.list_reminders().await.unwrap();
    coordinator
        .handle_inbound("sync_reminder", body.as_bytes())
        .await
        .unwrap();

    assert_eq!(db.list_reminders().await.unwrap(), once);
    assert_eq!(once, vec![reminder(3, "Twice")]);
}

#[tokio::test(flavor = "multi_thread")]
async fn flush_sends_in_fifo_order_then_snapshot() {
    let (db, coordinator, transport) = recorded(DeviceRole::Phone).await;
    transport.offline.store(true, Ordering::SeqCst);

    let first = reminder(1, "First");
    let second = reminder(2, "Second");
    db.upsert_reminder(&first).await.unwrap();
    db.upsert_reminder(&second).await.unwrap();
    coordinator
        .schedule_mutation(&first, OperationKind::Create)
        .await
        .unwrap();
    coordinator
        .schedule_mutation(&second, OperationKind::Create)
        .await
        .unwrap();
    db.delete_reminder(first.id).await.unwrap();
    coordinator
        .schedule_mutation(&first, OperationKind::Delete)
        .await
        .unwrap();
    coordinator.drain().await;

    transport.offline.store(false, Ordering::SeqCst);
    let report = coordinator.flush_pending().await;

    assert_eq!(report.attempted, 3);
    assert_eq!(
        transport.sent(),
        vec![
            SyncMessage::Upsert(first.clone()),
            SyncMessage::Upsert(second.clone()),
            SyncMessage::Delete(first.id),
            SyncMessage::ReplaceAll(vec![second]),
        ]
    );
    assert_eq!(db.count_pending().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_delivery_still_removes_entry() {
    let db = DatabaseService::open_in_memory().await.unwrap();
    let transport = Arc::new(RecordingTransport::failing());
    let coordinator = SyncCoordinator::builder(Arc::new(db.clone()), Arc::new(db.clone()))
        .transport(transport.clone())
        .start();
    transport.offline.store(true, Ordering::SeqCst);
    let stored = reminder(1, "Lost");
    db.upsert_reminder(&stored).await.unwrap();
    coordinator
        .schedule_mutation(&stored, OperationKind::Create)
        .await
        .unwrap();
    coordinator.drain().await;

    transport.offline.store(false, Ordering::SeqCst);
    let report = coordinator.flush_pending().await;

    assert_eq!(report.attempted, 1);
    assert_eq!(report.failed_deliveries, 1);
    assert_eq!(
        report.snapshot,
        Some(SnapshotReport {
            reminders: 1,
            delivered: 0,
            failed: 1
        })
    );
    assert_eq!(db.count_pending().await.unwrap(), 0);
    assert_eq!(db.load_sync_state().await.unwrap().last_snapshot_sent_at, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn convergence_after_offline_edits() {
    let bus = LocalMessageBus::new();
    let mut phone = device(&bus, "phone", DeviceRole::Phone).await;
    let mut watch = device(&bus, "watch", DeviceRole::Watch).await;
    bus.set_connected("watch", false).await;

    let milk = create(&phone, "Buy milk").await;
    let rent = create(&phone, "Pay rent").await;
    let _plants = create(&phone, "Water plants").await;

    let mut done = rent.clone();
    done.completed = true;
    done.description = Some("paid".to_string());
    phone.db.update_reminder(&done).await.unwrap();
    phone
        .coordinator
        .schedule_mutation(&done, OperationKind::Update)
        .await
        .unwrap();
    phone.db.delete_reminder(milk.id).await.unwrap();
    phone
        .coordinator
        .schedule_mutation(&milk, OperationKind::Delete)
        .await
        .unwrap();
    settle(&mut [&mut phone, &mut watch]).await;
    assert!(watch.db.list_reminders().await.unwrap().is_empty());

    bus.set_connected("watch", true).await;
    phone.coordinator.flush_pending().await;
    settle(&mut [&mut phone, &mut watch]).await;

    assert_eq!(
        watch.db.list_reminders().await.unwrap(),
        phone.db.list_reminders().await.unwrap()
    );
    assert_eq!(watch.db.list_reminders().await.unwrap().len(), 2);
    let state = watch.db.load_sync_state().await.unwrap();
    assert!(state.last_snapshot_received_at.is_some());
    let state = phone.db.load_sync_state().await.unwrap();
    assert!(state.last_snapshot_sent_at.is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn announce_pulls_full_state_from_primary() {
    let bus = LocalMessageBus::new();
    let mut phone = device(&bus, "phone", DeviceRole::Phone).await;
    let mut watch = device(&bus, "watch", DeviceRole::Watch).await;
    phone
        .db
        .replace_all_reminders(&[reminder(1, "A"), reminder(2, "B")])
        .await
        .unwrap();
    watch
        .db
        .replace_all_reminders(&[reminder(9, "Stale")])
        .await
        .unwrap();

    let deliveries = watch.coordinator.announce().await;
    assert_eq!(deliveries.len(), 2);
    assert!(deliveries.iter().all(PeerDelivery::is_ok));
    settle(&mut [&mut phone, &mut watch]).await;

    assert_eq!(
        watch.db.list_reminders().await.unwrap(),
        vec![reminder(1, "A"), reminder(2, "B")]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn primary_relays_peer_edits() {
    let (db, coordinator, transport) = recorded(DeviceRole::Phone).await;
    let legacy = br#"{"id":11,"titulo":"From watch","descripcion":"","fechaHora":5,"vencimiento":0,"recordatorio":0}"#;

    coordinator
        .handle_inbound("/sync_recordatorio", legacy)
        .await
        .unwrap();
    coordinator
        .handle_inbound("/delete_recordatorio", b"3")
        .await
        .unwrap();
    coordinator.drain().await;

    let sent = transport.sent();
    assert!(sent.contains(&SyncMessage::Upsert(Reminder {
        id: ReminderId::new(11),
        title: "From watch".to_string(),
        description: None,
        trigger_at: None,
        due_at: None,
        created_at: 5,
        completed: false,
    })));
    assert!(sent.contains(&SyncMessage::Delete(ReminderId::new(3))));
    assert_eq!(db.count_pending().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn secondary_does_not_relay() {
    let (db, coordinator, transport) = recorded(DeviceRole::Watch).await;
    let body = MessageCodec::default()
        .encode_reminder(&reminder(1, "Quiet"))
        .unwrap();

    coordinator
        .handle_inbound("sync_reminder", body.as_bytes())
        .await
        .unwrap();
    coordinator.drain().await;

    assert!(transport.sent().is_empty());
    assert_eq!(db.count_pending().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn primary_ignores_inbound_snapshots() {
    let (db, coordinator, transport) = recorded(DeviceRole::Phone).await;
    db.upsert_reminder(&reminder(4, "Phone only")).await.unwrap();
    let frame = MessageCodec::default()
        .encode(&SyncMessage::ReplaceAll(vec![reminder(1, "Stale")]))
        .unwrap();

    let outcome = coordinator
        .handle_inbound(frame.path(), &frame.body)
        .await
        .unwrap();
    coordinator.drain().await;

    assert_eq!(outcome, InboundOutcome::SnapshotIgnored { count: 1 });
    assert_eq!(
        db.list_reminders().await.unwrap(),
        vec![reminder(4, "Phone only")]
    );
    assert!(transport.sent().is_empty());
    assert_eq!(db.count_pending().await.unwrap(), 0);
    assert_eq!(
        db.load_sync_state().await.unwrap().last_snapshot_received_at,
        None
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn secondary_applies_snapshot_without_relaying() {
    let (db, coordinator, transport) = recorded(DeviceRole::Watch).await;
    db.upsert_reminder(&reminder(9, "Gone")).await.unwrap();
    let frame = MessageCodec::default()
        .encode(&SyncMessage::ReplaceAll(vec![reminder(1, "Only")]))
        .unwrap();

    let outcome = coordinator
        .handle_inbound(frame.path(), &frame.body)
        .await
        .unwrap();
    coordinator.drain().await;

    assert_eq!(outcome, InboundOutcome::Replaced { count: 1 });
    assert_eq!(db.list_reminders().await.unwrap(), vec![reminder(1, "Only")]);
    assert!(transport.sent().is_empty());
    assert_eq!(db.count_pending().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn secondary_flush_sends_entries_without_snapshot() {
    let (db, coordinator, transport) = recorded(DeviceRole::Watch).await;
    transport.offline.store(true, Ordering::SeqCst);
    let edited = reminder(1, "Edited on watch");
    db.upsert_reminder(&edited).await.unwrap();
    db.upsert_reminder(&reminder(2, "Untouched")).await.unwrap();
    coordinator
        .schedule_mutation(&edited, OperationKind::Update)
        .await
        .unwrap();
    coordinator.drain().await;

    transport.offline.store(false, Ordering::SeqCst);
    let report = coordinator.flush_pending().await;

    assert_eq!(report.attempted, 1);
    assert_eq!(report.snapshot, None);
    assert_eq!(transport.sent(), vec![SyncMessage::Upsert(edited)]);
    assert_eq!(coordinator.push_full_snapshot().await, None);
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn reconnecting_watch_keeps_reminders_created_on_phone() {
    let bus = LocalMessageBus::new();
    let mut phone = device(&bus, "phone", DeviceRole::Phone).await;
    let mut watch = device(&bus, "watch", DeviceRole::Watch).await;
    let shared = vec![reminder(1, "Shared")];
    phone.db.replace_all_reminders(&shared).await.unwrap();
    watch.db.replace_all_reminders(&shared).await.unwrap();
    bus.set_connected("watch", false).await;

    let phone_only = create(&phone, "Created on phone").await;
    assert_eq!(phone_only.id, ReminderId::new(2));

    let mut edited = reminder(1, "Edited on watch");
    edited.completed = true;
    watch.db.update_reminder(&edited).await.unwrap();
    watch
        .coordinator
        .schedule_mutation(&edited, OperationKind::Update)
        .await
        .unwrap();
    settle(&mut [&mut phone, &mut watch]).await;

    bus.set_connected("watch", true).await;
    let report = watch.coordinator.flush_pending().await;
    assert_eq!(report.attempted, 1);
    assert_eq!(report.snapshot, None);
    settle(&mut [&mut phone, &mut watch]).await;

    let expected = vec![edited, phone_only];
    assert_eq!(phone.db.list_reminders().await.unwrap(), expected);
    assert_eq!(watch.db.list_reminders().await.unwrap(), expected);
    assert_eq!(phone.db.count_pending().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn request_full_sync_pushes_snapshot() {
    let (db, coordinator, transport) = recorded(DeviceRole::Phone).await;
    db.upsert_reminder(&reminder(1, "Mine")).await.unwrap();

    let outcome = coordinator
        .handle_inbound("request_full_sync", b"")
        .await
        .unwrap();
    coordinator.drain().await;

    assert_eq!(outcome, InboundOutcome::SnapshotRequested);
    assert_eq!(
        transport.sent(),
        vec![SyncMessage::ReplaceAll(vec![reminder(1, "Mine")])]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn alerts_follow_writes() {
    let db = DatabaseService::open_in_memory().await.unwrap();
    let alerts = Arc::new(RecordingAlerts::default());
    let coordinator = SyncCoordinator::builder(Arc::new(db.clone()), Arc::new(db.clone()))
        .alerts(alerts.clone())
        .role(DeviceRole::Watch)
        .start();

    let mut timed = reminder(1, "Timed");
    timed.trigger_at = Some(1_900_000_000_000);
    coordinator
        .schedule_mutation(&timed, OperationKind::Create)
        .await
        .unwrap();
    coordinator
        .apply(SyncMessage::ReplaceAll(vec![reminder(2, "Plain")]))
        .await
        .unwrap();
    coordinator
        .apply(SyncMessage::Delete(ReminderId::new(2)))
        .await
        .unwrap();

    assert_eq!(
        *alerts.events.lock().unwrap(),
        vec!["schedule 1", "cancel 2", "cancel 2"]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn foreground_flushes_after_settle_delay() {
    let db = DatabaseService::open_in_memory().await.unwrap();
    let transport = Arc::new(RecordingTransport::default());
    let coordinator = SyncCoordinator::builder(Arc::new(db.clone()), Arc::new(db.clone()))
        .transport(transport.clone())
        .settle_delay(Duration::from_millis(20))
        .start();
    db.upsert_reminder(&reminder(1, "Resume")).await.unwrap();

    coordinator.on_foreground().await.unwrap();
    coordinator.drain().await;

    assert_eq!(
        transport.sent(),
        vec![SyncMessage::ReplaceAll(vec![reminder(1, "Resume")])]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn periodic_reconcile_pushes_snapshots() {
    let (_, coordinator, transport) = recorded(DeviceRole::Phone).await;

    let ticker = coordinator.spawn_periodic_reconcile(Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(60)).await;
    coordinator.drain().await;
    ticker.abort();

    assert!(!transport.sent().is_empty());
    assert!(transport
        .sent()
        .iter()
        .all(|message| matches!(message, SyncMessage::ReplaceAll(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn inbound_listener_applies_bus_frames() {
    let bus = LocalMessageBus::new();
    let phone = device(&bus, "phone", DeviceRole::Phone).await;
    let watch_db = DatabaseService::open_in_memory().await.unwrap();
    let (watch_endpoint, watch_inbox) = bus.register("watch", MessageCodec::default()).await;
    let watch = SyncCoordinator::builder(Arc::new(watch_db.clone()), Arc::new(watch_db.clone()))
        .transport(Arc::new(watch_endpoint))
        .role(DeviceRole::Watch)
        .start();
    let listener = watch.spawn_inbound_listener(watch_inbox);

    create(&phone, "Via listener").await;
    phone.coordinator.drain().await;

    let mut stored = Vec::new();
    for _ in 0..50 {
        stored = watch_db.list_reminders().await.unwrap();
        if !stored.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    listener.abort();

    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "Via listener");
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_finishes_queued_flush() {
    let (db, coordinator, transport) = recorded(DeviceRole::Phone).await;
    let stored = reminder(1, "Last words");
    db.upsert_reminder(&stored).await.unwrap();
    coordinator
        .schedule_mutation(&stored, OperationKind::Create)
        .await
        .unwrap();

    coordinator.shutdown().await;

    assert_eq!(transport.sent()[0], SyncMessage::Upsert(stored.clone()));
    assert_eq!(db.count_pending().await.unwrap(), 0);

    // still durable after the worker is gone
    coordinator
        .schedule_mutation(&stored, OperationKind::Update)
        .await
        .unwrap();
    assert_eq!(db.count_pending().await.unwrap(), 1);
}
