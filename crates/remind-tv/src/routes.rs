use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use remind_core::codec::MessageType;
use remind_core::config::DeviceRole;
use remind_core::services::DatabaseService;
use remind_core::sync::{InboundOutcome, SyncCoordinator};
use remind_core::transport::{DELETE_PATH, STATUS_PATH, SYNC_PATH};
use remind_core::Reminder;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    db: DatabaseService,
    coordinator: SyncCoordinator,
    instance: Arc<str>,
}

impl AppState {
    /// Receiver state over `db`; inbound frames go through a TV-role coordinator.
    pub fn new(db: DatabaseService, instance: impl Into<Arc<str>>) -> Self {
        let coordinator = SyncCoordinator::builder(Arc::new(db.clone()), Arc::new(db.clone()))
            .role(DeviceRole::Tv)
            .start();
        Self {
            db,
            coordinator,
            instance: instance.into(),
        }
    }

    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route(STATUS_PATH, get(status))
        .route(SYNC_PATH, post(receive_snapshot))
        .route(DELETE_PATH, post(receive_delete))
        .route("/reminders", get(list_reminders))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    instance: String,
    reminders: usize,
    last_snapshot_received_at: Option<i64>,
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let reminders = state.db.list_reminders().await?.len();
    let sync_state = state.db.load_sync_state().await?;
    Ok(Json(StatusResponse {
        status: "ok",
        instance: state.instance.to_string(),
        reminders,
        last_snapshot_received_at: sync_state.last_snapshot_received_at,
    }))
}

#[derive(Debug, Serialize)]
struct SnapshotAck {
    replaced: usize,
}

async fn receive_snapshot(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SnapshotAck>, AppError> {
    let outcome = state
        .coordinator
        .handle_inbound(MessageType::SyncRemindersList.path(), &body)
        .await?;
    match outcome {
        InboundOutcome::Replaced { count } => {
            tracing::info!(count, bytes = body.len(), "Snapshot applied");
            Ok(Json(SnapshotAck { replaced: count }))
        }
        other => Err(AppError::Internal(format!(
            "unexpected outcome for snapshot: {other:?}"
        ))),
    }
}

#[derive(Debug, Serialize)]
struct DeleteAck {
    id: i64,
    existed: bool,
}

async fn receive_delete(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DeleteAck>, AppError> {
    let outcome = state
        .coordinator
        .handle_inbound(MessageType::DeleteReminder.path(), &body)
        .await?;
    match outcome {
        InboundOutcome::Deleted { id, existed } => {
            tracing::info!(reminder_id = %id, existed, "Delete applied");
            Ok(Json(DeleteAck {
                id: id.get(),
                existed,
            }))
        }
        other => Err(AppError::Internal(format!(
            "unexpected outcome for delete: {other:?}"
        ))),
    }
}

async fn list_reminders(State(state): State<AppState>) -> Result<Json<Vec<Reminder>>, AppError> {
    Ok(Json(state.db.list_reminders().await?))
}
