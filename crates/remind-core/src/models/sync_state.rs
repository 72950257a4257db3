//! Sync state model

use serde::{Deserialize, Serialize};

/// Bookkeeping about the last full-state exchanges on this device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Last time a full snapshot was pushed to at least one peer (Unix ms)
    pub last_snapshot_sent_at: Option<i64>,
    /// Last time an inbound snapshot replaced the local store (Unix ms)
    pub last_snapshot_received_at: Option<i64>,
}
