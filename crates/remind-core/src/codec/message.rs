//! Logical message paths and typed sync messages

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::CodecError;
use crate::models::{Reminder, ReminderId};

/// Logical path a message travels on, shared by every transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// One reminder, insert-or-replace by id
    SyncReminder,
    /// Complete ordered reminder list replacing the receiver's store
    SyncRemindersList,
    /// Decimal reminder id to delete
    DeleteReminder,
    /// A secondary device just became reachable
    PeerConnected,
    /// A secondary device asks for the full state
    RequestFullSync,
}

impl MessageType {
    pub const ALL: [Self; 5] = [
        Self::SyncReminder,
        Self::SyncRemindersList,
        Self::DeleteReminder,
        Self::PeerConnected,
        Self::RequestFullSync,
    ];

    /// Canonical path written on the wire
    pub const fn path(self) -> &'static str {
        match self {
            Self::SyncReminder => "sync_reminder",
            Self::SyncRemindersList => "sync_reminders_list",
            Self::DeleteReminder => "delete_reminder",
            Self::PeerConnected => "peer_connected",
            Self::RequestFullSync => "request_full_sync",
        }
    }

    /// Resolve a received path, accepting a leading `/` and the legacy names
    /// older watch and phone builds still emit.
    pub fn from_path(path: &str) -> Result<Self, CodecError> {
        let name = path.trim().trim_start_matches('/');
        match name {
            "sync_reminder" | "sync_recordatorio" => Ok(Self::SyncReminder),
            "sync_reminders_list" | "sync_recordatorios_list" => Ok(Self::SyncRemindersList),
            "delete_reminder" | "delete_recordatorio" => Ok(Self::DeleteReminder),
            "peer_connected" | "watch_connected" => Ok(Self::PeerConnected),
            "request_full_sync" => Ok(Self::RequestFullSync),
            _ => Err(CodecError::UnknownPath(path.to_string())),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for MessageType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_path(s)
    }
}

/// A decoded sync message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMessage {
    Upsert(Reminder),
    ReplaceAll(Vec<Reminder>),
    Delete(ReminderId),
    PeerConnected,
    RequestFullSync,
}

impl SyncMessage {
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::Upsert(_) => MessageType::SyncReminder,
            Self::ReplaceAll(_) => MessageType::SyncRemindersList,
            Self::Delete(_) => MessageType::DeleteReminder,
            Self::PeerConnected => MessageType::PeerConnected,
            Self::RequestFullSync => MessageType::RequestFullSync,
        }
    }
}

/// Encoded message ready for a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_type: MessageType,
    pub body: Vec<u8>,
}

impl Frame {
    pub const fn path(&self) -> &'static str {
        self.message_type.path()
    }
}
