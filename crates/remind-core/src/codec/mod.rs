//! JSON wire codec for reminders, snapshot envelopes and sync messages.
//!
//! Decoding is version-agnostic: legacy zero/empty sentinels and omitted
//! fields both decode to `None`. Encoding follows the configured
//! [`WireVersion`].

mod dto;
mod message;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use dto::{ReminderDto, SnapshotEnvelope};
pub use message::{Frame, MessageType, SyncMessage};

use dto::SnapshotBody;

use crate::models::{Reminder, ReminderId};
use crate::util::compact_text;

const V2_SCHEMA_VERSION: u32 = 2;

/// Errors raised while decoding or encoding wire payloads
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid reminder id: {0}")]
    InvalidId(String),
    #[error("reminder {id} has an empty title")]
    BlankTitle { id: i64 },
    #[error("unknown message path: {0}")]
    UnknownPath(String),
}

/// Wire format revision used when encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireVersion {
    /// Byte-compatible with older peers: unset fields are written as `0`/`""`
    Legacy,
    /// Unset optional fields are omitted
    #[default]
    V2,
}

/// Encoder/decoder for every payload the sync subsystem exchanges
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCodec {
    version: WireVersion,
}

impl MessageCodec {
    pub const fn new(version: WireVersion) -> Self {
        Self { version }
    }

    pub const fn version(&self) -> WireVersion {
        self.version
    }

    /// Encode a message into its path and body bytes.
    pub fn encode(&self, message: &SyncMessage) -> Result<Frame, CodecError> {
        let body = match message {
            SyncMessage::Upsert(reminder) => self.encode_reminder(reminder)?.into_bytes(),
            SyncMessage::ReplaceAll(reminders) => {
                serde_json::to_vec(&self.to_dtos(reminders))?
            }
            SyncMessage::Delete(id) => id.to_string().into_bytes(),
            SyncMessage::PeerConnected | SyncMessage::RequestFullSync => Vec::new(),
        };

        Ok(Frame {
            message_type: message.message_type(),
            body,
        })
    }

    /// Decode a message received on `path`.
    pub fn decode(&self, path: &str, body: &[u8]) -> Result<SyncMessage, CodecError> {
        self.decode_typed(MessageType::from_path(path)?, body)
    }

    /// Decode a body whose message type is already known.
    pub fn decode_typed(
        &self,
        message_type: MessageType,
        body: &[u8],
    ) -> Result<SyncMessage, CodecError> {
        match message_type {
            MessageType::SyncReminder => self.decode_reminder(body).map(SyncMessage::Upsert),
            MessageType::SyncRemindersList => self
                .decode_snapshot(body)
                .map(|(reminders, _)| SyncMessage::ReplaceAll(reminders)),
            MessageType::DeleteReminder => decode_id(body).map(SyncMessage::Delete),
            MessageType::PeerConnected => Ok(SyncMessage::PeerConnected),
            MessageType::RequestFullSync => Ok(SyncMessage::RequestFullSync),
        }
    }

    /// Encode a single reminder as a JSON object.
    ///
    /// Also used for the pending operation payload column.
    pub fn encode_reminder(&self, reminder: &Reminder) -> Result<String, CodecError> {
        Ok(serde_json::to_string(&ReminderDto::single(
            reminder,
            self.version,
        ))?)
    }

    /// Decode a single reminder JSON object.
    pub fn decode_reminder(&self, body: &[u8]) -> Result<Reminder, CodecError> {
        let dto: ReminderDto = serde_json::from_slice(body)?;
        dto.into_reminder()
    }

    /// Encode the TV `POST /sync` envelope.
    pub fn encode_snapshot_envelope(
        &self,
        reminders: &[Reminder],
        timestamp: i64,
    ) -> Result<Vec<u8>, CodecError> {
        let envelope = SnapshotEnvelope {
            recordatorios: self.to_dtos(reminders),
            timestamp,
            version: match self.version {
                WireVersion::Legacy => None,
                WireVersion::V2 => Some(V2_SCHEMA_VERSION),
            },
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    /// Decode a full-state payload, either a bare array or an envelope.
    ///
    /// Returns the reminders and the sender timestamp when one was present.
    /// One invalid item rejects the whole snapshot.
    pub fn decode_snapshot(&self, body: &[u8]) -> Result<(Vec<Reminder>, Option<i64>), CodecError> {
        let (dtos, timestamp) = match serde_json::from_slice::<SnapshotBody>(body) {
            Ok(SnapshotBody::Envelope(envelope)) => {
                let timestamp = (envelope.timestamp != 0).then_some(envelope.timestamp);
                (envelope.recordatorios, timestamp)
            }
            Ok(SnapshotBody::Bare(items)) => (items, None),
            // untagged errors are opaque; reparse as an array for a useful message
            Err(_) => (serde_json::from_slice::<Vec<ReminderDto>>(body)?, None),
        };

        let reminders = dtos
            .into_iter()
            .map(ReminderDto::into_reminder)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((reminders, timestamp))
    }

    fn to_dtos(&self, reminders: &[Reminder]) -> Vec<ReminderDto> {
        reminders
            .iter()
            .map(|reminder| ReminderDto::from_reminder(reminder, self.version))
            .collect()
    }
}

/// Decode a UTF-8 decimal reminder id.
pub fn decode_id(body: &[u8]) -> Result<ReminderId, CodecError> {
    let text = std::str::from_utf8(body).map_err(|_| CodecError::InvalidUtf8)?;
    let id: ReminderId = text
        .parse()
        .map_err(|_| CodecError::InvalidId(compact_text(text)))?;
    if id.get() <= 0 {
        return Err(CodecError::InvalidId(id.to_string()));
    }
    Ok(id)
}
