//! Wire DTOs for reminders and snapshot envelopes

use serde::{Deserialize, Serialize};

use super::{CodecError, WireVersion};
use crate::models::{Reminder, ReminderId};
use crate::util::nonzero_millis;

/// Reminder as it appears on the wire.
///
/// Field names are the ones already deployed on watch and TV builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderDto {
    pub id: i64,
    pub titulo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    #[serde(rename = "fechaHora", default)]
    pub fecha_hora: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vencimiento: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recordatorio: Option<i64>,
    /// `true` while the reminder is active; absent means active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
}

impl ReminderDto {
    /// Build the wire form of `reminder`.
    ///
    /// Legacy output writes `""` and `0` for unset fields; v2 omits them.
    pub fn from_reminder(reminder: &Reminder, version: WireVersion) -> Self {
        let (descripcion, vencimiento, recordatorio) = match version {
            WireVersion::Legacy => (
                Some(reminder.description.clone().unwrap_or_default()),
                Some(reminder.due_at.unwrap_or(0)),
                Some(reminder.trigger_at.unwrap_or(0)),
            ),
            WireVersion::V2 => (
                reminder.description.clone(),
                reminder.due_at,
                reminder.trigger_at,
            ),
        };

        Self {
            id: reminder.id.get(),
            titulo: reminder.title.clone(),
            descripcion,
            fecha_hora: reminder.created_at,
            vencimiento,
            recordatorio,
            status: Some(!reminder.completed),
        }
    }

    /// Wire form for a single-reminder frame.
    ///
    /// Legacy single frames keep the original six keys, so `status` is left out.
    pub fn single(reminder: &Reminder, version: WireVersion) -> Self {
        let mut dto = Self::from_reminder(reminder, version);
        if version == WireVersion::Legacy {
            dto.status = None;
        }
        dto
    }

    /// Validate and convert into a domain reminder.
    pub fn into_reminder(self) -> Result<Reminder, CodecError> {
        if self.id <= 0 {
            return Err(CodecError::InvalidId(self.id.to_string()));
        }
        if self.titulo.trim().is_empty() {
            return Err(CodecError::BlankTitle { id: self.id });
        }

        Ok(Reminder {
            id: ReminderId::new(self.id),
            title: self.titulo,
            description: self.descripcion.filter(|text| !text.is_empty()),
            trigger_at: nonzero_millis(self.recordatorio),
            due_at: nonzero_millis(self.vencimiento),
            created_at: self.fecha_hora,
            completed: self.status == Some(false),
        })
    }
}

/// Body of the TV `POST /sync` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    pub recordatorios: Vec<ReminderDto>,
    /// Sender clock when the snapshot was taken (Unix ms); `0` when omitted
    #[serde(default)]
    pub timestamp: i64,
    /// Wire schema version; absent on legacy senders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

/// Accepted shapes of a full-state payload
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum SnapshotBody {
    Envelope(SnapshotEnvelope),
    Bare(Vec<ReminderDto>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reminder() -> Reminder {
        Reminder {
            id: ReminderId::new(4),
            title: "Dentist".to_string(),
            description: None,
            trigger_at: Some(1_700_000_000_000),
            due_at: None,
            created_at: 1_690_000_000_000,
            completed: false,
        }
    }

    #[test]
    fn legacy_dto_fills_sentinels() {
        let dto = ReminderDto::from_reminder(&reminder(), WireVersion::Legacy);
        assert_eq!(dto.descripcion.as_deref(), Some(""));
        assert_eq!(dto.vencimiento, Some(0));
        assert_eq!(dto.recordatorio, Some(1_700_000_000_000));
    }

    #[test]
    fn v2_dto_omits_unset_fields() {
        let dto = ReminderDto::from_reminder(&reminder(), WireVersion::V2);
        let json = serde_json::to_value(&dto).unwrap();
        assert!(json.get("descripcion").is_none());
        assert!(json.get("vencimiento").is_none());
        assert_eq!(json["recordatorio"], 1_700_000_000_000_i64);
        assert_eq!(json["fechaHora"], 1_690_000_000_000_i64);
    }

    #[test]
    fn status_maps_to_completion() {
        let mut done = reminder();
        done.completed = true;
        let dto = ReminderDto::from_reminder(&done, WireVersion::V2);
        assert_eq!(dto.status, Some(false));
        assert!(dto.into_reminder().unwrap().completed);
    }

    #[test]
    fn into_reminder_rejects_unassigned_id() {
        let mut dto = ReminderDto::from_reminder(&reminder(), WireVersion::V2);
        dto.id = 0;
        assert!(matches!(dto.into_reminder(), Err(CodecError::InvalidId(_))));
    }

    #[test]
    fn legacy_single_frame_has_the_six_original_keys() {
        let mut done = reminder();
        done.completed = true;
        let json = serde_json::to_value(ReminderDto::single(&done, WireVersion::Legacy)).unwrap();
        let mut keys = json.as_object().unwrap().keys().cloned().collect::<Vec<_>>();
        keys.sort();
        assert_eq!(
            keys,
            vec!["descripcion", "fechaHora", "id", "recordatorio", "titulo", "vencimiento"]
        );

        let v2 = ReminderDto::single(&done, WireVersion::V2);
        assert_eq!(v2.status, Some(false));
        assert_eq!(ReminderDto::from_reminder(&done, WireVersion::Legacy).status, Some(false));
    }
}
