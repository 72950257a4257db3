//! Pending operation model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ReminderId;
use crate::error::Error;

/// Kind of mutation waiting to be propagated to peers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    /// Column value stored in `pending_operations.kind`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    /// Create and update carry a reminder snapshot; delete only the id.
    pub const fn carries_payload(self) -> bool {
        !matches!(self, Self::Delete)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!(
                "unknown operation kind: {other}"
            ))),
        }
    }
}

/// A durably queued mutation that has not been sent to peers yet.
///
/// Rows are inserted once and removed after a single send attempt; they are
/// never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Local auto-increment, only meaningful for ordering ties
    pub id: i64,
    /// Reminder this operation concerns
    pub reminder_id: ReminderId,
    /// Mutation kind
    pub kind: OperationKind,
    /// Enqueue timestamp (Unix ms), FIFO key
    pub enqueued_at: i64,
    /// Encoded reminder snapshot for create/update
    pub payload: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_kind_round_trips_column_value() {
        for kind in [
            OperationKind::Create,
            OperationKind::Update,
            OperationKind::Delete,
        ] {
            assert_eq!(kind.as_str().parse::<OperationKind>().unwrap(), kind);
        }
    }

    #[test]
    fn operation_kind_parse_is_case_insensitive() {
        assert_eq!(
            "delete".parse::<OperationKind>().unwrap(),
            OperationKind::Delete
        );
        assert!("UPSERT".parse::<OperationKind>().is_err());
    }

    #[test]
    fn only_delete_omits_payload() {
        assert!(OperationKind::Create.carries_payload());
        assert!(OperationKind::Update.carries_payload());
        assert!(!OperationKind::Delete.carries_payload());
    }
}
