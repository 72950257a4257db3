use std::io;

use remind_core::transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] remind_core::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No reminder title provided")]
    EmptyTitle,
    #[error("Invalid reminder ID: {0}")]
    InvalidReminderId(String),
    #[error("Reminder not found: {0}")]
    ReminderNotFound(String),
    #[error("Could not parse time '{0}'. Use RFC 3339, \"YYYY-MM-DD HH:MM\" or Unix milliseconds")]
    InvalidTime(String),
    #[error("Nothing to change. Pass at least one of --title, --description, --at, --due, --clear-at, --clear-due")]
    NothingToEdit,
    #[error("Could not resolve the {0} directory; pass --db-path/--config or set REMIND_DB_PATH/REMIND_CONFIG")]
    MissingDirectory(&'static str),
    #[error(
        "TV discovery is disabled. Set REMIND_TV_ADDR or configure `tv.discovery` in the sync settings file."
    )]
    DiscoveryDisabled,
    #[error("Only the phone pushes snapshots; this device is configured as '{0}'")]
    NotPrimary(&'static str),
}
