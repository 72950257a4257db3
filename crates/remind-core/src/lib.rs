//! remind-core - Core library for remind
//!
//! This crate contains the reminder models, the libSQL-backed store and
//! pending operation log, the wire codec, the peer transports and the sync
//! coordinator shared by every device build (phone CLI, watch, TV).

pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sync;
pub mod transport;
pub mod util;

pub use error::{Error, Result};
pub use models::{OperationKind, PendingOperation, Reminder, ReminderId};
