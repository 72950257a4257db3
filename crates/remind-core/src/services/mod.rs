//! Service wrappers shared by every device build

mod database;

pub use database::DatabaseService;
