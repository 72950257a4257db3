pub mod add;
pub mod clear_pending;
pub mod common;
pub mod complete;
pub mod completions;
pub mod daemon;
pub mod delete;
pub mod discover;
pub mod edit;
pub mod flush;
pub mod list;
pub mod pending;
pub mod status;
