//! Tiwut Storage Layer
//!
//! SQLite-backed persistence for history and bookmarks, plus the
//! human-editable config file. Every write commits before returning.

mod config;
mod database;
mod error;
mod migrations;

pub use config::{keys, Config, LoadFailure};
pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
