//! Storage Layer
//!
//! Bounded, insertion-ordered SQLite table of air-quality readings. Every
//! operation opens its own connection and releases it before returning.

mod reading;
mod store;

pub use reading::{NewReading, Reading};
pub use store::{ReadingStore, StoreConfig, DEFAULT_CAPACITY, DEFAULT_DB_PATH, TABLE_NAME};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store capacity must be at least 1")]
    InvalidCapacity,
}
