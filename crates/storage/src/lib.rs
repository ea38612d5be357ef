#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;
pub mod state_store;

pub use repository::{InMemoryStore, KeyInfo, KeyValueStore, Storage, StorageError};
pub use state_store::{BackupInfo, StateStore};
