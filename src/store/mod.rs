// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! On-device persistence.
//!
//! A small key-value substrate holds serialized JSON under a handful of fixed
//! keys. The typed stores on top of it treat anything unreadable as absent.

pub mod file;
pub mod journal;
pub mod memory;
pub mod profile;

pub use file::FileKv;
pub use journal::JournalStore;
pub use memory::MemoryKv;
pub use profile::ProfileStore;

/// Key names as constants.
pub mod keys {
    pub const PROFILE: &str = "brahma_path_user";
    pub const JOURNAL: &str = "brahma_path_journal";
    /// Persisted remote auth session
    pub const SESSION: &str = "brahma_path_session";
}

/// Key-value persistence substrate.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Errors from the local substrate.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Local storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
}
