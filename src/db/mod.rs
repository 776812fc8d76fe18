//! Remote record store (Supabase/PostgREST, or in-memory when offline).

pub mod memory;
pub mod supabase;

pub use memory::MemoryRecords;
pub use supabase::{SupabaseDb, TokenSource};

use async_trait::async_trait;

use crate::models::ProfileRow;

/// Table names as constants.
pub mod tables {
    pub const PROFILES: &str = "profiles";
}

/// Upsert/fetch access to remote profile records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create or update the record keyed by `row.id`.
    async fn upsert_profile(&self, row: &ProfileRow) -> Result<(), RemoteError>;

    /// Fetch the record for `id`; `Ok(None)` when no such record exists.
    async fn fetch_profile(&self, id: &str) -> Result<Option<ProfileRow>, RemoteError>;
}

/// Failures talking to the remote record store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Record not found")]
    NotFound,

    #[error("Remote table missing: {0}")]
    SchemaMissing(String),

    #[error("Remote API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Remote request failed: {0}")]
    Transport(String),
}
