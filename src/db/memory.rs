// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory record store.
//!
//! Used as the backend in local-only mode (created unprovisioned, so every call
//! reports a missing table) and as the remote double in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{tables, RecordStore, RemoteError};
use crate::models::ProfileRow;

#[derive(Debug)]
pub struct MemoryRecords {
    rows: Mutex<HashMap<String, ProfileRow>>,
    provisioned: AtomicBool,
    transient_failure: Mutex<Option<String>>,
    upserts: AtomicUsize,
}

impl Default for MemoryRecords {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecords {
    /// A store with an empty, provisioned `profiles` table.
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            provisioned: AtomicBool::new(true),
            transient_failure: Mutex::new(None),
            upserts: AtomicUsize::new(0),
        }
    }

    /// A store whose `profiles` table was never created.
    pub fn unprovisioned() -> Self {
        let store = Self::new();
        store.provisioned.store(false, Ordering::SeqCst);
        store
    }

    /// Make every call fail with `message` until cleared with `None`.
    pub fn set_transient_failure(&self, message: Option<&str>) {
        *self
            .transient_failure
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = message.map(str::to_string);
    }

    /// Seed a row directly.
    pub fn insert(&self, row: ProfileRow) {
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(row.id.clone(), row);
    }

    /// Read a row directly.
    pub fn get(&self, id: &str) -> Option<ProfileRow> {
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Number of successful upserts so far.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), RemoteError> {
        if !self.provisioned.load(Ordering::SeqCst) {
            return Err(RemoteError::SchemaMissing(format!(
                "Could not find the table 'public.{}'",
                tables::PROFILES
            )));
        }
        if let Some(message) = self
            .transient_failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(RemoteError::Transport(message));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecords {
    async fn upsert_profile(&self, row: &ProfileRow) -> Result<(), RemoteError> {
        self.check_available()?;
        self.insert(row.clone());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_profile(&self, id: &str) -> Result<Option<ProfileRow>, RemoteError> {
        self.check_available()?;
        Ok(self.get(id))
    }
}
