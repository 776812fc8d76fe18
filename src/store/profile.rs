// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile Store: the canonical on-device copy of the user's progress.

use std::sync::{Arc, Mutex};

use super::{keys, KvStore, StoreError};
use crate::models::{ProfilePatch, UserProfile};

/// Typed access to the persisted [`UserProfile`].
///
/// Constructed once at startup and cloned into every consumer; all clones share
/// the same substrate and the same write lock.
#[derive(Clone)]
pub struct ProfileStore {
    kv: Arc<dyn KvStore>,
    /// Held across every read-merge-write
    write_lock: Arc<Mutex<()>>,
}

impl ProfileStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load the persisted profile.
    ///
    /// Missing, unreadable or corrupt data yields the initial state.
    pub fn get(&self) -> UserProfile {
        let raw = match self.kv.get(keys::PROFILE) {
            Ok(Some(raw)) => raw,
            Ok(None) => return UserProfile::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read profile, using initial state");
                return UserProfile::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Stored profile is corrupt, using initial state");
            UserProfile::default()
        })
    }

    /// Merge `patch` over the current profile, persist and return the result.
    ///
    /// This is the only write path for profiles.
    pub fn update(&self, patch: ProfilePatch) -> Result<UserProfile, StoreError> {
        self.update_with(|_| Ok::<_, StoreError>(Some(patch)))
    }

    /// Decide a patch from the current profile and apply it atomically.
    ///
    /// `decide` sees the stored profile with no other writer in between.
    /// Returning `Ok(None)` leaves storage untouched and yields the current
    /// profile. `decide` must not call back into the store.
    pub fn update_with<E, F>(&self, decide: F) -> Result<UserProfile, E>
    where
        F: FnOnce(&UserProfile) -> Result<Option<ProfilePatch>, E>,
        E: From<StoreError>,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.get();
        let Some(patch) = decide(&current)? else {
            return Ok(current);
        };

        let updated = patch.apply(current);
        let raw = serde_json::to_string(&updated).map_err(StoreError::from)?;
        self.kv.set(keys::PROFILE, &raw)?;
        Ok(updated)
    }
}
