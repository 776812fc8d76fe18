// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote Sync Adapter: best-effort mirroring of the profile to the remote store.
//!
//! Nothing here returns an error. Every failure is logged and reported as an
//! outcome value so callers can surface sync health without ever being blocked
//! by it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::db::{RecordStore, RemoteError};
use crate::models::{ProfileRow, UserProfile};
use crate::store::ProfileStore;
use crate::time_utils::Clock;

/// Result of one push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Profile has no remote identity yet
    Skipped,
    Synced,
    /// A more recently initiated push already landed
    Superseded,
    /// Remote table not provisioned; running local-only
    SchemaMissing,
    Failed { message: String },
}

/// Result of one pull, before collapsing to `Option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    Found(UserProfile),
    NotFound,
    SchemaMissing,
    Failed(String),
}

impl PullOutcome {
    /// The merged profile, or `None` for every kind of "nothing usable".
    pub fn into_profile(self) -> Option<UserProfile> {
        match self {
            PullOutcome::Found(profile) => Some(profile),
            PullOutcome::NotFound | PullOutcome::SchemaMissing | PullOutcome::Failed(_) => None,
        }
    }
}

/// Latest push attempt, for hosts that want to show sync status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncHealth {
    pub last_outcome: Option<SyncOutcome>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

/// Orders pushes by when they were initiated.
#[derive(Default)]
struct PushOrder {
    /// Last sequence number handed out
    issued: AtomicU64,
    /// Sequence number of the newest push that reached the remote.
    /// Held across the upsert so pushes reach the remote one at a time.
    landed: Mutex<u64>,
}

/// Push/pull of the user profile against a [`RecordStore`].
#[derive(Clone)]
pub struct ProfileSync {
    records: Arc<dyn RecordStore>,
    profiles: ProfileStore,
    clock: Arc<dyn Clock>,
    order: Arc<PushOrder>,
    health: Arc<watch::Sender<SyncHealth>>,
}

impl ProfileSync {
    pub fn new(
        records: Arc<dyn RecordStore>,
        profiles: ProfileStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (health, _) = watch::channel(SyncHealth::default());
        Self {
            records,
            profiles,
            clock,
            order: Arc::new(PushOrder::default()),
            health: Arc::new(health),
        }
    }

    /// Upsert `profile` to the remote store.
    ///
    /// The snapshot passed in is exactly what gets pushed; later local writes go
    /// out with a later push.
    pub async fn push(&self, profile: &UserProfile) -> SyncOutcome {
        match self.begin_push(profile) {
            Some((seq, row)) => self.land_push(seq, row).await,
            None => SyncOutcome::Skipped,
        }
    }

    /// Push in a detached task.
    ///
    /// The push is ordered at call time, not when the task first runs.
    pub fn spawn_push(&self, profile: UserProfile) -> JoinHandle<SyncOutcome> {
        let begun = self.begin_push(&profile);
        let sync = self.clone();
        tokio::spawn(async move {
            match begun {
                Some((seq, row)) => sync.land_push(seq, row).await,
                None => SyncOutcome::Skipped,
            }
        })
    }

    fn begin_push(&self, profile: &UserProfile) -> Option<(u64, ProfileRow)> {
        let Some(row) = ProfileRow::from_profile(profile, self.clock.now()) else {
            tracing::debug!("Profile has no remote identity, not syncing");
            return None;
        };
        let seq = self.order.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Some((seq, row))
    }

    async fn land_push(&self, seq: u64, row: ProfileRow) -> SyncOutcome {
        let mut landed = self.order.landed.lock().await;

        let outcome = if *landed > seq {
            tracing::debug!(user_id = %row.id, seq, newest = *landed, "Dropping stale profile push");
            SyncOutcome::Superseded
        } else {
            match self.records.upsert_profile(&row).await {
                Ok(()) => {
                    *landed = seq;
                    tracing::debug!(user_id = %row.id, seq, "Profile synced");
                    SyncOutcome::Synced
                }
                Err(RemoteError::SchemaMissing(msg)) => {
                    tracing::warn!(
                        user_id = %row.id,
                        detail = %msg,
                        "Remote 'profiles' table missing, data saved locally only"
                    );
                    SyncOutcome::SchemaMissing
                }
                Err(e) => {
                    tracing::error!(user_id = %row.id, error = %e, "Failed to sync profile");
                    SyncOutcome::Failed {
                        message: e.to_string(),
                    }
                }
            }
        };
        drop(landed);

        self.health.send_replace(SyncHealth {
            last_outcome: Some(outcome.clone()),
            last_attempt_at: Some(self.clock.now()),
        });
        outcome
    }

    /// Fetch the remote profile for `id`, merged over the local profile.
    ///
    /// Not-found, missing table and transport failures all come back as `None`.
    pub async fn pull(&self, id: &str) -> Option<UserProfile> {
        self.pull_outcome(id).await.into_profile()
    }

    /// Like [`pull`](Self::pull), keeping the reason nothing was found.
    pub async fn pull_outcome(&self, id: &str) -> PullOutcome {
        match self.records.fetch_profile(id).await {
            Ok(Some(row)) => {
                tracing::debug!(user_id = id, "Loaded remote profile");
                PullOutcome::Found(row.overlay(self.profiles.get()))
            }
            Ok(None) | Err(RemoteError::NotFound) => {
                tracing::debug!(user_id = id, "No remote profile");
                PullOutcome::NotFound
            }
            Err(RemoteError::SchemaMissing(msg)) => {
                tracing::warn!(
                    user_id = id,
                    detail = %msg,
                    "Remote 'profiles' table missing, using local data"
                );
                PullOutcome::SchemaMissing
            }
            Err(e) => {
                tracing::error!(user_id = id, error = %e, "Failed to load remote profile");
                PullOutcome::Failed(e.to_string())
            }
        }
    }

    pub fn health(&self) -> SyncHealth {
        self.health.borrow().clone()
    }

    pub fn subscribe_health(&self) -> watch::Receiver<SyncHealth> {
        self.health.subscribe()
    }
}
