// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session Bootstrapper: reconcile local state with the remote session at
//! startup and keep following session changes afterwards.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::cycle::DailyCycle;
use super::identity::{Identity, IdentityProvider};
use super::sync::{ProfileSync, SyncOutcome};
use crate::models::{ProfilePatch, UserProfile};
use crate::store::{ProfileStore, StoreError};

/// Which screen the front end should open on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Landing,
    Commitment,
    Payment,
    Dashboard,
}

/// Pick the initial screen for `profile`. Pure.
pub fn select_screen(profile: &UserProfile) -> Screen {
    let has_reason = profile.reason.as_deref().is_some_and(|r| !r.is_empty());

    match (profile.is_authenticated, profile.has_paid) {
        (true, true) => Screen::Dashboard,
        (true, false) => Screen::Payment,
        (false, _) if has_reason => Screen::Commitment,
        (false, _) => Screen::Landing,
    }
}

/// Result of a bootstrap run.
#[derive(Debug, Clone, Serialize)]
pub struct Bootstrap {
    pub profile: UserProfile,
    pub screen: Screen,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    /// Outcome of seeding the remote store, when the identity had no remote
    /// profile yet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seeded: Option<SyncOutcome>,
}

#[derive(Clone)]
pub struct SessionBootstrapper {
    profiles: ProfileStore,
    sync: ProfileSync,
    identity: Arc<dyn IdentityProvider>,
    cycle: DailyCycle,
    current: Arc<watch::Sender<UserProfile>>,
}

impl SessionBootstrapper {
    pub fn new(
        profiles: ProfileStore,
        sync: ProfileSync,
        identity: Arc<dyn IdentityProvider>,
        cycle: DailyCycle,
    ) -> Self {
        let (current, _) = watch::channel(profiles.get());
        Self {
            profiles,
            sync,
            identity,
            cycle,
            current: Arc::new(current),
        }
    }

    /// Startup reconciliation. Safe to run repeatedly.
    pub async fn bootstrap(&self) -> Result<Bootstrap, StoreError> {
        let mut profile = self.cycle.refresh()?.profile;

        let identity = self.identity.current_session().await;
        let mut seeded = None;
        if let Some(identity) = &identity {
            let (adopted, outcome) = self.adopt_identity(identity).await?;
            profile = adopted;
            seeded = outcome;
        }

        let screen = select_screen(&profile);
        self.publish(profile.clone());
        tracing::info!(
            user_id = identity.as_ref().map(|i| i.id.as_str()).unwrap_or("anonymous"),
            screen = ?screen,
            day = profile.program_day(),
            "Bootstrap complete"
        );

        Ok(Bootstrap {
            profile,
            screen,
            identity,
            seeded,
        })
    }

    /// Bind `identity` to the local profile.
    ///
    /// A remote profile, if one exists, replaces the local one. Otherwise the
    /// local profile is stamped with the identity and pushed to seed the remote
    /// side; the push outcome is returned in that case.
    pub async fn adopt_identity(
        &self,
        identity: &Identity,
    ) -> Result<(UserProfile, Option<SyncOutcome>), StoreError> {
        let adopted = match self.sync.pull(&identity.id).await {
            Some(remote) => {
                tracing::info!(user_id = %identity.id, "Adopting remote profile");
                (self.adopt_remote(remote)?, None)
            }
            None => {
                tracing::info!(user_id = %identity.id, "No remote profile, seeding from local");
                let stamped = self.profiles.update(
                    ProfilePatch::new()
                        .id(Some(identity.id.clone()))
                        .is_authenticated(true),
                )?;
                let outcome = self.sync.push(&stamped).await;
                (stamped, Some(outcome))
            }
        };

        self.publish(adopted.0.clone());
        Ok(adopted)
    }

    /// Replace the local profile with `remote` and re-run the reset check.
    fn adopt_remote(&self, remote: UserProfile) -> Result<UserProfile, StoreError> {
        self.profiles.update(ProfilePatch::from(remote))?;

        // The remote copy may carry a lock that has since expired
        let refresh = self.cycle.refresh()?;
        if refresh.reset {
            self.sync.spawn_push(refresh.profile.clone());
        }
        Ok(refresh.profile)
    }

    /// Latest profile produced by bootstrap, sign-in or a session change.
    pub fn profile_updates(&self) -> watch::Receiver<UserProfile> {
        self.current.subscribe()
    }

    pub(crate) fn publish(&self, profile: UserProfile) {
        self.current.send_replace(profile);
    }

    /// Follow session changes until the returned handle is cancelled or
    /// dropped.
    ///
    /// Each time an identity appears, or a different one replaces it, its
    /// remote profile is pulled and adopted.
    pub fn watch_sessions(&self) -> SessionWatch {
        let mut sessions = self.identity.subscribe();
        let mut current_id = sessions.borrow_and_update().as_ref().map(|i| i.id.clone());
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let this = self.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = sessions.changed() => {
                        if changed.is_err() {
                            tracing::debug!("Identity provider went away");
                            break;
                        }
                        let identity = sessions.borrow_and_update().clone();
                        match identity {
                            Some(identity) if current_id.as_deref() != Some(identity.id.as_str()) => {
                                current_id = Some(identity.id.clone());
                                this.follow(&identity).await;
                            }
                            Some(_) => {}
                            None => current_id = None,
                        }
                    }
                }
            }
            tracing::debug!("Session watch stopped");
        });

        SessionWatch { cancel, task }
    }

    async fn follow(&self, identity: &Identity) {
        tracing::info!(user_id = %identity.id, "Session changed, pulling profile");
        let Some(remote) = self.sync.pull(&identity.id).await else {
            return;
        };
        match self.adopt_remote(remote) {
            Ok(profile) => self.publish(profile),
            Err(e) => tracing::warn!(error = %e, "Failed to store pulled profile"),
        }
    }
}

/// Handle to the session-change subscription. Dropping it tears it down.
pub struct SessionWatch {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionWatch {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SessionWatch {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
