// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account flows: onboarding, sign-up/sign-in, activation and logout.

use std::sync::Arc;

use super::bootstrap::SessionBootstrapper;
use super::identity::{AuthError, Identity, IdentityProvider};
use super::sync::ProfileSync;
use crate::models::{ProfilePatch, UserProfile};
use crate::store::{ProfileStore, StoreError};
use crate::time_utils::Clock;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Sign-in required")]
    NotAuthenticated,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct AccountService {
    profiles: ProfileStore,
    sync: ProfileSync,
    identity: Arc<dyn IdentityProvider>,
    bootstrapper: SessionBootstrapper,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    pub fn new(
        profiles: ProfileStore,
        sync: ProfileSync,
        identity: Arc<dyn IdentityProvider>,
        bootstrapper: SessionBootstrapper,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            profiles,
            sync,
            identity,
            bootstrapper,
            clock,
        }
    }

    /// Store the onboarding answers. Local only; they go out with the next push.
    pub fn onboard(
        &self,
        age: u32,
        reason: String,
        addictions: Vec<String>,
    ) -> Result<UserProfile, StoreError> {
        let profile = self.profiles.update(
            ProfilePatch::new()
                .age(Some(age))
                .reason(Some(reason))
                .addictions(addictions),
        )?;
        self.bootstrapper.publish(profile.clone());
        Ok(profile)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<UserProfile, AccountError> {
        let identity = self.identity.sign_up(email, password).await?;
        self.bind(identity, email).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserProfile, AccountError> {
        let identity = self.identity.sign_in(email, password).await?;
        self.bind(identity, email).await
    }

    async fn bind(&self, identity: Identity, email: &str) -> Result<UserProfile, AccountError> {
        let email = identity.email.clone().unwrap_or_else(|| email.to_string());
        self.profiles
            .update(ProfilePatch::new().email(Some(email)))?;

        let (profile, _) = self.bootstrapper.adopt_identity(&identity).await?;
        Ok(profile)
    }

    /// Mock payment: unlock the program for an authenticated user.
    ///
    /// The start date is set the first time only.
    pub async fn activate(&self) -> Result<UserProfile, AccountError> {
        let profile = self.profiles.get();
        if !profile.is_authenticated {
            return Err(AccountError::NotAuthenticated);
        }
        if profile.has_paid {
            tracing::debug!("Program already active");
            return Ok(profile);
        }

        let profile = self.profiles.update(
            ProfilePatch::new()
                .has_paid(true)
                .start_date(Some(self.clock.now())),
        )?;
        tracing::info!(user_id = profile.id.as_deref().unwrap_or(""), "Program activated");

        self.sync.push(&profile).await;
        self.bootstrapper.publish(profile.clone());
        Ok(profile)
    }

    /// Sign out and reset the local profile. The journal is kept.
    pub async fn logout(&self) -> Result<UserProfile, StoreError> {
        if let Err(e) = self.identity.sign_out().await {
            tracing::warn!(error = %e, "Remote sign-out failed, clearing local state anyway");
        }

        let profile = self
            .profiles
            .update(ProfilePatch::from(UserProfile::default()))?;
        tracing::info!("Logged out");
        self.bootstrapper.publish(profile.clone());
        Ok(profile)
    }
}
