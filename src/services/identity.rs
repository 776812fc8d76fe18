// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote identity/session service.
//!
//! The provider is an opaque credential service: it tells us who is signed in
//! and notifies when that changes. Two implementations exist: Supabase auth for
//! real deployments and an in-process registry for local-only mode and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

/// An authenticated remote identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Authentication failures. These are the only errors shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Bad credentials or provider-side validation failure
    #[error("{0}")]
    Rejected(String),

    #[error("Auth provider error: {0}")]
    Provider(String),

    #[error("Auth provider unreachable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The currently signed-in identity, if any. Failures read as signed out.
    async fn current_session(&self) -> Option<Identity>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Session-change notifications; the value is the current identity.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}

struct LocalAccount {
    id: String,
    /// Argon2id PHC string
    password_hash: String,
}

/// Hash `password` with Argon2id and a random salt.
fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string.
fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// In-process account registry.
pub struct LocalIdentity {
    accounts: Mutex<HashMap<String, LocalAccount>>,
    session: watch::Sender<Option<Identity>>,
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdentity {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            session,
        }
    }

    /// Simulate a session that appears outside of `sign_in` (another tab,
    /// a token refresh resolving).
    pub fn set_session(&self, identity: Option<Identity>) {
        self.session.send_replace(identity);
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn current_session(&self) -> Option<Identity> {
        self.session.borrow().clone()
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Rejected(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let email = email.trim().to_lowercase();
        let password_hash = hash_password(password)
            .map_err(|e| AuthError::Provider(format!("Password hashing failed: {}", e)))?;
        let identity = {
            let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
            if accounts.contains_key(&email) {
                return Err(AuthError::Rejected("User already registered".to_string()));
            }
            let id = uuid::Uuid::now_v7().to_string();
            accounts.insert(
                email.clone(),
                LocalAccount {
                    id: id.clone(),
                    password_hash,
                },
            );
            Identity {
                id,
                email: Some(email),
            }
        };

        tracing::info!(user_id = %identity.id, "Local account created");
        self.session.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = email.trim().to_lowercase();
        let account = {
            let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
            accounts
                .get(&email)
                .map(|a| (a.id.clone(), a.password_hash.clone()))
        };
        let rejected = || AuthError::Rejected("Invalid login credentials".to_string());
        let (id, password_hash) = account.ok_or_else(rejected)?;

        let verified = verify_password(password, &password_hash)
            .map_err(|e| AuthError::Provider(format!("Password check failed: {}", e)))?;
        if !verified {
            return Err(rejected());
        }
        let identity = Identity {
            id,
            email: Some(email),
        };

        self.session.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.session.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let provider = LocalIdentity::new();
        let created = provider.sign_up("Seeker@Example.com", "secret1").await.unwrap();
        assert_eq!(created.email.as_deref(), Some("seeker@example.com"));

        provider.sign_out().await.unwrap();
        assert_eq!(provider.current_session().await, None);

        let signed_in = provider.sign_in("seeker@example.com", "secret1").await.unwrap();
        assert_eq!(signed_in.id, created.id);
        assert_eq!(provider.current_session().await, Some(signed_in));
    }

    #[test]
    fn test_password_hash_is_salted_argon2id() {
        let first = hash_password("secret1").unwrap();
        let second = hash_password("secret1").unwrap();
        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);

        assert!(verify_password("secret1", &first).unwrap());
        assert!(verify_password("secret1", &second).unwrap());
        assert!(!verify_password("secret2", &first).unwrap());
        assert!(verify_password("secret1", "not a phc string").is_err());
    }

    #[tokio::test]
    async fn test_rejections() {
        let provider = LocalIdentity::new();
        assert!(matches!(
            provider.sign_up("a@example.com", "123").await,
            Err(AuthError::Rejected(_))
        ));

        provider.sign_up("a@example.com", "123456").await.unwrap();
        assert_eq!(
            provider.sign_up("a@example.com", "123456").await,
            Err(AuthError::Rejected("User already registered".to_string()))
        );
        assert_eq!(
            provider.sign_in("a@example.com", "wrong-password").await,
            Err(AuthError::Rejected("Invalid login credentials".to_string()))
        );
    }

    #[tokio::test]
    async fn test_subscribers_see_session_changes() {
        let provider = LocalIdentity::new();
        let mut rx = provider.subscribe();

        provider.sign_up("b@example.com", "123456").await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_some());

        provider.sign_out().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }
}
