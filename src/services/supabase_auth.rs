// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase auth (GoTrue) client.
//!
//! Handles:
//! - E-mail/password sign-up and sign-in
//! - Session persistence in the local store
//! - Token refresh when the access token is close to expiry, before any
//!   session read or remote call
//! - Sign-out and session-change notifications

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

use super::identity::{AuthError, Identity, IdentityProvider};
use crate::db::TokenSource;
use crate::store::{keys, KvStore};
use crate::time_utils::Clock;

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Session as persisted locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    user: Identity,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<GoTrueUser> for Identity {
    fn from(user: GoTrueUser) -> Self {
        Identity {
            id: user.id,
            email: user.email,
        }
    }
}

/// Token grant response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: GoTrueUser,
}

/// GoTrue error bodies differ between endpoints and versions.
#[derive(Debug, Default, Deserialize)]
struct GoTrueError {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl GoTrueError {
    fn into_message(self, fallback: &str) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Supabase auth client.
pub struct SupabaseAuth {
    http: reqwest::Client,
    auth_url: String,
    anon_key: String,
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    /// Also serializes refreshes
    session: Mutex<Option<StoredSession>>,
    events: watch::Sender<Option<Identity>>,
}

impl SupabaseAuth {
    /// Create the client, restoring any session persisted in `kv`.
    pub fn new(
        base_url: &str,
        anon_key: &str,
        kv: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let restored = Self::load_session(kv.as_ref());
        if let Some(session) = &restored {
            tracing::info!(user_id = %session.user.id, "Restored auth session");
        }
        let (events, _) = watch::channel(restored.as_ref().map(|s| s.user.clone()));

        Self {
            http: reqwest::Client::new(),
            auth_url: format!("{}/auth/v1", base_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
            kv,
            clock,
            session: Mutex::new(restored),
            events,
        }
    }

    fn load_session(kv: &dyn KvStore) -> Option<StoredSession> {
        let raw = match kv.get(keys::SESSION) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored session");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| tracing::warn!(error = %e, "Stored session is corrupt, ignoring"))
            .ok()
    }

    /// Replace the current session in memory and on disk, and tell
    /// subscribers.
    fn install(&self, slot: &mut Option<StoredSession>, session: Option<StoredSession>) {
        let persisted = match &session {
            Some(s) => serde_json::to_string(s)
                .map_err(crate::store::StoreError::from)
                .and_then(|raw| self.kv.set(keys::SESSION, &raw)),
            None => self.kv.remove(keys::SESSION),
        };
        if let Err(e) = persisted {
            tracing::warn!(error = %e, "Failed to persist auth session");
        }

        self.events
            .send_replace(session.as_ref().map(|s| s.user.clone()));
        *slot = session;
    }

    fn session_from(&self, token: TokenResponse) -> StoredSession {
        StoredSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: self.clock.now() + Duration::seconds(token.expires_in),
            user: token.user.into(),
        }
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, AuthError> {
        let response = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoTrueError>(&body)
                .unwrap_or_default()
                .into_message(&format!("HTTP {}", status));
            return Err(match status.as_u16() {
                400 | 401 | 403 | 422 => AuthError::Rejected(message),
                _ => AuthError::Provider(message),
            });
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("JSON parse error: {}", e)))
    }

    async fn grant(&self, grant_type: &str, body: serde_json::Value) -> Result<TokenResponse, AuthError> {
        let url = format!("{}/token?grant_type={}", self.auth_url, grant_type);
        let value = self.post_json(&url, &body).await?;
        serde_json::from_value(value)
            .map_err(|e| AuthError::Provider(format!("Unexpected token response: {}", e)))
    }

    /// The current session, refreshed first if it expires within the margin.
    ///
    /// Only a rejected refresh token ends the session. Transport and provider
    /// failures keep it so a later call can retry.
    async fn fresh_session(&self) -> Option<StoredSession> {
        let mut slot = self.session.lock().await;
        let session = slot.clone()?;

        let remaining = session.expires_at - self.clock.now();
        if remaining > Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) {
            return Some(session);
        }

        tracing::debug!(user_id = %session.user.id, "Refreshing auth session");
        match self
            .grant(
                "refresh_token",
                serde_json::json!({ "refresh_token": session.refresh_token }),
            )
            .await
        {
            Ok(token) => {
                let fresh = self.session_from(token);
                self.install(&mut slot, Some(fresh.clone()));
                Some(fresh)
            }
            Err(AuthError::Rejected(message)) => {
                tracing::warn!(error = %message, "Refresh token rejected, signing out locally");
                self.install(&mut slot, None);
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed, keeping session");
                Some(session)
            }
        }
    }
}

#[async_trait]
impl TokenSource for SupabaseAuth {
    async fn access_token(&self) -> Option<String> {
        self.fresh_session().await.map(|s| s.access_token)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn current_session(&self) -> Option<Identity> {
        self.fresh_session().await.map(|s| s.user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let url = format!("{}/signup", self.auth_url);
        let value = self
            .post_json(
                &url,
                &serde_json::json!({ "email": email, "password": password }),
            )
            .await?;

        // With auto-confirm the response is a full session; otherwise just the user
        if value.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(value)
                .map_err(|e| AuthError::Provider(format!("Unexpected sign-up response: {}", e)))?;
            let session = self.session_from(token);
            let identity = session.user.clone();
            let mut slot = self.session.lock().await;
            self.install(&mut slot, Some(session));
            tracing::info!(user_id = %identity.id, "Signed up");
            return Ok(identity);
        }

        let user = value.get("user").cloned().unwrap_or(value);
        let user: GoTrueUser = serde_json::from_value(user)
            .map_err(|e| AuthError::Provider(format!("Unexpected sign-up response: {}", e)))?;
        tracing::info!(user_id = %user.id, "Signed up, e-mail confirmation pending");
        Ok(user.into())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let token = self
            .grant(
                "password",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        let session = self.session_from(token);
        let identity = session.user.clone();

        let mut slot = self.session.lock().await;
        self.install(&mut slot, Some(session));
        tracing::info!(user_id = %identity.id, "Signed in");
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let mut slot = self.session.lock().await;
        let result = match slot.as_ref() {
            Some(session) => self
                .http
                .post(format!("{}/logout", self.auth_url))
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token)
                .send()
                .await
                .map_err(|e| AuthError::Unavailable(e.to_string()))
                .and_then(|response| {
                    if response.status().is_success() {
                        Ok(())
                    } else {
                        Err(AuthError::Provider(format!("HTTP {}", response.status())))
                    }
                }),
            None => Ok(()),
        };

        // The local session goes away even if the remote call failed
        self.install(&mut slot, None);
        result
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{RecordStore, SupabaseDb};
    use crate::store::MemoryKv;
    use crate::time_utils::ManualClock;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
    }

    fn stored(expires_at: DateTime<Utc>) -> String {
        serde_json::to_string(&StoredSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at,
            user: Identity {
                id: "user-9".to_string(),
                email: Some("nine@example.com".to_string()),
            },
        })
        .unwrap()
    }

    fn kv_with_session(expires_at: DateTime<Utc>) -> Arc<MemoryKv> {
        let kv = Arc::new(MemoryKv::new());
        kv.set(keys::SESSION, &stored(expires_at)).unwrap();
        kv
    }

    fn client(base_url: &str, kv: Arc<MemoryKv>, clock: Arc<ManualClock>) -> SupabaseAuth {
        SupabaseAuth::new(base_url, "anon", kv, clock)
    }

    /// Serve `router` on an ephemeral local port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{}", addr)
    }

    /// Stub project whose token endpoint always answers `status` with `body`.
    /// Its profiles table only accepts the access token "fresh".
    fn stub_project(status: StatusCode, body: Value) -> Router {
        async fn profiles(headers: HeaderMap) -> (StatusCode, Json<Value>) {
            match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
                Some("Bearer fresh") => (StatusCode::OK, Json(json!([]))),
                _ => (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "code": "PGRST301", "message": "JWT expired" })),
                ),
            }
        }

        Router::new()
            .route(
                "/auth/v1/token",
                post(move || {
                    let body = body.clone();
                    async move { (status, Json(body)) }
                }),
            )
            .route("/rest/v1/profiles", get(profiles))
    }

    fn refreshed_token() -> Value {
        json!({
            "access_token": "fresh",
            "refresh_token": "refresh-2",
            "expires_in": 3600,
            "user": { "id": "user-9", "email": "nine@example.com" }
        })
    }

    #[tokio::test]
    async fn test_restores_valid_session_without_network() {
        let kv = kv_with_session(now() + Duration::hours(1));
        let auth = client(
            "https://example.supabase.co",
            kv,
            Arc::new(ManualClock::new(now())),
        );

        assert_eq!(auth.access_token().await.as_deref(), Some("access"));
        let announced = auth.subscribe().borrow().clone();
        let current = auth.current_session().await;
        assert_eq!(announced, current);
        assert_eq!(current.map(|i| i.id), Some("user-9".to_string()));
    }

    #[tokio::test]
    async fn test_corrupt_session_is_ignored() {
        let kv = Arc::new(MemoryKv::new());
        kv.set(keys::SESSION, "{").unwrap();
        let auth = client(
            "https://example.supabase.co",
            kv,
            Arc::new(ManualClock::new(now())),
        );
        assert_eq!(auth.current_session().await, None);
        assert_eq!(auth.access_token().await, None);
    }

    #[tokio::test]
    async fn test_remote_calls_use_refreshed_token() {
        let base = serve(stub_project(StatusCode::OK, refreshed_token())).await;
        let kv = kv_with_session(now() + Duration::hours(1));
        let clock = Arc::new(ManualClock::new(now()));
        let auth = Arc::new(client(&base, kv.clone(), clock.clone()));
        let db = SupabaseDb::new(&base, "anon").with_tokens(auth.clone());

        // Still valid: the stored token goes out and the table refuses it
        assert!(db.fetch_profile("user-9").await.is_err());

        // An hour later the token is refreshed before the request
        clock.advance(Duration::minutes(61));
        assert_eq!(db.fetch_profile("user-9").await, Ok(None));

        let persisted = kv.get(keys::SESSION).unwrap().unwrap();
        assert!(persisted.contains("refresh-2"));
        assert_eq!(auth.access_token().await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_refresh_within_margin() {
        let base = serve(stub_project(StatusCode::OK, refreshed_token())).await;
        let clock = Arc::new(ManualClock::new(now()));
        let auth = client(&base, kv_with_session(now() + Duration::hours(1)), clock.clone());

        clock.advance(Duration::minutes(54));
        assert_eq!(auth.access_token().await.as_deref(), Some("access"));

        clock.advance(Duration::minutes(2));
        assert_eq!(auth.access_token().await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_rejected_refresh_signs_out() {
        let base = serve(stub_project(
            StatusCode::BAD_REQUEST,
            json!({ "error": "invalid_grant", "error_description": "Invalid Refresh Token" }),
        ))
        .await;
        let kv = kv_with_session(now() - Duration::minutes(1));
        let auth = client(&base, kv.clone(), Arc::new(ManualClock::new(now())));
        let sessions = auth.subscribe();

        assert_eq!(auth.current_session().await, None);
        assert_eq!(kv.get(keys::SESSION).unwrap(), None);
        assert_eq!(*sessions.borrow(), None);
    }

    #[tokio::test]
    async fn test_provider_outage_keeps_session() {
        let base = serve(stub_project(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "message": "upstream unavailable" }),
        ))
        .await;
        let kv = kv_with_session(now() - Duration::minutes(1));
        let auth = client(&base, kv.clone(), Arc::new(ManualClock::new(now())));

        assert_eq!(
            auth.current_session().await.map(|i| i.id),
            Some("user-9".to_string())
        );
        assert!(kv.get(keys::SESSION).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_provider_keeps_session() {
        // Nothing listens on a port we just released
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let kv = kv_with_session(now() - Duration::minutes(1));
        let auth = client(&base, kv.clone(), Arc::new(ManualClock::new(now())));

        assert_eq!(auth.access_token().await.as_deref(), Some("access"));
        assert_eq!(
            auth.current_session().await.map(|i| i.id),
            Some("user-9".to_string())
        );
        assert!(kv.get(keys::SESSION).unwrap().is_some());
    }

    #[test]
    fn test_error_message_precedence() {
        let err: GoTrueError =
            serde_json::from_str(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .unwrap();
        assert_eq!(err.into_message("x"), "Invalid login credentials");

        let err: GoTrueError = serde_json::from_str(r#"{"code":422,"msg":"User already registered"}"#).unwrap();
        assert_eq!(err.into_message("x"), "User already registered");

        assert_eq!(GoTrueError::default().into_message("HTTP 500"), "HTTP 500");
    }
}
