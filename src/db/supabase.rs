// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase (PostgREST) client for the remote `profiles` table.
//!
//! Handles:
//! - Upsert by primary key (`on_conflict=id`, merge duplicates)
//! - Fetch by primary key
//! - Classifying PostgREST errors into not-found / table-missing / other

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{tables, RecordStore, RemoteError};
use crate::models::ProfileRow;

/// Supplier of the signed-in user's access token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A token good for the next request, refreshed first if it is about to
    /// expire. `None` when nobody is signed in.
    async fn access_token(&self) -> Option<String>;
}

/// PostgREST client.
#[derive(Clone)]
pub struct SupabaseDb {
    http: reqwest::Client,
    rest_url: String,
    anon_key: String,
    tokens: Option<Arc<dyn TokenSource>>,
}

impl SupabaseDb {
    /// Create a client for the project at `base_url` (e.g. `https://xyz.supabase.co`).
    ///
    /// Requests use the anon key until [`SupabaseDb::with_tokens`] attaches a
    /// user session.
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
            tokens: None,
        }
    }

    /// Authenticate requests as the user `tokens` is signed in as.
    pub fn with_tokens(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    async fn bearer(&self) -> String {
        let token = match &self.tokens {
            Some(tokens) => tokens.access_token().await,
            None => None,
        };
        token.unwrap_or_else(|| self.anon_key.clone())
    }

    /// Check response status and classify the error body if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), RemoteError> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }
}

#[async_trait]
impl RecordStore for SupabaseDb {
    async fn upsert_profile(&self, row: &ProfileRow) -> Result<(), RemoteError> {
        let url = format!("{}/{}?on_conflict=id", self.rest_url, tables::PROFILES);

        let bearer = self.bearer().await;
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        self.check_response(response).await
    }

    async fn fetch_profile(&self, id: &str) -> Result<Option<ProfileRow>, RemoteError> {
        let url = format!(
            "{}/{}?id=eq.{}&select=*",
            self.rest_url,
            tables::PROFILES,
            urlencoding::encode(id)
        );

        let bearer = self.bearer().await;
        let response = self
            .http
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        match self.check_response_rows(response).await {
            Ok(rows) => Ok(rows.into_iter().next()),
            Err(RemoteError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl SupabaseDb {
    async fn check_response_rows(
        &self,
        response: reqwest::Response,
    ) -> Result<Vec<ProfileRow>, RemoteError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| RemoteError::Transport(format!("JSON parse error: {}", e)))
    }
}

/// PostgREST error body.
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Map a failed PostgREST response onto [`RemoteError`].
fn classify_error(status: u16, body: &str) -> RemoteError {
    let parsed: PostgrestError = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.unwrap_or_else(|| body.to_string());

    match parsed.code.as_deref() {
        // "JSON object requested, multiple (or no) rows returned"
        Some("PGRST116") => RemoteError::NotFound,
        // Postgres undefined_table, or PostgREST schema cache miss
        Some("42P01") | Some("PGRST205") => RemoteError::SchemaMissing(message),
        _ if message.contains("Could not find the table") => RemoteError::SchemaMissing(message),
        _ => RemoteError::Api { status, message },
    }
}
