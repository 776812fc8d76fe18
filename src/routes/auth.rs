// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: sign-up, sign-in and logout.

use crate::error::Result;
use crate::models::UserProfile;
use crate::services::{select_screen, Screen};
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/signup", post(sign_up))
        .route("/api/auth/signin", post(sign_in))
        .route("/api/auth/logout", post(logout))
}

/// E-mail/password credentials.
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 256))]
    pub password: String,
}

/// Profile after an auth change, with the screen to show next.
#[derive(Serialize)]
pub struct AuthResponse {
    pub profile: UserProfile,
    pub screen: Screen,
}

impl From<UserProfile> for AuthResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            screen: select_screen(&profile),
            profile,
        }
    }
}

async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>> {
    req.validate()?;
    let profile = state.accounts.sign_up(req.email.trim(), &req.password).await?;
    Ok(Json(profile.into()))
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>> {
    req.validate()?;
    let profile = state.accounts.sign_in(req.email.trim(), &req.password).await?;
    Ok(Json(profile.into()))
}

/// Sign out remotely and reset the local profile.
async fn logout(State(state): State<Arc<AppState>>) -> Result<Json<AuthResponse>> {
    let profile = state.accounts.logout().await?;
    Ok(Json(profile.into()))
}
