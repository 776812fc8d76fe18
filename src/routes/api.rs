// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for the program: profile, cycle, journal, milestones and sync.

use crate::error::{AppError, Result};
use crate::models::milestone::{next_milestone, BadgeIcon};
use crate::models::{JournalAnswer, JournalEntry, UserProfile, MILESTONES};
use crate::services::{evaluate, Bootstrap, CyclePhase, CycleStatus, SyncHealth};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/bootstrap", get(get_bootstrap))
        .route("/api/profile", get(get_profile))
        .route("/api/onboarding", post(post_onboarding))
        .route("/api/payment", post(post_payment))
        .route("/api/cycle", get(get_cycle))
        .route("/api/checkin", post(post_checkin))
        .route("/api/journal", get(get_journal).post(post_journal))
        .route("/api/milestones", get(get_milestones))
        .route("/api/sync", get(get_sync))
}

// ─── Profile ─────────────────────────────────────────────────

/// Re-run startup reconciliation and report the initial screen.
async fn get_bootstrap(State(state): State<Arc<AppState>>) -> Result<Json<Bootstrap>> {
    Ok(Json(state.bootstrapper.bootstrap().await?))
}

async fn get_profile(State(state): State<Arc<AppState>>) -> Json<UserProfile> {
    Json(state.profiles.get())
}

/// Onboarding answers.
#[derive(Debug, Deserialize, Validate)]
pub struct OnboardingRequest {
    #[validate(range(min = 15, max = 60))]
    pub age: u32,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub addictions: Vec<String>,
}

async fn post_onboarding(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OnboardingRequest>,
) -> Result<Json<UserProfile>> {
    req.validate()?;
    let reason = req.reason.trim().to_string();
    if reason.is_empty() {
        return Err(AppError::BadRequest("reason must not be blank".to_string()));
    }

    let profile = state.accounts.onboard(req.age, reason, req.addictions)?;
    Ok(Json(profile))
}

/// Mock payment. No money changes hands.
async fn post_payment(State(state): State<Arc<AppState>>) -> Result<Json<UserProfile>> {
    Ok(Json(state.accounts.activate().await?))
}

// ─── Daily Cycle ─────────────────────────────────────────────

async fn get_cycle(State(state): State<Arc<AppState>>) -> Result<Json<CycleStatus>> {
    let refresh = state.cycle.refresh()?;
    if refresh.reset {
        state.sync.spawn_push(refresh.profile);
    }
    Ok(Json(refresh.status))
}

#[derive(Serialize)]
pub struct CheckInResponse {
    pub profile: UserProfile,
    pub cycle: CycleStatus,
}

async fn post_checkin(State(state): State<Arc<AppState>>) -> Result<Json<CheckInResponse>> {
    let profile = state.cycle.check_in()?;
    state.sync.spawn_push(profile.clone());

    Ok(Json(CheckInResponse {
        cycle: evaluate(&profile, state.clock.now()),
        profile,
    }))
}

// ─── Journal ─────────────────────────────────────────────────

/// Entries, newest first.
async fn get_journal(State(state): State<Arc<AppState>>) -> Json<Vec<JournalEntry>> {
    let mut entries = state.journal.list();
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    Json(entries)
}

#[derive(Debug, Deserialize, Validate)]
pub struct JournalRequest {
    #[validate(length(min = 1, max = 20), nested)]
    pub answers: Vec<JournalAnswer>,
}

/// Journal for the current program day. Replaces any earlier entry for it.
async fn post_journal(
    State(state): State<Arc<AppState>>,
    Json(req): Json<JournalRequest>,
) -> Result<Json<JournalEntry>> {
    req.validate()?;

    let refresh = state.cycle.refresh()?;
    if refresh.status.phase != CyclePhase::Locked {
        return Err(AppError::Conflict(
            "Journal opens after today's check-in".to_string(),
        ));
    }

    let entry = JournalEntry {
        day: refresh.profile.program_day(),
        date: state.clock.now(),
        answers: req.answers,
    };
    state.journal.save(entry.clone())?;
    tracing::info!(day = entry.day, "Journal entry saved");

    Ok(Json(entry))
}

// ─── Milestones ──────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MilestoneView {
    pub day: u32,
    pub title: String,
    pub description: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub icon: BadgeIcon,
    pub earned: bool,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MilestonesResponse {
    pub last_completed_day: u32,
    pub milestones: Vec<MilestoneView>,
    /// Day of the next badge, absent once all are earned
    pub next_day: Option<u32>,
}

async fn get_milestones(State(state): State<Arc<AppState>>) -> Json<MilestonesResponse> {
    let last_completed_day = state.profiles.get().last_completed_day;

    let milestones = MILESTONES
        .iter()
        .map(|m| MilestoneView {
            day: m.day,
            title: m.title.to_string(),
            description: m.description.to_string(),
            icon: m.icon,
            earned: m.is_earned(last_completed_day),
        })
        .collect();

    Json(MilestonesResponse {
        last_completed_day,
        milestones,
        next_day: next_milestone(last_completed_day).map(|m| m.day),
    })
}

// ─── Sync ────────────────────────────────────────────────────

async fn get_sync(State(state): State<Arc<AppState>>) -> Json<SyncHealth> {
    Json(state.sync.health())
}
