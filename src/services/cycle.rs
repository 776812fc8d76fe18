// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily Cycle Engine.
//!
//! A check-in locks the day for 24 hours. The lock is derived from
//! `videoSubmittedToday` and `lastCompletionTime`; once 24 hours have elapsed
//! the next evaluation (startup, API call or the periodic ticker) writes the
//! flag back to false.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::models::{ProfilePatch, UserProfile, PROGRAM_DAYS};
use crate::store::{ProfileStore, StoreError};
use crate::time_utils::Clock;

/// How long a check-in keeps the day locked.
pub const LOCK_HOURS: i64 = 24;

fn lock_window() -> Duration {
    Duration::hours(LOCK_HOURS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    /// Check-in allowed
    Unlocked,
    /// Checked in, waiting for the 24 hours to pass
    Locked,
    /// Every program day has been checked in
    Completed,
}

/// Time left until unlock, in whole hours and minutes (rounded down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub hours: i64,
    pub minutes: i64,
}

impl Countdown {
    fn from_remaining(remaining: Duration) -> Self {
        let minutes = remaining.num_minutes().max(0);
        Self {
            hours: minutes / 60,
            minutes: minutes % 60,
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m", self.hours, self.minutes)
    }
}

/// Derived state of the current day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStatus {
    pub phase: CyclePhase,
    pub last_completed_day: u32,
    pub program_day: u32,
    pub days_remaining: u32,
    pub unlocks_at: Option<DateTime<Utc>>,
    pub countdown: Option<Countdown>,
    /// `countdown` formatted as "Xh Ym"
    pub countdown_text: Option<String>,
}

/// Evaluate the cycle for `profile` at `now`. Pure; never writes.
pub fn evaluate(profile: &UserProfile, now: DateTime<Utc>) -> CycleStatus {
    let program_day = profile.program_day();

    // No completion timestamp means no derivable lock, whatever the flag says
    let unlocks_at = match (profile.video_submitted_today, profile.last_completion_time) {
        (true, Some(completed)) => Some(completed + lock_window()).filter(|at| now < *at),
        _ => None,
    };

    let (phase, countdown) = match unlocks_at {
        Some(at) => (CyclePhase::Locked, Some(Countdown::from_remaining(at - now))),
        None if profile.last_completed_day >= PROGRAM_DAYS => (CyclePhase::Completed, None),
        None => (CyclePhase::Unlocked, None),
    };

    CycleStatus {
        phase,
        last_completed_day: profile.last_completed_day,
        program_day,
        days_remaining: PROGRAM_DAYS.saturating_sub(program_day),
        unlocks_at,
        countdown,
        countdown_text: countdown.map(|c| c.to_string()),
    }
}

/// Whether the stored lock flag has outlived its 24 hours.
fn needs_reset(profile: &UserProfile, now: DateTime<Utc>) -> bool {
    profile.video_submitted_today
        && profile
            .last_completion_time
            .is_some_and(|completed| now - completed >= lock_window())
}

/// Errors from check-in.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Program not activated")]
    NotActivated,

    #[error("Already checked in today; next check-in unlocks at {unlocks_at}")]
    AlreadyCheckedIn { unlocks_at: DateTime<Utc> },

    #[error("All {days} program days are complete", days = PROGRAM_DAYS)]
    ProgramComplete,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of one re-evaluation.
#[derive(Debug, Clone)]
pub struct CycleRefresh {
    pub profile: UserProfile,
    pub status: CycleStatus,
    /// True if this refresh wrote the unlock
    pub reset: bool,
}

/// Owns the lock/unlock transitions of the daily cycle.
#[derive(Clone)]
pub struct DailyCycle {
    profiles: ProfileStore,
    clock: Arc<dyn Clock>,
}

impl DailyCycle {
    pub fn new(profiles: ProfileStore, clock: Arc<dyn Clock>) -> Self {
        Self { profiles, clock }
    }

    /// Re-evaluate the cycle, writing the unlock if 24 hours have passed.
    ///
    /// Idempotent: running it again right away changes nothing.
    pub fn refresh(&self) -> Result<CycleRefresh, StoreError> {
        self.refresh_at(self.clock.now())
    }

    fn refresh_at(&self, now: DateTime<Utc>) -> Result<CycleRefresh, StoreError> {
        let mut reset = false;
        let profile = self.profiles.update_with(|current| {
            reset = needs_reset(current, now);
            Ok::<_, StoreError>(reset.then(|| ProfilePatch::new().video_submitted_today(false)))
        })?;

        if reset {
            tracing::info!(
                last_completed_day = profile.last_completed_day,
                "24 hours elapsed since check-in, day unlocked"
            );
        }

        Ok(CycleRefresh {
            status: evaluate(&profile, now),
            profile,
            reset,
        })
    }

    pub fn status(&self) -> Result<CycleStatus, StoreError> {
        Ok(self.refresh()?.status)
    }

    /// Record today's check-in and lock the day.
    ///
    /// The decision and the write happen under the store's write lock, so two
    /// concurrent check-ins cannot both count.
    pub fn check_in(&self) -> Result<UserProfile, CycleError> {
        let now = self.clock.now();
        self.refresh_at(now)?;

        let updated = self.profiles.update_with(|profile| {
            if !profile.has_paid {
                return Err(CycleError::NotActivated);
            }

            let status = evaluate(profile, now);
            match status.phase {
                CyclePhase::Locked => Err(CycleError::AlreadyCheckedIn {
                    unlocks_at: status.unlocks_at.unwrap_or(now),
                }),
                CyclePhase::Completed => Err(CycleError::ProgramComplete),
                CyclePhase::Unlocked => Ok(Some(
                    ProfilePatch::new()
                        .video_submitted_today(true)
                        .last_completed_day(profile.last_completed_day + 1)
                        .last_completion_time(Some(now)),
                )),
            }
        })?;

        tracing::info!(day = updated.last_completed_day, "Check-in recorded");
        Ok(updated)
    }

    /// Start the periodic recompute.
    ///
    /// Every `period` the cycle is refreshed and the status published on
    /// [`CycleTicker::status`]. `on_reset` receives the profile whenever a tick
    /// performed the unlock write. The first tick fires immediately.
    pub fn spawn_ticker<F>(&self, period: std::time::Duration, on_reset: F) -> CycleTicker
    where
        F: Fn(UserProfile) + Send + Sync + 'static,
    {
        let initial = evaluate(&self.profiles.get(), self.clock.now());
        let (tx, rx) = watch::channel(initial);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let cycle = self.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => match cycle.refresh() {
                        Ok(refresh) => {
                            if refresh.reset {
                                on_reset(refresh.profile);
                            }
                            tx.send_replace(refresh.status);
                        }
                        Err(e) => tracing::warn!(error = %e, "Cycle refresh failed"),
                    },
                }
            }
            tracing::debug!("Cycle ticker stopped");
        });

        CycleTicker {
            cancel,
            task,
            status: rx,
        }
    }
}

/// Handle to a running ticker. Dropping it stops the ticker.
pub struct CycleTicker {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    status: watch::Receiver<CycleStatus>,
}

impl CycleTicker {
    /// Receiver of the status computed on each tick.
    pub fn status(&self) -> watch::Receiver<CycleStatus> {
        self.status.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CycleTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
