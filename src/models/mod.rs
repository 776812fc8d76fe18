// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the profile, journal and remote records.

pub mod journal;
pub mod milestone;
pub mod profile;
pub mod remote;

pub use journal::{JournalAnswer, JournalEntry};
pub use milestone::{Milestone, MILESTONES, PROGRAM_DAYS};
pub use profile::{ProfilePatch, UserProfile};
pub use remote::ProfileRow;
