// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily reflection journal model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One reflection, at most one per program day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Program day this entry reflects on
    pub day: u32,
    /// When the entry was written
    pub date: DateTime<Utc>,
    /// Prompt/answer pairs in the order they were answered
    pub answers: Vec<JournalAnswer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct JournalAnswer {
    #[validate(length(min = 1, max = 500))]
    pub prompt: String,
    #[validate(length(max = 5000))]
    pub answer: String,
}
