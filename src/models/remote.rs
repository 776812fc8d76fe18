// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote `profiles` record and its mapping to/from [`UserProfile`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::UserProfile;
use crate::time_utils::{format_utc_rfc3339, parse_utc_rfc3339};

/// Row in the remote `profiles` table (keyed by `id`).
///
/// Every column except `id` is nullable on the remote side, so reads tolerate
/// nulls and missing columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub addictions: Option<Vec<String>>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub has_paid: Option<bool>,
    /// RFC3339 or null
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub last_completed_day: Option<u32>,
    /// RFC3339 or null
    #[serde(default)]
    pub last_completion_time: Option<String>,
    #[serde(default)]
    pub video_submitted_today: Option<bool>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ProfileRow {
    /// Map a local profile onto the remote shape.
    ///
    /// Returns `None` for profiles without an `id`; those are never mirrored.
    pub fn from_profile(profile: &UserProfile, updated_at: DateTime<Utc>) -> Option<Self> {
        let id = profile.id.clone()?;
        Some(Self {
            id,
            age: profile.age,
            addictions: Some(profile.addictions.clone()),
            reason: profile.reason.clone(),
            has_paid: Some(profile.has_paid),
            start_date: profile.start_date.map(format_utc_rfc3339),
            last_completed_day: Some(profile.last_completed_day),
            last_completion_time: profile.last_completion_time.map(format_utc_rfc3339),
            video_submitted_today: Some(profile.video_submitted_today),
            updated_at: Some(format_utc_rfc3339(updated_at)),
        })
    }

    /// Overlay this row onto a locally loaded profile.
    ///
    /// Mirrored fields take the remote value (nulls become the empty/false/zero
    /// value); local-only fields such as `email` are kept. The result is always
    /// authenticated.
    pub fn overlay(self, local: UserProfile) -> UserProfile {
        UserProfile {
            id: Some(self.id),
            age: self.age,
            reason: self.reason,
            addictions: self.addictions.unwrap_or_default(),
            is_authenticated: true,
            has_paid: self.has_paid.unwrap_or(false),
            start_date: self.start_date.as_deref().and_then(parse_utc_rfc3339),
            last_completed_day: self.last_completed_day.unwrap_or(0),
            last_completion_time: self
                .last_completion_time
                .as_deref()
                .and_then(parse_utc_rfc3339),
            video_submitted_today: self.video_submitted_today.unwrap_or(false),
            ..local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_profile_without_id_is_not_mapped() {
        assert!(ProfileRow::from_profile(&UserProfile::default(), now()).is_none());
    }

    #[test]
    fn test_absent_dates_serialize_as_null() {
        let profile = UserProfile {
            id: Some("abc".to_string()),
            last_completed_day: 4,
            ..Default::default()
        };
        let row = ProfileRow::from_profile(&profile, now()).unwrap();
        let json = serde_json::to_value(&row).unwrap();

        assert!(json["start_date"].is_null());
        assert!(json["last_completion_time"].is_null());
        assert_eq!(json["last_completed_day"], 4);
        assert_eq!(json["updated_at"], "2026-05-04T12:00:00.000Z");
    }

    #[test]
    fn test_overlay_prefers_remote_and_keeps_local_only_fields() {
        let local = UserProfile {
            email: Some("me@example.com".to_string()),
            last_completed_day: 2,
            addictions: vec!["x".to_string()],
            ..Default::default()
        };
        let row = ProfileRow {
            id: "abc".to_string(),
            age: Some(30),
            addictions: None,
            reason: Some("focus".to_string()),
            has_paid: Some(true),
            start_date: Some("2026-05-01T00:00:00.000Z".to_string()),
            last_completed_day: Some(5),
            last_completion_time: Some("not a date".to_string()),
            video_submitted_today: None,
            updated_at: None,
        };

        let merged = row.overlay(local);

        assert_eq!(merged.id.as_deref(), Some("abc"));
        assert_eq!(merged.email.as_deref(), Some("me@example.com"));
        assert!(merged.is_authenticated);
        assert!(merged.has_paid);
        assert_eq!(merged.last_completed_day, 5);
        assert!(merged.addictions.is_empty());
        assert_eq!(
            merged.start_date,
            Some(Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(merged.last_completion_time, None);
        assert!(!merged.video_submitted_today);
    }

    #[test]
    fn test_row_tolerates_missing_columns() {
        let row: ProfileRow = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(row.last_completed_day, None);
        assert_eq!(row.overlay(UserProfile::default()).last_completed_day, 0);
    }
}
