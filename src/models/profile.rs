// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile model and typed partial updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress of one user through the program, as persisted on the device.
///
/// `Default` is the fixed initial state of a device that has never run the
/// program: unauthenticated, unpaid, day 0, unlocked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Remote account ID, set once authenticated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Age collected during onboarding
    #[serde(default)]
    pub age: Option<u32>,
    /// Why the user is doing the program (onboarding answer)
    #[serde(default)]
    pub reason: Option<String>,
    /// Sign-in e-mail (local only, never mirrored remotely)
    #[serde(default)]
    pub email: Option<String>,
    /// Habits the user is working to drop
    #[serde(default)]
    pub addictions: Vec<String>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub has_paid: bool,
    /// When the program was activated
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Number of days checked in so far
    #[serde(default)]
    pub last_completed_day: u32,
    /// When the most recent check-in happened
    #[serde(default)]
    pub last_completion_time: Option<DateTime<Utc>>,
    /// Set by a check-in, cleared 24 hours later
    #[serde(default)]
    pub video_submitted_today: bool,
}

impl UserProfile {
    /// The day currently being worked on.
    pub fn program_day(&self) -> u32 {
        self.last_completed_day + 1
    }
}

/// Partial update of a [`UserProfile`].
///
/// Every provided field replaces the stored value wholesale; omitted fields are
/// kept. Fields that are optional on the profile are `Option<Option<_>>` here so
/// a patch can clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub id: Option<Option<String>>,
    pub age: Option<Option<u32>>,
    pub reason: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub addictions: Option<Vec<String>>,
    pub is_authenticated: Option<bool>,
    pub has_paid: Option<bool>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub last_completed_day: Option<u32>,
    pub last_completion_time: Option<Option<DateTime<Utc>>>,
    pub video_submitted_today: Option<bool>,
}

impl ProfilePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn id(mut self, id: Option<String>) -> Self {
        self.id = Some(id);
        self
    }

    pub fn age(mut self, age: Option<u32>) -> Self {
        self.age = Some(age);
        self
    }

    pub fn reason(mut self, reason: Option<String>) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn email(mut self, email: Option<String>) -> Self {
        self.email = Some(email);
        self
    }

    pub fn addictions(mut self, addictions: Vec<String>) -> Self {
        self.addictions = Some(addictions);
        self
    }

    pub fn is_authenticated(mut self, value: bool) -> Self {
        self.is_authenticated = Some(value);
        self
    }

    pub fn has_paid(mut self, value: bool) -> Self {
        self.has_paid = Some(value);
        self
    }

    pub fn start_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn last_completed_day(mut self, day: u32) -> Self {
        self.last_completed_day = Some(day);
        self
    }

    pub fn last_completion_time(mut self, time: Option<DateTime<Utc>>) -> Self {
        self.last_completion_time = Some(time);
        self
    }

    pub fn video_submitted_today(mut self, value: bool) -> Self {
        self.video_submitted_today = Some(value);
        self
    }

    /// Apply this patch over `base`, returning the merged profile.
    pub fn apply(self, mut base: UserProfile) -> UserProfile {
        if let Some(id) = self.id {
            base.id = id;
        }
        if let Some(age) = self.age {
            base.age = age;
        }
        if let Some(reason) = self.reason {
            base.reason = reason;
        }
        if let Some(email) = self.email {
            base.email = email;
        }
        if let Some(addictions) = self.addictions {
            base.addictions = addictions;
        }
        if let Some(value) = self.is_authenticated {
            base.is_authenticated = value;
        }
        if let Some(value) = self.has_paid {
            base.has_paid = value;
        }
        if let Some(date) = self.start_date {
            base.start_date = date;
        }
        if let Some(day) = self.last_completed_day {
            base.last_completed_day = day;
        }
        if let Some(time) = self.last_completion_time {
            base.last_completion_time = time;
        }
        if let Some(value) = self.video_submitted_today {
            base.video_submitted_today = value;
        }
        base
    }
}

/// A full replacement: every field of the profile is provided.
impl From<UserProfile> for ProfilePatch {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: Some(profile.id),
            age: Some(profile.age),
            reason: Some(profile.reason),
            email: Some(profile.email),
            addictions: Some(profile.addictions),
            is_authenticated: Some(profile.is_authenticated),
            has_paid: Some(profile.has_paid),
            start_date: Some(profile.start_date),
            last_completed_day: Some(profile.last_completed_day),
            last_completion_time: Some(profile.last_completion_time),
            video_submitted_today: Some(profile.video_submitted_today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> UserProfile {
        UserProfile {
            id: Some("user-1".to_string()),
            age: Some(24),
            reason: Some("quit smoking".to_string()),
            addictions: vec!["smoking".to_string(), "sugar".to_string()],
            is_authenticated: true,
            last_completed_day: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_patch_is_identity() {
        let once = ProfilePatch::new().has_paid(true).apply(sample());
        let twice = ProfilePatch::new().apply(once.clone());
        assert_eq!(once, twice);
        assert!(ProfilePatch::new().is_empty());
    }

    #[test]
    fn test_addictions_are_replaced_not_merged() {
        let updated = ProfilePatch::new().addictions(vec![]).apply(sample());
        assert!(updated.addictions.is_empty());

        let updated = ProfilePatch::new()
            .addictions(vec!["caffeine".to_string()])
            .apply(sample());
        assert_eq!(updated.addictions, vec!["caffeine".to_string()]);
    }

    #[test]
    fn test_optional_fields_can_be_cleared() {
        let updated = ProfilePatch::new().id(None).reason(None).apply(sample());
        assert_eq!(updated.id, None);
        assert_eq!(updated.reason, None);
        assert_eq!(updated.age, Some(24));
    }

    #[test]
    fn test_full_patch_replaces_everything() {
        let replacement = UserProfile {
            start_date: Some(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        let updated = ProfilePatch::from(replacement.clone()).apply(sample());
        assert_eq!(updated, replacement);
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["lastCompletedDay"], 3);
        assert_eq!(json["isAuthenticated"], true);
        assert!(json["lastCompletionTime"].is_null());
    }

    #[test]
    fn test_missing_fields_default_on_read() {
        let profile: UserProfile = serde_json::from_str(r#"{"hasPaid": true}"#).unwrap();
        assert!(profile.has_paid);
        assert_eq!(profile.last_completed_day, 0);
        assert!(profile.addictions.is_empty());
        assert_eq!(profile.program_day(), 1);
    }
}
