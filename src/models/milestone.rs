// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Program length and milestone badges.

use serde::Serialize;

/// Length of the program in days.
pub const PROGRAM_DAYS: u32 = 108;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeIcon {
    Shield,
    Crown,
    Award,
    Trophy,
}

/// A badge earned by reaching a given number of completed days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub day: u32,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: BadgeIcon,
}

impl Milestone {
    pub fn is_earned(&self, last_completed_day: u32) -> bool {
        last_completed_day >= self.day
    }
}

pub const MILESTONES: [Milestone; 4] = [
    Milestone {
        day: 7,
        title: "Purification Warrior",
        description: "First Week of Detox",
        icon: BadgeIcon::Shield,
    },
    Milestone {
        day: 37,
        title: "Energy Master",
        description: "Habits Broken",
        icon: BadgeIcon::Crown,
    },
    Milestone {
        day: 79,
        title: "Transformation Guardian",
        description: "New Identity Formed",
        icon: BadgeIcon::Award,
    },
    Milestone {
        day: PROGRAM_DAYS,
        title: "Sacred Completion",
        description: "Master of Senses",
        icon: BadgeIcon::Trophy,
    },
];

/// The first milestone not yet earned, if any.
pub fn next_milestone(last_completed_day: u32) -> Option<&'static Milestone> {
    MILESTONES.iter().find(|m| !m.is_earned(last_completed_day))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milestones_earned_by_completed_days() {
        let earned: Vec<u32> = MILESTONES
            .iter()
            .filter(|m| m.is_earned(37))
            .map(|m| m.day)
            .collect();
        assert_eq!(earned, vec![7, 37]);
    }

    #[test]
    fn test_next_milestone() {
        assert_eq!(next_milestone(0).map(|m| m.day), Some(7));
        assert_eq!(next_milestone(79).map(|m| m.day), Some(108));
        assert!(next_milestone(PROGRAM_DAYS).is_none());
    }
}
