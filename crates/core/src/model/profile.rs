use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest accepted distance from UTC, in minutes (UTC-14:00 / UTC+14:00).
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

pub const DEFAULT_DAILY_GOAL: u32 = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("learner name cannot be empty")]
    EmptyName,

    #[error("daily goal must be > 0")]
    InvalidDailyGoal,

    #[error("utc offset must be within +/-{MAX_UTC_OFFSET_MINUTES} minutes, got {0}")]
    InvalidUtcOffset(i32),
}

/// The local learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    name: String,
    created_at: DateTime<Utc>,
    daily_goal_lessons: u32,
    utc_offset_minutes: i32,
}

#[derive(Clone, Debug, Default)]
pub struct ProfileDraft {
    pub name: Option<String>,
    pub daily_goal_lessons: Option<u32>,
    pub utc_offset_minutes: Option<i32>,
}

impl ProfileDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the draft, filling unset fields from `base` or defaults.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError` if the name is blank, the goal is zero, or the
    /// offset is out of range.
    pub fn validate(
        self,
        base: Option<&LearnerProfile>,
        now: DateTime<Utc>,
    ) -> Result<LearnerProfile, ProfileError> {
        let name = self
            .name
            .map(|name| name.trim().to_string())
            .or_else(|| base.map(|p| p.name.clone()))
            .filter(|name| !name.is_empty())
            .ok_or(ProfileError::EmptyName)?;
        let daily_goal_lessons = self
            .daily_goal_lessons
            .or_else(|| base.map(|p| p.daily_goal_lessons))
            .unwrap_or(DEFAULT_DAILY_GOAL);
        let utc_offset_minutes = self
            .utc_offset_minutes
            .or_else(|| base.map(|p| p.utc_offset_minutes))
            .unwrap_or(0);

        let profile = LearnerProfile {
            name,
            created_at: base.map_or(now, |p| p.created_at),
            daily_goal_lessons,
            utc_offset_minutes,
        };
        profile.validate()?;
        Ok(profile)
    }
}

impl LearnerProfile {
    /// # Errors
    ///
    /// Returns `ProfileError` describing the first invalid field.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::EmptyName);
        }
        if self.daily_goal_lessons == 0 {
            return Err(ProfileError::InvalidDailyGoal);
        }
        if !(-MAX_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&self.utc_offset_minutes) {
            return Err(ProfileError::InvalidUtcOffset(self.utc_offset_minutes));
        }
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn daily_goal_lessons(&self) -> u32 {
        self.daily_goal_lessons
    }

    #[must_use]
    pub fn utc_offset_minutes(&self) -> i32 {
        self.utc_offset_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn extreme_offsets_are_rejected() {
        for offset in [i32::MIN, i32::MAX, MAX_UTC_OFFSET_MINUTES + 1, -MAX_UTC_OFFSET_MINUTES - 1] {
            let profile = LearnerProfile {
                name: "Ada".into(),
                created_at: fixed_now(),
                daily_goal_lessons: 1,
                utc_offset_minutes: offset,
            };
            assert_eq!(profile.validate(), Err(ProfileError::InvalidUtcOffset(offset)));
        }

        let edge = LearnerProfile {
            name: "Ada".into(),
            created_at: fixed_now(),
            daily_goal_lessons: 1,
            utc_offset_minutes: -MAX_UTC_OFFSET_MINUTES,
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn draft_applies_defaults() {
        let profile = ProfileDraft {
            name: Some("  Ada  ".into()),
            ..ProfileDraft::new()
        }
        .validate(None, fixed_now())
        .unwrap();

        assert_eq!(profile.name(), "Ada");
        assert_eq!(profile.daily_goal_lessons(), DEFAULT_DAILY_GOAL);
        assert_eq!(profile.utc_offset_minutes(), 0);
        assert_eq!(profile.created_at(), fixed_now());
    }

    #[test]
    fn draft_keeps_base_fields() {
        let base = ProfileDraft {
            name: Some("Ada".into()),
            daily_goal_lessons: Some(5),
            utc_offset_minutes: Some(-300),
        }
        .validate(None, fixed_now())
        .unwrap();

        let later = fixed_now() + chrono::Duration::days(3);
        let updated = ProfileDraft {
            daily_goal_lessons: Some(2),
            ..ProfileDraft::new()
        }
        .validate(Some(&base), later)
        .unwrap();

        assert_eq!(updated.name(), "Ada");
        assert_eq!(updated.daily_goal_lessons(), 2);
        assert_eq!(updated.utc_offset_minutes(), -300);
        assert_eq!(updated.created_at(), fixed_now());
    }

    #[test]
    fn draft_rejects_invalid_values() {
        let blank = ProfileDraft {
            name: Some("   ".into()),
            ..ProfileDraft::new()
        };
        assert_eq!(
            blank.validate(None, fixed_now()).unwrap_err(),
            ProfileError::EmptyName
        );

        let zero_goal = ProfileDraft {
            name: Some("Ada".into()),
            daily_goal_lessons: Some(0),
            ..ProfileDraft::new()
        };
        assert_eq!(
            zero_goal.validate(None, fixed_now()).unwrap_err(),
            ProfileError::InvalidDailyGoal
        );

        let far_offset = ProfileDraft {
            name: Some("Ada".into()),
            utc_offset_minutes: Some(15 * 60),
            ..ProfileDraft::new()
        };
        assert_eq!(
            far_offset.validate(None, fixed_now()).unwrap_err(),
            ProfileError::InvalidUtcOffset(900)
        );
    }
}
