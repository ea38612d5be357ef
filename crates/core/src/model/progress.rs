use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::LessonId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("score must be between 0 and {max}, got {value}")]
    ScoreOutOfRange { value: u32, max: u8 },

    #[error("lesson {0} has no attempts recorded")]
    NoAttempts(LessonId),

    #[error("lesson {0} is completed but has no completion time")]
    MissingCompletionTime(LessonId),

    #[error("lesson {0} is not completed but has a completion time")]
    UnexpectedCompletionTime(LessonId),

    #[error("lesson {0} has a last attempt before its first attempt")]
    InvalidTimeRange(LessonId),
}

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

pub const MAX_SCORE: u8 = 100;

/// Quiz score in percent (0..=100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u8")]
pub struct Score(u8);

impl Score {
    /// # Errors
    ///
    /// Returns `ProgressError::ScoreOutOfRange` for values above 100.
    pub fn new(value: u8) -> Result<Self, ProgressError> {
        Self::try_from(u32::from(value))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_perfect(self) -> bool {
        self.0 == MAX_SCORE
    }
}

impl TryFrom<u32> for Score {
    type Error = ProgressError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(v) if v <= MAX_SCORE => Ok(Self(v)),
            _ => Err(ProgressError::ScoreOutOfRange {
                value,
                max: MAX_SCORE,
            }),
        }
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

/// One finished attempt at a lesson, as reported by the lesson UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonSubmission {
    pub completed: bool,
    pub score: Score,
    pub time_spent_seconds: u64,
}

impl LessonSubmission {
    /// # Errors
    ///
    /// Returns `ProgressError::ScoreOutOfRange` when `score` exceeds 100.
    pub fn new(completed: bool, score: u8, time_spent_seconds: u64) -> Result<Self, ProgressError> {
        Ok(Self {
            completed,
            score: Score::new(score)?,
            time_spent_seconds,
        })
    }
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// Persisted completion entry for a single lesson.
///
/// A record is created on the first submission and overwritten by later ones;
/// only `attempts` and `time_spent_seconds` accumulate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    lesson_id: LessonId,
    completed: bool,
    score: Score,
    time_spent_seconds: u64,
    attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    first_attempt_at: DateTime<Utc>,
    last_attempt_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Create the record for a lesson's first submission.
    #[must_use]
    pub fn start(lesson_id: LessonId, submission: LessonSubmission, at: DateTime<Utc>) -> Self {
        Self {
            lesson_id,
            completed: submission.completed,
            score: submission.score,
            time_spent_seconds: submission.time_spent_seconds,
            attempts: 1,
            notes: None,
            first_attempt_at: at,
            last_attempt_at: at,
            completed_at: submission.completed.then_some(at),
        }
    }

    /// Overwrite the record with a newer submission.
    pub fn apply(&mut self, submission: LessonSubmission, at: DateTime<Utc>) {
        self.completed = submission.completed;
        self.score = submission.score;
        self.time_spent_seconds = self
            .time_spent_seconds
            .saturating_add(submission.time_spent_seconds);
        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt_at = self.last_attempt_at.max(at);
        self.completed_at = submission.completed.then_some(at);
    }

    /// Replace the learner's notes. Blank notes clear the field.
    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
    }

    /// Check invariants of a record loaded from an untrusted document.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` describing the first violated invariant.
    pub fn validate(&self) -> Result<(), ProgressError> {
        if self.attempts == 0 {
            return Err(ProgressError::NoAttempts(self.lesson_id));
        }
        if self.completed && self.completed_at.is_none() {
            return Err(ProgressError::MissingCompletionTime(self.lesson_id));
        }
        if !self.completed && self.completed_at.is_some() {
            return Err(ProgressError::UnexpectedCompletionTime(self.lesson_id));
        }
        if self.last_attempt_at < self.first_attempt_at {
            return Err(ProgressError::InvalidTimeRange(self.lesson_id));
        }
        Ok(())
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn score(&self) -> Score {
        self.score
    }

    #[must_use]
    pub fn time_spent_seconds(&self) -> u64 {
        self.time_spent_seconds
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    #[must_use]
    pub fn first_attempt_at(&self) -> DateTime<Utc> {
        self.first_attempt_at
    }

    #[must_use]
    pub fn last_attempt_at(&self) -> DateTime<Utc> {
        self.last_attempt_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
