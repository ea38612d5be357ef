use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonId, SessionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudySessionError {
    #[error("study session {0} has already ended")]
    AlreadyEnded(SessionId),

    #[error("study session {0} ends before it starts")]
    InvalidTimeRange(SessionId),
}

/// A contiguous stretch of study, started and ended explicitly by the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    id: SessionId,
    started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    lessons: Vec<LessonId>,
}

impl StudySession {
    #[must_use]
    pub fn start(id: SessionId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            started_at,
            ended_at: None,
            lessons: Vec::new(),
        }
    }

    /// Note a lesson completed during this session. Repeats are ignored.
    pub fn record_lesson(&mut self, lesson: LessonId) {
        if !self.lessons.contains(&lesson) {
            self.lessons.push(lesson);
        }
    }

    /// Close the session.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionError::AlreadyEnded` if the session is closed, or
    /// `StudySessionError::InvalidTimeRange` if `at` precedes the start.
    pub fn end(&mut self, at: DateTime<Utc>) -> Result<(), StudySessionError> {
        if self.ended_at.is_some() {
            return Err(StudySessionError::AlreadyEnded(self.id));
        }
        if at < self.started_at {
            return Err(StudySessionError::InvalidTimeRange(self.id));
        }
        self.ended_at = Some(at);
        Ok(())
    }

    /// Close an open session with zero duration. Closed sessions are unchanged.
    pub fn close_at_start(&mut self) {
        if self.ended_at.is_none() {
            self.ended_at = Some(self.started_at);
        }
    }

    /// # Errors
    ///
    /// Returns `StudySessionError::InvalidTimeRange` if the session ends before it starts.
    pub fn validate(&self) -> Result<(), StudySessionError> {
        match self.ended_at {
            Some(end) if end < self.started_at => Err(StudySessionError::InvalidTimeRange(self.id)),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn lessons(&self) -> &[LessonId] {
        &self.lessons
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Elapsed time; open sessions are measured up to `now`.
    #[must_use]
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        let end = self.ended_at.unwrap_or(now);
        (end - self.started_at).max(Duration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn close_at_start_only_touches_open_sessions() {
        let mut open = StudySession::start(SessionId::generate(), fixed_now());
        open.close_at_start();
        assert_eq!(open.ended_at(), Some(fixed_now()));
        assert!(open.validate().is_ok());

        let mut ended = StudySession::start(SessionId::generate(), fixed_now());
        let end = fixed_now() + Duration::minutes(30);
        ended.end(end).unwrap();
        ended.close_at_start();
        assert_eq!(ended.ended_at(), Some(end));
    }

    #[test]
    fn session_records_lessons_once() {
        let mut session = StudySession::start(SessionId::generate(), fixed_now());
        let lesson = LessonId::new(4).unwrap();
        session.record_lesson(lesson);
        session.record_lesson(lesson);
        assert_eq!(session.lessons(), &[lesson]);
    }

    #[test]
    fn session_ends_once() {
        let now = fixed_now();
        let mut session = StudySession::start(SessionId::generate(), now);
        assert!(session.is_open());

        let end = now + Duration::minutes(25);
        session.end(end).unwrap();
        assert!(!session.is_open());
        assert_eq!(session.duration(end + Duration::hours(1)), Duration::minutes(25));

        let err = session.end(end).unwrap_err();
        assert!(matches!(err, StudySessionError::AlreadyEnded(_)));
    }

    #[test]
    fn session_cannot_end_before_start() {
        let now = fixed_now();
        let mut session = StudySession::start(SessionId::generate(), now);
        let err = session.end(now - Duration::seconds(1)).unwrap_err();
        assert!(matches!(err, StudySessionError::InvalidTimeRange(_)));
        assert!(session.is_open());
    }
}
