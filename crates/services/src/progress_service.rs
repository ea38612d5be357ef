use tracing::{debug, info};

use quest_core::model::{
    LessonId, LessonSubmission, ProgressRecord, SessionId, UnlockedAchievement,
};
use storage::StateStore;

use crate::Clock;
use crate::achievement_service::unlock_new_achievements;
use crate::error::ProgressServiceError;

/// Outcome of recording one lesson submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub record: ProgressRecord,
    pub newly_unlocked: Vec<UnlockedAchievement>,
    /// Open study session the lesson was attached to, if any.
    pub session_id: Option<SessionId>,
}

/// Records lesson attempts and keeps per-lesson progress.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    store: StateStore,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, store: StateStore) -> Self {
        Self { clock, store }
    }

    /// Record a submission for `lesson`, then re-evaluate achievements.
    ///
    /// The first submission creates the record; later ones overwrite the
    /// score and completion flag, add the time spent and bump the attempt
    /// count. A completed lesson is also attached to the open study session.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if loading or saving fails.
    pub async fn record_submission(
        &self,
        lesson: LessonId,
        submission: LessonSubmission,
    ) -> Result<SubmissionResult, ProgressServiceError> {
        let now = self.clock.now();
        let mut state = self.store.load_state().await?;

        let record = match state.progress.get_mut(&lesson) {
            Some(record) => {
                record.apply(submission, now);
                record.clone()
            }
            None => {
                let record = ProgressRecord::start(lesson, submission, now);
                state.progress.insert(lesson, record.clone());
                record
            }
        };

        let session_id = match state.open_session_mut() {
            Some(session) if record.completed() => {
                session.record_lesson(lesson);
                Some(session.id())
            }
            _ => None,
        };

        let newly_unlocked = unlock_new_achievements(&mut state, now);
        self.store.save_state(&state).await?;

        info!(
            lesson = %lesson,
            completed = record.completed(),
            score = record.score().value(),
            attempts = record.attempts(),
            unlocked = newly_unlocked.len(),
            "lesson submission recorded"
        );

        Ok(SubmissionResult {
            record,
            newly_unlocked,
            session_id,
        })
    }

    /// Fetch progress for one lesson.
    ///
    /// Returns `Ok(None)` when the lesson was never attempted.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn lesson_progress(
        &self,
        lesson: LessonId,
    ) -> Result<Option<ProgressRecord>, ProgressServiceError> {
        let state = self.store.load_state().await?;
        Ok(state.progress.get(&lesson).cloned())
    }

    /// All attempted lessons in lesson order.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn all_progress(&self) -> Result<Vec<ProgressRecord>, ProgressServiceError> {
        let state = self.store.load_state().await?;
        Ok(state.progress.into_values().collect())
    }

    /// Replace the notes on an attempted lesson. Blank notes clear them.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotStarted` if the lesson has no record.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn set_notes(
        &self,
        lesson: LessonId,
        notes: Option<String>,
    ) -> Result<ProgressRecord, ProgressServiceError> {
        let mut state = self.store.load_state().await?;
        let record = state
            .progress
            .get_mut(&lesson)
            .ok_or(ProgressServiceError::NotStarted(lesson))?;
        record.set_notes(notes);
        let record = record.clone();
        self.store.save_state(&state).await?;
        debug!(lesson = %lesson, has_notes = record.notes().is_some(), "notes updated");
        Ok(record)
    }

    /// Forget all progress on one lesson. Unlocked achievements are kept.
    ///
    /// Returns whether a record existed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn reset_lesson(&self, lesson: LessonId) -> Result<bool, ProgressServiceError> {
        let mut state = self.store.load_state().await?;
        if state.progress.remove(&lesson).is_none() {
            return Ok(false);
        }
        self.store.save_state(&state).await?;
        info!(lesson = %lesson, "lesson progress reset");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_core::time::fixed_now;
    use storage::Storage;

    fn service() -> ProgressService {
        ProgressService::new(Clock::fixed(fixed_now()), Storage::in_memory().state_store())
    }

    fn lesson(n: u16) -> LessonId {
        LessonId::new(n).unwrap()
    }

    #[tokio::test]
    async fn repeat_submissions_accumulate() {
        let service = service();
        service
            .record_submission(lesson(5), LessonSubmission::new(false, 40, 100).unwrap())
            .await
            .unwrap();
        let result = service
            .record_submission(lesson(5), LessonSubmission::new(true, 90, 50).unwrap())
            .await
            .unwrap();

        assert_eq!(result.record.attempts(), 2);
        assert_eq!(result.record.time_spent_seconds(), 150);
        assert_eq!(result.record.score().value(), 90);
        assert!(result.record.completed());
        assert_eq!(result.session_id, None);

        let stored = service.lesson_progress(lesson(5)).await.unwrap().unwrap();
        assert_eq!(stored, result.record);
    }

    #[tokio::test]
    async fn notes_require_an_attempt() {
        let service = service();
        let err = service
            .set_notes(lesson(7), Some("remember Box::leak".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::NotStarted(l) if l == lesson(7)));

        service
            .record_submission(lesson(7), LessonSubmission::new(true, 80, 10).unwrap())
            .await
            .unwrap();
        let record = service
            .set_notes(lesson(7), Some("  remember Box::leak ".into()))
            .await
            .unwrap();
        assert_eq!(record.notes(), Some("remember Box::leak"));
    }

    #[tokio::test]
    async fn reset_lesson_keeps_achievements() {
        let service = service();
        let result = service
            .record_submission(lesson(1), LessonSubmission::new(true, 100, 10).unwrap())
            .await
            .unwrap();
        assert!(!result.newly_unlocked.is_empty());

        assert!(service.reset_lesson(lesson(1)).await.unwrap());
        assert!(!service.reset_lesson(lesson(1)).await.unwrap());
        assert!(service.all_progress().await.unwrap().is_empty());

        let state = service.store.load_state().await.unwrap();
        assert_eq!(state.achievements.len(), result.newly_unlocked.len());
    }
}
