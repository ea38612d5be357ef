use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use quest_core::model::{DEFAULT_DAILY_GOAL, SessionId, StudySession};
use quest_core::time::local_date;
use storage::StateStore;

use crate::Clock;
use crate::error::SessionError;

/// Lessons completed on the learner's current local day against their goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TodayProgress {
    pub date: NaiveDate,
    pub completed_today: u32,
    pub daily_goal: u32,
    pub goal_met: bool,
}

/// Starts, ends and lists study sessions.
#[derive(Clone)]
pub struct StudySessionService {
    clock: Clock,
    store: StateStore,
}

impl StudySessionService {
    #[must_use]
    pub fn new(clock: Clock, store: StateStore) -> Self {
        Self { clock, store }
    }

    /// Open a new session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyActive` if a session is already open.
    /// Returns `SessionError::Storage` if repository access fails.
    pub async fn start(&self) -> Result<StudySession, SessionError> {
        let mut state = self.store.load_state().await?;
        if let Some(open) = state.open_session() {
            warn!(session = %open.id(), "study session already in progress");
            return Err(SessionError::AlreadyActive(open.id()));
        }

        let session = StudySession::start(SessionId::generate(), self.clock.now());
        state.sessions.push(session.clone());
        self.store.save_state(&state).await?;
        info!(session = %session.id(), "study session started");
        Ok(session)
    }

    /// Close the open session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` if nothing is open.
    /// Returns `SessionError::Session` if the clock is behind the start time.
    /// Returns `SessionError::Storage` if repository access fails.
    pub async fn end(&self) -> Result<StudySession, SessionError> {
        let now = self.clock.now();
        let mut state = self.store.load_state().await?;
        let Some(session) = state.open_session_mut() else {
            warn!("no study session to end");
            return Err(SessionError::NoActiveSession);
        };
        session.end(now)?;
        let session = session.clone();
        self.store.save_state(&state).await?;
        info!(
            session = %session.id(),
            lessons = session.lessons().len(),
            minutes = session.duration(now).num_minutes(),
            "study session ended"
        );
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` if repository access fails.
    pub async fn current(&self) -> Result<Option<StudySession>, SessionError> {
        let state = self.store.load_state().await?;
        Ok(state.open_session().cloned())
    }

    /// Sessions newest first, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if repository access fails.
    pub async fn history(&self, limit: usize) -> Result<Vec<StudySession>, SessionError> {
        let mut sessions = self.store.load_state().await?.sessions;
        sessions.sort_by(|a, b| b.started_at().cmp(&a.started_at()));
        sessions.truncate(limit);
        Ok(sessions)
    }

    /// Completions on today's local date compared with the daily goal.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if repository access fails.
    pub async fn today_progress(&self) -> Result<TodayProgress, SessionError> {
        let state = self.store.load_state().await?;
        let offset = state.utc_offset_minutes();
        let today = local_date(self.clock.now(), offset);

        let completed_today = state
            .progress
            .values()
            .filter_map(|r| r.completed_at())
            .filter(|&at| local_date(at, offset) == today)
            .count();
        let completed_today = u32::try_from(completed_today).unwrap_or(u32::MAX);
        let daily_goal = state
            .profile
            .as_ref()
            .map_or(DEFAULT_DAILY_GOAL, |p| p.daily_goal_lessons());

        Ok(TodayProgress {
            date: today,
            completed_today,
            daily_goal,
            goal_met: completed_today >= daily_goal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quest_core::time::fixed_now;
    use storage::Storage;

    #[tokio::test]
    async fn only_one_session_may_be_open() {
        let storage = Storage::in_memory();
        let service = StudySessionService::new(Clock::fixed(fixed_now()), storage.state_store());

        let first = service.start().await.unwrap();
        let err = service.start().await.unwrap_err();
        assert!(matches!(err, SessionError::AlreadyActive(id) if id == first.id()));

        let later = StudySessionService::new(
            Clock::fixed(fixed_now() + Duration::minutes(25)),
            storage.state_store(),
        );
        let ended = later.end().await.unwrap();
        assert_eq!(ended.ended_at(), Some(fixed_now() + Duration::minutes(25)));
        assert!(later.current().await.unwrap().is_none());
        assert!(matches!(later.end().await.unwrap_err(), SessionError::NoActiveSession));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let storage = Storage::in_memory();
        for minutes in [0, 60, 120] {
            let service = StudySessionService::new(
                Clock::fixed(fixed_now() + Duration::minutes(minutes)),
                storage.state_store(),
            );
            service.start().await.unwrap();
            service.end().await.unwrap();
        }

        let service = StudySessionService::new(Clock::fixed(fixed_now()), storage.state_store());
        let history = service.history(2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].started_at(), fixed_now() + Duration::minutes(120));
        assert_eq!(history[1].started_at(), fixed_now() + Duration::minutes(60));
    }

    #[tokio::test]
    async fn today_progress_uses_default_goal_without_profile() {
        let service =
            StudySessionService::new(Clock::fixed(fixed_now()), Storage::in_memory().state_store());
        let today = service.today_progress().await.unwrap();
        assert_eq!(today.completed_today, 0);
        assert_eq!(today.daily_goal, DEFAULT_DAILY_GOAL);
        assert!(!today.goal_met);
        assert_eq!(today.date, fixed_now().date_naive());
    }
}
