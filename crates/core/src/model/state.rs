use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    AchievementId, LearnerProfile, LessonId, ProfileError, ProgressError, ProgressRecord,
    SessionId, StudySession, StudySessionError, UnlockedAchievement,
};

/// Schema version written into every state document.
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StateError {
    #[error("malformed state document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported state version {found} (expected {STATE_VERSION})")]
    UnsupportedVersion { found: u32 },

    #[error("achievement {0} is unlocked more than once")]
    DuplicateAchievement(AchievementId),

    #[error("study session {0} appears more than once")]
    DuplicateSession(SessionId),

    #[error("more than one study session is open")]
    MultipleOpenSessions,

    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Session(#[from] StudySessionError),
}

/// Complete learner state, persisted as a single JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestState {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<LearnerProfile>,
    #[serde(default, with = "progress_list")]
    pub progress: BTreeMap<LessonId, ProgressRecord>,
    #[serde(default)]
    pub achievements: Vec<UnlockedAchievement>,
    #[serde(default)]
    pub sessions: Vec<StudySession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
}

impl Default for QuestState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            profile: None,
            progress: BTreeMap::new(),
            achievements: Vec::new(),
            sessions: Vec::new(),
            exported_at: None,
        }
    }
}

impl QuestState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a state document.
    ///
    /// # Errors
    ///
    /// Returns `StateError` for malformed JSON, an unknown version, or any
    /// violated record invariant.
    pub fn from_json(raw: &str) -> Result<Self, StateError> {
        let state: QuestState = serde_json::from_str(raw)?;
        state.validate()?;
        Ok(state)
    }

    /// # Errors
    ///
    /// Returns `StateError::Malformed` if serialization fails.
    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string(self)?)
    }

    /// # Errors
    ///
    /// Returns `StateError::Malformed` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check cross-record invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant as a `StateError`.
    pub fn validate(&self) -> Result<(), StateError> {
        if self.version != STATE_VERSION {
            return Err(StateError::UnsupportedVersion {
                found: self.version,
            });
        }
        if let Some(profile) = &self.profile {
            profile.validate()?;
        }
        for record in self.progress.values() {
            record.validate()?;
        }

        let mut seen = std::collections::HashSet::new();
        for unlocked in &self.achievements {
            if !seen.insert(&unlocked.id) {
                return Err(StateError::DuplicateAchievement(unlocked.id.clone()));
            }
        }

        let mut session_ids = std::collections::HashSet::new();
        for session in &self.sessions {
            session.validate()?;
            if !session_ids.insert(session.id()) {
                return Err(StateError::DuplicateSession(session.id()));
            }
        }
        if self.sessions.iter().filter(|s| s.is_open()).count() > 1 {
            return Err(StateError::MultipleOpenSessions);
        }
        Ok(())
    }

    #[must_use]
    pub fn utc_offset_minutes(&self) -> i32 {
        self.profile
            .as_ref()
            .map_or(0, LearnerProfile::utc_offset_minutes)
    }

    #[must_use]
    pub fn open_session(&self) -> Option<&StudySession> {
        self.sessions.iter().find(|s| s.is_open())
    }

    pub fn open_session_mut(&mut self) -> Option<&mut StudySession> {
        self.sessions.iter_mut().find(|s| s.is_open())
    }

    #[must_use]
    pub fn is_unlocked(&self, id: &AchievementId) -> bool {
        self.achievements.iter().any(|a| &a.id == id)
    }

    /// Fold `incoming` into this state.
    ///
    /// Progress conflicts keep the record attempted most recently. Achievements
    /// keep their earliest unlock. Sessions are joined by id. The local profile
    /// wins unless there is none. If both states have an open session, the
    /// incoming one is closed at its start time.
    pub fn merge(&mut self, incoming: QuestState) {
        let QuestState {
            profile,
            progress,
            achievements,
            sessions,
            ..
        } = incoming;

        if self.profile.is_none() {
            self.profile = profile;
        }

        for (lesson, record) in progress {
            match self.progress.get(&lesson) {
                Some(existing) if existing.last_attempt_at() >= record.last_attempt_at() => {}
                _ => {
                    self.progress.insert(lesson, record);
                }
            }
        }

        for unlocked in achievements {
            match self.achievements.iter_mut().find(|a| a.id == unlocked.id) {
                Some(existing) => {
                    existing.unlocked_at = existing.unlocked_at.min(unlocked.unlocked_at);
                }
                None => self.achievements.push(unlocked),
            }
        }
        self.achievements.sort_by_key(|a| a.unlocked_at);

        for mut session in sessions {
            if self.sessions.iter().any(|s| s.id() == session.id()) {
                continue;
            }
            if session.is_open() && self.open_session().is_some() {
                session.close_at_start();
            }
            self.sessions.push(session);
        }
        self.sessions.sort_by_key(StudySession::started_at);
    }
}

/// Serializes the progress map as a list of records keyed by their own lesson id.
mod progress_list {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::model::{LessonId, ProgressRecord};

    pub fn serialize<S>(
        map: &BTreeMap<LessonId, ProgressRecord>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<LessonId, ProgressRecord>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let records = Vec::<ProgressRecord>::deserialize(deserializer)?;
        let mut map = BTreeMap::new();
        for record in records {
            let lesson = record.lesson_id();
            if map.insert(lesson, record).is_some() {
                return Err(D::Error::custom(format!(
                    "duplicate progress record for lesson {lesson}"
                )));
            }
        }
        Ok(map)
    }
}
