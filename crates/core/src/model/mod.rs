mod achievement;
mod ids;
mod profile;
mod progress;
mod session;
mod state;
mod topic;

pub use ids::{AchievementId, LESSON_COUNT, LessonError, LessonId, ParseIdError, SessionId};

pub use achievement::{Achievement, AchievementRule, UnlockedAchievement};
pub use profile::{
    DEFAULT_DAILY_GOAL, LearnerProfile, MAX_UTC_OFFSET_MINUTES, ProfileDraft, ProfileError,
};
pub use progress::{LessonSubmission, MAX_SCORE, ProgressError, ProgressRecord, Score};
pub use session::{StudySession, StudySessionError};
pub use state::{QuestState, STATE_VERSION, StateError};
pub use topic::Topic;
