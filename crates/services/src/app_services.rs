use std::sync::Arc;

use storage::Storage;

use crate::Clock;
use crate::achievement_service::AchievementService;
use crate::data_service::DataManagementService;
use crate::error::AppServicesError;
use crate::profile_service::ProfileService;
use crate::progress_service::ProgressService;
use crate::stats_service::StatsService;
use crate::study_session_service::StudySessionService;

/// Assembles every service over one storage backend.
#[derive(Clone)]
pub struct QuestServices {
    progress: Arc<ProgressService>,
    stats: Arc<StatsService>,
    achievements: Arc<AchievementService>,
    sessions: Arc<StudySessionService>,
    profile: Arc<ProfileService>,
    data: Arc<DataManagementService>,
}

impl QuestServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let store = storage.state_store();
        Self {
            progress: Arc::new(ProgressService::new(clock, store.clone())),
            stats: Arc::new(StatsService::new(clock, store.clone())),
            achievements: Arc::new(AchievementService::new(clock, store.clone())),
            sessions: Arc::new(StudySessionService::new(clock, store.clone())),
            profile: Arc::new(ProfileService::new(clock, store.clone())),
            data: Arc::new(DataManagementService::new(clock, store)),
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn stats(&self) -> Arc<StatsService> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn achievements(&self) -> Arc<AchievementService> {
        Arc::clone(&self.achievements)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<StudySessionService> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn profile(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profile)
    }

    #[must_use]
    pub fn data(&self) -> Arc<DataManagementService> {
        Arc::clone(&self.data)
    }
}
