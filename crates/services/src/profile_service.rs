use tracing::info;

use quest_core::model::{LearnerProfile, ProfileDraft};
use storage::StateStore;

use crate::Clock;
use crate::error::ProfileServiceError;

#[derive(Clone)]
pub struct ProfileService {
    clock: Clock,
    store: StateStore,
}

impl ProfileService {
    #[must_use]
    pub fn new(clock: Clock, store: StateStore) -> Self {
        Self { clock, store }
    }

    /// Stored profile, if the learner has set one up.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` if repository access fails.
    pub async fn load(&self) -> Result<Option<LearnerProfile>, ProfileServiceError> {
        Ok(self.store.load_state().await?.profile)
    }

    /// Create or update the profile. Unset draft fields keep their current value.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Profile` if the resulting profile is invalid.
    /// Returns `ProfileServiceError::Storage` if repository access fails.
    pub async fn save(&self, draft: ProfileDraft) -> Result<LearnerProfile, ProfileServiceError> {
        let mut state = self.store.load_state().await?;
        let profile = draft.validate(state.profile.as_ref(), self.clock.now())?;
        state.profile = Some(profile.clone());
        self.store.save_state(&state).await?;
        info!(
            goal = profile.daily_goal_lessons(),
            utc_offset = profile.utc_offset_minutes(),
            "profile saved"
        );
        Ok(profile)
    }
}
