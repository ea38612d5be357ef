use chrono::{DateTime, Utc};
use tracing::info;

use quest_core::achievements::{self, AchievementProgress};
use quest_core::model::{QuestState, UnlockedAchievement};
use quest_core::stats::ProgressStats;
use storage::StateStore;

use crate::Clock;
use crate::error::ProgressServiceError;

/// Evaluate the catalog against `state` and record anything newly earned.
///
/// Returns only the achievements unlocked by this call.
pub(crate) fn unlock_new_achievements(
    state: &mut QuestState,
    now: DateTime<Utc>,
) -> Vec<UnlockedAchievement> {
    let stats = ProgressStats::compute(&state.progress, state.utc_offset_minutes(), now);
    let unlocked = achievements::evaluate(state, &stats, now);
    for achievement in &unlocked {
        info!(id = %achievement.id, "achievement unlocked");
    }
    state.achievements.extend(unlocked.iter().cloned());
    unlocked
}

/// Read and refresh the learner's achievements.
#[derive(Clone)]
pub struct AchievementService {
    clock: Clock,
    store: StateStore,
}

impl AchievementService {
    #[must_use]
    pub fn new(clock: Clock, store: StateStore) -> Self {
        Self { clock, store }
    }

    /// Every catalog achievement with progress and unlock time.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` on repository failures.
    pub async fn list(&self) -> Result<Vec<AchievementProgress>, ProgressServiceError> {
        let state = self.store.load_state().await?;
        let stats =
            ProgressStats::compute(&state.progress, state.utc_offset_minutes(), self.clock.now());
        Ok(achievements::progress_report(&state, &stats))
    }

    /// Unlocked achievements in unlock order.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` on repository failures.
    pub async fn unlocked(&self) -> Result<Vec<UnlockedAchievement>, ProgressServiceError> {
        let mut unlocked = self.store.load_state().await?.achievements;
        unlocked.sort_by_key(|a| a.unlocked_at);
        Ok(unlocked)
    }

    /// Evaluate conditions now and persist anything newly unlocked.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` on repository failures.
    pub async fn check(&self) -> Result<Vec<UnlockedAchievement>, ProgressServiceError> {
        let mut state = self.store.load_state().await?;
        let unlocked = unlock_new_achievements(&mut state, self.clock.now());
        if !unlocked.is_empty() {
            self.store.save_state(&state).await?;
        }
        Ok(unlocked)
    }
}
