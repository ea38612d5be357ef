use quest_core::model::Topic;
use quest_core::stats::{ProgressStats, TopicStats, Totals};
use storage::StateStore;

use crate::Clock;
use crate::error::ProgressServiceError;

/// Read-only dashboard numbers derived from stored progress.
#[derive(Clone)]
pub struct StatsService {
    clock: Clock,
    store: StateStore,
}

impl StatsService {
    #[must_use]
    pub fn new(clock: Clock, store: StateStore) -> Self {
        Self { clock, store }
    }

    /// Compute the full overview as of now, in the learner's local days.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn overview(&self) -> Result<ProgressStats, ProgressServiceError> {
        let state = self.store.load_state().await?;
        Ok(ProgressStats::compute(
            &state.progress,
            state.utc_offset_minutes(),
            self.clock.now(),
        ))
    }

    /// Aggregates for one topic bucket.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn topic(&self, topic: Topic) -> Result<TopicStats, ProgressServiceError> {
        let stats = self.overview().await?;
        let found = stats.topics.into_iter().find(|t| t.topic == topic);
        Ok(found.unwrap_or_else(|| TopicStats {
            topic,
            totals: Totals::compute(std::iter::empty(), u32::from(topic.lesson_count())),
        }))
    }
}
