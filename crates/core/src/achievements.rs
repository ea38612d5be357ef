use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Achievement, AchievementRule, QuestState, UnlockedAchievement};
use crate::stats::ProgressStats;

/// How far the learner is from an achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AchievementProgress {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub current: u64,
    pub target: u64,
}

impl AchievementProgress {
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }

    /// Percentage toward the target, capped at 100.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.target == 0 || self.current >= self.target {
            return 100.0;
        }
        self.current as f64 / self.target as f64 * 100.0
    }
}

/// `(current, target)` for a rule against precomputed stats.
#[must_use]
pub fn measure(rule: AchievementRule, stats: &ProgressStats) -> (u64, u64) {
    let overall = &stats.overall;
    match rule {
        AchievementRule::LessonsCompleted(n) => (u64::from(overall.completed), u64::from(n)),
        AchievementRule::PerfectScores(n) => (u64::from(overall.perfect_scores), u64::from(n)),
        AchievementRule::StreakDays(n) => (
            u64::from(stats.streak.current.max(stats.streak.longest)),
            u64::from(n),
        ),
        AchievementRule::TopicMastered => {
            let best = stats
                .topics
                .iter()
                .map(|t| {
                    crate::stats::completion_rate(t.totals.completed, t.totals.total_lessons)
                })
                .fold(0.0_f64, f64::max);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let percent = best.floor() as u64;
            (percent, 100)
        }
        AchievementRule::AllTopicsTouched => {
            let touched = stats.topics.iter().filter(|t| t.totals.completed > 0).count();
            (touched as u64, stats.topics.len() as u64)
        }
        AchievementRule::StudyMinutes(n) => (overall.total_time_seconds / 60, n),
        AchievementRule::AverageScoreAtLeast {
            min_completed,
            average,
        } => {
            if overall.completed < min_completed {
                return (u64::from(overall.completed), u64::from(min_completed));
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let current = overall.average_score.floor() as u64;
            (current, u64::from(average))
        }
    }
}

/// Whether the rule's condition holds for the given stats.
#[must_use]
pub fn is_satisfied(rule: AchievementRule, stats: &ProgressStats) -> bool {
    let (current, target) = measure(rule, stats);
    match rule {
        AchievementRule::AverageScoreAtLeast { min_completed, .. } => {
            stats.overall.completed >= min_completed && current >= target
        }
        _ => current >= target,
    }
}

/// Achievements whose condition is true now and that `state` has not unlocked yet.
#[must_use]
pub fn evaluate(
    state: &QuestState,
    stats: &ProgressStats,
    now: DateTime<Utc>,
) -> Vec<UnlockedAchievement> {
    Achievement::catalog()
        .iter()
        .filter(|a| !state.is_unlocked(&a.achievement_id()))
        .filter(|a| is_satisfied(a.rule, stats))
        .map(|a| UnlockedAchievement::new(a.achievement_id(), now))
        .collect()
}

/// Progress toward every catalog entry, in catalog order.
#[must_use]
pub fn progress_report(state: &QuestState, stats: &ProgressStats) -> Vec<AchievementProgress> {
    Achievement::catalog()
        .iter()
        .map(|a| {
            let (current, target) = measure(a.rule, stats);
            let unlocked_at = state
                .achievements
                .iter()
                .find(|u| u.id.as_str() == a.id)
                .map(|u| u.unlocked_at);
            AchievementProgress {
                id: a.id,
                title: a.title,
                description: a.description,
                unlocked_at,
                current,
                target,
            }
        })
        .collect()
}
