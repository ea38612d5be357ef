use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{AchievementId, LESSON_COUNT};

//
// ─── RULES ─────────────────────────────────────────────────────────────────────
//

/// Derived condition that unlocks an achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementRule {
    /// At least `n` lessons completed.
    LessonsCompleted(u32),
    /// At least `n` completed lessons with a score of 100.
    PerfectScores(u32),
    /// Current or longest streak of at least `n` days.
    StreakDays(u32),
    /// Every lesson of at least one topic completed.
    TopicMastered,
    /// At least one completed lesson in every topic.
    AllTopicsTouched,
    /// At least `n` minutes of recorded lesson time.
    StudyMinutes(u64),
    /// Average score of at least `average` once `min_completed` lessons are done.
    AverageScoreAtLeast { min_completed: u32, average: u8 },
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Static achievement definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub rule: AchievementRule,
}

const CATALOG: &[Achievement] = &[
    Achievement {
        id: "first-steps",
        title: "First Steps",
        description: "Complete your first lesson",
        rule: AchievementRule::LessonsCompleted(1),
    },
    Achievement {
        id: "getting-warmed-up",
        title: "Getting Warmed Up",
        description: "Complete 10 lessons",
        rule: AchievementRule::LessonsCompleted(10),
    },
    Achievement {
        id: "halfway-there",
        title: "Halfway There",
        description: "Complete half of the course",
        rule: AchievementRule::LessonsCompleted(LESSON_COUNT as u32 / 2),
    },
    Achievement {
        id: "pointer-master",
        title: "Pointer Master",
        description: "Complete every lesson",
        rule: AchievementRule::LessonsCompleted(LESSON_COUNT as u32),
    },
    Achievement {
        id: "perfectionist",
        title: "Perfectionist",
        description: "Score 100 on a lesson",
        rule: AchievementRule::PerfectScores(1),
    },
    Achievement {
        id: "flawless-ten",
        title: "Flawless Ten",
        description: "Score 100 on 10 lessons",
        rule: AchievementRule::PerfectScores(10),
    },
    Achievement {
        id: "on-a-roll",
        title: "On a Roll",
        description: "Study 3 days in a row",
        rule: AchievementRule::StreakDays(3),
    },
    Achievement {
        id: "week-warrior",
        title: "Week Warrior",
        description: "Study 7 days in a row",
        rule: AchievementRule::StreakDays(7),
    },
    Achievement {
        id: "topic-master",
        title: "Topic Master",
        description: "Complete every lesson of a topic",
        rule: AchievementRule::TopicMastered,
    },
    Achievement {
        id: "explorer",
        title: "Explorer",
        description: "Complete a lesson in every topic",
        rule: AchievementRule::AllTopicsTouched,
    },
    Achievement {
        id: "dedicated",
        title: "Dedicated",
        description: "Spend an hour in lessons",
        rule: AchievementRule::StudyMinutes(60),
    },
    Achievement {
        id: "marathon",
        title: "Marathon",
        description: "Spend ten hours in lessons",
        rule: AchievementRule::StudyMinutes(600),
    },
    Achievement {
        id: "sharp-mind",
        title: "Sharp Mind",
        description: "Keep a 90+ average over at least 10 lessons",
        rule: AchievementRule::AverageScoreAtLeast {
            min_completed: 10,
            average: 90,
        },
    },
];

impl Achievement {
    /// Built-in achievements, in display order.
    #[must_use]
    pub fn catalog() -> &'static [Achievement] {
        CATALOG
    }

    #[must_use]
    pub fn find(id: &AchievementId) -> Option<&'static Achievement> {
        CATALOG.iter().find(|a| a.id == id.as_str())
    }

    #[must_use]
    pub fn achievement_id(&self) -> AchievementId {
        AchievementId::from(self.id)
    }
}

//
// ─── UNLOCKED ──────────────────────────────────────────────────────────────────
//

/// Persisted marker that an achievement was earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAchievement {
    pub id: AchievementId,
    pub unlocked_at: DateTime<Utc>,
}

impl UnlockedAchievement {
    #[must_use]
    pub fn new(id: AchievementId, unlocked_at: DateTime<Utc>) -> Self {
        Self { id, unlocked_at }
    }
}
