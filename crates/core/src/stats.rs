use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::model::{LESSON_COUNT, LessonId, ProgressRecord, Topic};
use crate::streak::StreakSummary;
use crate::time::local_date;

/// Number of trailing days reported in `ProgressStats::daily_activity`.
pub const ACTIVITY_WINDOW_DAYS: u32 = 7;

/// Number of entries reported in `ProgressStats::recent`.
pub const RECENT_LIMIT: usize = 5;

//
// ─── AGGREGATES ────────────────────────────────────────────────────────────────
//

/// Aggregate over a set of records scoped to `total_lessons` lessons.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub total_lessons: u32,
    pub attempted: u32,
    pub completed: u32,
    pub completion_rate: f64,
    pub average_score: f64,
    pub perfect_scores: u32,
    pub total_time_seconds: u64,
    pub total_attempts: u64,
}

impl Totals {
    #[must_use]
    pub fn compute<'a>(
        records: impl IntoIterator<Item = &'a ProgressRecord>,
        total_lessons: u32,
    ) -> Self {
        let mut attempted = 0_u32;
        let mut completed = 0_u32;
        let mut score_sum = 0_u64;
        let mut perfect_scores = 0_u32;
        let mut total_time_seconds = 0_u64;
        let mut total_attempts = 0_u64;

        for record in records {
            attempted = attempted.saturating_add(1);
            total_time_seconds = total_time_seconds.saturating_add(record.time_spent_seconds());
            total_attempts = total_attempts.saturating_add(u64::from(record.attempts()));
            if record.completed() {
                completed = completed.saturating_add(1);
                score_sum += u64::from(record.score().value());
                if record.score().is_perfect() {
                    perfect_scores = perfect_scores.saturating_add(1);
                }
            }
        }

        Self {
            total_lessons,
            attempted,
            completed,
            completion_rate: completion_rate(completed, total_lessons),
            average_score: average(score_sum, completed),
            perfect_scores,
            total_time_seconds,
            total_attempts,
        }
    }
}

/// `completed / total * 100`, or zero for an empty scope.
#[must_use]
pub fn completion_rate(completed: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(completed) / f64::from(total) * 100.0
}

#[allow(clippy::cast_precision_loss)]
fn average(sum: u64, count: u32) -> f64 {
    if count == 0 {
        return 0.0;
    }
    sum as f64 / f64::from(count)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicStats {
    pub topic: Topic,
    pub totals: Totals,
}

impl TopicStats {
    /// Whether every lesson in the bucket is completed.
    #[must_use]
    pub fn is_mastered(&self) -> bool {
        self.totals.completed == self.totals.total_lessons
    }
}

/// Completions on one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub completed: u32,
}

/// Short view of a recently completed lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentCompletion {
    pub lesson_id: LessonId,
    pub topic: Topic,
    pub score: u8,
    pub completed_at: DateTime<Utc>,
}

//
// ─── OVERVIEW ──────────────────────────────────────────────────────────────────
//

/// Everything the dashboard derives from the record set.
///
/// Pure function of its inputs: computing twice over the same records and
/// instant yields equal values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressStats {
    pub overall: Totals,
    pub streak: StreakSummary,
    pub topics: Vec<TopicStats>,
    pub daily_activity: Vec<DailyActivity>,
    pub recent: Vec<RecentCompletion>,
}

impl ProgressStats {
    #[must_use]
    pub fn compute(
        records: &BTreeMap<LessonId, ProgressRecord>,
        utc_offset_minutes: i32,
        now: DateTime<Utc>,
    ) -> Self {
        let topics = Topic::ALL
            .iter()
            .map(|&topic| TopicStats {
                topic,
                totals: Totals::compute(
                    records.values().filter(|r| topic.contains(r.lesson_id())),
                    u32::from(topic.lesson_count()),
                ),
            })
            .collect();

        Self {
            overall: Totals::compute(records.values(), u32::from(LESSON_COUNT)),
            streak: StreakSummary::compute(records.values(), utc_offset_minutes, now),
            topics,
            daily_activity: daily_activity(
                records.values(),
                utc_offset_minutes,
                ACTIVITY_WINDOW_DAYS,
                now,
            ),
            recent: recent_completions(records.values(), RECENT_LIMIT),
        }
    }

    #[must_use]
    pub fn topic(&self, topic: Topic) -> Option<&TopicStats> {
        self.topics.iter().find(|t| t.topic == topic)
    }
}

/// Completions per local day for the `days` days ending today, oldest first.
#[must_use]
pub fn daily_activity<'a>(
    records: impl IntoIterator<Item = &'a ProgressRecord>,
    utc_offset_minutes: i32,
    days: u32,
    now: DateTime<Utc>,
) -> Vec<DailyActivity> {
    let today = local_date(now, utc_offset_minutes);
    let mut counts: BTreeMap<NaiveDate, u32> = (0..days)
        .map(|back| (today - Duration::days(i64::from(back)), 0))
        .collect();

    for at in records
        .into_iter()
        .filter(|r| r.completed())
        .filter_map(ProgressRecord::completed_at)
    {
        if let Some(count) = counts.get_mut(&local_date(at, utc_offset_minutes)) {
            *count += 1;
        }
    }

    counts
        .into_iter()
        .map(|(date, completed)| DailyActivity { date, completed })
        .collect()
}

/// Most recently completed lessons, newest first.
#[must_use]
pub fn recent_completions<'a>(
    records: impl IntoIterator<Item = &'a ProgressRecord>,
    limit: usize,
) -> Vec<RecentCompletion> {
    let mut done: Vec<_> = records
        .into_iter()
        .filter(|r| r.completed())
        .filter_map(|r| {
            r.completed_at().map(|completed_at| RecentCompletion {
                lesson_id: r.lesson_id(),
                topic: Topic::for_lesson(r.lesson_id()),
                score: r.score().value(),
                completed_at,
            })
        })
        .collect();
    done.sort_by(|a, b| {
        b.completed_at
            .cmp(&a.completed_at)
            .then(a.lesson_id.cmp(&b.lesson_id))
    });
    done.truncate(limit);
    done
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LessonSubmission;
    use crate::time::fixed_now;

    fn lesson(n: u16) -> LessonId {
        LessonId::new(n).unwrap()
    }

    fn records(entries: &[(u16, bool, u8, i64)]) -> BTreeMap<LessonId, ProgressRecord> {
        entries
            .iter()
            .map(|&(n, completed, score, days_ago)| {
                let at = fixed_now() - Duration::days(days_ago);
                let submission = LessonSubmission::new(completed, score, 300).unwrap();
                (lesson(n), ProgressRecord::start(lesson(n), submission, at))
            })
            .collect()
    }

    #[test]
    fn empty_records_yield_zeroes() {
        let stats = ProgressStats::compute(&BTreeMap::new(), 0, fixed_now());
        assert_eq!(stats.overall.completed, 0);
        assert_eq!(stats.overall.completion_rate, 0.0);
        assert_eq!(stats.overall.average_score, 0.0);
        assert_eq!(stats.streak.current, 0);
        assert_eq!(stats.topics.len(), Topic::ALL.len());
        assert_eq!(stats.daily_activity.len(), ACTIVITY_WINDOW_DAYS as usize);
        assert!(stats.recent.is_empty());
    }

    #[test]
    fn overall_totals_use_catalog_size() {
        let set = records(&[(1, true, 100, 0), (2, true, 80, 1), (3, false, 20, 0)]);
        let stats = ProgressStats::compute(&set, 0, fixed_now());

        assert_eq!(stats.overall.attempted, 3);
        assert_eq!(stats.overall.completed, 2);
        assert!((stats.overall.completion_rate - 2.0 / 120.0 * 100.0).abs() < 1e-9);
        assert!((stats.overall.average_score - 90.0).abs() < 1e-9);
        assert_eq!(stats.overall.perfect_scores, 1);
        assert_eq!(stats.overall.total_time_seconds, 900);
        assert_eq!(stats.overall.total_attempts, 3);
    }

    #[test]
    fn topic_buckets_aggregate_their_range() {
        let set = records(&[(1, true, 100, 0), (20, true, 50, 0), (21, true, 70, 0)]);
        let stats = ProgressStats::compute(&set, 0, fixed_now());

        let raw = stats.topic(Topic::RawPointers).unwrap();
        assert_eq!(raw.totals.completed, 2);
        assert_eq!(raw.totals.total_lessons, 20);
        assert!((raw.totals.completion_rate - 10.0).abs() < 1e-9);
        assert!((raw.totals.average_score - 75.0).abs() < 1e-9);

        let smart = stats.topic(Topic::SmartPointers).unwrap();
        assert_eq!(smart.totals.completed, 1);
        assert!(!smart.is_mastered());
    }

    #[test]
    fn recomputation_is_idempotent() {
        let set = records(&[(1, true, 100, 0), (30, true, 60, 2), (90, false, 10, 5)]);
        let first = ProgressStats::compute(&set, 60, fixed_now());
        let second = ProgressStats::compute(&set, 60, fixed_now());
        assert_eq!(first, second);
    }

    #[test]
    fn daily_activity_buckets_last_week() {
        let set = records(&[(1, true, 90, 0), (2, true, 90, 0), (3, true, 90, 6), (4, true, 90, 7)]);
        let activity = daily_activity(set.values(), 0, 7, fixed_now());

        assert_eq!(activity.len(), 7);
        assert_eq!(activity.last().unwrap().completed, 2);
        assert_eq!(activity.first().unwrap().completed, 1);
        let total: u32 = activity.iter().map(|d| d.completed).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn recent_completions_are_newest_first() {
        let set = records(&[(1, true, 90, 3), (2, true, 80, 1), (3, false, 0, 0), (4, true, 70, 2)]);
        let recent = recent_completions(set.values(), 2);
        let ids: Vec<_> = recent.iter().map(|r| r.lesson_id.value()).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn recent_completions_agree_with_completed_totals() {
        let json = r#"{
            "lessonId": 9, "completed": false, "score": 20, "timeSpentSeconds": 10,
            "attempts": 1, "firstAttemptAt": "2023-11-14T22:13:20Z",
            "lastAttemptAt": "2023-11-14T22:13:20Z", "completedAt": "2023-11-14T22:13:20Z"
        }"#;
        let stray: ProgressRecord = serde_json::from_str(json).unwrap();
        let mut set = records(&[(1, true, 90, 0)]);
        set.insert(lesson(9), stray);

        let stats = ProgressStats::compute(&set, 0, fixed_now());
        assert_eq!(stats.overall.completed, 1);
        assert_eq!(stats.recent.len(), 1);
        assert_eq!(stats.recent[0].lesson_id, lesson(1));
    }
}
