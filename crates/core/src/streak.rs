//! Consecutive-day activity streaks.
//!
//! A day counts when at least one lesson was completed on it. Days are local
//! calendar dates derived from the learner's UTC offset, so a completion at
//! 23:59 and one at 00:01 local time land on consecutive days regardless of
//! their UTC dates.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::model::ProgressRecord;
use crate::time::local_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StreakSummary {
    pub current: u32,
    pub longest: u32,
    pub last_active: Option<NaiveDate>,
}

impl StreakSummary {
    /// Compute both streaks for `records` as of `now`.
    #[must_use]
    pub fn compute<'a>(
        records: impl IntoIterator<Item = &'a ProgressRecord>,
        utc_offset_minutes: i32,
        now: DateTime<Utc>,
    ) -> Self {
        let dates = activity_dates(records, utc_offset_minutes);
        let today = local_date(now, utc_offset_minutes);
        Self {
            current: current_streak(&dates, today),
            longest: longest_streak(&dates),
            last_active: dates.last().copied(),
        }
    }
}

/// Distinct local dates with at least one completion.
#[must_use]
pub fn activity_dates<'a>(
    records: impl IntoIterator<Item = &'a ProgressRecord>,
    utc_offset_minutes: i32,
) -> BTreeSet<NaiveDate> {
    records
        .into_iter()
        .filter(|record| record.completed())
        .filter_map(ProgressRecord::completed_at)
        .map(|at| local_date(at, utc_offset_minutes))
        .collect()
}

/// Days in the run ending today or yesterday; zero once a full day is missed.
///
/// Dates after `today` (clock skew, imported data) are ignored.
#[must_use]
pub fn current_streak(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut days = dates.range(..=today).rev();
    let Some(&latest) = days.next() else {
        return 0;
    };
    if today - latest > Duration::days(1) {
        return 0;
    }

    let mut streak = 1;
    let mut expected = latest.pred_opt();
    for &date in days {
        if Some(date) != expected {
            break;
        }
        streak += 1;
        expected = date.pred_opt();
    }
    streak
}

#[must_use]
pub fn longest_streak(dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &date in dates {
        run = match previous {
            Some(prev) if prev.succ_opt() == Some(date) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LessonId, LessonSubmission};
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn completed_at(lesson: u16, at: DateTime<Utc>) -> ProgressRecord {
        ProgressRecord::start(
            LessonId::new(lesson).unwrap(),
            LessonSubmission::new(true, 100, 10).unwrap(),
            at,
        )
    }

    fn dates(list: &[NaiveDate]) -> BTreeSet<NaiveDate> {
        list.iter().copied().collect()
    }

    #[test]
    fn empty_history_has_no_streak() {
        let empty = BTreeSet::new();
        assert_eq!(current_streak(&empty, day(2024, 3, 10)), 0);
        assert_eq!(longest_streak(&empty), 0);
    }

    #[test]
    fn streak_counts_back_from_today() {
        let set = dates(&[day(2024, 3, 8), day(2024, 3, 9), day(2024, 3, 10)]);
        assert_eq!(current_streak(&set, day(2024, 3, 10)), 3);
    }

    #[test]
    fn streak_survives_until_end_of_next_day() {
        let set = dates(&[day(2024, 3, 8), day(2024, 3, 9)]);
        assert_eq!(current_streak(&set, day(2024, 3, 10)), 2);
        assert_eq!(current_streak(&set, day(2024, 3, 11)), 0);
    }

    #[test]
    fn gap_stops_the_count() {
        let set = dates(&[day(2024, 3, 5), day(2024, 3, 6), day(2024, 3, 9), day(2024, 3, 10)]);
        assert_eq!(current_streak(&set, day(2024, 3, 10)), 2);
        assert_eq!(longest_streak(&set), 2);
    }

    #[test]
    fn streak_crosses_month_and_leap_day() {
        let set = dates(&[day(2024, 2, 28), day(2024, 2, 29), day(2024, 3, 1)]);
        assert_eq!(current_streak(&set, day(2024, 3, 1)), 3);
    }

    #[test]
    fn future_dates_are_ignored() {
        let set = dates(&[day(2024, 3, 9), day(2024, 3, 10), day(2024, 3, 15)]);
        assert_eq!(current_streak(&set, day(2024, 3, 10)), 2);
    }

    #[test]
    fn longest_streak_finds_historic_run() {
        let set = dates(&[
            day(2024, 1, 1),
            day(2024, 1, 2),
            day(2024, 1, 3),
            day(2024, 1, 4),
            day(2024, 2, 1),
        ]);
        assert_eq!(longest_streak(&set), 4);
        assert_eq!(current_streak(&set, day(2024, 2, 1)), 1);
    }

    #[test]
    fn local_midnight_rollover_splits_one_utc_day() {
        // Both on 2024-03-10 UTC, but in UTC+2 the second lands on 2024-03-11.
        let records = [
            completed_at(1, Utc.with_ymd_and_hms(2024, 3, 10, 21, 59, 0).unwrap()),
            completed_at(2, Utc.with_ymd_and_hms(2024, 3, 10, 22, 1, 0).unwrap()),
        ];
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 23, 0, 0).unwrap();

        let in_utc = StreakSummary::compute(&records, 0, now);
        assert_eq!(in_utc.current, 1);

        let in_plus_two = StreakSummary::compute(&records, 120, now);
        assert_eq!(in_plus_two.current, 2);
        assert_eq!(in_plus_two.last_active, Some(day(2024, 3, 11)));
    }

    #[test]
    fn local_midnight_rollover_joins_two_utc_days() {
        // 23:30 and 00:30 UTC are the same evening in UTC-5.
        let records = [
            completed_at(1, Utc.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap()),
            completed_at(2, Utc.with_ymd_and_hms(2024, 3, 11, 0, 30, 0).unwrap()),
        ];
        let now = Utc.with_ymd_and_hms(2024, 3, 11, 1, 0, 0).unwrap();

        assert_eq!(StreakSummary::compute(&records, 0, now).current, 2);
        assert_eq!(StreakSummary::compute(&records, -300, now).current, 1);
    }

    #[test]
    fn incomplete_records_do_not_count() {
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let record = ProgressRecord::start(
            LessonId::new(1).unwrap(),
            LessonSubmission::new(false, 30, 10).unwrap(),
            at,
        );
        assert_eq!(StreakSummary::compute([&record], 0, at).current, 0);
    }
}
