use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::date::{add_days, month_bounds, month_label, short_date_label, Weekday};
use crate::habit::Habit;

/// Trailing window scanned for streak runs.
const STREAK_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TimeScope {
    Weekly,
    Monthly,
    Yearly,
}

impl TimeScope {
    pub const ALL: [TimeScope; 3] = [TimeScope::Weekly, TimeScope::Monthly, TimeScope::Yearly];

    pub fn title(self) -> &'static str {
        match self {
            TimeScope::Weekly => "7 days",
            TimeScope::Monthly => "30 days",
            TimeScope::Yearly => "12 months",
        }
    }

    pub fn tagline(self) -> &'static str {
        match self {
            TimeScope::Weekly => "Focused micro sprint",
            TimeScope::Monthly => "Momentum builder",
            TimeScope::Yearly => "Legacy streak",
        }
    }

    /// Day window used for the completion rate. Yearly deliberately
    /// uses 365 trailing days, not the 12 calendar months plotted in
    /// the entry series.
    pub fn window_days(self) -> i64 {
        match self {
            TimeScope::Weekly => 7,
            TimeScope::Monthly => 30,
            TimeScope::Yearly => 365,
        }
    }
}

#[derive(Debug, Error)]
#[error("unrecognized scope: {0} (expected weekly, monthly or yearly)")]
pub struct ParseScopeError(String);

impl FromStr for TimeScope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Ok(TimeScope::Weekly),
            "monthly" | "month" => Ok(TimeScope::Monthly),
            "yearly" | "year" => Ok(TimeScope::Yearly),
            other => Err(ParseScopeError(other.to_string())),
        }
    }
}

/// One plotted point of a trend or history series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HabitEntry {
    pub label: String,
    pub value: f64,
    pub date: Option<NaiveDate>,
}

/// Derived trend view for one scope. Ephemeral, recomputed on demand,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HabitSnapshot {
    pub scope: TimeScope,
    pub entries: Vec<HabitEntry>,
    pub caption: String,
    pub current_streak: u32,
    pub best_streak: u32,
    pub completion_rate: f64,
}

/// Average completion value over all habits eligible on `date`, or 0
/// when none are eligible. The atomic operation every higher-level
/// view is built from.
pub fn day_value(date: NaiveDate, habits: &[Habit]) -> f64 {
    let mut total_completion = 0.0;
    let mut total_eligible = 0usize;
    for habit in habits.iter().filter(|habit| habit.is_eligible_on(date)) {
        total_eligible += 1;
        total_completion += habit.completion_value(date);
    }
    if total_eligible == 0 {
        return 0.0;
    }
    total_completion / total_eligible as f64
}

/// How many habits are eligible on `date`. A zero here marks a rest
/// day, which callers treat differently from a zero day value.
pub fn eligible_count(date: NaiveDate, habits: &[Habit]) -> usize {
    habits
        .iter()
        .filter(|habit| habit.is_eligible_on(date))
        .count()
}

pub fn build_snapshot(habits: &[Habit], scope: TimeScope, today: NaiveDate) -> HabitSnapshot {
    let entries = build_entries(habits, scope, today);
    let (current_streak, best_streak) = streaks(habits, today);
    let completion_rate = completion_rate(habits, scope, today);
    HabitSnapshot {
        scope,
        entries,
        caption: caption(habits, scope, completion_rate),
        current_streak,
        best_streak,
        completion_rate,
    }
}

fn earliest_start(habits: &[Habit]) -> Option<NaiveDate> {
    habits.iter().map(|habit| habit.start_date).min()
}

fn build_entries(habits: &[Habit], scope: TimeScope, today: NaiveDate) -> Vec<HabitEntry> {
    let Some(earliest) = earliest_start(habits) else {
        return Vec::new();
    };

    let days = match scope {
        TimeScope::Weekly => 7i64,
        TimeScope::Monthly => 30i64,
        TimeScope::Yearly => return build_yearly_entries(habits, earliest, today),
    };

    (0..days)
        .filter_map(|offset| {
            let date = add_days(today, -days + offset + 1);
            // Days before any habit existed are omitted, not zero-filled.
            if date < earliest {
                return None;
            }
            Some(HabitEntry {
                label: entry_label(date, scope),
                value: day_value(date, habits),
                date: Some(date),
            })
        })
        .collect()
}

fn build_yearly_entries(
    habits: &[Habit],
    earliest: NaiveDate,
    today: NaiveDate,
) -> Vec<HabitEntry> {
    (1..=12u32)
        .filter_map(|month| {
            let (start, end) = month_bounds(today.year(), month)?;
            // Months that ended before any habit existed are omitted.
            if end < earliest {
                return None;
            }
            Some(HabitEntry {
                label: month_label(month).to_string(),
                value: month_value(start, end, habits),
                date: Some(start),
            })
        })
        .collect()
}

/// Mean daily value across every day of the month, inclusive of both
/// bounds. Future days of the current year simply contribute zero.
fn month_value(start: NaiveDate, end: NaiveDate, habits: &[Habit]) -> f64 {
    let span = (end - start).num_days() + 1;
    if span <= 0 {
        return 0.0;
    }
    let total: f64 = (0..span)
        .map(|offset| day_value(add_days(start, offset), habits))
        .sum();
    total / span as f64
}

/// Scan the trailing 365 days oldest-first. Days before the earliest
/// start date or with no eligible habits are transparent: they neither
/// extend nor break a run. A day counts as complete only when every
/// eligible habit is fully satisfied.
///
/// The current streak is zero whenever today is not complete, which
/// includes the case where today has no eligible habits at all. That
/// is asymmetric with the transparency rule applied to every other day
/// in the window, and is kept on purpose.
fn streaks(habits: &[Habit], today: NaiveDate) -> (u32, u32) {
    let Some(earliest) = earliest_start(habits) else {
        return (0, 0);
    };

    let mut current = 0u32;
    let mut best = 0u32;
    let mut run = 0u32;

    for offset in (0..STREAK_WINDOW_DAYS).rev() {
        let date = add_days(today, -offset);
        if date < earliest {
            continue;
        }
        if eligible_count(date, habits) == 0 {
            continue;
        }

        if day_value(date, habits) >= 1.0 {
            run += 1;
            best = best.max(run);
            if offset == 0 {
                current = run;
            }
        } else {
            if offset == 0 {
                current = 0;
            }
            run = 0;
        }
    }

    (current, best)
}

/// Weighted mean per-habit-day completion across the scope window:
/// total completion over total eligible habit-days, not a mean of
/// per-day averages.
fn completion_rate(habits: &[Habit], scope: TimeScope, today: NaiveDate) -> f64 {
    let days = scope.window_days();
    let mut total_completion = 0.0;
    let mut total_eligible = 0usize;

    for offset in 0..days {
        let date = add_days(today, -days + offset + 1);
        for habit in habits.iter().filter(|habit| habit.is_eligible_on(date)) {
            total_eligible += 1;
            total_completion += habit.completion_value(date);
        }
    }

    if total_eligible == 0 {
        return 0.0;
    }
    total_completion / total_eligible as f64
}

fn caption(habits: &[Habit], scope: TimeScope, completion_rate: f64) -> String {
    if habits.is_empty() {
        return "No habits tracked yet".to_string();
    }
    let percent = (completion_rate * 100.0) as i64;
    format!(
        "You're at {}% completion this {}",
        percent,
        scope.title().to_lowercase()
    )
}

fn entry_label(date: NaiveDate, scope: TimeScope) -> String {
    match scope {
        TimeScope::Weekly => Weekday::from_date(date).abbrev().to_string(),
        TimeScope::Monthly | TimeScope::Yearly => short_date_label(date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::TrackingType;
    use std::collections::BTreeSet;

    fn daily_cadence() -> BTreeSet<Weekday> {
        Weekday::ALL.into_iter().collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn checked_habit(start: NaiveDate, checked: &[NaiveDate]) -> Habit {
        let mut habit = Habit::new("habit", daily_cadence(), start);
        habit.check_ins = checked.iter().copied().collect();
        habit
    }

    #[test]
    fn empty_collection_yields_empty_snapshot() {
        let today = date(2025, 10, 22);
        for scope in TimeScope::ALL {
            let snapshot = build_snapshot(&[], scope, today);
            assert!(snapshot.entries.is_empty());
            assert_eq!(snapshot.current_streak, 0);
            assert_eq!(snapshot.best_streak, 0);
            assert_eq!(snapshot.completion_rate, 0.0);
            assert_eq!(snapshot.caption, "No habits tracked yet");
        }
    }

    #[test]
    fn day_value_stays_within_bounds() {
        let today = date(2025, 10, 22);
        let mut minutes = Habit::new("piano", daily_cadence(), date(2025, 1, 1))
            .with_tracking(TrackingType::Minutes, Some(30));
        minutes.add_minutes(500, today);
        let checked = checked_habit(date(2025, 1, 1), &[today]);
        let unchecked = checked_habit(date(2025, 1, 1), &[]);

        let habits = vec![minutes, checked, unchecked];
        for offset in 0..40 {
            let value = day_value(add_days(today, -offset), &habits);
            assert!((0.0..=1.0).contains(&value), "value {value} out of bounds");
        }
    }

    #[test]
    fn habits_before_their_start_date_are_excluded() {
        let today = date(2025, 10, 22);
        let two_days_ago = add_days(today, -2);
        let old = checked_habit(add_days(today, -365), &[two_days_ago]);
        let new = checked_habit(add_days(today, -1), &[]);
        let habits = vec![old, new];

        // Only the year-old habit is eligible two days ago, and it is
        // checked, so the day value must be exactly 1.0.
        assert_eq!(eligible_count(two_days_ago, &habits), 1);
        assert_eq!(day_value(two_days_ago, &habits), 1.0);
    }

    #[test]
    fn weekly_scenario_six_of_seven_days() {
        let today = date(2025, 10, 22);
        // Checked every day in the window except the oldest one.
        let checked: Vec<NaiveDate> = (0..6).map(|offset| add_days(today, -offset)).collect();
        let habit = checked_habit(add_days(today, -100), &checked);

        let snapshot = build_snapshot(&[habit], TimeScope::Weekly, today);
        assert_eq!(snapshot.entries.len(), 7);
        assert!((snapshot.completion_rate - 6.0 / 7.0).abs() < 1e-9);
        assert_eq!(snapshot.current_streak, 6);
        assert_eq!(snapshot.best_streak, 6);
        assert_eq!(snapshot.caption, "You're at 85% completion this 7 days");
    }

    #[test]
    fn current_streak_is_zero_when_today_unchecked() {
        let today = date(2025, 10, 22);
        let checked: Vec<NaiveDate> = (1..7).map(|offset| add_days(today, -offset)).collect();
        let habit = checked_habit(add_days(today, -100), &checked);

        let snapshot = build_snapshot(&[habit], TimeScope::Weekly, today);
        assert_eq!(snapshot.current_streak, 0);
        assert_eq!(snapshot.best_streak, 6);
    }

    #[test]
    fn best_streak_never_below_current_streak() {
        let today = date(2025, 10, 22);
        let patterns: [&[i64]; 3] = [&[0, 1, 2], &[0, 2, 3], &[1, 2, 5]];
        for pattern in patterns {
            let checked: Vec<NaiveDate> =
                pattern.iter().map(|offset| add_days(today, -offset)).collect();
            let habit = checked_habit(add_days(today, -50), &checked);
            let snapshot = build_snapshot(&[habit], TimeScope::Weekly, today);
            assert!(snapshot.best_streak >= snapshot.current_streak);
        }
    }

    #[test]
    fn rest_days_are_transparent_to_streaks() {
        let today = date(2025, 10, 25); // Saturday
        // Active Monday through Friday only; the weekend is rest.
        let cadence: BTreeSet<Weekday> = [
            Weekday::Monday,
            Weekday::Tuesday,
            Weekday::Wednesday,
            Weekday::Thursday,
            Weekday::Friday,
        ]
        .into_iter()
        .collect();
        let mut habit = Habit::new("Deep work", cadence, add_days(today, -20));
        // Check in Mon 2025-10-20 .. Fri 2025-10-24.
        for day in 20..=24 {
            habit.toggle_check_in(date(2025, 10, day));
        }

        let snapshot = build_snapshot(&[habit], TimeScope::Weekly, today);
        // The weekend gap does not break the 5-day run...
        assert_eq!(snapshot.best_streak, 5);
        // ...but a rest day today still zeroes the current streak.
        assert_eq!(snapshot.current_streak, 0);
    }

    #[test]
    fn partial_minutes_break_a_streak() {
        let today = date(2025, 10, 22);
        let mut habit = Habit::new("piano", daily_cadence(), add_days(today, -2))
            .with_tracking(TrackingType::Minutes, Some(30));
        habit.add_minutes(30, add_days(today, -2));
        habit.add_minutes(30, add_days(today, -1));
        habit.add_minutes(15, today);

        let snapshot = build_snapshot(&[habit], TimeScope::Weekly, today);
        assert_eq!(snapshot.best_streak, 2);
        assert_eq!(snapshot.current_streak, 0);
    }

    #[test]
    fn series_omits_days_before_earliest_start() {
        let today = date(2025, 10, 22);
        let habit = checked_habit(add_days(today, -2), &[today]);
        let snapshot = build_snapshot(&[habit], TimeScope::Weekly, today);
        // Start was 2 days ago, so only 3 of the 7 days survive.
        assert_eq!(snapshot.entries.len(), 3);
        assert_eq!(snapshot.entries[0].date, Some(add_days(today, -2)));
        assert_eq!(snapshot.entries[2].date, Some(today));
    }

    #[test]
    fn yearly_series_omits_months_before_earliest_start() {
        let today = date(2025, 10, 22);
        let habit = checked_habit(date(2025, 6, 15), &[today]);
        let snapshot = build_snapshot(&[habit], TimeScope::Yearly, today);
        // January through May ended before the habit existed.
        assert_eq!(snapshot.entries.len(), 7);
        assert_eq!(snapshot.entries[0].label, "Jun");
        assert_eq!(snapshot.entries.last().unwrap().label, "Dec");
    }

    #[test]
    fn yearly_month_values_average_over_all_month_days() {
        let today = date(2025, 10, 22);
        // Checked every day of September.
        let checked: Vec<NaiveDate> = (1..=30).map(|d| date(2025, 9, d)).collect();
        let habit = checked_habit(date(2025, 1, 1), &checked);
        let snapshot = build_snapshot(&[habit], TimeScope::Yearly, today);

        let september = snapshot
            .entries
            .iter()
            .find(|entry| entry.label == "Sep")
            .unwrap();
        assert!((september.value - 1.0).abs() < 1e-9);
        let january = snapshot
            .entries
            .iter()
            .find(|entry| entry.label == "Jan")
            .unwrap();
        assert_eq!(january.value, 0.0);
    }

    #[test]
    fn entry_labels_follow_scope() {
        let today = date(2025, 10, 22); // Wednesday
        let habit = checked_habit(date(2025, 1, 1), &[]);
        let weekly = build_snapshot(std::slice::from_ref(&habit), TimeScope::Weekly, today);
        assert_eq!(weekly.entries.last().unwrap().label, "Wed");
        let monthly = build_snapshot(&[habit], TimeScope::Monthly, today);
        assert_eq!(monthly.entries.last().unwrap().label, "Oct 22");
        assert_eq!(monthly.entries.len(), 30);
    }

    #[test]
    fn completion_rate_weights_by_eligible_habit_days() {
        let today = date(2025, 10, 22);
        // One habit active daily and always checked; another started
        // yesterday and is unchecked. A mean of per-day averages would
        // differ from the weighted per-habit-day mean.
        let checked: Vec<NaiveDate> = (0..7).map(|offset| add_days(today, -offset)).collect();
        let always = checked_habit(add_days(today, -100), &checked);
        let newcomer = checked_habit(add_days(today, -1), &[]);

        let rate = completion_rate(&[always, newcomer], TimeScope::Weekly, today);
        // 7 checked habit-days out of 9 eligible habit-days.
        assert!((rate - 7.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn scope_parsing_accepts_short_forms() {
        assert_eq!("weekly".parse::<TimeScope>().unwrap(), TimeScope::Weekly);
        assert_eq!("month".parse::<TimeScope>().unwrap(), TimeScope::Monthly);
        assert_eq!("YEAR".parse::<TimeScope>().unwrap(), TimeScope::Yearly);
        assert!("fortnight".parse::<TimeScope>().is_err());
    }
}
