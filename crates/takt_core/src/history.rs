use chrono::NaiveDate;

use crate::date::{add_days, short_date_label};
use crate::habit::Habit;
use crate::stats::HabitEntry;

/// Upper bound on scanned days (5 years). A defensive guard against a
/// corrupted start date, not a product limit: if the span exceeds the
/// cap, only the most recent capped window is returned.
pub const HISTORY_DAY_CAP: i64 = 1825;

/// Day-by-day completion series for one habit, oldest first, from its
/// start date through today. Days the cadence marks inactive are
/// omitted rather than zero-filled. Values are the single-habit
/// completion value, not the cross-habit daily average.
pub fn build_history(habit: &Habit, today: NaiveDate) -> Vec<HabitEntry> {
    let span = (today - habit.start_date).num_days() + 1;
    if span <= 0 {
        // Future-dated start, nothing to plot.
        return Vec::new();
    }
    let span = span.min(HISTORY_DAY_CAP);
    let first = add_days(today, -(span - 1));

    (0..span)
        .filter_map(|offset| {
            let date = add_days(first, offset);
            if !habit.is_active_day(date) {
                return None;
            }
            Some(HabitEntry {
                label: short_date_label(date),
                value: habit.completion_value(date),
                date: Some(date),
            })
        })
        .collect()
}
