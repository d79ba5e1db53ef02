use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date::{add_days, Weekday};
use crate::habit::Habit;

/// The heatmap always covers the last four weeks.
pub const HEATMAP_DAYS: i64 = 28;

/// One calendar cell of the four-week activity grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitDay {
    pub label: String,
    pub level: u8,
    pub highlight: bool,
}

/// 28 cells, oldest first, ending today. Levels quantize the ratio of
/// checked to eligible habits; presence of a check-in is what counts
/// here, so a partially-met minutes goal still registers as checked.
pub fn build_heatmap(habits: &[Habit], today: NaiveDate) -> Vec<HabitDay> {
    (0..HEATMAP_DAYS)
        .map(|offset| {
            let date = add_days(today, -HEATMAP_DAYS + offset + 1);
            HabitDay {
                label: Weekday::from_date(date).short_label().to_string(),
                level: level_for(date, habits),
                highlight: date == today,
            }
        })
        .collect()
}

fn level_for(date: NaiveDate, habits: &[Habit]) -> u8 {
    let mut checked = 0usize;
    let mut eligible = 0usize;
    for habit in habits.iter().filter(|habit| habit.is_eligible_on(date)) {
        eligible += 1;
        if habit.is_checked_in(date) {
            checked += 1;
        }
    }
    if eligible == 0 {
        return 0;
    }

    let ratio = checked as f64 / eligible as f64;
    if ratio >= 1.0 {
        3
    } else if ratio >= 0.66 {
        2
    } else if ratio >= 0.33 {
        1
    } else {
        0
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

    fn boolean_habit(start: NaiveDate, checked: &[NaiveDate]) -> Habit {
        let mut habit = Habit::new("habit", daily_cadence(), start);
        habit.check_ins = checked.iter().copied().collect();
        habit
    }

    #[test]
    fn always_exactly_28_cells() {
        let today = date(2025, 10, 22);
        assert_eq!(build_heatmap(&[], today).len(), 28);

        let habits: Vec<Habit> = (0..15)
            .map(|i| boolean_habit(add_days(today, -i), &[today]))
            .collect();
        let grid = build_heatmap(&habits, today);
        assert_eq!(grid.len(), 28);
        assert!(grid.last().unwrap().highlight);
        assert_eq!(grid.iter().filter(|cell| cell.highlight).count(), 1);
    }

    #[test]
    fn level_quantization_boundaries() {
        let today = date(2025, 10, 22);
        let start = add_days(today, -60);

        // 100 eligible habits let us hit the 0.66 boundary exactly.
        let mut habits: Vec<Habit> = Vec::new();
        for i in 0..100 {
            let checked: &[NaiveDate] = if i < 66 { &[today] } else { &[] };
            habits.push(boolean_habit(start, checked));
        }
        let grid = build_heatmap(&habits, today);
        assert_eq!(grid.last().unwrap().level, 2, "exactly 0.66 maps to 2");

        let all_checked: Vec<Habit> = (0..3).map(|_| boolean_habit(start, &[today])).collect();
        assert_eq!(build_heatmap(&all_checked, today).last().unwrap().level, 3);

        let none_checked: Vec<Habit> = (0..3).map(|_| boolean_habit(start, &[])).collect();
        assert_eq!(build_heatmap(&none_checked, today).last().unwrap().level, 0);
    }

    #[test]
    fn rest_day_is_level_zero() {
        let today = date(2025, 10, 22); // Wednesday
        let cadence: BTreeSet<Weekday> = [Weekday::Monday].into_iter().collect();
        let habit = Habit::new("gym", cadence, add_days(today, -60));
        let grid = build_heatmap(&[habit], today);
        // Today is Wednesday: no eligible habit, so the cell sits at 0.
        let cell = grid.last().unwrap();
        assert_eq!(cell.label, "We");
        assert_eq!(cell.level, 0);
    }

    #[test]
    fn partial_minutes_goal_counts_as_checked() {
        let today = date(2025, 10, 22);
        let mut habit = Habit::new("piano", daily_cadence(), add_days(today, -10))
            .with_tracking(TrackingType::Minutes, Some(30));
        habit.add_minutes(15, today);

        // Fractional completion is 0.5, but the heatmap goes by
        // presence, so the lone habit reads as fully checked.
        let grid = build_heatmap(std::slice::from_ref(&habit), today);
        assert_eq!(grid.last().unwrap().level, 3);
        assert_eq!(habit.completion_value(today), 0.5);
    }

    #[test]
    fn labels_walk_the_week() {
        let today = date(2025, 10, 22); // Wednesday
        let grid = build_heatmap(&[], today);
        assert_eq!(grid[0].label, "Th"); // 27 days back from a Wednesday
        assert_eq!(grid[27].label, "We");
        assert_eq!(grid[26].label, "Tu");
    }
}
