use chrono::NaiveDate;

use crate::date::{add_days, day_key};
use crate::habit::Habit;
use crate::history::HISTORY_DAY_CAP;

/// CSV dump of every habit's daily completion, one row per day from
/// the earliest start date through today. Non-cadence days are marked
/// `REST DAY` so a reader can tell a rest day from a missed one;
/// active days carry the truncated completion percentage.
///
/// The date range is clamped to the same 5-year guard the history
/// series uses, so a corrupted start date cannot blow up the export.
pub fn generate_csv(habits: &[Habit], today: NaiveDate) -> String {
    if habits.is_empty() {
        return "No habits to export".to_string();
    }

    let earliest = habits
        .iter()
        .map(|habit| habit.start_date)
        .min()
        .unwrap_or(today)
        .max(add_days(today, -(HISTORY_DAY_CAP - 1)));

    let mut csv = String::from("Date");
    for habit in habits {
        csv.push(',');
        csv.push_str(&escape_field(&habit.title));
    }
    csv.push('\n');

    let mut date = earliest;
    while date <= today {
        csv.push_str(&day_key(date));
        for habit in habits {
            csv.push(',');
            if !habit.is_active_day(date) {
                csv.push_str("REST DAY");
            } else {
                let percent = (habit.completion_value(date) * 100.0) as u32;
                csv.push_str(&format!("{percent}%"));
            }
        }
        csv.push('\n');
        date = add_days(date, 1);
    }

    csv
}

fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
