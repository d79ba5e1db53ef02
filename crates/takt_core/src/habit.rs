use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::date::Weekday;

/// Minutes added per quick-log tap.
pub const MINUTE_STEP: u32 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrackingType {
    Boolean,
    Minutes,
}

/// A recurring habit with a weekly cadence and sparse per-day history.
///
/// `check_ins` holds one day per boolean completion; `minutes_log` maps
/// days to accumulated minutes. An absent key means zero minutes, not
/// unknown. Day keys serialize as plain `yyyy-MM-dd` calendar days so
/// membership tests are stable within a single local calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: Uuid,
    pub title: String,
    pub cadence: BTreeSet<Weekday>,
    pub start_date: NaiveDate,
    pub tracking: TrackingType,
    #[serde(default)]
    pub check_ins: BTreeSet<NaiveDate>,
    #[serde(default)]
    pub minutes_log: BTreeMap<NaiveDate, u32>,
    #[serde(default)]
    pub goal_minutes: Option<u32>,
}

impl Habit {
    pub fn new(title: impl Into<String>, cadence: BTreeSet<Weekday>, start_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            cadence,
            start_date,
            tracking: TrackingType::Boolean,
            check_ins: BTreeSet::new(),
            minutes_log: BTreeMap::new(),
            goal_minutes: None,
        }
    }

    pub fn with_tracking(mut self, tracking: TrackingType, goal_minutes: Option<u32>) -> Self {
        self.tracking = tracking;
        self.goal_minutes = goal_minutes;
        self
    }

    pub fn minutes_on(&self, date: NaiveDate) -> u32 {
        self.minutes_log.get(&date).copied().unwrap_or(0)
    }

    /// Presence check: a minutes habit counts as checked once any
    /// minutes are logged, regardless of the goal.
    pub fn is_checked_in(&self, date: NaiveDate) -> bool {
        match self.tracking {
            TrackingType::Minutes => self.minutes_on(date) > 0,
            TrackingType::Boolean => self.check_ins.contains(&date),
        }
    }

    /// Fraction of the day's goal met, in `[0, 1]`. Minutes habits with
    /// a goal report partial credit; everything else is all-or-nothing.
    pub fn completion_value(&self, date: NaiveDate) -> f64 {
        if self.tracking == TrackingType::Minutes {
            if let Some(goal) = self.goal_minutes.filter(|goal| *goal > 0) {
                let logged = f64::from(self.minutes_on(date));
                return (logged / f64::from(goal)).min(1.0);
            }
        }
        if self.is_checked_in(date) {
            1.0
        } else {
            0.0
        }
    }

    pub fn is_active_day(&self, date: NaiveDate) -> bool {
        self.cadence.contains(&Weekday::from_date(date))
    }

    /// Eligible = on/after the start date AND scheduled for that weekday.
    pub fn is_eligible_on(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.is_active_day(date)
    }

    pub fn toggle_check_in(&mut self, date: NaiveDate) {
        if !self.check_ins.remove(&date) {
            self.check_ins.insert(date);
        }
    }

    pub fn add_minutes(&mut self, minutes: u32, date: NaiveDate) {
        let entry = self.minutes_log.entry(date).or_insert(0);
        *entry = entry.saturating_add(minutes);
    }

    /// Quick-log tap: bump by [`MINUTE_STEP`], wrapping back to zero
    /// once the goal has been reached.
    pub fn increment_or_reset_minutes(&mut self, date: NaiveDate) {
        let current = self.minutes_on(date);
        match self.goal_minutes {
            Some(goal) if current >= goal => {
                self.minutes_log.insert(date, 0);
            }
            _ => {
                self.minutes_log.insert(date, current.saturating_add(MINUTE_STEP));
            }
        }
    }

    /// Restart tracking from scratch: history is cleared and the start
    /// date moves to today.
    pub fn reset_history(&mut self, today: NaiveDate) {
        self.check_ins.clear();
        self.minutes_log.clear();
        self.start_date = today;
    }
}
