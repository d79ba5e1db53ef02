use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::date::Weekday;
use crate::habit::{Habit, TrackingType};

/// Owning collection of habits, persisted as a single JSON blob.
///
/// Every mutation writes the whole blob back. The analytics builders
/// never see this struct; they operate on the cloned snapshot returned
/// by [`HabitStore::habits`], so concurrent readers are safe and the
/// engine stays pure.
pub struct HabitStore {
    path: PathBuf,
    habits: RwLock<Vec<Habit>>,
}

impl HabitStore {
    /// Open the store at `path`, loading existing habits if the file
    /// is present. A missing file is an empty store, not an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let habits = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read habit store at {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse habit store at {}", path.display()))?
        } else {
            Vec::new()
        };
        tracing::debug!(path = %path.display(), count = habits.len(), "opened habit store");
        Ok(Self {
            path,
            habits: RwLock::new(habits),
        })
    }

    /// Cloned snapshot for the analytics engine and rendering.
    pub fn habits(&self) -> Vec<Habit> {
        self.habits.read().clone()
    }

    pub fn get(&self, id: Uuid) -> Result<Habit> {
        self.habits
            .read()
            .iter()
            .find(|habit| habit.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("no habit with id {id}"))
    }

    pub fn create(
        &self,
        title: impl Into<String>,
        cadence: BTreeSet<Weekday>,
        tracking: TrackingType,
        goal_minutes: Option<u32>,
        today: NaiveDate,
    ) -> Result<Habit> {
        if cadence.is_empty() {
            return Err(anyhow!("cadence must include at least one weekday"));
        }
        if let Some(goal) = goal_minutes {
            if goal == 0 {
                return Err(anyhow!("goal minutes must be positive"));
            }
        }
        let habit = Habit::new(title, cadence, today).with_tracking(tracking, goal_minutes);
        tracing::info!(title = %habit.title, "creating habit");
        let snapshot = habit.clone();
        {
            let mut habits = self.habits.write();
            habits.push(habit);
            self.persist(&habits)?;
        }
        Ok(snapshot)
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        let mut habits = self.habits.write();
        let before = habits.len();
        habits.retain(|habit| habit.id != id);
        if habits.len() == before {
            return Err(anyhow!("no habit with id {id}"));
        }
        self.persist(&habits)
    }

    pub fn rename(&self, id: Uuid, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        self.update(id, move |habit| {
            habit.title = title;
            Ok(())
        })
    }

    pub fn set_cadence(&self, id: Uuid, cadence: BTreeSet<Weekday>) -> Result<()> {
        if cadence.is_empty() {
            return Err(anyhow!("cadence must include at least one weekday"));
        }
        self.update(id, move |habit| {
            habit.cadence = cadence;
            Ok(())
        })
    }

    pub fn set_tracking(&self, id: Uuid, tracking: TrackingType) -> Result<()> {
        self.update(id, move |habit| {
            habit.tracking = tracking;
            Ok(())
        })
    }

    pub fn set_goal(&self, id: Uuid, goal_minutes: Option<u32>) -> Result<()> {
        if goal_minutes == Some(0) {
            return Err(anyhow!("goal minutes must be positive"));
        }
        self.update(id, move |habit| {
            habit.goal_minutes = goal_minutes;
            Ok(())
        })
    }

    pub fn toggle_check_in(&self, id: Uuid, date: NaiveDate) -> Result<()> {
        self.update(id, move |habit| {
            habit.toggle_check_in(date);
            Ok(())
        })
    }

    pub fn add_minutes(&self, id: Uuid, minutes: u32, date: NaiveDate) -> Result<()> {
        self.update(id, move |habit| {
            if habit.tracking != TrackingType::Minutes {
                return Err(anyhow!("habit does not track minutes"));
            }
            habit.add_minutes(minutes, date);
            Ok(())
        })
    }

    pub fn increment_or_reset_minutes(&self, id: Uuid, date: NaiveDate) -> Result<()> {
        self.update(id, move |habit| {
            if habit.tracking != TrackingType::Minutes {
                return Err(anyhow!("habit does not track minutes"));
            }
            habit.increment_or_reset_minutes(date);
            Ok(())
        })
    }

    /// Wipe the habit's history and restart it today.
    pub fn reset_history(&self, id: Uuid, today: NaiveDate) -> Result<()> {
        self.update(id, move |habit| {
            habit.reset_history(today);
            Ok(())
        })
    }

    fn update<F>(&self, id: Uuid, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Habit) -> Result<()>,
    {
        let mut habits = self.habits.write();
        let habit = habits
            .iter_mut()
            .find(|habit| habit.id == id)
            .ok_or_else(|| anyhow!("no habit with id {id}"))?;
        apply(habit)?;
        self.persist(&habits)
    }

    fn persist(&self, habits: &[Habit]) -> Result<()> {
        let raw = serde_json::to_string_pretty(habits)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write habit store at {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), count = habits.len(), "persisted habits");
        Ok(())
    }
}
