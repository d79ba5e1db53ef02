pub mod date;
pub mod export;
pub mod habit;
pub mod heatmap;
pub mod history;
pub mod stats;
pub mod store;

pub use crate::habit::{Habit, TrackingType};
pub use crate::stats::{HabitEntry, HabitSnapshot, TimeScope};
pub use crate::store::HabitStore;
