use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use takt_core::date::{self, Weekday};
use takt_core::export::generate_csv;
use takt_core::heatmap::build_heatmap;
use takt_core::history::build_history;
use takt_core::stats::{build_snapshot, TimeScope};
use takt_core::{Habit, HabitStore, TrackingType};

const LEVEL_GLYPHS: [char; 4] = ['.', '-', '+', '#'];

#[derive(Parser)]
#[command(name = "takt", about = "Habit tracking from the terminal", version)]
struct Cli {
    /// Path to the habit store blob.
    #[arg(long, env = "TAKT_STORE", default_value = "takt.json")]
    store: PathBuf,

    /// Override the current day (yyyy-MM-dd), mainly for inspection.
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List habits with today's status.
    List,
    /// Create a habit.
    Add {
        title: String,
        /// Comma-separated weekdays (mon,wed,fri) or "daily".
        #[arg(long, default_value = "daily")]
        days: String,
        /// Track minutes toward this daily goal instead of a checkbox.
        #[arg(long)]
        goal: Option<u32>,
        /// Track minutes without a goal (any minutes count as done).
        #[arg(long)]
        minutes: bool,
    },
    /// Delete a habit.
    Remove { habit: String },
    /// Toggle today's check-in for a boolean habit.
    Check {
        habit: String,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Log minutes against a minutes habit.
    Log {
        habit: String,
        minutes: u32,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Quick-log a 5 minute increment (wraps once the goal is met).
    Tick { habit: String },
    /// Trend series, streaks and completion rate for a scope.
    Snapshot {
        #[arg(default_value = "weekly")]
        scope: TimeScope,
    },
    /// Four-week activity grid.
    Heatmap,
    /// Day-by-day completion series for one habit.
    History { habit: String },
    /// Write the CSV export.
    Export {
        #[arg(long, default_value = "habits_export.csv")]
        out: PathBuf,
    },
    /// Clear a habit's history and restart it today.
    Reset { habit: String },
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    date::parse_day_key(raw).ok_or_else(|| format!("expected yyyy-MM-dd, got {raw}"))
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("takt: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let store = HabitStore::open(&cli.store)?;
    let today = cli.today.unwrap_or_else(date::today);
    tracing::debug!(store = %cli.store.display(), %today, "takt ready");

    match cli.command {
        Command::List => {
            list(&store, today);
            Ok(())
        }
        Command::Add {
            title,
            days,
            goal,
            minutes,
        } => {
            let cadence = parse_cadence(&days)?;
            let tracking = if goal.is_some() || minutes {
                TrackingType::Minutes
            } else {
                TrackingType::Boolean
            };
            let habit = store.create(title, cadence, tracking, goal, today)?;
            println!("Added \"{}\"", habit.title);
            Ok(())
        }
        Command::Remove { habit } => {
            let habit = find_habit(&store, &habit)?;
            store.delete(habit.id)?;
            println!("Removed \"{}\"", habit.title);
            Ok(())
        }
        Command::Check { habit, date } => {
            let habit = find_habit(&store, &habit)?;
            let day = date.unwrap_or(today);
            store.toggle_check_in(habit.id, day)?;
            let checked = store.get(habit.id)?.is_checked_in(day);
            println!(
                "{} \"{}\" on {}",
                if checked { "Checked" } else { "Unchecked" },
                habit.title,
                date::day_key(day)
            );
            Ok(())
        }
        Command::Log {
            habit,
            minutes,
            date,
        } => {
            let habit = find_habit(&store, &habit)?;
            let day = date.unwrap_or(today);
            store.add_minutes(habit.id, minutes, day)?;
            let total = store.get(habit.id)?.minutes_on(day);
            println!("\"{}\": {} min on {}", habit.title, total, date::day_key(day));
            Ok(())
        }
        Command::Tick { habit } => {
            let habit = find_habit(&store, &habit)?;
            store.increment_or_reset_minutes(habit.id, today)?;
            let total = store.get(habit.id)?.minutes_on(today);
            println!("\"{}\": {} min today", habit.title, total);
            Ok(())
        }
        Command::Snapshot { scope } => {
            snapshot(&store, scope, today);
            Ok(())
        }
        Command::Heatmap => {
            heatmap(&store, today);
            Ok(())
        }
        Command::History { habit } => {
            let habit = find_habit(&store, &habit)?;
            history(&habit, today);
            Ok(())
        }
        Command::Export { out } => {
            let csv = generate_csv(&store.habits(), today);
            fs::write(&out, csv)?;
            println!("Wrote {}", out.display());
            Ok(())
        }
        Command::Reset { habit } => {
            let habit = find_habit(&store, &habit)?;
            store.reset_history(habit.id, today)?;
            println!("Reset \"{}\"; tracking restarts today", habit.title);
            Ok(())
        }
    }
}

fn parse_cadence(raw: &str) -> Result<BTreeSet<Weekday>> {
    if raw.trim().eq_ignore_ascii_case("daily") {
        return Ok(Weekday::ALL.into_iter().collect());
    }
    let mut cadence = BTreeSet::new();
    for token in raw.split(',') {
        let day: Weekday = token.parse().map_err(|err| anyhow!("{err}"))?;
        cadence.insert(day);
    }
    if cadence.is_empty() {
        return Err(anyhow!("cadence must include at least one weekday"));
    }
    Ok(cadence)
}

/// Habits are addressed by case-insensitive title prefix.
fn find_habit(store: &HabitStore, query: &str) -> Result<Habit> {
    let needle = query.to_lowercase();
    let habits = store.habits();
    let mut matches = habits
        .iter()
        .filter(|habit| habit.title.to_lowercase().starts_with(&needle));
    let Some(found) = matches.next() else {
        return Err(anyhow!("no habit matching \"{query}\""));
    };
    if matches.next().is_some() {
        return Err(anyhow!("\"{query}\" is ambiguous, use more of the title"));
    }
    Ok(found.clone())
}

fn list(store: &HabitStore, today: NaiveDate) {
    let habits = store.habits();
    if habits.is_empty() {
        println!("No habits tracked yet");
        return;
    }
    for habit in &habits {
        let status = if !habit.is_eligible_on(today) {
            "rest day".to_string()
        } else {
            match habit.tracking {
                TrackingType::Boolean if habit.is_checked_in(today) => "done".to_string(),
                TrackingType::Boolean => "open".to_string(),
                TrackingType::Minutes => match habit.goal_minutes {
                    Some(goal) => format!("{}/{} min", habit.minutes_on(today), goal),
                    None => format!("{} min", habit.minutes_on(today)),
                },
            }
        };
        let cadence: Vec<&str> = habit.cadence.iter().map(|day| day.abbrev()).collect();
        println!("{:<24} [{}] {}", habit.title, cadence.join(" "), status);
    }
}

fn snapshot(store: &HabitStore, scope: TimeScope, today: NaiveDate) {
    let snapshot = build_snapshot(&store.habits(), scope, today);
    println!("{} — {}", scope.title(), scope.tagline());
    println!("{}", snapshot.caption);
    println!(
        "streak {} (best {}), completion {:.0}%",
        snapshot.current_streak,
        snapshot.best_streak,
        snapshot.completion_rate * 100.0
    );
    for entry in &snapshot.entries {
        let bar = "#".repeat((entry.value * 20.0).round() as usize);
        println!("{:>8} {:>5.0}% {}", entry.label, entry.value * 100.0, bar);
    }
}

fn heatmap(store: &HabitStore, today: NaiveDate) {
    let grid = build_heatmap(&store.habits(), today);
    for week in grid.chunks(7) {
        let labels: Vec<String> = week
            .iter()
            .map(|cell| {
                let glyph = LEVEL_GLYPHS[usize::from(cell.level.min(3))];
                if cell.highlight {
                    format!("[{}{}]", cell.label, glyph)
                } else {
                    format!(" {}{} ", cell.label, glyph)
                }
            })
            .collect();
        println!("{}", labels.join(" "));
    }
}

fn history(habit: &Habit, today: NaiveDate) {
    let series = build_history(habit, today);
    if series.is_empty() {
        println!("No history for \"{}\" yet", habit.title);
        return;
    }
    println!("\"{}\" — {} active days", habit.title, series.len());
    for entry in &series {
        let bar = "#".repeat((entry.value * 20.0).round() as usize);
        println!("{:>8} {:>5.0}% {}", entry.label, entry.value * 100.0, bar);
    }
}
