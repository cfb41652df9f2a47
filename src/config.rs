//! Application configuration constants and loaders.
//!
//! Values resolve with priority `config.toml` > environment (including `.env`)
//! > built-in defaults. An invalid schedule section is logged and ignored.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::paths;
use crate::srs::{IntervalTable, ScheduleError, Scheduler};

/// Default config file, relative to the working directory
pub const CONFIG_FILE: &str = "config.toml";

// ==================== Schedule Configuration ====================

/// Ebbinghaus review intervals in days, indexed by success streak
pub const INTERVAL_DAYS: [u32; 7] = [1, 2, 4, 7, 15, 30, 60];

/// Consecutive correct reviews before a question counts as mastered
pub const MASTERY_THRESHOLD: u32 = 3;

// ==================== Query Windows ====================

/// Days shown by the calendar view when none are requested
pub const DEFAULT_CALENDAR_DAYS: u32 = 7;

/// Look-back window for practice statistics
pub const PRACTICE_STATS_WINDOW_DAYS: i64 = 7;

// ==================== Config File ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    pub database: Option<DatabaseConfig>,
    pub schedule: Option<ScheduleConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DatabaseConfig {
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleConfig {
    pub intervals: Option<Vec<u32>>,
    pub mastery_threshold: Option<u32>,
}

impl AppConfig {
    /// Read and parse a config file; missing or malformed files yield `None`
    pub fn from_file(path: &Path) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        match toml::from_str::<AppConfig>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Ignoring malformed {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Load `.env` if present. Safe to call more than once.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}

// ==================== Database Configuration ====================

/// Load database path with priority: config.toml > .env > default
pub fn load_database_path() -> PathBuf {
    load_env();
    resolve_database_path(AppConfig::from_file(Path::new(CONFIG_FILE)).as_ref())
}

fn resolve_database_path(config: Option<&AppConfig>) -> PathBuf {
    // Priority 1: config.toml
    if let Some(path) = config
        .and_then(|c| c.database.as_ref())
        .and_then(|db| db.path.as_ref())
    {
        tracing::info!("Using database from config.toml: {}", path);
        return PathBuf::from(path);
    }

    // Priority 2: .env DATABASE_PATH
    if let Ok(path) = std::env::var("DATABASE_PATH") {
        tracing::info!("Using database from DATABASE_PATH env: {}", path);
        return PathBuf::from(path);
    }

    let default = PathBuf::from(paths::db_path());
    tracing::info!("Using default database path: {}", default.display());
    default
}

// ==================== Scheduler Configuration ====================

/// Load the scheduling policy with priority: config.toml > .env > default
pub fn load_scheduler() -> Scheduler {
    load_env();
    let config = AppConfig::from_file(Path::new(CONFIG_FILE));
    let env_threshold = std::env::var("MASTERY_THRESHOLD").ok();

    match scheduler_from_sources(config.as_ref(), env_threshold.as_deref()) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            tracing::warn!("{}; falling back to default schedule", e);
            Scheduler::default()
        }
    }
}

/// Build a scheduler from an optional config and an optional `MASTERY_THRESHOLD` value
pub fn scheduler_from_sources(
    config: Option<&AppConfig>,
    env_threshold: Option<&str>,
) -> Result<Scheduler, ScheduleError> {
    let schedule = config.and_then(|c| c.schedule.as_ref());

    let table = match schedule.and_then(|s| s.intervals.clone()) {
        Some(days) => IntervalTable::new(days)?,
        None => IntervalTable::default(),
    };

    let threshold = match schedule.and_then(|s| s.mastery_threshold) {
        Some(t) => t,
        None => match env_threshold {
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
                tracing::warn!("MASTERY_THRESHOLD is not a number: {}", raw);
                ScheduleError::InvalidMasteryThreshold(0)
            })?,
            None => MASTERY_THRESHOLD,
        },
    };

    Scheduler::new(table, threshold)
}
