//! Ebbinghaus review interval table.

use crate::config;

/// Errors raised while building or querying a scheduling policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
  /// A streak read from an untyped source was negative
  InvalidStreak(i64),
  /// Interval table was empty, had a zero entry, or was not ascending
  InvalidIntervalTable(String),
  /// Mastery threshold of zero would mark every item mastered before review
  InvalidMasteryThreshold(u32),
  /// Stored review counters contradict each other
  InconsistentState(String),
}

impl std::fmt::Display for ScheduleError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ScheduleError::InvalidStreak(streak) => write!(f, "Invalid success streak: {}", streak),
      ScheduleError::InvalidIntervalTable(reason) => write!(f, "Invalid interval table: {}", reason),
      ScheduleError::InvalidMasteryThreshold(threshold) => {
        write!(f, "Invalid mastery threshold: {} (must be at least 1)", threshold)
      }
      ScheduleError::InconsistentState(reason) => write!(f, "Inconsistent review state: {}", reason),
    }
  }
}

impl ScheduleError {
  /// Returns a user-facing error message without internal values.
  pub fn user_message(&self) -> &'static str {
    match self {
      ScheduleError::InvalidStreak(_) => "Stored review streak is corrupt",
      ScheduleError::InvalidIntervalTable(_) => "Review interval configuration is invalid",
      ScheduleError::InvalidMasteryThreshold(_) => "Mastery threshold configuration is invalid",
      ScheduleError::InconsistentState(_) => "Review history does not add up",
    }
  }
}

impl std::error::Error for ScheduleError {}

/// Convert a signed streak (e.g. an SQLite INTEGER) into a streak count.
pub fn checked_streak(raw: i64) -> Result<u32, ScheduleError> {
  u32::try_from(raw).map_err(|_| ScheduleError::InvalidStreak(raw))
}

/// Ordered review intervals in days, indexed by consecutive-success count.
///
/// Streaks past the end of the table reuse the last entry, so review spacing
/// is capped at the final interval instead of growing without bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalTable {
  days: Vec<u32>,
}

impl IntervalTable {
  pub fn new(days: Vec<u32>) -> Result<Self, ScheduleError> {
    if days.is_empty() {
      return Err(ScheduleError::InvalidIntervalTable("table is empty".into()));
    }
    if let Some(pos) = days.iter().position(|&d| d == 0) {
      return Err(ScheduleError::InvalidIntervalTable(format!(
        "entry {} is zero days",
        pos
      )));
    }
    if let Some(pos) = days.windows(2).position(|w| w[1] < w[0]) {
      return Err(ScheduleError::InvalidIntervalTable(format!(
        "entry {} ({} days) is shorter than entry {} ({} days)",
        pos + 1,
        days[pos + 1],
        pos,
        days[pos]
      )));
    }
    Ok(Self { days })
  }

  /// Days until the next review after the `streak`-th consecutive success.
  pub fn interval_for_streak(&self, streak: u32) -> u32 {
    let idx = (streak as usize).min(self.days.len() - 1);
    self.days[idx]
  }

  /// First streak at which the interval stops growing
  pub fn clamp_streak(&self) -> u32 {
    (self.days.len() - 1) as u32
  }

  pub fn days(&self) -> &[u32] {
    &self.days
  }
}

impl Default for IntervalTable {
  fn default() -> Self {
    Self {
      days: config::INTERVAL_DAYS.to_vec(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_table_matches_ebbinghaus_steps() {
    let table = IntervalTable::default();
    assert_eq!(table.days(), &[1, 2, 4, 7, 15, 30, 60]);
  }

  #[test]
  fn test_interval_lookup_within_table() {
    let table = IntervalTable::default();
    assert_eq!(table.interval_for_streak(0), 1);
    assert_eq!(table.interval_for_streak(1), 2);
    assert_eq!(table.interval_for_streak(2), 4);
    assert_eq!(table.interval_for_streak(6), 60);
  }

  #[test]
  fn test_interval_clamps_at_last_entry() {
    let table = IntervalTable::default();
    assert_eq!(table.clamp_streak(), 6);
    for streak in 6..20 {
      assert_eq!(table.interval_for_streak(streak), 60);
    }
    assert_eq!(table.interval_for_streak(u32::MAX), 60);
  }

  #[test]
  fn test_intervals_never_decrease() {
    let table = IntervalTable::default();
    let mut prev = 0;
    for streak in 0..12 {
      let days = table.interval_for_streak(streak);
      assert!(days >= prev);
      prev = days;
    }
  }

  #[test]
  fn test_single_entry_table() {
    let table = IntervalTable::new(vec![3]).unwrap();
    assert_eq!(table.interval_for_streak(0), 3);
    assert_eq!(table.interval_for_streak(5), 3);
  }

  #[test]
  fn test_empty_table_rejected() {
    assert!(matches!(
      IntervalTable::new(vec![]),
      Err(ScheduleError::InvalidIntervalTable(_))
    ));
  }

  #[test]
  fn test_zero_interval_rejected() {
    assert!(matches!(
      IntervalTable::new(vec![1, 0, 4]),
      Err(ScheduleError::InvalidIntervalTable(_))
    ));
  }

  #[test]
  fn test_descending_table_rejected() {
    let err = IntervalTable::new(vec![1, 4, 2]).unwrap_err();
    assert!(err.to_string().contains("entry 2"));
  }

  #[test]
  fn test_checked_streak() {
    assert_eq!(checked_streak(0), Ok(0));
    assert_eq!(checked_streak(9), Ok(9));
    assert_eq!(checked_streak(-1), Err(ScheduleError::InvalidStreak(-1)));
  }

  #[test]
  fn test_checked_streak_overflow() {
    let too_big = i64::from(u32::MAX) + 1;
    assert_eq!(checked_streak(too_big), Err(ScheduleError::InvalidStreak(too_big)));
  }
}
