//! Read-only dashboard summaries over questions and their review history.
//!
//! A question counts as due on a day when its current due date falls on that
//! day, or a logged review was taken against a due date on that day (reviews
//! taken early, before the due day, cancel that occurrence). It counts as
//! reviewed on the day when any logged review, or its last review, falls on
//! that day. With an empty history only current due dates are considered.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};

use crate::domain::{Difficulty, Question, ReviewLog, ReviewStatus, Schedulable};

/// Due/reviewed counts for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayTally {
  pub due: usize,
  pub reviewed: usize,
}

impl DayTally {
  pub fn is_complete(&self) -> bool {
    self.reviewed == self.due
  }
}

pub fn day_tally<T: Schedulable>(items: &[T], history: &[ReviewLog], day: NaiveDate) -> DayTally {
  let known: HashSet<&str> = items.iter().map(|i| i.id()).collect();

  let mut due: HashSet<&str> = items
    .iter()
    .filter(|i| i.review_state().next_due_at().date_naive() == day)
    .map(|i| i.id())
    .collect();
  for log in history {
    let due_day = log.due_at.date_naive();
    if due_day == day && log.reviewed_at.date_naive() >= due_day && known.contains(log.question_id.as_str()) {
      due.insert(log.question_id.as_str());
    }
  }

  let mut reviewed_that_day: HashSet<&str> = history
    .iter()
    .filter(|log| log.reviewed_at.date_naive() == day)
    .map(|log| log.question_id.as_str())
    .collect();
  reviewed_that_day.extend(
    items
      .iter()
      .filter(|i| i.review_state().last_reviewed_at().map(|t| t.date_naive()) == Some(day))
      .map(|i| i.id()),
  );

  DayTally {
    due: due.len(),
    reviewed: due.intersection(&reviewed_that_day).count(),
  }
}

/// Percentage (0-100) of questions due on `day` that were reviewed that day.
/// Zero when nothing was due.
pub fn completion_rate<T: Schedulable>(items: &[T], history: &[ReviewLog], day: NaiveDate) -> f64 {
  let tally = day_tally(items, history, day);
  if tally.due > 0 {
    tally.reviewed as f64 / tally.due as f64 * 100.0
  } else {
    0.0
  }
}

/// Consecutive days, counting back from today, on which every due question was reviewed.
///
/// Days with nothing due are skipped without breaking the streak. The walk
/// stops at the first day with an unreviewed due question, or once it passes
/// the earliest day anything was ever due.
pub fn current_streak_days<T: Schedulable>(items: &[T], history: &[ReviewLog], now: DateTime<Utc>) -> u32 {
  let earliest = items
    .iter()
    .map(|i| i.review_state().next_due_at().date_naive())
    .chain(history.iter().map(|log| log.due_at.date_naive()))
    .min();
  let Some(earliest) = earliest else {
    return 0;
  };

  let mut streak = 0;
  let mut day = now.date_naive();
  while day >= earliest {
    let tally = day_tally(items, history, day);
    if tally.due > 0 {
      if !tally.is_complete() {
        break;
      }
      streak += 1;
    }
    day = day - Duration::days(1);
  }

  tracing::debug!(streak, "Computed review streak");
  streak
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MasteryBreakdown {
  pub new: usize,
  pub active: usize,
  pub mastered: usize,
}

impl MasteryBreakdown {
  pub fn total(&self) -> usize {
    self.new + self.active + self.mastered
  }

  pub fn mastered_rate(&self) -> f64 {
    if self.total() > 0 {
      self.mastered as f64 / self.total() as f64
    } else {
      0.0
    }
  }
}

pub fn mastery_breakdown<T: Schedulable>(items: &[T]) -> MasteryBreakdown {
  let mut breakdown = MasteryBreakdown::default();
  for item in items {
    match item.review_state().status() {
      ReviewStatus::New => breakdown.new += 1,
      ReviewStatus::Active => breakdown.active += 1,
      ReviewStatus::Mastered => breakdown.mastered += 1,
    }
  }
  breakdown
}

/// Attempt summary for a recent window
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PracticeStats {
  pub total_attempts: usize,
  pub correct_attempts: usize,
  /// Mean over attempts that recorded a response time
  pub average_response_ms: Option<f64>,
}

impl PracticeStats {
  pub fn accuracy_percent(&self) -> f64 {
    if self.total_attempts > 0 {
      self.correct_attempts as f64 / self.total_attempts as f64 * 100.0
    } else {
      0.0
    }
  }
}

/// Summarize reviews taken in the last `days` days
pub fn practice_stats(history: &[ReviewLog], now: DateTime<Utc>, days: i64) -> PracticeStats {
  let since = now - Duration::days(days);
  let recent: Vec<&ReviewLog> = history.iter().filter(|log| log.reviewed_at >= since).collect();

  let timings: Vec<i64> = recent.iter().filter_map(|log| log.response_time_ms).collect();
  let average_response_ms = if timings.is_empty() {
    None
  } else {
    Some(timings.iter().sum::<i64>() as f64 / timings.len() as f64)
  };

  PracticeStats {
    total_attempts: recent.len(),
    correct_attempts: recent.iter().filter(|log| log.correct).count(),
    average_response_ms,
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectStats {
  pub subject: String,
  pub total: usize,
  pub mastered: usize,
  /// Not yet mastered
  pub pending: usize,
}

/// Per-subject counts ordered by subject name
pub fn subject_breakdown(questions: &[Question]) -> Vec<SubjectStats> {
  let mut by_subject: BTreeMap<&str, SubjectStats> = BTreeMap::new();
  for q in questions {
    let entry = by_subject.entry(q.subject.as_str()).or_insert_with(|| SubjectStats {
      subject: q.subject.clone(),
      total: 0,
      mastered: 0,
      pending: 0,
    });
    entry.total += 1;
    if q.review_state().status() == ReviewStatus::Mastered {
      entry.mastered += 1;
    } else {
      entry.pending += 1;
    }
  }
  by_subject.into_values().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DifficultyBreakdown {
  pub easy: usize,
  pub medium: usize,
  pub hard: usize,
}

pub fn difficulty_breakdown(questions: &[Question]) -> DifficultyBreakdown {
  let mut breakdown = DifficultyBreakdown::default();
  for q in questions {
    match q.difficulty {
      Difficulty::Easy => breakdown.easy += 1,
      Difficulty::Medium => breakdown.medium += 1,
      Difficulty::Hard => breakdown.hard += 1,
    }
  }
  breakdown
}
