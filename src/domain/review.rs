use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ReviewState;

/// Result of a single practice attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
  pub correct: bool,
}

impl ReviewOutcome {
  pub const CORRECT: Self = Self { correct: true };
  pub const INCORRECT: Self = Self { correct: false };

  pub fn as_str(&self) -> &'static str {
    if self.correct { "correct" } else { "wrong" }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "correct" | "right" => Some(Self::CORRECT),
      "wrong" | "incorrect" => Some(Self::INCORRECT),
      _ => None,
    }
  }
}

impl From<bool> for ReviewOutcome {
  fn from(correct: bool) -> Self {
    Self { correct }
  }
}

/// One logged review attempt.
///
/// `due_at` is the due date the question had when it was reviewed, which lets
/// statistics tell which days a question was due on after its schedule moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewLog {
  pub id: i64,
  pub question_id: String,
  pub reviewed_at: DateTime<Utc>,
  pub correct: bool,
  pub due_at: DateTime<Utc>,
  pub response_time_ms: Option<i64>,
}

impl ReviewLog {
  /// Log entry for a review taken against `previous` (the state before the review)
  pub fn new(
    question_id: impl Into<String>,
    previous: &ReviewState,
    outcome: ReviewOutcome,
    reviewed_at: DateTime<Utc>,
  ) -> Self {
    Self {
      id: 0,
      question_id: question_id.into(),
      reviewed_at,
      correct: outcome.correct,
      due_at: previous.next_due_at(),
      response_time_ms: None,
    }
  }

  pub fn with_response_time(mut self, response_time_ms: Option<i64>) -> Self {
    self.response_time_ms = response_time_ms;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{ReviewableItem, Schedulable};
  use crate::srs::Scheduler;
  use chrono::TimeZone;

  #[test]
  fn test_outcome_from_str() {
    assert_eq!(ReviewOutcome::from_str("correct"), Some(ReviewOutcome::CORRECT));
    assert_eq!(ReviewOutcome::from_str("right"), Some(ReviewOutcome::CORRECT));
    assert_eq!(ReviewOutcome::from_str("wrong"), Some(ReviewOutcome::INCORRECT));
    assert_eq!(ReviewOutcome::from_str("incorrect"), Some(ReviewOutcome::INCORRECT));
    assert_eq!(ReviewOutcome::from_str("maybe"), None);
  }

  #[test]
  fn test_outcome_as_str() {
    assert_eq!(ReviewOutcome::CORRECT.as_str(), "correct");
    assert_eq!(ReviewOutcome::INCORRECT.as_str(), "wrong");
  }

  #[test]
  fn test_outcome_from_bool() {
    assert_eq!(ReviewOutcome::from(true), ReviewOutcome::CORRECT);
    assert_eq!(ReviewOutcome::from(false), ReviewOutcome::INCORRECT);
  }

  #[test]
  fn test_review_log_captures_previous_due_date() {
    let created = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let reviewed = Utc.with_ymd_and_hms(2024, 5, 3, 19, 30, 0).unwrap();
    let item = ReviewableItem::new("q1", created, &Scheduler::default());

    let log = ReviewLog::new("q1", item.review_state(), ReviewOutcome::INCORRECT, reviewed)
      .with_response_time(Some(4200));

    assert_eq!(log.id, 0);
    assert_eq!(log.question_id, "q1");
    assert!(!log.correct);
    assert_eq!(log.reviewed_at, reviewed);
    assert_eq!(log.due_at, item.review_state().next_due_at());
    assert_eq!(log.response_time_ms, Some(4200));
  }
}
