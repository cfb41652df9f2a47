use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ReviewOutcome;
use crate::srs::Scheduler;

/// Review lifecycle label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
  /// Never reviewed
  New,
  Active,
  /// Success streak reached the mastery threshold
  Mastered,
}

impl ReviewStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::New => "new",
      Self::Active => "active",
      Self::Mastered => "mastered",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "new" => Some(Self::New),
      "active" => Some(Self::Active),
      "mastered" => Some(Self::Mastered),
      _ => None,
    }
  }
}

/// Scheduling state of a single question.
///
/// Fields are read-only outside the crate: `next_due_at` is always derived by
/// the [`Scheduler`] from the last review (or creation) time and the streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
  success_streak: u32,
  review_count: u32,
  last_reviewed_at: Option<DateTime<Utc>>,
  next_due_at: DateTime<Utc>,
  status: ReviewStatus,
}

impl ReviewState {
  pub(crate) fn from_parts(
    success_streak: u32,
    review_count: u32,
    last_reviewed_at: Option<DateTime<Utc>>,
    next_due_at: DateTime<Utc>,
    status: ReviewStatus,
  ) -> Self {
    Self {
      success_streak,
      review_count,
      last_reviewed_at,
      next_due_at,
      status,
    }
  }

  pub fn success_streak(&self) -> u32 {
    self.success_streak
  }

  pub fn review_count(&self) -> u32 {
    self.review_count
  }

  pub fn last_reviewed_at(&self) -> Option<DateTime<Utc>> {
    self.last_reviewed_at
  }

  pub fn next_due_at(&self) -> DateTime<Utc> {
    self.next_due_at
  }

  pub fn status(&self) -> ReviewStatus {
    self.status
  }
}

/// Anything the due query and statistics can read a review state from.
pub trait Schedulable {
  fn id(&self) -> &str;
  fn review_state(&self) -> &ReviewState;
}

impl<T: Schedulable + ?Sized> Schedulable for &T {
  fn id(&self) -> &str {
    (**self).id()
  }

  fn review_state(&self) -> &ReviewState {
    (**self).review_state()
  }
}

/// A question reduced to the fields that matter for scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewableItem {
  id: String,
  created_at: DateTime<Utc>,
  review_state: ReviewState,
}

impl ReviewableItem {
  /// Create an item due for its first review one interval after creation.
  pub fn new(id: impl Into<String>, created_at: DateTime<Utc>, scheduler: &Scheduler) -> Self {
    Self {
      id: id.into(),
      created_at,
      review_state: scheduler.initial_state(created_at),
    }
  }

  pub(crate) fn from_parts(id: String, created_at: DateTime<Utc>, review_state: ReviewState) -> Self {
    Self {
      id,
      created_at,
      review_state,
    }
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  /// Run one review through the scheduler, replacing this item's state.
  pub fn apply_review(
    &mut self,
    scheduler: &Scheduler,
    outcome: ReviewOutcome,
    now: DateTime<Utc>,
  ) -> &ReviewState {
    self.review_state = scheduler.record_outcome(&self.review_state, outcome, now);
    &self.review_state
  }
}

impl Schedulable for ReviewableItem {
  fn id(&self) -> &str {
    &self.id
  }

  fn review_state(&self) -> &ReviewState {
    &self.review_state
  }
}
