use chrono::{DateTime, Duration, Utc};

use crate::config;
use crate::domain::{ReviewOutcome, ReviewState, ReviewStatus};

use super::intervals::{IntervalTable, ScheduleError};

/// Spaced repetition policy: interval table plus mastery threshold.
///
/// Every due date in the crate is computed here. `record_outcome` is pure:
/// the caller captures `now` once and passes it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduler {
  table: IntervalTable,
  mastery_threshold: u32,
}

impl Scheduler {
  pub fn new(table: IntervalTable, mastery_threshold: u32) -> Result<Self, ScheduleError> {
    if mastery_threshold == 0 {
      return Err(ScheduleError::InvalidMasteryThreshold(mastery_threshold));
    }
    Ok(Self {
      table,
      mastery_threshold,
    })
  }

  pub fn table(&self) -> &IntervalTable {
    &self.table
  }

  pub fn mastery_threshold(&self) -> u32 {
    self.mastery_threshold
  }

  pub fn interval_for_streak(&self, streak: u32) -> u32 {
    self.table.interval_for_streak(streak)
  }

  /// Due date for a question last touched at `base` with the given streak
  pub fn due_after(&self, base: DateTime<Utc>, streak: u32) -> DateTime<Utc> {
    base + Duration::days(i64::from(self.interval_for_streak(streak)))
  }

  /// State of a freshly created question: first review one interval out.
  pub fn initial_state(&self, created_at: DateTime<Utc>) -> ReviewState {
    ReviewState::from_parts(0, 0, None, self.due_after(created_at, 0), ReviewStatus::New)
  }

  /// Compute the state after one review.
  ///
  /// Correct answers extend the streak and push the due date out along the
  /// interval table; a wrong answer resets the streak, demotes mastered
  /// questions to active and schedules the shortest interval. `now` earlier
  /// than the last review is taken as-is.
  pub fn record_outcome(
    &self,
    state: &ReviewState,
    outcome: ReviewOutcome,
    now: DateTime<Utc>,
  ) -> ReviewState {
    let review_count = state.review_count().saturating_add(1);

    let (streak, status) = if outcome.correct {
      let streak = state.success_streak().saturating_add(1);
      let status = if streak >= self.mastery_threshold {
        ReviewStatus::Mastered
      } else {
        ReviewStatus::Active
      };
      (streak, status)
    } else {
      (0, ReviewStatus::Active)
    };

    let next_due_at = self.due_after(now, streak);

    tracing::debug!(
      correct = outcome.correct,
      streak,
      status = status.as_str(),
      next_due = %next_due_at,
      "Recorded review outcome"
    );

    ReviewState::from_parts(streak, review_count, Some(now), next_due_at, status)
  }

  /// Rebuild a state from its counters, deriving status and due date.
  ///
  /// Used for states that did not come out of `record_outcome`, such as an
  /// imported backup. Counters that no review sequence could produce are
  /// rejected.
  pub fn restore_state(
    &self,
    created_at: DateTime<Utc>,
    success_streak: u32,
    review_count: u32,
    last_reviewed_at: Option<DateTime<Utc>>,
  ) -> Result<ReviewState, ScheduleError> {
    let inconsistent = |reason: String| -> Result<ReviewState, ScheduleError> {
      Err(ScheduleError::InconsistentState(reason))
    };

    match last_reviewed_at {
      None if review_count > 0 => {
        return inconsistent(format!("{} reviews but no last review time", review_count));
      }
      Some(_) if review_count == 0 => return inconsistent("last review time without any reviews".into()),
      Some(last) if last < created_at => return inconsistent("last review precedes creation".into()),
      _ => {}
    }
    if success_streak > review_count {
      return inconsistent(format!(
        "streak {} exceeds review count {}",
        success_streak, review_count
      ));
    }

    let status = if review_count == 0 {
      ReviewStatus::New
    } else if success_streak >= self.mastery_threshold {
      ReviewStatus::Mastered
    } else {
      ReviewStatus::Active
    };
    let next_due_at = self.due_after(last_reviewed_at.unwrap_or(created_at), success_streak);

    Ok(ReviewState::from_parts(
      success_streak,
      review_count,
      last_reviewed_at,
      next_due_at,
      status,
    ))
  }
}

impl Default for Scheduler {
  fn default() -> Self {
    Self {
      table: IntervalTable::default(),
      mastery_threshold: config::MASTERY_THRESHOLD,
    }
  }
}

/// [`Scheduler::record_outcome`] with the default policy
pub fn record_outcome(state: &ReviewState, outcome: ReviewOutcome, now: DateTime<Utc>) -> ReviewState {
  Scheduler::default().record_outcome(state, outcome, now)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 10, 0, 0).unwrap() + Duration::days(n)
  }

  /// State after `streak` consecutive correct reviews, one per day
  fn state_with_streak(scheduler: &Scheduler, streak: u32) -> ReviewState {
    let mut state = scheduler.initial_state(day(0));
    for i in 0..streak {
      state = scheduler.record_outcome(&state, ReviewOutcome::CORRECT, day(i64::from(i) + 1));
    }
    state
  }

  #[test]
  fn test_initial_state() {
    let state = Scheduler::default().initial_state(day(0));
    assert_eq!(state.success_streak(), 0);
    assert_eq!(state.review_count(), 0);
    assert_eq!(state.last_reviewed_at(), None);
    assert_eq!(state.next_due_at(), day(1));
    assert_eq!(state.status(), ReviewStatus::New);
  }

  #[test]
  fn test_documented_review_sequence() {
    let scheduler = Scheduler::default();
    let created = scheduler.initial_state(day(0));

    let first = scheduler.record_outcome(&created, ReviewOutcome::CORRECT, day(1));
    assert_eq!(first.success_streak(), 1);
    assert_eq!(first.next_due_at(), day(3));
    assert_eq!(first.status(), ReviewStatus::Active);

    let second = scheduler.record_outcome(&first, ReviewOutcome::CORRECT, day(3));
    assert_eq!(second.success_streak(), 2);
    assert_eq!(second.next_due_at(), day(7));

    let third = scheduler.record_outcome(&second, ReviewOutcome::INCORRECT, day(7));
    assert_eq!(third.success_streak(), 0);
    assert_eq!(third.next_due_at(), day(8));
    assert_eq!(third.status(), ReviewStatus::Active);
    assert_eq!(third.review_count(), 3);
    assert_eq!(third.last_reviewed_at(), Some(day(7)));
  }

  #[test]
  fn test_every_review_counts() {
    let scheduler = Scheduler::default();
    let mut state = scheduler.initial_state(day(0));
    for (i, correct) in [true, false, true, true, false].into_iter().enumerate() {
      state = scheduler.record_outcome(&state, correct.into(), day(i as i64 + 1));
      assert_eq!(state.review_count(), i as u32 + 1);
      assert_eq!(state.last_reviewed_at(), Some(day(i as i64 + 1)));
    }
  }

  #[test]
  fn test_first_review_of_new_item_is_ordinary() {
    let scheduler = Scheduler::default();
    let state = scheduler.initial_state(day(0));

    let wrong = scheduler.record_outcome(&state, ReviewOutcome::INCORRECT, day(1));
    assert_eq!(wrong.status(), ReviewStatus::Active);
    assert_eq!(wrong.next_due_at(), day(2));

    let right = scheduler.record_outcome(&state, ReviewOutcome::CORRECT, day(1));
    assert_eq!(right.success_streak(), 1);
    assert_eq!(right.next_due_at(), day(3));
  }

  #[test]
  fn test_mastery_threshold_boundary_correct() {
    let scheduler = Scheduler::default();
    let state = state_with_streak(&scheduler, 2);
    assert_eq!(state.status(), ReviewStatus::Active);

    let next = scheduler.record_outcome(&state, ReviewOutcome::CORRECT, day(10));
    assert_eq!(next.success_streak(), 3);
    assert_eq!(next.status(), ReviewStatus::Mastered);
  }

  #[test]
  fn test_mastery_threshold_boundary_incorrect() {
    let scheduler = Scheduler::default();
    let state = state_with_streak(&scheduler, 2);

    let next = scheduler.record_outcome(&state, ReviewOutcome::INCORRECT, day(10));
    assert_eq!(next.success_streak(), 0);
    assert_eq!(next.status(), ReviewStatus::Active);
  }

  #[test]
  fn test_failure_demotes_mastered() {
    let scheduler = Scheduler::default();
    let state = state_with_streak(&scheduler, 5);
    assert_eq!(state.status(), ReviewStatus::Mastered);

    let next = scheduler.record_outcome(&state, ReviewOutcome::INCORRECT, day(30));
    assert_eq!(next.success_streak(), 0);
    assert_eq!(next.status(), ReviewStatus::Active);
    assert_eq!(next.next_due_at(), day(31));
  }

  #[test]
  fn test_failure_always_resets_streak() {
    let scheduler = Scheduler::default();
    for streak in 1..10 {
      let state = state_with_streak(&scheduler, streak);
      let next = scheduler.record_outcome(&state, ReviewOutcome::INCORRECT, day(50));
      assert_eq!(next.success_streak(), 0);
      assert_ne!(next.status(), ReviewStatus::Mastered);
    }
  }

  #[test]
  fn test_intervals_grow_then_clamp() {
    let scheduler = Scheduler::default();
    let mut state = scheduler.initial_state(day(0));
    let mut now = day(1);
    let mut intervals = Vec::new();

    for _ in 0..9 {
      state = scheduler.record_outcome(&state, ReviewOutcome::CORRECT, now);
      intervals.push((state.next_due_at() - now).num_days());
      now = state.next_due_at();
    }

    assert_eq!(state.success_streak(), 9);
    assert_eq!(intervals, vec![2, 4, 7, 15, 30, 60, 60, 60, 60]);
    assert!(intervals.windows(2).all(|w| w[0] <= w[1]));
  }

  #[test]
  fn test_due_date_derives_from_review_time_and_streak() {
    let scheduler = Scheduler::default();
    let mut state = scheduler.initial_state(day(0));
    for (i, correct) in [true, true, false, true, true, true, true].into_iter().enumerate() {
      let now = day(i as i64 * 3 + 1);
      state = scheduler.record_outcome(&state, correct.into(), now);
      assert_eq!(
        state.next_due_at(),
        scheduler.due_after(state.last_reviewed_at().unwrap(), state.success_streak())
      );
    }
  }

  #[test]
  fn test_out_of_order_now_accepted() {
    let scheduler = Scheduler::default();
    let state = state_with_streak(&scheduler, 2);
    let earlier = day(-5);

    let next = scheduler.record_outcome(&state, ReviewOutcome::CORRECT, earlier);
    assert_eq!(next.last_reviewed_at(), Some(earlier));
    assert_eq!(next.next_due_at(), earlier + Duration::days(7));
  }

  #[test]
  fn test_custom_threshold() {
    let scheduler = Scheduler::new(IntervalTable::new(vec![1, 3]).unwrap(), 1).unwrap();
    let state = scheduler.initial_state(day(0));

    let next = scheduler.record_outcome(&state, ReviewOutcome::CORRECT, day(1));
    assert_eq!(next.status(), ReviewStatus::Mastered);
    assert_eq!(next.next_due_at(), day(4));
  }

  #[test]
  fn test_zero_threshold_rejected() {
    assert_eq!(
      Scheduler::new(IntervalTable::default(), 0),
      Err(ScheduleError::InvalidMasteryThreshold(0))
    );
  }

  #[test]
  fn test_restore_state_matches_initial_state() {
    let scheduler = Scheduler::default();
    assert_eq!(
      scheduler.restore_state(day(0), 0, 0, None),
      Ok(scheduler.initial_state(day(0)))
    );
  }

  #[test]
  fn test_restore_state_matches_recorded_reviews() {
    let scheduler = Scheduler::default();
    let mut state = scheduler.initial_state(day(0));
    for (i, correct) in [true, false, true, true, true, false, true].into_iter().enumerate() {
      state = scheduler.record_outcome(&state, correct.into(), day(i as i64 * 2 + 1));
      let restored = scheduler
        .restore_state(day(0), state.success_streak(), state.review_count(), state.last_reviewed_at())
        .unwrap();
      assert_eq!(restored, state);
    }
  }

  #[test]
  fn test_restore_state_derives_status_from_streak() {
    let scheduler = Scheduler::default();
    let restored = scheduler.restore_state(day(0), 0, 4, Some(day(9))).unwrap();
    assert_eq!(restored.status(), ReviewStatus::Active);
    assert_eq!(restored.next_due_at(), day(10));

    let restored = scheduler.restore_state(day(0), 3, 3, Some(day(9))).unwrap();
    assert_eq!(restored.status(), ReviewStatus::Mastered);
    assert_eq!(restored.next_due_at(), day(16));
  }

  #[test]
  fn test_restore_state_rejects_impossible_counters() {
    let scheduler = Scheduler::default();
    let rejected = [
      scheduler.restore_state(day(0), 0, 0, Some(day(1))),
      scheduler.restore_state(day(0), 0, 2, None),
      scheduler.restore_state(day(0), 3, 2, Some(day(5))),
      scheduler.restore_state(day(0), 1, 0, None),
      scheduler.restore_state(day(5), 1, 1, Some(day(1))),
    ];
    for result in rejected {
      assert!(matches!(result, Err(ScheduleError::InconsistentState(_))), "{:?}", result);
    }
  }

  #[test]
  fn test_free_function_uses_default_policy() {
    let state = Scheduler::default().initial_state(day(0));
    let next = record_outcome(&state, ReviewOutcome::CORRECT, day(1));
    assert_eq!(next.next_due_at(), day(3));
  }
}
