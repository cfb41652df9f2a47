//! Due-date classification and calendar view over a question collection.
//!
//! Day boundaries are UTC calendar days. Mastered questions are not exempt:
//! anything whose due date has arrived is listed.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::domain::Schedulable;

/// Midnight (UTC) of the day containing `now`
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
  now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueBucket {
  /// Due before today started
  Overdue,
  DueToday,
  /// Due tomorrow or later
  Upcoming,
}

/// Which bucket a due date falls into relative to `now`
pub fn bucket_for(next_due_at: DateTime<Utc>, now: DateTime<Utc>) -> DueBucket {
  let today = start_of_day(now);
  let tomorrow = today + Duration::days(1);
  if next_due_at < today {
    DueBucket::Overdue
  } else if next_due_at < tomorrow {
    DueBucket::DueToday
  } else {
    DueBucket::Upcoming
  }
}

/// Questions split by urgency, each list ordered by due date ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueBuckets<'a, T> {
  /// Most overdue first
  pub overdue: Vec<&'a T>,
  pub due_today: Vec<&'a T>,
  pub upcoming: Vec<&'a T>,
}

impl<T> DueBuckets<'_, T> {
  /// Overdue plus due today
  pub fn due_now_count(&self) -> usize {
    self.overdue.len() + self.due_today.len()
  }

  pub fn total(&self) -> usize {
    self.due_now_count() + self.upcoming.len()
  }
}

/// Partition `items` into overdue, due today and upcoming.
///
/// Every item lands in exactly one bucket. Ties on the due date keep input order.
pub fn classify<T: Schedulable>(items: &[T], now: DateTime<Utc>) -> DueBuckets<'_, T> {
  let mut buckets = DueBuckets {
    overdue: Vec::new(),
    due_today: Vec::new(),
    upcoming: Vec::new(),
  };

  for item in items {
    match bucket_for(item.review_state().next_due_at(), now) {
      DueBucket::Overdue => buckets.overdue.push(item),
      DueBucket::DueToday => buckets.due_today.push(item),
      DueBucket::Upcoming => buckets.upcoming.push(item),
    }
  }

  buckets.overdue.sort_by_key(|i| i.review_state().next_due_at());
  buckets.due_today.sort_by_key(|i| i.review_state().next_due_at());
  buckets.upcoming.sort_by_key(|i| i.review_state().next_due_at());

  tracing::debug!(
    overdue = buckets.overdue.len(),
    due_today = buckets.due_today.len(),
    upcoming = buckets.upcoming.len(),
    "Classified review queue"
  );

  buckets
}

/// Calendar of the next `days` days starting today.
///
/// The sequence is lazy (each day is computed when pulled) and restartable
/// by cloning it or calling this function again. It stops early at the last
/// representable date.
pub fn upcoming_within_days<T: Schedulable>(items: &[T], now: DateTime<Utc>, days: u32) -> UpcomingDays<'_, T> {
  let start = now.date_naive();
  let representable = (NaiveDate::MAX - start).num_days() + 1;
  UpcomingDays {
    items,
    start,
    offset: 0,
    days: days.min(u32::try_from(representable).unwrap_or(u32::MAX)),
  }
}

/// Iterator of `(date, questions due that date)` pairs
pub struct UpcomingDays<'a, T> {
  items: &'a [T],
  start: NaiveDate,
  offset: u32,
  days: u32,
}

impl<T> Clone for UpcomingDays<'_, T> {
  fn clone(&self) -> Self {
    Self {
      items: self.items,
      start: self.start,
      offset: self.offset,
      days: self.days,
    }
  }
}

impl<'a, T: Schedulable> Iterator for UpcomingDays<'a, T> {
  type Item = (NaiveDate, Vec<&'a T>);

  fn next(&mut self) -> Option<Self::Item> {
    if self.offset >= self.days {
      return None;
    }
    let date = self.start.checked_add_signed(Duration::days(i64::from(self.offset)))?;
    self.offset += 1;

    let mut due: Vec<&'a T> = self
      .items
      .iter()
      .filter(|item| item.review_state().next_due_at().date_naive() == date)
      .collect();
    due.sort_by_key(|item| item.review_state().next_due_at());

    Some((date, due))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let remaining = (self.days - self.offset) as usize;
    (remaining, Some(remaining))
  }
}

impl<T: Schedulable> ExactSizeIterator for UpcomingDays<'_, T> {}
