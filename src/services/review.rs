//! Recording mistakes and reviews against the store.
//!
//! These functions are the only writers of review state: every review reads
//! the stored question, runs it through the [`Scheduler`], and persists both
//! the new state and a [`ReviewLog`] in one transaction.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::db;
use crate::domain::{generate_id, NewQuestion, Question, ReviewLog, ReviewOutcome, Schedulable};
use crate::srs::Scheduler;

/// Review-related errors.
#[derive(Debug)]
pub enum ReviewError {
    NotFound(String),
    Database(rusqlite::Error),
}

impl std::fmt::Display for ReviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewError::NotFound(id) => write!(f, "Question not found: {}", id),
            ReviewError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl ReviewError {
    /// Returns a user-facing error message without internal details.
    pub fn user_message(&self) -> &'static str {
        match self {
            ReviewError::NotFound(_) => "No question with that id",
            ReviewError::Database(_) => "Could not save the review",
        }
    }
}

impl std::error::Error for ReviewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReviewError::Database(e) => Some(e),
            ReviewError::NotFound(_) => None,
        }
    }
}

impl From<rusqlite::Error> for ReviewError {
    fn from(e: rusqlite::Error) -> Self {
        ReviewError::Database(e)
    }
}

/// Outcome of [`record_review`]: the updated question and the stored log entry
#[derive(Debug, Clone)]
pub struct RecordedReview {
    pub question: Question,
    pub log: ReviewLog,
}

/// Log a new mistake. Its first review falls one interval after `now`.
pub fn add_question(
    conn: &Connection,
    scheduler: &Scheduler,
    input: NewQuestion,
    now: DateTime<Utc>,
) -> rusqlite::Result<Question> {
    let question = Question::new(generate_id(now), input, now, scheduler);
    db::insert_question(conn, &question)?;
    tracing::info!(
        "Added question {} ({}), first review {}",
        question.id(),
        question.subject,
        question.review_state().next_due_at()
    );
    Ok(question)
}

/// Apply one review outcome to a stored question.
pub fn record_review(
    conn: &mut Connection,
    scheduler: &Scheduler,
    id: &str,
    outcome: ReviewOutcome,
    now: DateTime<Utc>,
    response_time_ms: Option<i64>,
) -> Result<RecordedReview, ReviewError> {
    let tx = conn.transaction()?;

    let mut question = db::get_question_by_id(&tx, id)?.ok_or_else(|| ReviewError::NotFound(id.to_string()))?;

    let mut log = ReviewLog::new(id, question.review_state(), outcome, now).with_response_time(response_time_ms);
    let previous_status = question.review_state().status();
    let state = question.item.apply_review(scheduler, outcome, now);

    db::save_review_state(&tx, id, state)?;
    log.id = db::insert_review_log(&tx, &log)?;
    tx.commit()?;

    let state = question.review_state();
    if state.status() != previous_status {
        tracing::info!(
            "Question {} moved from {} to {}",
            id,
            previous_status.as_str(),
            state.status().as_str()
        );
    }
    tracing::debug!(
        "Recorded {} review for {}: streak {}, next due {}",
        outcome.as_str(),
        id,
        state.success_streak(),
        state.next_due_at()
    );

    Ok(RecordedReview { question, log })
}
