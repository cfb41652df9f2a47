//! Review history

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result};

use crate::domain::ReviewLog;

use super::{format_timestamp, parse_timestamp};

const LOG_COLUMNS: &str = "id, question_id, reviewed_at, is_correct, due_at, response_time_ms";

pub fn insert_review_log(conn: &Connection, log: &ReviewLog) -> Result<i64> {
    conn.execute(
        r#"
    INSERT INTO review_logs (question_id, reviewed_at, is_correct, due_at, response_time_ms)
    VALUES (?1, ?2, ?3, ?4, ?5)
    "#,
        params![
            log.question_id,
            format_timestamp(log.reviewed_at),
            if log.correct { 1 } else { 0 },
            format_timestamp(log.due_at),
            log.response_time_ms,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Full review history in the order it happened
pub fn get_review_logs(conn: &Connection) -> Result<Vec<ReviewLog>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM review_logs ORDER BY reviewed_at ASC, id ASC",
        LOG_COLUMNS
    ))?;

    let logs = stmt.query_map([], row_to_review_log)?.collect::<Result<Vec<_>>>()?;
    Ok(logs)
}

pub fn get_review_logs_for_question(conn: &Connection, question_id: &str) -> Result<Vec<ReviewLog>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM review_logs WHERE question_id = ?1 ORDER BY reviewed_at ASC, id ASC",
        LOG_COLUMNS
    ))?;

    let logs = stmt
        .query_map(params![question_id], row_to_review_log)?
        .collect::<Result<Vec<_>>>()?;
    Ok(logs)
}

/// Reviews at or after `since`
pub fn get_review_logs_since(conn: &Connection, since: DateTime<Utc>) -> Result<Vec<ReviewLog>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM review_logs WHERE reviewed_at >= ?1 ORDER BY reviewed_at ASC, id ASC",
        LOG_COLUMNS
    ))?;

    let logs = stmt
        .query_map(params![format_timestamp(since)], row_to_review_log)?
        .collect::<Result<Vec<_>>>()?;
    Ok(logs)
}

pub fn get_review_count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM review_logs", [], |row| row.get(0))
}

pub(crate) fn row_to_review_log(row: &rusqlite::Row) -> Result<ReviewLog> {
    let reviewed_at_str: String = row.get(2)?;
    let is_correct: i64 = row.get(3)?;
    let due_at_str: String = row.get(4)?;

    Ok(ReviewLog {
        id: row.get(0)?,
        question_id: row.get(1)?,
        reviewed_at: parse_timestamp(2, &reviewed_at_str)?,
        correct: is_correct != 0,
        due_at: parse_timestamp(4, &due_at_str)?,
        response_time_ms: row.get(5)?,
    })
}
