//! Question CRUD, filtered listing and review-state persistence

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, Result};

use crate::domain::{
    normalize_tags, Difficulty, NewQuestion, Question, ReviewState, ReviewStatus, ReviewableItem, Schedulable,
};
use crate::srs::checked_streak;

use super::{format_timestamp, parse_timestamp, LogOnError};

const QUESTION_COLUMNS: &str = "id, title, content, explanation, notes, subject, chapter, source, difficulty, tags, \
                                created_at, success_streak, review_count, last_reviewed_at, next_due_at, status";

/// Sort key for question listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestionSort {
    #[default]
    CreatedAt,
    NextDue,
    Title,
    Subject,
    ReviewCount,
    Streak,
}

impl QuestionSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created",
            Self::NextDue => "due",
            Self::Title => "title",
            Self::Subject => "subject",
            Self::ReviewCount => "reviews",
            Self::Streak => "streak",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::CreatedAt),
            "due" => Some(Self::NextDue),
            "title" => Some(Self::Title),
            "subject" => Some(Self::Subject),
            "reviews" => Some(Self::ReviewCount),
            "streak" => Some(Self::Streak),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::NextDue => "next_due_at",
            Self::Title => "title",
            Self::Subject => "subject",
            Self::ReviewCount => "review_count",
            Self::Streak => "success_streak",
        }
    }
}

/// Listing criteria. Unset fields do not filter; the default lists everything oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionFilter {
    pub subject: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<ReviewStatus>,
    /// Matches questions carrying any of these tags
    pub tags: Vec<String>,
    /// Substring of title, content, explanation or notes (ASCII case-insensitive)
    pub keyword: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub sort: QuestionSort,
    pub descending: bool,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl QuestionFilter {
    /// WHERE clause (empty when nothing filters) and its positional values
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut conditions: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(subject) = &self.subject {
            conditions.push("subject = ?".into());
            values.push(Value::Text(subject.clone()));
        }
        if let Some(difficulty) = self.difficulty {
            conditions.push("difficulty = ?".into());
            values.push(Value::Text(difficulty.as_str().into()));
        }
        if let Some(status) = self.status {
            conditions.push("status = ?".into());
            values.push(Value::Text(status.as_str().into()));
        }
        if !self.tags.is_empty() {
            let placeholders = self.tags.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM json_each(questions.tags) WHERE json_each.value IN ({}))",
                placeholders
            ));
            values.extend(self.tags.iter().map(|t| Value::Text(t.clone())));
        }
        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            conditions.push(
                r"(title || ' ' || content || ' ' || explanation || ' ' || notes) LIKE ? ESCAPE '\'".into(),
            );
            values.push(Value::Text(format!("%{}%", escape_like(keyword))));
        }
        if let Some(from) = self.created_from {
            conditions.push("created_at >= ?".into());
            values.push(Value::Text(format_timestamp(from)));
        }
        if let Some(to) = self.created_to {
            conditions.push("created_at <= ?".into());
            values.push(Value::Text(format_timestamp(to)));
        }

        if conditions.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), values)
        }
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', r"\\").replace('%', r"\%").replace('_', r"\_")
}

fn tags_to_json(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

pub fn insert_question(conn: &Connection, question: &Question) -> Result<()> {
    let state = question.review_state();
    conn.execute(
        r#"
    INSERT INTO questions (id, title, content, explanation, notes, subject, chapter, source, difficulty, tags,
                           created_at, success_streak, review_count, last_reviewed_at, next_due_at, status)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
    "#,
        params![
            question.id(),
            question.title,
            question.content,
            question.explanation,
            question.notes,
            question.subject,
            question.chapter,
            question.source,
            question.difficulty.as_str(),
            tags_to_json(&question.tags)?,
            format_timestamp(question.item.created_at()),
            state.success_streak(),
            state.review_count(),
            state.last_reviewed_at().map(format_timestamp),
            format_timestamp(state.next_due_at()),
            state.status().as_str(),
        ],
    )?;
    Ok(())
}

pub fn get_question_by_id(conn: &Connection, id: &str) -> Result<Option<Question>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM questions WHERE id = ?1", QUESTION_COLUMNS))?;

    let mut rows = stmt.query(params![id])?;
    if let Some(row) = rows.next()? {
        Ok(Some(row_to_question(row)?))
    } else {
        Ok(None)
    }
}

pub fn question_exists(conn: &Connection, id: &str) -> Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM questions WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}

/// Questions matching `filter`, sorted and paged as it asks
pub fn query_questions(conn: &Connection, filter: &QuestionFilter) -> Result<Vec<Question>> {
    let (where_sql, mut values) = filter.where_clause();
    let direction = if filter.descending { "DESC" } else { "ASC" };

    let mut sql = format!(
        "SELECT {} FROM questions{} ORDER BY {} {}, id {}",
        QUESTION_COLUMNS,
        where_sql,
        filter.sort.column(),
        direction,
        direction
    );
    match filter.limit {
        Some(limit) => {
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
            values.push(Value::Integer(i64::try_from(filter.offset).unwrap_or(i64::MAX)));
        }
        None if filter.offset > 0 => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            values.push(Value::Integer(i64::try_from(filter.offset).unwrap_or(i64::MAX)));
        }
        None => {}
    }

    let mut stmt = conn.prepare(&sql)?;
    let questions = stmt
        .query_map(params_from_iter(values.iter()), row_to_question)?
        .collect::<Result<Vec<_>>>()?;
    Ok(questions)
}

/// Number of questions matching `filter`, ignoring its paging
pub fn count_questions(conn: &Connection, filter: &QuestionFilter) -> Result<i64> {
    let (where_sql, values) = filter.where_clause();
    conn.query_row(
        &format!("SELECT COUNT(*) FROM questions{}", where_sql),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )
}

/// All questions, oldest first
pub fn get_all_questions(conn: &Connection) -> Result<Vec<Question>> {
    query_questions(conn, &QuestionFilter::default())
}

pub fn get_question_count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))
}

/// Replace the user-editable fields. Review state is untouched.
/// Returns false when no question has this id.
pub fn update_question_details(conn: &Connection, id: &str, details: &NewQuestion) -> Result<bool> {
    let tags = normalize_tags(details.tags.clone());
    let updated = conn.execute(
        r#"
    UPDATE questions
    SET title = ?1, content = ?2, explanation = ?3, notes = ?4, subject = ?5, chapter = ?6, source = ?7,
        difficulty = ?8, tags = ?9
    WHERE id = ?10
    "#,
        params![
            details.title,
            details.content,
            details.explanation,
            details.notes,
            details.subject,
            details.chapter,
            details.source,
            details.difficulty.as_str(),
            tags_to_json(&tags)?,
            id,
        ],
    )?;
    Ok(updated > 0)
}

pub fn save_review_state(conn: &Connection, id: &str, state: &ReviewState) -> Result<()> {
    conn.execute(
        r#"
    UPDATE questions
    SET success_streak = ?1, review_count = ?2, last_reviewed_at = ?3, next_due_at = ?4, status = ?5
    WHERE id = ?6
    "#,
        params![
            state.success_streak(),
            state.review_count(),
            state.last_reviewed_at().map(format_timestamp),
            format_timestamp(state.next_due_at()),
            state.status().as_str(),
            id,
        ],
    )?;
    Ok(())
}

/// Delete a question together with its review history
pub fn delete_question(conn: &Connection, id: &str) -> Result<bool> {
    conn.execute("DELETE FROM review_logs WHERE question_id = ?1", params![id])?;
    let deleted = conn.execute("DELETE FROM questions WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Remove every question and review log
pub fn clear_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    DELETE FROM review_logs;
    DELETE FROM questions;
    "#,
    )?;
    Ok(())
}

pub(crate) fn row_to_question(row: &rusqlite::Row) -> Result<Question> {
    let difficulty_str: String = row.get(8)?;
    let tags_str: String = row.get(9)?;
    let created_at_str: String = row.get(10)?;
    let raw_streak: i64 = row.get(11)?;
    let last_reviewed_str: Option<String> = row.get(13)?;
    let next_due_str: String = row.get(14)?;
    let status_str: String = row.get(15)?;

    let success_streak = checked_streak(raw_streak)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(11, Type::Integer, Box::new(e)))?;
    let status = ReviewStatus::from_str(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(15, Type::Text, format!("unknown review status '{}'", status_str).into())
    })?;
    let last_reviewed_at = match last_reviewed_str {
        Some(s) => Some(parse_timestamp(13, &s)?),
        None => None,
    };

    let state = ReviewState::from_parts(
        success_streak,
        row.get(12)?,
        last_reviewed_at,
        parse_timestamp(14, &next_due_str)?,
        status,
    );

    Ok(Question {
        item: ReviewableItem::from_parts(row.get(0)?, parse_timestamp(10, &created_at_str)?, state),
        title: row.get(1)?,
        content: row.get(2)?,
        explanation: row.get(3)?,
        notes: row.get(4)?,
        subject: row.get(5)?,
        chapter: row.get(6)?,
        source: row.get(7)?,
        difficulty: Difficulty::from_str(&difficulty_str).unwrap_or_default(),
        tags: serde_json::from_str::<Vec<String>>(&tags_str).log_warn_default("Ignoring malformed question tags"),
    })
}
