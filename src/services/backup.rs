//! Portable export/import of the notebook.
//!
//! ## Export Format
//! A single pretty-printed JSON document:
//! ```text
//! {
//!   "format_version": 1,
//!   "exported_at": "2024-06-01T09:00:00Z",
//!   "app_version": "0.1.0",
//!   "questions": [ ... ],     # persisted question shape, review state included
//!   "review_logs": [ ... ]
//! }
//! ```
//!
//! Import merges into the current store: questions whose id already exists
//! are left alone, together with their exported history. Each imported
//! review state is rebuilt from its counters by the local scheduler, so a
//! hand-edited status or due date cannot enter the store.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::db;
use crate::domain::{Question, ReviewLog, ReviewableItem, Schedulable};
use crate::srs::{ScheduleError, Scheduler};

/// Export manifest format version
pub const MANIFEST_VERSION: u32 = 1;

/// Everything needed to rebuild a notebook elsewhere
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportManifest {
    /// Format version for future compatibility
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    /// Application version at export time
    pub app_version: String,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub review_logs: Vec<ReviewLog>,
}

/// Result of import operation
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub questions_imported: usize,
    /// Ids already present locally
    pub skipped_ids: Vec<String>,
    pub logs_imported: usize,
}

/// Backup-related errors.
#[derive(Debug)]
pub enum BackupError {
    Io(String, String),
    Parse(String),
    UnsupportedVersion(u32),
    /// A question's review counters cannot come from any review sequence
    InvalidState(String, ScheduleError),
    Database(rusqlite::Error),
}

impl std::fmt::Display for BackupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupError::Io(path, err) => write!(f, "IO error on {}: {}", path, err),
            BackupError::Parse(err) => write!(f, "Invalid export file: {}", err),
            BackupError::UnsupportedVersion(v) => write!(
                f,
                "Export format version {} is newer than supported version {}",
                v, MANIFEST_VERSION
            ),
            BackupError::InvalidState(id, e) => write!(f, "Question {}: {}", id, e),
            BackupError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl BackupError {
    /// Returns a user-facing error message without exposing filesystem paths.
    pub fn user_message(&self) -> &'static str {
        match self {
            BackupError::Io(_, _) => "Failed to read or write the export file",
            BackupError::Parse(_) => "Export file is not valid",
            BackupError::UnsupportedVersion(_) => "Export was made by a newer version. Please update the app.",
            BackupError::InvalidState(_, _) => "Export contains a question with corrupt review data",
            BackupError::Database(_) => "Database error during backup",
        }
    }
}

impl std::error::Error for BackupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackupError::InvalidState(_, e) => Some(e),
            BackupError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for BackupError {
    fn from(e: rusqlite::Error) -> Self {
        BackupError::Database(e)
    }
}

/// Snapshot every question and review log.
pub fn build_export(conn: &Connection, now: DateTime<Utc>) -> rusqlite::Result<ExportManifest> {
    Ok(ExportManifest {
        format_version: MANIFEST_VERSION,
        exported_at: now,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        questions: db::get_all_questions(conn)?,
        review_logs: db::get_review_logs(conn)?,
    })
}

pub fn export_to_json(manifest: &ExportManifest) -> Result<String, BackupError> {
    serde_json::to_string_pretty(manifest).map_err(|e| BackupError::Parse(e.to_string()))
}

/// Parse and version-check an export document.
pub fn parse_export(json: &str) -> Result<ExportManifest, BackupError> {
    let manifest: ExportManifest = serde_json::from_str(json).map_err(|e| BackupError::Parse(e.to_string()))?;

    if manifest.format_version > MANIFEST_VERSION {
        return Err(BackupError::UnsupportedVersion(manifest.format_version));
    }

    Ok(manifest)
}

/// Write an export of the whole notebook to `path`, creating parent directories.
pub fn write_export(conn: &Connection, path: &Path, now: DateTime<Utc>) -> Result<ExportManifest, BackupError> {
    let manifest = build_export(conn, now)?;
    let json = export_to_json(&manifest)?;

    let io_err = |e: std::io::Error| BackupError::Io(path.display().to_string(), e.to_string());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, json).map_err(io_err)?;

    tracing::info!(
        "Exported {} questions and {} reviews to {}",
        manifest.questions.len(),
        manifest.review_logs.len(),
        path.display()
    );
    Ok(manifest)
}

/// Rebuild an exported question's review state with `scheduler`.
///
/// Status and due date are derived from the streak, review count and last
/// review time; a stored status or due date that disagrees is replaced.
fn restore_question(scheduler: &Scheduler, question: &Question) -> Result<Question, BackupError> {
    let state = question.review_state();
    let restored = scheduler
        .restore_state(
            question.item.created_at(),
            state.success_streak(),
            state.review_count(),
            state.last_reviewed_at(),
        )
        .map_err(|e| BackupError::InvalidState(question.id().to_string(), e))?;

    if &restored == state {
        return Ok(question.clone());
    }
    tracing::warn!(
        "Question {}: recomputed review state ({} due {}) replaces exported ({} due {})",
        question.id(),
        restored.status().as_str(),
        restored.next_due_at(),
        state.status().as_str(),
        state.next_due_at()
    );
    let mut fixed = question.clone();
    fixed.item = ReviewableItem::from_parts(question.id().to_string(), question.item.created_at(), restored);
    Ok(fixed)
}

/// Merge a manifest into the store in one transaction.
///
/// Review logs are only taken for questions imported by this call; logs whose
/// question is missing from the manifest are dropped. A question with
/// impossible review counters aborts the whole import.
pub fn import_manifest(
    conn: &mut Connection,
    scheduler: &Scheduler,
    manifest: &ExportManifest,
) -> Result<ImportResult, BackupError> {
    let tx = conn.transaction()?;
    let mut result = ImportResult::default();
    let mut imported: HashSet<&str> = HashSet::new();

    for question in &manifest.questions {
        if db::question_exists(&tx, question.id())? {
            result.skipped_ids.push(question.id().to_string());
            continue;
        }
        db::insert_question(&tx, &restore_question(scheduler, question)?)?;
        imported.insert(question.id());
        result.questions_imported += 1;
    }

    for log in &manifest.review_logs {
        if imported.contains(log.question_id.as_str()) {
            db::insert_review_log(&tx, log)?;
            result.logs_imported += 1;
        }
    }

    tx.commit()?;

    if !result.skipped_ids.is_empty() {
        tracing::warn!("Skipped {} questions that already exist", result.skipped_ids.len());
    }
    tracing::info!(
        "Imported {} questions and {} reviews",
        result.questions_imported,
        result.logs_imported
    );
    Ok(result)
}

/// Read, validate, and merge an export file.
pub fn import_from_file(conn: &mut Connection, scheduler: &Scheduler, path: &Path) -> Result<ImportResult, BackupError> {
    let json = std::fs::read_to_string(path).map_err(|e| BackupError::Io(path.display().to_string(), e.to_string()))?;
    let manifest = parse_export(&json)?;
    import_manifest(conn, scheduler, &manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, NewQuestion, ReviewOutcome, ReviewStatus};
    use crate::services::review::{add_question, record_review};
    use crate::testing::TestEnv;
    use chrono::{Duration, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 7, 30, 0).unwrap() + Duration::days(n)
    }

    /// Store with two questions, one of them reviewed twice
    fn seeded_env() -> (TestEnv, String) {
        let mut env = TestEnv::new().unwrap();
        let scheduler = Scheduler::default();
        let q = add_question(
            &env.conn,
            &scheduler,
            NewQuestion::new("Ohm's law units", "physics", Difficulty::Easy),
            day(0),
        )
        .unwrap();
        add_question(
            &env.conn,
            &scheduler,
            NewQuestion::new("Subjunctive mood", "english", Difficulty::Hard),
            day(0),
        )
        .unwrap();
        record_review(&mut env.conn, &scheduler, q.id(), ReviewOutcome::CORRECT, day(1), Some(1200)).unwrap();
        record_review(&mut env.conn, &scheduler, q.id(), ReviewOutcome::INCORRECT, day(3), None).unwrap();
        let id = q.id().to_string();
        (env, id)
    }

    #[test]
    fn test_export_import_into_empty_store() {
        let (env, reviewed_id) = seeded_env();
        let path = env.path().join("exports").join("notebook.json");
        let manifest = write_export(&env.conn, &path, day(4)).unwrap();
        assert_eq!(manifest.questions.len(), 2);
        assert_eq!(manifest.review_logs.len(), 2);

        let mut target = TestEnv::new().unwrap();
        let result = import_from_file(&mut target.conn, &Scheduler::default(), &path).unwrap();
        assert_eq!(result.questions_imported, 2);
        assert_eq!(result.logs_imported, 2);
        assert!(result.skipped_ids.is_empty());

        let source = db::get_question_by_id(&env.conn, &reviewed_id).unwrap().unwrap();
        let copied = db::get_question_by_id(&target.conn, &reviewed_id).unwrap().unwrap();
        assert_eq!(copied, source);
        assert_eq!(
            db::get_review_logs_for_question(&target.conn, &reviewed_id).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_import_skips_existing_questions() {
        let (mut env, _) = seeded_env();
        let manifest = build_export(&env.conn, day(4)).unwrap();

        let result = import_manifest(&mut env.conn, &Scheduler::default(), &manifest).unwrap();
        assert_eq!(result.questions_imported, 0);
        assert_eq!(result.skipped_ids.len(), 2);
        assert_eq!(result.logs_imported, 0);
        assert_eq!(db::get_review_count(&env.conn).unwrap(), 2);
    }

    #[test]
    fn test_manifest_uses_persisted_question_shape() {
        let (env, _) = seeded_env();
        let json = export_to_json(&build_export(&env.conn, day(4)).unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["format_version"], MANIFEST_VERSION);
        let first = &value["questions"][0];
        assert!(first["id"].is_string());
        assert!(first["reviewState"]["nextDueAt"].is_string());
    }

    #[test]
    fn test_parse_export_rejects_newer_version() {
        let json = r#"{
            "format_version": 99,
            "exported_at": "2024-04-01T00:00:00Z",
            "app_version": "9.0.0",
            "questions": []
        }"#;
        assert!(matches!(parse_export(json), Err(BackupError::UnsupportedVersion(99))));
    }

    #[test]
    fn test_parse_export_without_logs() {
        let json = r#"{
            "format_version": 1,
            "exported_at": "2024-04-01T00:00:00Z",
            "app_version": "0.1.0",
            "questions": []
        }"#;
        let manifest = parse_export(json).unwrap();
        assert!(manifest.review_logs.is_empty());
    }

    #[test]
    fn test_parse_export_rejects_garbage() {
        let err = parse_export("not json").unwrap_err();
        assert!(matches!(err, BackupError::Parse(_)));
        assert_eq!(err.user_message(), "Export file is not valid");
    }

    #[test]
    fn test_import_missing_file() {
        let mut env = TestEnv::new().unwrap();
        let missing = env.path().join("nope.json");
        assert!(matches!(
            import_from_file(&mut env.conn, &Scheduler::default(), &missing),
            Err(BackupError::Io(_, _))
        ));
    }

    /// Single-question export with a hand-written review state
    fn manifest_with_state(state: &str) -> String {
        format!(
            r#"{{
            "format_version": 1,
            "exported_at": "2024-04-05T00:00:00Z",
            "app_version": "0.1.0",
            "questions": [{{
                "id": "forged",
                "createdAt": "2024-04-01T07:30:00Z",
                "reviewState": {},
                "title": "Balancing redox equations",
                "subject": "chemistry",
                "difficulty": "hard"
            }}],
            "review_logs": []
        }}"#,
            state
        )
    }

    #[test]
    fn test_import_recomputes_forged_status_and_due_date() {
        let mut env = TestEnv::new().unwrap();
        let json = manifest_with_state(
            r#"{"successStreak": 0, "reviewCount": 0, "lastReviewedAt": null,
                "nextDueAt": "2099-01-01T00:00:00Z", "status": "mastered"}"#,
        );
        let manifest = parse_export(&json).unwrap();

        let result = import_manifest(&mut env.conn, &Scheduler::default(), &manifest).unwrap();
        assert_eq!(result.questions_imported, 1);

        let stored = db::get_question_by_id(&env.conn, "forged").unwrap().unwrap();
        let state = stored.review_state();
        assert_eq!(state.status(), ReviewStatus::New);
        assert_eq!(state.next_due_at(), day(1));
        assert_eq!(*state, Scheduler::default().initial_state(day(0)));
    }

    #[test]
    fn test_import_recomputes_status_for_reviewed_question() {
        let mut env = TestEnv::new().unwrap();
        let json = manifest_with_state(
            r#"{"successStreak": 1, "reviewCount": 2, "lastReviewedAt": "2024-04-03T07:30:00Z",
                "nextDueAt": "2024-04-03T07:30:00Z", "status": "new"}"#,
        );
        let manifest = parse_export(&json).unwrap();
        import_manifest(&mut env.conn, &Scheduler::default(), &manifest).unwrap();

        let stored = db::get_question_by_id(&env.conn, "forged").unwrap().unwrap();
        assert_eq!(stored.review_state().status(), ReviewStatus::Active);
        assert_eq!(stored.review_state().next_due_at(), day(4));
    }

    #[test]
    fn test_import_rejects_impossible_counters() {
        let (mut env, _) = seeded_env();
        let json = manifest_with_state(
            r#"{"successStreak": 0, "reviewCount": 0, "lastReviewedAt": "2024-04-02T07:30:00Z",
                "nextDueAt": "2024-04-03T07:30:00Z", "status": "active"}"#,
        );
        let manifest = parse_export(&json).unwrap();

        let err = import_manifest(&mut env.conn, &Scheduler::default(), &manifest).unwrap_err();
        match &err {
            BackupError::InvalidState(id, ScheduleError::InconsistentState(_)) => assert_eq!(id, "forged"),
            other => panic!("expected InvalidState, got {:?}", other),
        }
        assert!(std::error::Error::source(&err).is_some());
        assert!(!db::question_exists(&env.conn, "forged").unwrap());
        assert_eq!(db::get_question_count(&env.conn).unwrap(), 2);
    }
}
