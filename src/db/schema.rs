use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS questions (
      id TEXT PRIMARY KEY,
      title TEXT NOT NULL,
      content TEXT NOT NULL DEFAULT '',
      explanation TEXT NOT NULL DEFAULT '',
      notes TEXT NOT NULL DEFAULT '',
      subject TEXT NOT NULL,
      chapter TEXT NOT NULL DEFAULT '',
      source TEXT NOT NULL DEFAULT '',
      difficulty TEXT NOT NULL DEFAULT 'medium',
      -- JSON array of strings
      tags TEXT NOT NULL DEFAULT '[]',
      created_at TEXT NOT NULL,
      -- Review state
      success_streak INTEGER NOT NULL DEFAULT 0,
      review_count INTEGER NOT NULL DEFAULT 0,
      last_reviewed_at TEXT,
      next_due_at TEXT NOT NULL,
      status TEXT NOT NULL DEFAULT 'new'
    );

    CREATE TABLE IF NOT EXISTS review_logs (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      question_id TEXT NOT NULL,
      reviewed_at TEXT NOT NULL,
      is_correct INTEGER NOT NULL,
      -- Due date the question had when this review happened
      due_at TEXT NOT NULL,
      response_time_ms INTEGER,
      FOREIGN KEY (question_id) REFERENCES questions(id)
    );

    -- Indexes
    CREATE INDEX IF NOT EXISTS idx_questions_next_due_at ON questions(next_due_at);
    CREATE INDEX IF NOT EXISTS idx_questions_subject ON questions(subject);
    CREATE INDEX IF NOT EXISTS idx_review_logs_question_id ON review_logs(question_id);
    CREATE INDEX IF NOT EXISTS idx_review_logs_reviewed_at ON review_logs(reviewed_at);
    "#,
  )?;

  // ============================================================
  // MIGRATIONS FOR EXISTING DATABASES
  // No-ops for new databases (columns already exist)
  // ============================================================

  // Migration: question annotations
  add_column_if_missing(conn, "questions", "content", "TEXT NOT NULL DEFAULT ''")?;
  add_column_if_missing(conn, "questions", "explanation", "TEXT NOT NULL DEFAULT ''")?;
  add_column_if_missing(conn, "questions", "notes", "TEXT NOT NULL DEFAULT ''")?;
  add_column_if_missing(conn, "questions", "chapter", "TEXT NOT NULL DEFAULT ''")?;
  add_column_if_missing(conn, "questions", "source", "TEXT NOT NULL DEFAULT ''")?;
  add_column_if_missing(conn, "questions", "tags", "TEXT NOT NULL DEFAULT '[]'")?;

  Ok(())
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
  conn
    .prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
    .is_ok()
}

/// Add a column if it doesn't already exist
fn add_column_if_missing(conn: &Connection, table: &str, column: &str, column_def: &str) -> Result<()> {
  if !column_exists(conn, table, column) {
    conn.execute(
      &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def),
      [],
    )?;
  }
  Ok(())
}
