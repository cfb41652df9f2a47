//! Project path functions - single source of truth for file locations.
//!
//! ## Environment Variables
//!
//! - `DATA_DIR`: Override the base data directory (default: "data")
//! - `DATABASE_PATH`: Override the database file itself (see config.rs)
//!
//! This allows keeping separate notebooks side by side:
//! ```bash
//! DATA_DIR=data/physics mistake-notebook agenda
//! ```

use std::env;
use std::sync::OnceLock;

/// Lazily initialized data directory from DATA_DIR env var
static DATA_DIR_VALUE: OnceLock<String> = OnceLock::new();

/// Get the base data directory (from DATA_DIR env var or default "data")
pub fn data_dir() -> &'static str {
    DATA_DIR_VALUE.get_or_init(|| env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()))
}

/// SQLite database holding questions and review history
pub fn db_path() -> String {
    format!("{}/notebook.db", data_dir())
}

/// Default directory for JSON exports
pub fn exports_dir() -> String {
    format!("{}/exports", data_dir())
}
