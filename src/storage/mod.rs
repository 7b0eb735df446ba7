//! SQLite persistence for users, projects, issues and notes.
//!
//! # Schema
//! ```sql
//! CREATE TABLE users (
//!     id TEXT PRIMARY KEY,
//!     github_id INTEGER NOT NULL UNIQUE,
//!     login TEXT NOT NULL,
//!     avatar_url TEXT,
//!     access_token TEXT,               -- Encrypted
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//! CREATE TABLE projects (
//!     id TEXT PRIMARY KEY,
//!     user_id TEXT NOT NULL,
//!     name TEXT NOT NULL,
//!     github_repo_id INTEGER NOT NULL UNIQUE,
//!     created_at TEXT NOT NULL
//! );
//! CREATE TABLE issues (
//!     id TEXT PRIMARY KEY,
//!     project_id TEXT NOT NULL,
//!     github_issue_number INTEGER NOT NULL,
//!     title TEXT NOT NULL,
//!     state TEXT NOT NULL,
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     UNIQUE(project_id, github_issue_number)
//! );
//! CREATE TABLE notes (
//!     id TEXT PRIMARY KEY,
//!     user_id TEXT NOT NULL,
//!     issue_id TEXT,
//!     type TEXT NOT NULL,
//!     title TEXT NOT NULL,
//!     content TEXT,
//!     category TEXT,
//!     color TEXT NOT NULL,
//!     is_pinned INTEGER NOT NULL DEFAULT 0,
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//! ```
//!
//! Writes that must be idempotent (users keyed by `github_id`, issues
//! keyed by `(project_id, github_issue_number)`) go through
//! `ON CONFLICT ... DO UPDATE` so concurrent duplicates cannot produce
//! extra rows.
//!
//! # Thread Safety
//! - Connection is wrapped in Mutex for safe concurrent access
//! - SQLite itself is thread-safe with serialized mode

mod issues;
mod notes;
mod users;

pub use issues::IssueUpsert;
pub use notes::{NewNote, NoteChanges};

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;

/// A registered user, keyed externally by GitHub account id
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub github_id: i64,
    pub login: String,
    pub avatar_url: Option<String>,
    /// Encrypted GitHub access token
    pub access_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A project linking a user to a GitHub repository
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub github_repo_id: i64,
    pub created_at: String,
}

/// An issue mirrored from GitHub webhooks
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: String,
    pub project_id: String,
    pub github_issue_number: i64,
    pub title: String,
    pub state: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A user-owned note, optionally attached to an issue
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub user_id: String,
    pub issue_id: Option<String>,
    #[serde(rename = "type")]
    pub note_type: String,
    pub title: String,
    pub content: Option<String>,
    pub category: Option<String>,
    pub color: String,
    pub is_pinned: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// SQLite-backed relational store
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens (or creates) the database and ensures the schema exists.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path).context("Failed to open database")?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                github_id INTEGER NOT NULL UNIQUE,
                login TEXT NOT NULL,
                avatar_url TEXT,
                access_token TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                github_repo_id INTEGER NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS issues (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                github_issue_number INTEGER NOT NULL,
                title TEXT NOT NULL,
                state TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(project_id, github_issue_number)
            );

            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                issue_id TEXT,
                type TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT,
                category TEXT,
                color TEXT NOT NULL,
                is_pinned INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notes_user ON notes(user_id);
            "#,
        )
        .context("Failed to create schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::new(":memory:").expect("Failed to open database");
        assert_eq!(db.user_count().unwrap(), 0);
    }

    #[test]
    fn test_schema_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notehub.db");

        {
            let db = Database::new(&path).unwrap();
            db.upsert_user(42, "octocat", None, "encrypted").unwrap();
        }

        // Reopen the same file and read the row back
        let db = Database::new(&path).unwrap();
        let user = db.upsert_user(42, "octocat", None, "encrypted").unwrap();
        assert_eq!(db.user_count().unwrap(), 1);
        assert_eq!(user.login, "octocat");
    }
}
