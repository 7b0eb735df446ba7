//! Projects and the issues mirrored into them by webhooks.

use super::{Database, Issue, Project};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

/// Result of applying a webhook issue event
#[derive(Debug, Clone, PartialEq)]
pub struct IssueUpsert {
    pub issue: Issue,
    /// True when the event created a new row rather than updating one
    pub created: bool,
}

fn map_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        github_repo_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_issue(row: &Row<'_>) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: row.get(0)?,
        project_id: row.get(1)?,
        github_issue_number: row.get(2)?,
        title: row.get(3)?,
        state: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl Database {
    /// Register a project for a user's repository.
    pub fn create_project(
        &self,
        user_id: &str,
        name: &str,
        github_repo_id: i64,
    ) -> Result<Project> {
        let conn = self.conn.lock().unwrap();
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO projects (id, user_id, name, github_repo_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![id, user_id, name, github_repo_id, now],
        )
        .context("Failed to create project")?;

        Ok(Project {
            id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            github_repo_id,
            created_at: now,
        })
    }

    /// Look up the project mirroring a GitHub repository.
    pub fn find_project_by_repo(&self, github_repo_id: i64) -> Result<Option<Project>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, user_id, name, github_repo_id, created_at FROM projects WHERE github_repo_id = ?1",
            params![github_repo_id],
            map_project,
        )
        .optional()
        .context("Failed to query project")
    }

    /// Insert-or-update an issue keyed by (project, issue number).
    ///
    /// Replayed events converge to the same final row; the uniqueness
    /// constraint resolves the write, so duplicates cannot create a
    /// second row. Reports whether the row was created or updated.
    pub fn upsert_issue(
        &self,
        project_id: &str,
        github_issue_number: i64,
        title: &str,
        state: &str,
    ) -> Result<IssueUpsert> {
        let conn = self.conn.lock().unwrap();

        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM issues WHERE project_id = ?1 AND github_issue_number = ?2",
                params![project_id, github_issue_number],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to probe for existing issue")?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO issues (id, project_id, github_issue_number, title, state, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(project_id, github_issue_number) DO UPDATE SET
                title = excluded.title,
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
            params![id, project_id, github_issue_number, title, state, now, now],
        )
        .context("Failed to upsert issue")?;

        let issue = conn
            .query_row(
                r#"
                SELECT id, project_id, github_issue_number, title, state, created_at, updated_at
                FROM issues WHERE project_id = ?1 AND github_issue_number = ?2
                "#,
                params![project_id, github_issue_number],
                map_issue,
            )
            .context("Failed to read back upserted issue")?;

        Ok(IssueUpsert {
            issue,
            created: existing.is_none(),
        })
    }

    pub(crate) fn issue_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM issues", [], |row| row.get(0))
            .context("Failed to count issues")
    }
}
