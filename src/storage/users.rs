//! User rows, written only by the OAuth callback.

use super::{Database, User};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        github_id: row.get(1)?,
        login: row.get(2)?,
        avatar_url: row.get(3)?,
        access_token: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const USER_COLUMNS: &str = "id, github_id, login, avatar_url, access_token, created_at, updated_at";

impl Database {
    /// Insert-or-update a user keyed by GitHub account id.
    ///
    /// First login inserts a fresh row; later logins update the handle,
    /// avatar and encrypted token in place. The stored row (with its
    /// original internal id) is returned.
    pub fn upsert_user(
        &self,
        github_id: i64,
        login: &str,
        avatar_url: Option<&str>,
        encrypted_token: &str,
    ) -> Result<User> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();

        conn.execute(
            r#"
            INSERT INTO users (id, github_id, login, avatar_url, access_token, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(github_id) DO UPDATE SET
                login = excluded.login,
                avatar_url = excluded.avatar_url,
                access_token = excluded.access_token,
                updated_at = excluded.updated_at
            "#,
            params![id, github_id, login, avatar_url, encrypted_token, now, now],
        )
        .context("Failed to upsert user")?;

        // Re-read: on conflict the row keeps its original id
        conn.query_row(
            &format!("SELECT {} FROM users WHERE github_id = ?1", USER_COLUMNS),
            params![github_id],
            map_user,
        )
        .context("Failed to read back upserted user")
    }

    /// Look up a user by internal id.
    pub fn user_by_id(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id],
            map_user,
        )
        .optional()
        .context("Failed to query user")
    }

    pub(crate) fn user_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .context("Failed to count users")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::new(":memory:").expect("Failed to open database")
    }

    #[test]
    fn test_first_login_inserts() {
        let db = test_db();

        let user = db
            .upsert_user(42, "octocat", Some("https://avatars.test/42"), "enc-token")
            .unwrap();

        assert_eq!(user.github_id, 42);
        assert_eq!(user.login, "octocat");
        assert_eq!(user.avatar_url.as_deref(), Some("https://avatars.test/42"));
        assert_eq!(user.access_token.as_deref(), Some("enc-token"));
        assert_eq!(db.user_count().unwrap(), 1);
    }

    #[test]
    fn test_repeat_login_updates_in_place() {
        let db = test_db();

        let first = db.upsert_user(42, "octocat", None, "enc-1").unwrap();
        let second = db
            .upsert_user(42, "renamed", Some("https://avatars.test/new"), "enc-2")
            .unwrap();

        // Same row, same internal id, fresh profile data
        assert_eq!(second.id, first.id);
        assert_eq!(second.login, "renamed");
        assert_eq!(second.access_token.as_deref(), Some("enc-2"));
        assert_eq!(db.user_count().unwrap(), 1);
    }

    #[test]
    fn test_distinct_github_ids_get_distinct_rows() {
        let db = test_db();

        db.upsert_user(1, "alice", None, "enc-a").unwrap();
        db.upsert_user(2, "bob", None, "enc-b").unwrap();

        assert_eq!(db.user_count().unwrap(), 2);
    }

    #[test]
    fn test_user_by_id() {
        let db = test_db();
        let created = db.upsert_user(42, "octocat", None, "enc").unwrap();

        let found = db.user_by_id(&created.id).unwrap().unwrap();
        assert_eq!(found, created);

        assert!(db.user_by_id("missing").unwrap().is_none());
    }
}
