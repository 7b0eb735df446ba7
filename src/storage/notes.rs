//! Note rows. Ownership checks live in the API layer; every query here
//! that lists notes is already scoped to one user.

use super::{Database, Note};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::types::ToSql;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

/// Fields for a new note
#[derive(Debug, Clone)]
pub struct NewNote<'a> {
    pub user_id: &'a str,
    pub issue_id: Option<&'a str>,
    pub note_type: &'a str,
    pub title: &'a str,
    pub content: Option<&'a str>,
    pub category: Option<&'a str>,
    pub color: &'a str,
}

/// Partial update of a note; None fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub note_type: Option<String>,
    pub color: Option<String>,
    pub is_pinned: Option<bool>,
    pub category: Option<String>,
}

impl NoteChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.note_type.is_none()
            && self.color.is_none()
            && self.is_pinned.is_none()
            && self.category.is_none()
    }
}

fn map_note(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        user_id: row.get(1)?,
        issue_id: row.get(2)?,
        note_type: row.get(3)?,
        title: row.get(4)?,
        content: row.get(5)?,
        category: row.get(6)?,
        color: row.get(7)?,
        is_pinned: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const NOTE_COLUMNS: &str =
    "id, user_id, issue_id, type, title, content, category, color, is_pinned, created_at, updated_at";

impl Database {
    /// Insert a new note owned by `new.user_id`.
    pub fn create_note(&self, new: NewNote<'_>) -> Result<Note> {
        let conn = self.conn.lock().unwrap();
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO notes (id, user_id, issue_id, type, title, content, category, color, is_pinned, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10)
            "#,
            params![
                id,
                new.user_id,
                new.issue_id,
                new.note_type,
                new.title,
                new.content,
                new.category,
                new.color,
                now,
                now,
            ],
        )
        .context("Failed to create note")?;

        Ok(Note {
            id,
            user_id: new.user_id.to_string(),
            issue_id: new.issue_id.map(str::to_string),
            note_type: new.note_type.to_string(),
            title: new.title.to_string(),
            content: new.content.map(str::to_string),
            category: new.category.map(str::to_string),
            color: new.color.to_string(),
            is_pinned: false,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// List a user's notes, optionally filtered by category and issue,
    /// pinned notes first, then newest first.
    pub fn list_notes(
        &self,
        user_id: &str,
        category: Option<&str>,
        issue_id: Option<&str>,
    ) -> Result<Vec<Note>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = format!("SELECT {} FROM notes WHERE user_id = ?", NOTE_COLUMNS);
        let mut query_params: Vec<&dyn ToSql> = vec![&user_id];

        if let Some(ref category) = category {
            sql.push_str(" AND category = ?");
            query_params.push(category);
        }
        if let Some(ref issue_id) = issue_id {
            sql.push_str(" AND issue_id = ?");
            query_params.push(issue_id);
        }
        sql.push_str(" ORDER BY is_pinned DESC, created_at DESC");

        let mut stmt = conn.prepare(&sql).context("Failed to prepare query")?;
        let notes = stmt
            .query_map(query_params.as_slice(), map_note)
            .context("Failed to execute query")?
            .collect::<rusqlite::Result<Vec<Note>>>()
            .context("Failed to read notes")?;

        Ok(notes)
    }

    /// Fetch one note by id, regardless of owner.
    pub fn get_note(&self, id: &str) -> Result<Option<Note>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS),
            params![id],
            map_note,
        )
        .optional()
        .context("Failed to query note")
    }

    /// Apply a partial update. Returns the updated row, or None when the
    /// note does not exist.
    pub fn update_note(&self, id: &str, changes: &NoteChanges) -> Result<Option<Note>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            UPDATE notes SET
                title = COALESCE(?2, title),
                content = COALESCE(?3, content),
                type = COALESCE(?4, type),
                color = COALESCE(?5, color),
                is_pinned = COALESCE(?6, is_pinned),
                category = COALESCE(?7, category),
                updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                id,
                changes.title,
                changes.content,
                changes.note_type,
                changes.color,
                changes.is_pinned.map(|pinned| pinned as i64),
                changes.category,
                now,
            ],
        )
        .context("Failed to update note")?;

        conn.query_row(
            &format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS),
            params![id],
            map_note,
        )
        .optional()
        .context("Failed to read back updated note")
    }

    /// Delete a note. Returns false when no row matched.
    pub fn delete_note(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id])
            .context("Failed to delete note")?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::new(":memory:").expect("Failed to open database")
    }

    fn text_note<'a>(user_id: &'a str, title: &'a str) -> NewNote<'a> {
        NewNote {
            user_id,
            issue_id: None,
            note_type: "text",
            title,
            content: Some("body"),
            category: None,
            color: "#fff9c4",
        }
    }

    #[test]
    fn test_create_and_get() {
        let db = test_db();
        let note = db.create_note(text_note("user-1", "First")).unwrap();

        let found = db.get_note(&note.id).unwrap().unwrap();
        assert_eq!(found, note);
        assert!(!found.is_pinned);
        assert_eq!(found.color, "#fff9c4");
    }

    #[test]
    fn test_list_scoped_to_owner() {
        let db = test_db();
        db.create_note(text_note("user-1", "Mine")).unwrap();
        db.create_note(text_note("user-2", "Theirs")).unwrap();

        let notes = db.list_notes("user-1", None, None).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Mine");
    }

    #[test]
    fn test_list_filters() {
        let db = test_db();
        db.create_note(NewNote {
            category: Some("work"),
            ..text_note("user-1", "Work note")
        })
        .unwrap();
        db.create_note(NewNote {
            issue_id: Some("issue-1"),
            ..text_note("user-1", "Issue note")
        })
        .unwrap();
        db.create_note(text_note("user-1", "Plain")).unwrap();

        let work = db.list_notes("user-1", Some("work"), None).unwrap();
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].title, "Work note");

        let for_issue = db.list_notes("user-1", None, Some("issue-1")).unwrap();
        assert_eq!(for_issue.len(), 1);
        assert_eq!(for_issue[0].title, "Issue note");

        let all = db.list_notes("user-1", None, None).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_pinned_notes_sort_first() {
        let db = test_db();
        let oldest = db.create_note(text_note("user-1", "Oldest")).unwrap();
        db.create_note(text_note("user-1", "Middle")).unwrap();
        db.create_note(text_note("user-1", "Newest")).unwrap();

        // Pin the oldest note; it must now lead the listing
        db.update_note(
            &oldest.id,
            &NoteChanges {
                is_pinned: Some(true),
                ..NoteChanges::default()
            },
        )
        .unwrap();

        let notes = db.list_notes("user-1", None, None).unwrap();
        assert_eq!(notes[0].title, "Oldest");
        assert!(notes[0].is_pinned);
        assert!(notes[1..].iter().all(|note| !note.is_pinned));
    }

    #[test]
    fn test_partial_update_leaves_other_fields() {
        let db = test_db();
        let note = db.create_note(text_note("user-1", "Original")).unwrap();

        let updated = db
            .update_note(
                &note.id,
                &NoteChanges {
                    title: Some("Renamed".to_string()),
                    ..NoteChanges::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.content.as_deref(), Some("body"));
        assert_eq!(updated.note_type, "text");
    }

    #[test]
    fn test_update_missing_note() {
        let db = test_db();
        let result = db
            .update_note(
                "missing",
                &NoteChanges {
                    title: Some("x".to_string()),
                    ..NoteChanges::default()
                },
            )
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_delete() {
        let db = test_db();
        let note = db.create_note(text_note("user-1", "Doomed")).unwrap();

        assert!(db.delete_note(&note.id).unwrap());
        assert!(db.get_note(&note.id).unwrap().is_none());
        assert!(!db.delete_note(&note.id).unwrap());
    }

    #[test]
    fn test_changes_is_empty() {
        assert!(NoteChanges::default().is_empty());
        assert!(!NoteChanges {
            is_pinned: Some(false),
            ..NoteChanges::default()
        }
        .is_empty());
    }

    #[test]
    fn test_content_stored_verbatim() {
        let db = test_db();
        let markup = "<script>alert('xss')</script> & \"quotes\"";
        let note = db
            .create_note(NewNote {
                content: Some(markup),
                ..text_note("user-1", "Raw")
            })
            .unwrap();

        // Storage keeps user input untouched; escaping is the
        // presentation layer's contract
        let found = db.get_note(&note.id).unwrap().unwrap();
        assert_eq!(found.content.as_deref(), Some(markup));
    }
}
