//! Notes CRUD endpoints.
//!
//! Every route sits behind the required auth guard. Ownership is
//! checked on each mutating operation: a user can only touch notes
//! whose `user_id` matches the authenticated subject.

use crate::api::auth_guard::{self, AuthUser};
use crate::api::{internal_error, AppError, AppState};
use crate::storage::{NewNote, Note, NoteChanges};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, patch},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;


/// Default sticky-note color
const DEFAULT_COLOR: &str = "#fff9c4";

/// Note kinds accepted by the API
#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    Text,
    Checklist,
    Acceptance,
}

impl NoteType {
    fn as_str(self) -> &'static str {
        match self {
            NoteType::Text => "text",
            NoteType::Checklist => "checklist",
            NoteType::Acceptance => "acceptance",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    #[serde(rename = "type")]
    note_type: NoteType,
    title: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    issue_id: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    color: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(rename = "type", default)]
    note_type: Option<NoteType>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    is_pinned: Option<bool>,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotesQuery {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    issue_id: Option<String>,
}

#[derive(Serialize)]
struct NotesListResponse {
    notes: Vec<Note>,
}

/// Create the notes API router
pub fn create_notes_router(state: AppState) -> Router {
    Router::new()
        .route("/api/notes", get(list_notes).post(create_note))
        .route("/api/notes/:id", patch(update_note).delete(delete_note))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_guard::require_auth,
        ))
        .with_state(state)
}

/// GET /api/notes - List the authenticated user's notes
async fn list_notes(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Query(query): Query<ListNotesQuery>,
) -> Result<Json<NotesListResponse>, AppError> {
    let notes = state
        .db
        .list_notes(
            &claims.user_id,
            query.category.as_deref(),
            query.issue_id.as_deref(),
        )
        .map_err(internal_error)?;

    Ok(Json(NotesListResponse { notes }))
}

/// POST /api/notes - Create a note owned by the authenticated user
async fn create_note(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, AppError> {
    let request: CreateNoteRequest = serde_json::from_value(body)
        .map_err(|err| AppError::BadRequest(format!("Invalid note payload: {}", err)))?;

    if request.title.is_empty() {
        return Err(AppError::BadRequest("Title must not be empty".to_string()));
    }

    let note = state
        .db
        .create_note(NewNote {
            user_id: &claims.user_id,
            issue_id: request.issue_id.as_deref(),
            note_type: request.note_type.as_str(),
            title: &request.title,
            content: request.content.as_deref(),
            category: request.category.as_deref(),
            color: request.color.as_deref().unwrap_or(DEFAULT_COLOR),
        })
        .map_err(internal_error)?;

    debug!(user = %claims.user_id, note = %note.id, "Note created");

    Ok((StatusCode::CREATED, Json(note)).into_response())
}

/// PATCH /api/notes/:id - Partially update an owned note
async fn update_note(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Path(note_id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<Note>, AppError> {
    let request: UpdateNoteRequest = serde_json::from_value(body)
        .map_err(|err| AppError::BadRequest(format!("Invalid note payload: {}", err)))?;

    if let Some(ref title) = request.title {
        if title.is_empty() {
            return Err(AppError::BadRequest("Title must not be empty".to_string()));
        }
    }

    let existing = state
        .db
        .get_note(&note_id)
        .map_err(internal_error)?
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

    if existing.user_id != claims.user_id {
        return Err(AppError::Forbidden("Forbidden".to_string()));
    }

    let changes = NoteChanges {
        title: request.title,
        content: request.content,
        note_type: request.note_type.map(|t| t.as_str().to_string()),
        color: request.color,
        is_pinned: request.is_pinned,
        category: request.category,
    };

    if changes.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    let updated = state
        .db
        .update_note(&note_id, &changes)
        .map_err(internal_error)?
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

    Ok(Json(updated))
}

/// DELETE /api/notes/:id - Delete an owned note
async fn delete_note(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Path(note_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let existing = state
        .db
        .get_note(&note_id)
        .map_err(internal_error)?
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

    if existing.user_id != claims.user_id {
        return Err(AppError::Forbidden("Forbidden".to_string()));
    }

    state.db.delete_note(&note_id).map_err(internal_error)?;

    debug!(user = %claims.user_id, note = %note_id, "Note deleted");

    Ok(StatusCode::NO_CONTENT)
}
