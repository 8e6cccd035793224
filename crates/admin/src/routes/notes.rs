//! Notes on contacts and the admin activity log.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use super::{parse_email, record_activity};
use crate::db::{ActivityRepository, NoteRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::{Action, ActivityEntry, ContactNote};
use crate::state::AppState;

const MAX_NOTE_LENGTH: usize = 2000;
const DEFAULT_ACTIVITY_LIMIT: i64 = 50;
const MAX_ACTIVITY_LIMIT: i64 = 500;

/// Build the notes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notes/{email}", get(index).post(create))
        .route("/activity", get(activity))
}

#[derive(Debug, Deserialize)]
pub struct NewNote {
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct NotesResponse {
    pub notes: Vec<ContactNote>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub logs: Vec<ActivityEntry>,
}

/// Trim a note and check its length.
fn clean_note(note: &str) -> Result<&str> {
    let note = note.trim();
    if note.is_empty() {
        return Err(AppError::BadRequest("Note cannot be empty".to_string()));
    }
    if note.chars().count() > MAX_NOTE_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Note cannot exceed {MAX_NOTE_LENGTH} characters"
        )));
    }
    Ok(note)
}

/// Notes on an address, newest first.
///
/// GET /api/admin/notes/{email}
///
/// # Errors
///
/// Returns 400 for an invalid address.
#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(email): Path<String>,
) -> Result<Json<NotesResponse>> {
    let email = parse_email(&email)?;
    let notes = NoteRepository::new(state.pool()).for_email(&email).await?;
    Ok(Json(NotesResponse { notes }))
}

/// Add a note.
///
/// POST /api/admin/notes/{email}
///
/// # Errors
///
/// Returns 400 for an invalid address or an empty or oversized note.
#[instrument(skip(state, admin, req))]
async fn create(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(email): Path<String>,
    Json(req): Json<NewNote>,
) -> Result<Json<ContactNote>> {
    let email = parse_email(&email)?;
    let note = clean_note(&req.note)?;

    let created = NoteRepository::new(state.pool())
        .create(&email, note, &admin.email)
        .await?;

    record_activity(&state, &admin, Action::NoteAdded, Some(email.as_str()), json!({})).await;

    Ok(Json(created))
}

/// Recent admin actions.
///
/// GET /api/admin/activity?limit=50
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, _admin))]
async fn activity(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);
    let logs = ActivityRepository::new(state.pool()).recent(limit).await?;
    Ok(Json(ActivityResponse { logs }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_note() {
        assert_eq!(clean_note("  called about sizing \n").ok(), Some("called about sizing"));
        assert!(clean_note("   ").is_err());
        assert!(clean_note(&"x".repeat(MAX_NOTE_LENGTH + 1)).is_err());
    }
}
