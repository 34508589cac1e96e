//! Memory endpoints and the ownership/sharing rules behind them.
//!
//! Authorization model: every memory has exactly one owner (`created_by`).
//! The owner may edit, delete, share and unshare. A user holding a share may
//! edit the memory but never delete it. Everyone else is forbidden.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use trailmark_db::geo;
use trailmark_db::models::MemoryRow;
use trailmark_types::api::{
    CreateMemoryRequest, EditMemoryRequest, MemoryResponse, MemoryShareResponse, MessageResponse,
};

use crate::error::ApiError;
use crate::photos;
use crate::state::{AppState, AppStateInner};
use crate::storage::BUCKET_PHOTOS;
use crate::util::{self, UserIdQuery};

const TITLE_MAX_CHARS: usize = 100;
const DESCRIPTION_MAX_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct ShareQuery {
    pub shared_with: String,
    pub shared_by: String,
}

// ── Handlers ────────────────────────────────────────────────────────────

/// GET /memories?user_id=
pub async fn list_memories(
    State(state): State<AppState>,
    Query(q): Query<UserIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.list_memories_by_owner(&q.user_id)?;
    Ok(Json(rows_to_responses(rows)))
}

/// GET /memories/shared?user_id=
pub async fn list_shared_memories(
    State(state): State<AppState>,
    Query(q): Query<UserIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let memories = list_shared(&state, &q.user_id).await?;
    Ok(Json(memories))
}

/// GET /memories/{id}/shares
pub async fn get_shares(
    State(state): State<AppState>,
    Path(memory_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let shares: Vec<MemoryShareResponse> = state
        .db
        .list_shares(&memory_id)?
        .into_iter()
        .map(|row| MemoryShareResponse {
            shared_with: row.shared_with,
            shared_by: row.shared_by,
        })
        .collect();
    Ok(Json(shares))
}

/// POST /memories
pub async fn create_memory(
    State(state): State<AppState>,
    Json(req): Json<CreateMemoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let memory = create(&state, req).await?;
    Ok((StatusCode::CREATED, Json(memory)))
}

/// POST /memories/{id}/upload-photo?user_id= (multipart)
pub async fn upload_memory_photo(
    State(state): State<AppState>,
    Path(memory_id): Path<String>,
    Query(q): Query<UserIdQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let file = util::read_file_field(&mut multipart).await?;
    let record =
        photos::upload_to_memory(&state, &memory_id, &q.user_id, &file.filename, &file.bytes)
            .await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "url": record.url })),
    ))
}

/// PUT /memories/{id}/edit?user_id=
pub async fn edit_memory(
    State(state): State<AppState>,
    Path(memory_id): Path<String>,
    Query(q): Query<UserIdQuery>,
    Json(req): Json<EditMemoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    edit(&state, &memory_id, &q.user_id, req).await?;
    Ok(Json(MessageResponse::new("Memory updated")))
}

/// POST /memories/{id}/share-user?shared_with=&shared_by=
pub async fn share_memory(
    State(state): State<AppState>,
    Path(memory_id): Path<String>,
    Query(q): Query<ShareQuery>,
) -> Result<impl IntoResponse, ApiError> {
    share(&state, &memory_id, &q.shared_with, &q.shared_by).await?;
    Ok(Json(MessageResponse::new("Memory shared")))
}

/// DELETE /memories/{id}/share-user/{shared_with}
pub async fn unshare_memory(
    State(state): State<AppState>,
    Path((memory_id, shared_with)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.delete_share(&memory_id, &shared_with)?;
    Ok(Json(MessageResponse::new("Share removed")))
}

/// DELETE /memories/{id}?user_id=
pub async fn delete_memory(
    State(state): State<AppState>,
    Path(memory_id): Path<String>,
    Query(q): Query<UserIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    delete(&state, &memory_id, &q.user_id).await?;
    Ok(Json(MessageResponse::new("Memory deleted")))
}

// ── Services ────────────────────────────────────────────────────────────

pub async fn create(
    state: &AppStateInner,
    req: CreateMemoryRequest,
) -> Result<MemoryResponse, ApiError> {
    let title = validate_title(&req.title)?;
    let description = validate_description(req.description.as_deref())?;
    validate_coordinates(req.lat, req.lng)?;

    let id = Uuid::new_v4().to_string();
    state.db.insert_memory(
        &id,
        &title,
        description.as_deref(),
        &geo::to_wkt(req.lat, req.lng),
        &req.created_by,
        &req.created_at.to_rfc3339(),
    )?;

    // Echo the original coordinates rather than re-decoding the stored point
    Ok(MemoryResponse {
        id,
        title,
        description,
        lat: req.lat,
        lng: req.lng,
        created_by: req.created_by,
        created_at: req.created_at,
    })
}

pub async fn list_shared(
    state: &AppStateInner,
    user_id: &str,
) -> Result<Vec<MemoryResponse>, ApiError> {
    let ids = state.db.list_shared_memory_ids(user_id)?;
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let rows = state.db.list_memories_by_ids(&ids)?;
    Ok(rows_to_responses(rows))
}

pub async fn edit(
    state: &AppStateInner,
    memory_id: &str,
    user_id: &str,
    req: EditMemoryRequest,
) -> Result<(), ApiError> {
    let memory = state
        .db
        .get_memory(memory_id)?
        .ok_or_else(|| ApiError::not_found("memory not found"))?;

    if memory.created_by != user_id && !state.db.share_exists(memory_id, user_id)? {
        return Err(ApiError::forbidden(
            "only the owner or a user the memory is shared with may edit it",
        ));
    }

    if req.title.is_none() && req.description.is_none() && req.lat.is_none() && req.lng.is_none() {
        return Err(ApiError::validation("no fields to update"));
    }

    let title = req.title.as_deref().map(validate_title).transpose()?;

    // An omitted description is left untouched; an empty one clears to NULL,
    // the same normalization create applies.
    let description = req
        .description
        .as_deref()
        .map(|d| validate_description(Some(d)))
        .transpose()?;

    let location = match (req.lat, req.lng) {
        (None, None) => None,
        (Some(lat), Some(lng)) => {
            validate_coordinates(lat, lng)?;
            Some(geo::to_wkt(lat, lng))
        }
        _ => {
            return Err(ApiError::validation("lat and lng must be provided together"));
        }
    };

    state.db.update_memory(
        memory_id,
        title.as_deref(),
        description.as_ref().map(|d| d.as_deref()),
        location.as_deref(),
    )?;
    Ok(())
}

/// Owner-only. Stored photo files are swept best-effort first; the photo,
/// share and memory rows then go in one transaction, so a storage hiccup
/// never blocks the delete.
pub async fn delete(
    state: &AppStateInner,
    memory_id: &str,
    user_id: &str,
) -> Result<(), ApiError> {
    let memory = state
        .db
        .get_memory(memory_id)?
        .ok_or_else(|| ApiError::not_found("memory not found"))?;

    if memory.created_by != user_id {
        return Err(ApiError::forbidden("only the owner may delete a memory"));
    }

    let photos = state.db.list_photos(memory_id)?;
    for photo in &photos {
        if let Err(e) = state.storage.delete(BUCKET_PHOTOS, &photo.url).await {
            warn!("Failed to delete stored file for photo {}: {:#}", photo.id, e);
        }
    }

    state.db.delete_memory_cascade(memory_id)?;
    Ok(())
}

pub async fn share(
    state: &AppStateInner,
    memory_id: &str,
    shared_with: &str,
    shared_by: &str,
) -> Result<(), ApiError> {
    let memory = state
        .db
        .get_memory(memory_id)?
        .ok_or_else(|| ApiError::not_found("memory not found"))?;

    if memory.created_by != shared_by {
        return Err(ApiError::forbidden("only the owner may share a memory"));
    }

    if state.db.share_exists(memory_id, shared_with)? {
        return Err(ApiError::conflict("memory is already shared with this user"));
    }

    state
        .db
        .insert_share(memory_id, shared_with, shared_by, &util::now_rfc3339())?;
    Ok(())
}

// ── Row mapping and validation ──────────────────────────────────────────

pub(crate) fn rows_to_responses(rows: Vec<MemoryRow>) -> Vec<MemoryResponse> {
    rows.into_iter().filter_map(row_to_response).collect()
}

/// Records with undecodable points are silently dropped from listings.
fn row_to_response(row: MemoryRow) -> Option<MemoryResponse> {
    let Some((lat, lng)) = geo::wkb_hex_to_lat_lng(&row.location) else {
        warn!("Skipping memory {} with undecodable location", row.id);
        return None;
    };
    let created_at = util::parse_timestamp(&row.created_at, &format!("memory {}", row.id));
    Some(MemoryResponse {
        id: row.id,
        title: row.title,
        description: row.description,
        lat,
        lng,
        created_by: row.created_by,
        created_at,
    })
}

fn validate_title(title: &str) -> Result<String, ApiError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("title cannot be empty"));
    }
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        return Err(ApiError::validation(format!(
            "title must be at most {TITLE_MAX_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_description(description: Option<&str>) -> Result<Option<String>, ApiError> {
    match description {
        Some(d) => {
            let trimmed = d.trim();
            if trimmed.chars().count() > DESCRIPTION_MAX_CHARS {
                return Err(ApiError::validation(format!(
                    "description must be at most {DESCRIPTION_MAX_CHARS} characters"
                )));
            }
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        None => Ok(None),
    }
}

fn validate_coordinates(lat: f64, lng: f64) -> Result<(), ApiError> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(ApiError::validation("latitude must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(ApiError::validation("longitude must be between -180 and 180"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::object_key_from_url;
    use crate::test_util::test_state;
    use chrono::{TimeZone, Utc};

    fn create_request(title: &str, lat: f64, lng: f64, user: &str) -> CreateMemoryRequest {
        CreateMemoryRequest {
            title: title.to_string(),
            description: Some("  a note  ".to_string()),
            lat,
            lng,
            created_by: user.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn create_echoes_original_coordinates() {
        let state = test_state().await;
        let req = create_request("Trip", 10.5, 20.5, "u1");
        let created_at = req.created_at;

        let memory = create(&state, req).await.unwrap();
        assert!(!memory.id.is_empty());
        assert_eq!(memory.title, "Trip");
        assert_eq!(memory.description.as_deref(), Some("a note"));
        assert_eq!(memory.lat, 10.5);
        assert_eq!(memory.lng, 20.5);
        assert_eq!(memory.created_by, "u1");
        assert_eq!(memory.created_at, created_at);

        // and it comes back from the owner listing with the same coordinates
        let listed = rows_to_responses(state.db.list_memories_by_owner("u1").unwrap());
        assert_eq!(listed.len(), 1);
        assert!((listed[0].lat - 10.5).abs() < 1e-9);
        assert!((listed[0].lng - 20.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn create_rejects_invalid_input() {
        let state = test_state().await;

        let err = create(&state, create_request("   ", 0.0, 0.0, "u1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = create(&state, create_request("Trip", 91.0, 0.0, "u1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = create(&state, create_request("Trip", 0.0, -181.0, "u1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let long_title = "x".repeat(101);
        let err = create(&state, create_request(&long_title, 0.0, 0.0, "u1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn stranger_cannot_edit_and_memory_is_unchanged() {
        let state = test_state().await;
        let memory = create(&state, create_request("Trip", 1.0, 2.0, "u1")).await.unwrap();

        let req = EditMemoryRequest { title: Some("Hacked".into()), ..Default::default() };
        let err = edit(&state, &memory.id, "u2", req).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let row = state.db.get_memory(&memory.id).unwrap().unwrap();
        assert_eq!(row.title, "Trip");
    }

    #[tokio::test]
    async fn share_holder_may_edit_but_not_delete() {
        let state = test_state().await;
        let memory = create(&state, create_request("Trip", 1.0, 2.0, "u1")).await.unwrap();
        share(&state, &memory.id, "u2", "u1").await.unwrap();

        let req = EditMemoryRequest { title: Some("Our trip".into()), ..Default::default() };
        edit(&state, &memory.id, "u2", req).await.unwrap();
        let row = state.db.get_memory(&memory.id).unwrap().unwrap();
        assert_eq!(row.title, "Our trip");

        let err = delete(&state, &memory.id, "u2").await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(state.db.get_memory(&memory.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn edit_clears_description_with_empty_string() {
        let state = test_state().await;
        let memory = create(&state, create_request("Trip", 1.0, 2.0, "u1")).await.unwrap();
        let row = state.db.get_memory(&memory.id).unwrap().unwrap();
        assert_eq!(row.description.as_deref(), Some("a note"));

        // whitespace-only normalizes to NULL, same as create
        let req = EditMemoryRequest { description: Some("   ".into()), ..Default::default() };
        edit(&state, &memory.id, "u1", req).await.unwrap();
        let row = state.db.get_memory(&memory.id).unwrap().unwrap();
        assert_eq!(row.description, None);

        let req = EditMemoryRequest { description: Some("back again".into()), ..Default::default() };
        edit(&state, &memory.id, "u1", req).await.unwrap();
        let row = state.db.get_memory(&memory.id).unwrap().unwrap();
        assert_eq!(row.description.as_deref(), Some("back again"));

        // an omitted description is left untouched by other edits
        let req = EditMemoryRequest { title: Some("Renamed".into()), ..Default::default() };
        edit(&state, &memory.id, "u1", req).await.unwrap();
        let row = state.db.get_memory(&memory.id).unwrap().unwrap();
        assert_eq!(row.description.as_deref(), Some("back again"));
    }

    #[tokio::test]
    async fn edit_validates_field_combinations() {
        let state = test_state().await;
        let memory = create(&state, create_request("Trip", 1.0, 2.0, "u1")).await.unwrap();

        let err = edit(&state, &memory.id, "u1", EditMemoryRequest::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let req = EditMemoryRequest { lat: Some(5.0), ..Default::default() };
        let err = edit(&state, &memory.id, "u1", req).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let req = EditMemoryRequest { lat: Some(5.0), lng: Some(6.0), ..Default::default() };
        edit(&state, &memory.id, "u1", req).await.unwrap();
        let listed = rows_to_responses(state.db.list_memories_by_owner("u1").unwrap());
        assert!((listed[0].lat - 5.0).abs() < 1e-9);
        assert!((listed[0].lng - 6.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stranger_cannot_delete_and_memory_stays_listable() {
        let state = test_state().await;
        let memory = create(&state, create_request("Trip", 1.0, 2.0, "u1")).await.unwrap();

        let err = delete(&state, &memory.id, "u2").await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let listed = rows_to_responses(state.db.list_memories_by_owner("u1").unwrap());
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn owner_delete_cascades_to_photos_shares_and_files() {
        let state = test_state().await;
        let memory = create(&state, create_request("Trip", 1.0, 2.0, "u1")).await.unwrap();
        share(&state, &memory.id, "u2", "u1").await.unwrap();
        let photo = photos::upload_to_memory(&state, &memory.id, "u1", "pic.jpg", b"pixels")
            .await
            .unwrap();

        let key = object_key_from_url(&photo.url).unwrap();
        let file_path = state.storage.root().join(BUCKET_PHOTOS).join(&key);
        assert!(file_path.exists());

        delete(&state, &memory.id, "u1").await.unwrap();

        assert!(state.db.get_memory(&memory.id).unwrap().is_none());
        assert!(state.db.list_photos(&memory.id).unwrap().is_empty());
        assert!(state.db.list_shares(&memory.id).unwrap().is_empty());
        assert!(!file_path.exists());
    }

    #[tokio::test]
    async fn share_lifecycle_controls_shared_listing() {
        let state = test_state().await;
        let memory = create(&state, create_request("Trip", 1.0, 2.0, "u1")).await.unwrap();

        // no shares yet: empty list, not an error
        assert!(list_shared(&state, "u2").await.unwrap().is_empty());

        share(&state, &memory.id, "u2", "u1").await.unwrap();
        let shared = list_shared(&state, "u2").await.unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].id, memory.id);

        // owner revokes; u2 no longer sees it
        state.db.delete_share(&memory.id, "u2").unwrap();
        assert!(list_shared(&state, "u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_owner_may_share_and_duplicates_conflict() {
        let state = test_state().await;
        let memory = create(&state, create_request("Trip", 1.0, 2.0, "u1")).await.unwrap();

        let err = share(&state, &memory.id, "u3", "u2").await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        share(&state, &memory.id, "u2", "u1").await.unwrap();
        let err = share(&state, &memory.id, "u2", "u1").await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err = share(&state, "missing", "u2", "u1").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
